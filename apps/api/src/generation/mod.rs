// Caption generation: prompt assembly, response normalization, and the
// per-request cycle that ties them to the provider router.
// All provider calls go through llm_client.

pub mod handlers;
pub mod normalizer;
pub mod pipeline;
pub mod prompt_builder;
pub mod prompts;
pub mod tone;
