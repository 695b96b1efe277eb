// Relay endpoints: thin forwarders that hold provider keys server-side so
// callers without a key can still reach Gemini, DeepSeek, and the scraper.

pub mod handlers;
