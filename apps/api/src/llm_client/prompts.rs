// Shared prompt fragments and the structured-output schema.
// Generation-specific templates live in generation/prompts.rs.

use serde_json::{json, Value};

/// Number of caption variations requested per cycle.
pub const VARIATION_COUNT: usize = 3;

/// Output-format directive appended to every caption prompt.
pub const OPTIONS_FORMAT_INSTRUCTION: &str = "\
OUTPUT: exactly 3 variations (1. direct imitation of the requested style, \
2. emotional, 3. practical).
FORMAT: respond with a JSON array ONLY. No prose before or after it, no markdown code fences.
Each element: {\"title\": \"...\", \"content\": \"...\", \"tags\": [\"...\"], \"reasoning\": \"...\"}
- title: a scroll-stopping title, under 20 characters
- content: the full caption body
- tags: topic hashtags without the leading #
- reasoning: one sentence on why this version gets clicks";

/// JSON schema handed to Gemini's structured-output mode.
pub fn options_response_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "title": { "type": "STRING" },
                "content": { "type": "STRING" },
                "tags": { "type": "ARRAY", "items": { "type": "STRING" } },
                "reasoning": { "type": "STRING" }
            },
            "required": ["title", "content", "tags", "reasoning"]
        }
    })
}
