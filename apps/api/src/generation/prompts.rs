// All LLM prompt constants for the Generation module.
// Reuses the output-format directive from llm_client::prompts.

/// System prompt for caption generation.
pub const CAPTION_SYSTEM: &str = "You are a top-tier Xiaohongshu (RedNote) content creator. \
    You write viral titles and captions that read like a real person posted them. \
    STRICT FORMAT: return ONLY a valid JSON array.";

/// Style-transfer block. Replace `{reference}` before sending.
pub const IMITATE_TEMPLATE: &str = r#"TASK: HIGH-FIDELITY STYLE TRANSFER
REFERENCE TEXT:
"""
{reference}
"""
INSTRUCTIONS:
- Replicate the reference's structure: paragraph rhythm, line breaks, list style, title pattern.
- Replicate its tone and slang exactly, including filler words and internet speak.
- Match its emoji and symbol density and where it places them.
- Do NOT borrow the reference's subject matter. Write about the images you were given."#;

/// Free-generation block. Replace `{audience}` and `{tone}` before sending.
pub const CUSTOM_TEMPLATE: &str = r#"TASK: ORIGINAL POST
SETTINGS: Audience: {audience}, Tone: {tone}
GUIDELINES:
- Colloquial, like talking to a friend. Imperfect grammar is fine.
- No rigid structure: no "Firstly / Secondly", no essay headings.
- Let emojis flow naturally mid-sentence instead of stacking them at line ends.
- Never open with a robotic intro such as "Today I want to share" or "As an AI"."#;

/// Image-context line for the description path. Replace `{description}`.
pub const IMAGE_CONTEXT_TEMPLATE: &str = "IMAGE CONTEXT: {description}";

/// Line used when the images travel alongside the prompt.
pub const ATTACHED_IMAGES_LINE: &str = "Write titles and captions for the attached images.";

/// Prompt for the analysis step that turns images into text for text-only providers.
pub const DESCRIBE_IMAGES_PROMPT: &str =
    "Describe these images in extreme detail for a copywriter. Output only the description.";

/// Used when the analysis step comes back empty.
pub const NO_DESCRIPTION: &str = "No description.";
