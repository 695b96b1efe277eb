//! Prompt Builder: pure mapping from settings to the instruction payload.

use crate::generation::prompts::{
    ATTACHED_IMAGES_LINE, CAPTION_SYSTEM, CUSTOM_TEMPLATE, DESCRIBE_IMAGES_PROMPT,
    IMAGE_CONTEXT_TEMPLATE, IMITATE_TEMPLATE,
};
use crate::generation::tone::{audience_descriptor, tone_descriptor};
use crate::llm_client::prompts::OPTIONS_FORMAT_INSTRUCTION;
use crate::llm_client::{InlineImage, LlmRequest, OutputFormat};
use crate::models::settings::GenerationSettings;

/// How the model learns what is in the images.
#[derive(Debug, Clone, Copy)]
pub enum ImageContext<'a> {
    /// Images are sent inline with the prompt (multimodal providers).
    Attached,
    /// A text description produced by the analysis step.
    Described(&'a str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltPrompt {
    pub system: String,
    pub user: String,
}

impl BuiltPrompt {
    pub fn into_request(self, images: Vec<InlineImage>) -> LlmRequest {
        LlmRequest {
            system: Some(self.system),
            prompt: self.user,
            images,
            output: OutputFormat::JsonOptions,
        }
    }
}

/// Builds the caption prompt.
///
/// Imitation with a non-blank reference yields the style-transfer block;
/// anything else falls back to the audience/tone table. The output-format
/// directive is always last.
pub fn build_caption_prompt(settings: &GenerationSettings, images: ImageContext<'_>) -> BuiltPrompt {
    let image_line = match images {
        ImageContext::Attached => ATTACHED_IMAGES_LINE.to_string(),
        ImageContext::Described(description) => {
            IMAGE_CONTEXT_TEMPLATE.replace("{description}", description)
        }
    };

    let task = match settings.imitation_reference() {
        Some(reference) => IMITATE_TEMPLATE.replace("{reference}", reference),
        None => CUSTOM_TEMPLATE
            .replace("{audience}", audience_descriptor(settings.audience))
            .replace("{tone}", tone_descriptor(settings.tone)),
    };

    BuiltPrompt {
        system: CAPTION_SYSTEM.to_string(),
        user: [image_line.as_str(), task.as_str(), OPTIONS_FORMAT_INSTRUCTION].join("\n\n"),
    }
}

/// Request for the analysis step: describe the images in plain text.
pub fn build_describe_request(images: Vec<InlineImage>) -> LlmRequest {
    LlmRequest {
        system: None,
        prompt: DESCRIBE_IMAGES_PROMPT.to_string(),
        images,
        output: OutputFormat::Text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::tone::all_descriptors;
    use crate::models::settings::{Audience, GenerationMode, ImitateSource, Tone};

    #[test]
    fn test_custom_prompt_contains_descriptors_for_every_combination() {
        for audience in Audience::ALL {
            for tone in Tone::ALL {
                let settings = GenerationSettings {
                    audience,
                    tone,
                    ..Default::default()
                };
                let prompt = build_caption_prompt(&settings, ImageContext::Attached);
                assert!(
                    prompt.user.contains(audience_descriptor(audience)),
                    "{audience:?}/{tone:?} missing audience descriptor"
                );
                assert!(
                    prompt.user.contains(tone_descriptor(tone)),
                    "{audience:?}/{tone:?} missing tone descriptor"
                );
            }
        }
    }

    #[test]
    fn test_custom_prompt_uses_only_selected_descriptors() {
        let settings = GenerationSettings {
            audience: Audience::Parents,
            tone: Tone::News,
            ..Default::default()
        };
        let prompt = build_caption_prompt(&settings, ImageContext::Attached);
        let present = all_descriptors()
            .filter(|d| prompt.user.contains(d))
            .count();
        assert_eq!(present, 2);
    }

    #[test]
    fn test_imitate_prompt_embeds_reference_verbatim_without_table() {
        let reference = "家人们谁懂啊!!😭 这家店真的绝绝子\n第二行 #探店";
        let settings = GenerationSettings {
            mode: GenerationMode::Imitate,
            imitate_source: ImitateSource::Text,
            reference_content: Some(reference.to_string()),
            tone: Tone::Humorous,
            audience: Audience::Students,
            ..Default::default()
        };
        let prompt = build_caption_prompt(&settings, ImageContext::Attached);

        assert!(prompt.user.contains(reference));
        assert!(prompt.user.contains("STYLE TRANSFER"));
        assert!(prompt.user.contains("Do NOT borrow"));
        for descriptor in all_descriptors() {
            assert!(
                !prompt.user.contains(descriptor),
                "imitation prompt leaked descriptor {descriptor}"
            );
        }
    }

    #[test]
    fn test_imitate_without_reference_falls_back_to_custom() {
        let settings = GenerationSettings {
            mode: GenerationMode::Imitate,
            reference_content: Some("  ".to_string()),
            ..Default::default()
        };
        let prompt = build_caption_prompt(&settings, ImageContext::Attached);
        assert!(prompt.user.contains(audience_descriptor(Audience::General)));
        assert!(!prompt.user.contains("STYLE TRANSFER"));
    }

    #[test]
    fn test_format_directive_is_always_last() {
        let settings = GenerationSettings::default();
        let prompt = build_caption_prompt(&settings, ImageContext::Attached);
        assert!(prompt.user.ends_with(OPTIONS_FORMAT_INSTRUCTION));
        assert!(prompt.user.contains("exactly 3 variations"));
        assert!(prompt.user.contains("JSON array ONLY"));
    }

    #[test]
    fn test_described_context_embeds_description() {
        let settings = GenerationSettings::default();
        let prompt = build_caption_prompt(
            &settings,
            ImageContext::Described("a latte with heart-shaped foam"),
        );
        assert!(prompt
            .user
            .starts_with("IMAGE CONTEXT: a latte with heart-shaped foam"));
        assert!(!prompt.user.contains(ATTACHED_IMAGES_LINE));
    }

    #[test]
    fn test_into_request_asks_for_json_options() {
        let request = build_caption_prompt(&GenerationSettings::default(), ImageContext::Attached)
            .into_request(vec![]);
        assert_eq!(request.output, OutputFormat::JsonOptions);
        assert_eq!(request.system.as_deref(), Some(CAPTION_SYSTEM));
    }

    #[test]
    fn test_describe_request_is_plain_text() {
        let request = build_describe_request(vec![]);
        assert_eq!(request.output, OutputFormat::Text);
        assert!(request.system.is_none());
        assert_eq!(request.prompt, DESCRIBE_IMAGES_PROMPT);
    }
}
