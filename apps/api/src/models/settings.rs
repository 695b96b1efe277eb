use serde::{Deserialize, Serialize};

/// How captions are produced: from the tone/audience table, or by mimicking a reference post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMode {
    #[default]
    Custom,
    Imitate,
}

/// Where the reference post comes from in imitation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImitateSource {
    #[default]
    Text,
    Link,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    #[default]
    Authentic,
    Emotional,
    Informative,
    Humorous,
    News,
}

#[cfg(test)]
impl Tone {
    pub const ALL: [Tone; 5] = [
        Tone::Authentic,
        Tone::Emotional,
        Tone::Informative,
        Tone::Humorous,
        Tone::News,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Audience {
    #[default]
    General,
    Students,
    OfficeWorkers,
    Parents,
    Couples,
    Photographers,
    YoungWomen,
}

#[cfg(test)]
impl Audience {
    pub const ALL: [Audience; 7] = [
        Audience::General,
        Audience::Students,
        Audience::OfficeWorkers,
        Audience::Parents,
        Audience::Couples,
        Audience::Photographers,
        Audience::YoungWomen,
    ];
}

/// User settings for one generation cycle. Frozen once the request arrives.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerationSettings {
    pub mode: GenerationMode,
    pub imitate_source: ImitateSource,
    pub tone: Tone,
    pub audience: Audience,
    pub reference_content: Option<String>,
    pub reference_url: Option<String>,
}

impl GenerationSettings {
    /// Checks the imitation invariants. Runs before any network call.
    pub fn validate(&self) -> Result<(), String> {
        if self.mode != GenerationMode::Imitate {
            return Ok(());
        }

        match self.imitate_source {
            ImitateSource::Text if is_blank(self.reference_content.as_deref()) => {
                Err("Paste the reference post you want to imitate".to_string())
            }
            ImitateSource::Link if is_blank(self.reference_url.as_deref()) => {
                Err("Paste the link of the post you want to imitate".to_string())
            }
            _ => Ok(()),
        }
    }

    /// The reference text to imitate, if imitation applies to this request.
    pub fn imitation_reference(&self) -> Option<&str> {
        if self.mode != GenerationMode::Imitate {
            return None;
        }
        self.reference_content
            .as_deref()
            .filter(|text| !text.trim().is_empty())
    }

    /// True when the reference must first be scraped from `reference_url`.
    pub fn needs_extraction(&self) -> bool {
        self.mode == GenerationMode::Imitate && self.imitate_source == ImitateSource::Link
    }

    /// Returns a copy with the extracted reference text filled in.
    pub fn with_reference_content(&self, content: String) -> Self {
        GenerationSettings {
            reference_content: Some(content),
            ..self.clone()
        }
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}
