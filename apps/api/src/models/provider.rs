use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    /// Multimodal: receives the images directly.
    #[default]
    Gemini,
    /// Text-only: receives an image description produced by Gemini first.
    Deepseek,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Gemini => "gemini",
            Provider::Deepseek => "deepseek",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(Provider::Gemini),
            "deepseek" => Ok(Provider::Deepseek),
            other => Err(format!("Unknown provider '{other}'")),
        }
    }
}

/// Which provider to call, plus an optional key typed in by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderChoice {
    pub provider: Provider,
    pub credential: Option<String>,
}

impl ProviderChoice {
    pub fn new(provider: Provider, credential: Option<String>) -> Self {
        Self {
            provider,
            credential: credential
                .map(|key| key.trim().to_string())
                .filter(|key| !key.is_empty()),
        }
    }
}
