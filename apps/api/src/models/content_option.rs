use serde::{Deserialize, Serialize};

/// One generated caption bundle offered to the user.
///
/// Only the response normalizer constructs these; the id is assigned there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentOption {
    pub id: String,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    /// Why this variation should get clicks.
    pub reasoning: String,
}
