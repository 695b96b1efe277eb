//! Response Normalizer: raw model text to `Vec<ContentOption>`.
//!
//! Models do not always honour "return a JSON array": DeepSeek's JSON mode
//! only returns objects, so the array usually arrives wrapped under some key.
//! The decoded value is classified into one of three shapes, tried in order.

use std::sync::atomic::{AtomicI64, Ordering};

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::llm_client::strip_json_fences;
use crate::models::content_option::ContentOption;

/// Key preferred when the array arrives wrapped in an object.
const WRAPPER_KEY: &str = "items";

/// An object carrying any of these is an option itself, not a wrapper.
const OPTION_FIELDS: &[&str] = &["title", "content", "reasoning"];

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("model output is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("option {index} is not a JSON object")]
    NotAnObject { index: usize },

    #[error("option {index} has a malformed field: {source}")]
    MalformedOption {
        index: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("model output contains no options")]
    NoOptions,
}

/// The three accepted layouts of a decoded response.
#[derive(Debug, PartialEq)]
pub enum DecodedShape {
    /// `[ {...}, {...} ]`
    Sequence(Vec<Value>),
    /// `{ "items": [ ... ] }`, or an object holding an array of objects.
    Wrapped { key: String, items: Vec<Value> },
    /// A lone object (or scalar) treated as a one-element list.
    Single(Value),
}

impl DecodedShape {
    pub fn classify(value: Value) -> Self {
        match value {
            Value::Array(items) => DecodedShape::Sequence(items),
            Value::Object(map) if OPTION_FIELDS.iter().any(|f| map.contains_key(*f)) => {
                DecodedShape::Single(Value::Object(map))
            }
            Value::Object(map) => match take_wrapped_array(map) {
                Ok((key, items)) => DecodedShape::Wrapped { key, items },
                Err(map) => DecodedShape::Single(Value::Object(map)),
            },
            other => DecodedShape::Single(other),
        }
    }

    pub fn into_items(self) -> Vec<Value> {
        match self {
            DecodedShape::Sequence(items) => items,
            DecodedShape::Wrapped { items, .. } => items,
            DecodedShape::Single(value) => vec![value],
        }
    }
}

/// Picks `items` if it holds an array, else the first key in document order
/// whose array is empty or holds only objects. Hands the map back untouched
/// when there is none.
fn take_wrapped_array(mut map: Map<String, Value>) -> Result<(String, Vec<Value>), Map<String, Value>> {
    let key = if matches!(map.get(WRAPPER_KEY), Some(Value::Array(_))) {
        Some(WRAPPER_KEY.to_string())
    } else {
        map.iter()
            .find(|(_, v)| is_object_list(v))
            .map(|(k, _)| k.clone())
    };

    match key.and_then(|k| map.remove(&k).map(|v| (k, v))) {
        Some((key, Value::Array(items))) => Ok((key, items)),
        _ => Err(map),
    }
}

fn is_object_list(value: &Value) -> bool {
    matches!(value, Value::Array(items) if items.iter().all(Value::is_object))
}

/// Fields as the model sends them. Missing or null fields default to empty.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawOption {
    title: Option<String>,
    content: Option<String>,
    tags: Option<RawTags>,
    reasoning: Option<String>,
}

/// Tags normally arrive as an array; some models send one `"#a #b"` string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawTags {
    List(Vec<String>),
    Joined(String),
}

impl Default for RawTags {
    fn default() -> Self {
        RawTags::List(Vec::new())
    }
}

impl RawTags {
    fn into_vec(self) -> Vec<String> {
        let tags = match self {
            RawTags::List(tags) => tags,
            RawTags::Joined(joined) => joined
                .split(|c: char| c.is_whitespace() || c == ',' || c == '，')
                .map(str::to_string)
                .collect(),
        };
        tags.into_iter()
            .map(|t| t.trim().trim_start_matches('#').to_string())
            .filter(|t| !t.is_empty())
            .collect()
    }
}

/// Last timestamp handed out, so ids stay unique across calls in the same millisecond.
static LAST_STAMP: AtomicI64 = AtomicI64::new(0);

fn next_stamp() -> i64 {
    let now = chrono::Utc::now().timestamp_millis();
    let mut last = LAST_STAMP.load(Ordering::Relaxed);
    loop {
        let stamp = now.max(last + 1);
        match LAST_STAMP.compare_exchange_weak(last, stamp, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return stamp,
            Err(actual) => last = actual,
        }
    }
}

/// Parses raw model output into options with fresh ids `{tag}-{stamp}-{index}`.
pub fn normalize(raw: &str, id_tag: &str) -> Result<Vec<ContentOption>, NormalizeError> {
    let text = strip_json_fences(raw);
    let value: Value = serde_json::from_str(text).map_err(NormalizeError::InvalidJson)?;
    let items = DecodedShape::classify(value).into_items();
    if items.is_empty() {
        return Err(NormalizeError::NoOptions);
    }

    let stamp = next_stamp();
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            if !item.is_object() {
                return Err(NormalizeError::NotAnObject { index });
            }
            let raw: RawOption = serde_json::from_value(item)
                .map_err(|source| NormalizeError::MalformedOption { index, source })?;
            Ok(ContentOption {
                id: format!("{id_tag}-{stamp}-{index}"),
                title: raw.title.unwrap_or_default(),
                content: raw.content.unwrap_or_default(),
                tags: raw.tags.unwrap_or_default().into_vec(),
                reasoning: raw.reasoning.unwrap_or_default(),
            })
        })
        .collect()
}
