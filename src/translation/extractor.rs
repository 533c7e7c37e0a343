use crate::utils::{LocaleFillError, Result};
use serde_json::{Map, Value as JsonValue};

/// Pulls a JSON object out of free-form completion text.
///
/// Takes everything from the first `{` to the last `}` inclusive and requires
/// it to parse completely as one JSON object. Prose and code fences around the
/// object are ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseExtractor;

impl ResponseExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, reply: &str) -> Result<Map<String, JsonValue>> {
        let candidate = braced_candidate(reply).ok_or_else(|| {
            LocaleFillError::MalformedResponse("no JSON object found in reply".to_string())
        })?;

        match serde_json::from_str::<JsonValue>(candidate) {
            Ok(JsonValue::Object(map)) => Ok(map),
            Ok(_) => Err(LocaleFillError::MalformedResponse(
                "reply payload is not a JSON object".to_string(),
            )),
            Err(e) => Err(LocaleFillError::MalformedResponse(e.to_string())),
        }
    }
}

fn braced_candidate(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}
