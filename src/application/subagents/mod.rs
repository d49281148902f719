//! One-shot sub-agents: the planner and the reviewer.
//!
//! Each makes a single model call whose output is expected to be a JSON
//! object. Malformed output never fails the run — both fall back to a
//! deterministic value computed from their inputs.

mod planner;
mod reviewer;

pub use planner::Planner;
pub use reviewer::Reviewer;

use serde_json::Value;

/// Pulls a JSON value out of model content, tolerating surrounding code
/// fences.
pub(crate) fn extract_json(content: &str) -> Option<Value> {
    let trimmed = content.trim();

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Some(value);
    }

    if trimmed.starts_with("```") {
        let stripped = trimmed.trim_start_matches("```json");
        let stripped = stripped.trim_start_matches("```JSON");
        let stripped = stripped.trim_start_matches("```");
        if let Some(end) = stripped.rfind("```") {
            let slice = &stripped[..end];
            if let Ok(value) = serde_json::from_str::<Value>(slice.trim()) {
                return Some(value);
            }
        }
    }

    None
}
