use super::extract_json;
use crate::domain::types::{AgentMessage, ExecutionTimeline, MessageRole, Review};
use crate::infrastructure::model::{ModelProvider, ModelRequest};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

const REVIEWER_PROMPT: &str = "You are a quality reviewer. Given a user request, \
the tool calls that were executed, and the final response, rate the execution. \
Respond with a single JSON object with exactly these fields: \"passed\" (bool), \
\"score\" (integer 0-10), \"feedback\" (string), \"issues\" (array of strings), \
and \"suggestions\" (array of strings). Respond with JSON only, no prose and no \
code fences.";

pub struct Reviewer {
    provider: Arc<dyn ModelProvider>,
}

impl Reviewer {
    pub fn new(provider: Arc<dyn ModelProvider>) -> Self {
        Self { provider }
    }

    /// Rates an executed run. Any parse failure yields the deterministic
    /// fallback computed from the timeline's success/error counts.
    pub async fn review(&self, timeline: &ExecutionTimeline) -> Review {
        let tool_summary: Vec<String> = timeline
            .tool_calls
            .iter()
            .map(|call| {
                format!(
                    "- {} ({})",
                    call.tool_name,
                    if call.succeeded() {
                        "success".to_string()
                    } else {
                        format!("error: {}", call.error.as_deref().unwrap_or("unknown"))
                    }
                )
            })
            .collect();
        let messages = vec![
            AgentMessage::new(MessageRole::System, REVIEWER_PROMPT),
            AgentMessage::new(
                MessageRole::User,
                format!(
                    "Request: {}\n\nTool calls:\n{}\n\nFinal response: {}",
                    timeline.user_prompt,
                    if tool_summary.is_empty() {
                        "(none)".to_string()
                    } else {
                        tool_summary.join("\n")
                    },
                    timeline.final_response,
                ),
            ),
        ];

        let content = match self.provider.chat(ModelRequest::new(messages)).await {
            Ok(outcome) => outcome.content,
            Err(err) => {
                warn!(%err, "Reviewer model call failed, using fallback review");
                return fallback_review(timeline);
            }
        };

        match extract_json(&content).and_then(parse_review) {
            Some(review) => {
                debug!(score = review.score, passed = review.passed, "Review parsed");
                review
            }
            None => {
                warn!("Reviewer output did not match the expected schema");
                fallback_review(timeline)
            }
        }
    }
}

fn parse_review(value: Value) -> Option<Review> {
    let passed = value.get("passed")?.as_bool()?;
    let score = value.get("score")?.as_i64()?.clamp(0, 10) as u8;
    let feedback = value.get("feedback")?.as_str()?.to_string();
    Some(Review {
        passed,
        score,
        feedback,
        issues: string_list(value.get("issues")),
        suggestions: string_list(value.get("suggestions")),
    })
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn fallback_review(timeline: &ExecutionTimeline) -> Review {
    let successes = timeline.tool_calls.iter().filter(|c| c.succeeded()).count();
    let errors = timeline.tool_calls.len() - successes;
    let passed = errors == 0 || successes > errors;
    let score = if errors == 0 {
        8
    } else if successes > 0 {
        6
    } else {
        4
    };
    Review {
        passed,
        score,
        feedback: format!(
            "Automated review: {successes} tool call(s) succeeded, {errors} failed."
        ),
        issues: Vec::new(),
        suggestions: Vec::new(),
    }
}
