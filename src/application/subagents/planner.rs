use super::extract_json;
use crate::domain::types::{
    AgentMessage, MessageRole, Plan, PlanComplexity, PlanStep, StepStatus,
};
use crate::infrastructure::model::{ModelProvider, ModelRequest};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

const PLANNER_PROMPT: &str = "You are a planning assistant. Given a user request, \
produce a short execution plan as a single JSON object with exactly these fields: \
\"goal\" (string), \"complexity\" (one of \"simple\", \"medium\", \"complex\"), \
\"estimated_tools\" (array of tool names), and \"steps\" (array of objects with \
\"step_no\", \"description\", and optional \"tool_hint\"). Respond with JSON only, \
no prose and no code fences.";

pub struct Planner {
    provider: Arc<dyn ModelProvider>,
}

impl Planner {
    pub fn new(provider: Arc<dyn ModelProvider>) -> Self {
        Self { provider }
    }

    /// Produces a plan for the prompt. Any parse failure yields the
    /// deterministic single-step fallback.
    pub async fn plan(&self, user_prompt: &str, known_tools: &[String]) -> Plan {
        let messages = vec![
            AgentMessage::new(MessageRole::System, PLANNER_PROMPT),
            AgentMessage::new(
                MessageRole::User,
                format!(
                    "Available tools: {}\n\nRequest: {user_prompt}",
                    known_tools.join(", ")
                ),
            ),
        ];

        let content = match self.provider.chat(ModelRequest::new(messages)).await {
            Ok(outcome) => outcome.content,
            Err(err) => {
                warn!(%err, "Planner model call failed, using fallback plan");
                return fallback_plan(user_prompt);
            }
        };

        match extract_json(&content).and_then(|value| parse_plan(value, known_tools)) {
            Some(plan) => {
                debug!(steps = plan.steps.len(), "Planner produced a plan");
                plan
            }
            None => {
                warn!("Planner output did not match the expected schema");
                fallback_plan(user_prompt)
            }
        }
    }
}

fn parse_plan(value: Value, known_tools: &[String]) -> Option<Plan> {
    let goal = value.get("goal")?.as_str()?.to_string();
    let complexity = match value.get("complexity").and_then(Value::as_str) {
        Some("simple") => PlanComplexity::Simple,
        Some("medium") => PlanComplexity::Medium,
        Some("complex") => PlanComplexity::Complex,
        _ => return None,
    };

    let known: HashSet<&str> = known_tools.iter().map(String::as_str).collect();
    let estimated_tools = value
        .get("estimated_tools")
        .and_then(Value::as_array)
        .map(|tools| {
            tools
                .iter()
                .filter_map(Value::as_str)
                .filter(|name| known.contains(name))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let raw_steps = value.get("steps")?.as_array()?;
    let steps: Vec<PlanStep> = raw_steps
        .iter()
        .enumerate()
        .filter_map(|(index, step)| {
            let description = step.get("description")?.as_str()?.to_string();
            Some(PlanStep {
                step_no: step
                    .get("step_no")
                    .and_then(Value::as_u64)
                    .unwrap_or(index as u64 + 1) as u32,
                description,
                tool_hint: step
                    .get("tool_hint")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                status: StepStatus::Pending,
            })
        })
        .collect();
    if steps.is_empty() {
        return None;
    }

    Some(Plan {
        goal,
        complexity,
        estimated_tools,
        steps,
    })
}

fn fallback_plan(user_prompt: &str) -> Plan {
    Plan {
        goal: user_prompt.to_string(),
        complexity: PlanComplexity::Simple,
        estimated_tools: Vec::new(),
        steps: vec![PlanStep {
            step_no: 1,
            description: "Handle the request directly".to_string(),
            tool_hint: None,
            status: StepStatus::Pending,
        }],
    }
}
