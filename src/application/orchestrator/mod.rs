//! Plan → execute → review sequencing.

use crate::application::agent::{AgentRunRequest, ReasoningAgent};
use crate::application::events::{names, EventBus};
use crate::application::federation::ExternalServerManager;
use crate::application::subagents::{Planner, Reviewer};
use crate::domain::types::{AgentKind, AgentLogEntry, MultiAgentTimeline};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

pub struct Orchestrator {
    planner: Planner,
    reviewer: Reviewer,
    agent: Arc<ReasoningAgent>,
    federation: Arc<ExternalServerManager>,
    events: Arc<EventBus>,
    catalog_names: Vec<String>,
}

impl Orchestrator {
    pub fn new(
        planner: Planner,
        reviewer: Reviewer,
        agent: Arc<ReasoningAgent>,
        federation: Arc<ExternalServerManager>,
        events: Arc<EventBus>,
        catalog_names: Vec<String>,
    ) -> Self {
        Self {
            planner,
            reviewer,
            agent,
            federation,
            events,
            catalog_names,
        }
    }

    /// Runs the three phases in order and composes the multi-agent
    /// timeline. The `tool:executed` events for individual calls are
    /// emitted by the executor as each call completes.
    pub async fn run(&self, request: AgentRunRequest) -> MultiAgentTimeline {
        let session_id = request.session_id.clone();
        let mut agent_logs = Vec::with_capacity(3);

        self.events
            .publish(&session_id, names::AGENT_PLANNING, json!({}));
        let mut known_tools = self.catalog_names.clone();
        known_tools.extend(
            self.federation
                .all_tools()
                .await
                .iter()
                .map(|tool| tool.full_name()),
        );
        let plan = self.planner.plan(&request.user_prompt, &known_tools).await;
        self.events
            .publish(&session_id, names::AGENT_PLAN_READY, json!({ "plan": &plan }));
        agent_logs.push(AgentLogEntry::new(
            AgentKind::Planner,
            format!(
                "Plan ready: {} step(s), complexity {:?}",
                plan.steps.len(),
                plan.complexity
            ),
        ));

        self.events
            .publish(&session_id, names::AGENT_EXECUTING, json!({}));
        let timeline = self.agent.run(request).await;
        agent_logs.push(AgentLogEntry::new(
            AgentKind::Executor,
            format!("Executed {} tool call(s)", timeline.tool_calls.len()),
        ));

        self.events
            .publish(&session_id, names::AGENT_REVIEWING, json!({}));
        let review = self.reviewer.review(&timeline).await;
        self.events.publish(
            &session_id,
            names::AGENT_REVIEW_DONE,
            json!({ "review": &review }),
        );
        agent_logs.push(AgentLogEntry::new(
            AgentKind::Reviewer,
            format!("Review complete: score {}/10", review.score),
        ));

        info!(
            session_id = session_id.as_str(),
            score = review.score,
            tool_calls = timeline.tool_calls.len(),
            "Orchestrated run finished"
        );
        MultiAgentTimeline {
            timeline,
            plan,
            review,
            agent_logs,
        }
    }
}
