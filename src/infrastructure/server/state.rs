use crate::application::agent::ReasoningAgent;
use crate::application::catalog::{Connectors, ToolCatalog};
use crate::application::events::EventBus;
use crate::application::executor::ToolExecutor;
use crate::application::federation::{ExternalServerManager, FederationError};
use crate::application::metrics::MetricsStore;
use crate::application::orchestrator::Orchestrator;
use crate::application::session::SessionStore;
use crate::application::subagents::{Planner, Reviewer};
use crate::config::AppConfig;
use crate::infrastructure::model::ModelProvider;
use std::sync::Arc;

/// Everything the handlers need, wired once at startup. There are no
/// process-wide singletons; tests build their own state with fakes.
pub struct AppState {
    pub config: AppConfig,
    pub provider: Arc<dyn ModelProvider>,
    pub catalog: Arc<ToolCatalog>,
    pub executor: Arc<ToolExecutor>,
    pub federation: Arc<ExternalServerManager>,
    pub sessions: Arc<SessionStore>,
    pub events: Arc<EventBus>,
    pub metrics: Arc<MetricsStore>,
    pub agent: Arc<ReasoningAgent>,
    pub orchestrator: Arc<Orchestrator>,
}

impl AppState {
    pub async fn build(
        config: AppConfig,
        provider: Arc<dyn ModelProvider>,
    ) -> Result<Arc<Self>, FederationError> {
        let connectors = Connectors::in_memory(config.fs_allowed_path.clone());
        let catalog = Arc::new(ToolCatalog::standard(connectors));
        let federation =
            Arc::new(ExternalServerManager::load(config.servers_file.clone()).await?);
        Ok(Self::assemble(config, provider, catalog, federation))
    }

    /// Wiring entry point shared by production startup and test fixtures.
    pub fn assemble(
        config: AppConfig,
        provider: Arc<dyn ModelProvider>,
        catalog: Arc<ToolCatalog>,
        federation: Arc<ExternalServerManager>,
    ) -> Arc<Self> {
        let sessions = Arc::new(SessionStore::new());
        let events = Arc::new(EventBus::new());
        let metrics = Arc::new(MetricsStore::new());
        let executor = Arc::new(ToolExecutor::new(
            catalog.clone(),
            federation.clone(),
            metrics.clone(),
            events.clone(),
        ));
        let agent = Arc::new(ReasoningAgent::new(
            provider.clone(),
            executor.clone(),
            federation.clone(),
            sessions.clone(),
            events.clone(),
            config.clone(),
        ));
        let catalog_names = catalog
            .all()
            .iter()
            .map(|spec| spec.name.clone())
            .collect();
        let orchestrator = Arc::new(Orchestrator::new(
            Planner::new(provider.clone()),
            Reviewer::new(provider.clone()),
            agent.clone(),
            federation.clone(),
            events.clone(),
            catalog_names,
        ));

        Arc::new(Self {
            config,
            provider,
            catalog,
            executor,
            federation,
            sessions,
            events,
            metrics,
            agent,
            orchestrator,
        })
    }
}
