use agentd::config::AppConfig;
use agentd::infrastructure::model::OllamaClient;
use agentd::infrastructure::server::{self, AppState};
use clap::Parser;
use std::error::Error;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "agentd", version, about = "Tool-using LLM agent runtime")]
struct Cli {
    /// Listen address; the port falls back to the PORT environment key.
    #[arg(long)]
    listen: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();
    let cli = Cli::parse();
    let config = AppConfig::from_env();
    let addr = cli.listen.unwrap_or_else(|| {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), config.port)
    });
    info!(
        environment = config.environment.as_str(),
        model = config.llm.model.as_str(),
        safe_mode = config.production_safe_mode,
        "Starting agentd"
    );

    let provider = Arc::new(OllamaClient::new(&config.llm));
    let state = AppState::build(config, provider).await?;
    server::serve(state, addr).await?;

    info!("agentd stopped");
    Ok(())
}

fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_level(true)
            .init();
    });
}
