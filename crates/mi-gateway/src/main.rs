mod api;
mod cli;
mod state;

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use mi_domain::config::ConfigSeverity;
use mi_domain::Config;
use mi_providers::registry::ProviderRegistry;
use mi_tools::{ToolRegistry, WebSearchTool};

use crate::cli::{Cli, Command, ConfigCommand};
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        None | Some(Command::Serve) => {
            let (config, _config_path) = cli::load_config()?;
            init_tracing(&config);
            run_server(Arc::new(config)).await
        }
        Some(Command::Doctor) => {
            let (config, config_path) = cli::load_config()?;
            let passed = cli::doctor::run(&config, &config_path).await?;
            if !passed {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Command::Config(ConfigCommand::Validate)) => {
            let (config, config_path) = cli::load_config()?;
            let valid = cli::config::validate(&config, &config_path);
            if !valid {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Command::Config(ConfigCommand::Show)) => {
            let (config, _config_path) = cli::load_config()?;
            cli::config::show(&config);
            Ok(())
        }
        Some(Command::Version) => {
            println!("mi-gateway {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Structured logging per spec.md §6.AMBIENT `logging.level`/`logging.json`.
fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},mi_gateway=debug", config.logging.level)));

    if config.logging.json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn run_server(config: Arc<Config>) -> anyhow::Result<()> {
    tracing::info!("market-insight gateway starting");

    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    if issues.iter().any(|i| i.severity == ConfigSeverity::Error) {
        anyhow::bail!(
            "config validation failed with {} error(s)",
            issues.iter().filter(|i| i.severity == ConfigSeverity::Error).count()
        );
    }

    let data_dir = std::path::PathBuf::from(&config.store.data_dir);
    std::fs::create_dir_all(&data_dir)?;
    let persistence = Arc::new(mi_persistence::PersistenceGateway::open(&data_dir));
    tracing::info!(data_dir = %data_dir.display(), "persistence gateway ready");

    let provider_registry = Arc::new(ProviderRegistry::from_config(&config.llm)?);
    if provider_registry.is_empty() {
        tracing::warn!(
            "no LLM providers initialized — the gateway will run, but every session will fail \
             until at least one is configured (see /api/v2/market-insight/health)"
        );
    } else {
        tracing::info!(providers = provider_registry.len(), "LLM provider registry ready");
    }

    let mut tool_registry = ToolRegistry::new(config.guardrails);
    tool_registry.register(Arc::new(WebSearchTool));
    let tool_registry = Arc::new(tool_registry);

    let state = AppState::new(config.clone(), persistence, provider_registry, Some(tool_registry));

    let app = api::router(state.clone()).with_state(state);

    let addr: std::net::SocketAddr = config.server.bind_addr.parse()?;
    tracing::info!(%addr, "listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
