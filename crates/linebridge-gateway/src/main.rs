use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use linebridge_agent::{Assistant, ClaudeRunner, RunnerOptions};
use linebridge_core::config::BridgeConfig;
use linebridge_line::{LineClient, MessageGateway};
use linebridge_sessions::{AssistantFactory, SessionRegistry};
use tracing::info;

mod app;
mod commands;
mod handler;
mod http;
mod output;
#[cfg(test)]
mod test_support;

/// LINE webhook bridge to the Claude Code CLI.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Config file (default: $LINEBRIDGE_CONFIG or ~/.linebridge/linebridge.toml).
    #[arg(short, long)]
    config: Option<String>,
    /// Override the listen port.
    #[arg(short, long)]
    port: Option<u16>,
    /// Override the bind address.
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "linebridge_gateway=info,linebridge_agent=info,linebridge_sessions=info,\
                 linebridge_line=info,tower_http=debug"
                    .into()
            }),
        )
        .init();

    // explicit --config > LINEBRIDGE_CONFIG env > ~/.linebridge/linebridge.toml
    let config_path = cli.config.or_else(|| std::env::var("LINEBRIDGE_CONFIG").ok());
    let mut config = BridgeConfig::load(config_path.as_deref())?;
    if let Some(port) = cli.port {
        config.gateway.port = port;
    }
    if let Some(bind) = cli.bind {
        config.gateway.bind = bind;
    }

    let line: Arc<dyn MessageGateway> = Arc::new(LineClient::new(
        config.line.channel_token.clone(),
        config.line.api_base.clone(),
    )?);

    // tool resolution reads CLAUDE_ALLOWED_TOOLS once, at startup
    let options = RunnerOptions::from_config(&config.claude);
    info!(
        command = %options.command,
        working_dir = %options.working_dir,
        allowed_tools = ?options.allowed_tools,
        skip_permissions = options.skip_permissions,
        timeout_secs = options.timeout.as_secs(),
        "claude runner configured"
    );
    let factory: AssistantFactory = Arc::new(move |_user: &str| {
        Box::new(ClaudeRunner::new(options.clone())) as Box<dyn Assistant>
    });

    let sessions = Arc::new(SessionRegistry::new(
        factory,
        Duration::from_secs(config.sessions.idle_timeout_secs),
    ));

    // session sweeper runs until shutdown
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let sweeper = tokio::spawn(Arc::clone(&sessions).run_sweeper(
        Duration::from_secs(config.sessions.sweep_interval_secs),
        shutdown_rx,
    ));

    let addr: SocketAddr = format!("{}:{}", config.gateway.bind, config.gateway.port).parse()?;
    info!(
        user_id = %config.line.user_id,
        signature_check = config.line.channel_secret.is_some(),
        "authorized LINE user"
    );

    let state = Arc::new(app::AppState::new(config, line, sessions));
    let router = app::build_router(state);

    info!("linebridge gateway listening on {}", addr);
    info!("webhook endpoint: http://{}/webhook", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // signal sweeper to stop
    let _ = shutdown_tx.send(true);
    sweeper.await?;
    info!("linebridge gateway stopped");

    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!("shutdown signal received");
}
