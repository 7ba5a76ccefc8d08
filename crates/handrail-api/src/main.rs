//! Handrail CLI and REST API entry point.
//!
//! Binary name: `handrail`
//!
//! Initializes tracing and storage, recovers workflows left suspended by a
//! previous process, then serves the HTTP/SSE transport.

mod http;
mod pipeline;
mod state;

use clap::Parser;

use state::AppState;

#[derive(Parser)]
#[command(name = "handrail", about = "Human-in-the-loop workflow engine", version)]
struct Cli {
    /// Port for the HTTP server.
    #[arg(long, default_value_t = 8000, env = "HANDRAIL_PORT")]
    port: u16,

    /// Enable OpenTelemetry trace export (stdout exporter).
    #[arg(long, default_value_t = false, env = "HANDRAIL_OTEL")]
    otel: bool,

    /// Override the SQLite database URL.
    #[arg(long, env = "HANDRAIL_DATABASE_URL")]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    handrail_observe::tracing_setup::init_tracing(cli.otel)
        .map_err(|e| anyhow::anyhow!("tracing init failed: {e}"))?;

    let state = AppState::init(cli.database_url.as_deref()).await?;

    // Re-attach sessions that were awaiting input when the last process
    // stopped. Idempotent; no step handlers run.
    let recovered = state.chat.recover_open_workflows().await?;
    for (session_id, pending) in &recovered {
        tracing::info!(
            session_id = session_id.as_str(),
            step = pending.step_name.as_str(),
            "session resumes at suspended step"
        );
    }

    let router = http::router::build_router(state);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], cli.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "handrail listening");

    axum::serve(listener, router).await?;

    handrail_observe::tracing_setup::shutdown_tracing();
    Ok(())
}
