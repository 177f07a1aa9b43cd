//! Persona CLI and REST API entry point.
//!
//! Binary name: `persona`
//!
//! Parses CLI arguments, initializes database and services, then dispatches
//! to the appropriate command handler or starts the REST API server.

mod cli;
mod http;
mod state;

use clap::Parser;
use clap_complete::generate;
use persona_observe::{Verbosity, init_tracing, shutdown_tracing};

use cli::{Cli, Commands, ConfigCommand, TranscriptCommand};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(Verbosity::from_flags(cli.verbose, cli.quiet), cli.otel)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    // Shell completions don't need app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "persona", &mut std::io::stdout());
        return Ok(());
    }

    let result = run(cli).await;
    shutdown_tracing();
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let state = AppState::init().await?;

    match cli.command {
        Commands::Serve { port, host } => serve(state, &host, port).await?,

        Commands::Chat { publish_id } => {
            cli::chat::run_chat_loop(&state, &publish_id).await?;
        }

        Commands::Config { action } => match action {
            ConfigCommand::Import { file } => {
                cli::config::import_configs(&state, &file, cli.json).await?;
            }
            ConfigCommand::List => cli::config::list_configs(&state, cli.json).await?,
            ConfigCommand::Show => cli::config::show_config(&state, cli.json).await?,
        },

        Commands::Transcripts { action } => match action {
            TranscriptCommand::List { publish_id } => {
                cli::transcripts::list_transcripts(&state, publish_id.as_deref(), cli.json)
                    .await?;
            }
            TranscriptCommand::Show { id } => {
                cli::transcripts::show_transcript(&state, &id, cli.json).await?;
            }
            TranscriptCommand::Delete { id, force } => {
                cli::transcripts::delete_transcript(&state, &id, force, cli.json).await?;
            }
        },

        Commands::Completions { .. } => {}
    }

    Ok(())
}

async fn serve(state: AppState, host: &str, port: u16) -> anyhow::Result<()> {
    // Ensure a review API key exists, print it if new
    if let Some(api_key) = http::extractors::auth::ensure_api_key(&state.db_pool).await? {
        println!();
        println!(
            "  {} Review API key generated (save this -- it won't be shown again):",
            console::style("🔑").bold()
        );
        println!();
        println!("  {}", console::style(&api_key).yellow().bold());
        println!();
    }

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    println!(
        "  {} Persona API listening on {}",
        console::style("⚡").bold(),
        console::style(format!("http://{addr}")).cyan()
    );
    println!("  {}", console::style("Press Ctrl+C to stop").dim());

    let router = http::router::build_router(state);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    println!("\n  Server stopped.");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
