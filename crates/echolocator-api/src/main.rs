//! Echo-Locator CLI and REST API entry point.
//!
//! Binary name: `echoloc`
//!
//! Parses CLI arguments, opens the item store and embedder, then dispatches
//! to the appropriate command handler or starts the REST API server.

mod cli;
mod http;
mod state;

use clap::Parser;
use clap_complete::generate;

use echolocator_core::service::gateway::SearchRequest;
use echolocator_observe::tracing_setup::{init_tracing, shutdown_tracing};

use cli::item::AddArgs;
use cli::{Cli, Commands};
use state::{AppState, StateOptions};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info,echolocator=debug",
        _ => "trace",
    };
    init_tracing(filter, cli.otel).map_err(|e| anyhow::anyhow!(e))?;

    let result = run(cli).await;
    shutdown_tracing();
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Shell completions don't need app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "echoloc", &mut std::io::stdout());
        return Ok(());
    }

    let options = StateOptions {
        ephemeral: cli.ephemeral,
        embedder: cli.embedder.map(Into::into),
    };
    let state = AppState::init(&options).await?;

    match cli.command {
        Commands::Serve { port, host } => serve(state, host, port, cli.quiet).await?,

        Commands::Add {
            image,
            title,
            location,
            description,
            contact,
        } => {
            let args = AddArgs {
                title,
                location,
                description,
                contact,
            };
            cli::item::add_item(&state, &image, args, cli.json).await?;
        }

        Commands::Search {
            query,
            threshold,
            top_k,
            location,
        } => {
            let request = SearchRequest {
                query,
                threshold,
                top_k,
                location,
            };
            cli::search::search(&state, request, cli.json).await?;
        }

        Commands::Recent { limit } => cli::item::list_recent(&state, limit, cli.json).await?,

        Commands::Show { id } => cli::item::show_item(&state, &id, cli.json).await?,

        Commands::Stats => cli::stats::stats(&state, cli.json).await?,

        Commands::Reconcile => cli::stats::reconcile(&state, cli.json).await?,

        Commands::Completions { .. } => unreachable!("handled above"),
    }

    Ok(())
}

async fn serve(
    state: AppState,
    host: Option<String>,
    port: Option<u16>,
    quiet: bool,
) -> anyhow::Result<()> {
    let host = host.unwrap_or_else(|| state.config.server.host.clone());
    let port = port.unwrap_or(state.config.server.port);
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    if !quiet {
        println!(
            "  {} {} listening on {}",
            console::style("⚡").bold(),
            state.config.api_title,
            console::style(format!("http://{addr}")).cyan()
        );
        println!("  {}", console::style("Press Ctrl+C to stop").dim());
    }
    tracing::info!(%addr, "server started");

    let router = http::router::build_router(state);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if !quiet {
        println!("\n  Server stopped.");
    }
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
