//! relaychat CLI and relay server entry point.
//!
//! Binary name: `relaychat`
//!
//! Parses CLI arguments, loads configuration, then either starts the relay
//! server, opens the terminal chat, or runs a one-shot command.

mod cli;
mod http;
mod state;
#[cfg(test)]
mod test_support;

use clap::Parser;
use clap_complete::generate;

use relaychat_infra::config::{load_effective_config, resolve_data_dir};
use relaychat_observe::tracing_setup::{init_tracing, shutdown_tracing, verbosity_filter};
use relaychat_types::identity::UserIdentity;

use cli::{Cli, Commands, SessionsCommand};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Shell completions don't need tracing, config, or state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "relaychat", &mut std::io::stdout());
        return Ok(());
    }

    // The server logs requests; the terminal chat stays quiet so logs
    // don't interleave with the conversation.
    let base_filter = match &cli.command {
        Commands::Serve { .. } => "info",
        Commands::Chat { .. } => "error",
        _ => "warn",
    };
    let enable_otel = matches!(cli.command, Commands::Serve { otel: true, .. });
    init_tracing(&verbosity_filter(base_filter, cli.quiet, cli.verbose), enable_otel)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let data_dir = resolve_data_dir();
    let config = load_effective_config(&data_dir).await;

    let result = match cli.command {
        Commands::Serve { host, port, .. } => {
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);
            let upstream = config.upstream.base_url.clone();
            let model = config.upstream.model.clone();
            let state = AppState::init(data_dir, config).await?;
            serve(state, &host, port, &upstream, &model).await
        }

        Commands::Chat {
            user,
            server,
            session,
        } => {
            let identity = UserIdentity::new(user);
            let server = server.unwrap_or_else(|| config.client.server_url.clone());
            cli::chat::loop_runner::run_chat_loop(&config, &identity, &server, session.as_deref())
                .await
        }

        Commands::Sessions { command } => {
            let state = AppState::init(data_dir, config).await?;
            let result = match command {
                SessionsCommand::List { user } => {
                    cli::session::list_sessions(&state, &user, cli.json).await
                }
                SessionsCommand::Delete { id, user, force } => {
                    cli::session::delete_session(&state, &id, &user, force, cli.json).await
                }
            };
            state.db_pool.close().await;
            result
        }

        Commands::Title { text } => {
            cli::title::print_title(&text.join(" "), cli.json);
            Ok(())
        }

        Commands::Completions { .. } => unreachable!("handled above"),
    };

    shutdown_tracing();
    result
}

async fn serve(
    state: AppState,
    host: &str,
    port: u16,
    upstream: &str,
    model: &str,
) -> anyhow::Result<()> {
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    println!(
        "  {} relaychat listening on {}",
        console::style("⚡").bold(),
        console::style(format!("http://{addr}")).cyan()
    );
    println!(
        "  {} {} ({})",
        console::style("upstream").dim(),
        upstream,
        model
    );
    println!("  {}", console::style("Press Ctrl+C to stop").dim());

    let pool = state.db_pool.clone();
    let router = http::router::build_router(state);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    println!("\n  Server stopped.");
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
    tracing::info!("Shutdown signal received");
}
