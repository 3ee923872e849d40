use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wordgate_gateway::discord;
use wordgate_gateway::reconnect::{self, Backoff, ReconnectError};
use wordgate_gateway::state::AppState;

/// How the main loop ended.
enum Shutdown {
    Signal(&'static str),
    Connection(Result<(), ReconnectError>),
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = wordgate_core::Config::load()?;
    info!(
        "Configuration loaded (guild: {}, leaderboard: {})",
        config.settings.ids.guild_id,
        config.settings.storage.leaderboard_path.display()
    );

    // Words and leaderboard must load before we serve any event
    let state = Arc::new(AppState::load(config)?);
    info!(
        "Loaded {} secret words and {} leaderboard entries",
        state.words.len(),
        state.leaderboard.len()
    );

    let backoff = Backoff::from(state.config.settings.reconnect);
    let connection = reconnect::run_with_backoff(&backoff, |attempt| {
        let state = Arc::clone(&state);
        async move {
            if attempt > 1 {
                info!("Reconnecting to Discord (attempt {})", attempt);
            }
            discord::run_session(state).await
        }
    });

    let outcome = tokio::select! {
        result = connection => Shutdown::Connection(result),
        signal = shutdown_signal() => Shutdown::Signal(signal),
    };

    // Every exit path below goes through here exactly once
    state.persist()?;

    match outcome {
        Shutdown::Signal(name) => {
            info!("Received {}, shut down cleanly", name);
            Ok(())
        }
        Shutdown::Connection(Ok(())) => {
            info!("Discord client stopped");
            Ok(())
        }
        Shutdown::Connection(Err(e)) => {
            error!("Shutting down: {}", e);
            Err(e.into())
        }
    }
}

/// Resolve on SIGINT (ctrl-c) or SIGTERM, returning the signal name.
async fn shutdown_signal() -> &'static str {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => "SIGINT",
        _ = terminate => "SIGTERM",
    }
}
