mod bot;
mod interactions;
mod send;

use std::sync::Arc;

use serenity::prelude::*;
use tracing::info;

use crate::reconnect::ConnectionFailure;
use crate::state::AppState;

pub use bot::{Bot, OwnerCommand};
pub use send::{
    VerifyAction, congratulations_text, parse_verify_custom_id, verification_buttons,
};

const RATE_LIMITED: u16 = 429;

/// Build a Discord client wired to `state`.
pub async fn build_client(token: &str, state: Arc<AppState>) -> Result<Client, DiscordError> {
    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MEMBERS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let bot = Bot::new(state);

    Client::builder(token, intents)
        .event_handler(bot)
        .await
        .map_err(|e| DiscordError::ClientError(e.to_string()))
}

/// Run one Discord session until the client stops.
pub async fn run_session(state: Arc<AppState>) -> Result<(), ConnectionFailure> {
    let token = state.config.discord_bot_token().to_string();
    let mut client = build_client(&token, Arc::clone(&state))
        .await
        .map_err(|e| ConnectionFailure::Fatal(e.to_string()))?;

    state.set_shard_manager(Arc::clone(&client.shard_manager)).await;

    info!("Starting Discord bot...");
    client.start().await.map_err(|e| classify_error(&e))
}

/// Sort a client error into retryable rate limiting vs everything else.
pub fn classify_error(err: &serenity::Error) -> ConnectionFailure {
    if let serenity::Error::Http(http_err) = err
        && http_err.status_code().map(|s| s.as_u16()) == Some(RATE_LIMITED)
    {
        return ConnectionFailure::RateLimited(err.to_string());
    }
    ConnectionFailure::Fatal(err.to_string())
}

/// Discord-related errors
#[derive(Debug, thiserror::Error)]
pub enum DiscordError {
    #[error("Failed to create Discord client: {0}")]
    ClientError(String),
}
