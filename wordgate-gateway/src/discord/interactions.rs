use serenity::builder::{CreateInteractionResponse, CreateInteractionResponseMessage};
use serenity::model::application::{CommandInteraction, ComponentInteraction, Interaction};
use serenity::prelude::*;
use tracing::{error, warn};

use wordgate_core::{SideEffect, VerificationError};

use super::bot::{Bot, OwnerCommand};
use super::send::{self, VerifyAction};

/// `interaction_create` body, kept apart from the message handlers in
/// `bot.rs`.
impl Bot {
    pub(super) async fn handle_interaction(&self, ctx: Context, interaction: Interaction) {
        if let Some(component) = interaction.as_message_component() {
            if let Some((action, id)) = send::parse_verify_custom_id(&component.data.custom_id) {
                self.handle_verification_button(&ctx, component, action, id)
                    .await;
            }
            return;
        }

        if let Some(command) = interaction.as_command() {
            let name = command.data.name.as_str();
            if let Some(owner_command) = OwnerCommand::from_command_name(name) {
                self.handle_owner_slash(&ctx, command, owner_command).await;
                return;
            }
            match name {
                "ping" => self.handle_ping_command(&ctx, command).await,
                "leaderboard" => self.handle_leaderboard_command(&ctx, command).await,
                "rules" => self.handle_rules_command(&ctx, command).await,
                _ => {}
            }
        }
    }

    async fn handle_verification_button(
        &self,
        ctx: &Context,
        component: &ComponentInteraction,
        action: VerifyAction,
        verification_id: &str,
    ) {
        let resolution = match action {
            VerifyAction::Approve => self.state.approve_verification(verification_id).await,
            VerifyAction::Deny => self.state.deny_verification(verification_id).await,
        };

        let resolution = match resolution {
            Ok(resolution) => resolution,
            Err(VerificationError::Unknown(id)) => {
                warn!("Button pressed for unknown verification {}", id);
                let message = CreateInteractionResponseMessage::new()
                    .content("This verification request is no longer tracked.")
                    .ephemeral(true);
                if let Err(e) = component
                    .create_response(&ctx.http, CreateInteractionResponse::Message(message))
                    .await
                {
                    warn!("Failed to answer stale verification {}: {}", id, e);
                }
                return;
            }
        };

        // Disable both buttons whatever the outcome; the embed is left as is.
        let update = CreateInteractionResponseMessage::new()
            .components(send::verification_buttons(verification_id, true));
        if let Err(e) = component
            .create_response(&ctx.http, CreateInteractionResponse::UpdateMessage(update))
            .await
        {
            warn!("Failed to disable verification buttons: {}", e);
        }

        if let Some(SideEffect::RemoveRestrictedRole { user_id }) = resolution.side_effect()
            && let Err(reason) = self.remove_restricted_role(ctx, &user_id).await
        {
            error!("Failed to verify {}: {}", user_id, reason);
            if let Err(e) = component
                .channel_id
                .say(
                    ctx,
                    format!("Could not remove the restricted role from <@{user_id}>: {reason}"),
                )
                .await
            {
                warn!("Failed to report role removal failure: {}", e);
            }
        }
    }

    async fn handle_owner_slash(
        &self,
        ctx: &Context,
        command: &CommandInteraction,
        owner_command: OwnerCommand,
    ) {
        let reply = self
            .owner_command_reply(ctx, command.user.id, owner_command)
            .await;

        respond(
            ctx,
            command,
            CreateInteractionResponseMessage::new()
                .content(reply)
                .ephemeral(true),
        )
        .await;
    }

    /// Handle `/ping`: configured text plus heartbeat latency.
    async fn handle_ping_command(&self, ctx: &Context, command: &CommandInteraction) {
        let latency = self.state.shard_latency(ctx.shard_id).await;
        let text = send::ping_text(&self.state.config.settings.messages.ping, latency);
        respond(ctx, command, CreateInteractionResponseMessage::new().content(text)).await;
    }

    /// Handle `/leaderboard`: current standings, in first-scored order.
    async fn handle_leaderboard_command(&self, ctx: &Context, command: &CommandInteraction) {
        let embed = send::leaderboard_embed(
            &self.state.config.settings.messages.leaderboard_title,
            &self.state.leaderboard.render_lines(),
        );
        respond(ctx, command, CreateInteractionResponseMessage::new().embed(embed)).await;
    }

    async fn handle_rules_command(&self, ctx: &Context, command: &CommandInteraction) {
        let rules = self.state.config.settings.messages.rules.clone();
        respond(ctx, command, CreateInteractionResponseMessage::new().content(rules)).await;
    }
}

async fn respond(
    ctx: &Context,
    command: &CommandInteraction,
    message: CreateInteractionResponseMessage,
) {
    if let Err(e) = command
        .create_response(&ctx.http, CreateInteractionResponse::Message(message))
        .await
    {
        warn!("Failed to answer /{}: {}", command.data.name, e);
    }
}
