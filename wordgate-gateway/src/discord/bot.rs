use std::sync::Arc;

use serenity::async_trait;
use serenity::builder::{CreateCommand, CreateMessage};
use serenity::model::channel::Message;
use serenity::model::gateway::Ready;
use serenity::model::guild::Member;
use serenity::model::id::{ChannelId, GuildId, RoleId, UserId};
use serenity::prelude::*;
use tracing::{debug, error, info, warn};

use wordgate_core::{Config, Settings};

use crate::state::AppState;

use super::send::{self, leaderboard_embed};

/// Discord bot handler
///
/// Holds no state of its own; everything lives in [`AppState`].
pub struct Bot {
    pub(super) state: Arc<AppState>,
}

/// Owner-only actions, reachable as slash commands or as text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerCommand {
    PrintLeaderboard,
    PrintRules,
}

impl OwnerCommand {
    pub fn from_text(content: &str) -> Option<Self> {
        match content {
            "owner print leaderboard" => Some(Self::PrintLeaderboard),
            "owner print rules" => Some(Self::PrintRules),
            _ => None,
        }
    }

    pub fn from_command_name(name: &str) -> Option<Self> {
        match name {
            "printleaderboard" => Some(Self::PrintLeaderboard),
            "printrules" => Some(Self::PrintRules),
            _ => None,
        }
    }

    pub fn done_message(self) -> &'static str {
        match self {
            Self::PrintLeaderboard => "Printed empty leaderboard to leaderboard channel!",
            Self::PrintRules => "Printed rules to rules channel!",
        }
    }
}

/// Outcome of the owner check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnerDecision {
    Run(OwnerCommand),
    /// Reply with the configured permission message; nothing is posted.
    Denied(String),
}

pub fn authorize_owner_command(
    config: &Config,
    user_id: u64,
    command: OwnerCommand,
) -> OwnerDecision {
    if config.is_owner(user_id) {
        OwnerDecision::Run(command)
    } else {
        OwnerDecision::Denied(config.settings.messages.permission_denied.clone())
    }
}

/// Channel and message an owner command posts. The leaderboard is always
/// posted blank, whatever the current counts.
pub fn owner_post(settings: &Settings, command: OwnerCommand) -> (ChannelId, CreateMessage) {
    match command {
        OwnerCommand::PrintLeaderboard => (
            ChannelId::new(settings.ids.leaderboard_channel_id),
            CreateMessage::new()
                .embed(leaderboard_embed(&settings.messages.leaderboard_title, "")),
        ),
        OwnerCommand::PrintRules => (
            ChannelId::new(settings.ids.rules_channel_id),
            CreateMessage::new().content(&settings.messages.rules),
        ),
    }
}

impl Bot {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    pub(super) fn guild_id(&self) -> GuildId {
        GuildId::new(self.state.config.settings.ids.guild_id)
    }

    pub(super) fn restricted_role(&self) -> RoleId {
        RoleId::new(self.state.config.settings.ids.unverified_role_id)
    }

    /// Post to the leaderboard or rules channel. The caller checks ownership.
    pub(super) async fn run_owner_command(
        &self,
        ctx: &Context,
        command: OwnerCommand,
    ) -> serenity::Result<()> {
        let (channel_id, message) = owner_post(&self.state.config.settings, command);
        channel_id.send_message(ctx, message).await?;
        info!("Owner command {:?} done", command);
        Ok(())
    }

    /// Check ownership, run the command if allowed, and return the reply
    /// for the caller.
    pub(super) async fn owner_command_reply(
        &self,
        ctx: &Context,
        user_id: UserId,
        command: OwnerCommand,
    ) -> String {
        match authorize_owner_command(&self.state.config, user_id.get(), command) {
            OwnerDecision::Denied(reply) => {
                info!("Denied {:?} to non-owner {}", command, user_id);
                reply
            }
            OwnerDecision::Run(command) => match self.run_owner_command(ctx, command).await {
                Ok(()) => command.done_message().to_string(),
                Err(e) => {
                    error!("Owner command {:?} failed: {}", command, e);
                    format!("Failed to run command: {e}")
                }
            },
        }
    }

    /// Lift the restricted role after approval. Failures are reported to the
    /// caller as text and never escalate.
    pub(super) async fn remove_restricted_role(
        &self,
        ctx: &Context,
        user_id: &str,
    ) -> Result<(), String> {
        let user_id = user_id
            .parse::<u64>()
            .ok()
            .filter(|id| *id != 0)
            .map(UserId::new)
            .ok_or_else(|| format!("invalid user id {user_id}"))?;

        ctx.http
            .remove_member_role(
                self.guild_id(),
                user_id,
                self.restricted_role(),
                Some("Verified by a moderator"),
            )
            .await
            .map_err(|e| e.to_string())?;

        info!("Removed restricted role from {}", user_id);
        Ok(())
    }

    async fn handle_owner_text(&self, ctx: &Context, msg: &Message, command: OwnerCommand) {
        let reply = self.owner_command_reply(ctx, msg.author.id, command).await;

        if let Err(e) = msg.channel_id.say(ctx, reply).await {
            warn!("Failed to reply in {}: {}", msg.channel_id, e);
        }
    }

    async fn handle_direct_message(&self, ctx: &Context, msg: &Message) {
        if !self.is_restricted(ctx, msg.author.id).await {
            debug!("Ignoring DM from verified member {}", msg.author.id);
            return;
        }

        let pending = self
            .state
            .open_verification(
                &msg.id.to_string(),
                &msg.author.id.to_string(),
                &msg.author.name,
                &msg.content,
            )
            .await;

        let settings = &self.state.config.settings;
        let verification_channel = ChannelId::new(settings.ids.verification_channel_id);
        if let Err(e) = send::send_verification_request(ctx, verification_channel, &pending).await
        {
            error!("Failed to post verification {}: {}", pending.id, e);
        }

        if let Err(e) = msg.channel_id.say(ctx, &settings.messages.verification).await {
            warn!("Failed to acknowledge DM from {}: {}", msg.author.id, e);
        }
    }

    /// Whether `user_id` still carries the restricted role. When the member
    /// cannot be looked up the DM is treated as a verification request and
    /// left to the moderators.
    async fn is_restricted(&self, ctx: &Context, user_id: UserId) -> bool {
        match ctx.http.get_member(self.guild_id(), user_id).await {
            Ok(member) => member.roles.contains(&self.restricted_role()),
            Err(e) => {
                warn!("Could not look up member {}: {}", user_id, e);
                true
            }
        }
    }

    async fn handle_guild_message(&self, ctx: &Context, msg: &Message) {
        if let Some(command) = OwnerCommand::from_text(&msg.content) {
            self.handle_owner_text(ctx, msg, command).await;
        }

        let Some(count) = self
            .state
            .record_message(&msg.author.id.to_string(), &msg.content)
        else {
            return;
        };

        if let Err(e) = send::refresh_leaderboard_message(ctx, &self.state).await {
            error!("Failed to update leaderboard message: {}", e);
        }

        let text = send::congratulations_text(
            msg.author.id.get(),
            count,
            &self.state.config.settings.messages.congratulations,
        );
        if let Err(e) = msg.channel_id.say(ctx, text).await {
            warn!("Failed to congratulate {}: {}", msg.author.id, e);
        }

        for reaction in ['🎉', '🥳'] {
            if let Err(e) = msg.react(ctx, reaction).await {
                warn!("Failed to react to {}: {}", msg.id, e);
            }
        }
    }

    fn commands() -> Vec<CreateCommand> {
        vec![
            CreateCommand::new("ping").description("Pings bot and returns latency"),
            CreateCommand::new("leaderboard").description("Prints the current leaderboard"),
            CreateCommand::new("rules").description("Prints the rules"),
            CreateCommand::new("printleaderboard")
                .description("Posts an empty leaderboard to the leaderboard channel (owner only)"),
            CreateCommand::new("printrules")
                .description("Posts the rules to the rules channel (owner only)"),
        ]
    }
}

#[async_trait]
impl EventHandler for Bot {
    /// Bot is ready: register guild slash commands
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("Logged into server as: {}", ready.user.name);
        info!("Current leaderboard: {}", self.state.leaderboard.to_json());

        match self.guild_id().set_commands(&ctx.http, Self::commands()).await {
            Ok(commands) => info!("Registered {} guild commands", commands.len()),
            Err(e) => error!("Failed to register slash commands: {}", e),
        }
    }

    /// New members start restricted and get the welcome DMs.
    async fn guild_member_addition(&self, ctx: Context, new_member: Member) {
        if new_member.guild_id != self.guild_id() {
            return;
        }
        let user_id = new_member.user.id;
        info!("Member {} ({}) joined", new_member.user.name, user_id);

        if let Err(e) = ctx
            .http
            .add_member_role(
                self.guild_id(),
                user_id,
                self.restricted_role(),
                Some("New member awaiting verification"),
            )
            .await
        {
            error!("Failed to restrict new member {}: {}", user_id, e);
        }

        for text in &self.state.config.settings.messages.welcome {
            if let Err(e) = new_member
                .user
                .direct_message(&ctx, CreateMessage::new().content(text))
                .await
            {
                warn!("Failed to send welcome DM to {}: {}", user_id, e);
                break;
            }
        }
    }

    /// Handle incoming messages
    async fn message(&self, ctx: Context, msg: Message) {
        // Ignore messages from bots (including ourselves)
        if msg.author.bot {
            return;
        }

        match msg.guild_id {
            None => self.handle_direct_message(&ctx, &msg).await,
            Some(guild_id) if guild_id == self.guild_id() => {
                self.handle_guild_message(&ctx, &msg).await
            }
            Some(_) => {}
        }
    }

    async fn interaction_create(
        &self,
        ctx: Context,
        interaction: serenity::model::application::Interaction,
    ) {
        self.handle_interaction(ctx, interaction).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wordgate_core::LeaderboardStore;

    fn test_config() -> Config {
        Config::from_lookup(|key| {
            let value = match key {
                "DISCORD_BOT_TOKEN" => "token",
                "GUILD_ID" => "1",
                "VERIFICATION_CHANNEL_ID" => "2",
                "LEADERBOARD_CHANNEL_ID" => "3",
                "RULES_CHANNEL_ID" => "4",
                "UNVERIFIED_ROLE_ID" => "5",
                "OWNER_ID" => "6",
                "PERMISSION_MESSAGE" => "Owner only.",
                "RULES" => "Be nice.",
                _ => return None,
            };
            Some(value.to_string())
        })
        .unwrap()
    }

    #[test]
    fn test_owner_text_commands() {
        assert_eq!(
            OwnerCommand::from_text("owner print leaderboard"),
            Some(OwnerCommand::PrintLeaderboard)
        );
        assert_eq!(
            OwnerCommand::from_text("owner print rules"),
            Some(OwnerCommand::PrintRules)
        );
        assert_eq!(OwnerCommand::from_text("owner print rules please"), None);
        assert_eq!(OwnerCommand::from_text("Owner Print Rules"), None);
    }

    #[test]
    fn test_owner_slash_commands() {
        assert_eq!(
            OwnerCommand::from_command_name("printleaderboard"),
            Some(OwnerCommand::PrintLeaderboard)
        );
        assert_eq!(
            OwnerCommand::from_command_name("printrules"),
            Some(OwnerCommand::PrintRules)
        );
        assert_eq!(OwnerCommand::from_command_name("leaderboard"), None);
    }

    #[test]
    fn test_registered_command_names() {
        let names: Vec<String> = Bot::commands()
            .iter()
            .map(|c| {
                serde_json::to_value(c).unwrap()["name"]
                    .as_str()
                    .unwrap()
                    .to_string()
            })
            .collect();
        assert_eq!(
            names,
            vec!["ping", "leaderboard", "rules", "printleaderboard", "printrules"]
        );
    }

    #[test]
    fn test_non_owner_gets_permission_message() {
        let config = test_config();
        for command in [OwnerCommand::PrintLeaderboard, OwnerCommand::PrintRules] {
            assert_eq!(
                authorize_owner_command(&config, 7, command),
                OwnerDecision::Denied("Owner only.".to_string())
            );
        }
    }

    #[test]
    fn test_owner_runs_command() {
        let config = test_config();
        let decision = authorize_owner_command(&config, 6, OwnerCommand::PrintRules);
        assert_eq!(decision, OwnerDecision::Run(OwnerCommand::PrintRules));
        assert_eq!(
            OwnerCommand::PrintRules.done_message(),
            "Printed rules to rules channel!"
        );
        assert_eq!(
            OwnerCommand::PrintLeaderboard.done_message(),
            "Printed empty leaderboard to leaderboard channel!"
        );
    }

    #[test]
    fn test_owner_commands_leave_leaderboard_untouched() {
        let config = test_config();
        let store = LeaderboardStore::from_entries([("42", 3u64), ("43", 1)]);
        let before = store.to_json();

        authorize_owner_command(&config, 7, OwnerCommand::PrintLeaderboard);
        authorize_owner_command(&config, 6, OwnerCommand::PrintLeaderboard);
        let (channel_id, message) = owner_post(&config.settings, OwnerCommand::PrintLeaderboard);

        assert_eq!(channel_id, ChannelId::new(3));
        let json = serde_json::to_value(&message).unwrap();
        assert!(json["embeds"][0].get("description").is_none());
        assert_eq!(store.to_json(), before);
    }

    #[test]
    fn test_print_rules_posts_configured_rules() {
        let config = test_config();
        let (channel_id, message) = owner_post(&config.settings, OwnerCommand::PrintRules);

        assert_eq!(channel_id, ChannelId::new(4));
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["content"], "Be nice.");
    }
}
