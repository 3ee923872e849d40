use std::time::Duration;

use rand::Rng;
use serenity::builder::{
    CreateActionRow, CreateButton, CreateEmbed, CreateMessage, EditMessage, GetMessages,
};
use serenity::model::application::ButtonStyle;
use serenity::model::id::{ChannelId, MessageId};
use serenity::prelude::*;
use tracing::{debug, warn};

use wordgate_core::PendingVerification;

use crate::state::AppState;

const DISCORD_EMBED_DESC_LIMIT: usize = 4096;
pub const LEADERBOARD_EMBED_COLOR: u32 = 0x00_00_00;

const APPROVE_PREFIX: &str = "wg:verify:approve:";
const DENY_PREFIX: &str = "wg:verify:deny:";

/// Moderator decision carried by a verification button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyAction {
    Approve,
    Deny,
}

/// Split a button custom id into its action and verification id.
pub fn parse_verify_custom_id(custom_id: &str) -> Option<(VerifyAction, &str)> {
    let (action, id) = if let Some(id) = custom_id.strip_prefix(APPROVE_PREFIX) {
        (VerifyAction::Approve, id)
    } else if let Some(id) = custom_id.strip_prefix(DENY_PREFIX) {
        (VerifyAction::Deny, id)
    } else {
        return None;
    };
    (!id.is_empty()).then_some((action, id))
}

/// Accept/Deny buttons for a verification request.
pub fn verification_buttons(verification_id: &str, disabled: bool) -> Vec<CreateActionRow> {
    let buttons = vec![
        CreateButton::new(format!("{APPROVE_PREFIX}{verification_id}"))
            .label("Accept")
            .style(ButtonStyle::Success)
            .disabled(disabled),
        CreateButton::new(format!("{DENY_PREFIX}{verification_id}"))
            .label("Deny")
            .style(ButtonStyle::Danger)
            .disabled(disabled),
    ];
    vec![CreateActionRow::Buttons(buttons)]
}

/// Random non-black colour for verification embeds.
pub fn random_embed_color() -> u32 {
    rand::thread_rng().gen_range(1..=0xFF_FF_FF)
}

pub fn verification_embed(pending: &PendingVerification, color: u32) -> CreateEmbed {
    CreateEmbed::new()
        .title(format!("{} appears", pending.user_name))
        .description(fit_embed_description(&pending.content))
        .color(color)
}

/// Leaderboard embed. An empty `description` gives the blank board.
pub fn leaderboard_embed(title: &str, description: &str) -> CreateEmbed {
    let embed = CreateEmbed::new()
        .title(title)
        .color(LEADERBOARD_EMBED_COLOR);
    if description.is_empty() {
        embed
    } else {
        embed.description(fit_embed_description(description))
    }
}

/// Trim `text` to the embed description limit, cutting at a line break
/// when there is one.
pub fn fit_embed_description(text: &str) -> String {
    if text.chars().count() <= DISCORD_EMBED_DESC_LIMIT {
        return text.to_string();
    }
    let cut: String = text.chars().take(DISCORD_EMBED_DESC_LIMIT - 1).collect();
    match cut.rfind('\n') {
        Some(pos) if pos > 0 => format!("{}\n…", &cut[..pos]),
        _ => format!("{cut}…"),
    }
}

/// `1st`, `2nd`, `3rd`, `4th`, `11th`, `21st`, ...
pub fn ordinal(number: u64) -> String {
    let suffix = match (number % 10, number % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{number}{suffix}")
}

pub fn congratulations_text(user_id: u64, count: u64, template: &str) -> String {
    format!(
        "Congratulations <@{}> 🥳! You are the {} person {}",
        user_id,
        ordinal(count),
        template
    )
}

pub fn ping_text(template: &str, latency: Option<Duration>) -> String {
    let latency = match latency {
        Some(latency) => format!("{}ms", latency.as_millis()),
        None => "unknown".to_string(),
    };
    format!("{template}\n```Latency: {latency}```")
}

/// Post a fresh verification request to the moderators.
pub async fn send_verification_request(
    ctx: &Context,
    channel_id: ChannelId,
    pending: &PendingVerification,
) -> serenity::Result<()> {
    let message = CreateMessage::new()
        .embed(verification_embed(pending, random_embed_color()))
        .components(verification_buttons(&pending.id, false));
    channel_id.send_message(ctx, message).await?;
    Ok(())
}

/// Rewrite the oldest message of the leaderboard channel with the current
/// standings. The owner seeds that message with `printleaderboard`.
pub async fn refresh_leaderboard_message(ctx: &Context, state: &AppState) -> serenity::Result<()> {
    let settings = &state.config.settings;
    let channel_id = ChannelId::new(settings.ids.leaderboard_channel_id);

    let oldest = channel_id
        .messages(ctx, GetMessages::new().after(MessageId::new(1)).limit(1))
        .await?;
    let Some(mut message) = oldest.into_iter().next() else {
        warn!(
            "Leaderboard channel {} has no message to update; run printleaderboard first",
            channel_id
        );
        return Ok(());
    };

    let embed = leaderboard_embed(
        &settings.messages.leaderboard_title,
        &state.leaderboard.render_lines(),
    );
    message.edit(ctx, EditMessage::new().embed(embed)).await?;
    debug!("Leaderboard message {} updated", message.id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;

    #[test]
    fn test_ordinal_suffixes() {
        let cases = [
            (1, "1st"),
            (2, "2nd"),
            (3, "3rd"),
            (4, "4th"),
            (11, "11th"),
            (12, "12th"),
            (13, "13th"),
            (21, "21st"),
            (22, "22nd"),
            (101, "101st"),
            (111, "111th"),
            (0, "0th"),
        ];
        for (n, expected) in cases {
            assert_eq!(ordinal(n), expected, "ordinal({n})");
        }
    }

    #[test]
    fn test_congratulations_mentions_user() {
        assert_snapshot!(
            congratulations_text(42, 3, "to find the word!"),
            @"Congratulations <@42> 🥳! You are the 3rd person to find the word!"
        );
    }

    #[test]
    fn test_ping_reports_latency() {
        assert_eq!(
            ping_text("Pong!", Some(Duration::from_millis(87))),
            "Pong!\n```Latency: 87ms```"
        );
        assert_eq!(ping_text("Pong!", None), "Pong!\n```Latency: unknown```");
    }

    #[test]
    fn test_custom_id_round_trip() {
        let rows = verification_buttons("123", false);
        let json = serde_json::to_value(&rows[0]).unwrap();
        let ids: Vec<&str> = json["components"]
            .as_array()
            .unwrap()
            .iter()
            .map(|b| b["custom_id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["wg:verify:approve:123", "wg:verify:deny:123"]);

        assert_eq!(
            parse_verify_custom_id(ids[0]),
            Some((VerifyAction::Approve, "123"))
        );
        assert_eq!(
            parse_verify_custom_id(ids[1]),
            Some((VerifyAction::Deny, "123"))
        );
    }

    #[test]
    fn test_unrelated_custom_ids_are_ignored() {
        assert_eq!(parse_verify_custom_id("wg:verify:approve:"), None);
        assert_eq!(parse_verify_custom_id("something:else"), None);
    }

    #[test]
    fn test_disabled_buttons() {
        let rows = verification_buttons("123", true);
        let json = serde_json::to_value(&rows[0]).unwrap();
        for button in json["components"].as_array().unwrap() {
            assert_eq!(button["disabled"], serde_json::json!(true));
        }
    }

    #[test]
    fn test_empty_leaderboard_embed_has_no_description() {
        let json = serde_json::to_value(leaderboard_embed("Leaderboard", "")).unwrap();
        assert_eq!(json["title"], "Leaderboard");
        assert!(json.get("description").is_none());
        assert_eq!(json["color"], 0);
    }

    #[test]
    fn test_verification_embed_title() {
        let pending = PendingVerification::new("1", "42", "alice", "hello there");
        let json = serde_json::to_value(verification_embed(&pending, 0x12_34_56)).unwrap();
        assert_eq!(json["title"], "alice appears");
        assert_eq!(json["description"], "hello there");
        assert_eq!(json["color"], 0x12_34_56);
    }

    #[test]
    fn test_random_color_is_in_range() {
        for _ in 0..100 {
            let color = random_embed_color();
            assert!((1..=0xFF_FF_FF).contains(&color));
        }
    }

    #[test]
    fn test_long_description_is_trimmed_at_line() {
        let line = "<@123456789012345678>: 10\n";
        let text = line.repeat(400);
        let fitted = fit_embed_description(&text);
        assert!(fitted.chars().count() <= DISCORD_EMBED_DESC_LIMIT);
        assert!(fitted.ends_with("10\n…"));
    }
}
