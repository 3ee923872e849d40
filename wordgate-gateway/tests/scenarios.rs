//! End-to-end scenarios run against `AppState` without a Discord connection.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use insta::assert_snapshot;
use wordgate_core::{Config, LeaderboardStore, SideEffect, VerificationState};
use wordgate_gateway::AppState;
use wordgate_gateway::discord::{congratulations_text, parse_verify_custom_id, verification_buttons};

fn config_for(dir: &Path) -> Config {
    let leaderboard = dir.join("leaderboard.json").display().to_string();
    let words = dir.join("words.json").display().to_string();
    Config::from_lookup(|key| {
        let value = match key {
            "DISCORD_BOT_TOKEN" => "token",
            "GUILD_ID" => "1",
            "VERIFICATION_CHANNEL_ID" => "2",
            "LEADERBOARD_CHANNEL_ID" => "3",
            "RULES_CHANNEL_ID" => "4",
            "UNVERIFIED_ROLE_ID" => "5",
            "OWNER_ID" => "6",
            "CONGRATULATIONS_MESSAGE" => "to find a secret word!",
            "LEADERBOARD_PATH" => leaderboard.as_str(),
            "WORDS_PATH" => words.as_str(),
            _ => return None,
        };
        Some(value.to_string())
    })
    .expect("test config")
}

fn write_words(dir: &Path, encoded: &[&str]) {
    fs::write(
        dir.join("words.json"),
        serde_json::to_string(encoded).unwrap(),
    )
    .unwrap();
}

#[test]
fn test_secret_word_scores_a_point() {
    let dir = tempfile::tempdir().unwrap();
    // "pizza"
    write_words(dir.path(), &["cGl6emE="]);

    let state = AppState::load(config_for(dir.path())).unwrap();
    assert!(state.leaderboard.is_empty());

    let count = state.record_message("42", "I love pizza night");
    assert_eq!(count, Some(1));
    assert_eq!(state.leaderboard.get("42"), 1);

    let rendered = state.leaderboard.render_lines();
    assert!(rendered.contains("42: 1"));
    assert_snapshot!(rendered.trim_end(), @"<@42>: 1");
    assert_snapshot!(
        congratulations_text(42, 1, &state.config.settings.messages.congratulations),
        @"Congratulations <@42> 🥳! You are the 1st person to find a secret word!"
    );
}

#[test]
fn test_loaded_counts_keep_growing_and_are_saved() {
    let dir = tempfile::tempdir().unwrap();
    write_words(dir.path(), &["cGl6emE="]);
    fs::write(dir.path().join("leaderboard.json"), r#"{"7": 3}"#).unwrap();

    let state = AppState::load(config_for(dir.path())).unwrap();
    state.leaderboard.increment("7");
    state.leaderboard.increment("7");
    assert!(state.persist().unwrap());

    let saved: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("leaderboard.json")).unwrap())
            .unwrap();
    assert_eq!(saved, serde_json::json!({"7": 5}));

    let reloaded = LeaderboardStore::load(dir.path().join("leaderboard.json")).unwrap();
    assert_eq!(reloaded.get("7"), 5);
}

#[tokio::test]
async fn test_direct_message_approval_removes_role_once() {
    let dir = tempfile::tempdir().unwrap();
    write_words(dir.path(), &[]);
    let state = AppState::load(config_for(dir.path())).unwrap();

    let pending = state
        .open_verification("9001", "42", "newbie", "hi, I'm new here")
        .await;
    assert_eq!(state.open_verification_count().await, 1);

    // The moderator clicks the Accept button posted with the request
    let rows = verification_buttons(&pending.id, false);
    let row = serde_json::to_value(&rows[0]).unwrap();
    let accept_id = row["components"][0]["custom_id"].as_str().unwrap().to_string();
    let (_, id) = parse_verify_custom_id(&accept_id).unwrap();

    let first = state.approve_verification(id).await.unwrap();
    assert_eq!(
        first.side_effect(),
        Some(SideEffect::RemoveRestrictedRole {
            user_id: "42".to_string()
        })
    );
    assert_eq!(first.pending().state, VerificationState::Approved);

    let second = state.approve_verification(id).await.unwrap();
    assert_eq!(second.side_effect(), None);
    assert_eq!(state.open_verification_count().await, 0);
}

#[test]
fn test_concurrent_messages_lose_no_points() {
    let dir = tempfile::tempdir().unwrap();
    write_words(dir.path(), &["cGl6emE="]);
    let state = Arc::new(AppState::load(config_for(dir.path())).unwrap());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let state = Arc::clone(&state);
            std::thread::spawn(move || {
                for _ in 0..50 {
                    state.record_message("42", "pizza");
                    state.record_message("43", "no match");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(state.leaderboard.get("42"), 400);
    assert_eq!(state.leaderboard.get("43"), 0);
}

#[test]
fn test_corrupt_leaderboard_fails_startup() {
    let dir = tempfile::tempdir().unwrap();
    write_words(dir.path(), &["cGl6emE="]);
    fs::write(dir.path().join("leaderboard.json"), "{\"7\": ").unwrap();

    assert!(AppState::load(config_for(dir.path())).is_err());
}
