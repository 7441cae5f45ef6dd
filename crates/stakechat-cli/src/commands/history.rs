//! /history command - numbered conversation turns

use chrono::{DateTime, Local};
use stakechat_ai::ConversationTurn;

pub struct HistoryCommand;

impl HistoryCommand {
    pub fn render(turns: &[ConversationTurn]) -> String {
        if turns.is_empty() {
            return "No messages yet.".to_string();
        }
        turns
            .iter()
            .enumerate()
            .map(|(i, turn)| {
                format!(
                    "{:>3}. {} [{}] {}",
                    i + 1,
                    clock(turn.timestamp()),
                    turn.sender().label(),
                    turn.content()
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Local wall-clock time of a turn
fn clock(timestamp_millis: i64) -> String {
    match DateTime::from_timestamp_millis(timestamp_millis) {
        Some(utc) => utc.with_timezone(&Local).format("%H:%M:%S").to_string(),
        None => "--:--:--".to_string(),
    }
}
