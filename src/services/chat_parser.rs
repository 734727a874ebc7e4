use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Deserialize;

use crate::models::{ChatMessage, ParsedChat};

/// Parses `[HH:MM:SS] username: message` chat logs. Lines that do not match
/// are counted and skipped, never fatal for the whole log.
pub struct ChatLogParser {
    line_pattern: Regex,
}

impl ChatLogParser {
    pub fn new() -> Self {
        Self {
            line_pattern: Regex::new(r"^\[(\d{2}):(\d{2}):(\d{2})\]\s+(\S+):\s+(.+)$").unwrap(),
        }
    }

    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<ParsedChat> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read chat log: {:?}", path.as_ref()))?;

        Ok(self.parse_content(&content))
    }

    pub fn parse_content(&self, content: &str) -> ParsedChat {
        let mut parsed = ParsedChat::default();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match self.parse_line(line) {
                Some(msg) => parsed.messages.push(msg),
                None => parsed.skipped += 1,
            }
        }

        parsed
    }

    fn parse_line(&self, line: &str) -> Option<ChatMessage> {
        let caps = self.line_pattern.captures(line)?;

        let hours: f64 = caps[1].parse().ok()?;
        let minutes: f64 = caps[2].parse().ok()?;
        let seconds: f64 = caps[3].parse().ok()?;

        Some(ChatMessage {
            offset_secs: hours * 3600.0 + minutes * 60.0 + seconds,
            username: caps[4].to_string(),
            body: caps[5].to_string(),
            created_at: None,
        })
    }
}

impl Default for ChatLogParser {
    fn default() -> Self {
        Self::new()
    }
}

// twitch-dl JSON chat shape. Every field is optional so one malformed
// comment is skipped instead of failing the file.
#[derive(Debug, Deserialize)]
struct JsonChatFile {
    #[serde(default)]
    comments: Vec<JsonComment>,
}

#[derive(Debug, Deserialize)]
struct JsonComment {
    content_offset_seconds: Option<f64>,
    created_at: Option<DateTime<Utc>>,
    commenter: Option<JsonCommenter>,
    message: Option<JsonMessageBody>,
}

#[derive(Debug, Deserialize)]
struct JsonCommenter {
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JsonMessageBody {
    body: Option<String>,
}

/// Parse a twitch-dl style JSON chat export.
pub fn parse_json_chat(content: &str) -> Result<ParsedChat> {
    let file: JsonChatFile =
        serde_json::from_str(content).context("Failed to parse JSON chat file")?;

    let mut parsed = ParsedChat::default();
    for comment in file.comments {
        let offset = comment.content_offset_seconds.filter(|t| t.is_finite() && *t >= 0.0);
        let username = comment.commenter.and_then(|c| c.display_name);
        let body = comment.message.and_then(|m| m.body);

        match (offset, username, body) {
            (Some(offset_secs), Some(username), Some(body)) => {
                parsed.messages.push(ChatMessage {
                    offset_secs,
                    username,
                    body,
                    created_at: comment.created_at,
                });
            }
            _ => parsed.skipped += 1,
        }
    }

    Ok(parsed)
}

/// Pick the parser from the file extension: `.json` is a twitch-dl export,
/// anything else is a bracketed log.
pub fn parse_chat_file<P: AsRef<Path>>(path: P) -> Result<ParsedChat> {
    let path = path.as_ref();
    if path.extension().map(|e| e == "json").unwrap_or(false) {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read chat file: {path:?}"))?;
        parse_json_chat(&content)
    } else {
        ChatLogParser::new().parse_file(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_log_lines() {
        let content = "\
[00:01:40] viewer_one: POG that was insane
[00:01:41] viewer_two: LUL
not a chat line
[01:00:00] viewer_three: gg";

        let parsed = ChatLogParser::new().parse_content(content);

        assert_eq!(parsed.messages.len(), 3);
        assert_eq!(parsed.skipped, 1);
        assert_eq!(parsed.messages[0].offset_secs, 100.0);
        assert_eq!(parsed.messages[0].username, "viewer_one");
        assert_eq!(parsed.messages[2].offset_secs, 3600.0);
    }

    #[test]
    fn test_parse_json_chat() {
        let content = r#"{
            "comments": [
                {
                    "content_offset_seconds": 95,
                    "created_at": "2025-11-02T19:21:15Z",
                    "commenter": {"display_name": "viewer_one"},
                    "message": {"body": "KEKW"}
                },
                {
                    "content_offset_seconds": null,
                    "commenter": {"display_name": "broken"},
                    "message": {"body": "no timestamp"}
                }
            ]
        }"#;

        let parsed = parse_json_chat(content).unwrap();

        assert_eq!(parsed.messages.len(), 1);
        assert_eq!(parsed.skipped, 1);
        assert_eq!(parsed.messages[0].offset_secs, 95.0);
        assert_eq!(parsed.messages[0].body, "KEKW");
        assert!(parsed.messages[0].created_at.is_some());
    }

    #[test]
    fn test_json_without_comments_is_empty() {
        let parsed = parse_json_chat("{}").unwrap();
        assert!(parsed.is_empty());
        assert_eq!(parsed.skipped, 0);
    }
}
