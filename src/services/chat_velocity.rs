use std::collections::{HashMap, HashSet};

use crate::error::ClipperError;
use crate::models::{ChatMessage, ParsedChat, Sample, SignalSource, TimeSeries};

const EMOTE_KEYWORDS: [&str; 8] = [
    "Pog", "LUL", "OMEGALUL", "KEKW", "Kappa", "😂", "😱", "🔥",
];

/// Buckets chat messages into fixed windows and emits one sample per bucket.
/// The plain mode counts messages; hype weighting also scores emotes,
/// shouting, and the number of distinct chatters in the bucket.
#[derive(Debug, Clone)]
pub struct ChatVelocityExtractor {
    bucket_secs: f64,
    hype_weighting: bool,
}

impl ChatVelocityExtractor {
    pub fn new(bucket_secs: f64) -> Self {
        Self {
            bucket_secs,
            hype_weighting: false,
        }
    }

    pub fn with_hype_weighting(mut self) -> Self {
        self.hype_weighting = true;
        self
    }

    pub fn extract(&self, chat: &ParsedChat) -> Result<TimeSeries, ClipperError> {
        if chat.is_empty() {
            return Err(ClipperError::Extraction {
                source: SignalSource::Chat,
                reason: "no parseable timestamped messages".to_string(),
            });
        }

        let mut bucket_values: HashMap<u64, f64> = HashMap::new();
        let mut bucket_users: HashMap<u64, HashSet<&str>> = HashMap::new();

        for msg in &chat.messages {
            let bucket = (msg.offset_secs / self.bucket_secs).floor() as u64;
            let score = if self.hype_weighting {
                message_score(msg)
            } else {
                1.0
            };
            *bucket_values.entry(bucket).or_insert(0.0) += score;
            if self.hype_weighting {
                bucket_users
                    .entry(bucket)
                    .or_default()
                    .insert(msg.username.as_str());
            }
        }

        // Distinct chatters in a burst matter more than one user spamming
        for (bucket, users) in &bucket_users {
            *bucket_values.get_mut(bucket).unwrap() += users.len() as f64 * 2.0;
        }

        // Materialize silent buckets from stream start so the detector's
        // baseline sees the quiet stretches between bursts.
        let last_bucket = *bucket_values.keys().max().unwrap();
        let samples: Vec<Sample> = (0..=last_bucket)
            .map(|bucket| Sample {
                t: bucket as f64 * self.bucket_secs,
                value: bucket_values.get(&bucket).copied().unwrap_or(0.0),
            })
            .collect();

        Ok(TimeSeries::new(SignalSource::Chat, self.bucket_secs, samples)?
            .with_diagnostics(chat.skipped, 0))
    }
}

fn message_score(msg: &ChatMessage) -> f64 {
    let mut score = 1.0;

    // Emoji and other non-ASCII symbols
    score += msg.body.chars().filter(|c| (*c as u32) > 1000).count() as f64;

    let lower = msg.body.to_lowercase();
    for emote in EMOTE_KEYWORDS {
        if lower.contains(&emote.to_lowercase()) {
            score += 2.0;
        }
    }

    // Shouted words
    score += msg
        .body
        .split_whitespace()
        .filter(|w| w.len() > 2 && w.chars().all(|c| c.is_uppercase()))
        .count() as f64;

    score
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(offset_secs: f64, username: &str, body: &str) -> ChatMessage {
        ChatMessage {
            offset_secs,
            username: username.to_string(),
            body: body.to_string(),
            created_at: None,
        }
    }

    #[test]
    fn test_counts_messages_per_bucket() {
        let chat = ParsedChat {
            messages: vec![
                message(1.0, "a", "hi"),
                message(3.0, "b", "hello"),
                message(25.0, "c", "late"),
            ],
            skipped: 2,
        };

        let series = ChatVelocityExtractor::new(10.0).extract(&chat).unwrap();

        // Buckets 0, 10, 20 materialized; bucket 10 is silent
        assert_eq!(series.len(), 3);
        assert_eq!(series.samples()[0], Sample { t: 0.0, value: 2.0 });
        assert_eq!(series.samples()[1], Sample { t: 10.0, value: 0.0 });
        assert_eq!(series.samples()[2], Sample { t: 20.0, value: 1.0 });
        assert_eq!(series.skipped(), 2);
    }

    #[test]
    fn test_empty_chat_is_an_error() {
        let chat = ParsedChat {
            messages: vec![],
            skipped: 10,
        };
        let result = ChatVelocityExtractor::new(10.0).extract(&chat);
        assert!(matches!(
            result,
            Err(ClipperError::Extraction {
                source: SignalSource::Chat,
                ..
            })
        ));
    }

    #[test]
    fn test_hype_weighting_scores_emotes_and_caps() {
        let plain = message(0.0, "a", "nice play");
        let hype = message(0.0, "a", "KEKW THAT WAS INSANE");

        assert_eq!(message_score(&plain), 1.0);
        // 1 base + 2 emote + 3 shouted words ("THAT", "WAS", "INSANE")
        assert_eq!(message_score(&hype), 6.0);
    }

    #[test]
    fn test_unique_chatters_boost_bucket() {
        let burst_one_user = ParsedChat {
            messages: vec![
                message(0.0, "a", "go"),
                message(1.0, "a", "go"),
                message(2.0, "a", "go"),
            ],
            skipped: 0,
        };
        let burst_many_users = ParsedChat {
            messages: vec![
                message(0.0, "a", "go"),
                message(1.0, "b", "go"),
                message(2.0, "c", "go"),
            ],
            skipped: 0,
        };

        let extractor = ChatVelocityExtractor::new(10.0).with_hype_weighting();
        let one = extractor.extract(&burst_one_user).unwrap();
        let many = extractor.extract(&burst_many_users).unwrap();

        assert!(many.samples()[0].value > one.samples()[0].value);
    }
}
