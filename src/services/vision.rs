use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;

use crate::error::ClipperError;
use crate::models::{Sample, SignalSource, TimeSeries};

const API_URL: &str = "https://api.anthropic.com/v1/messages";
const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// Excitement rating for one sampled frame.
#[derive(Debug, Clone, Deserialize)]
pub struct FrameScore {
    pub excitement_score: f64,
    #[serde(default)]
    pub reasoning: String,
}

/// Request body for the messages API
#[derive(Debug, Serialize)]
struct ApiRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<ApiMessage>,
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: String,
    content: Vec<ApiContent>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum ApiContent {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image")]
    Image { source: ImageSource },
}

#[derive(Debug, Serialize)]
struct ImageSource {
    #[serde(rename = "type")]
    source_type: String,
    media_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    content: Vec<ApiResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ApiResponseContent {
    text: Option<String>,
}

/// Scores a single frame's highlight potential through the vision model.
/// Each call is independent and may fail; the extractor decides what a
/// failure means for the series.
#[derive(Debug, Clone)]
pub struct VisionScorer {
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl VisionScorer {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            model: DEFAULT_MODEL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Rate one frame 0-10. `game_context` helps the model read the HUD.
    pub async fn score_frame(
        &self,
        frame_path: &Path,
        game_context: Option<&str>,
    ) -> Result<FrameScore> {
        let image_data = load_frame_as_base64(frame_path)?;

        let request = ApiRequest {
            model: self.model.clone(),
            max_tokens: 200,
            messages: vec![ApiMessage {
                role: "user".to_string(),
                content: vec![
                    ApiContent::Image {
                        source: ImageSource {
                            source_type: "base64".to_string(),
                            media_type: "image/jpeg".to_string(),
                            data: image_data,
                        },
                    },
                    ApiContent::Text {
                        text: build_prompt(game_context),
                    },
                ],
            }],
        };

        let response = self
            .client
            .post(API_URL)
            .header("Content-Type", "application/json")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&request)
            .send()
            .await
            .map_err(|e| anyhow!("Failed to call vision API: {}", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Vision API error ({}): {}", status, error_text));
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| anyhow!("Failed to parse vision response: {}", e))?;

        let response_text = api_response
            .content
            .iter()
            .find_map(|c| c.text.clone())
            .ok_or_else(|| anyhow!("No text in vision response"))?;

        parse_score_response(&response_text)
    }
}

fn build_prompt(game_context: Option<&str>) -> String {
    let context_line = match game_context {
        Some(game) => format!(" The game being played is {game}."),
        None => String::new(),
    };

    format!(
        r#"Analyze this gaming/streaming frame for highlight potential.{context_line}

Rate the excitement level from 0-10 based on:
- Visual intensity (explosions, effects, action)
- UI indicators (kills, achievements, score changes)
- Unusual or impressive moments
- Dramatic situations

Return ONLY a JSON object with this format:
{{"excitement_score": <0-10>, "reasoning": "<brief explanation>"}}"#
    )
}

/// The model sometimes wraps the JSON in prose; cut it out by brace span.
fn parse_score_response(response: &str) -> Result<FrameScore> {
    let json_start = response.find('{');
    let json_end = response.rfind('}');

    match (json_start, json_end) {
        (Some(start), Some(end)) if end > start => {
            let mut score: FrameScore = serde_json::from_str(&response[start..=end])
                .map_err(|e| anyhow!("Failed to parse frame score JSON: {}", e))?;
            score.excitement_score = score.excitement_score.clamp(0.0, 10.0);
            Ok(score)
        }
        _ => Err(anyhow!("No valid JSON found in response: {}", response)),
    }
}

fn load_frame_as_base64(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(anyhow!("Frame not found: {}", path.display()));
    }
    let bytes = std::fs::read(path)?;
    Ok(BASE64.encode(&bytes))
}

/// Turns sampled frames into a 0-10 excitement series. Scoring calls run in
/// bounded-concurrency batches with a per-call timeout; a failed frame holds
/// the previous frame's value and bumps the `held` diagnostic.
#[derive(Debug, Clone)]
pub struct VisionScoreExtractor {
    pub interval_secs: f64,
    pub batch_size: usize,
    pub timeout: Duration,
    pub game_context: Option<String>,
}

impl VisionScoreExtractor {
    pub fn new(interval_secs: f64) -> Self {
        Self {
            interval_secs,
            batch_size: 4,
            timeout: Duration::from_secs(30),
            game_context: None,
        }
    }

    pub async fn extract(
        &self,
        scorer: &VisionScorer,
        frames: &[(f64, PathBuf)],
    ) -> Result<TimeSeries, ClipperError> {
        if frames.is_empty() {
            return Err(ClipperError::Extraction {
                source: SignalSource::Vision,
                reason: "no frames were sampled".to_string(),
            });
        }

        let mut scores: Vec<Option<f64>> = vec![None; frames.len()];

        for (batch_index, batch) in frames.chunks(self.batch_size.max(1)).enumerate() {
            let mut tasks: JoinSet<(usize, Result<FrameScore>)> = JoinSet::new();
            let base = batch_index * self.batch_size.max(1);

            for (offset, (_, path)) in batch.iter().enumerate() {
                let scorer = scorer.clone();
                let path = path.clone();
                let game_context = self.game_context.clone();
                let timeout = self.timeout;
                tasks.spawn(async move {
                    let result =
                        tokio::time::timeout(timeout, scorer.score_frame(&path, game_context.as_deref()))
                            .await
                            .unwrap_or_else(|_| Err(anyhow!("scoring call timed out")));
                    (base + offset, result)
                });
            }

            while let Some(joined) = tasks.join_next().await {
                if let Ok((index, result)) = joined {
                    match result {
                        Ok(frame_score) => scores[index] = Some(frame_score.excitement_score),
                        Err(e) => {
                            log::warn!("frame {index} scoring failed: {e:#}");
                        }
                    }
                }
            }
        }

        // Hold failed frames at the previous value so the series stays
        // aligned with the sampling grid
        let mut held = 0_u32;
        let mut previous = 0.0;
        let samples: Vec<Sample> = frames
            .iter()
            .zip(scores.iter())
            .map(|((t, _), score)| {
                let value = match score {
                    Some(v) => {
                        previous = *v;
                        *v
                    }
                    None => {
                        held += 1;
                        previous
                    }
                };
                Sample { t: *t, value }
            })
            .collect();

        Ok(
            TimeSeries::new(SignalSource::Vision, self.interval_secs, samples)?
                .with_diagnostics(0, held),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_score_response() {
        let response = r#"Here is my rating:
{"excitement_score": 8, "reasoning": "Triple kill banner on screen"}"#;

        let score = parse_score_response(response).unwrap();

        assert_eq!(score.excitement_score, 8.0);
        assert_eq!(score.reasoning, "Triple kill banner on screen");
    }

    #[test]
    fn test_parse_clamps_out_of_range_scores() {
        let score = parse_score_response(r#"{"excitement_score": 14.5}"#).unwrap();
        assert_eq!(score.excitement_score, 10.0);
    }

    #[test]
    fn test_parse_rejects_missing_json() {
        assert!(parse_score_response("the frame looks calm").is_err());
    }

    #[test]
    fn test_prompt_includes_game_context() {
        let prompt = build_prompt(Some("Valorant"));
        assert!(prompt.contains("Valorant"));
        assert!(build_prompt(None).contains("excitement_score"));
    }

    #[tokio::test]
    async fn test_extract_requires_frames() {
        let extractor = VisionScoreExtractor::new(10.0);
        let scorer = VisionScorer::new("test-key".to_string());

        let result = extractor.extract(&scorer, &[]).await;

        assert!(matches!(
            result,
            Err(ClipperError::Extraction {
                source: SignalSource::Vision,
                ..
            })
        ));
    }
}
