use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ClipperError;
use crate::models::SignalSource;

/// Which signals drive detection for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionMethod {
    Chat,
    Audio,
    Vision,
    Hybrid,
}

impl DetectionMethod {
    pub fn uses(&self, source: SignalSource) -> bool {
        match self {
            DetectionMethod::Hybrid => true,
            DetectionMethod::Chat => source == SignalSource::Chat,
            DetectionMethod::Audio => source == SignalSource::Audio,
            DetectionMethod::Vision => source == SignalSource::Vision,
        }
    }
}

/// All knobs for one analysis run. Deserialized from JSON with unknown keys
/// ignored and missing keys defaulted, then validated before any work runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub method: DetectionMethod,
    /// Maximum number of highlights to select and cut.
    pub num_clips: usize,
    /// Duration ceiling for a single highlight, in seconds.
    pub clip_duration: f64,
    /// Spike threshold multiplier. Lower means more sensitive: a smaller
    /// excess over baseline is enough to trigger.
    pub sensitivity: f64,
    /// Seconds of slack applied around highlights during overlap checks.
    pub padding: f64,
    /// Per-source fusion weights. Missing sources weigh 1.0.
    pub weights: HashMap<SignalSource, f64>,

    pub chat_bucket_secs: f64,
    pub audio_hop_secs: f64,
    pub frame_interval_secs: f64,
    pub baseline_window_secs: f64,
    /// Duration floor for a candidate, in seconds.
    pub min_highlight_secs: f64,
    pub pre_buffer_secs: f64,
    pub post_buffer_secs: f64,

    pub vision_batch_size: usize,
    pub vision_timeout_secs: u64,
    /// Optional game name forwarded to the vision prompt.
    pub game_context: Option<String>,

    /// Weight chat messages by emotes/caps/unique chatters instead of a
    /// plain count.
    pub hype_weighting: bool,
    /// Re-encode clips for frame-exact cuts instead of stream copy.
    pub precise_cuts: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            method: DetectionMethod::Hybrid,
            num_clips: 5,
            clip_duration: 30.0,
            sensitivity: 2.0,
            padding: 5.0,
            weights: HashMap::new(),
            chat_bucket_secs: 10.0,
            audio_hop_secs: 1.0,
            frame_interval_secs: 10.0,
            baseline_window_secs: 60.0,
            min_highlight_secs: 3.0,
            pre_buffer_secs: 5.0,
            post_buffer_secs: 10.0,
            vision_batch_size: 4,
            vision_timeout_secs: 30,
            game_context: None,
            hype_weighting: false,
            precise_cuts: false,
        }
    }
}

impl AnalysisConfig {
    /// Parse a JSON option map. Unrecognized keys are ignored.
    pub fn from_json(json: &str) -> Result<Self, ClipperError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| ClipperError::Configuration(format!("failed to parse options: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ClipperError> {
        let invalid = |msg: String| Err(ClipperError::Configuration(msg));

        if self.num_clips == 0 {
            return invalid("num_clips must be > 0".to_string());
        }
        if !(self.clip_duration > 0.0) {
            return invalid(format!("clip_duration must be > 0, got {}", self.clip_duration));
        }
        if !(self.sensitivity > 0.0) {
            return invalid(format!("sensitivity must be > 0, got {}", self.sensitivity));
        }
        if !(self.padding >= 0.0) {
            return invalid(format!("padding must be >= 0, got {}", self.padding));
        }
        for (name, value) in [
            ("chat_bucket_secs", self.chat_bucket_secs),
            ("audio_hop_secs", self.audio_hop_secs),
            ("frame_interval_secs", self.frame_interval_secs),
            ("baseline_window_secs", self.baseline_window_secs),
            ("min_highlight_secs", self.min_highlight_secs),
        ] {
            if !(value > 0.0) {
                return invalid(format!("{name} must be > 0, got {value}"));
            }
        }
        if !(self.pre_buffer_secs >= 0.0 && self.post_buffer_secs >= 0.0) {
            return invalid("clip buffers must be >= 0".to_string());
        }
        if self.clip_duration < self.min_highlight_secs {
            return invalid(format!(
                "clip_duration {} is below the {}s highlight floor",
                self.clip_duration, self.min_highlight_secs
            ));
        }
        if self.vision_batch_size == 0 {
            return invalid("vision_batch_size must be > 0".to_string());
        }
        if let Some((source, weight)) = self
            .weights
            .iter()
            .find(|(_, w)| !(w.is_finite() && **w >= 0.0))
        {
            return invalid(format!("weight for {source} must be >= 0, got {weight}"));
        }
        let any_positive = [SignalSource::Chat, SignalSource::Audio, SignalSource::Vision]
            .into_iter()
            .filter(|s| self.method.uses(*s))
            .any(|s| self.weight(s) > 0.0);
        if !any_positive {
            return invalid("all weights for the active method are zero".to_string());
        }

        Ok(())
    }

    /// Fusion weight for a source; unspecified sources weigh 1.0.
    pub fn weight(&self, source: SignalSource) -> f64 {
        self.weights.get(&source).copied().unwrap_or(1.0)
    }
}
