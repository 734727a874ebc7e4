//! Finds highlight-worthy moments in stream VODs by fusing chat velocity,
//! audio loudness, and vision-model excitement scores, then cuts the
//! top-ranked windows into clips with ffmpeg.

mod config;
mod error;
mod models;
mod pipeline;
mod services;

pub use config::{AnalysisConfig, DetectionMethod};
pub use error::ClipperError;
pub use models::{
    ChatMessage, ClipOutcome, ClipRequest, Highlight, ParsedChat, RankedHighlight, RunReport,
    Sample, SignalSource, SourceContribution, SourceStats, TimeSeries,
};
pub use pipeline::{AnalysisInput, ChatInput, HighlightPipeline, LiveMonitor};
pub use services::{
    parse_chat_file, parse_json_chat, seconds_to_timestamp, write_report, AudioEnergyExtractor,
    ChatLogParser, ChatReplayClient, ChatVelocityExtractor, ClipPlanner, FFmpeg, FrameScore,
    HighlightScorer, IntervalMerger, MediaAcquirer, SpikeDetector, VideoInfo,
    VisionScoreExtractor, VisionScorer,
};
