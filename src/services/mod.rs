pub mod acquisition;
pub mod audio_energy;
pub mod chat_parser;
pub mod chat_provider;
pub mod chat_velocity;
pub mod detector;
pub mod ffmpeg;
pub mod merger;
pub mod planner;
pub mod scorer;
pub mod vision;

pub use acquisition::MediaAcquirer;
pub use audio_energy::AudioEnergyExtractor;
pub use chat_parser::{parse_chat_file, parse_json_chat, ChatLogParser};
pub use chat_provider::ChatReplayClient;
pub use chat_velocity::ChatVelocityExtractor;
pub use detector::SpikeDetector;
pub use ffmpeg::{FFmpeg, VideoInfo};
pub use merger::IntervalMerger;
pub use planner::{seconds_to_timestamp, write_report, ClipPlanner};
pub use scorer::HighlightScorer;
pub use vision::{FrameScore, VisionScoreExtractor, VisionScorer};
