mod chat;
mod clip;
mod highlight;
mod series;

pub use chat::{ChatMessage, ParsedChat};
pub use clip::{ClipOutcome, ClipRequest, RunReport, SourceStats};
pub use highlight::{Highlight, RankedHighlight, SourceContribution};
pub use series::{Sample, SignalSource, TimeSeries};
