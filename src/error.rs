use thiserror::Error;

use crate::models::SignalSource;

/// Error taxonomy for a single analysis run.
///
/// Per-frame scoring failures and per-clip extraction failures are not
/// represented here; they are isolated into diagnostics (`TimeSeries::held`,
/// `ClipOutcome::error`) so one bad frame or clip never aborts the run.
#[derive(Debug, Error)]
pub enum ClipperError {
    /// An option value failed validation. Raised before any extraction work.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// The source media could not be obtained. Always fatal for the run.
    #[error("failed to acquire source media: {0}")]
    Acquisition(String),

    /// One extractor could not produce a series from its input. Fatal only
    /// when no other source remains active; in hybrid mode the pipeline
    /// degrades and records a warning instead of propagating this.
    #[error("{source} extraction failed: {reason}")]
    Extraction {
        source: SignalSource,
        reason: String,
    },

    /// The requested method has no usable inputs (chat log absent, vision
    /// scorer not configured, ...). Raised before any media work starts.
    #[error("no usable signal sources for the requested method")]
    NoActiveSources,

    /// ffmpeg/ffprobe invocation failed in a way that prevents analysis.
    #[error("media tool failure: {0}")]
    Media(#[source] anyhow::Error),
}
