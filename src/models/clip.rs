use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;

use crate::models::{RankedHighlight, SignalSource};

/// A concrete extraction request handed to the media tool. Produced and
/// consumed entirely within one run, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct ClipRequest {
    pub start: f64,
    pub end: f64,
    pub output_path: PathBuf,
}

/// What happened to one planned clip. A failure here never aborts the
/// remaining clips; the caller decides whether to retry or skip.
#[derive(Debug, Clone, Serialize)]
pub struct ClipOutcome {
    pub request: ClipRequest,
    pub highlight: RankedHighlight,
    /// `None` on success, otherwise the extraction failure message.
    pub error: Option<String>,
}

impl ClipOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Extraction counters for one source.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SourceStats {
    pub candidates: usize,
    pub skipped: u32,
    pub held: u32,
}

/// Everything a completed run reports, even under partial failure:
/// candidates per source, degraded sources, the selected set, and the
/// per-clip outcomes.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub per_source: BTreeMap<SignalSource, SourceStats>,
    /// Sources that failed extraction and were dropped from a hybrid run.
    pub degraded: Vec<(SignalSource, String)>,
    /// True when no source produced a candidate and the evenly-spaced
    /// fallback windows were used instead.
    pub fallback_sampling: bool,
    pub selected: Vec<RankedHighlight>,
    pub clips: Vec<ClipOutcome>,
}

impl RunReport {
    pub fn clips_succeeded(&self) -> usize {
        self.clips.iter().filter(|c| c.succeeded()).count()
    }

    pub fn clips_failed(&self) -> usize {
        self.clips.len() - self.clips_succeeded()
    }

    pub fn total_candidates(&self) -> usize {
        self.per_source.values().map(|s| s.candidates).sum()
    }
}
