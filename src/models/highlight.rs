use serde::Serialize;
use uuid::Uuid;

use crate::models::SignalSource;

/// A candidate interval emitted by the spike detector for one source.
#[derive(Debug, Clone, Serialize)]
pub struct Highlight {
    pub start: f64,
    pub end: f64,
    /// Timestamp of the maximum excess over baseline within the interval.
    pub peak: f64,
    pub source: SignalSource,
    /// Integral of `value - baseline` over the interval.
    pub raw_score: f64,
    /// Peak-to-baseline ratio squashed into (0, 1).
    pub confidence: f64,
}

impl Highlight {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Any positive overlap in time.
    pub fn overlaps(&self, other: &Highlight) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// One source's contribution to a (possibly fused) ranked highlight.
#[derive(Debug, Clone, Serialize)]
pub struct SourceContribution {
    pub source: SignalSource,
    pub normalized_score: f64,
}

/// A candidate after normalization and fusion: score in [0, 1], with the
/// per-source breakdown that produced it.
#[derive(Debug, Clone, Serialize)]
pub struct RankedHighlight {
    pub id: String,
    pub start: f64,
    pub end: f64,
    pub peak: f64,
    pub score: f64,
    pub sources: Vec<SourceContribution>,
}

impl RankedHighlight {
    pub fn new(
        start: f64,
        end: f64,
        peak: f64,
        score: f64,
        sources: Vec<SourceContribution>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            start,
            end,
            peak,
            score,
            sources,
        }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Overlap check with `padding` seconds applied to both intervals.
    pub fn padded_overlaps(&self, other: &RankedHighlight, padding: f64) -> bool {
        self.start - padding < other.end + padding && other.start - padding < self.end + padding
    }

    /// `chat:0.83|audio:0.61` style summary for the run report.
    pub fn source_breakdown(&self) -> String {
        self.sources
            .iter()
            .map(|c| format!("{}:{:.2}", c.source, c.normalized_score))
            .collect::<Vec<_>>()
            .join("|")
    }
}
