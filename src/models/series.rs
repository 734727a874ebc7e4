use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ClipperError;

/// Which signal a series or candidate came from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SignalSource {
    Chat,
    Audio,
    Vision,
}

impl fmt::Display for SignalSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalSource::Chat => write!(f, "chat"),
            SignalSource::Audio => write!(f, "audio"),
            SignalSource::Vision => write!(f, "vision"),
        }
    }
}

impl std::error::Error for SignalSource {}

/// One point of an extracted signal: `t` in seconds from stream start.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub t: f64,
    pub value: f64,
}

/// A uniform view of one extractor's output: timestamped values with
/// strictly increasing timestamps. Built once per extraction, immutable
/// afterwards.
#[derive(Debug, Clone)]
pub struct TimeSeries {
    source: SignalSource,
    /// Nominal sample spacing in seconds (bucket width, RMS hop, or frame
    /// interval). Sampling may still be irregular; `step` gives the last
    /// sample of a spike its width.
    step: f64,
    samples: Vec<Sample>,
    /// Input records that could not be parsed and were skipped.
    skipped: u32,
    /// Vision frames whose score call failed and were held at the previous
    /// value.
    held: u32,
}

impl TimeSeries {
    pub fn new(
        source: SignalSource,
        step: f64,
        samples: Vec<Sample>,
    ) -> Result<Self, ClipperError> {
        let invalid = |reason: String| ClipperError::Extraction { source, reason };

        if samples.is_empty() {
            return Err(invalid("produced an empty series".to_string()));
        }
        if !(step.is_finite() && step > 0.0) {
            return Err(invalid(format!("invalid sample step {step}")));
        }
        for pair in samples.windows(2) {
            if pair[1].t <= pair[0].t {
                return Err(invalid(format!(
                    "timestamps not strictly increasing at t={}",
                    pair[1].t
                )));
            }
        }
        if let Some(bad) = samples
            .iter()
            .find(|s| !s.t.is_finite() || !s.value.is_finite())
        {
            return Err(invalid(format!("non-finite sample at t={}", bad.t)));
        }

        Ok(Self {
            source,
            step,
            samples,
            skipped: 0,
            held: 0,
        })
    }

    pub fn with_diagnostics(mut self, skipped: u32, held: u32) -> Self {
        self.skipped = skipped;
        self.held = held;
        self
    }

    pub fn source(&self) -> SignalSource {
        self.source
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn skipped(&self) -> u32 {
        self.skipped
    }

    pub fn held(&self) -> u32 {
        self.held
    }

    /// Timestamp of the first sample.
    pub fn start(&self) -> f64 {
        self.samples[0].t
    }

    /// Timestamp of the last sample plus its nominal width.
    pub fn end(&self) -> f64 {
        self.samples[self.samples.len() - 1].t + self.step
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples(ts: &[(f64, f64)]) -> Vec<Sample> {
        ts.iter().map(|&(t, value)| Sample { t, value }).collect()
    }

    #[test]
    fn test_rejects_empty_series() {
        let result = TimeSeries::new(SignalSource::Chat, 10.0, vec![]);
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_unordered_timestamps() {
        let result = TimeSeries::new(
            SignalSource::Audio,
            1.0,
            samples(&[(0.0, 1.0), (2.0, 1.0), (1.0, 1.0)]),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_duplicate_timestamps() {
        let result = TimeSeries::new(
            SignalSource::Audio,
            1.0,
            samples(&[(0.0, 1.0), (1.0, 2.0), (1.0, 3.0)]),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_span_includes_last_sample_width() {
        let series = TimeSeries::new(
            SignalSource::Chat,
            10.0,
            samples(&[(0.0, 1.0), (10.0, 2.0), (20.0, 3.0)]),
        )
        .unwrap();

        assert_eq!(series.start(), 0.0);
        assert_eq!(series.end(), 30.0);
        assert_eq!(series.len(), 3);
    }

    #[test]
    fn test_diagnostics_carry_through() {
        let series = TimeSeries::new(SignalSource::Vision, 5.0, samples(&[(0.0, 4.0)]))
            .unwrap()
            .with_diagnostics(3, 1);

        assert_eq!(series.skipped(), 3);
        assert_eq!(series.held(), 1);
    }
}
