use std::collections::VecDeque;

use crate::models::{Highlight, Sample, TimeSeries};

/// Finds intervals where a signal rises above a rolling baseline by the
/// sensitivity multiplier. Lower sensitivity means a smaller excess is
/// enough to trigger, so lower values produce more candidates.
#[derive(Debug, Clone)]
pub struct SpikeDetector {
    pub sensitivity: f64,
    /// Trailing lookback used for the baseline mean, in seconds.
    pub baseline_window_secs: f64,
    /// Candidates shorter than this are discarded as single-sample noise.
    pub min_duration_secs: f64,
}

impl Default for SpikeDetector {
    fn default() -> Self {
        Self {
            sensitivity: 2.0,
            baseline_window_secs: 60.0,
            min_duration_secs: 3.0,
        }
    }
}

struct OpenCandidate {
    start: f64,
    end: f64,
    raw_score: f64,
    peak_t: f64,
    peak_excess: f64,
    peak_value: f64,
    peak_baseline: f64,
}

impl SpikeDetector {
    pub fn new(sensitivity: f64) -> Self {
        Self {
            sensitivity,
            ..Default::default()
        }
    }

    pub fn detect(&self, series: &TimeSeries) -> Vec<Highlight> {
        let samples = series.samples();
        if samples.is_empty() {
            return Vec::new();
        }

        let mut window: VecDeque<Sample> = VecDeque::new();
        let mut window_sum = 0.0;
        let mut open: Option<OpenCandidate> = None;
        let mut candidates = Vec::new();

        for (i, sample) in samples.iter().enumerate() {
            while let Some(front) = window.front() {
                if front.t < sample.t - self.baseline_window_secs {
                    window_sum -= front.value;
                    window.pop_front();
                } else {
                    break;
                }
            }

            // Mean of the trailing samples. With no history the sample is
            // its own baseline, so a series never triggers on its first
            // point.
            let baseline = if window.is_empty() {
                sample.value
            } else {
                window_sum / window.len() as f64
            };

            let triggered = if baseline <= 0.0 {
                sample.value > 0.0
            } else {
                sample.value > baseline * self.sensitivity
            };

            let dt = samples
                .get(i + 1)
                .map(|next| next.t - sample.t)
                .unwrap_or_else(|| series.step());

            if triggered {
                let excess = sample.value - baseline;
                let sample_end = sample.t + dt.min(series.step());
                match &mut open {
                    Some(candidate) => {
                        candidate.end = sample_end;
                        candidate.raw_score += excess * dt;
                        if excess > candidate.peak_excess {
                            candidate.peak_t = sample.t;
                            candidate.peak_excess = excess;
                            candidate.peak_value = sample.value;
                            candidate.peak_baseline = baseline;
                        }
                    }
                    None => {
                        open = Some(OpenCandidate {
                            start: sample.t,
                            end: sample_end,
                            raw_score: excess * dt,
                            peak_t: sample.t,
                            peak_excess: excess,
                            peak_value: sample.value,
                            peak_baseline: baseline,
                        });
                    }
                }
            } else if let Some(candidate) = open.take() {
                self.close(candidate, series, &mut candidates);
            }

            window_sum += sample.value;
            window.push_back(*sample);
        }

        if let Some(candidate) = open.take() {
            self.close(candidate, series, &mut candidates);
        }

        candidates
    }

    fn close(&self, candidate: OpenCandidate, series: &TimeSeries, out: &mut Vec<Highlight>) {
        if candidate.end - candidate.start < self.min_duration_secs {
            return;
        }

        // Same squash the chat scorer historically used: ratio into (0, 1)
        let ratio = candidate.peak_value / (candidate.peak_baseline + 1.0);
        let confidence = ratio / (ratio + 1.0);

        out.push(Highlight {
            start: candidate.start,
            end: candidate.end,
            peak: candidate.peak_t,
            source: series.source(),
            raw_score: candidate.raw_score.max(0.0),
            confidence,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SignalSource, TimeSeries};

    fn series(step: f64, values: &[f64]) -> TimeSeries {
        let samples = values
            .iter()
            .enumerate()
            .map(|(i, &value)| Sample {
                t: i as f64 * step,
                value,
            })
            .collect();
        TimeSeries::new(SignalSource::Chat, step, samples).unwrap()
    }

    #[test]
    fn test_flat_series_yields_no_candidates() {
        let detector = SpikeDetector::default();
        let candidates = detector.detect(&series(10.0, &[5.0; 30]));
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_single_tenfold_spike_covers_its_bucket() {
        // Flat baseline of 2 msg/bucket with a 10x burst at t=100..110
        let mut values = vec![2.0; 30];
        values[10] = 20.0;
        let detector = SpikeDetector::default();

        let candidates = detector.detect(&series(10.0, &values));

        assert_eq!(candidates.len(), 1);
        let spike = &candidates[0];
        assert!(spike.start >= 90.0 && spike.start <= 110.0);
        assert!(spike.end >= 100.0 && spike.end <= 120.0);
        assert!(spike.peak >= spike.start && spike.peak <= spike.end);
        assert!(spike.raw_score > 0.0);
        assert!(spike.confidence > 0.0 && spike.confidence < 1.0);
    }

    #[test]
    fn test_never_emits_inverted_or_short_intervals() {
        let mut values = vec![1.0; 120];
        values[30] = 50.0;
        values[31] = 40.0;
        values[32] = 35.0;
        values[70] = 30.0;
        let detector = SpikeDetector {
            sensitivity: 2.0,
            baseline_window_secs: 60.0,
            min_duration_secs: 3.0,
        };

        // 1s steps: the lone sample at t=70 is too short to survive
        let candidates = detector.detect(&series(1.0, &values));

        assert!(!candidates.is_empty());
        for c in &candidates {
            assert!(c.start < c.end);
            assert!(c.end - c.start >= 3.0);
        }
        assert!(!candidates.iter().any(|c| (c.start - 70.0).abs() < 1.5));
    }

    #[test]
    fn test_lower_sensitivity_finds_more() {
        let mut values = vec![2.0; 40];
        for (i, v) in values.iter_mut().enumerate() {
            if i % 7 == 0 {
                *v = 4.0;
            }
        }
        let strict = SpikeDetector::new(3.0).detect(&series(10.0, &values)).len();
        let lax = SpikeDetector::new(1.2).detect(&series(10.0, &values)).len();

        assert!(lax >= strict);
        assert!(lax > 0);
    }

    #[test]
    fn test_zero_baseline_triggers_on_any_positive_value() {
        let mut values = vec![0.0; 20];
        values[10] = 1.0;
        values[11] = 1.0;
        let detector = SpikeDetector::default();

        let candidates = detector.detect(&series(10.0, &values));

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].start, 100.0);
    }

    #[test]
    fn test_consecutive_triggers_merge_into_one_candidate() {
        let mut values = vec![1.0; 60];
        for v in values.iter_mut().skip(20).take(5) {
            *v = 10.0;
        }
        let detector = SpikeDetector {
            sensitivity: 2.0,
            baseline_window_secs: 60.0,
            min_duration_secs: 3.0,
        };

        let candidates = detector.detect(&series(1.0, &values));

        assert_eq!(candidates.len(), 1);
        assert!((candidates[0].start - 20.0).abs() < 1e-9);
        assert!((candidates[0].end - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_spike_at_series_end_is_closed() {
        let mut values = vec![1.0; 30];
        for v in values.iter_mut().skip(26) {
            *v = 12.0;
        }
        let detector = SpikeDetector {
            sensitivity: 2.0,
            baseline_window_secs: 60.0,
            min_duration_secs: 3.0,
        };

        let candidates = detector.detect(&series(1.0, &values));

        assert_eq!(candidates.len(), 1);
        assert!((candidates[0].end - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_raw_score_rewards_duration() {
        let mut short = vec![1.0; 60];
        for v in short.iter_mut().skip(20).take(3) {
            *v = 10.0;
        }
        let mut long = vec![1.0; 60];
        for v in long.iter_mut().skip(20).take(10) {
            *v = 10.0;
        }
        let detector = SpikeDetector {
            sensitivity: 2.0,
            baseline_window_secs: 60.0,
            min_duration_secs: 3.0,
        };

        let short_score = detector.detect(&series(1.0, &short))[0].raw_score;
        let long_score = detector.detect(&series(1.0, &long))[0].raw_score;

        assert!(long_score > short_score);
    }
}
