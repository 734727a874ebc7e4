use crate::models::RankedHighlight;

/// Selects the final non-overlapping highlight set: highest score wins
/// contested time, capped at `max_count`, returned in ascending start order.
#[derive(Debug, Clone)]
pub struct IntervalMerger {
    pub max_count: usize,
    pub padding: f64,
    /// Duration floor; shorter windows are extended symmetrically.
    pub min_duration: f64,
    /// Duration ceiling; longer windows are truncated around their peak.
    pub max_duration: f64,
}

impl IntervalMerger {
    pub fn merge(&self, candidates: Vec<RankedHighlight>) -> Vec<RankedHighlight> {
        let mut candidates: Vec<RankedHighlight> = candidates
            .into_iter()
            .map(|mut c| {
                self.clamp_duration(&mut c);
                c
            })
            .collect();

        // Highest score first; earlier start breaks ties so the pass is
        // deterministic
        candidates.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.start.total_cmp(&b.start))
        });

        let mut selected: Vec<RankedHighlight> = Vec::new();
        for candidate in candidates {
            if selected.len() >= self.max_count {
                break;
            }
            let contested = selected
                .iter()
                .any(|s| s.padded_overlaps(&candidate, self.padding));
            if !contested {
                selected.push(candidate);
            }
        }

        selected.sort_by(|a, b| a.start.total_cmp(&b.start));
        selected
    }

    fn clamp_duration(&self, highlight: &mut RankedHighlight) {
        let duration = highlight.duration();

        if duration < self.min_duration {
            // Extend symmetrically; shift right if that would cross zero
            let grow = (self.min_duration - duration) / 2.0;
            highlight.start -= grow;
            highlight.end += grow;
            if highlight.start < 0.0 {
                highlight.end -= highlight.start;
                highlight.start = 0.0;
            }
        } else if duration > self.max_duration {
            // Keep the climax: centre the window on the peak, clamped to
            // the original interval
            let half = self.max_duration / 2.0;
            let (orig_start, orig_end) = (highlight.start, highlight.end);
            let mut start = highlight.peak - half;
            let mut end = highlight.peak + half;
            if start < orig_start {
                start = orig_start;
                end = orig_start + self.max_duration;
            } else if end > orig_end {
                end = orig_end;
                start = orig_end - self.max_duration;
            }
            highlight.start = start;
            highlight.end = end;
        }

        if highlight.peak < highlight.start {
            highlight.peak = highlight.start;
        } else if highlight.peak > highlight.end {
            highlight.peak = highlight.end;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SignalSource, SourceContribution};

    fn merger() -> IntervalMerger {
        IntervalMerger {
            max_count: 5,
            padding: 0.0,
            min_duration: 3.0,
            max_duration: 30.0,
        }
    }

    fn ranked(start: f64, end: f64, score: f64) -> RankedHighlight {
        ranked_with_peak(start, end, (start + end) / 2.0, score)
    }

    fn ranked_with_peak(start: f64, end: f64, peak: f64, score: f64) -> RankedHighlight {
        RankedHighlight::new(
            start,
            end,
            peak,
            score,
            vec![SourceContribution {
                source: SignalSource::Chat,
                normalized_score: score,
            }],
        )
    }

    #[test]
    fn test_higher_score_wins_contested_time() {
        let selected = merger().merge(vec![
            ranked(100.0, 120.0, 0.4),
            ranked(110.0, 130.0, 0.9),
        ]);

        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].start, 110.0);
        assert!((selected[0].score - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_result_is_time_ordered_and_capped() {
        let m = IntervalMerger {
            max_count: 2,
            ..merger()
        };

        let selected = m.merge(vec![
            ranked(300.0, 310.0, 0.5),
            ranked(100.0, 110.0, 0.9),
            ranked(200.0, 210.0, 0.7),
        ]);

        // Cap keeps the 0.9 and 0.7 entries, re-sorted by start
        assert_eq!(selected.len(), 2);
        assert!(selected[0].start < selected[1].start);
        assert_eq!(selected[0].start, 100.0);
        assert_eq!(selected[1].start, 200.0);
    }

    #[test]
    fn test_padding_separates_near_adjacent_windows() {
        let m = IntervalMerger {
            padding: 5.0,
            ..merger()
        };

        // 4s gap: conflicts once 5s padding is applied to both sides
        let selected = m.merge(vec![
            ranked(100.0, 110.0, 0.9),
            ranked(114.0, 124.0, 0.8),
            ranked(200.0, 210.0, 0.7),
        ]);

        assert_eq!(selected.len(), 2);
        for pair in selected.windows(2) {
            assert!(pair[0].end + m.padding <= pair[1].start - m.padding + 1e-9);
        }
    }

    #[test]
    fn test_short_candidate_extends_to_floor() {
        let selected = merger().merge(vec![ranked(50.0, 51.0, 0.9)]);

        assert_eq!(selected.len(), 1);
        assert!((selected[0].duration() - 3.0).abs() < 1e-9);
        assert_eq!(selected[0].start, 49.0);
    }

    #[test]
    fn test_extension_shifts_off_zero() {
        let selected = merger().merge(vec![ranked(0.0, 1.0, 0.9)]);

        assert_eq!(selected[0].start, 0.0);
        assert!((selected[0].end - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_long_candidate_truncates_around_peak() {
        // 100s window with the peak near the back
        let selected = merger().merge(vec![ranked_with_peak(0.0, 100.0, 80.0, 0.9)]);

        assert_eq!(selected.len(), 1);
        let h = &selected[0];
        assert!((h.duration() - 30.0).abs() < 1e-9);
        assert!(h.start <= 80.0 && 80.0 <= h.end);
        assert_eq!(h.start, 65.0);
        assert_eq!(h.end, 95.0);
    }

    #[test]
    fn test_truncation_clamps_to_original_window() {
        // Peak right at the start: cannot extend before the window
        let selected = merger().merge(vec![ranked_with_peak(40.0, 140.0, 41.0, 0.9)]);

        let h = &selected[0];
        assert_eq!(h.start, 40.0);
        assert_eq!(h.end, 70.0);
    }

    #[test]
    fn test_no_overlap_after_padding_in_final_set() {
        let m = IntervalMerger {
            max_count: 10,
            padding: 2.0,
            ..merger()
        };
        let candidates: Vec<RankedHighlight> = (0..20)
            .map(|i| ranked(i as f64 * 7.0, i as f64 * 7.0 + 5.0, (i % 10) as f64 / 10.0))
            .collect();

        let selected = m.merge(candidates);

        for pair in selected.windows(2) {
            assert!(pair[0].end + m.padding <= pair[1].start - m.padding + 1e-9);
        }
        assert!(selected.len() <= 10);
    }
}
