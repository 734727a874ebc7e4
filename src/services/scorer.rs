use std::collections::{BTreeMap, HashMap};

use crate::models::{Highlight, RankedHighlight, SignalSource, SourceContribution};

/// Normalizes raw candidate scores per source and fuses candidates from
/// different sources that overlap in time.
#[derive(Debug, Clone, Default)]
pub struct HighlightScorer {
    weights: HashMap<SignalSource, f64>,
}

impl HighlightScorer {
    pub fn new(weights: HashMap<SignalSource, f64>) -> Self {
        Self { weights }
    }

    fn weight(&self, source: SignalSource) -> f64 {
        self.weights.get(&source).copied().unwrap_or(1.0)
    }

    /// Min-max normalization within one source's candidate set. When every
    /// raw score is equal there is no spread to map, so all candidates get
    /// 0.5.
    pub fn normalize(candidates: &[Highlight]) -> Vec<(Highlight, f64)> {
        if candidates.is_empty() {
            return Vec::new();
        }

        let min = candidates
            .iter()
            .map(|c| c.raw_score)
            .fold(f64::INFINITY, f64::min);
        let max = candidates
            .iter()
            .map(|c| c.raw_score)
            .fold(f64::NEG_INFINITY, f64::max);
        let spread = max - min;

        candidates
            .iter()
            .map(|c| {
                let normalized = if spread > 0.0 {
                    (c.raw_score - min) / spread
                } else {
                    0.5
                };
                (c.clone(), normalized)
            })
            .collect()
    }

    /// Normalize each source's candidates, then fuse overlapping windows
    /// across sources into single ranked entries. Candidates that overlap
    /// nothing from another source pass through with their own normalized
    /// score.
    pub fn rank(&self, per_source: &[Vec<Highlight>]) -> Vec<RankedHighlight> {
        let mut normalized: Vec<(Highlight, f64)> = per_source
            .iter()
            .flat_map(|candidates| Self::normalize(candidates))
            .collect();

        if normalized.is_empty() {
            return Vec::new();
        }

        normalized.sort_by(|a, b| a.0.start.total_cmp(&b.0.start));

        // Sweep into clusters of transitively overlapping candidates
        let mut clusters: Vec<Vec<(Highlight, f64)>> = Vec::new();
        let mut cluster_end = f64::NEG_INFINITY;
        for entry in normalized {
            if entry.0.start < cluster_end {
                cluster_end = cluster_end.max(entry.0.end);
                clusters.last_mut().unwrap().push(entry);
            } else {
                cluster_end = entry.0.end;
                clusters.push(vec![entry]);
            }
        }

        clusters.into_iter().map(|c| self.fuse(c)).collect()
    }

    fn fuse(&self, cluster: Vec<(Highlight, f64)>) -> RankedHighlight {
        // One normalized score per source: its best candidate represents it
        let mut best_per_source: BTreeMap<SignalSource, f64> = BTreeMap::new();
        for (highlight, normalized) in &cluster {
            let entry = best_per_source.entry(highlight.source).or_insert(0.0);
            if *normalized >= *entry {
                *entry = *normalized;
            }
        }

        let start = cluster
            .iter()
            .map(|(h, _)| h.start)
            .fold(f64::INFINITY, f64::min);
        let end = cluster
            .iter()
            .map(|(h, _)| h.end)
            .fold(f64::NEG_INFINITY, f64::max);

        // The peak of the member with the highest weighted score wins
        let peak = cluster
            .iter()
            .max_by(|(ha, na), (hb, nb)| {
                (self.weight(ha.source) * na).total_cmp(&(self.weight(hb.source) * nb))
            })
            .map(|(h, _)| h.peak)
            .unwrap_or((start + end) / 2.0);

        let weight_total: f64 = best_per_source.keys().map(|s| self.weight(*s)).sum();
        let score = if weight_total > 0.0 {
            best_per_source
                .iter()
                .map(|(s, n)| self.weight(*s) * n)
                .sum::<f64>()
                / weight_total
        } else {
            0.0
        };

        let sources = best_per_source
            .into_iter()
            .map(|(source, normalized_score)| SourceContribution {
                source,
                normalized_score,
            })
            .collect();

        RankedHighlight::new(start, end, peak, score, sources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(source: SignalSource, start: f64, end: f64, raw_score: f64) -> Highlight {
        Highlight {
            start,
            end,
            peak: (start + end) / 2.0,
            source,
            raw_score,
            confidence: 0.8,
        }
    }

    #[test]
    fn test_normalization_spans_unit_interval() {
        let candidates = vec![
            candidate(SignalSource::Chat, 0.0, 10.0, 5.0),
            candidate(SignalSource::Chat, 20.0, 30.0, 15.0),
            candidate(SignalSource::Chat, 40.0, 50.0, 25.0),
        ];

        let normalized = HighlightScorer::normalize(&candidates);

        assert_eq!(normalized[0].1, 0.0);
        assert_eq!(normalized[1].1, 0.5);
        assert_eq!(normalized[2].1, 1.0);
    }

    #[test]
    fn test_equal_raw_scores_normalize_to_half() {
        let candidates = vec![
            candidate(SignalSource::Audio, 0.0, 5.0, 7.0),
            candidate(SignalSource::Audio, 10.0, 15.0, 7.0),
        ];

        let normalized = HighlightScorer::normalize(&candidates);

        assert!(normalized.iter().all(|(_, n)| *n == 0.5));
    }

    #[test]
    fn test_normalization_preserves_order() {
        let raw = vec![
            candidate(SignalSource::Chat, 0.0, 10.0, 3.0),
            candidate(SignalSource::Chat, 20.0, 30.0, 9.0),
            candidate(SignalSource::Chat, 40.0, 50.0, 6.0),
        ];

        let first = HighlightScorer::normalize(&raw);
        // Re-normalizing already-normalized scores keeps the same ranking
        let renormalized_input: Vec<Highlight> = first
            .iter()
            .map(|(h, n)| {
                let mut h = h.clone();
                h.raw_score = *n;
                h
            })
            .collect();
        let second = HighlightScorer::normalize(&renormalized_input);

        let order = |scored: &[(Highlight, f64)]| {
            let mut idx: Vec<usize> = (0..scored.len()).collect();
            idx.sort_by(|&a, &b| scored[b].1.total_cmp(&scored[a].1));
            idx
        };
        assert_eq!(order(&first), order(&second));
    }

    #[test]
    fn test_overlapping_sources_fuse_into_one() {
        let chat = vec![
            candidate(SignalSource::Chat, 100.0, 120.0, 10.0),
            candidate(SignalSource::Chat, 300.0, 310.0, 4.0),
        ];
        let audio = vec![
            candidate(SignalSource::Audio, 110.0, 130.0, 8.0),
            candidate(SignalSource::Audio, 500.0, 520.0, 2.0),
        ];

        let ranked = HighlightScorer::default().rank(&[chat, audio]);

        assert_eq!(ranked.len(), 3);
        let fused = ranked.iter().find(|r| r.sources.len() == 2).unwrap();
        assert_eq!(fused.start, 100.0);
        assert_eq!(fused.end, 130.0);
        // Equal weights: mean of the two per-source normalized scores (1.0 each)
        assert!((fused.score - 1.0).abs() < 1e-9);

        let lone: Vec<_> = ranked.iter().filter(|r| r.sources.len() == 1).collect();
        assert_eq!(lone.len(), 2);
    }

    #[test]
    fn test_fusion_respects_weights() {
        let chat = vec![
            candidate(SignalSource::Chat, 100.0, 120.0, 10.0),
            candidate(SignalSource::Chat, 200.0, 210.0, 0.0),
        ];
        let audio = vec![
            candidate(SignalSource::Audio, 110.0, 130.0, 0.0),
            candidate(SignalSource::Audio, 400.0, 420.0, 5.0),
        ];

        let mut weights = HashMap::new();
        weights.insert(SignalSource::Chat, 3.0);
        weights.insert(SignalSource::Audio, 1.0);
        let ranked = HighlightScorer::new(weights).rank(&[chat, audio]);

        // Fused window: chat normalized 1.0 (w=3), audio normalized 0.0 (w=1)
        let fused = ranked.iter().find(|r| r.sources.len() == 2).unwrap();
        assert!((fused.score - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_scores_stay_in_unit_interval() {
        let chat = vec![
            candidate(SignalSource::Chat, 0.0, 10.0, 1.0),
            candidate(SignalSource::Chat, 5.0, 20.0, 3.0),
            candidate(SignalSource::Chat, 100.0, 110.0, 9.0),
        ];
        let vision = vec![candidate(SignalSource::Vision, 8.0, 30.0, 6.0)];

        let ranked = HighlightScorer::default().rank(&[chat, vision]);

        for r in &ranked {
            assert!(r.score >= 0.0 && r.score <= 1.0);
            assert!(r.start < r.end);
        }
    }
}
