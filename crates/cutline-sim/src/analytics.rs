use std::collections::BTreeMap;

use cutline_core::engine::postround::CutRecord;
use serde::Serialize;

/// Accumulates cut thresholds across trials, one bucket per configured cut.
#[derive(Default)]
pub struct CutThresholdCollector {
    cuts: BTreeMap<(u32, usize), ThresholdAccumulator>,
}

#[derive(Default)]
struct ThresholdAccumulator {
    count: u64,
    sum: f64,
    min: f64,
    max: f64,
    clean: u64,
    // Thresholds land on half-point boundaries, so twice the value is an
    // exact integer key.
    histogram: BTreeMap<i64, u64>,
}

impl ThresholdAccumulator {
    fn record(&mut self, record: &CutRecord) {
        if self.count == 0 {
            self.min = record.threshold;
            self.max = record.threshold;
        } else {
            self.min = self.min.min(record.threshold);
            self.max = self.max.max(record.threshold);
        }
        self.count += 1;
        self.sum += record.threshold;
        if record.is_clean() {
            self.clean += 1;
        }
        *self
            .histogram
            .entry((record.threshold * 2.0).round() as i64)
            .or_insert(0) += 1;
    }

    fn summarize(&self) -> CutThresholdSummary {
        let count = self.count;
        let mean = if count == 0 {
            0.0
        } else {
            self.sum / count as f64
        };

        let mut most_common = None;
        let mut best_count = 0u64;
        let mut distribution = BTreeMap::new();
        for (key, bucket_count) in &self.histogram {
            let threshold = *key as f64 / 2.0;
            let probability = *bucket_count as f64 / count as f64;
            distribution.insert(format!("{threshold:.1}"), probability);
            if *bucket_count > best_count {
                best_count = *bucket_count;
                most_common = Some(MostCommonThreshold {
                    threshold,
                    count: *bucket_count,
                    probability,
                });
            }
        }

        let clean = if count == 0 {
            0.0
        } else {
            self.clean as f64 / count as f64
        };

        CutThresholdSummary {
            count,
            mean,
            min: self.min,
            max: self.max,
            most_common,
            distribution,
            cut_types: CutTypeBreakdown {
                clean,
                tiebreaker: if count == 0 { 0.0 } else { 1.0 - clean },
            },
        }
    }
}

impl CutThresholdCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, record: &CutRecord) {
        self.cuts
            .entry((record.after_round, record.cut_to))
            .or_default()
            .record(record);
    }

    /// Summaries keyed by a stable cut name, ordered by round.
    pub fn summaries(&self) -> BTreeMap<String, CutThresholdSummary> {
        self.cuts
            .iter()
            .map(|((round, cut_to), acc)| {
                (format!("round_{round}_cut_to_{cut_to}"), acc.summarize())
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.cuts.is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CutThresholdSummary {
    pub count: u64,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub most_common: Option<MostCommonThreshold>,
    /// Threshold value formatted to one decimal place, mapped to the
    /// fraction of trials that produced it.
    pub distribution: BTreeMap<String, f64>,
    pub cut_types: CutTypeBreakdown,
}

#[derive(Debug, Clone, Serialize)]
pub struct MostCommonThreshold {
    pub threshold: f64,
    pub count: u64,
    pub probability: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CutTypeBreakdown {
    pub clean: f64,
    pub tiebreaker: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn record(after_round: u32, cut_to: usize, threshold: f64) -> CutRecord {
        CutRecord {
            after_round,
            cut_to,
            threshold,
            survivors: HashSet::new(),
        }
    }

    #[test]
    fn summarizes_a_single_cut_bucket() {
        let mut collector = CutThresholdCollector::new();
        collector.record(&record(4, 16, 21.5));
        collector.record(&record(4, 16, 21.5));
        collector.record(&record(4, 16, 23.0));

        let summaries = collector.summaries();
        let summary = &summaries["round_4_cut_to_16"];

        assert_eq!(summary.count, 3);
        assert!((summary.mean - 22.0).abs() < 1e-9);
        assert_eq!(summary.min, 21.5);
        assert_eq!(summary.max, 23.0);

        let most_common = summary.most_common.as_ref().expect("has a mode");
        assert_eq!(most_common.threshold, 21.5);
        assert_eq!(most_common.count, 2);
        assert!((most_common.probability - 2.0 / 3.0).abs() < 1e-9);

        assert!((summary.distribution["21.5"] - 2.0 / 3.0).abs() < 1e-9);
        assert!((summary.distribution["23.0"] - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn classifies_clean_versus_tiebreaker_cuts() {
        let mut collector = CutThresholdCollector::new();
        collector.record(&record(6, 8, 30.5));
        collector.record(&record(6, 8, 31.5));
        collector.record(&record(6, 8, 28.0));
        collector.record(&record(6, 8, 28.0));

        let summaries = collector.summaries();
        let summary = &summaries["round_6_cut_to_8"];
        assert!((summary.cut_types.clean - 0.5).abs() < 1e-9);
        assert!((summary.cut_types.tiebreaker - 0.5).abs() < 1e-9);
    }

    #[test]
    fn separates_distinct_cuts_into_named_buckets() {
        let mut collector = CutThresholdCollector::new();
        collector.record(&record(4, 24, 18.5));
        collector.record(&record(6, 8, 33.5));

        let summaries = collector.summaries();
        let names: Vec<&String> = summaries.keys().collect();
        assert_eq!(names, vec!["round_4_cut_to_24", "round_6_cut_to_8"]);
    }

    #[test]
    fn mode_prefers_the_lowest_threshold_on_ties() {
        let mut collector = CutThresholdCollector::new();
        collector.record(&record(4, 16, 20.5));
        collector.record(&record(4, 16, 22.0));

        let summaries = collector.summaries();
        let most_common = summaries["round_4_cut_to_16"]
            .most_common
            .as_ref()
            .expect("has a mode");
        assert_eq!(most_common.threshold, 20.5);
    }
}
