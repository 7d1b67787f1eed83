//! Pattern selection from cluster labels.

use std::collections::{BTreeMap, HashMap};
use std::num::NonZeroUsize;

use vpat_models::{ClusterStats, Pattern, PatternExample, TimeRange};

use crate::error::{WorkerError, WorkerResult};

/// Confidence ceiling for any pattern.
pub const MAX_CONFIDENCE: f64 = 0.95;
/// Floor for the frequency denominator, so tiny jobs are not overconfident.
const MIN_CONFIDENCE_DENOMINATOR: usize = 10;

/// Ranked patterns plus the windows that exemplify them.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub patterns: Vec<Pattern>,
    /// In window order
    pub examples: Vec<PatternExample>,
    /// All clusters, most frequent first
    pub stats: Vec<ClusterStats>,
}

/// `min(0.95, 0.5 + count / max(10, total))`
pub fn confidence(count: usize, total: usize) -> f64 {
    let denominator = total.max(MIN_CONFIDENCE_DENOMINATOR) as f64;
    (0.5 + count as f64 / denominator).min(MAX_CONFIDENCE)
}

/// Per-label counts sorted by count descending, then label ascending.
pub fn cluster_stats(labels: &[usize]) -> Vec<ClusterStats> {
    let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
    for &label in labels {
        *counts.entry(label).or_default() += 1;
    }

    let mut stats: Vec<ClusterStats> = counts
        .into_iter()
        .map(|(label, count)| ClusterStats { label, count })
        .collect();
    // Stable sort keeps ascending labels within equal counts.
    stats.sort_by(|a, b| b.count.cmp(&a.count));
    stats
}

pub fn pattern_title(rank: usize) -> String {
    format!("Repeated Pattern #{}", rank)
}

pub fn pattern_summary(stats: &ClusterStats) -> String {
    format!(
        "Cluster {} appears {} times. (V1 auto-grouping)",
        stats.label, stats.count
    )
}

/// Job summary written with the `done` status.
pub fn analysis_summary(pattern_count: usize) -> String {
    format!(
        "Found {} repeated pattern clusters from sampled windows.",
        pattern_count
    )
}

/// Keep the `max_patterns` most frequent clusters and list their windows.
pub fn select_patterns(
    ranges: &[TimeRange],
    labels: &[usize],
    max_patterns: NonZeroUsize,
) -> WorkerResult<Selection> {
    if ranges.len() != labels.len() {
        return Err(WorkerError::internal(format!(
            "{} windows but {} labels",
            ranges.len(),
            labels.len()
        )));
    }

    let total = labels.len();
    let stats = cluster_stats(labels);

    let patterns: Vec<Pattern> = stats
        .iter()
        .take(max_patterns.get())
        .enumerate()
        .map(|(i, s)| {
            let rank = i + 1;
            Pattern {
                rank,
                title: pattern_title(rank),
                summary: pattern_summary(s),
                confidence: confidence(s.count, total),
                label: s.label,
                count: s.count,
            }
        })
        .collect();

    let rank_by_label: HashMap<usize, usize> =
        patterns.iter().map(|p| (p.label, p.rank)).collect();

    let examples = ranges
        .iter()
        .zip(labels)
        .filter_map(|(range, label)| {
            rank_by_label.get(label).map(|&rank| PatternExample {
                pattern_rank: rank,
                start_sec: range.start_sec,
                end_sec: range.end_sec,
            })
        })
        .collect();

    Ok(Selection {
        patterns,
        examples,
        stats,
    })
}
