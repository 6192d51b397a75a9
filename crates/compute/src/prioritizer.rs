//! Insight Prioritizer: floor, dedup, rank, truncate.
//!
//! A pure function over the full candidate list. Deduplication works on
//! indices into the candidate arena so the winner of each (metric, category)
//! group can be chosen without mutating the list, and survivors keep their
//! production order until the final stable sort.

use std::cmp::Ordering;
use std::collections::HashMap;

use lens_core::Category;

use crate::insight::Insight;

/// Result of prioritizing one candidate list.
#[derive(Debug, Clone, PartialEq)]
pub struct Prioritized {
    pub insights: Vec<Insight>,
    pub below_floor: usize,
    pub duplicates_removed: usize,
    pub truncated: usize,
}

/// Orders, deduplicates and bounds insights.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InsightPrioritizer {
    pub confidence_floor: f64,
    pub max_insights: usize,
}

impl Default for InsightPrioritizer {
    fn default() -> Self {
        Self {
            confidence_floor: 0.5,
            max_insights: 10,
        }
    }
}

/// True when `a` should replace `b` as the survivor of a duplicate group.
fn outranks(a: &Insight, b: &Insight) -> bool {
    let by_confidence = a.confidence.total_cmp(&b.confidence);
    let by_priority = a.priority.cmp(&b.priority);
    let by_precedence = b.category.precedence().cmp(&a.category.precedence());
    by_confidence.then(by_priority).then(by_precedence) == Ordering::Greater
}

impl InsightPrioritizer {
    pub fn new(confidence_floor: f64, max_insights: usize) -> Self {
        Self {
            confidence_floor,
            max_insights,
        }
    }

    /// `candidates` must be in production order; ties fall back to it.
    pub fn prioritize(&self, candidates: Vec<Insight>) -> Prioritized {
        let total = candidates.len();
        let kept: Vec<Insight> = candidates
            .into_iter()
            .filter(|i| i.confidence >= self.confidence_floor)
            .collect();
        let below_floor = total - kept.len();

        // Winner index per (metric, category); earlier production wins full ties.
        let mut winners: HashMap<(&str, Category), usize> = HashMap::new();
        for (idx, insight) in kept.iter().enumerate() {
            winners
                .entry((insight.metric.as_str(), insight.category))
                .and_modify(|best| {
                    if outranks(insight, &kept[*best]) {
                        *best = idx;
                    }
                })
                .or_insert(idx);
        }
        let mut survivors: Vec<usize> = winners.into_values().collect();
        survivors.sort_unstable();
        let duplicates_removed = kept.len() - survivors.len();

        let mut slots: Vec<Option<Insight>> = kept.into_iter().map(Some).collect();
        let mut insights: Vec<Insight> = survivors
            .into_iter()
            .filter_map(|idx| slots[idx].take())
            .collect();

        // Stable: equal keys keep production order.
        insights.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| b.confidence.total_cmp(&a.confidence))
        });

        let truncated = insights.len().saturating_sub(self.max_insights);
        insights.truncate(self.max_insights);

        Prioritized {
            insights,
            below_floor,
            duplicates_removed,
            truncated,
        }
    }
}
