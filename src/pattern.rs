use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::types::{OrderItem, Pattern, Problem};

/// Which leftover lengths a generated pattern may have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum WastePolicy {
    /// Leftover must be zero or shorter than the shortest item, so no
    /// further piece of any kind could still be cut from the bar.
    #[default]
    Strict,
    /// Only the bar length bounds the pattern.
    Relaxed,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PatternGenerator {
    policy: WastePolicy,
}

impl PatternGenerator {
    pub fn new(policy: WastePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> WastePolicy {
        self.policy
    }

    /// Enumerates every non-empty count vector `0 <= c_i <= stock_length / length_i`
    /// accepted by the policy. The last item varies fastest.
    pub fn generate(&self, stock_length: u32, items: &[OrderItem]) -> Vec<Pattern> {
        if items.is_empty() {
            return Vec::new();
        }

        // Zero-length items never appear in a pattern
        let max_cuts: Vec<u32> = items
            .iter()
            .map(|i| stock_length.checked_div(i.length).unwrap_or(0))
            .collect();
        let min_length = items
            .iter()
            .filter(|i| i.length > 0)
            .map(|i| i.length as u64)
            .min()
            .unwrap_or(0);
        let mut counts = vec![0u32; items.len()];
        let mut patterns = Vec::new();

        loop {
            if let Some(used) = self.accepts(&counts, items, stock_length, min_length) {
                if used > 0 {
                    patterns.push(Pattern::new(counts.clone()));
                }
            }

            // Odometer step over the Cartesian product
            let mut pos = counts.len();
            loop {
                if pos == 0 {
                    return patterns;
                }
                pos -= 1;
                if counts[pos] < max_cuts[pos] {
                    counts[pos] += 1;
                    break;
                }
                counts[pos] = 0;
            }
        }
    }

    /// Returns the used length when the counts form an acceptable pattern.
    fn accepts(
        &self,
        counts: &[u32],
        items: &[OrderItem],
        stock_length: u32,
        min_length: u64,
    ) -> Option<u64> {
        let used: u64 = counts
            .iter()
            .zip(items)
            .map(|(&c, item)| c as u64 * item.length as u64)
            .sum();
        let stock_length = stock_length as u64;
        if used > stock_length {
            return None;
        }
        let leftover = stock_length - used;
        if self.policy == WastePolicy::Strict && leftover > 0 && leftover >= min_length {
            return None;
        }
        Some(used)
    }

    /// Pattern sets for every stock type, in catalogue order. Stock types are
    /// enumerated in parallel.
    pub fn generate_all(&self, problem: &Problem) -> Vec<Vec<Pattern>> {
        let items = problem.items();
        let patterns: Vec<Vec<Pattern>> = problem
            .stocks()
            .par_iter()
            .map(|stock| self.generate(stock.length, items))
            .collect();
        tracing::debug!(
            policy = ?self.policy,
            counts = ?patterns.iter().map(Vec::len).collect::<Vec<_>>(),
            "generated cutting patterns"
        );
        patterns
    }
}
