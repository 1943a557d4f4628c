use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::error::{CutError, Result};
use crate::evaluate::evaluate;
use crate::pattern::{PatternGenerator, WastePolicy};
use crate::types::{OrderItem, Pattern, Problem, Solution};

/// Yield metric used to order a stock type's patterns, best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PatternRanking {
    /// Total pieces cut from the bar.
    #[default]
    PieceCount,
    /// Pieces per unit of length actually cut.
    PiecesPerLength,
}

impl PatternRanking {
    /// Orders patterns best first. Equal scores fall back to the larger piece
    /// count, then to generation order.
    fn compare(self, a: &Pattern, b: &Pattern, items: &[OrderItem]) -> Ordering {
        self.score(b, items)
            .total_cmp(&self.score(a, items))
            .then_with(|| b.pieces().cmp(&a.pieces()))
    }

    fn score(self, pattern: &Pattern, items: &[OrderItem]) -> f64 {
        let pieces = pattern.pieces() as f64;
        match self {
            PatternRanking::PieceCount => pieces,
            PatternRanking::PiecesPerLength => {
                let used = pattern.used_length(items);
                if used == 0 {
                    f64::INFINITY
                } else {
                    pieces / used as f64
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct GreedyConfig {
    pub ranking: PatternRanking,
    pub waste_policy: WastePolicy,
}

/// Piece count over length-only patterns. A single piece of any validated
/// item always fits some stock, so this configuration cannot stall.
impl Default for GreedyConfig {
    fn default() -> Self {
        Self::new(PatternRanking::PieceCount, WastePolicy::Relaxed)
    }
}

impl GreedyConfig {
    pub fn new(ranking: PatternRanking, waste_policy: WastePolicy) -> Self {
        Self {
            ranking,
            waste_policy,
        }
    }

    /// Ranks by pieces per cut length over length-only feasible patterns.
    pub fn modified() -> Self {
        Self::new(PatternRanking::PiecesPerLength, WastePolicy::Relaxed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GreedyOutcome {
    pub solution: Solution,
    pub total_cost: f64,
    pub fulfilled: Vec<u64>,
}

pub struct GreedySolver {
    config: GreedyConfig,
}

impl GreedySolver {
    pub fn new(config: GreedyConfig) -> Self {
        Self { config }
    }

    pub fn solve(&self, problem: &Problem) -> Result<GreedyOutcome> {
        let stocks = problem.stocks();
        let items = problem.items();

        // Cheapest per unit length first; ties keep catalogue order
        let mut stock_order: Vec<usize> = (0..stocks.len()).collect();
        stock_order.sort_by(|&a, &b| stocks[a].unit_cost().total_cmp(&stocks[b].unit_cost()));

        let ranked = self.ranked_patterns(problem);

        let mut residual = problem.demands();
        let mut fulfilled = vec![0u64; items.len()];
        let mut solution = Solution::new(stocks.len());
        let mut rounds: u64 = 0;

        // Every committed pattern cuts at least one piece
        let max_rounds = problem.total_demand();
        'rounds: while residual.iter().any(|&r| r > 0) {
            if rounds >= max_rounds {
                return Err(self.stalled(&residual));
            }
            rounds += 1;

            let mut progressed = false;
            for &si in &stock_order {
                let Some(pattern) = ranked[si].iter().find(|p| p.fits_within(&residual)) else {
                    continue;
                };

                solution.add(si, pattern);
                for (ii, &c) in pattern.counts().iter().enumerate() {
                    residual[ii] -= c;
                    fulfilled[ii] += c as u64;
                }
                progressed = true;
                tracing::debug!(
                    stock = %stocks[si].id,
                    pattern = ?pattern.counts(),
                    "greedy committed pattern"
                );

                if residual.iter().all(|&r| r == 0) {
                    break 'rounds;
                }
            }

            if !progressed {
                return Err(self.stalled(&residual));
            }
        }

        let total_cost = evaluate(&solution, problem)?.total_cost;
        tracing::info!(
            ranking = ?self.config.ranking,
            policy = ?self.config.waste_policy,
            rounds,
            total_cost,
            "greedy finished"
        );

        Ok(GreedyOutcome {
            solution,
            total_cost,
            fulfilled,
        })
    }

    /// Pattern sets per stock type, best yield first.
    fn ranked_patterns(&self, problem: &Problem) -> Vec<Vec<Pattern>> {
        let items = problem.items();
        let ranking = self.config.ranking;
        let mut all = PatternGenerator::new(self.config.waste_policy).generate_all(problem);
        for patterns in &mut all {
            patterns.sort_by(|a, b| ranking.compare(a, b, items));
        }
        all
    }

    fn stalled(&self, residual: &[u32]) -> CutError {
        CutError::StalledProgress {
            solver: "greedy",
            residual: residual.iter().map(|&r| r as u64).sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluate::evaluate;
    use crate::types::StockType;

    fn two_by_two() -> Problem {
        Problem::new(
            vec![StockType::new("A", 80, 90.0), StockType::new("B", 100, 110.0)],
            vec![OrderItem::new("X", 20, 5), OrderItem::new("Y", 30, 3)],
        )
        .unwrap()
    }

    fn assert_outcome_consistent(outcome: &GreedyOutcome, problem: &Problem) {
        let eval = evaluate(&outcome.solution, problem).unwrap();
        assert!(eval.demand_met, "demand not met: {:?}", eval.fulfilled);
        assert_eq!(eval.total_cost, outcome.total_cost);
        assert_eq!(eval.fulfilled, outcome.fulfilled);
    }

    fn strict() -> GreedyConfig {
        GreedyConfig::new(PatternRanking::PieceCount, WastePolicy::Strict)
    }

    #[test]
    fn test_strict_piece_count() {
        let problem = two_by_two();
        let outcome = GreedySolver::new(strict())
            .solve(&problem)
            .unwrap();
        assert_outcome_consistent(&outcome, &problem);

        // B is cheaper per unit length: {X:5} first, then {Y:3}
        assert!(outcome.solution.usages(0).is_empty());
        let b = outcome.solution.usages(1);
        assert_eq!(b.len(), 2);
        assert_eq!(b[0].pattern, Pattern::new(vec![5, 0]));
        assert_eq!(b[1].pattern, Pattern::new(vec![0, 3]));
        assert_eq!(outcome.total_cost, 220.0);
    }

    #[test]
    fn test_never_overcuts() {
        let problem = two_by_two();
        for config in [GreedyConfig::default(), GreedyConfig::modified(), strict()] {
            let outcome = GreedySolver::new(config).solve(&problem).unwrap();
            assert_outcome_consistent(&outcome, &problem);
            assert_eq!(outcome.fulfilled, vec![5, 3]);
        }
    }

    #[test]
    fn test_exact_fit_single_bar() {
        let problem = Problem::new(
            vec![StockType::new("A", 100, 100.0)],
            vec![OrderItem::new("S", 50, 2)],
        )
        .unwrap();
        for config in [
            GreedyConfig::default(),
            GreedyConfig::modified(),
            strict(),
        ] {
            let outcome = GreedySolver::new(config).solve(&problem).unwrap();
            assert_eq!(outcome.solution.bar_count(), 1);
            assert_eq!(outcome.solution.usages(0)[0].pattern, Pattern::new(vec![2]));
            assert_eq!(outcome.total_cost, 100.0);
        }
    }

    #[test]
    fn test_strict_policy_can_stall() {
        // A single 30 leaves 70 on the bar, which the strict bound rejects
        let problem = Problem::new(
            vec![StockType::new("A", 100, 100.0)],
            vec![OrderItem::new("Y", 30, 1)],
        )
        .unwrap();
        let err = GreedySolver::new(strict()).solve(&problem).unwrap_err();
        assert_eq!(
            err,
            CutError::StalledProgress {
                solver: "greedy",
                residual: 1
            }
        );

        let outcome = GreedySolver::new(GreedyConfig::default())
            .solve(&problem)
            .unwrap();
        assert_eq!(outcome.fulfilled, vec![1]);
    }

    #[test]
    fn test_default_meets_small_leftover_demand() {
        let cases = [
            (vec![("A", 100, 100.0)], vec![("X", 30, 4)]),
            (
                vec![("A", 80, 90.0), ("B", 100, 110.0)],
                vec![("X", 20, 6), ("Y", 30, 3)],
            ),
            (
                vec![("Type 1", 80, 90.0), ("Type 2", 100, 110.0), ("Type 3", 120, 130.0)],
                vec![("S", 15, 21), ("M", 30, 10), ("L", 34, 15), ("XL", 47, 5)],
            ),
        ];
        for (stocks, items) in cases {
            let problem = Problem::new(
                stocks
                    .into_iter()
                    .map(|(id, length, cost)| StockType::new(id, length, cost))
                    .collect(),
                items
                    .into_iter()
                    .map(|(id, length, demand)| OrderItem::new(id, length, demand))
                    .collect(),
            )
            .unwrap();
            let outcome = GreedySolver::new(GreedyConfig::default())
                .solve(&problem)
                .unwrap();
            assert_outcome_consistent(&outcome, &problem);
        }
    }

    #[test]
    fn test_total_cost_matches_evaluation_on_fractional_costs() {
        let problem = Problem::new(
            vec![
                StockType::new("A", 80, 0.1),
                StockType::new("B", 100, 0.2),
                StockType::new("C", 120, 0.3),
            ],
            vec![
                OrderItem::new("S", 15, 20),
                OrderItem::new("M", 30, 10),
                OrderItem::new("L", 34, 15),
                OrderItem::new("XL", 47, 5),
            ],
        )
        .unwrap();
        for config in [GreedyConfig::default(), GreedyConfig::modified()] {
            let outcome = GreedySolver::new(config).solve(&problem).unwrap();
            assert_outcome_consistent(&outcome, &problem);
            let mut flat = 0.0;
            for (si, _, count) in outcome.solution.iter() {
                flat += count as f64 * problem.stocks()[si].cost;
            }
            assert_eq!(outcome.total_cost, flat);
        }
    }

    #[test]
    fn test_config_from_json_defaults_to_relaxed() {
        let config: GreedyConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, GreedyConfig::default());
        assert_eq!(config.waste_policy, WastePolicy::Relaxed);
        let config: GreedyConfig =
            serde_json::from_str(r#"{"waste_policy": "strict"}"#).unwrap();
        assert_eq!(config, strict());
    }

    #[test]
    fn test_equal_density_prefers_fuller_bar() {
        let items = vec![OrderItem::new("S", 50, 2)];
        let one = Pattern::new(vec![1]);
        let two = Pattern::new(vec![2]);
        assert_eq!(
            PatternRanking::PiecesPerLength.compare(&two, &one, &items),
            Ordering::Less
        );
    }

    #[test]
    fn test_pieces_per_length_prefers_short_pieces() {
        let items = vec![OrderItem::new("S", 10, 1), OrderItem::new("L", 40, 1)];
        let short = Pattern::new(vec![1, 0]);
        let long = Pattern::new(vec![0, 1]);
        let per_length = PatternRanking::PiecesPerLength;
        assert!(per_length.score(&short, &items) > per_length.score(&long, &items));
        let count = PatternRanking::PieceCount;
        assert_eq!(count.score(&short, &items), count.score(&long, &items));
    }

    #[test]
    fn test_rankings_can_differ() {
        let problem = Problem::new(
            vec![StockType::new("A", 60, 60.0)],
            vec![OrderItem::new("S", 10, 2), OrderItem::new("L", 40, 2)],
        )
        .unwrap();
        let by_count = GreedySolver::new(GreedyConfig::new(
            PatternRanking::PieceCount,
            WastePolicy::Relaxed,
        ))
        .solve(&problem)
        .unwrap();
        let by_length = GreedySolver::new(GreedyConfig::modified())
            .solve(&problem)
            .unwrap();
        assert_outcome_consistent(&by_count, &problem);
        assert_outcome_consistent(&by_length, &problem);
        assert_eq!(
            by_count.solution.usages(0)[0].pattern,
            Pattern::new(vec![2, 1])
        );
        assert_eq!(
            by_length.solution.usages(0)[0].pattern,
            Pattern::new(vec![2, 0])
        );
    }

    #[test]
    fn test_prefers_cheaper_unit_cost() {
        let problem = Problem::new(
            vec![StockType::new("Pricey", 100, 200.0), StockType::new("Cheap", 100, 100.0)],
            vec![OrderItem::new("S", 50, 2)],
        )
        .unwrap();
        let outcome = GreedySolver::new(GreedyConfig::default())
            .solve(&problem)
            .unwrap();
        assert_outcome_consistent(&outcome, &problem);
        assert!(outcome.solution.usages(0).is_empty());
        assert_eq!(outcome.solution.usages(1)[0].count, 1);
        assert_eq!(outcome.total_cost, 100.0);
    }
}
