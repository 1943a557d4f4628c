use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::annealing::{Annealer, AnnealingConfig};
use crate::error::Result;
use crate::evaluate::{Evaluation, evaluate};
use crate::ffd::solve_ffd;
use crate::greedy::{GreedyConfig, GreedySolver};
use crate::types::{Problem, Solution};

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Strategy {
    #[default]
    Ffd,
    Greedy(GreedyConfig),
    Annealing(AnnealingConfig),
}

impl Strategy {
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Ffd => "ffd",
            Strategy::Greedy(_) => "greedy",
            Strategy::Annealing(_) => "annealing",
        }
    }
}

/// A finished plan together with its evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Plan {
    pub strategy: Strategy,
    pub solution: Solution,
    pub evaluation: Evaluation,
    /// Seed and iteration count of the annealing run, if any.
    pub seed: Option<u64>,
    pub iterations: Option<usize>,
    /// Wall-clock time spent in `Solver::solve`.
    pub elapsed_ms: u64,
}

pub struct Solver {
    problem: Problem,
    strategy: Strategy,
}

impl Solver {
    pub fn new(problem: Problem, strategy: Strategy) -> Self {
        Self { problem, strategy }
    }

    pub fn problem(&self) -> &Problem {
        &self.problem
    }

    pub fn solve(&self) -> Result<Plan> {
        let span = tracing::info_span!("solve", strategy = self.strategy.name());
        let _enter = span.enter();
        let started = Instant::now();

        let (solution, seed, iterations) = match &self.strategy {
            Strategy::Ffd => (solve_ffd(&self.problem)?, None, None),
            Strategy::Greedy(config) => {
                let outcome = GreedySolver::new(*config).solve(&self.problem)?;
                (outcome.solution, None, None)
            }
            Strategy::Annealing(config) => {
                let outcome = Annealer::new(config.clone()).solve(&self.problem)?;
                (outcome.solution, Some(outcome.seed), Some(outcome.iterations))
            }
        };

        let evaluation = evaluate(&solution, &self.problem)?;
        if !evaluation.demand_met {
            tracing::warn!(fulfilled = ?evaluation.fulfilled, "plan does not meet demand");
        }

        let elapsed_ms = started.elapsed().as_millis() as u64;
        tracing::info!(elapsed_ms, cost = evaluation.total_cost, "plan ready");

        Ok(Plan {
            strategy: self.strategy.clone(),
            solution,
            evaluation,
            seed,
            iterations,
            elapsed_ms,
        })
    }
}
