use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{CutError, Result};
use crate::evaluate::evaluate;
use crate::pattern::{PatternGenerator, WastePolicy};
use crate::types::{Pattern, Problem, Solution};

/// Configuration for the annealing run.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AnnealingConfig {
    /// Starting temperature (> 0).
    pub initial_temperature: f64,
    /// Geometric cooling factor, strictly between 0 and 1.
    pub cooling_rate: f64,
    /// Number of candidate solutions to try.
    pub max_iterations: usize,
    /// Random seed for reproducibility (None = random).
    pub seed: Option<u64>,
    /// Wall-clock budget in milliseconds (0 = no limit).
    pub time_limit_ms: u64,
    /// Pattern set the construction draws from.
    pub waste_policy: WastePolicy,
    /// Random draws allowed while building a single candidate.
    pub max_draws: usize,
    /// Independent runs with consecutive seeds; the cheapest result wins.
    pub restarts: usize,
}

impl Default for AnnealingConfig {
    fn default() -> Self {
        Self {
            initial_temperature: 1000.0,
            cooling_rate: 0.995,
            max_iterations: 500,
            seed: None,
            time_limit_ms: 0,
            waste_policy: WastePolicy::Strict,
            max_draws: 100_000,
            restarts: 1,
        }
    }
}

impl AnnealingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.initial_temperature = temperature;
        self
    }

    pub fn with_cooling_rate(mut self, rate: f64) -> Self {
        self.cooling_rate = rate;
        self
    }

    pub fn with_max_iterations(mut self, iterations: usize) -> Self {
        self.max_iterations = iterations;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_time_limit_ms(mut self, ms: u64) -> Self {
        self.time_limit_ms = ms;
        self
    }

    pub fn with_waste_policy(mut self, policy: WastePolicy) -> Self {
        self.waste_policy = policy;
        self
    }

    pub fn with_max_draws(mut self, draws: usize) -> Self {
        self.max_draws = draws;
        self
    }

    pub fn with_restarts(mut self, restarts: usize) -> Self {
        self.restarts = restarts;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.initial_temperature.is_finite() || self.initial_temperature <= 0.0 {
            return Err(CutError::InvalidConfiguration(format!(
                "initial temperature must be positive, got {}",
                self.initial_temperature
            )));
        }
        if !(self.cooling_rate > 0.0 && self.cooling_rate < 1.0) {
            return Err(CutError::InvalidConfiguration(format!(
                "cooling rate must lie in (0, 1), got {}",
                self.cooling_rate
            )));
        }
        if self.max_iterations == 0 {
            return Err(CutError::InvalidConfiguration(
                "iteration count must be positive".to_string(),
            ));
        }
        if self.max_draws == 0 || self.restarts == 0 {
            return Err(CutError::InvalidConfiguration(
                "draw limit and restart count must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnealingOutcome {
    pub solution: Solution,
    pub cost: f64,
    pub demand_met: bool,
    /// Iterations completed before the iteration or time budget ran out.
    pub iterations: usize,
    pub accepted: usize,
    /// Best cost after each completed iteration.
    pub best_history: Vec<f64>,
    /// Seed of the run that produced this outcome.
    pub seed: u64,
}

/// Simulated annealing over randomly constructed cutting plans.
/// Each iteration builds a fresh candidate from uniformly drawn
/// (stock type, pattern) pairs and applies the Metropolis criterion against
/// the current plan. The best feasible plan is tracked separately from the
/// accepted one.
pub struct Annealer {
    config: AnnealingConfig,
}

impl Annealer {
    pub fn new(config: AnnealingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnnealingConfig {
        &self.config
    }

    pub fn solve(&self, problem: &Problem) -> Result<AnnealingOutcome> {
        self.config.validate()?;
        let patterns = PatternGenerator::new(self.config.waste_policy).generate_all(problem);
        let base_seed = self.config.seed.unwrap_or_else(rand::random);

        if self.config.restarts == 1 {
            let mut rng = StdRng::seed_from_u64(base_seed);
            return self.run(problem, &patterns, base_seed, &mut rng);
        }

        let runs: Vec<Result<AnnealingOutcome>> = (0..self.config.restarts)
            .into_par_iter()
            .map(|i| {
                let seed = base_seed.wrapping_add(i as u64);
                let mut rng = StdRng::seed_from_u64(seed);
                self.run(problem, &patterns, seed, &mut rng)
            })
            .collect();

        // Cheapest run wins; ties go to the lowest restart index
        let mut best: Option<AnnealingOutcome> = None;
        let mut first_err = None;
        for run in runs {
            match run {
                Ok(outcome) => {
                    if best.as_ref().is_none_or(|b| outcome.cost < b.cost) {
                        best = Some(outcome);
                    }
                }
                Err(e) => {
                    first_err.get_or_insert(e);
                }
            }
        }
        match (best, first_err) {
            (Some(outcome), _) => Ok(outcome),
            (None, Some(e)) => Err(e),
            (None, None) => Err(CutError::BudgetExhausted { iterations: 0 }),
        }
    }

    /// One annealing run over precomputed pattern sets, drawing every random
    /// decision from `rng`.
    pub fn run<R: Rng>(
        &self,
        problem: &Problem,
        patterns: &[Vec<Pattern>],
        seed: u64,
        rng: &mut R,
    ) -> Result<AnnealingOutcome> {
        let config = &self.config;
        let deadline = (config.time_limit_ms > 0)
            .then(|| Instant::now() + Duration::from_millis(config.time_limit_ms));

        let mut current: Option<(Solution, f64)> =
            match construct(problem, patterns, config.max_draws, rng) {
                Some(s) => {
                    let cost = evaluate(&s, problem)?.total_cost;
                    Some((s, cost))
                }
                None => None,
            };
        let mut best = current.clone();

        let mut temperature = config.initial_temperature;
        let mut history = Vec::with_capacity(config.max_iterations.min(1 << 16));
        let mut accepted = 0;

        for iteration in 0..config.max_iterations {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                tracing::warn!(iteration, "annealing time budget exhausted");
                break;
            }

            if let Some(candidate) = construct(problem, patterns, config.max_draws, rng) {
                let eval = evaluate(&candidate, problem)?;
                if eval.demand_met {
                    let cost = eval.total_cost;
                    let accept = match &current {
                        None => true,
                        Some((_, current_cost)) => {
                            metropolis(cost - current_cost, temperature, rng)
                        }
                    };

                    if best.as_ref().is_none_or(|(_, best_cost)| cost < *best_cost) {
                        tracing::debug!(iteration, cost, temperature, "annealing found new best");
                        best = Some((candidate.clone(), cost));
                    }
                    if accept {
                        current = Some((candidate, cost));
                        accepted += 1;
                    }
                }
            }

            history.push(best.as_ref().map_or(f64::INFINITY, |(_, c)| *c));
            temperature *= config.cooling_rate;
        }

        let iterations = history.len();
        let Some((solution, cost)) = best else {
            return Err(CutError::BudgetExhausted { iterations });
        };

        tracing::info!(seed, iterations, accepted, cost, "annealing finished");
        Ok(AnnealingOutcome {
            demand_met: evaluate(&solution, problem)?.demand_met,
            solution,
            cost,
            iterations,
            accepted,
            best_history: history,
            seed,
        })
    }
}

/// Always accepts improvements; accepts a worsening `delta` with probability
/// `exp(-delta / temperature)`.
fn metropolis<R: Rng>(delta: f64, temperature: f64, rng: &mut R) -> bool {
    delta < 0.0 || rng.gen_range(0.0..1.0) < (-delta / temperature).exp()
}

/// Commits random (stock, pattern) pairs until residual demand is gone.
/// Returns `None` if `max_draws` draws were not enough.
fn construct<R: Rng>(
    problem: &Problem,
    patterns: &[Vec<Pattern>],
    max_draws: usize,
    rng: &mut R,
) -> Option<Solution> {
    let mut residual = problem.demands();
    let mut solution = Solution::new(patterns.len());
    if residual.iter().all(|&r| r == 0) {
        return Some(solution);
    }
    if patterns.iter().all(Vec::is_empty) {
        return None;
    }

    for _ in 0..max_draws {
        let si = rng.gen_range(0..patterns.len());
        let choices = &patterns[si];
        if choices.is_empty() {
            continue;
        }
        let pattern = &choices[rng.gen_range(0..choices.len())];
        solution.add(si, pattern);
        for (r, &c) in residual.iter_mut().zip(pattern.counts()) {
            *r = r.saturating_sub(c);
        }
        if residual.iter().all(|&r| r == 0) {
            return Some(solution);
        }
    }
    None
}
