use crate::error::{CutError, Result};
use crate::types::{Pattern, Problem, Solution};

/// First-Fit-Decreasing: every round opens one bar of each stock type in
/// catalogue order and fills it longest item first.
pub fn solve_ffd(problem: &Problem) -> Result<Solution> {
    let stocks = problem.stocks();
    let items = problem.items();

    // Stable sort keeps catalogue order between equal lengths
    let mut order: Vec<usize> = (0..items.len()).collect();
    order.sort_by(|&a, &b| items[b].length.cmp(&items[a].length));

    let mut residual = problem.demands();
    let mut solution = Solution::new(stocks.len());
    let mut rounds: u64 = 0;

    // Each productive round cuts at least one piece
    let max_rounds = problem.total_demand();
    while residual.iter().any(|&r| r > 0) {
        if rounds >= max_rounds {
            return Err(stalled(&residual));
        }
        rounds += 1;

        let mut progressed = false;
        for (si, stock) in stocks.iter().enumerate() {
            let mut remaining = stock.length;
            let mut counts = vec![0u32; items.len()];
            for &ii in &order {
                let length = items[ii].length;
                let take = (remaining / length).min(residual[ii]);
                counts[ii] += take;
                residual[ii] -= take;
                remaining -= take * length;
            }

            let pattern = Pattern::new(counts);
            if !pattern.is_empty() {
                solution.add(si, &pattern);
                progressed = true;
            }
        }

        if !progressed {
            return Err(stalled(&residual));
        }
    }

    tracing::info!(rounds, bars = solution.bar_count(), "ffd finished");
    Ok(solution)
}

fn stalled(residual: &[u32]) -> CutError {
    CutError::StalledProgress {
        solver: "ffd",
        residual: residual.iter().map(|&r| r as u64).sum(),
    }
}
