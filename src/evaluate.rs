use serde::Serialize;

use crate::error::{CutError, Result};
use crate::types::{Problem, Solution};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub total_cost: f64,
    pub demand_met: bool,
    /// Pieces cut per item, indexed like the item catalogue.
    pub fulfilled: Vec<u64>,
    /// Cost spent on each stock type, indexed like the stock catalogue.
    pub cost_by_stock: Vec<f64>,
    pub bars_by_stock: Vec<u64>,
}

impl Evaluation {
    pub fn bar_count(&self) -> u64 {
        self.bars_by_stock.iter().sum()
    }
}

/// Prices a solution against its catalogue. `total_cost` is summed in
/// `Solution::iter` order so it equals the flat sum of `count * cost`.
pub fn evaluate(solution: &Solution, problem: &Problem) -> Result<Evaluation> {
    let stocks = problem.stocks();
    let items = problem.items();
    let mut fulfilled = vec![0u64; items.len()];
    let mut cost_by_stock = vec![0.0; stocks.len()];
    let mut bars_by_stock = vec![0u64; stocks.len()];
    let mut total_cost = 0.0;

    for (si, pattern, count) in solution.iter() {
        let Some(stock) = stocks.get(si) else {
            return Err(CutError::InvalidConfiguration(format!(
                "solution uses stock index {} but the catalogue has {} stock types",
                si,
                stocks.len()
            )));
        };
        let cost = count as f64 * stock.cost;
        total_cost += cost;
        cost_by_stock[si] += cost;
        bars_by_stock[si] += count as u64;
        for (slot, &c) in fulfilled.iter_mut().zip(pattern.counts()) {
            *slot += c as u64 * count as u64;
        }
    }

    let demand_met = fulfilled
        .iter()
        .zip(items)
        .all(|(&got, item)| got >= item.demand as u64);

    Ok(Evaluation {
        total_cost,
        demand_met,
        fulfilled,
        cost_by_stock,
        bars_by_stock,
    })
}
