use std::collections::BTreeMap;

use serde::Serialize;

use crate::solver::Plan;
use crate::types::Problem;

/// Id-keyed view of a plan, ready for JSON output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanReport {
    pub strategy: &'static str,
    pub total_cost: f64,
    pub demand_met: bool,
    pub bar_count: u64,
    pub waste_percent: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iterations: Option<usize>,
    pub elapsed_ms: u64,
    pub stocks: Vec<StockReport>,
    pub items: Vec<ItemReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockReport {
    pub id: String,
    pub length: u32,
    pub unit_cost: f64,
    pub bars: u64,
    pub cost: f64,
    pub patterns: Vec<PatternReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternReport {
    /// Item id to piece count, zero counts omitted.
    pub cuts: BTreeMap<String, u32>,
    pub count: u32,
    pub used_length: u64,
    pub leftover: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemReport {
    pub id: String,
    pub length: u32,
    pub demand: u32,
    pub fulfilled: u64,
}

pub fn build_report(plan: &Plan, problem: &Problem) -> PlanReport {
    let items = problem.items();
    let eval = &plan.evaluation;

    let stocks = problem
        .stocks()
        .iter()
        .enumerate()
        .map(|(si, stock)| StockReport {
            id: stock.id.clone(),
            length: stock.length,
            unit_cost: stock.cost,
            bars: eval.bars_by_stock.get(si).copied().unwrap_or(0),
            cost: eval.cost_by_stock.get(si).copied().unwrap_or(0.0),
            patterns: plan
                .solution
                .usages(si)
                .iter()
                .map(|usage| PatternReport {
                    cuts: items
                        .iter()
                        .zip(usage.pattern.counts())
                        .filter(|(_, c)| **c > 0)
                        .map(|(item, &c)| (item.id.clone(), c))
                        .collect(),
                    count: usage.count,
                    used_length: usage.pattern.used_length(items),
                    leftover: usage.pattern.leftover(stock.length, items),
                })
                .collect(),
        })
        .collect();

    let item_reports = items
        .iter()
        .zip(&eval.fulfilled)
        .map(|(item, &fulfilled)| ItemReport {
            id: item.id.clone(),
            length: item.length,
            demand: item.demand,
            fulfilled,
        })
        .collect();

    PlanReport {
        strategy: plan.strategy.name(),
        total_cost: eval.total_cost,
        demand_met: eval.demand_met,
        bar_count: eval.bar_count(),
        waste_percent: plan.solution.total_waste_percent(problem),
        seed: plan.seed,
        iterations: plan.iterations,
        elapsed_ms: plan.elapsed_ms,
        stocks,
        items: item_reports,
    }
}
