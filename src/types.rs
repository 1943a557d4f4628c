use std::collections::HashSet;

use serde::{Deserialize, Deserializer, Serialize, de::Error as _};

use crate::error::{CutError, Result};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StockType {
    pub id: String,
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    pub length: u32,
    pub cost: f64,
}

impl StockType {
    pub fn new(id: impl Into<String>, length: u32, cost: f64) -> Self {
        Self {
            id: id.into(),
            length,
            cost,
        }
    }

    pub fn unit_cost(&self) -> f64 {
        self.cost / self.length as f64
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct OrderItem {
    pub id: String,
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    pub length: u32,
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    pub demand: u32,
}

impl OrderItem {
    pub fn new(id: impl Into<String>, length: u32, demand: u32) -> Self {
        Self {
            id: id.into(),
            length,
            demand,
        }
    }
}

/// Accepts JSON integers as well as integral floats such as `80.0`.
pub fn deserialize_u32_from_number<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    if !value.is_finite() || value.fract() != 0.0 || value < 0.0 || value > u32::MAX as f64 {
        return Err(D::Error::custom(format!(
            "expected a non-negative integer, got {value}"
        )));
    }
    Ok(value as u32)
}

/// Unvalidated stock and order tables, as read from JSON.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Catalogue {
    pub stocks: Vec<StockType>,
    pub items: Vec<OrderItem>,
}

impl Catalogue {
    pub fn into_problem(self) -> Result<Problem> {
        Problem::new(self.stocks, self.items)
    }
}

/// Validated, immutable stock and order tables shared by every solver.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Problem {
    stocks: Vec<StockType>,
    items: Vec<OrderItem>,
}

impl Problem {
    pub fn new(stocks: Vec<StockType>, items: Vec<OrderItem>) -> Result<Self> {
        if stocks.is_empty() {
            return Err(CutError::InvalidConfiguration(
                "stock catalogue is empty".to_string(),
            ));
        }
        if items.is_empty() {
            return Err(CutError::InvalidConfiguration(
                "order catalogue is empty".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for s in &stocks {
            if s.length == 0 {
                return Err(CutError::InvalidConfiguration(format!(
                    "stock '{}' must have a non-zero length",
                    s.id
                )));
            }
            if !s.cost.is_finite() || s.cost <= 0.0 {
                return Err(CutError::InvalidConfiguration(format!(
                    "stock '{}' must have a positive cost, got {}",
                    s.id, s.cost
                )));
            }
            if !seen.insert(s.id.as_str()) {
                return Err(CutError::InvalidConfiguration(format!(
                    "duplicate stock id '{}'",
                    s.id
                )));
            }
        }

        let mut seen = HashSet::new();
        for item in &items {
            if item.length == 0 {
                return Err(CutError::InvalidConfiguration(format!(
                    "item '{}' must have a non-zero length",
                    item.id
                )));
            }
            if !seen.insert(item.id.as_str()) {
                return Err(CutError::InvalidConfiguration(format!(
                    "duplicate item id '{}'",
                    item.id
                )));
            }
        }

        let max_stock_length = stocks.iter().map(|s| s.length).max().unwrap_or(0);
        if let Some(item) = items.iter().find(|i| i.length > max_stock_length) {
            return Err(CutError::InfeasibleItem {
                item: item.id.clone(),
                length: item.length,
                max_stock_length,
            });
        }

        Ok(Self { stocks, items })
    }

    pub fn stocks(&self) -> &[StockType] {
        &self.stocks
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn demands(&self) -> Vec<u32> {
        self.items.iter().map(|i| i.demand).collect()
    }

    pub fn total_demand(&self) -> u64 {
        self.items.iter().map(|i| i.demand as u64).sum()
    }
}

/// Piece counts cut from a single bar, indexed like the item catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Pattern {
    counts: Vec<u32>,
}

impl Pattern {
    pub fn new(counts: Vec<u32>) -> Self {
        Self { counts }
    }

    pub fn counts(&self) -> &[u32] {
        &self.counts
    }

    pub fn count(&self, item: usize) -> u32 {
        self.counts.get(item).copied().unwrap_or(0)
    }

    pub fn pieces(&self) -> u32 {
        self.counts.iter().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.iter().all(|&c| c == 0)
    }

    pub fn used_length(&self, items: &[OrderItem]) -> u64 {
        self.counts
            .iter()
            .zip(items)
            .map(|(&c, item)| c as u64 * item.length as u64)
            .sum()
    }

    pub fn leftover(&self, stock_length: u32, items: &[OrderItem]) -> u64 {
        (stock_length as u64).saturating_sub(self.used_length(items))
    }

    /// True when no count exceeds the matching residual demand.
    pub fn fits_within(&self, residual: &[u32]) -> bool {
        self.counts.iter().zip(residual).all(|(&c, &r)| c <= r)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatternUsage {
    pub pattern: Pattern,
    pub count: u32,
}

/// Pattern usage counts grouped by stock type, in catalogue order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Solution {
    stocks: Vec<Vec<PatternUsage>>,
}

impl Solution {
    pub fn new(stock_count: usize) -> Self {
        Self {
            stocks: vec![Vec::new(); stock_count],
        }
    }

    /// Records one more bar of `stock` cut with `pattern`.
    pub fn add(&mut self, stock: usize, pattern: &Pattern) {
        self.add_many(stock, pattern, 1);
    }

    pub fn add_many(&mut self, stock: usize, pattern: &Pattern, count: u32) {
        if count == 0 {
            return;
        }
        if stock >= self.stocks.len() {
            self.stocks.resize(stock + 1, Vec::new());
        }
        let usages = &mut self.stocks[stock];
        match usages.iter_mut().find(|u| &u.pattern == pattern) {
            Some(usage) => usage.count += count,
            None => usages.push(PatternUsage {
                pattern: pattern.clone(),
                count,
            }),
        }
    }

    pub fn usages(&self, stock: usize) -> &[PatternUsage] {
        self.stocks.get(stock).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn stock_count(&self) -> usize {
        self.stocks.len()
    }

    /// Every `(stock index, pattern, count)` triple.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Pattern, u32)> {
        self.stocks
            .iter()
            .enumerate()
            .flat_map(|(si, usages)| usages.iter().map(move |u| (si, &u.pattern, u.count)))
    }

    pub fn bar_count(&self) -> u64 {
        self.iter().map(|(_, _, count)| count as u64).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.bar_count() == 0
    }

    pub fn total_waste_percent(&self, problem: &Problem) -> f64 {
        let mut total_stock: u64 = 0;
        let mut total_used: u64 = 0;
        for (si, pattern, count) in self.iter() {
            let Some(stock) = problem.stocks().get(si) else {
                continue;
            };
            let used = pattern.used_length(problem.items()).min(stock.length as u64);
            total_stock += stock.length as u64 * count as u64;
            total_used += used * count as u64;
        }
        if total_stock == 0 {
            return 0.0;
        }
        total_stock.saturating_sub(total_used) as f64 / total_stock as f64 * 100.0
    }
}
