use crate::domain::model::{PurchaseLogRow, UNCATEGORIZED};
use crate::utils::error::{Result, TrackerError};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub category: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyReport {
    pub month: String,
    pub total_czk: f64,
    pub budget_czk: f64,
    /// Share of the budget spent, capped at 1.
    pub progress: f64,
    pub by_category: Vec<CategoryTotal>,
    #[serde(skip)]
    pub rows: Vec<PurchaseLogRow>,
}

impl MonthlyReport {
    pub fn over_budget(&self) -> bool {
        self.total_czk > self.budget_czk
    }
}

/// `YYYY-MM` of a purchase-log date, `None` when the date does not parse.
pub fn month_key(date: &str) -> Option<String> {
    let date = date.trim();
    let day = date.get(..10).unwrap_or(date);
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .ok()
        .map(|d| d.format("%Y-%m").to_string())
}

/// Check a user-supplied `YYYY-MM`.
pub fn parse_month(month: &str) -> Result<String> {
    let month = month.trim();
    let well_formed = month.len() == 7
        && month.as_bytes()[4] == b'-'
        && NaiveDate::parse_from_str(&format!("{}-01", month), "%Y-%m-%d").is_ok();
    if !well_formed {
        return Err(TrackerError::validation(format!(
            "month '{}' is not in YYYY-MM form",
            month
        )));
    }
    Ok(month.to_string())
}

/// Months present in the log, oldest first.
pub fn months(rows: &[PurchaseLogRow]) -> Vec<String> {
    rows.iter()
        .filter_map(|r| month_key(&r.date))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Build the report for `month`, or for the latest month in the log.
/// Returns `None` when the log has no dated rows.
pub fn monthly_report(
    rows: &[PurchaseLogRow],
    month: Option<&str>,
    budget_czk: f64,
) -> Option<MonthlyReport> {
    let month = match month {
        Some(m) => m.to_string(),
        None => months(rows).pop()?,
    };

    let selected: Vec<PurchaseLogRow> = rows
        .iter()
        .filter(|r| month_key(&r.date).as_deref() == Some(month.as_str()))
        .cloned()
        .collect();

    let total_czk: f64 = selected.iter().map(|r| r.price_total).sum();
    let progress = if budget_czk > 0.0 {
        (total_czk / budget_czk).min(1.0)
    } else {
        1.0
    };

    let mut sums: HashMap<String, f64> = HashMap::new();
    for row in &selected {
        let category = match row.category.trim() {
            "" => UNCATEGORIZED.to_string(),
            c => c.to_string(),
        };
        *sums.entry(category).or_insert(0.0) += row.price_total;
    }

    let mut by_category: Vec<CategoryTotal> = sums
        .into_iter()
        .map(|(category, amount)| CategoryTotal { category, amount })
        .collect();
    by_category.sort_by(|a, b| {
        b.amount
            .total_cmp(&a.amount)
            .then_with(|| a.category.cmp(&b.category))
    });

    Some(MonthlyReport {
        month,
        total_czk,
        budget_czk,
        progress,
        by_category,
        rows: selected,
    })
}
