//! Spending aggregates and per-category IQR outlier detection.

use crate::error::{ExpenseInsightsError, Result};
use crate::schema::{
    Anomaly, AnomalyReport, CategoryStat, MonthlyTotal, SpendingPatterns, Transaction,
};
use crate::utils::{format_year_month, month_start};
use chrono::NaiveDate;
use log::debug;
use std::collections::BTreeMap;

/// Tuning knobs for the IQR outlier rule.
#[derive(Debug, Clone)]
pub struct AnomalyConfig {
    /// Categories with fewer transactions than this are skipped; quartile
    /// estimates on tiny samples aren't trustworthy.
    pub min_category_size: usize,
    /// Bound multiplier: `[Q1 - k*IQR, Q3 + k*IQR]`.
    pub iqr_multiplier: f64,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            min_category_size: 5,
            iqr_multiplier: 1.5,
        }
    }
}

/// Computes the total, per-category, and per-month spending aggregates.
///
/// Categories are grouped in sorted name order, then ranked by sum
/// descending; the sort is stable, so ties keep the grouping order. Months
/// appear chronologically and only where data exists.
pub fn analyze_spending(transactions: &[Transaction]) -> Result<SpendingPatterns> {
    if transactions.is_empty() {
        return Err(ExpenseInsightsError::NoData("analysis".to_string()));
    }

    let total_spending: f64 = transactions.iter().map(|t| t.amount).sum();

    let mut by_category: BTreeMap<&str, (f64, u64)> = BTreeMap::new();
    let mut by_month: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for t in transactions {
        let entry = by_category.entry(t.category.as_str()).or_insert((0.0, 0));
        entry.0 += t.amount;
        entry.1 += 1;
        *by_month.entry(month_start(t.date)).or_insert(0.0) += t.amount;
    }

    let mut spending_by_category: Vec<CategoryStat> = by_category
        .into_iter()
        .map(|(category, (sum, count))| CategoryStat {
            category: category.to_string(),
            sum,
            mean: sum / count as f64,
            count,
        })
        .collect();
    spending_by_category.sort_by(|a, b| {
        b.sum
            .partial_cmp(&a.sum)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let monthly_spending: Vec<MonthlyTotal> = by_month
        .into_iter()
        .map(|(month, amount)| MonthlyTotal {
            year_month: format_year_month(month),
            amount,
        })
        .collect();

    Ok(SpendingPatterns {
        total_spending,
        spending_by_category,
        monthly_spending,
    })
}

/// Flags transactions whose amount falls outside the IQR bounds of their own
/// category's amount distribution.
///
/// Detection is independent per category; emission follows sorted-category
/// order, then row order within the category. No global severity ranking.
pub fn detect_anomalies(
    transactions: &[Transaction],
    config: &AnomalyConfig,
) -> Result<AnomalyReport> {
    if transactions.is_empty() {
        return Err(ExpenseInsightsError::NoData("anomaly detection".to_string()));
    }

    let mut groups: BTreeMap<&str, Vec<&Transaction>> = BTreeMap::new();
    for t in transactions {
        groups.entry(t.category.as_str()).or_default().push(t);
    }

    let mut detected_anomalies = Vec::new();
    for (category, rows) in groups {
        if rows.len() < config.min_category_size {
            debug!(
                "Skipping category '{}' for anomaly detection ({} < {} transactions)",
                category,
                rows.len(),
                config.min_category_size
            );
            continue;
        }

        let mut amounts: Vec<f64> = rows.iter().map(|t| t.amount).collect();
        amounts.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let q1 = quantile(&amounts, 0.25);
        let q3 = quantile(&amounts, 0.75);
        let iqr = q3 - q1;
        let lower_bound = q1 - config.iqr_multiplier * iqr;
        let upper_bound = q3 + config.iqr_multiplier * iqr;

        for t in rows {
            if t.amount < lower_bound || t.amount > upper_bound {
                detected_anomalies.push(Anomaly {
                    id: t.id.clone(),
                    amount: t.amount,
                    date: t.date,
                    category: t.category.clone(),
                    anomaly_reason: format!(
                        "Amount {:.2} outside IQR bounds [{:.2}, {:.2}] for category '{}'",
                        t.amount, lower_bound, upper_bound, category
                    ),
                });
            }
        }
    }

    Ok(AnomalyReport { detected_anomalies })
}

/// Linear-interpolated sample quantile over an ascending-sorted slice.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        let fraction = position - lower as f64;
        sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
    }
}
