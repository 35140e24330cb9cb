//! Rule-based savings suggestions.
//!
//! All rules pivot on the last completed calendar month relative to an
//! explicit reference date; the caller injects "today" so runs are
//! reproducible. Rules are additive, not mutually exclusive, and the output
//! order follows rule evaluation order.

use crate::error::{ExpenseInsightsError, Result};
use crate::schema::{CategoryAmount, SavingsReport, SavingsSuggestion, Transaction};
use crate::utils::{month_start, months_back, prev_month};
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone)]
pub struct SavingsConfig {
    /// How many top spending categories to highlight.
    pub top_n: usize,
    /// Size of the trailing window the last month is compared against.
    pub comparison_months: u32,
    /// Fractional month-over-average increase that triggers a flag.
    pub increase_threshold: f64,
    /// Categories considered non-essential.
    pub discretionary_categories: Vec<String>,
    /// Category watched for high-frequency small purchases.
    pub frequent_category: String,
    /// Purchase count above which the frequency rule fires.
    pub frequent_min_count: usize,
}

impl Default for SavingsConfig {
    fn default() -> Self {
        Self {
            top_n: 5,
            comparison_months: 3,
            increase_threshold: 0.15,
            discretionary_categories: default_discretionary_categories(),
            frequent_category: "Fast Food".to_string(),
            frequent_min_count: 5,
        }
    }
}

pub fn default_discretionary_categories() -> Vec<String> {
    [
        "Restaurants",
        "Fast Food",
        "Entertainment",
        "Shopping",
        "Coffee Shops",
        "Hobbies",
        "Travel",
        "Gifts & Donations",
        "Personal Care",
        "Clothing",
    ]
    .iter()
    .map(|c| c.to_string())
    .collect()
}

/// Derives savings suggestions from the transaction history, relative to
/// `today`'s calendar month.
pub fn suggest_savings(
    transactions: &[Transaction],
    today: NaiveDate,
    config: &SavingsConfig,
) -> Result<SavingsReport> {
    if transactions.is_empty() {
        return Err(ExpenseInsightsError::NoData(
            "savings suggestions".to_string(),
        ));
    }

    let mut suggestions = Vec::new();
    let last_month = prev_month(month_start(today));

    let last_month_rows: Vec<&Transaction> = transactions
        .iter()
        .filter(|t| month_start(t.date) == last_month)
        .collect();

    // Without a completed month to look at, fall back to overall totals.
    if last_month_rows.is_empty() {
        suggestions.push(SavingsSuggestion::Info {
            message: format!(
                "Insufficient data for the most recent full month {} to generate detailed savings suggestions.",
                last_month.format("%Y-%m")
            ),
        });

        let overall = ranked_category_totals(transactions.iter());
        let top: Vec<CategoryAmount> = overall.into_iter().take(config.top_n).collect();
        if !top.is_empty() {
            suggestions.push(SavingsSuggestion::TopCategoriesOverall {
                message: format!(
                    "Your overall top {} spending categories are: {}. Reviewing these might reveal savings opportunities.",
                    config.top_n,
                    join_categories(&top)
                ),
                details: top,
            });
        }
        return Ok(SavingsReport {
            savings_suggestions: suggestions,
        });
    }

    // 1. Top spending categories last month
    let ranked = ranked_category_totals(last_month_rows.iter().copied());
    let top_last_month: Vec<CategoryAmount> =
        ranked.into_iter().take(config.top_n).collect();
    suggestions.push(SavingsSuggestion::TopCategoriesLastMonth {
        message: format!(
            "In {}, your top {} spending categories were: {}. Consider reviewing these areas.",
            last_month.format("%B %Y"),
            top_last_month.len(),
            join_categories(&top_last_month)
        ),
        details: top_last_month.clone(),
    });

    // 2. Discretionary spending within the top categories
    let top_discretionary: Vec<CategoryAmount> = top_last_month
        .iter()
        .filter(|c| config.discretionary_categories.contains(&c.category))
        .cloned()
        .collect();
    if !top_discretionary.is_empty() {
        suggestions.push(SavingsSuggestion::TopDiscretionary {
            message: format!(
                "Among your top spending areas last month, these are often considered discretionary: {}. Reducing spending here could lead to savings.",
                join_categories(&top_discretionary)
            ),
            details: top_discretionary,
        });
    }

    // 3. Last month vs. the trailing window average
    let window_start = months_back(last_month, config.comparison_months);
    let mut window_sums: BTreeMap<NaiveDate, BTreeMap<&str, f64>> = BTreeMap::new();
    for t in transactions {
        let month = month_start(t.date);
        if month >= window_start && month < last_month {
            *window_sums
                .entry(month)
                .or_default()
                .entry(t.category.as_str())
                .or_insert(0.0) += t.amount;
        }
    }

    if !window_sums.is_empty() {
        let last_sums = category_totals(last_month_rows.iter().copied());

        // The average divides by the months that actually have data, not by
        // the window size; absent months silently shrink the denominator.
        let window_month_count = window_sums.len() as f64;
        let mut previous_avg: BTreeMap<&str, f64> = BTreeMap::new();
        for sums in window_sums.values() {
            for (category, amount) in sums {
                *previous_avg.entry(*category).or_insert(0.0) += amount / window_month_count;
            }
        }

        let categories: BTreeSet<&str> = last_sums
            .keys()
            .copied()
            .chain(previous_avg.keys().copied())
            .collect();

        let mut increases: Vec<(f64, &str, f64, f64)> = Vec::new();
        for category in categories {
            let last = last_sums.get(category).copied().unwrap_or(0.0);
            let avg = previous_avg.get(category).copied().unwrap_or(0.0);
            // A zero baseline yields 0% rather than infinity, so a category
            // appearing out of nowhere never trips this rule.
            let pct_change = if avg == 0.0 { 0.0 } else { (last - avg) / avg };
            if pct_change > config.increase_threshold && last > 0.0 {
                increases.push((pct_change, category, last, avg));
            }
        }
        increases.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        for (pct_change, category, last, avg) in increases {
            suggestions.push(SavingsSuggestion::SpendingIncrease {
                category: category.to_string(),
                message: format!(
                    "Spending in \"{}\" increased by {:.0}% last month compared to the previous {}-month average (spent {:.2} vs avg {:.2}).",
                    category,
                    pct_change * 100.0,
                    config.comparison_months,
                    last,
                    avg
                ),
                last_month_amount: last,
                previous_avg_amount: avg,
                percentage_increase: pct_change,
            });
        }
    }

    // 4. Frequent small purchases in the watched category
    let frequent: Vec<&&Transaction> = last_month_rows
        .iter()
        .filter(|t| t.category == config.frequent_category)
        .collect();
    if frequent.len() > config.frequent_min_count {
        let total_amount: f64 = frequent.iter().map(|t| t.amount).sum();
        let average_amount = total_amount / frequent.len() as f64;
        suggestions.push(SavingsSuggestion::FrequentSmallPurchases {
            category: config.frequent_category.clone(),
            message: format!(
                "You made {} purchases in \"{}\" last month, totaling {:.2}. Even small amounts add up.",
                frequent.len(),
                config.frequent_category,
                total_amount
            ),
            count: frequent.len() as u64,
            total_amount,
            average_amount,
        });
    }

    if suggestions.is_empty() {
        suggestions.push(SavingsSuggestion::Info {
            message: "No specific savings suggestions identified based on recent spending patterns."
                .to_string(),
        });
    }

    Ok(SavingsReport {
        savings_suggestions: suggestions,
    })
}

fn category_totals<'a>(rows: impl Iterator<Item = &'a Transaction>) -> BTreeMap<&'a str, f64> {
    let mut totals = BTreeMap::new();
    for t in rows {
        *totals.entry(t.category.as_str()).or_insert(0.0) += t.amount;
    }
    totals
}

/// Category totals ranked by amount descending; ties keep sorted name order.
fn ranked_category_totals<'a>(
    rows: impl Iterator<Item = &'a Transaction>,
) -> Vec<CategoryAmount> {
    let mut ranked: Vec<CategoryAmount> = category_totals(rows)
        .into_iter()
        .map(|(category, amount)| CategoryAmount {
            category: category.to_string(),
            amount,
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.amount
            .partial_cmp(&a.amount)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked
}

fn join_categories(details: &[CategoryAmount]) -> String {
    details
        .iter()
        .map(|c| c.category.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
