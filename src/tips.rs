//! Personalized tips over the three upstream result payloads.
//!
//! This stage is a pure function of whatever upstream reports are available;
//! a missing or errored input simply contributes no tips. The one anomaly to
//! highlight is picked uniformly at random through an injected source so
//! tests can pin the choice.

use crate::schema::{
    ForecastReport, SavingsReport, SavingsSuggestion, Severity, SpendingReport, Tip, TipKind,
    TipsReport,
};
use rand::seq::SliceRandom;
use rand::Rng;

/// Builds at most one tip per insight source: top category, one random
/// anomaly, the nearest forecast month, and the highest-priority savings
/// suggestion.
pub fn generate_tips<R: Rng>(
    spending: Option<&SpendingReport>,
    forecast: Option<&ForecastReport>,
    savings: Option<&SavingsReport>,
    rng: &mut R,
) -> TipsReport {
    let mut tips = Vec::new();

    if let Some(report) = spending {
        if let Some(top) = report.spending_patterns.spending_by_category.first() {
            tips.push(Tip {
                kind: TipKind::TopSpendingCategory,
                severity: Severity::Info,
                message: format!(
                    "Your highest spending category overall is \"{}\" (${:.2} total). Regularly reviewing expenses here might reveal savings opportunities.",
                    top.category, top.sum
                ),
            });
        }

        // One anomaly at most, to avoid overwhelming the user.
        if let Some(anomaly) = report.anomalies.detected_anomalies.choose(rng) {
            tips.push(Tip {
                kind: TipKind::AnomalyDetected,
                severity: Severity::Warning,
                message: format!(
                    "We noticed an unusual transaction: ${:.2} in \"{}\" around {}. Was this expected? {}",
                    anomaly.amount,
                    anomaly.category,
                    anomaly.date.format("%Y-%m-%d"),
                    anomaly.anomaly_reason
                ),
            });
        }
    }

    if let Some(report) = forecast {
        if let Some(next) = report.forecast.first() {
            tips.push(Tip {
                kind: TipKind::ForecastInfo,
                severity: Severity::Info,
                message: format!(
                    "Looking ahead, we forecast expenses around ${:.2} for {}. Keep this in mind for your budget.",
                    next.predicted_amount, next.month
                ),
            });
        }
    }

    if let Some(report) = savings {
        if let Some(tip) = savings_tip(&report.savings_suggestions) {
            tips.push(tip);
        }
    }

    if tips.is_empty() {
        tips.push(Tip {
            kind: TipKind::GeneralEncouragement,
            severity: Severity::Info,
            message: "Keep tracking your expenses to stay on top of your finances!".to_string(),
        });
    }

    TipsReport {
        personalized_tips: tips,
    }
}

/// Exactly one savings tip, by fixed priority: the largest spending increase,
/// then discretionary spending, then frequent small purchases, then a
/// general review of the top categories. Lower-priority suggestions are
/// ignored once a match is found.
fn savings_tip(suggestions: &[SavingsSuggestion]) -> Option<Tip> {
    let mut top_increase: Option<(&str, f64)> = None;
    for suggestion in suggestions {
        if let SavingsSuggestion::SpendingIncrease {
            category,
            percentage_increase,
            ..
        } = suggestion
        {
            // Strict comparison keeps the first suggestion on ties.
            let replace = match top_increase {
                Some((_, best)) => *percentage_increase > best,
                None => true,
            };
            if replace {
                top_increase = Some((category.as_str(), *percentage_increase));
            }
        }
    }
    if let Some((category, percentage_increase)) = top_increase {
        return Some(Tip {
            kind: TipKind::SpendingIncreaseTip,
            severity: Severity::Warning,
            message: format!(
                "Focus on \"{}\": spending here jumped {:.0}% last month compared to your average. Review recent purchases in this category.",
                category,
                percentage_increase * 100.0
            ),
        });
    }

    for suggestion in suggestions {
        if let SavingsSuggestion::TopDiscretionary { details, .. } = suggestion {
            if let Some(top) = details.first() {
                return Some(Tip {
                    kind: TipKind::DiscretionarySpendingTip,
                    severity: Severity::Info,
                    message: format!(
                        "Your spending on discretionary items like \"{}\" was significant last month. This is often a good area to find potential savings.",
                        top.category
                    ),
                });
            }
        }
    }

    for suggestion in suggestions {
        if let SavingsSuggestion::FrequentSmallPurchases {
            category, count, ..
        } = suggestion
        {
            return Some(Tip {
                kind: TipKind::FrequentPurchasesTip,
                severity: Severity::Info,
                message: format!(
                    "Those frequent small purchases in \"{}\" ({} times last month) add up! Consider if you can cut back slightly.",
                    category, count
                ),
            });
        }
    }

    // Generic fallback: point at whichever top-categories list is present.
    match suggestions.first() {
        Some(SavingsSuggestion::TopCategoriesLastMonth { details, .. }) => {
            details.first().map(|top| Tip {
                kind: TipKind::GeneralReviewTip,
                severity: Severity::Info,
                message: format!(
                    "Reviewing your top spending categories from last month, like \"{}\", is a good starting point for managing your budget.",
                    top.category
                ),
            })
        }
        _ => suggestions
            .iter()
            .find_map(|s| match s {
                SavingsSuggestion::TopCategoriesOverall { details, .. } => details.first(),
                _ => None,
            })
            .map(|top| Tip {
                kind: TipKind::GeneralReviewTip,
                severity: Severity::Info,
                message: format!(
                    "Reviewing your overall top spending categories, like \"{}\", is a good starting point for managing your budget.",
                    top.category
                ),
            }),
    }
}
