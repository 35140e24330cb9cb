use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A normalized expense transaction.
///
/// Every instance satisfies the ingestion invariant: the amount is a finite
/// number, the date parsed successfully, the category is present, and the
/// source record was flagged as an expense.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Transaction {
    pub id: String,
    pub amount: f64,
    pub date: NaiveDate,
    pub category: String,
}

/// Per-category aggregate, ranked by `sum` descending in the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CategoryStat {
    pub category: String,
    pub sum: f64,
    pub mean: f64,
    pub count: u64,
}

/// Sum of expense amounts for one calendar month present in the data.
/// Months with no transactions are simply absent; the series is not
/// zero-filled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MonthlyTotal {
    pub year_month: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SpendingPatterns {
    pub total_spending: f64,
    pub spending_by_category: Vec<CategoryStat>,
    pub monthly_spending: Vec<MonthlyTotal>,
}

/// A transaction whose amount fell outside its category's IQR bounds,
/// with a human-readable reason naming the bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Anomaly {
    pub id: String,
    pub amount: f64,
    pub date: NaiveDate,
    pub category: String,
    pub anomaly_reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AnomalyReport {
    pub detected_anomalies: Vec<Anomaly>,
}

/// Payload of the spending-analysis result file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SpendingReport {
    pub spending_patterns: SpendingPatterns,
    pub anomalies: AnomalyReport,
}

/// One projected month with a symmetric two-sided confidence interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ForecastPoint {
    pub month: String,
    pub predicted_amount: f64,
    pub conf_int_lower: f64,
    pub conf_int_upper: f64,
}

/// Payload of the expense-forecast result file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ForecastReport {
    pub forecast: Vec<ForecastPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CategoryAmount {
    pub category: String,
    pub amount: f64,
}

/// A single savings suggestion. The serialized `type` tag matches the rule
/// that produced it; rules are additive, so one report may carry several
/// variants at once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SavingsSuggestion {
    Info {
        message: String,
    },

    TopCategoriesOverall {
        message: String,
        details: Vec<CategoryAmount>,
    },

    TopCategoriesLastMonth {
        message: String,
        details: Vec<CategoryAmount>,
    },

    TopDiscretionary {
        message: String,
        details: Vec<CategoryAmount>,
    },

    SpendingIncrease {
        category: String,
        message: String,
        last_month_amount: f64,
        previous_avg_amount: f64,
        percentage_increase: f64,
    },

    FrequentSmallPurchases {
        category: String,
        message: String,
        count: u64,
        total_amount: f64,
        average_amount: f64,
    },
}

/// Payload of the savings-suggestions result file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SavingsReport {
    pub savings_suggestions: Vec<SavingsSuggestion>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TipKind {
    TopSpendingCategory,
    AnomalyDetected,
    ForecastInfo,
    SpendingIncreaseTip,
    DiscretionarySpendingTip,
    FrequentPurchasesTip,
    GeneralReviewTip,
    GeneralEncouragement,
}

/// Final user-facing artifact: at most one tip per insight source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Tip {
    #[serde(rename = "type")]
    pub kind: TipKind,
    pub severity: Severity,
    pub message: String,
}

/// Payload of the personalized-tips result file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TipsReport {
    pub personalized_tips: Vec<Tip>,
}

impl SpendingReport {
    pub fn schema_as_json() -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&schemars::schema_for!(SpendingReport))
    }
}

impl ForecastReport {
    pub fn schema_as_json() -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&schemars::schema_for!(ForecastReport))
    }
}

impl SavingsReport {
    pub fn schema_as_json() -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&schemars::schema_for!(SavingsReport))
    }
}

impl TipsReport {
    pub fn schema_as_json() -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&schemars::schema_for!(TipsReport))
    }
}
