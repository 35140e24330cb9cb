//! # Expense Insights
//!
//! A small personal-finance analytics pipeline: expense transactions are
//! pulled from a document store, normalized once, and fanned out to three
//! analysis stages whose JSON result files feed a final tip generator.
//!
//! ## Stages
//!
//! - **Ingestion**: validates the loose source schema, coerces fields,
//!   keeps expense rows, sorts by date. Shared by every stage downstream.
//! - **Spending analysis**: total/category/monthly aggregates plus
//!   per-category IQR outlier detection.
//! - **Forecasting**: calendar-month sums fitted with a fixed-order
//!   ARIMA model, projecting future months with 95% confidence bounds.
//! - **Savings suggestions**: rule-based comparison of the last completed
//!   month against a trailing average, discretionary highlights, and a
//!   frequent-small-purchases check.
//! - **Tips**: at most one human-readable tip per insight, derived from the
//!   three result files.
//!
//! Stages coordinate purely through the filesystem: each writes its payload
//! (or an `{"error": ...}` object) to a well-known path, and consumers treat
//! anything unusable as missing data rather than crashing.
//!
//! ## Example
//!
//! ```rust,ignore
//! use expense_insights::*;
//!
//! let store = JsonFileStore::new("./store");
//! let pipeline = InsightsPipeline::new(PipelineConfig {
//!     collection: "transactions".to_string(),
//!     paths: ReportPaths::in_dir("./results"),
//!     ..PipelineConfig::default()
//! });
//!
//! let tips = pipeline.run(&store).unwrap();
//! for tip in tips.personalized_tips {
//!     println!("[{:?}] {}", tip.severity, tip.message);
//! }
//! ```

pub mod analysis;
pub mod error;
pub mod forecast;
pub mod ingestion;
pub mod report;
pub mod savings;
pub mod schema;
pub mod store;
pub mod tips;
pub mod utils;

pub use analysis::{analyze_spending, detect_anomalies, AnomalyConfig};
pub use error::{ExpenseInsightsError, Result};
pub use forecast::{forecast_expenses, monthly_totals, ForecastConfig};
pub use ingestion::{fetch_and_preprocess, normalize_documents, REQUIRED_FIELDS};
pub use report::{load_report, write_error_report, write_report, ReportPaths};
pub use savings::{default_discretionary_categories, suggest_savings, SavingsConfig};
pub use schema::*;
pub use store::{DocumentStore, JsonFileStore, RawDocument};
pub use tips::generate_tips;

use chrono::{NaiveDate, Utc};
use log::{info, warn};
use rand::Rng;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Name of the document-store collection holding raw transactions.
    pub collection: String,
    pub paths: ReportPaths,
    pub anomalies: AnomalyConfig,
    pub forecast: ForecastConfig,
    pub savings: SavingsConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            collection: "transactions".to_string(),
            paths: ReportPaths::in_dir("results"),
            anomalies: AnomalyConfig::default(),
            forecast: ForecastConfig::default(),
            savings: SavingsConfig::default(),
        }
    }
}

/// Runs the whole pipeline in stage order against one store handle.
///
/// Ingestion happens exactly once; the three analysis stages consume the same
/// normalized sequence. A failed stage writes its error payload and the run
/// continues — the tip generator reads back whatever result files ended up
/// usable.
pub struct InsightsPipeline {
    config: PipelineConfig,
}

impl InsightsPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Runs with the current date and a thread-local random source.
    pub fn run(&self, store: &dyn DocumentStore) -> Result<TipsReport> {
        self.run_at(store, Utc::now().date_naive(), &mut rand::thread_rng())
    }

    /// Deterministic variant: the reference date anchors the savings
    /// engine's "last month", and the random source drives the tip
    /// generator's anomaly pick.
    pub fn run_at<R: Rng>(
        &self,
        store: &dyn DocumentStore,
        today: NaiveDate,
        rng: &mut R,
    ) -> Result<TipsReport> {
        let paths = &self.config.paths;

        match ingestion::fetch_and_preprocess(store, &self.config.collection) {
            Ok(transactions) => {
                info!(
                    "Running analysis stages over {} transactions.",
                    transactions.len()
                );

                let spending = analyze_spending(&transactions).and_then(|spending_patterns| {
                    Ok(SpendingReport {
                        spending_patterns,
                        anomalies: detect_anomalies(&transactions, &self.config.anomalies)?,
                    })
                });
                write_report(&paths.spending, &spending)?;

                let forecast = forecast_expenses(&transactions, &self.config.forecast);
                write_report(&paths.forecast, &forecast)?;

                let savings = suggest_savings(&transactions, today, &self.config.savings);
                write_report(&paths.savings, &savings)?;
            }
            Err(e) => {
                // A store or schema failure is fatal for the analysis stages,
                // but the run still produces a full set of result files.
                warn!("Ingestion failed: {}", e);
                let message = e.to_string();
                write_error_report(&paths.spending, &message)?;
                write_error_report(&paths.forecast, &message)?;
                write_error_report(&paths.savings, &message)?;
            }
        }

        let tips = generate_tips(
            load_report::<SpendingReport>(&paths.spending).as_ref(),
            load_report::<ForecastReport>(&paths.forecast).as_ref(),
            load_report::<SavingsReport>(&paths.savings).as_ref(),
            rng,
        );
        write_report(&paths.tips, &Ok(tips.clone()))?;

        Ok(tips)
    }
}
