use chrono::{Datelike, NaiveDate};
use expense_insights::utils::next_month;
use expense_insights::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde_json::{json, Map, Value};
use std::fs;

fn doc(value: Value) -> Map<String, Value> {
    value.as_object().unwrap().clone()
}

fn expense_doc(id: &str, amount: f64, date: NaiveDate, category: &str) -> Map<String, Value> {
    doc(json!({
        "id": id,
        "isExpense": "true",
        "amount": amount,
        "date": date.format("%m/%d/%Y").to_string(),
        "category": category,
    }))
}

/// 26 months of synthetic history ending June 2024: steady rent, noisy
/// groceries with one planted outlier, and a Fast Food habit that jumps to
/// six $8 purchases in the final month (from two $5 purchases before).
fn synthetic_collection(seed: u64) -> Vec<Map<String, Value>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let groceries = Normal::new(60.0, 5.0).unwrap();

    let mut documents = Vec::new();
    let mut month = NaiveDate::from_ymd_opt(2022, 5, 1).unwrap();
    let last_month = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();

    let mut index = 0;
    while month <= last_month {
        documents.push(expense_doc(
            &format!("rent-{}", index),
            1200.0,
            month.with_day(3).unwrap(),
            "Rent",
        ));

        for purchase in 0..3u32 {
            documents.push(expense_doc(
                &format!("groc-{}-{}", index, purchase),
                groceries.sample(&mut rng),
                month.with_day(5 + purchase * 7).unwrap(),
                "Groceries",
            ));
        }

        if month == last_month {
            for purchase in 0..6u32 {
                documents.push(expense_doc(
                    &format!("ff-{}-{}", index, purchase),
                    8.0,
                    month.with_day(2 + purchase * 4).unwrap(),
                    "Fast Food",
                ));
            }
        } else {
            for purchase in 0..2u32 {
                documents.push(expense_doc(
                    &format!("ff-{}-{}", index, purchase),
                    5.0,
                    month.with_day(6 + purchase * 10).unwrap(),
                    "Fast Food",
                ));
            }
        }

        month = next_month(month);
        index += 1;
    }

    // One wildly out-of-range groceries purchase for the anomaly detector.
    documents.push(expense_doc(
        "planted-outlier",
        500.0,
        NaiveDate::from_ymd_opt(2024, 6, 21).unwrap(),
        "Groceries",
    ));

    documents
}

#[test]
fn test_end_to_end_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let store_dir = dir.path().join("store");
    store::write_collection(&store_dir, "transactions", &synthetic_collection(42)).unwrap();

    let pipeline = InsightsPipeline::new(PipelineConfig {
        paths: ReportPaths::in_dir(dir.path().join("results")),
        ..PipelineConfig::default()
    });
    let today = NaiveDate::from_ymd_opt(2024, 7, 15).unwrap();
    let tips = pipeline
        .run_at(
            &JsonFileStore::new(&store_dir),
            today,
            &mut StdRng::seed_from_u64(9),
        )
        .unwrap();

    let paths = ReportPaths::in_dir(dir.path().join("results"));

    // Spending report: category sums reconcile with the grand total, and the
    // planted outlier was flagged with a reason naming its category.
    let spending: SpendingReport = load_report(&paths.spending).unwrap();
    let category_sum: f64 = spending
        .spending_patterns
        .spending_by_category
        .iter()
        .map(|c| c.sum)
        .sum();
    assert!((category_sum - spending.spending_patterns.total_spending).abs() < 1e-6);
    assert_eq!(spending.spending_patterns.monthly_spending.len(), 26);
    assert!(spending
        .anomalies
        .detected_anomalies
        .iter()
        .any(|a| a.id == "planted-outlier" && a.anomaly_reason.contains("'Groceries'")));

    // Forecast report: exactly the configured horizon, months continuing
    // from the last observed bucket, intervals bracketing the estimate.
    let forecast: ForecastReport = load_report(&paths.forecast).unwrap();
    assert_eq!(forecast.forecast.len(), 6);
    assert_eq!(forecast.forecast[0].month, "2024-07");
    assert_eq!(forecast.forecast[5].month, "2024-12");
    for point in &forecast.forecast {
        assert!(point.conf_int_lower <= point.predicted_amount);
        assert!(point.predicted_amount <= point.conf_int_upper);
    }

    // Savings report: the Fast Food habit trips both the frequency rule and
    // the month-over-average comparison ($48 vs a $10 trailing average).
    let savings: SavingsReport = load_report(&paths.savings).unwrap();
    let frequent = savings
        .savings_suggestions
        .iter()
        .find_map(|s| match s {
            SavingsSuggestion::FrequentSmallPurchases {
                count,
                total_amount,
                average_amount,
                ..
            } => Some((*count, *total_amount, *average_amount)),
            _ => None,
        })
        .expect("frequent_small_purchases should be present");
    assert_eq!(frequent.0, 6);
    assert!((frequent.1 - 48.0).abs() < 1e-9);
    assert!((frequent.2 - 8.0).abs() < 1e-9);

    let fast_food_increase = savings
        .savings_suggestions
        .iter()
        .find_map(|s| match s {
            SavingsSuggestion::SpendingIncrease {
                category,
                percentage_increase,
                ..
            } if category == "Fast Food" => Some(*percentage_increase),
            _ => None,
        })
        .expect("Fast Food spending_increase should be present");
    assert!((fast_food_increase - 3.8).abs() < 1e-9);

    // Tips: one per insight source, with the savings slot taken by the
    // highest-priority suggestion (the Fast Food increase).
    let kinds: Vec<TipKind> = tips.personalized_tips.iter().map(|t| t.kind).collect();
    assert_eq!(
        kinds,
        vec![
            TipKind::TopSpendingCategory,
            TipKind::AnomalyDetected,
            TipKind::ForecastInfo,
            TipKind::SpendingIncreaseTip,
        ]
    );
    let savings_tip = &tips.personalized_tips[3];
    assert!(savings_tip.message.contains("Fast Food"), "{}", savings_tip.message);

    // The tips file mirrors the returned report.
    let written: TipsReport = load_report(&paths.tips).unwrap();
    assert_eq!(written, tips);

    println!("✓ End-to-end pipeline test passed");
}

#[test]
fn test_rerun_is_idempotent_for_deterministic_stages() {
    let dir = tempfile::tempdir().unwrap();
    let store_dir = dir.path().join("store");
    store::write_collection(&store_dir, "transactions", &synthetic_collection(11)).unwrap();

    let run = |results: &str| -> (String, String, String) {
        let pipeline = InsightsPipeline::new(PipelineConfig {
            paths: ReportPaths::in_dir(dir.path().join(results)),
            ..PipelineConfig::default()
        });
        pipeline
            .run_at(
                &JsonFileStore::new(&store_dir),
                NaiveDate::from_ymd_opt(2024, 7, 15).unwrap(),
                &mut StdRng::seed_from_u64(3),
            )
            .unwrap();
        let paths = ReportPaths::in_dir(dir.path().join(results));
        (
            fs::read_to_string(&paths.spending).unwrap(),
            fs::read_to_string(&paths.forecast).unwrap(),
            fs::read_to_string(&paths.savings).unwrap(),
        )
    };

    assert_eq!(run("results-a"), run("results-b"));
}

#[test]
fn test_short_history_produces_forecast_error_file() {
    let dir = tempfile::tempdir().unwrap();
    let store_dir = dir.path().join("store");

    // 23 monthly buckets: one short of the requirement.
    let mut documents = Vec::new();
    let mut month = NaiveDate::from_ymd_opt(2022, 8, 1).unwrap();
    let mut rng = StdRng::seed_from_u64(5);
    for i in 0..23 {
        documents.push(expense_doc(
            &format!("t{}", i),
            800.0 + rng.gen_range(-50.0..50.0),
            month.with_day(10).unwrap(),
            "Groceries",
        ));
        month = next_month(month);
    }
    store::write_collection(&store_dir, "transactions", &documents).unwrap();

    let transactions =
        fetch_and_preprocess(&JsonFileStore::new(&store_dir), "transactions").unwrap();
    let err = forecast_expenses(&transactions, &ForecastConfig::default()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Insufficient data for forecasting. Need at least 24 months, but found 23."
    );

    // Written through the report layer, the failure becomes an error payload
    // that downstream consumers treat as missing data.
    let path = dir.path().join("expense_forecast_results.json");
    write_report::<ForecastReport>(&path, &Err(err)).unwrap();
    assert!(load_report::<ForecastReport>(&path).is_none());
}

#[test]
fn test_tip_generator_with_all_upstream_files_missing() {
    let dir = tempfile::tempdir().unwrap();
    let paths = ReportPaths::in_dir(dir.path());

    let tips = generate_tips(
        load_report::<SpendingReport>(&paths.spending).as_ref(),
        load_report::<ForecastReport>(&paths.forecast).as_ref(),
        load_report::<SavingsReport>(&paths.savings).as_ref(),
        &mut StdRng::seed_from_u64(1),
    );

    assert_eq!(tips.personalized_tips.len(), 1);
    assert_eq!(
        tips.personalized_tips[0].kind,
        TipKind::GeneralEncouragement
    );
}

#[test]
fn test_schema_error_flows_through_to_every_result_file() {
    let dir = tempfile::tempdir().unwrap();
    let store_dir = dir.path().join("store");

    // Documents lacking the date and category columns entirely.
    let documents = vec![
        doc(json!({"isExpense": "true", "amount": 12.0})),
        doc(json!({"isExpense": "false", "amount": 20.0})),
    ];
    store::write_collection(&store_dir, "transactions", &documents).unwrap();

    let pipeline = InsightsPipeline::new(PipelineConfig {
        paths: ReportPaths::in_dir(dir.path().join("results")),
        ..PipelineConfig::default()
    });
    let tips = pipeline
        .run_at(
            &JsonFileStore::new(&store_dir),
            NaiveDate::from_ymd_opt(2024, 7, 15).unwrap(),
            &mut StdRng::seed_from_u64(1),
        )
        .unwrap();

    let paths = ReportPaths::in_dir(dir.path().join("results"));
    for path in [&paths.spending, &paths.forecast, &paths.savings] {
        let value: Value = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(
            value["error"],
            "Missing required fields: date, category"
        );
    }

    assert_eq!(tips.personalized_tips.len(), 1);
    assert_eq!(
        tips.personalized_tips[0].kind,
        TipKind::GeneralEncouragement
    );
}

#[test]
fn test_empty_collection_degrades_without_schema_error() {
    let dir = tempfile::tempdir().unwrap();
    let store_dir = dir.path().join("store");
    store::write_collection(&store_dir, "transactions", &[]).unwrap();

    // An empty collection is not a schema error; it normalizes to an empty
    // sequence and each stage reports its own insufficient-data condition.
    let transactions =
        fetch_and_preprocess(&JsonFileStore::new(&store_dir), "transactions").unwrap();
    assert!(transactions.is_empty());

    assert!(analyze_spending(&transactions).is_err());
    assert!(forecast_expenses(&transactions, &ForecastConfig::default()).is_err());
    assert!(suggest_savings(
        &transactions,
        NaiveDate::from_ymd_opt(2024, 7, 15).unwrap(),
        &SavingsConfig::default()
    )
    .is_err());
}
