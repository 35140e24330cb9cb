//! Seeds a small on-disk document store with synthetic expense history and
//! runs the full pipeline over it.
//!
//! Run with: cargo run --example run_pipeline

use anyhow::Result;
use chrono::{Datelike, NaiveDate};
use expense_insights::utils::next_month;
use expense_insights::{
    store, InsightsPipeline, JsonFileStore, PipelineConfig, ReportPaths,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde_json::{json, Map, Value};

fn expense(id: String, amount: f64, date: NaiveDate, category: &str) -> Map<String, Value> {
    json!({
        "id": id,
        "isExpense": "true",
        "amount": format!("{:.2}", amount),
        "date": date.format("%m/%d/%Y").to_string(),
        "category": category,
    })
    .as_object()
    .expect("literal is an object")
    .clone()
}

fn main() -> Result<()> {
    let mut rng = StdRng::seed_from_u64(2024);
    let groceries = Normal::new(62.0, 7.0)?;
    let restaurants: Normal<f64> = Normal::new(35.0, 12.0)?;

    let mut documents = Vec::new();
    let mut month = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap();
    let end = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
    let mut index = 0;
    while month <= end {
        documents.push(expense(
            format!("rent-{index}"),
            1450.0,
            month.with_day(1).unwrap(),
            "Rent",
        ));
        for purchase in 0..4u32 {
            documents.push(expense(
                format!("groc-{index}-{purchase}"),
                groceries.sample(&mut rng),
                month.with_day(2 + purchase * 7).unwrap(),
                "Groceries",
            ));
        }
        for purchase in 0..3u32 {
            documents.push(expense(
                format!("rest-{index}-{purchase}"),
                restaurants.sample(&mut rng).max(8.0),
                month.with_day(4 + purchase * 9).unwrap(),
                "Restaurants",
            ));
        }
        month = next_month(month);
        index += 1;
    }

    let store_dir = std::path::Path::new("demo_store");
    store::write_collection(store_dir, "transactions", &documents)?;
    println!(
        "Seeded {} documents into {}/transactions.json",
        documents.len(),
        store_dir.display()
    );

    let pipeline = InsightsPipeline::new(PipelineConfig {
        collection: "transactions".to_string(),
        paths: ReportPaths::in_dir("demo_results"),
        ..PipelineConfig::default()
    });
    let tips = pipeline.run(&JsonFileStore::new(store_dir))?;

    println!("Result files written to demo_results/");
    for tip in tips.personalized_tips {
        println!("[{:?}] {}", tip.severity, tip.message);
    }

    Ok(())
}
