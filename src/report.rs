//! Inter-stage file contract.
//!
//! Each stage writes one JSON object to a well-known path: its payload on
//! success, `{"error": "<message>"}` on failure. Consumers must treat a
//! missing file, unreadable JSON, or an error payload as "no usable data" —
//! never as a reason to crash.

use crate::error::Result;
use log::warn;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// Well-known output locations for the four pipeline stages.
#[derive(Debug, Clone)]
pub struct ReportPaths {
    pub spending: PathBuf,
    pub forecast: PathBuf,
    pub savings: PathBuf,
    pub tips: PathBuf,
}

impl ReportPaths {
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            spending: dir.join("spending_analysis_results.json"),
            forecast: dir.join("expense_forecast_results.json"),
            savings: dir.join("savings_suggestions_results.json"),
            tips: dir.join("personalized_tips_results.json"),
        }
    }
}

/// Writes a stage outcome: the payload when the stage succeeded, an error
/// payload with the failure message otherwise.
pub fn write_report<T: Serialize>(path: &Path, outcome: &Result<T>) -> Result<()> {
    match outcome {
        Ok(payload) => write_json(path, payload),
        Err(e) => write_error_report(path, &e.to_string()),
    }
}

pub fn write_error_report(path: &Path, message: &str) -> Result<()> {
    write_json(path, &json!({ "error": message }))
}

fn write_json<T: Serialize>(path: &Path, payload: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(payload)?)?;
    Ok(())
}

/// Loads a stage result, degrading to `None` on every failure mode: file
/// missing, JSON unreadable, an `{"error": ...}` payload, or a payload of
/// the wrong shape.
pub fn load_report<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(_) => {
            warn!("Input file not found: {}", path.display());
            return None;
        }
    };

    let value: Value = match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(_) => {
            warn!("Could not decode JSON from file: {}", path.display());
            return None;
        }
    };

    if let Some(error) = value.get("error") {
        warn!(
            "Input file {} contains an error: {}",
            path.display(),
            error
        );
        return None;
    }

    match serde_json::from_value(value) {
        Ok(payload) => Some(payload),
        Err(e) => {
            warn!(
                "Input file {} has an unexpected shape: {}",
                path.display(),
                e
            );
            None
        }
    }
}
