use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExpenseInsightsError {
    #[error("Document store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error("No data available for {0}.")]
    NoData(String),

    #[error("Insufficient data for forecasting. Need at least {required} months, but found {actual}.")]
    InsufficientHistory { required: usize, actual: usize },

    #[error("Forecasting failed: {0}")]
    ModelFit(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ExpenseInsightsError>;
