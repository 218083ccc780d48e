use thiserror::Error;

#[derive(Error, Debug)]
pub enum PKError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid model configuration: {0}")]
    InvalidModel(String),

    #[error("Value {value} out of range [{min}, {max}] for {control}")]
    OutOfRange {
        control: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Time series contains no samples")]
    EmptySeries,

    #[error("Invalid time series: {0}")]
    InvalidSeries(String),

    #[error("Simulation error: {0}")]
    Simulation(String),

    #[error("Profile not found: {0}")]
    ProfileNotFound(String),

    #[error("Profile '{0}' is a read-only example profile")]
    ReadOnlyProfile(String),

    #[error("Parameter validation error: {0}")]
    Validation(String),

    #[error("Random number generation error")]
    Random,
}

impl PKError {
    /// True for failures that originate in a malformed series handed to NCA.
    pub fn is_series_error(&self) -> bool {
        matches!(self, PKError::EmptySeries | PKError::InvalidSeries(_))
    }
}

pub type PKResult<T> = Result<T, PKError>;
