//! Domain error types.

/// Top-level error type for riskmetric.
#[derive(Debug, thiserror::Error)]
pub enum RiskError {
    #[error("no bounds configured for {asset}")]
    NotConfigured { asset: String },

    #[error("{what} out of range: {value}")]
    OutOfRange { what: String, value: f64 },

    #[error("invalid bounds for {asset}: {reason}")]
    InvalidBounds { asset: String, reason: String },

    #[error("bounds of reference asset {asset} are governed; use {admin_endpoint}")]
    Permission {
        asset: String,
        admin_endpoint: String,
    },

    #[error("invalid occupancy profile for {asset}: {reason}")]
    InvalidProfile { asset: String, reason: String },

    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RiskError {
    pub fn out_of_range(what: &str, value: f64) -> Self {
        RiskError::OutOfRange {
            what: what.to_string(),
            value,
        }
    }
}

impl From<&RiskError> for std::process::ExitCode {
    fn from(err: &RiskError) -> Self {
        let code: u8 = match err {
            RiskError::Io(_) => 1,
            RiskError::ConfigParse { .. }
            | RiskError::ConfigMissing { .. }
            | RiskError::ConfigInvalid { .. } => 2,
            RiskError::Database { .. } | RiskError::DatabaseQuery { .. } => 3,
            RiskError::NotConfigured { .. } => 4,
            RiskError::OutOfRange { .. }
            | RiskError::InvalidBounds { .. }
            | RiskError::InvalidProfile { .. } => 5,
            RiskError::Permission { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
