//! Domain error types.

/// Top-level error type for slotwalk.
#[derive(Debug, thiserror::Error)]
pub enum SlotwalkError {
    #[error("missing required columns: {}", .missing.join(", "))]
    Schema { missing: Vec<String> },

    #[error("row {row}: cannot parse {column} value {value:?}: {reason}")]
    Parse {
        row: usize,
        column: String,
        value: String,
        reason: String,
    },

    #[error("row {row}: premium must be a positive number, got {value}")]
    InvalidPremium { row: usize, value: f64 },

    #[error("invalid evaluation setup: {reason}")]
    Configuration { reason: String },

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

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SlotwalkError {
    pub(crate) fn configuration(reason: impl Into<String>) -> Self {
        SlotwalkError::Configuration {
            reason: reason.into(),
        }
    }
}

impl From<&SlotwalkError> for std::process::ExitCode {
    fn from(err: &SlotwalkError) -> Self {
        let code: u8 = match err {
            SlotwalkError::Io(_) => 1,
            SlotwalkError::ConfigParse { .. }
            | SlotwalkError::ConfigMissing { .. }
            | SlotwalkError::ConfigInvalid { .. } => 2,
            SlotwalkError::Schema { .. }
            | SlotwalkError::Parse { .. }
            | SlotwalkError::InvalidPremium { .. }
            | SlotwalkError::Data { .. } => 3,
            SlotwalkError::Configuration { .. } => 4,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_error_names_every_missing_column() {
        let err = SlotwalkError::Schema {
            missing: vec!["Premium".into(), "CommissionFees".into()],
        };
        assert_eq!(
            err.to_string(),
            "missing required columns: Premium, CommissionFees"
        );
    }

    #[test]
    fn parse_error_quotes_value() {
        let err = SlotwalkError::Parse {
            row: 3,
            column: "EntryTime".into(),
            value: "yesterday".into(),
            reason: "input contains invalid characters".into(),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("row 3: cannot parse EntryTime value \"yesterday\""));
    }

    #[test]
    fn configuration_helper_builds_variant() {
        let err = SlotwalkError::configuration("lookback is empty");
        assert!(matches!(err, SlotwalkError::Configuration { ref reason } if reason == "lookback is empty"));
    }
}
