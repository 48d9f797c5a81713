use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("External fetch from {source_name} failed: {message}")]
    ExternalFetch {
        source_name: String,
        message: String,
    },

    #[error("Package not found: {tracking_number}")]
    NotFound { tracking_number: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Persistence error: {message}")]
    Persistence { message: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing configuration field: {field}")]
    MissingConfig { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValue {
        field: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Expected outcome the caller should report, not a malfunction.
    Low,
    /// Unreliable dependency; retrying later may succeed.
    Medium,
    /// The local store or host is misbehaving.
    High,
    /// The process cannot start with the given configuration.
    Critical,
}

impl TrackerError {
    pub fn external(source_name: &str, message: impl Into<String>) -> Self {
        Self::ExternalFetch {
            source_name: source_name.to_string(),
            message: message.into(),
        }
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence {
            message: message.into(),
        }
    }

    pub fn not_found(tracking_number: &str) -> Self {
        Self::NotFound {
            tracking_number: tracking_number.to_string(),
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::NotFound { .. } | Self::Validation { .. } => ErrorSeverity::Low,
            Self::ExternalFetch { .. } | Self::Http(_) | Self::Serialization(_) => {
                ErrorSeverity::Medium
            }
            Self::Persistence { .. } | Self::Sqlite(_) | Self::Io(_) => ErrorSeverity::High,
            Self::Config { .. } | Self::MissingConfig { .. } | Self::InvalidConfigValue { .. } => {
                ErrorSeverity::Critical
            }
        }
    }

    /// Process exit code used by the CLI: 1 configuration, 2 not found,
    /// 3 anything else.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NotFound { .. } => 2,
            other if other.severity() == ErrorSeverity::Critical => 1,
            _ => 3,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::NotFound { .. } => "Tracking number not found.".to_string(),
            Self::Validation { message } => format!("Invalid input: {}", message),
            Self::ExternalFetch { source_name, .. } => {
                format!("The {} service is currently unavailable.", source_name)
            }
            Self::Persistence { .. } | Self::Sqlite(_) => {
                "The package could not be saved to the local database.".to_string()
            }
            Self::Config { .. } | Self::MissingConfig { .. } | Self::InvalidConfigValue { .. } => {
                format!("Invalid configuration: {}", self)
            }
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.severity() {
            ErrorSeverity::Low => "Check the tracking number and try again",
            ErrorSeverity::Medium => "Check network connectivity and the provider endpoints",
            ErrorSeverity::High => "Check that the database path is writable and not corrupted",
            ErrorSeverity::Critical => "Fix the configuration file and restart",
        }
    }
}

pub type Result<T> = std::result::Result<T, TrackerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_follow_severity() {
        assert_eq!(TrackerError::not_found("1Z999").exit_code(), 2);
        assert_eq!(TrackerError::persistence("disk full").exit_code(), 3);
        assert_eq!(
            TrackerError::Config {
                message: "bad".to_string()
            }
            .exit_code(),
            1
        );
    }

    #[test]
    fn test_rejected_input_is_not_a_config_error() {
        let err = TrackerError::Validation {
            message: "tracking number 'abc' is malformed".to_string(),
        };
        assert_eq!(err.severity(), ErrorSeverity::Low);
        assert_eq!(err.exit_code(), 3);
        assert!(err.user_friendly_message().starts_with("Invalid input:"));

        let missing = TrackerError::MissingConfig {
            field: "package_source.base_url".to_string(),
        };
        assert_eq!(missing.exit_code(), 1);
    }

    #[test]
    fn test_not_found_message_hides_cause() {
        let err = TrackerError::not_found("ABC12345");
        assert_eq!(err.user_friendly_message(), "Tracking number not found.");
        assert_eq!(err.to_string(), "Package not found: ABC12345");
    }
}
