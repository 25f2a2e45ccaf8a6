use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HubError {
    #[error("Network request failed: {0}")]
    NetworkError(#[source] reqwest::Error),

    #[error("Server rejected the request ({status}): {message}")]
    ServerValidationError {
        status: u16,
        message: String,
        field_errors: BTreeMap<String, Vec<String>>,
    },

    #[error("Server error ({status}): {message}")]
    ServerFaultError { status: u16, message: String },

    #[error("Invalid value for '{field}': {reason}")]
    ClientValidationError { field: String, reason: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid config value for '{field}' ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Schema error at record '{record}': {message}")]
    SchemaError { record: String, message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    ServerValidation,
    ServerFault,
    ClientValidation,
    Configuration,
    Data,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl HubError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            HubError::NetworkError(_) => ErrorCategory::Network,
            HubError::ServerValidationError { .. } => ErrorCategory::ServerValidation,
            HubError::ServerFaultError { .. } => ErrorCategory::ServerFault,
            HubError::ClientValidationError { .. } => ErrorCategory::ClientValidation,
            HubError::ConfigError { .. } | HubError::InvalidConfigValueError { .. } => {
                ErrorCategory::Configuration
            }
            HubError::SchemaError { .. }
            | HubError::ProcessingError { .. }
            | HubError::CsvError(_)
            | HubError::SerializationError(_) => ErrorCategory::Data,
            HubError::ZipError(_) | HubError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::ClientValidation => ErrorSeverity::Low,
            ErrorCategory::Network | ErrorCategory::ServerValidation => ErrorSeverity::Medium,
            ErrorCategory::ServerFault | ErrorCategory::Data | ErrorCategory::Configuration => {
                ErrorSeverity::High
            }
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    /// Message suitable for a banner or notification.
    pub fn user_friendly_message(&self) -> String {
        match self {
            HubError::NetworkError(_) => {
                "Não foi possível conectar ao servidor. Verifique sua conexão.".to_string()
            }
            HubError::ServerValidationError { message, .. } => message.clone(),
            HubError::ServerFaultError { status, message } if *status < 500 && !message.is_empty() => {
                message.clone()
            }
            HubError::ServerFaultError { status, .. } => {
                format!("Erro no servidor (HTTP {}). Tente novamente mais tarde.", status)
            }
            HubError::ClientValidationError { field, reason } => format!("{}: {}", field, reason),
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Network => "Check the API base URL and your network, then retry",
            ErrorCategory::ServerValidation => "Fix the highlighted fields and submit again",
            ErrorCategory::ServerFault => "The backend failed; retry the same action later",
            ErrorCategory::ClientValidation => "Correct the form input before submitting",
            ErrorCategory::Configuration => "Review the TOML configuration file",
            ErrorCategory::Data => "Check the input data format and column names",
            ErrorCategory::System => "Check file permissions and available disk space",
        }
    }

    /// Field-keyed messages returned by the server, empty for other errors.
    pub fn field_errors(&self) -> Option<&BTreeMap<String, Vec<String>>> {
        match self {
            HubError::ServerValidationError { field_errors, .. } => Some(field_errors),
            _ => None,
        }
    }

    pub fn processing(message: impl Into<String>) -> Self {
        HubError::ProcessingError {
            message: message.into(),
        }
    }

    pub fn client_validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        HubError::ClientValidationError {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Only transport failures are network errors; body decoding, request
/// building and client setup failures are processing errors.
impl From<reqwest::Error> for HubError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() || e.is_timeout() || e.is_request() {
            HubError::NetworkError(e)
        } else {
            HubError::ProcessingError {
                message: format!("HTTP client error: {}", e),
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, HubError>;
