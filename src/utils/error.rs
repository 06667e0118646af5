use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("HTTP request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("n8n webhook '{hook}' is not configured")]
    WebhookNotConfigured { hook: String },

    #[error("n8n webhook '{hook}' answered {status}: {body}")]
    WebhookError {
        hook: String,
        status: u16,
        body: String,
    },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

pub type Result<T> = std::result::Result<T, TrackerError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Network,
    Storage,
    Data,
    Input,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl TrackerError {
    pub fn processing(message: impl Into<String>) -> Self {
        Self::ProcessingError {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. }
            | Self::WebhookNotConfigured { .. } => ErrorCategory::Configuration,
            Self::ApiError(_) | Self::WebhookError { .. } => ErrorCategory::Network,
            Self::IoError(_) | Self::ZipError(_) => ErrorCategory::Storage,
            Self::CsvError(_) | Self::SerializationError(_) | Self::ProcessingError { .. } => {
                ErrorCategory::Data
            }
            Self::ValidationError { .. } => ErrorCategory::Input,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Input | ErrorCategory::Data | ErrorCategory::Configuration => {
                ErrorSeverity::High
            }
            ErrorCategory::Storage => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            Self::WebhookNotConfigured { hook } => format!(
                "Set the {} environment variable or the matching [n8n] key in issuecoin.toml",
                webhook_env_var(hook)
            ),
            Self::WebhookError { status, .. } if *status >= 500 => {
                "The n8n workflow failed; check its execution log and retry".to_string()
            }
            Self::WebhookError { .. } => {
                "Check that the n8n workflow accepts this payload".to_string()
            }
            Self::ApiError(e) if e.is_timeout() => {
                "The request timed out; raise n8n.timeout_seconds or retry later".to_string()
            }
            Self::ApiError(_) => "Check network connectivity and the endpoint URL".to_string(),
            Self::CsvError(_) => {
                "A data file is malformed; inspect the CSV files in the data directory".to_string()
            }
            Self::IoError(_) | Self::ZipError(_) => {
                "Check that the data directory exists and is writable".to_string()
            }
            Self::SerializationError(_) => {
                "The payload could not be encoded or decoded as JSON".to_string()
            }
            Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => {
                "Review issuecoin.toml and the environment variables".to_string()
            }
            Self::ProcessingError { .. } => "Inspect the input and try again".to_string(),
            Self::ValidationError { .. } => "Correct the command arguments".to_string(),
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Network => format!("Integration call failed: {}", self),
            ErrorCategory::Storage => format!("Could not access local data: {}", self),
            ErrorCategory::Data => format!("Could not process data: {}", self),
            ErrorCategory::Input => self.to_string(),
        }
    }
}

fn webhook_env_var(hook: &str) -> &'static str {
    match hook {
        "ocr" => "N8N_WEBHOOK_OCR",
        "deals" => "N8N_WEBHOOK_DEALS",
        "mcp" => "N8N_WEBHOOK_MCP",
        "stt" => "N8N_WEBHOOK_STT",
        _ => "N8N_WEBHOOK_URL",
    }
}
