use thiserror::Error;

#[derive(Error, Debug)]
pub enum GuardError {
    #[error("Policy with UID {0} already exists")]
    PolicyExists(String),

    #[error("Invalid pagination argument: {0}")]
    InvalidPagination(String),

    #[error("Unrecognized checker type: {0}")]
    UnrecognizedChecker(String),

    #[error("Cannot apply '{op}' to {left} and {right}")]
    Incomparable {
        op: &'static str,
        left: String,
        right: String,
    },

    #[error("Invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Invalid policy: {0}")]
    InvalidPolicy(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, GuardError>;
