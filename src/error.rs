use thiserror::Error;
use tracing::warn;

pub type Result<T> = std::result::Result<T, BackendError>;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The backend answered with a non-success status; `message` is the
    /// remote error text when the body carried one.
    #[error("{message}")]
    Status { status: u16, message: String },

    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    #[error("Unexpected response shape: {message}")]
    Decode {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    #[error("Expected exactly one row from {table}, got {count}")]
    NotSingle { table: String, count: usize },
}

impl BackendError {
    pub fn decode(message: impl Into<String>, source: serde_json::Error) -> Self {
        BackendError::Decode {
            message: message.into(),
            source: Some(source),
        }
    }
}

/// Logs a failed call and keeps only its text, which is what travels in
/// UI messages.
pub fn report(context: &'static str) -> impl Fn(BackendError) -> String {
    move |err| {
        warn!("{} failed: {}", context, err);
        err.to_string()
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(err: serde_json::Error) -> Self {
        BackendError::Decode {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        BackendError::Network {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GradeError {
    #[error("Por favor, preencha a matéria e a nota.")]
    MissingField,

    #[error("A nota deve ser um número entre 0 e 10.")]
    OutOfRange,

    #[error("Selecione um aluno antes de lançar a nota.")]
    NoStudent,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "As variáveis SUPABASE_URL e SUPABASE_ANON_KEY precisam ser definidas (ambiente, .env ou config.json)"
    )]
    MissingBackend,

    #[error("Invalid backend URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Config file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
