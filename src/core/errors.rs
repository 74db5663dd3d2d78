use thiserror::Error;

#[derive(Error, Debug)]
pub enum KotomineError {
    #[error("AnkiConnect connection error: {0}")]
    AnkiConnection(String),

    #[error("AnkiConnect API error: {0}")]
    AnkiApi(String),

    #[error("Setup error: {0}")]
    Setup(String),

    #[error("Media extraction error: {0}")]
    Media(String),

    #[error("Subtitle parse error: {0}")]
    SubtitleParse(String),

    #[error("I/O error: {0}")]
    Io(Box<std::io::Error>),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Reqwest error: {0}")]
    Reqwest(Box<reqwest::Error>),

    #[error("KotomineError: {0}")]
    Custom(String),
}

impl KotomineError {
    /// Failures where the remote store itself is the problem. Continuing a
    /// run with an unknown vocabulary state is unsafe, so these are fatal
    /// during vocabulary lookup.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, KotomineError::AnkiConnection(_) | KotomineError::AnkiApi(_))
    }
}

impl From<std::io::Error> for KotomineError {
    fn from(error: std::io::Error) -> Self {
        KotomineError::Io(Box::new(error))
    }
}

impl From<reqwest::Error> for KotomineError {
    fn from(error: reqwest::Error) -> Self {
        KotomineError::Reqwest(Box::new(error))
    }
}
