pub mod cancel;
pub mod config;
pub mod errors;
pub mod models;
pub mod progress;
pub mod utils;

pub use cancel::CancellationToken;
pub use config::MinerConfig;
pub use errors::KotomineError;
pub use models::{
    CardData,
    MediaData,
    ProcessingResult,
    Severity,
    TokenizedWord,
    ValidationIssue,
    ValidationResult,
};
pub use progress::{
    NullProgress,
    ProgressSink,
};
