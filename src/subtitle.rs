use std::path::Path;

use crate::core::{
    KotomineError,
    TokenizedWord,
};

/// Boundary to the subtitle tokenizer. Parsing and morphological analysis
/// live behind this trait; the pipeline only sees the resulting word list.
pub trait SubtitleParser: Send + Sync {
    /// Parse one subtitle file into timed vocabulary occurrences.
    ///
    /// Malformed input fails with `KotomineError::SubtitleParse`, which
    /// aborts the episode (converted to a result error at the pipeline
    /// boundary).
    fn parse_subtitle_file(&self, subtitle_file: &Path) -> Result<Vec<TokenizedWord>, KotomineError>;
}
