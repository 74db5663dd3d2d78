use std::{
    collections::HashMap,
    path::PathBuf,
    time::Duration,
};

/// One vocabulary occurrence extracted from a subtitle file.
///
/// Produced by the subtitle parser and treated read-only downstream, except
/// for `frequency_rank` which the enrichment phase fills in.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenizedWord {
    pub surface: String,
    pub lemma: String,
    pub reading: String,
    pub sentence: String,
    pub start_time: f64,
    pub end_time: f64,
    pub duration: f64,
    pub source_file: Option<PathBuf>,
    pub expression_furigana: String, // e.g. "食べる[たべる]"
    pub sentence_furigana: String,
    pub frequency_rank: Option<u32>,
}

impl TokenizedWord {
    pub fn new(surface: &str, lemma: &str, reading: &str, sentence: &str) -> Self {
        TokenizedWord {
            surface: surface.to_string(),
            lemma: lemma.to_string(),
            reading: reading.to_string(),
            sentence: sentence.to_string(),
            start_time: 0.0,
            end_time: 0.0,
            duration: 0.0,
            source_file: None,
            expression_furigana: String::new(),
            sentence_furigana: String::new(),
            frequency_rank: None,
        }
    }

    pub fn with_timing(mut self, start_time: f64, end_time: f64) -> Self {
        self.start_time = start_time;
        self.end_time = end_time;
        self.duration = (end_time - start_time).max(0.0);
        self
    }
}

/// Extracted media for one word. The `has_*` predicates check the files on
/// disk, not just the recorded paths, since a temp cleanup can race a batch.
#[derive(Debug, Clone, Default)]
pub struct MediaData {
    pub screenshot_path: Option<PathBuf>,
    pub audio_path: Option<PathBuf>,
    pub screenshot_filename: Option<String>,
    pub audio_filename: Option<String>,
}

impl MediaData {
    pub fn has_screenshot(&self) -> bool {
        self.screenshot_path.as_ref().is_some_and(|p| p.exists())
    }

    pub fn has_audio(&self) -> bool {
        self.audio_path.as_ref().is_some_and(|p| p.exists())
    }

    pub fn has_any_media(&self) -> bool {
        self.has_screenshot() || self.has_audio()
    }
}

/// The unit handed to the card store: one enriched word ready to become a
/// note. `extra_fields` keys are restricted to the optional field keys
/// (pitch accent, frequency rank).
#[derive(Debug, Clone)]
pub struct CardData {
    pub word: TokenizedWord,
    pub media: MediaData,
    pub definition: Option<String>,
    pub extra_fields: Option<HashMap<String, String>>,
}

/// Immutable summary of one episode run.
#[derive(Debug, Clone)]
pub struct ProcessingResult {
    pub total_words_found: usize,
    pub new_words_found: usize,
    pub cards_created: usize,
    pub errors: Vec<String>,
    pub elapsed: Duration,
    pub comprehension_percentage: f32,
}

impl ProcessingResult {
    pub fn success(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_new_words(&self) -> bool {
        self.new_words_found > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// A single failed environment check.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    pub component: String,
    pub severity: Severity,
    pub message: String,
}

/// Environment-readiness snapshot produced by the validation service.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub ankiconnect_ok: bool,
    pub ffmpeg_ok: bool,
    pub deck_exists: bool,
    pub note_type_exists: bool,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationResult {
    pub fn all_passed(&self) -> bool {
        self.ankiconnect_ok && self.ffmpeg_ok && self.deck_exists && self.note_type_exists
    }

    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Error)
    }

    pub fn has_warnings(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Warning)
    }
}
