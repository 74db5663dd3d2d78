use crate::core::{
    models::Severity,
    ProcessingResult,
    TokenizedWord,
    ValidationResult,
};

/// User-facing output channel for the pipeline. Implemented by the shell
/// (console, GUI); diagnostics go to `tracing` instead.
pub trait Presenter: Send + Sync {
    fn show_info(&self, message: &str);

    fn show_success(&self, message: &str);

    fn show_warning(&self, message: &str);

    fn show_error(&self, message: &str);

    fn show_word_preview(&self, words: &[TokenizedWord]);

    fn show_processing_result(&self, result: &ProcessingResult);

    fn show_validation_result(&self, result: &ValidationResult);
}

/// Plain stdout presenter for terminal runs.
#[derive(Debug, Default)]
pub struct ConsolePresenter;

impl Presenter for ConsolePresenter {
    fn show_info(&self, message: &str) {
        println!("{}", message);
    }

    fn show_success(&self, message: &str) {
        println!("[OK] {}", message);
    }

    fn show_warning(&self, message: &str) {
        println!("[WARN] {}", message);
    }

    fn show_error(&self, message: &str) {
        eprintln!("[ERROR] {}", message);
    }

    fn show_word_preview(&self, words: &[TokenizedWord]) {
        println!("\n{} words to mine:", words.len());
        for word in words {
            println!("  {} ({}): {}", word.lemma, word.reading, word.sentence);
        }
    }

    fn show_processing_result(&self, result: &ProcessingResult) {
        println!("\nProcessing complete:");
        println!("  Total words found: {}", result.total_words_found);
        println!("  New words found: {}", result.new_words_found);
        println!("  Cards created: {}", result.cards_created);
        println!("  Time elapsed: {:.1}s", result.elapsed.as_secs_f32());

        if !result.errors.is_empty() {
            println!("\nErrors:");
            for error in &result.errors {
                println!("  {}", error);
            }
        }
    }

    fn show_validation_result(&self, result: &ValidationResult) {
        let mark = |ok: bool| if ok { "[OK]" } else { "[FAIL]" };
        println!("\nValidation results:");
        println!("  {} AnkiConnect", mark(result.ankiconnect_ok));
        println!("  {} ffmpeg", mark(result.ffmpeg_ok));
        println!("  {} Anki deck", mark(result.deck_exists));
        println!("  {} Note type", mark(result.note_type_exists));

        if !result.issues.is_empty() {
            println!("\nIssues:");
            for issue in &result.issues {
                let severity = match issue.severity {
                    Severity::Error => "ERROR",
                    Severity::Warning => "WARNING",
                };
                println!("  [{}] {}: {}", severity, issue.component, issue.message);
            }
        }
    }
}

/// Presenter that swallows all output, for headless and test runs.
#[derive(Debug, Default)]
pub struct NullPresenter;

impl Presenter for NullPresenter {
    fn show_info(&self, _message: &str) {}

    fn show_success(&self, _message: &str) {}

    fn show_warning(&self, _message: &str) {}

    fn show_error(&self, _message: &str) {}

    fn show_word_preview(&self, _words: &[TokenizedWord]) {}

    fn show_processing_result(&self, _result: &ProcessingResult) {}

    fn show_validation_result(&self, _result: &ValidationResult) {}
}
