use std::time::Duration;

use tokio::process::Command;

use crate::{
    anki::{
        AnkiConnect,
        HttpAnkiConnect,
    },
    core::{
        utils::ensure_directory,
        MinerConfig,
        Severity,
        ValidationIssue,
        ValidationResult,
    },
};

/// Environment-readiness checks run before mining: remote store reachable,
/// transcoder present, deck and note type exist, temp folder writable.
pub struct ValidationService<C: AnkiConnect> {
    config: MinerConfig,
    client: C,
}

impl ValidationService<HttpAnkiConnect> {
    pub fn new(config: MinerConfig) -> Self {
        let client = HttpAnkiConnect::new(config.ankiconnect_url.clone());
        ValidationService { config, client }
    }
}

impl<C: AnkiConnect> ValidationService<C> {
    pub fn with_client(config: MinerConfig, client: C) -> Self {
        ValidationService { config, client }
    }

    /// Run every check. Never fails; each problem becomes a severity-tagged
    /// issue in the result.
    pub async fn validate_setup(&self) -> ValidationResult {
        let mut issues = Vec::new();

        let ankiconnect_ok = match self.client.version().await {
            Ok(_) => true,
            Err(e) => {
                issues.push(ValidationIssue {
                    component: "AnkiConnect".to_string(),
                    severity: Severity::Error,
                    message: e.to_string(),
                });
                false
            }
        };

        let ffmpeg_ok = match self.check_ffmpeg().await {
            Ok(()) => true,
            Err(message) => {
                issues.push(ValidationIssue {
                    component: "ffmpeg".to_string(),
                    severity: Severity::Error,
                    message,
                });
                false
            }
        };

        // Deck and note-type checks need a reachable AnkiConnect
        let mut deck_exists = false;
        let mut note_type_exists = false;
        if ankiconnect_ok {
            match self.client.deck_names().await {
                Ok(decks) if decks.contains(&self.config.anki_deck_name) => {
                    deck_exists = true;
                }
                Ok(decks) => {
                    issues.push(ValidationIssue {
                        component: "Anki Deck".to_string(),
                        severity: Severity::Error,
                        message: format!(
                            "Deck '{}' not found. Available: {}",
                            self.config.anki_deck_name,
                            decks.join(", ")
                        ),
                    });
                }
                Err(e) => {
                    issues.push(ValidationIssue {
                        component: "Anki Deck".to_string(),
                        severity: Severity::Error,
                        message: format!("Error fetching decks: {}", e),
                    });
                }
            }

            match self.client.model_names().await {
                Ok(models) if models.contains(&self.config.anki_note_type) => {
                    note_type_exists = true;
                }
                Ok(models) => {
                    issues.push(ValidationIssue {
                        component: "Note Type".to_string(),
                        severity: Severity::Error,
                        message: format!(
                            "Note type '{}' not found. Available: {}",
                            self.config.anki_note_type,
                            models.join(", ")
                        ),
                    });
                }
                Err(e) => {
                    issues.push(ValidationIssue {
                        component: "Note Type".to_string(),
                        severity: Severity::Error,
                        message: format!("Error fetching note types: {}", e),
                    });
                }
            }
        }

        if let Err(e) = ensure_directory(&self.config.media_temp_folder) {
            issues.push(ValidationIssue {
                component: "Temp Folder".to_string(),
                severity: Severity::Warning,
                message: format!("Could not create temp folder: {}", e),
            });
        }

        ValidationResult { ankiconnect_ok, ffmpeg_ok, deck_exists, note_type_exists, issues }
    }

    async fn check_ffmpeg(&self) -> Result<(), String> {
        let output = tokio::time::timeout(
            Duration::from_secs(10),
            Command::new(&self.config.ffmpeg_program).arg("-version").output(),
        )
        .await
        .map_err(|_| "ffmpeg check timed out".to_string())?
        .map_err(|e| format!("ffmpeg not found ({}). Install it and ensure it's in PATH", e))?;

        if output.status.success() {
            Ok(())
        } else {
            Err("ffmpeg returned non-zero exit code".to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::{
        anki::{
            NoteInfo,
            NoteInput,
        },
        core::KotomineError,
    };

    struct FakeClient {
        online: bool,
        decks: Vec<String>,
        models: Vec<String>,
    }

    #[async_trait]
    impl AnkiConnect for FakeClient {
        async fn version(&self) -> Result<u32, KotomineError> {
            if self.online {
                Ok(6)
            } else {
                Err(KotomineError::AnkiConnection(
                    "Cannot connect to AnkiConnect. Is Anki running?".to_string(),
                ))
            }
        }

        async fn deck_names(&self) -> Result<Vec<String>, KotomineError> {
            Ok(self.decks.clone())
        }

        async fn model_names(&self) -> Result<Vec<String>, KotomineError> {
            Ok(self.models.clone())
        }

        async fn find_notes(&self, _query: &str) -> Result<Vec<u64>, KotomineError> {
            Ok(Vec::new())
        }

        async fn notes_info(&self, _ids: &[u64]) -> Result<Vec<NoteInfo>, KotomineError> {
            Ok(Vec::new())
        }

        async fn store_media_file(
            &self,
            _filename: &str,
            _data: &str,
        ) -> Result<(), KotomineError> {
            Ok(())
        }

        async fn add_note(&self, _note: NoteInput) -> Result<Option<u64>, KotomineError> {
            Ok(None)
        }

        async fn add_notes(
            &self,
            _notes: Vec<NoteInput>,
        ) -> Result<Vec<Option<u64>>, KotomineError> {
            Ok(Vec::new())
        }

        async fn delete_notes(&self, _ids: &[u64]) -> Result<(), KotomineError> {
            Ok(())
        }
    }

    fn config_with(temp: &tempfile::TempDir, ffmpeg: &str) -> MinerConfig {
        MinerConfig {
            ffmpeg_program: ffmpeg.to_string(),
            media_temp_folder: temp.path().join("media_temp"),
            ..MinerConfig::default()
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn everything_present_passes() {
        let temp = tempfile::tempdir().unwrap();
        // `true -version` exits 0, standing in for an installed ffmpeg
        let config = config_with(&temp, "true");
        let client = FakeClient {
            online: true,
            decks: vec!["Kotomine".to_string()],
            models: vec!["Lapis".to_string()],
        };

        let result = ValidationService::with_client(config, client).validate_setup().await;
        assert!(result.all_passed());
        assert!(result.issues.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn offline_store_skips_deck_and_note_type_checks() {
        let temp = tempfile::tempdir().unwrap();
        let config = config_with(&temp, "true");
        let client = FakeClient { online: false, decks: Vec::new(), models: Vec::new() };

        let result = ValidationService::with_client(config, client).validate_setup().await;
        assert!(!result.ankiconnect_ok);
        assert!(!result.deck_exists);
        assert!(!result.note_type_exists);
        // Only the AnkiConnect issue is reported; dependent checks are
        // skipped, not failed twice
        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.issues[0].component, "AnkiConnect");
        assert!(result.has_errors());
    }

    #[tokio::test]
    async fn missing_ffmpeg_is_an_error_issue() {
        let temp = tempfile::tempdir().unwrap();
        let config = config_with(&temp, "/nonexistent/ffmpeg");
        let client = FakeClient {
            online: true,
            decks: vec!["Kotomine".to_string()],
            models: vec!["Lapis".to_string()],
        };

        let result = ValidationService::with_client(config, client).validate_setup().await;
        assert!(!result.ffmpeg_ok);
        assert!(result.issues.iter().any(|i| i.component == "ffmpeg"));
        assert!(!result.all_passed());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn missing_deck_and_note_type_are_reported() {
        let temp = tempfile::tempdir().unwrap();
        let config = config_with(&temp, "true");
        let client = FakeClient {
            online: true,
            decks: vec!["Other Deck".to_string()],
            models: vec!["Basic".to_string()],
        };

        let result = ValidationService::with_client(config, client).validate_setup().await;
        assert!(result.ankiconnect_ok);
        assert!(!result.deck_exists);
        assert!(!result.note_type_exists);

        let components: Vec<&str> =
            result.issues.iter().map(|i| i.component.as_str()).collect();
        assert!(components.contains(&"Anki Deck"));
        assert!(components.contains(&"Note Type"));
    }
}
