pub mod api;


use std::{
    collections::{
        HashMap,
        HashSet,
    },
    sync::Mutex,
};

use async_trait::async_trait;
use base64::{
    engine::general_purpose::STANDARD as BASE64,
    Engine as _,
};
use tracing::warn;

pub use api::{
    AnkiConnect,
    ApiResponse,
    HttpAnkiConnect,
    NoteField,
    NoteInfo,
    NoteInput,
};

use crate::core::{
    utils::escape_html,
    CardData,
    KotomineError,
    MediaData,
    MinerConfig,
    ProgressSink,
    TokenizedWord,
};

const REQUIRED_FIELD_KEYS: [&str; 7] = [
    "word",
    "sentence",
    "definition",
    "picture",
    "audio",
    "expression_furigana",
    "sentence_furigana",
];

const OPTIONAL_FIELD_KEYS: [&str; 2] = ["pitch_accent", "frequency_rank"];

const NOTE_BATCH_SIZE: usize = 50;
const NOTE_TAG: &str = "auto-mined";

/// Boundary to the remote flashcard store, as the pipeline sees it.
#[async_trait]
pub trait CardStore: Send + Sync {
    /// Words (from the configured word field) already present in the
    /// collection.
    async fn get_existing_vocabulary(&self) -> Result<HashSet<String>, KotomineError>;

    /// Commit enriched words as notes; returns how many were actually
    /// created.
    async fn create_cards_batch(
        &self,
        cards: &[CardData],
        progress: Option<&dyn ProgressSink>,
    ) -> usize;
}

/// Uploads media and commits notes to Anki over an `AnkiConnect` client.
pub struct AnkiService<C: AnkiConnect> {
    config: MinerConfig,
    client: C,
    last_created_note_ids: Mutex<Vec<u64>>,
}

impl AnkiService<HttpAnkiConnect> {
    pub fn new(config: MinerConfig) -> Result<Self, KotomineError> {
        let client = HttpAnkiConnect::new(config.ankiconnect_url.clone());
        AnkiService::with_client(config, client)
    }
}

impl<C: AnkiConnect> AnkiService<C> {
    pub fn with_client(config: MinerConfig, client: C) -> Result<Self, KotomineError> {
        let missing: Vec<&str> = REQUIRED_FIELD_KEYS
            .iter()
            .filter(|key| !config.anki_fields.contains_key(**key))
            .copied()
            .collect();
        if !missing.is_empty() {
            return Err(KotomineError::Setup(format!(
                "Missing required anki_fields keys: {}",
                missing.join(", ")
            )));
        }

        Ok(AnkiService { config, client, last_created_note_ids: Mutex::new(Vec::new()) })
    }

    /// Note ids created by the most recent batch, for the undo path.
    pub fn last_created_note_ids(&self) -> Vec<u64> {
        self.last_created_note_ids.lock().map(|ids| ids.clone()).unwrap_or_default()
    }

    /// Create one note outside the batch path, mirroring the same
    /// store-then-reference policy.
    pub async fn create_card(
        &self,
        word: &TokenizedWord,
        media: &MediaData,
        definition: Option<&str>,
        extra_fields: Option<&HashMap<String, String>>,
    ) -> bool {
        let mut stored: HashSet<String> = HashSet::new();
        if let (Some(path), Some(filename)) = (&media.screenshot_path, &media.screenshot_filename)
        {
            if self.store_file(filename, path).await {
                stored.insert(filename.clone());
            }
        }
        if let (Some(path), Some(filename)) = (&media.audio_path, &media.audio_filename) {
            if self.store_file(filename, path).await {
                stored.insert(filename.clone());
            }
        }

        let fields = self.build_note_fields(word, media, definition, extra_fields, &stored);
        let note = NoteInput {
            deck_name: self.config.anki_deck_name.clone(),
            model_name: self.config.anki_note_type.clone(),
            fields,
            tags: vec![NOTE_TAG.to_string()],
        };

        matches!(self.client.add_note(note).await, Ok(Some(_)))
    }

    /// Delete notes by id. The remote action reports no per-note status, so
    /// the returned count is the requested count.
    pub async fn delete_notes(&self, note_ids: &[u64]) -> Result<usize, KotomineError> {
        if note_ids.is_empty() {
            return Ok(0);
        }

        self.client.delete_notes(note_ids).await.map_err(|e| match e {
            KotomineError::AnkiApi(message) => {
                KotomineError::AnkiConnection(format!("Failed to delete notes: {}", message))
            }
            other => other,
        })?;

        Ok(note_ids.len())
    }

    async fn store_file(&self, filename: &str, path: &std::path::Path) -> bool {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(filename, error = %e, "failed to read media file for upload");
                return false;
            }
        };

        match self.client.store_media_file(filename, &BASE64.encode(bytes)).await {
            Ok(()) => true,
            Err(e) => {
                warn!(filename, error = %e, "failed to store media file");
                false
            }
        }
    }

    /// Store every still-existing media file, returning the filenames that
    /// made it into the collection.
    async fn store_media_files_batch(&self, cards: &[CardData]) -> HashSet<String> {
        let mut stored = HashSet::new();

        for card in cards {
            let media = &card.media;
            if let (Some(path), Some(filename)) =
                (&media.screenshot_path, &media.screenshot_filename)
            {
                if path.exists() && self.store_file(filename, path).await {
                    stored.insert(filename.clone());
                }
            }
            if let (Some(path), Some(filename)) = (&media.audio_path, &media.audio_filename) {
                if path.exists() && self.store_file(filename, path).await {
                    stored.insert(filename.clone());
                }
            }
        }

        stored
    }

    /// Map logical field keys to note-type field names. Media that failed
    /// to upload degrades to an empty field rather than a dangling
    /// reference; keys mapped to an empty name are dropped.
    fn build_note_fields(
        &self,
        word: &TokenizedWord,
        media: &MediaData,
        definition: Option<&str>,
        extra_fields: Option<&HashMap<String, String>>,
        stored: &HashSet<String>,
    ) -> HashMap<String, String> {
        let picture_html = media
            .screenshot_filename
            .as_ref()
            .filter(|filename| stored.contains(*filename))
            .map(|filename| format!("<img src=\"{}\">", escape_html(filename)))
            .unwrap_or_default();

        let audio_ref = media
            .audio_filename
            .as_ref()
            .filter(|filename| stored.contains(*filename))
            .map(|filename| format!("[sound:{}]", filename))
            .unwrap_or_default();

        let field_data = [
            ("word", escape_html(&word.lemma)),
            ("sentence", escape_html(&word.sentence)),
            ("definition", definition.unwrap_or_default().to_string()),
            ("picture", picture_html),
            ("audio", audio_ref),
            ("expression_furigana", escape_html(&word.expression_furigana)),
            ("sentence_furigana", escape_html(&word.sentence_furigana)),
        ];

        let mut fields = HashMap::new();
        for (key, value) in field_data {
            if let Some(field_name) = self.config.anki_fields.get(key) {
                if !field_name.is_empty() {
                    fields.insert(field_name.clone(), value);
                }
            }
        }

        if let Some(extras) = extra_fields {
            for key in OPTIONAL_FIELD_KEYS {
                let Some(value) = extras.get(key) else {
                    continue;
                };
                if value.is_empty() {
                    continue;
                }
                if let Some(field_name) = self.config.anki_fields.get(key) {
                    if !field_name.is_empty() {
                        fields.insert(field_name.clone(), escape_html(value));
                    }
                }
            }
        }

        fields
    }

    fn note_for_card(&self, card: &CardData, stored: &HashSet<String>) -> NoteInput {
        let fields = self.build_note_fields(
            &card.word,
            &card.media,
            card.definition.as_deref(),
            card.extra_fields.as_ref(),
            stored,
        );
        NoteInput {
            deck_name: self.config.anki_deck_name.clone(),
            model_name: self.config.anki_note_type.clone(),
            fields,
            tags: vec![NOTE_TAG.to_string()],
        }
    }
}

#[async_trait]
impl<C: AnkiConnect> CardStore for AnkiService<C> {
    /// Two-step lookup: find note ids with a non-empty word field, then
    /// fetch those notes' field values. Connectivity problems are fatal
    /// ("can't tell" is unsafe); other transport failures fall back to an
    /// empty set ("no existing vocabulary" is a safe default).
    async fn get_existing_vocabulary(&self) -> Result<HashSet<String>, KotomineError> {
        let word_field = &self.config.anki_word_field;
        let query = format!("{}:*", word_field);

        let note_ids = match self.client.find_notes(&query).await {
            Ok(ids) => ids,
            Err(e) if e.is_connectivity() => {
                return Err(KotomineError::AnkiConnection(e.to_string()));
            }
            Err(e) => {
                warn!(error = %e, "vocabulary lookup failed, assuming empty collection");
                return Ok(HashSet::new());
            }
        };

        if note_ids.is_empty() {
            return Ok(HashSet::new());
        }

        let notes = match self.client.notes_info(&note_ids).await {
            Ok(notes) => notes,
            Err(e) if e.is_connectivity() => {
                return Err(KotomineError::AnkiConnection(e.to_string()));
            }
            Err(e) => {
                warn!(error = %e, "notesInfo failed, assuming empty collection");
                return Ok(HashSet::new());
            }
        };

        let mut existing = HashSet::new();
        for note in notes {
            if let Some(field) = note.fields.get(word_field) {
                let word = field.value.trim();
                if !word.is_empty() {
                    existing.insert(word.to_string());
                }
            }
        }

        Ok(existing)
    }

    /// Two batched passes: store media, then submit notes in fixed-size
    /// chunks referencing only what was stored. The reported count is the
    /// number of non-null ids in the responses, so duplicate rejections
    /// are excluded without being errors.
    async fn create_cards_batch(
        &self,
        cards: &[CardData],
        progress: Option<&dyn ProgressSink>,
    ) -> usize {
        if let Ok(mut ids) = self.last_created_note_ids.lock() {
            ids.clear();
        }

        if cards.is_empty() {
            return 0;
        }

        if let Some(progress) = progress {
            progress.on_start(cards.len(), "Creating Anki cards");
        }

        let stored = self.store_media_files_batch(cards).await;

        let mut total_created = 0;
        let mut all_created_ids: Vec<u64> = Vec::new();

        for (batch_index, batch) in cards.chunks(NOTE_BATCH_SIZE).enumerate() {
            let notes: Vec<NoteInput> =
                batch.iter().map(|card| self.note_for_card(card, &stored)).collect();

            match self.client.add_notes(notes).await {
                Ok(note_ids) => {
                    let batch_created = note_ids.iter().flatten().count();
                    total_created += batch_created;
                    all_created_ids.extend(note_ids.into_iter().flatten());

                    if let Some(progress) = progress {
                        let done =
                            (batch_index * NOTE_BATCH_SIZE + batch.len()).min(cards.len());
                        progress.on_progress(
                            done,
                            &format!("Cards created: {}/{}", batch_created, batch.len()),
                        );
                    }
                }
                Err(e) => {
                    if let Some(progress) = progress {
                        progress
                            .on_error(&format!("Batch {}", batch_index + 1), &e.to_string());
                    }
                }
            }
        }

        if let Some(progress) = progress {
            progress.on_complete();
        }

        if let Ok(mut ids) = self.last_created_note_ids.lock() {
            *ids = all_created_ids;
        }
        total_created
    }
}
