use std::{
    collections::HashMap,
    path::PathBuf,
};

use serde::{
    Deserialize,
    Serialize,
};

fn data_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".kotomine")
}

fn default_anki_fields() -> HashMap<String, String> {
    let mut fields = HashMap::new();
    fields.insert("word".to_string(), "Expression".to_string());
    fields.insert("sentence".to_string(), "Sentence".to_string());
    fields.insert("definition".to_string(), "MainDefinition".to_string());
    fields.insert("picture".to_string(), "Picture".to_string());
    fields.insert("audio".to_string(), "SentenceAudio".to_string());
    fields.insert("expression_furigana".to_string(), "ExpressionFurigana".to_string());
    fields.insert("sentence_furigana".to_string(), "SentenceFurigana".to_string());
    fields.insert("pitch_accent".to_string(), String::new());
    fields.insert("frequency_rank".to_string(), String::new());
    fields
}

/// Configuration for one mining run. Loaded/persisted by the embedding
/// application; the pipeline only reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MinerConfig {
    // Anki settings
    pub anki_deck_name: String,
    pub anki_note_type: String,
    pub anki_word_field: String,
    /// Logical field key -> note-type field name. An empty name drops the field.
    pub anki_fields: HashMap<String, String>,
    pub ankiconnect_url: String,

    // Media extraction settings
    pub ffmpeg_program: String,
    pub ffprobe_program: String,
    pub audio_padding: f64,      // seconds added before/after the subtitle window
    pub screenshot_offset: f64,  // seconds after subtitle start for the frame grab
    pub media_temp_folder: PathBuf,
    pub max_parallel_workers: usize,

    // Word filtering settings
    pub min_word_length: usize,
    pub deduplicate_sentences: bool,

    // Dictionary settings
    pub jmdict_path: PathBuf,
    pub use_offline_dict: bool,
    pub jisho_api_url: String,
    pub jisho_delay: f64, // seconds between API calls

    // Enrichment settings
    pub pitch_accent_path: PathBuf,
    pub use_pitch_accent: bool,
    pub frequency_list_path: PathBuf,
    pub use_frequency_data: bool,
    pub max_frequency_rank: u32, // 0 = no filtering

    // Word list settings
    pub block_list_path: Option<PathBuf>,
    pub allow_list_path: Option<PathBuf>,

    // Cross-episode settings
    pub use_cross_episode_priority: bool,
    pub min_episode_appearances: u32,
}

impl Default for MinerConfig {
    fn default() -> Self {
        MinerConfig {
            anki_deck_name: "Kotomine".to_string(),
            anki_note_type: "Lapis".to_string(),
            anki_word_field: "Expression".to_string(),
            anki_fields: default_anki_fields(),
            ankiconnect_url: "http://127.0.0.1:8765".to_string(),
            ffmpeg_program: "ffmpeg".to_string(),
            ffprobe_program: "ffprobe".to_string(),
            audio_padding: 0.3,
            screenshot_offset: 1.0,
            media_temp_folder: std::env::temp_dir().join("kotomine_media"),
            max_parallel_workers: 6,
            min_word_length: 2,
            deduplicate_sentences: true,
            jmdict_path: data_dir().join("jmdict.json"),
            use_offline_dict: true,
            jisho_api_url: "https://jisho.org/api/v1/search/words".to_string(),
            jisho_delay: 0.5,
            pitch_accent_path: data_dir().join("pitch_accent.csv"),
            use_pitch_accent: false,
            frequency_list_path: data_dir().join("frequency.csv"),
            use_frequency_data: false,
            max_frequency_rank: 0,
            block_list_path: None,
            allow_list_path: None,
            use_cross_episode_priority: false,
            min_episode_appearances: 2,
        }
    }
}
