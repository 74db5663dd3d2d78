use std::{
    collections::HashMap,
    fs,
    path::PathBuf,
};

use tracing::info;

use crate::core::KotomineError;

/// Pitch accent patterns from a Kanjium-style three-column file
/// (`reading,kanji,pattern`). Entries are keyed by both the kanji form and
/// the reading; first entry wins on duplicates.
pub struct PitchAccentService {
    path: PathBuf,
    data: Option<HashMap<String, String>>,
}

impl PitchAccentService {
    pub fn new(path: PathBuf) -> Self {
        PitchAccentService { path, data: None }
    }

    pub fn load(&mut self) -> Result<(), KotomineError> {
        if !self.path.exists() {
            return Err(KotomineError::Setup(format!(
                "Pitch accent file not found at: {}. Download the Kanjium pitch accent data and place it in ~/.kotomine/",
                self.path.display()
            )));
        }

        let contents = fs::read_to_string(&self.path).map_err(|e| {
            KotomineError::Setup(format!("Error loading pitch accent data: {}", e))
        })?;

        let mut data: HashMap<String, String> = HashMap::new();
        for line in contents.lines() {
            let mut columns = line.splitn(3, ',');
            let (Some(reading), Some(kanji), Some(pattern)) =
                (columns.next(), columns.next(), columns.next())
            else {
                continue;
            };

            if !kanji.is_empty() {
                data.entry(kanji.to_string()).or_insert_with(|| pattern.to_string());
            }
            if !reading.is_empty() {
                data.entry(reading.to_string()).or_insert_with(|| pattern.to_string());
            }
        }

        info!(count = data.len(), "loaded pitch accent entries");
        self.data = Some(data);
        Ok(())
    }

    pub fn is_available(&self) -> bool {
        self.data.is_some()
    }

    /// Look up by the word form first, then by the reading.
    pub fn lookup(&self, word: &str, reading: &str) -> Option<String> {
        let data = self.data.as_ref()?;
        if let Some(pattern) = data.get(word) {
            return Some(pattern.clone());
        }
        if !reading.is_empty() {
            return data.get(reading).cloned();
        }
        None
    }

    pub fn lookup_batch(&self, words: &[(String, String)]) -> Vec<Option<String>> {
        words.iter().map(|(word, reading)| self.lookup(word, reading)).collect()
    }
}
