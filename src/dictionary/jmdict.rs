use std::{
    collections::HashMap,
    fs::File,
    io::BufReader,
    path::PathBuf,
};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use super::DictionaryProvider;
use crate::core::KotomineError;

// jmdict-simplified document shape: entries with kanji/kana spellings and
// ordered sense groups of glosses.
#[derive(Debug, Deserialize)]
struct JmdictDocument {
    #[serde(default)]
    words: Vec<JmdictEntry>,
}

#[derive(Debug, Deserialize)]
struct JmdictEntry {
    #[serde(default)]
    kanji: Vec<JmdictSpelling>,
    #[serde(default)]
    kana: Vec<JmdictSpelling>,
    #[serde(default)]
    sense: Vec<JmdictSense>,
}

#[derive(Debug, Deserialize)]
struct JmdictSpelling {
    text: String,
}

#[derive(Debug, Deserialize)]
struct JmdictSense {
    #[serde(default)]
    gloss: Vec<JmdictGloss>,
}

#[derive(Debug, Deserialize)]
struct JmdictGloss {
    text: String,
}

/// Offline dictionary provider over a jmdict-simplified JSON file. `load`
/// flattens the whole document into a map from every spelling and reading
/// to that entry's ordered sense list; lookups are pure map reads.
pub struct JmdictProvider {
    path: PathBuf,
    dictionary: Option<HashMap<String, Vec<String>>>,
}

impl JmdictProvider {
    pub fn new(path: PathBuf) -> Self {
        JmdictProvider { path, dictionary: None }
    }

    fn parse_document(document: JmdictDocument) -> HashMap<String, Vec<String>> {
        let mut dictionary: HashMap<String, Vec<String>> = HashMap::new();

        for entry in document.words {
            let senses: Vec<String> = entry
                .sense
                .iter()
                .map(|sense| {
                    sense.gloss.iter().map(|g| g.text.as_str()).collect::<Vec<_>>().join("; ")
                })
                .filter(|joined| !joined.is_empty())
                .collect();

            if senses.is_empty() {
                continue;
            }

            // Every spelling and reading maps to the same ordered sense
            // list; first entry wins on key collision.
            for spelling in entry.kanji.iter().chain(entry.kana.iter()) {
                if !spelling.text.is_empty() {
                    dictionary.entry(spelling.text.clone()).or_insert_with(|| senses.clone());
                }
            }
        }

        dictionary
    }
}

#[async_trait]
impl DictionaryProvider for JmdictProvider {
    fn name(&self) -> &str {
        "JMdict (offline)"
    }

    fn is_available(&self) -> bool {
        self.dictionary.is_some()
    }

    async fn load(&mut self) -> Result<(), KotomineError> {
        if !self.path.exists() {
            return Err(KotomineError::Setup(format!(
                "JMdict file not found at: {}. Download jmdict-simplified from https://github.com/scriptin/jmdict-simplified/releases",
                self.path.display()
            )));
        }

        let file = File::open(&self.path)
            .map_err(|e| KotomineError::Setup(format!("Error opening JMdict: {}", e)))?;
        let document: JmdictDocument = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| KotomineError::Setup(format!("Error parsing JMdict JSON: {}", e)))?;

        let dictionary = Self::parse_document(document);
        info!(entries = dictionary.len(), "loaded JMdict dictionary");
        self.dictionary = Some(dictionary);
        Ok(())
    }

    async fn lookup(&self, word: &str) -> Option<String> {
        let senses = self.dictionary.as_ref()?.get(word)?;

        // Numbered list capped at five senses, matching the online format
        let formatted: Vec<String> = senses
            .iter()
            .take(5)
            .enumerate()
            .map(|(i, sense)| format!("{}. {}", i + 1, sense))
            .collect();

        Some(formatted.join("<br>"))
    }
}
