use std::{
    collections::HashMap,
    fs,
    path::PathBuf,
};

use tracing::info;

use crate::core::KotomineError;

/// Word frequency rankings from a two-column list. Both column orders are
/// accepted and auto-detected per line: `rank,word` when the first column
/// is numeric, `word,rank` otherwise. First entry wins on duplicates.
pub struct FrequencyService {
    path: PathBuf,
    data: Option<HashMap<String, u32>>,
}

impl FrequencyService {
    pub fn new(path: PathBuf) -> Self {
        FrequencyService { path, data: None }
    }

    pub fn load(&mut self) -> Result<(), KotomineError> {
        if !self.path.exists() {
            return Err(KotomineError::Setup(format!(
                "Frequency list not found at: {}. Download a Japanese frequency list and place it in ~/.kotomine/",
                self.path.display()
            )));
        }

        let contents = fs::read_to_string(&self.path).map_err(|e| {
            KotomineError::Setup(format!("Error loading frequency data: {}", e))
        })?;

        let mut data: HashMap<String, u32> = HashMap::new();
        for line in contents.lines() {
            let Some((first, second)) = line.split_once(',') else {
                continue;
            };
            let (first, second) = (first.trim(), second.trim());

            let (word, rank) = match first.parse::<u32>() {
                Ok(rank) => (second, rank),
                Err(_) => match second.parse::<u32>() {
                    Ok(rank) => (first, rank),
                    Err(_) => continue, // neither column numeric, skip
                },
            };

            if !word.is_empty() {
                data.entry(word.to_string()).or_insert(rank);
            }
        }

        info!(count = data.len(), "loaded frequency entries");
        self.data = Some(data);
        Ok(())
    }

    pub fn is_available(&self) -> bool {
        self.data.is_some()
    }

    /// Frequency rank (1 = most common), or None if unranked.
    pub fn lookup(&self, word: &str) -> Option<u32> {
        self.data.as_ref()?.get(word).copied()
    }

    pub fn lookup_batch(&self, words: &[String]) -> Vec<Option<u32>> {
        words.iter().map(|w| self.lookup(w)).collect()
    }
}
