use std::{
    collections::HashSet,
    fs,
    path::{
        Path,
        PathBuf,
    },
};

use tracing::info;

use crate::core::KotomineError;

/// Custom block/allow lists from plain-text files, one word per line.
/// Blank lines and `#` comments are ignored.
pub struct WordListService {
    block_list_path: Option<PathBuf>,
    allow_list_path: Option<PathBuf>,
    block_list: HashSet<String>,
    allow_list: HashSet<String>,
    loaded: bool,
}

impl WordListService {
    pub fn new(block_list_path: Option<PathBuf>, allow_list_path: Option<PathBuf>) -> Self {
        WordListService {
            block_list_path,
            allow_list_path,
            block_list: HashSet::new(),
            allow_list: HashSet::new(),
            loaded: false,
        }
    }

    pub fn load(&mut self) -> Result<(), KotomineError> {
        if let Some(path) = &self.block_list_path {
            self.block_list = read_word_file(path)?;
            info!(count = self.block_list.len(), "loaded block list");
        }
        if let Some(path) = &self.allow_list_path {
            self.allow_list = read_word_file(path)?;
            info!(count = self.allow_list.len(), "loaded allow list");
        }
        self.loaded = true;
        Ok(())
    }

    pub fn is_available(&self) -> bool {
        self.loaded
    }

    pub fn is_blocked(&self, word: &str) -> bool {
        self.block_list.contains(word)
    }

    pub fn is_allowed(&self, word: &str) -> bool {
        self.allow_list.contains(word)
    }
}

fn read_word_file(path: &Path) -> Result<HashSet<String>, KotomineError> {
    if !path.exists() {
        return Err(KotomineError::Setup(format!(
            "Word list file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        KotomineError::Setup(format!("Error reading word list file {}: {}", path.display(), e))
    })?;

    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}
