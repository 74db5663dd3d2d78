//! Pure filtering and deduplication predicates over word lists. All
//! functions preserve input order and take ownership so untouched words
//! move straight through.

use std::collections::{
    HashMap,
    HashSet,
};

use crate::{
    core::TokenizedWord,
    word_lists::WordListService,
};

/// Keep words whose lemma AND surface form are both absent from the known
/// vocabulary. A no-op when the known set is empty.
pub fn filter_unknown(
    words: Vec<TokenizedWord>,
    known_vocabulary: &HashSet<String>,
) -> Vec<TokenizedWord> {
    words
        .into_iter()
        .filter(|w| {
            !known_vocabulary.contains(&w.lemma) && !known_vocabulary.contains(&w.surface)
        })
        .collect()
}

/// Keep words whose surface length (in characters) is within bounds.
pub fn filter_by_length(
    words: Vec<TokenizedWord>,
    min_length: usize,
    max_length: Option<usize>,
) -> Vec<TokenizedWord> {
    words
        .into_iter()
        .filter(|w| {
            let len = w.surface.chars().count();
            len >= min_length && max_length.is_none_or(|max| len <= max)
        })
        .collect()
}

/// Keep words ranked within the top `max_rank`. A `max_rank` of 0 disables
/// filtering, and unranked words always pass.
pub fn filter_by_frequency(words: Vec<TokenizedWord>, max_rank: u32) -> Vec<TokenizedWord> {
    if max_rank == 0 {
        return words;
    }

    words
        .into_iter()
        .filter(|w| w.frequency_rank.is_none_or(|rank| rank <= max_rank))
        .collect()
}

/// Drop block-listed words. Allow-listed words are always kept; on a
/// conflict the allow list wins.
pub fn filter_by_word_lists(
    words: Vec<TokenizedWord>,
    word_lists: &WordListService,
) -> Vec<TokenizedWord> {
    words
        .into_iter()
        .filter(|w| word_lists.is_allowed(&w.lemma) || !word_lists.is_blocked(&w.lemma))
        .collect()
}

/// Keep words whose lemma appears in at least `min_appearances` distinct
/// episodes. Words absent from the count table are dropped.
pub fn filter_by_episode_count(
    words: Vec<TokenizedWord>,
    episode_counts: &HashMap<String, u32>,
    min_appearances: u32,
) -> Vec<TokenizedWord> {
    words
        .into_iter()
        .filter(|w| episode_counts.get(&w.lemma).copied().unwrap_or(0) >= min_appearances)
        .collect()
}

/// First occurrence per sentence wins; later words sharing the sentence are
/// dropped. Order is preserved.
pub fn deduplicate_by_sentence(words: Vec<TokenizedWord>) -> Vec<TokenizedWord> {
    let mut seen_sentences: HashSet<String> = HashSet::new();
    words
        .into_iter()
        .filter(|w| seen_sentences.insert(w.sentence.clone()))
        .collect()
}
