use std::{
    collections::HashMap,
    path::Path,
    sync::Arc,
    time::Instant,
};

use chrono::Local;
use tracing::info;

use crate::{
    anki::CardStore,
    core::{
        utils::{
            cleanup_temp_files,
            file_stem_name,
            parent_dir_name,
        },
        CancellationToken,
        CardData,
        KotomineError,
        MinerConfig,
        ProcessingResult,
        ProgressSink,
        TokenizedWord,
    },
    dictionary::DefinitionService,
    filter,
    frequency::FrequencyService,
    media::MediaExtractor,
    pitch_accent::PitchAccentService,
    presenter::Presenter,
    stats::{
        DifficultyRecord,
        MiningSession,
        StatsSink,
    },
    subtitle::SubtitleParser,
    word_lists::WordListService,
};

const CANCELLED_MESSAGE: &str = "Processing cancelled by user";

/// Curation hook: receives the filtered word list, returns the subset the
/// user picked. An empty return value cancels the run.
pub type CurationCallback = dyn Fn(Vec<TokenizedWord>) -> Vec<TokenizedWord> + Send + Sync;

/// Per-call knobs for `process_episode`.
pub struct ProcessOptions<'a> {
    pub preview_mode: bool,
    pub progress: Option<&'a dyn ProgressSink>,
    pub curation: Option<&'a CurationCallback>,
    pub cross_episode_counts: Option<&'a HashMap<String, u32>>,
    pub cancel: CancellationToken,
}

impl Default for ProcessOptions<'_> {
    fn default() -> Self {
        ProcessOptions {
            preview_mode: false,
            progress: None,
            curation: None,
            cross_episode_counts: None,
            cancel: CancellationToken::new(),
        }
    }
}

/// Orchestrates one episode: parse, filter, extract media, resolve
/// definitions, create cards. Never lets an error escape; every outcome is
/// a `ProcessingResult`.
pub struct EpisodeProcessor {
    config: MinerConfig,
    subtitle_parser: Arc<dyn SubtitleParser>,
    media_extractor: Arc<dyn MediaExtractor>,
    definition_service: DefinitionService,
    card_store: Arc<dyn CardStore>,
    presenter: Arc<dyn Presenter>,
    frequency_service: Option<FrequencyService>,
    pitch_accent_service: Option<PitchAccentService>,
    word_list_service: Option<WordListService>,
    stats_sink: Option<Arc<dyn StatsSink>>,
}

impl EpisodeProcessor {
    pub fn new(
        config: MinerConfig,
        subtitle_parser: Arc<dyn SubtitleParser>,
        media_extractor: Arc<dyn MediaExtractor>,
        definition_service: DefinitionService,
        card_store: Arc<dyn CardStore>,
        presenter: Arc<dyn Presenter>,
    ) -> Self {
        EpisodeProcessor {
            config,
            subtitle_parser,
            media_extractor,
            definition_service,
            card_store,
            presenter,
            frequency_service: None,
            pitch_accent_service: None,
            word_list_service: None,
            stats_sink: None,
        }
    }

    pub fn with_frequency_service(mut self, service: FrequencyService) -> Self {
        self.frequency_service = Some(service);
        self
    }

    pub fn with_pitch_accent_service(mut self, service: PitchAccentService) -> Self {
        self.pitch_accent_service = Some(service);
        self
    }

    pub fn with_word_list_service(mut self, service: WordListService) -> Self {
        self.word_list_service = Some(service);
        self
    }

    pub fn with_stats_sink(mut self, sink: Arc<dyn StatsSink>) -> Self {
        self.stats_sink = Some(sink);
        self
    }

    pub fn config(&self) -> &MinerConfig {
        &self.config
    }

    pub(crate) fn subtitle_parser(&self) -> &dyn SubtitleParser {
        self.subtitle_parser.as_ref()
    }

    /// Drive one video/subtitle pair through the full pipeline. The temp
    /// media folder is purged on every exit path.
    pub async fn process_episode(
        &self,
        video_file: &Path,
        subtitle_file: &Path,
        options: &ProcessOptions<'_>,
    ) -> ProcessingResult {
        let start = Instant::now();

        let result = self.run(video_file, subtitle_file, options, start).await;
        cleanup_temp_files(&self.config.media_temp_folder);

        match result {
            Ok(result) => result,
            Err(e) => {
                self.presenter.show_error(&format!("Error: {}", e));
                ProcessingResult {
                    total_words_found: 0,
                    new_words_found: 0,
                    cards_created: 0,
                    errors: vec![e.to_string()],
                    elapsed: start.elapsed(),
                    comprehension_percentage: 0.0,
                }
            }
        }
    }

    fn cancelled_result(
        start: Instant,
        total_words_found: usize,
        new_words_found: usize,
    ) -> ProcessingResult {
        ProcessingResult {
            total_words_found,
            new_words_found,
            cards_created: 0,
            errors: vec![CANCELLED_MESSAGE.to_string()],
            elapsed: start.elapsed(),
            comprehension_percentage: 0.0,
        }
    }

    async fn run(
        &self,
        video_file: &Path,
        subtitle_file: &Path,
        options: &ProcessOptions<'_>,
        start: Instant,
    ) -> Result<ProcessingResult, KotomineError> {
        let presenter = self.presenter.as_ref();

        // Phase 1: parse subtitles
        presenter.show_info(&format!(
            "Step 1/5: Parsing subtitles: {}",
            subtitle_file.file_name().map(|n| n.to_string_lossy()).unwrap_or_default()
        ));
        let mut all_words = self.subtitle_parser.parse_subtitle_file(subtitle_file)?;
        presenter.show_success(&format!("Found {} unique words", all_words.len()));

        if all_words.is_empty() {
            presenter.show_warning("No words found in subtitles");
            return Ok(ProcessingResult {
                total_words_found: 0,
                new_words_found: 0,
                cards_created: 0,
                errors: Vec::new(),
                elapsed: start.elapsed(),
                comprehension_percentage: 0.0,
            });
        }
        let total_words = all_words.len();

        if options.cancel.is_cancelled() {
            return Ok(Self::cancelled_result(start, total_words, 0));
        }

        // Attach frequency ranks before filtering so downstream phases see
        // them
        if let Some(frequency) = &self.frequency_service {
            if frequency.is_available() {
                for word in &mut all_words {
                    word.frequency_rank = frequency.lookup(&word.lemma);
                }
                let ranked = all_words.iter().filter(|w| w.frequency_rank.is_some()).count();
                presenter
                    .show_info(&format!("Frequency data: {}/{} words ranked", ranked, total_words));
            }
        }

        // Phase 2: filter against existing vocabulary
        presenter.show_info("Step 2/5: Filtering against known vocabulary");
        let existing_words = self.card_store.get_existing_vocabulary().await?;
        let mut unknown_words = filter::filter_unknown(all_words, &existing_words);
        presenter.show_success(&format!("{} new words to mine", unknown_words.len()));

        let comprehension =
            100.0 * (total_words - unknown_words.len()) as f32 / total_words as f32;
        presenter.show_info(&format!(
            "Comprehension: {:.1}% of words already known",
            comprehension
        ));

        if self.config.max_frequency_rank > 0 {
            let before = unknown_words.len();
            unknown_words =
                filter::filter_by_frequency(unknown_words, self.config.max_frequency_rank);
            let filtered_out = before - unknown_words.len();
            if filtered_out > 0 {
                presenter.show_info(&format!(
                    "Frequency filter: removed {} words outside top {}",
                    filtered_out, self.config.max_frequency_rank
                ));
            }
        }

        if let Some(word_lists) = &self.word_list_service {
            if word_lists.is_available() {
                let before = unknown_words.len();
                unknown_words = filter::filter_by_word_lists(unknown_words, word_lists);
                let filtered_out = before - unknown_words.len();
                if filtered_out > 0 {
                    presenter
                        .show_info(&format!("Word list filter: removed {} words", filtered_out));
                }
            }
        }

        if self.config.deduplicate_sentences {
            let before = unknown_words.len();
            unknown_words = filter::deduplicate_by_sentence(unknown_words);
            let deduped = before - unknown_words.len();
            if deduped > 0 {
                presenter.show_info(&format!(
                    "Sentence deduplication: removed {} duplicate-sentence words",
                    deduped
                ));
            }
        }

        if let Some(counts) = options.cross_episode_counts {
            if self.config.min_episode_appearances > 1 {
                let before = unknown_words.len();
                unknown_words = filter::filter_by_episode_count(
                    unknown_words,
                    counts,
                    self.config.min_episode_appearances,
                );
                let filtered_out = before - unknown_words.len();
                if filtered_out > 0 {
                    presenter.show_info(&format!(
                        "Cross-episode filter: removed {} words appearing in fewer than {} episodes",
                        filtered_out, self.config.min_episode_appearances
                    ));
                }
            }
        }

        if let Some(stats) = &self.stats_sink {
            stats.record_difficulty(DifficultyRecord {
                series_name: parent_dir_name(video_file),
                episode_name: file_stem_name(video_file),
                total_words,
                unknown_words: unknown_words.len(),
                unique_words: total_words,
                recorded_at: Local::now(),
            });
        }

        if unknown_words.is_empty() {
            presenter.show_info("All words already in Anki!");
            return Ok(ProcessingResult {
                total_words_found: total_words,
                new_words_found: 0,
                cards_created: 0,
                errors: Vec::new(),
                elapsed: start.elapsed(),
                comprehension_percentage: comprehension,
            });
        }

        if options.cancel.is_cancelled() {
            return Ok(Self::cancelled_result(start, total_words, unknown_words.len()));
        }

        // Curation hook, skipped in preview mode
        if let Some(curate) = options.curation {
            if !options.preview_mode {
                unknown_words = curate(unknown_words);
                if unknown_words.is_empty() {
                    // An empty selection is a cancel, not a failure
                    return Ok(Self::cancelled_result(start, total_words, 0));
                }
                presenter.show_info(&format!(
                    "User selected {} words for card creation",
                    unknown_words.len()
                ));
            }
        }

        // Preview short-circuit: no media, no remote writes
        if options.preview_mode {
            presenter.show_word_preview(&unknown_words);
            return Ok(ProcessingResult {
                total_words_found: total_words,
                new_words_found: unknown_words.len(),
                cards_created: 0,
                errors: Vec::new(),
                elapsed: start.elapsed(),
                comprehension_percentage: comprehension,
            });
        }

        if options.cancel.is_cancelled() {
            return Ok(Self::cancelled_result(start, total_words, unknown_words.len()));
        }

        // Phase 3: extract media
        presenter.show_info("Step 3/5: Extracting media from video");
        let media_results = self
            .media_extractor
            .extract_media_batch(video_file, &unknown_words, options.progress, &options.cancel)
            .await;

        if options.cancel.is_cancelled() {
            return Ok(Self::cancelled_result(start, total_words, unknown_words.len()));
        }

        if media_results.is_empty() {
            presenter.show_warning("No media extracted successfully");
            return Ok(ProcessingResult {
                total_words_found: total_words,
                new_words_found: unknown_words.len(),
                cards_created: 0,
                errors: vec!["Media extraction failed for all words".to_string()],
                elapsed: start.elapsed(),
                comprehension_percentage: comprehension,
            });
        }
        presenter.show_success(&format!("Extracted media for {} words", media_results.len()));

        // Phase 4: fetch definitions
        presenter.show_info("Step 4/5: Fetching definitions");
        let lemmas: Vec<String> =
            media_results.iter().map(|(word, _)| word.lemma.clone()).collect();
        let definitions =
            self.definition_service.get_definitions_batch(&lemmas, options.progress).await;
        presenter.show_success(&format!(
            "Found {} definitions",
            definitions.iter().flatten().count()
        ));

        if options.cancel.is_cancelled() {
            return Ok(Self::cancelled_result(start, total_words, unknown_words.len()));
        }

        let pitch_accents: Vec<Option<String>> = match &self.pitch_accent_service {
            Some(service) if service.is_available() => {
                let pairs: Vec<(String, String)> = media_results
                    .iter()
                    .map(|(word, _)| (word.lemma.clone(), word.reading.clone()))
                    .collect();
                let accents = service.lookup_batch(&pairs);
                let found = accents.iter().flatten().count();
                presenter.show_info(&format!(
                    "Pitch accent data: {}/{} words",
                    found,
                    media_results.len()
                ));
                accents
            }
            _ => vec![None; media_results.len()],
        };

        // Phase 5: create cards
        presenter.show_info("Step 5/5: Creating Anki cards");
        let media_count = media_results.len();
        let mut cards: Vec<CardData> = Vec::with_capacity(media_count);
        for (((word, media), definition), pitch_accent) in
            media_results.into_iter().zip(definitions).zip(pitch_accents)
        {
            // Words with no definition found are skipped, not failed
            let Some(definition) = definition else {
                continue;
            };

            let mut extra_fields = HashMap::new();
            if let Some(pitch_accent) = pitch_accent {
                if !pitch_accent.is_empty() {
                    extra_fields.insert("pitch_accent".to_string(), pitch_accent);
                }
            }
            if let Some(rank) = word.frequency_rank {
                extra_fields.insert("frequency_rank".to_string(), rank.to_string());
            }

            cards.push(CardData {
                word,
                media,
                definition: Some(definition),
                extra_fields: (!extra_fields.is_empty()).then_some(extra_fields),
            });
        }

        let skipped = media_count - cards.len();
        if skipped > 0 {
            presenter
                .show_warning(&format!("Skipped {} words with no definition found", skipped));
        }

        let cards_created = self.card_store.create_cards_batch(&cards, options.progress).await;
        presenter.show_success(&format!("Successfully created {} cards", cards_created));

        let result = ProcessingResult {
            total_words_found: total_words,
            new_words_found: unknown_words.len(),
            cards_created,
            errors: Vec::new(),
            elapsed: start.elapsed(),
            comprehension_percentage: comprehension,
        };

        if let Some(stats) = &self.stats_sink {
            stats.record_session(MiningSession {
                series_name: parent_dir_name(video_file),
                episode_name: file_stem_name(video_file),
                total_words: result.total_words_found,
                unknown_words: result.new_words_found,
                cards_created: result.cards_created,
                elapsed_secs: result.elapsed.as_secs_f64(),
                mined_at: Local::now(),
            });
        }

        info!(
            total = result.total_words_found,
            new = result.new_words_found,
            created = result.cards_created,
            elapsed_secs = result.elapsed.as_secs_f64(),
            "episode processed"
        );
        Ok(result)
    }
}
