use std::{
    collections::{
        HashMap,
        HashSet,
    },
    path::Path,
    sync::{
        atomic::{
            AtomicUsize,
            Ordering,
        },
        Arc,
        Mutex,
    },
};

use async_trait::async_trait;

use super::episode::{
    EpisodeProcessor,
    ProcessOptions,
};
use crate::{
    anki::CardStore,
    core::{
        CancellationToken,
        CardData,
        KotomineError,
        MediaData,
        MinerConfig,
        ProcessingResult,
        ProgressSink,
        TokenizedWord,
        ValidationResult,
    },
    dictionary::{
        DefinitionService,
        DictionaryProvider,
    },
    media::MediaExtractor,
    presenter::Presenter,
    stats::{
        DifficultyRecord,
        MiningSession,
        StatsSink,
    },
    subtitle::SubtitleParser,
};

fn word(lemma: &str, start: f64) -> TokenizedWord {
    TokenizedWord::new(lemma, lemma, "", &format!("{}の文", lemma)).with_timing(start, start + 2.0)
}

enum ParserBehavior {
    Words(Vec<TokenizedWord>),
    Fail,
}

struct FakeParser {
    behavior: ParserBehavior,
    calls: AtomicUsize,
}

impl FakeParser {
    fn words(words: Vec<TokenizedWord>) -> Self {
        FakeParser { behavior: ParserBehavior::Words(words), calls: AtomicUsize::new(0) }
    }

    fn failing() -> Self {
        FakeParser { behavior: ParserBehavior::Fail, calls: AtomicUsize::new(0) }
    }
}

impl SubtitleParser for FakeParser {
    fn parse_subtitle_file(
        &self,
        _subtitle_file: &Path,
    ) -> Result<Vec<TokenizedWord>, KotomineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            ParserBehavior::Words(words) => Ok(words.clone()),
            ParserBehavior::Fail => {
                Err(KotomineError::SubtitleParse("unreadable subtitle file".to_string()))
            }
        }
    }
}

enum ExtractorBehavior {
    MediaForAll,
    Nothing,
    CancelDuringBatch,
}

struct FakeExtractor {
    behavior: ExtractorBehavior,
    batch_calls: AtomicUsize,
    last_batch: Mutex<Vec<String>>,
}

impl FakeExtractor {
    fn new(behavior: ExtractorBehavior) -> Self {
        FakeExtractor {
            behavior,
            batch_calls: AtomicUsize::new(0),
            last_batch: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl MediaExtractor for FakeExtractor {
    async fn extract_media(&self, _video: &Path, _word: &TokenizedWord) -> MediaData {
        MediaData::default()
    }

    async fn extract_media_batch(
        &self,
        _video: &Path,
        words: &[TokenizedWord],
        _progress: Option<&dyn ProgressSink>,
        cancel: &CancellationToken,
    ) -> Vec<(TokenizedWord, MediaData)> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_batch.lock().unwrap() = words.iter().map(|w| w.lemma.clone()).collect();

        match self.behavior {
            ExtractorBehavior::MediaForAll => words
                .iter()
                .cloned()
                .map(|w| {
                    let media = MediaData {
                        screenshot_filename: Some(format!("{}.jpg", w.lemma)),
                        audio_filename: Some(format!("{}.mp3", w.lemma)),
                        ..MediaData::default()
                    };
                    (w, media)
                })
                .collect(),
            ExtractorBehavior::Nothing => Vec::new(),
            ExtractorBehavior::CancelDuringBatch => {
                cancel.cancel();
                Vec::new()
            }
        }
    }
}

struct FakeStore {
    vocabulary: HashSet<String>,
    connection_fails: bool,
    vocabulary_calls: AtomicUsize,
    create_calls: AtomicUsize,
    created_cards: Mutex<Vec<CardData>>,
}

impl FakeStore {
    fn with_vocabulary(words: &[&str]) -> Self {
        FakeStore {
            vocabulary: words.iter().map(|w| w.to_string()).collect(),
            connection_fails: false,
            vocabulary_calls: AtomicUsize::new(0),
            create_calls: AtomicUsize::new(0),
            created_cards: Mutex::new(Vec::new()),
        }
    }

    fn empty() -> Self {
        Self::with_vocabulary(&[])
    }

    fn unreachable_store() -> Self {
        FakeStore { connection_fails: true, ..Self::empty() }
    }
}

#[async_trait]
impl CardStore for FakeStore {
    async fn get_existing_vocabulary(&self) -> Result<HashSet<String>, KotomineError> {
        self.vocabulary_calls.fetch_add(1, Ordering::SeqCst);
        if self.connection_fails {
            return Err(KotomineError::AnkiConnection(
                "Cannot connect to AnkiConnect. Is Anki running?".to_string(),
            ));
        }
        Ok(self.vocabulary.clone())
    }

    async fn create_cards_batch(
        &self,
        cards: &[CardData],
        _progress: Option<&dyn ProgressSink>,
    ) -> usize {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.created_cards.lock().unwrap().extend(cards.iter().cloned());
        cards.len()
    }
}

#[derive(Default)]
struct RecordingPresenter {
    warnings: Mutex<Vec<String>>,
    errors: Mutex<Vec<String>>,
    previews: Mutex<Vec<Vec<String>>>,
}

impl Presenter for RecordingPresenter {
    fn show_info(&self, _message: &str) {}

    fn show_success(&self, _message: &str) {}

    fn show_warning(&self, message: &str) {
        self.warnings.lock().unwrap().push(message.to_string());
    }

    fn show_error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }

    fn show_word_preview(&self, words: &[TokenizedWord]) {
        self.previews
            .lock()
            .unwrap()
            .push(words.iter().map(|w| w.lemma.clone()).collect());
    }

    fn show_processing_result(&self, _result: &ProcessingResult) {}

    fn show_validation_result(&self, _result: &ValidationResult) {}
}

#[derive(Default)]
struct FakeStats {
    difficulties: Mutex<Vec<DifficultyRecord>>,
    sessions: Mutex<Vec<MiningSession>>,
}

impl StatsSink for FakeStats {
    fn record_difficulty(&self, record: DifficultyRecord) {
        self.difficulties.lock().unwrap().push(record);
    }

    fn record_session(&self, session: MiningSession) {
        self.sessions.lock().unwrap().push(session);
    }
}

struct TableProvider {
    entries: HashMap<String, String>,
    lookups: Arc<AtomicUsize>,
}

#[async_trait]
impl DictionaryProvider for TableProvider {
    fn name(&self) -> &str {
        "table"
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn load(&mut self) -> Result<(), KotomineError> {
        Ok(())
    }

    async fn lookup(&self, word: &str) -> Option<String> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.entries.get(word).cloned()
    }
}

fn definition_service(entries: &[(&str, &str)]) -> (DefinitionService, Arc<AtomicUsize>) {
    let lookups = Arc::new(AtomicUsize::new(0));
    let provider = TableProvider {
        entries: entries.iter().map(|(w, d)| (w.to_string(), d.to_string())).collect(),
        lookups: lookups.clone(),
    };
    (DefinitionService::with_providers(vec![Box::new(provider)]), lookups)
}

struct Harness {
    parser: Arc<FakeParser>,
    extractor: Arc<FakeExtractor>,
    store: Arc<FakeStore>,
    presenter: Arc<RecordingPresenter>,
    definition_lookups: Arc<AtomicUsize>,
    _temp_dir: tempfile::TempDir,
}

fn build(
    mut config: MinerConfig,
    parser: FakeParser,
    extractor: FakeExtractor,
    store: FakeStore,
    definitions: &[(&str, &str)],
) -> (EpisodeProcessor, Harness) {
    let temp_dir = tempfile::tempdir().unwrap();
    config.media_temp_folder = temp_dir.path().to_path_buf();

    let parser = Arc::new(parser);
    let extractor = Arc::new(extractor);
    let store = Arc::new(store);
    let presenter = Arc::new(RecordingPresenter::default());
    let (definition_service, definition_lookups) = definition_service(definitions);

    let processor = EpisodeProcessor::new(
        config,
        parser.clone(),
        extractor.clone(),
        definition_service,
        store.clone(),
        presenter.clone(),
    );

    let harness = Harness {
        parser,
        extractor,
        store,
        presenter,
        definition_lookups,
        _temp_dir: temp_dir,
    };
    (processor, harness)
}

fn two_words() -> Vec<TokenizedWord> {
    vec![word("食べる", 10.0), word("走る", 20.0)]
}

const BOTH_DEFINED: [(&str, &str); 2] = [("食べる", "1. to eat"), ("走る", "1. to run")];

#[tokio::test]
async fn empty_subtitles_return_zero_counts_without_touching_collaborators() {
    let (processor, harness) = build(
        MinerConfig::default(),
        FakeParser::words(Vec::new()),
        FakeExtractor::new(ExtractorBehavior::MediaForAll),
        FakeStore::empty(),
        &BOTH_DEFINED,
    );

    let result = processor
        .process_episode(Path::new("/v/ep1.mkv"), Path::new("/v/ep1.srt"), &ProcessOptions::default())
        .await;

    assert_eq!(result.total_words_found, 0);
    assert_eq!(result.new_words_found, 0);
    assert_eq!(result.cards_created, 0);
    assert!(result.errors.is_empty());
    assert_eq!(harness.store.vocabulary_calls.load(Ordering::SeqCst), 0);
    assert_eq!(harness.extractor.batch_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn all_known_words_early_return_with_full_comprehension() {
    let (processor, harness) = build(
        MinerConfig::default(),
        FakeParser::words(two_words()),
        FakeExtractor::new(ExtractorBehavior::MediaForAll),
        FakeStore::with_vocabulary(&["食べる", "走る"]),
        &BOTH_DEFINED,
    );

    let result = processor
        .process_episode(Path::new("/v/ep1.mkv"), Path::new("/v/ep1.srt"), &ProcessOptions::default())
        .await;

    assert_eq!(result.total_words_found, 2);
    assert_eq!(result.new_words_found, 0);
    assert_eq!(result.cards_created, 0);
    assert!(result.errors.is_empty());
    assert_eq!(result.comprehension_percentage, 100.0);
    // The transcoder is never invoked when nothing is left to mine
    assert_eq!(harness.extractor.batch_calls.load(Ordering::SeqCst), 0);
    assert_eq!(harness.store.create_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn two_new_words_become_two_cards() {
    let (processor, harness) = build(
        MinerConfig::default(),
        FakeParser::words(two_words()),
        FakeExtractor::new(ExtractorBehavior::MediaForAll),
        FakeStore::empty(),
        &BOTH_DEFINED,
    );

    let result = processor
        .process_episode(Path::new("/v/ep1.mkv"), Path::new("/v/ep1.srt"), &ProcessOptions::default())
        .await;

    assert_eq!(result.total_words_found, 2);
    assert_eq!(result.new_words_found, 2);
    assert_eq!(result.cards_created, 2);
    assert!(result.errors.is_empty());
    assert_eq!(result.comprehension_percentage, 0.0);

    let cards = harness.store.created_cards.lock().unwrap();
    assert_eq!(cards.len(), 2);
    assert_eq!(cards[0].definition.as_deref(), Some("1. to eat"));
}

#[tokio::test]
async fn words_without_definitions_are_skipped_with_a_warning() {
    let (processor, harness) = build(
        MinerConfig::default(),
        FakeParser::words(two_words()),
        FakeExtractor::new(ExtractorBehavior::MediaForAll),
        FakeStore::empty(),
        &[("食べる", "1. to eat")], // 走る resolves to nothing
    );

    let result = processor
        .process_episode(Path::new("/v/ep1.mkv"), Path::new("/v/ep1.srt"), &ProcessOptions::default())
        .await;

    assert_eq!(result.new_words_found, 2);
    assert_eq!(result.cards_created, 1);
    assert!(result.errors.is_empty()); // a skip is a warning, not an error

    let cards = harness.store.created_cards.lock().unwrap();
    assert_eq!(cards.len(), 1);
    assert_eq!(cards[0].word.lemma, "食べる");
    assert!(harness
        .presenter
        .warnings
        .lock()
        .unwrap()
        .iter()
        .any(|w| w.contains("Skipped 1")));
}

#[tokio::test]
async fn comprehension_is_known_over_total() {
    let words =
        vec![word("一", 1.0), word("二", 2.0), word("三", 3.0), word("四", 4.0)];
    let (processor, _harness) = build(
        MinerConfig::default(),
        FakeParser::words(words),
        FakeExtractor::new(ExtractorBehavior::MediaForAll),
        FakeStore::with_vocabulary(&["一"]),
        &[("二", "two"), ("三", "three"), ("四", "four")],
    );

    let result = processor
        .process_episode(Path::new("/v/ep1.mkv"), Path::new("/v/ep1.srt"), &ProcessOptions::default())
        .await;

    assert_eq!(result.total_words_found, 4);
    assert_eq!(result.new_words_found, 3);
    assert!((result.comprehension_percentage - 25.0).abs() < 1e-5);
}

#[tokio::test]
async fn preview_mode_shows_words_and_touches_nothing_remote() {
    let (processor, harness) = build(
        MinerConfig::default(),
        FakeParser::words(two_words()),
        FakeExtractor::new(ExtractorBehavior::MediaForAll),
        FakeStore::empty(),
        &BOTH_DEFINED,
    );

    let options = ProcessOptions { preview_mode: true, ..ProcessOptions::default() };
    let result = processor
        .process_episode(Path::new("/v/ep1.mkv"), Path::new("/v/ep1.srt"), &options)
        .await;

    assert_eq!(result.new_words_found, 2);
    assert_eq!(result.cards_created, 0);
    assert!(result.errors.is_empty());

    let previews = harness.presenter.previews.lock().unwrap();
    assert_eq!(previews.len(), 1);
    assert_eq!(previews[0], vec!["食べる", "走る"]);
    assert_eq!(harness.extractor.batch_calls.load(Ordering::SeqCst), 0);
    assert_eq!(harness.store.create_calls.load(Ordering::SeqCst), 0);
    assert_eq!(harness.definition_lookups.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn curation_narrows_the_working_set() {
    let (processor, harness) = build(
        MinerConfig::default(),
        FakeParser::words(two_words()),
        FakeExtractor::new(ExtractorBehavior::MediaForAll),
        FakeStore::empty(),
        &BOTH_DEFINED,
    );

    let curate = |words: Vec<TokenizedWord>| -> Vec<TokenizedWord> {
        words.into_iter().filter(|w| w.lemma == "走る").collect()
    };
    let options = ProcessOptions { curation: Some(&curate), ..ProcessOptions::default() };
    let result = processor
        .process_episode(Path::new("/v/ep1.mkv"), Path::new("/v/ep1.srt"), &options)
        .await;

    assert_eq!(result.new_words_found, 1);
    assert_eq!(result.cards_created, 1);
    assert_eq!(*harness.extractor.last_batch.lock().unwrap(), vec!["走る"]);
}

#[tokio::test]
async fn empty_curation_selection_cancels_the_run() {
    let (processor, harness) = build(
        MinerConfig::default(),
        FakeParser::words(two_words()),
        FakeExtractor::new(ExtractorBehavior::MediaForAll),
        FakeStore::empty(),
        &BOTH_DEFINED,
    );

    let curate = |_words: Vec<TokenizedWord>| -> Vec<TokenizedWord> { Vec::new() };
    let options = ProcessOptions { curation: Some(&curate), ..ProcessOptions::default() };
    let result = processor
        .process_episode(Path::new("/v/ep1.mkv"), Path::new("/v/ep1.srt"), &options)
        .await;

    assert_eq!(result.cards_created, 0);
    assert_eq!(result.new_words_found, 0);
    assert!(result.errors.iter().any(|e| e.contains("cancelled")));
    assert_eq!(harness.extractor.batch_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn pre_cancelled_token_stops_after_parsing() {
    let (processor, harness) = build(
        MinerConfig::default(),
        FakeParser::words(two_words()),
        FakeExtractor::new(ExtractorBehavior::MediaForAll),
        FakeStore::empty(),
        &BOTH_DEFINED,
    );

    let options = ProcessOptions::default();
    options.cancel.cancel();
    let result = processor
        .process_episode(Path::new("/v/ep1.mkv"), Path::new("/v/ep1.srt"), &options)
        .await;

    assert_eq!(result.total_words_found, 2);
    assert_eq!(result.cards_created, 0);
    assert!(result.errors.iter().any(|e| e.contains("cancelled")));
    // No phase after parsing runs
    assert_eq!(harness.parser.calls.load(Ordering::SeqCst), 1);
    assert_eq!(harness.store.vocabulary_calls.load(Ordering::SeqCst), 0);
    assert_eq!(harness.extractor.batch_calls.load(Ordering::SeqCst), 0);
    assert_eq!(harness.definition_lookups.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn cancel_during_media_stops_before_definitions() {
    let (processor, harness) = build(
        MinerConfig::default(),
        FakeParser::words(two_words()),
        FakeExtractor::new(ExtractorBehavior::CancelDuringBatch),
        FakeStore::empty(),
        &BOTH_DEFINED,
    );

    let result = processor
        .process_episode(Path::new("/v/ep1.mkv"), Path::new("/v/ep1.srt"), &ProcessOptions::default())
        .await;

    assert_eq!(result.cards_created, 0);
    assert!(result.errors.iter().any(|e| e.contains("cancelled")));
    assert_eq!(harness.definition_lookups.load(Ordering::SeqCst), 0);
    assert_eq!(harness.store.create_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn parse_failure_becomes_a_result_error() {
    let (processor, harness) = build(
        MinerConfig::default(),
        FakeParser::failing(),
        FakeExtractor::new(ExtractorBehavior::MediaForAll),
        FakeStore::empty(),
        &BOTH_DEFINED,
    );

    let result = processor
        .process_episode(Path::new("/v/ep1.mkv"), Path::new("/v/ep1.srt"), &ProcessOptions::default())
        .await;

    assert_eq!(result.total_words_found, 0);
    assert_eq!(result.cards_created, 0);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].contains("unreadable subtitle file"));
    assert!(!harness.presenter.errors.lock().unwrap().is_empty());
}

#[tokio::test]
async fn vocabulary_connectivity_failure_aborts_the_episode() {
    let (processor, harness) = build(
        MinerConfig::default(),
        FakeParser::words(two_words()),
        FakeExtractor::new(ExtractorBehavior::MediaForAll),
        FakeStore::unreachable_store(),
        &BOTH_DEFINED,
    );

    let result = processor
        .process_episode(Path::new("/v/ep1.mkv"), Path::new("/v/ep1.srt"), &ProcessOptions::default())
        .await;

    assert!(result.errors.iter().any(|e| e.contains("AnkiConnect")));
    assert_eq!(result.cards_created, 0);
    assert_eq!(harness.extractor.batch_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn failed_media_extraction_for_all_words_is_an_error_entry() {
    let (processor, harness) = build(
        MinerConfig::default(),
        FakeParser::words(two_words()),
        FakeExtractor::new(ExtractorBehavior::Nothing),
        FakeStore::empty(),
        &BOTH_DEFINED,
    );

    let result = processor
        .process_episode(Path::new("/v/ep1.mkv"), Path::new("/v/ep1.srt"), &ProcessOptions::default())
        .await;

    assert_eq!(result.new_words_found, 2);
    assert_eq!(result.cards_created, 0);
    assert_eq!(result.errors, vec!["Media extraction failed for all words".to_string()]);
    assert_eq!(harness.definition_lookups.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn temp_media_folder_is_purged_on_success_and_failure() {
    // Success path
    let (processor, harness) = build(
        MinerConfig::default(),
        FakeParser::words(two_words()),
        FakeExtractor::new(ExtractorBehavior::MediaForAll),
        FakeStore::empty(),
        &BOTH_DEFINED,
    );
    let leftover = processor.config().media_temp_folder.join("old_word_123.jpg");
    std::fs::write(&leftover, b"stale").unwrap();

    processor
        .process_episode(Path::new("/v/ep1.mkv"), Path::new("/v/ep1.srt"), &ProcessOptions::default())
        .await;
    assert!(!leftover.exists());
    drop(harness);

    // Failure path
    let (processor, _harness) = build(
        MinerConfig::default(),
        FakeParser::failing(),
        FakeExtractor::new(ExtractorBehavior::MediaForAll),
        FakeStore::empty(),
        &BOTH_DEFINED,
    );
    let leftover = processor.config().media_temp_folder.join("old_word_456.mp3");
    std::fs::write(&leftover, b"stale").unwrap();

    processor
        .process_episode(Path::new("/v/ep1.mkv"), Path::new("/v/ep1.srt"), &ProcessOptions::default())
        .await;
    assert!(!leftover.exists());
}

#[tokio::test]
async fn frequency_ranks_are_attached_and_filtered() {
    let dir = tempfile::tempdir().unwrap();
    let frequency_path = dir.path().join("frequency.csv");
    std::fs::write(&frequency_path, "1,一\n500,二\n50000,三\n").unwrap();
    let mut frequency = crate::frequency::FrequencyService::new(frequency_path);
    frequency.load().unwrap();

    let config = MinerConfig { max_frequency_rank: 1000, ..MinerConfig::default() };
    let words = vec![word("一", 1.0), word("二", 2.0), word("三", 3.0)];
    let (processor, harness) = build(
        config,
        FakeParser::words(words),
        FakeExtractor::new(ExtractorBehavior::MediaForAll),
        FakeStore::empty(),
        &[("一", "one"), ("二", "two"), ("三", "three")],
    );
    let processor = processor.with_frequency_service(frequency);

    let result = processor
        .process_episode(Path::new("/v/ep1.mkv"), Path::new("/v/ep1.srt"), &ProcessOptions::default())
        .await;

    // Rank 50000 is outside the top 1000 and never reaches media extraction
    assert_eq!(result.new_words_found, 2);
    assert_eq!(*harness.extractor.last_batch.lock().unwrap(), vec!["一", "二"]);

    let cards = harness.store.created_cards.lock().unwrap();
    let ranks: Vec<&str> = cards
        .iter()
        .map(|c| c.extra_fields.as_ref().unwrap()["frequency_rank"].as_str())
        .collect();
    assert_eq!(ranks, vec!["1", "500"]);
}

#[tokio::test]
async fn pitch_accents_land_in_extra_fields() {
    let dir = tempfile::tempdir().unwrap();
    let pitch_path = dir.path().join("pitch.csv");
    std::fs::write(&pitch_path, "たべる,食べる,2\n").unwrap();
    let mut pitch = crate::pitch_accent::PitchAccentService::new(pitch_path);
    pitch.load().unwrap();

    let (processor, harness) = build(
        MinerConfig::default(),
        FakeParser::words(two_words()),
        FakeExtractor::new(ExtractorBehavior::MediaForAll),
        FakeStore::empty(),
        &BOTH_DEFINED,
    );
    let processor = processor.with_pitch_accent_service(pitch);

    processor
        .process_episode(Path::new("/v/ep1.mkv"), Path::new("/v/ep1.srt"), &ProcessOptions::default())
        .await;

    let cards = harness.store.created_cards.lock().unwrap();
    let tabemasu = cards.iter().find(|c| c.word.lemma == "食べる").unwrap();
    assert_eq!(tabemasu.extra_fields.as_ref().unwrap()["pitch_accent"], "2");
    // 走る has no pitch entry and no rank, so it carries no extras at all
    let hashiru = cards.iter().find(|c| c.word.lemma == "走る").unwrap();
    assert!(hashiru.extra_fields.is_none());
}

#[tokio::test]
async fn stats_sink_receives_difficulty_and_session_records() {
    let stats = Arc::new(FakeStats::default());
    let (processor, _harness) = build(
        MinerConfig::default(),
        FakeParser::words(two_words()),
        FakeExtractor::new(ExtractorBehavior::MediaForAll),
        FakeStore::empty(),
        &BOTH_DEFINED,
    );
    let processor = processor.with_stats_sink(stats.clone());

    processor
        .process_episode(
            Path::new("/shows/Frieren/ep01.mkv"),
            Path::new("/shows/Frieren/ep01.srt"),
            &ProcessOptions::default(),
        )
        .await;

    let difficulties = stats.difficulties.lock().unwrap();
    assert_eq!(difficulties.len(), 1);
    assert_eq!(difficulties[0].series_name, "Frieren");
    assert_eq!(difficulties[0].total_words, 2);
    assert_eq!(difficulties[0].unknown_words, 2);

    let sessions = stats.sessions.lock().unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].episode_name, "ep01");
    assert_eq!(sessions[0].cards_created, 2);
}

#[tokio::test]
async fn cross_episode_counts_filter_single_episode_words() {
    let config = MinerConfig { min_episode_appearances: 2, ..MinerConfig::default() };
    let (processor, harness) = build(
        config,
        FakeParser::words(two_words()),
        FakeExtractor::new(ExtractorBehavior::MediaForAll),
        FakeStore::empty(),
        &BOTH_DEFINED,
    );

    let counts: HashMap<String, u32> =
        [("食べる".to_string(), 3), ("走る".to_string(), 1)].into_iter().collect();
    let options =
        ProcessOptions { cross_episode_counts: Some(&counts), ..ProcessOptions::default() };
    let result = processor
        .process_episode(Path::new("/v/ep1.mkv"), Path::new("/v/ep1.srt"), &options)
        .await;

    assert_eq!(result.new_words_found, 1);
    assert_eq!(*harness.extractor.last_batch.lock().unwrap(), vec!["食べる"]);
}
