//! kotomine mines Japanese vocabulary from video/subtitle pairs: it
//! filters out known words, extracts a screenshot and audio clip per word
//! through ffmpeg, resolves definitions through a dictionary provider
//! chain, and commits the result as flashcards over a local AnkiConnect
//! endpoint.

pub mod anki;
pub mod core;
pub mod dictionary;
pub mod filter;
pub mod frequency;
pub mod media;
pub mod pipeline;
pub mod pitch_accent;
pub mod presenter;
pub mod stats;
pub mod subtitle;
pub mod validation;
pub mod word_lists;

pub use crate::{
    anki::{
        AnkiService,
        CardStore,
        HttpAnkiConnect,
    },
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
    frequency::FrequencyService,
    media::{
        FfmpegExtractor,
        MediaExtractor,
    },
    pipeline::{
        EpisodeProcessor,
        FolderProcessor,
        ProcessOptions,
    },
    pitch_accent::PitchAccentService,
    presenter::Presenter,
    stats::StatsSink,
    subtitle::SubtitleParser,
    validation::ValidationService,
    word_lists::WordListService,
};

/// Install the tracing subscriber for embedding binaries and manual runs.
/// Honors `RUST_LOG`, defaulting to `info`.
pub fn init_tracing() {
    use tracing_subscriber::{
        fmt,
        layer::SubscriberExt,
        util::SubscriberInitExt,
        EnvFilter,
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}
