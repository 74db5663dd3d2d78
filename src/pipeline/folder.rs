use std::{
    collections::{
        HashMap,
        HashSet,
    },
    path::{
        Path,
        PathBuf,
    },
    sync::Arc,
};

use tracing::warn;

use super::episode::{
    EpisodeProcessor,
    ProcessOptions,
};
use crate::core::{
    utils::natural_sort_key,
    CancellationToken,
    KotomineError,
    ProcessingResult,
    ProgressSink,
};
use crate::presenter::Presenter;

const VIDEO_EXTENSIONS: [&str; 5] = ["mp4", "mkv", "avi", "m4v", "mov"];
const SUBTITLE_EXTENSIONS: [&str; 3] = ["ass", "srt", "ssa"];

/// Drives the episode processor over every matched video/subtitle pair in
/// a directory.
pub struct FolderProcessor {
    processor: EpisodeProcessor,
    presenter: Arc<dyn Presenter>,
}

impl FolderProcessor {
    pub fn new(processor: EpisodeProcessor, presenter: Arc<dyn Presenter>) -> Self {
        FolderProcessor { processor, presenter }
    }

    /// Match videos to subtitles sharing the same stem. The first subtitle
    /// extension that exists wins; pairs come back natural-sorted by video
    /// file name.
    pub fn find_video_subtitle_pairs(
        folder: &Path,
    ) -> Result<Vec<(PathBuf, PathBuf)>, KotomineError> {
        let mut videos: Vec<PathBuf> = std::fs::read_dir(folder)?
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file()
                    && path
                        .extension()
                        .map(|ext| ext.to_string_lossy().to_lowercase())
                        .is_some_and(|ext| VIDEO_EXTENSIONS.contains(&ext.as_str()))
            })
            .collect();

        videos.sort_by_key(|video| {
            natural_sort_key(
                &video.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default(),
            )
        });

        let mut pairs = Vec::new();
        for video in videos {
            for sub_ext in SUBTITLE_EXTENSIONS {
                let subtitle = video.with_extension(sub_ext);
                if subtitle.exists() {
                    pairs.push((video, subtitle));
                    break;
                }
            }
        }

        Ok(pairs)
    }

    /// First pass for cross-episode priority mining: parse every episode's
    /// subtitles and count how many distinct episodes each lemma appears
    /// in. Per-episode parse failures are skipped with a warning.
    pub fn collect_cross_episode_counts(
        &self,
        pairs: &[(PathBuf, PathBuf)],
    ) -> HashMap<String, u32> {
        let mut lemma_episodes: HashMap<String, HashSet<usize>> = HashMap::new();

        for (episode_index, (_, subtitle_file)) in pairs.iter().enumerate() {
            match self.processor.subtitle_parser().parse_subtitle_file(subtitle_file) {
                Ok(words) => {
                    for word in words {
                        lemma_episodes.entry(word.lemma).or_default().insert(episode_index);
                    }
                }
                Err(e) => {
                    warn!(subtitle = %subtitle_file.display(), error = %e, "cross-episode scan failed");
                    self.presenter.show_warning(&format!(
                        "Cross-episode scan: skipping {}: {}",
                        subtitle_file
                            .file_name()
                            .map(|n| n.to_string_lossy())
                            .unwrap_or_default(),
                        e
                    ));
                }
            }
        }

        lemma_episodes
            .into_iter()
            .map(|(lemma, episodes)| (lemma, episodes.len() as u32))
            .collect()
    }

    /// Process every pair in the folder, aggregating per-episode results.
    /// A failing episode becomes an error-entry result and never aborts
    /// the folder.
    pub async fn process_folder(
        &self,
        folder: &Path,
        preview_mode: bool,
        progress: Option<&dyn ProgressSink>,
        cancel: &CancellationToken,
    ) -> Result<Vec<ProcessingResult>, KotomineError> {
        self.presenter.show_info(&format!("Scanning folder: {}", folder.display()));
        let pairs = Self::find_video_subtitle_pairs(folder)?;

        if pairs.is_empty() {
            self.presenter.show_warning("No video/subtitle pairs found");
            return Ok(Vec::new());
        }
        self.presenter.show_success(&format!("Found {} video/subtitle pairs", pairs.len()));

        let config = self.processor.config();
        let cross_episode_counts: Option<HashMap<String, u32>> =
            if config.use_cross_episode_priority {
                self.presenter.show_info("Cross-episode analysis: scanning all subtitles...");
                let counts = self.collect_cross_episode_counts(&pairs);
                let multi_episode = counts
                    .values()
                    .filter(|&&count| count >= config.min_episode_appearances)
                    .count();
                self.presenter.show_success(&format!(
                    "Cross-episode analysis complete: {} words appear in {}+ episodes",
                    multi_episode, config.min_episode_appearances
                ));
                Some(counts)
            } else {
                None
            };

        if let Some(progress) = progress {
            progress.on_start(pairs.len(), "Processing episodes");
        }

        let mut results = Vec::with_capacity(pairs.len());
        let mut total_cards = 0;

        for (i, (video_file, subtitle_file)) in pairs.iter().enumerate() {
            self.presenter.show_info(&format!(
                "[{}/{}] Processing: {}",
                i + 1,
                pairs.len(),
                video_file.file_name().map(|n| n.to_string_lossy()).unwrap_or_default()
            ));

            let options = ProcessOptions {
                preview_mode,
                progress: None, // per-episode progress stays out of the folder bar
                curation: None,
                cross_episode_counts: cross_episode_counts.as_ref(),
                cancel: cancel.clone(),
            };
            let result = self.processor.process_episode(video_file, subtitle_file, &options).await;

            total_cards += result.cards_created;
            if let Some(progress) = progress {
                if result.success() {
                    progress.on_progress(
                        i + 1,
                        &format!(
                            "{}: {} cards",
                            video_file
                                .file_name()
                                .map(|n| n.to_string_lossy())
                                .unwrap_or_default(),
                            result.cards_created
                        ),
                    );
                } else {
                    for error in &result.errors {
                        progress.on_error(
                            &video_file
                                .file_name()
                                .map(|n| n.to_string_lossy().into_owned())
                                .unwrap_or_default(),
                            error,
                        );
                    }
                }
            }
            results.push(result);

            // A cancelled episode stops the folder run; its result already
            // carries the cancelled marker
            if cancel.is_cancelled() {
                break;
            }
        }

        if let Some(progress) = progress {
            progress.on_complete();
        }

        self.presenter.show_success(&format!(
            "Folder processing complete: {} total cards created",
            total_cards
        ));

        Ok(results)
    }
}
