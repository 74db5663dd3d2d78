
use std::{
    collections::HashMap,
    path::{
        Path,
        PathBuf,
    },
    process::Output,
    sync::Mutex,
    time::Duration,
};

use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use tokio::process::Command;
use tracing::{
    debug,
    warn,
};

use crate::core::{
    utils::{
        ensure_directory,
        safe_filename,
    },
    CancellationToken,
    KotomineError,
    MediaData,
    MinerConfig,
    ProgressSink,
    TokenizedWord,
};

const TRANSCODER_TIMEOUT: Duration = Duration::from_secs(30);

const JAPANESE_LANG_CODES: [&str; 4] = ["jpn", "ja", "japanese", "jp"];

/// Turns timing windows into screenshot/audio files via an external
/// transcoder.
#[async_trait]
pub trait MediaExtractor: Send + Sync {
    /// Extract a screenshot and audio clip for one word. Failures yield an
    /// empty or partial `MediaData`, never an error.
    async fn extract_media(&self, video: &Path, word: &TokenizedWord) -> MediaData;

    /// Extract media for many words concurrently. Only screenshot-bearing
    /// results are kept; results arrive in completion order, not input
    /// order.
    async fn extract_media_batch(
        &self,
        video: &Path,
        words: &[TokenizedWord],
        progress: Option<&dyn ProgressSink>,
        cancel: &CancellationToken,
    ) -> Vec<(TokenizedWord, MediaData)>;
}

/// Per-video detected Japanese audio stream index. Shared by concurrent
/// extraction workers; lock-guarded and append-only within a run.
#[derive(Default)]
pub struct AudioStreamCache {
    inner: Mutex<HashMap<PathBuf, Option<i64>>>,
}

impl AudioStreamCache {
    /// Outer None means "not probed yet"; inner None means "probed, no
    /// Japanese track".
    pub fn get(&self, video: &Path) -> Option<Option<i64>> {
        self.inner.lock().ok()?.get(video).copied()
    }

    pub fn insert(&self, video: PathBuf, stream_index: Option<i64>) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.insert(video, stream_index);
        }
    }
}

// ffprobe -print_format json -show_streams output, audio streams only
#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    index: Option<i64>,
    #[serde(default)]
    tags: HashMap<String, String>,
}

fn find_japanese_stream(probe: &ProbeOutput) -> Option<i64> {
    probe.streams.iter().find_map(|stream| {
        let language = stream.tags.get("language")?.to_lowercase();
        if JAPANESE_LANG_CODES.contains(&language.as_str()) {
            stream.index
        } else {
            None
        }
    })
}

/// Frame-grab timestamp: a fixed offset into the line, but never past the
/// middle of short lines.
fn screenshot_timestamp(start_time: f64, duration: f64, offset: f64) -> f64 {
    start_time + offset.min(duration / 2.0)
}

/// Audio clip window with padding on both sides, clamped so the start
/// never goes negative.
fn audio_window(start_time: f64, duration: f64, padding: f64) -> (f64, f64) {
    let clip_start = (start_time - padding).max(0.0);
    let clip_duration = duration + padding * 2.0;
    (clip_start, clip_duration)
}

/// Drives ffmpeg/ffprobe subprocesses to extract media, one bounded worker
/// pool per batch call.
pub struct FfmpegExtractor {
    config: MinerConfig,
    audio_stream_cache: AudioStreamCache,
}

impl FfmpegExtractor {
    pub fn new(config: MinerConfig) -> Result<Self, KotomineError> {
        ensure_directory(&config.media_temp_folder)?;
        Ok(FfmpegExtractor { config, audio_stream_cache: AudioStreamCache::default() })
    }

    async fn run_transcoder(
        &self,
        program: &str,
        args: &[String],
    ) -> Result<Output, KotomineError> {
        let output = tokio::time::timeout(
            TRANSCODER_TIMEOUT,
            Command::new(program).args(args).kill_on_drop(true).output(),
        )
        .await
        .map_err(|_| KotomineError::Media(format!("{} timed out after 30s", program)))?
        .map_err(|e| KotomineError::Media(format!("failed to run {}: {}", program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(KotomineError::Media(format!(
                "{} exited with {}: {}",
                program,
                output.status,
                stderr.lines().last().unwrap_or("").trim()
            )));
        }

        Ok(output)
    }

    async fn extract_screenshot(
        &self,
        video: &Path,
        word: &TokenizedWord,
        output_path: &Path,
    ) -> Result<(), KotomineError> {
        let timestamp =
            screenshot_timestamp(word.start_time, word.duration, self.config.screenshot_offset);

        let args = vec![
            "-y".to_string(),
            "-ss".to_string(),
            timestamp.to_string(),
            "-i".to_string(),
            video.to_string_lossy().into_owned(),
            "-frames:v".to_string(),
            "1".to_string(),
            "-q:v".to_string(),
            "2".to_string(),
            output_path.to_string_lossy().into_owned(),
        ];

        self.run_transcoder(&self.config.ffmpeg_program, &args).await?;

        if !output_path.exists() {
            return Err(KotomineError::Media(format!(
                "screenshot output missing: {}",
                output_path.display()
            )));
        }
        Ok(())
    }

    async fn extract_audio(
        &self,
        video: &Path,
        word: &TokenizedWord,
        output_path: &Path,
    ) -> Result<(), KotomineError> {
        let (clip_start, clip_duration) =
            audio_window(word.start_time, word.duration, self.config.audio_padding);

        let mut args = vec![
            "-y".to_string(),
            "-ss".to_string(),
            clip_start.to_string(),
            "-t".to_string(),
            clip_duration.to_string(),
            "-i".to_string(),
            video.to_string_lossy().into_owned(),
        ];

        match self.detect_japanese_stream(video).await {
            Some(index) => {
                debug!(index, "using Japanese audio stream");
                args.push("-map".to_string());
                args.push(format!("0:{}", index));
            }
            None => {
                warn!("no Japanese audio track found, using first audio stream");
                args.push("-map".to_string());
                args.push("0:a:0".to_string());
            }
        }

        args.extend([
            "-vn".to_string(),
            "-acodec".to_string(),
            "libmp3lame".to_string(),
            "-q:a".to_string(),
            "2".to_string(),
            output_path.to_string_lossy().into_owned(),
        ]);

        self.run_transcoder(&self.config.ffmpeg_program, &args).await?;

        if !output_path.exists() {
            return Err(KotomineError::Media(format!(
                "audio output missing: {}",
                output_path.display()
            )));
        }
        Ok(())
    }

    /// One metadata probe per video path; concurrent workers reuse the
    /// cached answer.
    async fn detect_japanese_stream(&self, video: &Path) -> Option<i64> {
        if let Some(cached) = self.audio_stream_cache.get(video) {
            return cached;
        }

        let detected = self.probe_japanese_stream(video).await;
        self.audio_stream_cache.insert(video.to_path_buf(), detected);
        detected
    }

    async fn probe_japanese_stream(&self, video: &Path) -> Option<i64> {
        let args = vec![
            "-v".to_string(),
            "quiet".to_string(),
            "-print_format".to_string(),
            "json".to_string(),
            "-show_streams".to_string(),
            "-select_streams".to_string(),
            "a".to_string(),
            video.to_string_lossy().into_owned(),
        ];

        let output = match self.run_transcoder(&self.config.ffprobe_program, &args).await {
            Ok(output) => output,
            Err(e) => {
                warn!(video = %video.display(), error = %e, "audio stream probe failed");
                return None;
            }
        };

        let probe: ProbeOutput = match serde_json::from_slice(&output.stdout) {
            Ok(probe) => probe,
            Err(e) => {
                warn!(video = %video.display(), error = %e, "unparseable ffprobe output");
                return None;
            }
        };

        let found = find_japanese_stream(&probe);
        if found.is_none() {
            let languages: Vec<&str> = probe
                .streams
                .iter()
                .map(|s| s.tags.get("language").map(String::as_str).unwrap_or("unknown"))
                .collect();
            warn!(?languages, "no Japanese audio stream detected");
        }
        found
    }

    /// Extract both media kinds for one word, collecting per-part failure
    /// messages for the batch error channel.
    async fn extract_word(&self, video: &Path, word: &TokenizedWord) -> (MediaData, Vec<String>) {
        let safe_word = safe_filename(&word.lemma);
        let timestamp_ms = (word.start_time * 1000.0) as i64;

        let screenshot_file = format!("{}_{}.jpg", safe_word, timestamp_ms);
        let audio_file = format!("{}_{}.mp3", safe_word, timestamp_ms);
        let screenshot_path = self.config.media_temp_folder.join(&screenshot_file);
        let audio_path = self.config.media_temp_folder.join(&audio_file);

        let mut media = MediaData::default();
        let mut errors = Vec::new();

        match self.extract_screenshot(video, word, &screenshot_path).await {
            Ok(()) => {
                media.screenshot_path = Some(screenshot_path);
                media.screenshot_filename = Some(screenshot_file);
            }
            Err(e) => {
                warn!(lemma = %word.lemma, error = %e, "screenshot extraction failed");
                errors.push(e.to_string());
            }
        }

        match self.extract_audio(video, word, &audio_path).await {
            Ok(()) => {
                media.audio_path = Some(audio_path);
                media.audio_filename = Some(audio_file);
            }
            Err(e) => {
                warn!(lemma = %word.lemma, error = %e, "audio extraction failed");
                errors.push(e.to_string());
            }
        }

        (media, errors)
    }
}

#[async_trait]
impl MediaExtractor for FfmpegExtractor {
    async fn extract_media(&self, video: &Path, word: &TokenizedWord) -> MediaData {
        let (media, _errors) = self.extract_word(video, word).await;
        media
    }

    /// One task per word on a bounded pool. The cancellation flag is
    /// re-checked between collected results; a positive check stops
    /// awaiting further results and returns what was collected. Running
    /// tasks are never aborted mid-flight; transcoder children abandoned
    /// at pool teardown are reaped via kill-on-drop.
    async fn extract_media_batch(
        &self,
        video: &Path,
        words: &[TokenizedWord],
        progress: Option<&dyn ProgressSink>,
        cancel: &CancellationToken,
    ) -> Vec<(TokenizedWord, MediaData)> {
        if let Some(progress) = progress {
            progress.on_start(words.len(), "Extracting media");
        }

        let mut tasks = futures::stream::iter(words.iter().cloned().map(|word| {
            let video = video.to_path_buf();
            async move {
                let (media, errors) = self.extract_word(&video, &word).await;
                (word, media, errors)
            }
        }))
        .buffer_unordered(self.config.max_parallel_workers.max(1));

        let mut collected = Vec::new();
        let mut completed = 0;
        let mut was_cancelled = false;

        while let Some((word, media, errors)) = tasks.next().await {
            if cancel.is_cancelled() {
                was_cancelled = true;
                break;
            }

            completed += 1;
            if let Some(progress) = progress {
                for error in &errors {
                    progress.on_error(&word.lemma, error);
                }
            }

            // A card without a screenshot is incomplete: audio-only and
            // media-less results are dropped here.
            if media.has_screenshot() {
                if let Some(progress) = progress {
                    progress
                        .on_progress(completed, &format!("Extracting media: {}", word.lemma));
                }
                collected.push((word, media));
            } else if let Some(progress) = progress {
                progress.on_progress(completed, &format!("No screenshot: {}", word.lemma));
            }
        }

        if let Some(progress) = progress {
            if !was_cancelled {
                progress.on_complete();
            }
        }

        collected
    }
}
