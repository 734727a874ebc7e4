use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::config::AnalysisConfig;
use crate::error::ClipperError;
use crate::models::{
    ClipOutcome, ParsedChat, RankedHighlight, RunReport, SignalSource, SourceStats, TimeSeries,
};
use crate::services::chat_parser::parse_chat_file;
use crate::services::{
    seconds_to_timestamp, write_report, AudioEnergyExtractor, ChatVelocityExtractor, ClipPlanner,
    FFmpeg, HighlightScorer, IntervalMerger, MediaAcquirer, SpikeDetector, VisionScoreExtractor,
    VisionScorer,
};

/// Where the chat signal comes from: a log file on disk, or messages
/// already fetched from a replay provider.
#[derive(Debug, Clone)]
pub enum ChatInput {
    LogFile(PathBuf),
    Messages(ParsedChat),
}

/// One run's inputs. The video must already be local; use
/// [`HighlightPipeline::run_url`] to acquire it first.
#[derive(Debug, Clone)]
pub struct AnalysisInput {
    pub video_path: PathBuf,
    pub chat: Option<ChatInput>,
    pub output_dir: PathBuf,
}

/// Ties the extractors, detector, scorer, merger, and planner together for
/// a single VOD. Construction validates the configuration, so a bad option
/// fails before any media work starts.
pub struct HighlightPipeline {
    config: AnalysisConfig,
    ffmpeg: FFmpeg,
    vision: Option<VisionScorer>,
}

impl HighlightPipeline {
    pub fn new(
        config: AnalysisConfig,
        vision: Option<VisionScorer>,
    ) -> Result<Self, ClipperError> {
        config.validate()?;
        let ffmpeg = FFmpeg::new().map_err(ClipperError::Media)?;
        Ok(Self {
            config,
            ffmpeg,
            vision,
        })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Download a VOD, then analyze and cut it like [`run`](Self::run).
    pub async fn run_url(&self, url: &str, output_dir: &Path) -> Result<RunReport, ClipperError> {
        let vod_id = url.rsplit('/').next().unwrap_or("vod");
        let video_path = output_dir.join(format!("vod_{vod_id}.mp4"));

        std::fs::create_dir_all(output_dir)
            .map_err(|e| ClipperError::Acquisition(format!("cannot create output dir: {e}")))?;

        let acquirer = MediaAcquirer::new();
        let url = url.to_string();
        let download_target = video_path.clone();
        tokio::task::spawn_blocking(move || acquirer.download(&url, &download_target))
            .await
            .map_err(|e| ClipperError::Acquisition(format!("download task failed: {e}")))??;

        self.run(&AnalysisInput {
            video_path,
            chat: None,
            output_dir: output_dir.to_path_buf(),
        })
        .await
    }

    /// Full run: extract, detect, rank, merge, cut clips, write the report.
    pub async fn run(&self, input: &AnalysisInput) -> Result<RunReport, ClipperError> {
        let (mut report, duration) = self.analyze_inner(input).await?;

        std::fs::create_dir_all(&input.output_dir)
            .map_err(|e| ClipperError::Media(anyhow::anyhow!("cannot create output dir: {e}")))?;

        let planner = ClipPlanner {
            pre_buffer: self.config.pre_buffer_secs,
            post_buffer: self.config.post_buffer_secs,
        };
        let requests = planner.plan(&report.selected, duration, &input.output_dir);

        // Cuts are independent per clip; one failure never aborts the rest
        let mut tasks: JoinSet<ClipOutcome> = JoinSet::new();
        for (request, highlight) in requests.into_iter().zip(report.selected.iter().cloned()) {
            let ffmpeg = self.ffmpeg.clone();
            let video = input.video_path.clone();
            let precise = self.config.precise_cuts;
            tasks.spawn_blocking(move || {
                log::info!(
                    "cutting clip at {} -> {:?}",
                    seconds_to_timestamp(request.start),
                    request.output_path
                );
                let result = if precise {
                    ffmpeg.export_precise(&video, &request.output_path, request.start, request.end)
                } else {
                    ffmpeg.export_fast(&video, &request.output_path, request.start, request.end)
                };
                ClipOutcome {
                    request,
                    highlight,
                    error: result.err().map(|e| format!("{e:#}")),
                }
            });
        }
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => report.clips.push(outcome),
                Err(e) => log::warn!("clip task failed: {e}"),
            }
        }
        report.clips
            .sort_by(|a, b| a.request.start.total_cmp(&b.request.start));

        let report_path = input.output_dir.join("highlights.csv");
        let file = std::fs::File::create(&report_path)
            .map_err(|e| ClipperError::Media(anyhow::anyhow!("cannot write {report_path:?}: {e}")))?;
        write_report(file, &report.clips)
            .map_err(|e| ClipperError::Media(anyhow::anyhow!("cannot write {report_path:?}: {e}")))?;

        log::info!(
            "run complete: {} candidates across {} sources, {} selected, {} clips ok, {} failed",
            report.total_candidates(),
            report.per_source.len(),
            report.selected.len(),
            report.clips_succeeded(),
            report.clips_failed(),
        );

        Ok(report)
    }

    /// Detection and merging without cutting clips. The live monitor polls
    /// this.
    pub async fn analyze(&self, input: &AnalysisInput) -> Result<RunReport, ClipperError> {
        let (report, _) = self.analyze_inner(input).await?;
        Ok(report)
    }

    async fn analyze_inner(
        &self,
        input: &AnalysisInput,
    ) -> Result<(RunReport, f64), ClipperError> {
        let sources = self.active_sources(input);
        if sources.is_empty() {
            return Err(ClipperError::NoActiveSources);
        }

        let info = self
            .ffmpeg
            .probe(&input.video_path)
            .map_err(ClipperError::Media)?;

        let work_dir = input.output_dir.join("work");
        std::fs::create_dir_all(&work_dir)
            .map_err(|e| ClipperError::Media(anyhow::anyhow!("cannot create work dir: {e}")))?;

        // The extractors read disjoint inputs; run them concurrently and
        // join before detection
        let chat_task = async {
            match &input.chat {
                Some(chat) if sources.contains(&SignalSource::Chat) => {
                    Some(self.chat_series(chat).await)
                }
                _ => None,
            }
        };
        let audio_task = async {
            if sources.contains(&SignalSource::Audio) {
                Some(self.audio_series(&input.video_path, &work_dir).await)
            } else {
                None
            }
        };
        let vision_task = async {
            match &self.vision {
                Some(scorer) if sources.contains(&SignalSource::Vision) => {
                    Some(self.vision_series(&input.video_path, &work_dir, scorer).await)
                }
                _ => None,
            }
        };
        let (chat_result, audio_result, vision_result) =
            tokio::join!(chat_task, audio_task, vision_task);

        let mut report = RunReport::default();
        let mut series_list: Vec<TimeSeries> = Vec::new();
        for result in [chat_result, audio_result, vision_result].into_iter().flatten() {
            match result {
                Ok(series) => series_list.push(series),
                Err(ClipperError::Extraction { source, reason }) => {
                    log::warn!("{source} source degraded: {reason}");
                    report.degraded.push((source, reason));
                }
                Err(other) => return Err(other),
            }
        }

        let _ = std::fs::remove_dir_all(&work_dir);

        if series_list.is_empty() {
            // Every attempted source failed; surface the first cause
            return match report.degraded.first().cloned() {
                Some((source, reason)) => Err(ClipperError::Extraction { source, reason }),
                None => Err(ClipperError::NoActiveSources),
            };
        }

        let duration = if info.duration_sec > 0.0 {
            info.duration_sec
        } else {
            series_list.iter().map(|s| s.end()).fold(0.0, f64::max)
        };

        let ranked = rank_series(&self.config, &series_list, &mut report);
        let ranked = if ranked.is_empty() {
            log::warn!("no spikes detected; falling back to evenly spaced sampling");
            report.fallback_sampling = true;
            fallback_windows(duration, &self.config)
        } else {
            ranked
        };

        let merger = IntervalMerger {
            max_count: self.config.num_clips,
            padding: self.config.padding,
            min_duration: self.config.min_highlight_secs,
            max_duration: self.config.clip_duration,
        };
        report.selected = merger.merge(ranked);

        for highlight in &report.selected {
            log::info!(
                "selected {} - {} (score {:.2}, {})",
                seconds_to_timestamp(highlight.start),
                seconds_to_timestamp(highlight.end),
                highlight.score,
                highlight.source_breakdown(),
            );
        }

        Ok((report, duration))
    }

    fn active_sources(&self, input: &AnalysisInput) -> Vec<SignalSource> {
        active_sources(&self.config, input.chat.is_some(), self.vision.is_some())
    }

    async fn chat_series(&self, chat: &ChatInput) -> Result<TimeSeries, ClipperError> {
        let chat_failed = |reason: String| ClipperError::Extraction {
            source: SignalSource::Chat,
            reason,
        };

        let parsed = match chat {
            ChatInput::Messages(parsed) => parsed.clone(),
            ChatInput::LogFile(path) => {
                let path = path.clone();
                tokio::task::spawn_blocking(move || parse_chat_file(&path))
                    .await
                    .map_err(|e| chat_failed(format!("parse task failed: {e}")))?
                    .map_err(|e| chat_failed(format!("{e:#}")))?
            }
        };

        let mut extractor = ChatVelocityExtractor::new(self.config.chat_bucket_secs);
        if self.config.hype_weighting {
            extractor = extractor.with_hype_weighting();
        }
        extractor.extract(&parsed)
    }

    async fn audio_series(
        &self,
        video: &Path,
        work_dir: &Path,
    ) -> Result<TimeSeries, ClipperError> {
        let audio_failed = |reason: String| ClipperError::Extraction {
            source: SignalSource::Audio,
            reason,
        };

        let ffmpeg = self.ffmpeg.clone();
        let video = video.to_path_buf();
        let wav = work_dir.join("audio.wav");
        let hop = self.config.audio_hop_secs;

        tokio::task::spawn_blocking(move || {
            ffmpeg
                .extract_audio(&video, &wav)
                .map_err(|e| audio_failed(format!("{e:#}")))?;
            AudioEnergyExtractor::new(hop).extract_file(&wav)
        })
        .await
        .map_err(|e| ClipperError::Extraction {
            source: SignalSource::Audio,
            reason: format!("extraction task failed: {e}"),
        })?
    }

    async fn vision_series(
        &self,
        video: &Path,
        work_dir: &Path,
        scorer: &VisionScorer,
    ) -> Result<TimeSeries, ClipperError> {
        let vision_failed = |reason: String| ClipperError::Extraction {
            source: SignalSource::Vision,
            reason,
        };

        let frames_dir = work_dir.join("frames");
        std::fs::create_dir_all(&frames_dir)
            .map_err(|e| vision_failed(format!("cannot create frames dir: {e}")))?;

        let ffmpeg = self.ffmpeg.clone();
        let video = video.to_path_buf();
        let interval = self.config.frame_interval_secs;
        let sample_dir = frames_dir.clone();
        let frames = tokio::task::spawn_blocking(move || {
            ffmpeg.extract_frames(&video, &sample_dir, interval)
        })
        .await
        .map_err(|e| vision_failed(format!("frame sampling task failed: {e}")))?
        .map_err(|e| vision_failed(format!("{e:#}")))?;

        let mut extractor = VisionScoreExtractor::new(interval);
        extractor.batch_size = self.config.vision_batch_size;
        extractor.timeout = Duration::from_secs(self.config.vision_timeout_secs);
        extractor.game_context = self.config.game_context.clone();
        extractor.extract(scorer, &frames).await
    }
}

/// Which sources can actually run: the method must request them and their
/// inputs must exist. Audio only needs the video itself.
pub(crate) fn active_sources(
    config: &AnalysisConfig,
    has_chat: bool,
    has_vision: bool,
) -> Vec<SignalSource> {
    let mut sources = Vec::new();
    if config.method.uses(SignalSource::Chat) && has_chat {
        sources.push(SignalSource::Chat);
    }
    if config.method.uses(SignalSource::Audio) {
        sources.push(SignalSource::Audio);
    }
    if config.method.uses(SignalSource::Vision) && has_vision {
        sources.push(SignalSource::Vision);
    }
    sources
}

/// Detect spikes per series, record per-source stats, and rank the combined
/// candidate set.
pub(crate) fn rank_series(
    config: &AnalysisConfig,
    series_list: &[TimeSeries],
    report: &mut RunReport,
) -> Vec<RankedHighlight> {
    let detector = SpikeDetector {
        sensitivity: config.sensitivity,
        baseline_window_secs: config.baseline_window_secs,
        min_duration_secs: config.min_highlight_secs,
    };

    let mut per_source = Vec::new();
    for series in series_list {
        let candidates = detector.detect(series);
        log::info!("{}: {} candidate(s)", series.source(), candidates.len());
        report.per_source.insert(
            series.source(),
            SourceStats {
                candidates: candidates.len(),
                skipped: series.skipped(),
                held: series.held(),
            },
        );
        per_source.push(candidates);
    }

    HighlightScorer::new(config.weights.clone()).rank(&per_source)
}

/// Last resort when no source spiked: sample `num_clips` windows evenly
/// across the VOD so the run still produces something to review.
pub(crate) fn fallback_windows(duration: f64, config: &AnalysisConfig) -> Vec<RankedHighlight> {
    if !(duration > 0.0) {
        return Vec::new();
    }

    let interval = duration / (config.num_clips as f64 + 1.0);
    let half = config.clip_duration.min(duration) / 2.0;

    (0..config.num_clips)
        .filter_map(|i| {
            let center = interval * (i as f64 + 1.0);
            let start = (center - half).max(0.0);
            let end = (center + half).min(duration);
            if end > start {
                Some(RankedHighlight::new(start, end, center, 0.0, Vec::new()))
            } else {
                None
            }
        })
        .collect()
}

/// Polls a growing recording and reports highlights as they are confirmed.
/// Cancellation is cooperative: the token is only checked between
/// iterations, never mid-computation.
pub struct LiveMonitor {
    pipeline: Arc<HighlightPipeline>,
    poll_interval: Duration,
    cancel: CancellationToken,
}

impl LiveMonitor {
    pub fn new(pipeline: HighlightPipeline, poll_interval: Duration) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            poll_interval,
            cancel: CancellationToken::new(),
        }
    }

    /// Clone of the stop token; cancel it to end the loop after the current
    /// iteration.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub async fn run<F>(
        &self,
        input: &AnalysisInput,
        mut on_highlight: F,
    ) -> Result<(), ClipperError>
    where
        F: FnMut(&RankedHighlight),
    {
        let mut seen: HashSet<(i64, i64)> = HashSet::new();

        while !self.cancel.is_cancelled() {
            let report = self.pipeline.analyze(input).await?;
            for highlight in &report.selected {
                let key = (
                    (highlight.start * 1000.0).round() as i64,
                    (highlight.end * 1000.0).round() as i64,
                );
                if seen.insert(key) {
                    on_highlight(highlight);
                }
            }

            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }

        Ok(())
    }
}
