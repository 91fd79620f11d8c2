//! Video backend: open a source, transcode one variant.
//!
//! [`VideoBackend`] is the seam the orchestrator talks to. The production
//! implementation, [`FfmpegBackend`], probes with ffprobe and encodes with
//! ffmpeg; tests substitute their own backend.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use mc_core::variant::DEFAULT_AUDIO_SAMPLE_RATE;
use mc_core::{Error, Result, VideoCodec, VideoConfig};
use mc_media::{normalize_trim, plan_video, Dimensions, TransformPlan, TrimWindow};

use crate::command::ToolCommand;
use crate::probe;
use crate::tools::ToolRegistry;

/// Metadata of an opened source video.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoSource {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    /// Seconds.
    pub duration: f64,
    /// Frames per second, rounded.
    pub frame_rate: u32,
    pub has_audio: bool,
}

impl VideoSource {
    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width, self.height)
    }
}

/// Everything needed to produce one video variant, resolved against its
/// source.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoJob {
    pub tag: String,
    pub trim: TrimWindow,
    pub plan: TransformPlan,
    pub frame_rate: u32,
    pub codec: VideoCodec,
    /// kbps; only set when the codec honours it.
    pub bitrate: Option<u32>,
    /// Output sample rate, or `None` when no audio is encoded.
    pub audio_sample_rate: Option<u32>,
}

impl VideoJob {
    /// Resolve a variant config against an opened source.
    ///
    /// Trim offsets become absolute, the fit mode becomes a
    /// [`TransformPlan`], and the frame rate defaults to the source's.
    /// Problems are reported as [`Error::Transform`] for the config's tag.
    pub fn plan(source: &VideoSource, config: &VideoConfig) -> Result<Self> {
        let trim = normalize_trim(config.start, config.end, source.duration)
            .map_err(|e| Error::transform(&config.tag, e.to_string()))?;

        let encode_audio = source.has_audio && !config.mute;
        if config.codec == VideoCodec::Aac && !encode_audio {
            return Err(Error::transform(
                &config.tag,
                "aac output needs an audio stream but the source is silent or muted",
            ));
        }

        Ok(Self {
            tag: config.tag.clone(),
            trim,
            plan: plan_video(
                source.dimensions(),
                Dimensions::new(config.width, config.height),
                config.fit,
            ),
            frame_rate: config.frame_rate.unwrap_or(source.frame_rate),
            codec: config.codec,
            bitrate: config.bitrate.filter(|_| config.codec.honours_bitrate()),
            audio_sample_rate: encode_audio
                .then(|| config.audio_sample_rate.unwrap_or(DEFAULT_AUDIO_SAMPLE_RATE)),
        })
    }

    /// Dimensions of the produced frames; zero for audio-only output.
    pub fn output(&self) -> Dimensions {
        match self.codec.video_encoder() {
            Some(_) => self.plan.output,
            None => Dimensions::new(0, 0),
        }
    }

    /// Filter graph for `-vf`, or `None` when frames pass through untouched.
    pub fn video_filter(&self) -> Option<String> {
        let mut filters = Vec::new();
        if let Some(c) = self.plan.crop {
            filters.push(format!("crop={}:{}:{}:{}", c.width, c.height, c.x, c.y));
        }
        if let Some(r) = self.plan.resize {
            filters.push(format!("scale={}:{}", r.width, r.height));
        }
        if let Some(m) = self.plan.margins {
            let out = self.plan.output;
            filters.push(format!(
                "pad={}:{}:{}:{}:black",
                out.width, out.height, m.left, m.top
            ));
        }
        (!filters.is_empty()).then(|| filters.join(","))
    }

    /// Full ffmpeg argument list for writing this variant to `output`.
    pub fn ffmpeg_args(&self, source: &VideoSource, output: &Path) -> Vec<String> {
        let mut args: Vec<String> = ["-hide_banner", "-nostdin", "-y", "-loglevel", "error"]
            .into_iter()
            .map(String::from)
            .collect();

        if !self.trim.is_full(source.duration) {
            args.extend([
                "-ss".to_string(),
                format!("{:.3}", self.trim.start),
                "-to".to_string(),
                format!("{:.3}", self.trim.end),
            ]);
        }
        args.extend(["-i".to_string(), source.path.to_string_lossy().into_owned()]);

        match self.codec.video_encoder() {
            Some(encoder) => {
                if let Some(vf) = self.video_filter() {
                    args.extend(["-vf".to_string(), vf]);
                }
                args.extend(["-r".to_string(), self.frame_rate.to_string()]);
                args.extend(["-c:v".to_string(), encoder.to_string()]);
                if let Some(kbps) = self.bitrate {
                    args.extend(["-b:v".to_string(), format!("{kbps}k")]);
                }
            }
            None => args.push("-vn".to_string()),
        }

        match self.audio_sample_rate {
            Some(rate) => args.extend([
                "-c:a".to_string(),
                self.codec.audio_encoder().to_string(),
                "-ar".to_string(),
                rate.to_string(),
            ]),
            None => args.push("-an".to_string()),
        }

        let container = self.codec.container();
        if container.muxer() == "mp4" {
            args.extend(["-movflags".to_string(), "+faststart".to_string()]);
        }
        args.extend([
            "-f".to_string(),
            container.muxer().to_string(),
            output.to_string_lossy().into_owned(),
        ]);
        args
    }
}

/// Opens and transcodes videos.
#[async_trait]
pub trait VideoBackend: Send + Sync {
    /// Read source metadata. Unreadable input is [`Error::Decode`].
    async fn open(&self, path: &Path) -> Result<VideoSource>;

    /// Write the variant described by `job` to `output`.
    async fn transcode(&self, source: &VideoSource, job: &VideoJob, output: &Path) -> Result<()>;
}

/// [`VideoBackend`] that shells out to ffprobe and ffmpeg.
#[derive(Debug, Clone)]
pub struct FfmpegBackend {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
    timeout: Duration,
}

impl FfmpegBackend {
    pub fn new(ffmpeg: PathBuf, ffprobe: PathBuf, timeout: Duration) -> Self {
        Self {
            ffmpeg,
            ffprobe,
            timeout,
        }
    }

    /// Build from discovered tools; fails if either binary is missing.
    pub fn from_registry(tools: &ToolRegistry, timeout: Duration) -> Result<Self> {
        Ok(Self::new(
            tools.require("ffmpeg")?.to_path_buf(),
            tools.require("ffprobe")?.to_path_buf(),
            timeout,
        ))
    }
}

#[async_trait]
impl VideoBackend for FfmpegBackend {
    async fn open(&self, path: &Path) -> Result<VideoSource> {
        probe::probe(&self.ffprobe, path).await
    }

    async fn transcode(&self, source: &VideoSource, job: &VideoJob, output: &Path) -> Result<()> {
        let mut cmd = ToolCommand::new(&self.ffmpeg);
        cmd.args(job.ffmpeg_args(source, output)).timeout(self.timeout);

        tracing::debug!(tag = %job.tag, codec = %job.codec, output = %output.display(), "Transcoding video variant");

        cmd.execute().await.map_err(|e| match e {
            e if e.is_spawn() => Error::tool(cmd.name(), e.to_string()),
            e => Error::transform(&job.tag, format!("ffmpeg {e}")),
        })?;

        if !tokio::fs::try_exists(output).await.unwrap_or(false) {
            return Err(Error::transform(&job.tag, "ffmpeg produced no output"));
        }
        Ok(())
    }
}
