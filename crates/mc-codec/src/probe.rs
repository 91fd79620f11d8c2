//! ffprobe JSON parsing into a [`VideoSource`].
//!
//! Runs `ffprobe -v quiet -print_format json -show_format -show_streams`
//! and keeps only what variant planning needs: dimensions, duration,
//! frame rate and whether an audio stream exists.

use std::path::{Path, PathBuf};
use std::time::Duration;

use mc_core::{Error, Result};
use serde::Deserialize;

use crate::command::ToolCommand;
use crate::video::VideoSource;

const PROBE_TIMEOUT: Duration = Duration::from_secs(60);

/// Probe `path` with the ffprobe binary at `ffprobe`.
///
/// A non-zero exit means the upload cannot be opened and surfaces as
/// [`Error::Decode`]. Failing to spawn ffprobe at all stays a tool error.
pub async fn probe(ffprobe: &Path, path: &Path) -> Result<VideoSource> {
    let mut cmd = ToolCommand::new(ffprobe);
    cmd.args([
        "-v",
        "quiet",
        "-print_format",
        "json",
        "-show_format",
        "-show_streams",
    ])
    .arg(path.to_string_lossy())
    .timeout(PROBE_TIMEOUT);

    let output = cmd.execute().await.map_err(|e| match e {
        e if e.is_spawn() => Error::tool(cmd.name(), e.to_string()),
        e => Error::Decode(format!("ffprobe {e}")),
    })?;

    parse_probe_json(path.to_path_buf(), &output.stdout)
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: FfprobeFormat,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    duration: Option<String>,
}

/// Map ffprobe's JSON document to a [`VideoSource`].
pub fn parse_probe_json(path: PathBuf, json: &str) -> Result<VideoSource> {
    let ff: FfprobeOutput = serde_json::from_str(json)
        .map_err(|e| Error::Decode(format!("ffprobe JSON parse error: {e}")))?;

    let video = ff
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| Error::Decode(format!("{} has no video stream", path.display())))?;

    let (width, height) = match (video.width, video.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => {
            return Err(Error::Decode(format!(
                "{} has no usable frame size",
                path.display()
            )))
        }
    };

    let duration = ff
        .format
        .duration
        .as_deref()
        .or(video.duration.as_deref())
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
        .ok_or_else(|| Error::Decode(format!("{} has no duration", path.display())))?;

    // r_frame_rate is "0/0" for some VFR streams; fall back to the average.
    let frame_rate = [video.r_frame_rate.as_deref(), video.avg_frame_rate.as_deref()]
        .into_iter()
        .flatten()
        .filter_map(parse_frame_rate)
        .find(|r| r.is_finite() && *r > 0.0)
        .map(|r| (r.round() as u32).max(1))
        .ok_or_else(|| Error::Decode(format!("{} has no frame rate", path.display())))?;

    let has_audio = ff
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    Ok(VideoSource {
        path,
        width,
        height,
        duration,
        frame_rate,
        has_audio,
    })
}

/// Parse a frame rate string like `"30000/1001"` or `"25"`.
fn parse_frame_rate(rate_str: &str) -> Option<f64> {
    if let Some((num, den)) = rate_str.split_once('/') {
        let num: f64 = num.parse().ok()?;
        let den: f64 = den.parse().ok()?;
        return (den != 0.0).then(|| num / den);
    }
    rate_str.parse().ok()
}
