//! Variant configuration model.
//!
//! Clients upload a source file together with a list of named variant
//! configurations. This module holds those configurations, the enums they
//! are built from, and the request-level validation and file pairing rules.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Error, Result};

/// Longest accepted tag.
pub const MAX_TAG_LEN: usize = 255;

/// Largest accepted target dimension on either axis.
pub const MAX_DIMENSION: u32 = 16_384;

/// Default audio sample rate when a video keeps its audio track.
pub const DEFAULT_AUDIO_SAMPLE_RATE: u32 = 44_100;

fn identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-zA-Z0-9_\-]+$").expect("static pattern compiles"))
}

/// Whether `s` is a safe path identifier (`^[a-zA-Z0-9_-]+$`).
///
/// Tags and group ids are joined into blob file names, so anything outside
/// this alphabet is refused.
pub fn is_identifier(s: &str) -> bool {
    identifier_pattern().is_match(s)
}

// ---------------------------------------------------------------------------
// FitMode
// ---------------------------------------------------------------------------

/// How a source frame is mapped onto the target box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FitMode {
    Cover,
    Contain,
    Fill,
    #[default]
    Inside,
    Outside,
    /// Any unrecognized mode; geometry is left untouched.
    Passthrough,
}

impl FitMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cover => "cover",
            Self::Contain => "contain",
            Self::Fill => "fill",
            Self::Inside => "inside",
            Self::Outside => "outside",
            Self::Passthrough => "passthrough",
        }
    }
}

impl fmt::Display for FitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FitMode {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s {
            "cover" => Self::Cover,
            "contain" => Self::Contain,
            "fill" => Self::Fill,
            "inside" => Self::Inside,
            "outside" => Self::Outside,
            _ => Self::Passthrough,
        })
    }
}

impl Serialize for FitMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FitMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(s.parse().unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// ImageFormat
// ---------------------------------------------------------------------------

/// Output encodings available for image variants, keyed by MIME type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageFormat {
    #[serde(rename = "image/jpeg")]
    Jpeg,
    #[serde(rename = "image/png")]
    Png,
    #[serde(rename = "image/webp")]
    Webp,
    #[serde(rename = "image/avif")]
    Avif,
    #[serde(rename = "image/gif")]
    Gif,
}

impl ImageFormat {
    pub fn mime(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Webp => "image/webp",
            Self::Avif => "image/avif",
            Self::Gif => "image/gif",
        }
    }

    /// Formats that can carry more than one frame.
    pub fn supports_animation(&self) -> bool {
        matches!(self, Self::Gif | Self::Webp | Self::Avif)
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime())
    }
}

// ---------------------------------------------------------------------------
// VideoCodec
// ---------------------------------------------------------------------------

/// Output codecs available for video variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoCodec {
    Libx264,
    Libmpeg4,
    Aac,
    Libtheora,
    Libvpx,
}

/// Container written for a [`VideoCodec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VideoContainer {
    Mp4,
    Ogv,
    Webm,
}

impl VideoContainer {
    /// Muxer name understood by ffmpeg's `-f`.
    pub fn muxer(&self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Ogv => "ogg",
            Self::Webm => "webm",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Ogv => "ogv",
            Self::Webm => "webm",
        }
    }
}

impl VideoCodec {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Libx264 => "libx264",
            Self::Libmpeg4 => "libmpeg4",
            Self::Aac => "aac",
            Self::Libtheora => "libtheora",
            Self::Libvpx => "libvpx",
        }
    }

    pub fn container(&self) -> VideoContainer {
        match self {
            Self::Libx264 | Self::Libmpeg4 | Self::Aac => VideoContainer::Mp4,
            Self::Libtheora => VideoContainer::Ogv,
            Self::Libvpx => VideoContainer::Webm,
        }
    }

    /// ffmpeg video encoder, or `None` for the audio-only `aac` output.
    pub fn video_encoder(&self) -> Option<&'static str> {
        match self {
            Self::Libx264 => Some("libx264"),
            Self::Libmpeg4 => Some("mpeg4"),
            Self::Aac => None,
            Self::Libtheora => Some("libtheora"),
            Self::Libvpx => Some("libvpx"),
        }
    }

    /// ffmpeg audio encoder paired with this codec's container.
    pub fn audio_encoder(&self) -> &'static str {
        match (self, self.container()) {
            (Self::Aac, _) => "aac",
            (_, VideoContainer::Ogv | VideoContainer::Webm) => "libvorbis",
            (_, VideoContainer::Mp4) => "libmp3lame",
        }
    }

    /// Only libx264 honours an explicit bitrate.
    pub fn honours_bitrate(&self) -> bool {
        matches!(self, Self::Libx264)
    }
}

impl fmt::Display for VideoCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Variant configs
// ---------------------------------------------------------------------------

fn default_quality() -> u8 {
    100
}

/// Configuration for one image variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageConfig {
    pub tag: String,
    pub width: u32,
    pub height: u32,
    #[serde(default = "default_quality")]
    pub quality: u8,
    pub content_type: ImageFormat,
    #[serde(default)]
    pub fit: FitMode,
}

/// Configuration for one video variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoConfig {
    pub tag: String,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub fit: FitMode,
    /// Trim start in seconds; negative counts back from the end.
    #[serde(default)]
    pub start: Option<f64>,
    /// Trim end in seconds; negative counts back from the end.
    #[serde(default)]
    pub end: Option<f64>,
    #[serde(default)]
    pub frame_rate: Option<u32>,
    pub codec: VideoCodec,
    /// Kilobits per second, honoured for libx264 only.
    #[serde(default)]
    pub bitrate: Option<u32>,
    #[serde(default)]
    pub mute: bool,
    #[serde(default)]
    pub audio_sample_rate: Option<u32>,
}

/// Common surface of image and video variant configs.
pub trait VariantConfig {
    fn tag(&self) -> &str;

    /// Field-level checks beyond what deserialization enforces.
    fn validate(&self) -> Result<()>;
}

fn validate_common(tag: &str, width: u32, height: u32) -> Result<()> {
    if tag.is_empty() || tag.len() > MAX_TAG_LEN {
        return Err(Error::Validation(format!(
            "tag must be 1-{MAX_TAG_LEN} characters, got {}",
            tag.len()
        )));
    }
    if !is_identifier(tag) {
        return Err(Error::Validation(format!(
            "tag '{tag}' must match ^[a-zA-Z0-9_-]+$"
        )));
    }
    if width == 0 || height == 0 {
        return Err(Error::Validation(format!(
            "[{tag}] width and height must be at least 1"
        )));
    }
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(Error::Validation(format!(
            "[{tag}] width and height must not exceed {MAX_DIMENSION}"
        )));
    }
    Ok(())
}

impl VariantConfig for ImageConfig {
    fn tag(&self) -> &str {
        &self.tag
    }

    fn validate(&self) -> Result<()> {
        validate_common(&self.tag, self.width, self.height)?;
        if self.quality > 100 {
            return Err(Error::Validation(format!(
                "[{}] quality must be within 0-100, got {}",
                self.tag, self.quality
            )));
        }
        Ok(())
    }
}

impl VariantConfig for VideoConfig {
    fn tag(&self) -> &str {
        &self.tag
    }

    fn validate(&self) -> Result<()> {
        validate_common(&self.tag, self.width, self.height)?;
        let positive = [
            ("frame_rate", self.frame_rate),
            ("bitrate", self.bitrate),
            ("audio_sample_rate", self.audio_sample_rate),
        ];
        for (field, value) in positive {
            if value == Some(0) {
                return Err(Error::Validation(format!(
                    "[{}] {field} must be at least 1",
                    self.tag
                )));
            }
        }
        for (field, value) in [("start", self.start), ("end", self.end)] {
            if value.is_some_and(|v| !v.is_finite()) {
                return Err(Error::Validation(format!(
                    "[{}] {field} must be a finite number",
                    self.tag
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Upload request
// ---------------------------------------------------------------------------

/// How uploaded files are paired with configs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadMode {
    /// One config per file, paired positionally.
    Single,
    /// Every config applies to every file.
    #[default]
    Batch,
}

impl UploadMode {
    /// Pair files with the configs that apply to them.
    ///
    /// `Single` requires exactly one config per file.
    pub fn pair<F, C: Clone>(&self, files: Vec<F>, configs: &[C]) -> Result<Vec<(F, Vec<C>)>> {
        match self {
            Self::Single => {
                if files.len() != configs.len() {
                    return Err(Error::Validation(format!(
                        "Number of files and configurations must be the same ({} files, {} configs)",
                        files.len(),
                        configs.len()
                    )));
                }
                Ok(files
                    .into_iter()
                    .zip(configs.iter().cloned())
                    .map(|(file, config)| (file, vec![config]))
                    .collect())
            }
            Self::Batch => Ok(files
                .into_iter()
                .map(|file| (file, configs.to_vec()))
                .collect()),
        }
    }
}

/// The JSON `data` field of an upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadRequest<C> {
    pub configs: Vec<C>,
    #[serde(default)]
    pub mode: UploadMode,
}

impl<C: VariantConfig + for<'de> Deserialize<'de>> UploadRequest<C> {
    /// Parse and validate the `data` field.
    pub fn from_json(json: &str) -> Result<Self> {
        let request: Self = serde_json::from_str(json)
            .map_err(|e| Error::Validation(format!("invalid upload data: {e}")))?;
        request.validate()?;
        Ok(request)
    }
}

impl<C: VariantConfig> UploadRequest<C> {
    /// Reject empty config lists, duplicate tags, and invalid fields.
    pub fn validate(&self) -> Result<()> {
        validate_configs(&self.configs)
    }
}

/// Shared config-list validation used before any processing starts.
pub fn validate_configs<C: VariantConfig>(configs: &[C]) -> Result<()> {
    if configs.is_empty() {
        return Err(Error::Validation("at least one configuration is required".into()));
    }
    let mut seen = HashSet::with_capacity(configs.len());
    for config in configs {
        config.validate()?;
        if !seen.insert(config.tag()) {
            return Err(Error::Validation(format!(
                "Duplicate tags are not allowed: {}",
                config.tag()
            )));
        }
    }
    Ok(())
}
