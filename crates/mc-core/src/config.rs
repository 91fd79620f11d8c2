//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from JSON and carries all
//! sub-configs for server, auth, storage, processing, and tools. Every section
//! defaults sensibly so a completely empty `{}` file is valid. Environment
//! variables are applied on top via [`Config::apply_env`].

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::Error;

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    pub processing: ProcessingConfig,
    pub tools: ToolsConfig,
}

impl Config {
    /// Deserialize a `Config` from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None` or the file does not exist.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse config file {}: {e}", path.display());
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Overlay values from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Overlay values from an arbitrary lookup, so tests need not touch the
    /// real environment.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("MEDIA_PATH") {
            self.storage.media_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("TEMPORARY_PATH") {
            self.storage.temp_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("DATABASE_PATH") {
            self.server.db_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("PASSWORD") {
            self.auth.password = if v.is_empty() { None } else { Some(v) };
        }
        if let Some(v) = lookup("HOST") {
            self.server.host = v;
        }
        parse_into(&lookup, "PORT", &mut self.server.port);
        parse_into(&lookup, "IMAGE_PROCESSING_THREAD", &mut self.processing.image_workers);
        parse_into(&lookup, "VIDEO_PROCESSING_THREAD", &mut self.processing.video_workers);
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.server.port == 0 {
            warnings.push("server.port is 0; a random port will be assigned".into());
        }

        if self.auth.password.is_none() {
            warnings.push("auth.password is not set; uploads are unauthenticated".into());
        }

        if self.processing.image_workers == 0 {
            warnings.push("processing.image_workers is 0; using 1".into());
        }
        if self.processing.video_workers == 0 {
            warnings.push("processing.video_workers is 0; using 1".into());
        }

        if self.storage.temp_dir.as_deref() == Some(self.storage.media_dir.as_path()) {
            warnings.push("storage.temp_dir equals storage.media_dir".into());
        }

        warnings
    }
}

fn parse_into<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    target: &mut T,
) {
    if let Some(raw) = lookup(key) {
        match raw.trim().parse() {
            Ok(v) => *target = v,
            Err(_) => tracing::warn!("Ignoring {key}={raw}: not a valid value"),
        }
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    /// Upper bound on a single request body, in megabytes.
    pub max_upload_mb: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3000,
            db_path: PathBuf::from("medcord.db"),
            max_upload_mb: 512,
        }
    }
}

/// Authentication settings. An unset password disables the upload check.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub password: Option<String>,
}

/// Where blobs and temporary uploads live.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub media_dir: PathBuf,
    pub temp_dir: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            media_dir: PathBuf::from("media"),
            temp_dir: None,
        }
    }
}

impl StorageConfig {
    pub fn image_dir(&self) -> PathBuf {
        self.media_dir.join("images")
    }

    pub fn video_dir(&self) -> PathBuf {
        self.media_dir.join("videos")
    }

    /// Directory for in-flight uploads, defaulting to the system temp dir.
    pub fn temp_dir(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

/// Worker pool sizing and tool limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    pub image_workers: usize,
    pub video_workers: usize,
    /// Per-invocation limit for ffmpeg/ffprobe.
    pub tool_timeout_secs: u64,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            image_workers: 8,
            video_workers: 2,
            tool_timeout_secs: 3600,
        }
    }
}

/// Paths to external CLI tools.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg_path: Option<PathBuf>,
    pub ffprobe_path: Option<PathBuf>,
}
