//! Shared test harness for integration tests.
//!
//! [`TestHarness`] builds a full [`AppContext`] over an in-memory database,
//! a temporary media directory and a fake video backend, so no ffmpeg is
//! needed. [`TestHarness::with_server`] serves the router on a random port.

#![allow(dead_code)]

use std::io::Cursor;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use mc_codec::{VideoBackend, VideoJob, VideoSource};
use mc_core::config::Config;
use mc_core::{Error, Result};
use mc_db::pool::{init_memory_pool, DbPool};
use mc_ingest::Orchestrator;
use mc_server::context::AppContext;
use mc_server::router::build_router;
use tempfile::TempDir;

/// A fake video file must start with this to open.
pub const FAKE_VIDEO_MAGIC: &[u8] = b"FAKEVIDEO";

/// Header written before fake transcode output so the blob sniffs as mp4.
pub const FAKE_MP4_HEADER: &[u8] = b"\x00\x00\x00\x20ftypisom";

/// Backend that treats any [`FAKE_VIDEO_MAGIC`] file as a 10s 1920x1080
/// 30fps clip with audio and "transcodes" by writing the job summary.
pub struct FakeBackend;

#[async_trait]
impl VideoBackend for FakeBackend {
    async fn open(&self, path: &Path) -> Result<VideoSource> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| Error::Decode(e.to_string()))?;
        if !bytes.starts_with(FAKE_VIDEO_MAGIC) {
            return Err(Error::Decode("not a video".into()));
        }
        Ok(VideoSource {
            path: path.to_path_buf(),
            width: 1920,
            height: 1080,
            duration: 10.0,
            frame_rate: 30,
            has_audio: true,
        })
    }

    async fn transcode(&self, _source: &VideoSource, job: &VideoJob, output: &Path) -> Result<()> {
        let mut body = FAKE_MP4_HEADER.to_vec();
        body.extend_from_slice(format!("{}:{}-{}", job.tag, job.trim.start, job.trim.end).as_bytes());
        tokio::fs::write(output, body).await?;
        Ok(())
    }
}

pub struct TestHarness {
    pub ctx: AppContext,
    pub db: DbPool,
    _dir: TempDir,
}

impl TestHarness {
    /// Harness with auth disabled.
    pub async fn new() -> Self {
        Self::with_password(None).await
    }

    pub async fn with_password(password: Option<&str>) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let mut config = Config::default();
        config.storage.media_dir = dir.path().join("media");
        config.storage.temp_dir = Some(dir.path().join("tmp"));
        config.auth.password = password.map(String::from);
        config.processing.image_workers = 4;
        config.processing.video_workers = 2;

        let db = init_memory_pool().expect("failed to create in-memory pool");
        let orchestrator = Orchestrator::from_config(db.clone(), &config, Arc::new(FakeBackend));
        orchestrator.prepare().await.expect("failed to prepare media dirs");

        Self {
            ctx: AppContext::new(Arc::new(config), orchestrator),
            db,
            _dir: dir,
        }
    }

    /// Start an Axum server on a random port and return the harness together
    /// with the bound socket address.
    pub async fn with_server(password: Option<&str>) -> (Self, SocketAddr) {
        let harness = Self::with_password(password).await;
        let app = build_router(harness.ctx.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        (harness, addr)
    }

    pub fn conn(&self) -> mc_db::pool::PooledConnection {
        mc_db::pool::get_conn(&self.db).expect("failed to get db connection")
    }

    pub fn count(&self, table: &str) -> i64 {
        self.conn()
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))
            .expect("count query failed")
    }

    pub fn temp_dir(&self) -> &Path {
        self.ctx.orchestrator.temp_dir()
    }
}

/// Encode a solid-colour PNG of the given size.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba([200, 40, 90, 255]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .expect("png encode");
    buf
}

pub fn fake_video_bytes() -> Vec<u8> {
    let mut data = FAKE_VIDEO_MAGIC.to_vec();
    data.extend_from_slice(&[0u8; 256]);
    data
}

/// Multipart form with a `data` field and one file part per entry.
pub fn upload_form(field: &str, data: &str, files: Vec<(&str, &str, Vec<u8>)>) -> reqwest::multipart::Form {
    files.into_iter().fold(
        reqwest::multipart::Form::new().text("data", data.to_string()),
        |form, (name, mime, bytes)| {
            let part = reqwest::multipart::Part::bytes(bytes)
                .file_name(name.to_string())
                .mime_str(mime)
                .expect("valid mime");
            form.part(field.to_string(), part)
        },
    )
}
