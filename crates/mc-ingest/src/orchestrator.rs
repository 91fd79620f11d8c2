//! The orchestrator and its shared plumbing.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use mc_codec::VideoBackend;
use mc_core::config::Config;
use mc_core::{Error, GroupId, Result};
use mc_db::pool::DbPool;
use mc_db::session::{VariantRow, WriteSession};
use tokio::task::JoinSet;

use crate::pool::WorkerPools;
use crate::store::AssetStore;

/// A group whose variants were all produced and committed.
#[derive(Debug, Clone)]
pub struct ProcessedGroup<V> {
    pub id: GroupId,
    pub variants: Vec<V>,
}

/// Drives uploads from decoded source to committed variant rows.
///
/// Cheap to clone; every field is shared.
#[derive(Clone)]
pub struct Orchestrator {
    pub(crate) db: DbPool,
    pub(crate) pools: Arc<WorkerPools>,
    pub(crate) images: AssetStore,
    pub(crate) videos: AssetStore,
    pub(crate) video_backend: Arc<dyn VideoBackend>,
    pub(crate) temp_dir: PathBuf,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("pools", &self.pools)
            .field("images", &self.images)
            .field("videos", &self.videos)
            .field("temp_dir", &self.temp_dir)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    pub fn new(
        db: DbPool,
        pools: Arc<WorkerPools>,
        images: AssetStore,
        videos: AssetStore,
        video_backend: Arc<dyn VideoBackend>,
        temp_dir: PathBuf,
    ) -> Self {
        Self {
            db,
            pools,
            images,
            videos,
            video_backend,
            temp_dir,
        }
    }

    /// Wire everything from application config.
    pub fn from_config(db: DbPool, config: &Config, video_backend: Arc<dyn VideoBackend>) -> Self {
        Self::new(
            db,
            Arc::new(WorkerPools::from_config(&config.processing)),
            AssetStore::new(config.storage.image_dir()),
            AssetStore::new(config.storage.video_dir()),
            video_backend,
            config.storage.temp_dir(),
        )
    }

    /// Create the blob and temp directories.
    pub async fn prepare(&self) -> Result<()> {
        self.images.ensure_root().await?;
        self.videos.ensure_root().await?;
        tokio::fs::create_dir_all(&self.temp_dir).await?;
        Ok(())
    }

    pub fn db(&self) -> &DbPool {
        &self.db
    }

    pub fn pools(&self) -> &WorkerPools {
        &self.pools
    }

    pub fn image_store(&self) -> &AssetStore {
        &self.images
    }

    pub fn video_store(&self) -> &AssetStore {
        &self.videos
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }
}

/// Run one asset's flow on its own task and wait for it.
///
/// Dropping the returned future does not stop the flow, so a caller that
/// goes away cannot strand stored blobs without their committed rows.
pub(crate) async fn detached<T, F>(flow: F) -> Result<T>
where
    F: Future<Output = Result<T>> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(flow)
        .await
        .map_err(|e| Error::Internal(format!("asset task failed: {e}")))?
}

/// Store variants in the order they finish, then commit them together.
///
/// `persist` writes one rendered variant's bytes and returns its tag and
/// row. After the first failure the remaining variants are drained but not
/// stored, and every blob already written for the group is removed.
pub(crate) async fn persist_completed<T, R, S, Fut>(
    store: &AssetStore,
    mut session: WriteSession<R>,
    mut tasks: JoinSet<Result<T>>,
    mut persist: S,
) -> Result<Vec<R>>
where
    T: Send + 'static,
    R: VariantRow,
    S: FnMut(GroupId, T) -> Fut,
    Fut: Future<Output = Result<(String, R)>>,
{
    let group_id = session.group_id();
    let mut written: Vec<String> = Vec::new();
    let mut failure: Option<Error> = None;

    while let Some(joined) = tasks.join_next().await {
        let rendered = joined
            .map_err(|e| Error::Internal(format!("variant task failed: {e}")))
            .and_then(|r| r);
        if failure.is_some() {
            continue;
        }
        let stored = match rendered {
            Ok(r) => match persist(group_id, r).await {
                Ok((tag, row)) => {
                    written.push(tag);
                    session.append(row)
                }
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        };
        if let Err(e) = stored {
            failure = Some(e);
        }
    }

    let committed = match failure {
        Some(e) => Err(e),
        None => session.commit(),
    };
    if committed.is_err() {
        discard_written(store, group_id, &written).await;
    }
    committed
}

/// Remove blobs written for an asset that will not be committed.
async fn discard_written(store: &AssetStore, group: GroupId, written: &[String]) {
    if written.is_empty() {
        return;
    }
    let removed = store.remove(group, written).await;
    if removed != written.len() {
        tracing::warn!(
            group_id = %group,
            expected = written.len(),
            removed,
            "Some blobs of a failed asset could not be removed"
        );
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use mc_codec::{VideoJob, VideoSource};
    use mc_core::Error;

    use crate::image::ImageUpload;

    /// Marker a fake video file must start with to be "decodable".
    pub const FAKE_VIDEO_MAGIC: &[u8] = b"FAKEVIDEO";

    /// How long a `slow` tag takes to transcode.
    pub const SLOW_TRANSCODE: std::time::Duration = std::time::Duration::from_millis(400);

    /// Video backend that needs no ffmpeg: any file starting with
    /// [`FAKE_VIDEO_MAGIC`] is a 10s 1920x1080 30fps clip with audio.
    /// Tags starting with `fail` fail to transcode and tags starting with
    /// `slow` take [`SLOW_TRANSCODE`].
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
            if job.tag.starts_with("fail") {
                return Err(Error::transform(&job.tag, "encoder exploded"));
            }
            if job.tag.starts_with("slow") {
                tokio::time::sleep(SLOW_TRANSCODE).await;
            }
            let body = format!("{}:{}-{}", job.tag, job.trim.start, job.trim.end);
            tokio::fs::write(output, body).await?;
            Ok(())
        }
    }

    pub struct Harness {
        pub _dir: tempfile::TempDir,
        pub orchestrator: Orchestrator,
    }

    pub fn harness() -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let images = AssetStore::new(dir.path().join("images"));
        let videos = AssetStore::new(dir.path().join("videos"));
        std::fs::create_dir_all(images.root()).unwrap();
        std::fs::create_dir_all(videos.root()).unwrap();
        let orchestrator = Orchestrator::new(
            mc_db::pool::init_memory_pool().unwrap(),
            Arc::new(WorkerPools::new(4, 2)),
            images,
            videos,
            Arc::new(FakeBackend),
            dir.path().join("tmp"),
        );
        std::fs::create_dir_all(orchestrator.temp_dir()).unwrap();
        Harness {
            _dir: dir,
            orchestrator,
        }
    }

    pub fn png_upload(width: u32, height: u32) -> ImageUpload {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([10, 200, 30, 255]));
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        ImageUpload {
            filename: "photo.png".into(),
            content_type: "image/png".into(),
            bytes: Bytes::from(buf),
        }
    }

    /// An animated GIF with one solid 8x8 frame per colour.
    pub fn gif_upload(colors: &[[u8; 3]]) -> ImageUpload {
        use image::codecs::gif::{GifEncoder, Repeat};
        use image::{Delay, Frame, Rgba, RgbaImage};

        let mut buf = Vec::new();
        {
            let mut encoder = GifEncoder::new(&mut buf);
            encoder.set_repeat(Repeat::Infinite).unwrap();
            for [r, g, b] in colors {
                let img = RgbaImage::from_pixel(8, 8, Rgba([*r, *g, *b, 255]));
                encoder
                    .encode_frame(Frame::from_parts(img, 0, 0, Delay::from_numer_denom_ms(100, 1)))
                    .unwrap();
            }
        }
        ImageUpload {
            filename: "anim.gif".into(),
            content_type: "image/gif".into(),
            bytes: Bytes::from(buf),
        }
    }

    pub fn fake_video(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        let mut data = FAKE_VIDEO_MAGIC.to_vec();
        data.extend_from_slice(&[0u8; 64]);
        std::fs::write(&path, data).unwrap();
        path
    }
}

#[cfg(test)]
mod tests {
    use super::testing::harness;
    use super::*;
    use mc_db::models::ImageVariant;
    use mc_db::pool::get_conn;
    use mc_db::queries::images::create_image_group;

    fn row(group_id: GroupId, tag: &str) -> ImageVariant {
        ImageVariant {
            group_id,
            tag: tag.into(),
            size: 3,
            width: 1,
            height: 1,
            quality: 90,
            content_type: mc_core::ImageFormat::Png,
        }
    }

    fn group(h: &testing::Harness) -> GroupId {
        let id = GroupId::new();
        let conn = get_conn(h.orchestrator.db()).unwrap();
        create_image_group(&conn, id, "x.png", 1, 1, "image/png").unwrap();
        id
    }

    #[tokio::test]
    async fn stores_in_completion_order() {
        let h = harness();
        let id = group(&h);
        let mut tasks: JoinSet<Result<&'static str>> = JoinSet::new();
        tasks.spawn(async {
            tokio::time::sleep(std::time::Duration::from_millis(150)).await;
            Ok("late")
        });
        tasks.spawn(async { Ok("early") });

        let store = h.orchestrator.image_store().clone();
        let rows = persist_completed(
            h.orchestrator.image_store(),
            WriteSession::new(h.orchestrator.db().clone(), id),
            tasks,
            |group_id, tag: &'static str| {
                let store = store.clone();
                async move {
                    store
                        .write(group_id, tag, b"abc")
                        .await
                        .map(|_| (tag.to_string(), row(group_id, tag)))
                }
            },
        )
        .await
        .unwrap();

        let order: Vec<&str> = rows.iter().map(|r| r.tag.as_str()).collect();
        assert_eq!(order, vec!["early", "late"]);
    }

    #[tokio::test]
    async fn failure_discards_stored_siblings() {
        let h = harness();
        let id = group(&h);
        let mut tasks: JoinSet<Result<&'static str>> = JoinSet::new();
        tasks.spawn(async { Ok("first") });
        tasks.spawn(async {
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            Err(Error::transform("second", "boom"))
        });

        let store = h.orchestrator.image_store().clone();
        let err = persist_completed(
            h.orchestrator.image_store(),
            WriteSession::new(h.orchestrator.db().clone(), id),
            tasks,
            |group_id, tag: &'static str| {
                let store = store.clone();
                async move {
                    store
                        .write(group_id, tag, b"abc")
                        .await
                        .map(|_| (tag.to_string(), row(group_id, tag)))
                }
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Transform { ref tag, .. } if tag == "second"));

        assert!(!h.orchestrator.image_store().blob_path(id, "first").exists());
        let conn = get_conn(h.orchestrator.db()).unwrap();
        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM medcord_images", [], |r| r.get(0))
            .unwrap();
        assert_eq!(rows, 0);
    }

    #[tokio::test]
    async fn detached_flow_outlives_its_caller() {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let waiting = detached(async move {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            let _ = tx.send(());
            Ok(())
        });
        let dropped = tokio::time::timeout(std::time::Duration::from_millis(5), waiting).await;
        assert!(dropped.is_err());
        rx.await.expect("flow finished after its caller was dropped");
    }
}
