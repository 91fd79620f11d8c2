//! Video assets: open once, transcode every variant, commit together.

use std::path::PathBuf;
use std::sync::Arc;

use mc_codec::{VideoBackend, VideoJob, VideoSource};
use mc_core::{validate_configs, GroupId, Result, VideoConfig};
use mc_db::models::VideoVariant;
use mc_db::pool::get_conn;
use mc_db::queries::videos as queries;
use mc_db::session::WriteSession;
use tempfile::TempPath;
use tokio::task::JoinSet;

use crate::orchestrator::{detached, persist_completed, Orchestrator, ProcessedGroup};
use crate::pool::WorkerPools;

/// One uploaded video, already on disk.
#[derive(Debug)]
pub struct VideoUpload {
    pub filename: String,
    pub path: PathBuf,
    /// Set when the file was spooled for this upload; deleted on drop.
    spool: Option<TempPath>,
}

impl VideoUpload {
    /// A video at `path` that outlives the upload.
    pub fn new(filename: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            filename: filename.into(),
            path: path.into(),
            spool: None,
        }
    }

    /// A spooled video whose file is deleted once processing is done with it.
    pub fn spooled(filename: impl Into<String>, spool: TempPath) -> Self {
        Self {
            filename: filename.into(),
            path: spool.to_path_buf(),
            spool: Some(spool),
        }
    }

    pub fn is_spooled(&self) -> bool {
        self.spool.is_some()
    }
}

struct RenderedVideo {
    job: VideoJob,
    path: PathBuf,
}

impl Orchestrator {
    /// Produce every variant in `configs` from one uploaded video.
    ///
    /// Same failure and cancellation contract as
    /// [`Orchestrator::process_image`]. A spooled source file is deleted
    /// when processing finishes; any other source is left in place.
    pub async fn process_video(
        &self,
        upload: VideoUpload,
        configs: Vec<VideoConfig>,
    ) -> Result<ProcessedGroup<VideoVariant>> {
        let this = self.clone();
        detached(async move { this.run_video(upload, configs).await }).await
    }

    async fn run_video(
        self,
        upload: VideoUpload,
        configs: Vec<VideoConfig>,
    ) -> Result<ProcessedGroup<VideoVariant>> {
        validate_configs(&configs)?;

        let source = Arc::new(
            self.pools
                .video
                .run(self.video_backend.open(&upload.path))
                .await?,
        );

        let group_id = GroupId::new();
        {
            let conn = get_conn(&self.db)?;
            queries::create_video_group(
                &conn,
                group_id,
                &upload.filename,
                source.width,
                source.height,
                source.duration,
                source.frame_rate,
                !source.has_audio,
            )?;
        }
        tracing::info!(
            group_id = %group_id,
            filename = %upload.filename,
            duration = source.duration,
            variants = configs.len(),
            "Created video group"
        );

        // Encoded outputs land here before being moved into the store.
        let workdir = tempfile::Builder::new()
            .prefix("medcord-")
            .tempdir_in(&self.temp_dir)?;

        let mut tasks = JoinSet::new();
        for config in configs {
            let output = workdir.path().join(format!(
                "{}.{}",
                config.tag,
                config.codec.container().extension()
            ));
            tasks.spawn(render_video(
                self.pools.clone(),
                self.video_backend.clone(),
                source.clone(),
                config,
                output,
            ));
        }

        let variants = persist_completed(
            &self.videos,
            WriteSession::new(self.db.clone(), group_id),
            tasks,
            |group_id, rendered| self.store_video(group_id, rendered),
        )
        .await?;
        Ok(ProcessedGroup {
            id: group_id,
            variants,
        })
    }

    async fn store_video(
        &self,
        group_id: GroupId,
        rendered: RenderedVideo,
    ) -> Result<(String, VideoVariant)> {
        let RenderedVideo { job, path } = rendered;

        let size = self.videos.persist_file(group_id, &job.tag, &path).await?;
        tracing::debug!(group_id = %group_id, tag = %job.tag, size, "Stored video variant");

        let output = job.output();
        let row = VideoVariant {
            group_id,
            tag: job.tag.clone(),
            size,
            width: output.width,
            height: output.height,
            start: job.trim.start,
            end: job.trim.end,
            duration: job.trim.duration(),
            frame_rate: job.frame_rate,
            codec: job.codec,
            bitrate: job.bitrate,
            mute: job.audio_sample_rate.is_none(),
            audio_sample_rate: job.audio_sample_rate,
        };
        Ok((job.tag, row))
    }

    /// Delete a video group and its blobs. Returns `false` if the group
    /// has no variants.
    pub async fn remove_video_group(&self, group_id: GroupId) -> Result<bool> {
        let tags = {
            let conn = get_conn(&self.db)?;
            let tags = queries::list_video_tags(&conn, group_id)?;
            if tags.is_empty() {
                return Ok(false);
            }
            queries::delete_video_group(&conn, group_id)?;
            tags
        };
        let removed = self.videos.remove(group_id, &tags).await;
        tracing::info!(group_id = %group_id, variants = tags.len(), removed, "Removed video group");
        Ok(true)
    }
}

async fn render_video(
    pools: Arc<WorkerPools>,
    backend: Arc<dyn VideoBackend>,
    source: Arc<VideoSource>,
    config: VideoConfig,
    output: PathBuf,
) -> Result<RenderedVideo> {
    let job = VideoJob::plan(&source, &config)?;
    pools
        .video
        .run(backend.transcode(&source, &job, &output))
        .await?;
    Ok(RenderedVideo { job, path: output })
}
