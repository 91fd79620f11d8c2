//! Multi-asset uploads with per-asset failure isolation.

use futures::future::join_all;
use mc_core::{Error, GroupId, ImageConfig, Result, UploadRequest, VideoConfig};
use mc_db::models::{ImageVariant, VideoVariant};
use serde::Serialize;

use crate::image::ImageUpload;
use crate::orchestrator::{Orchestrator, ProcessedGroup};
use crate::video::VideoUpload;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupStatus {
    Success,
    Error,
}

/// Result of one asset in a batch.
///
/// A failed asset gets a fresh id that matches no stored group and no
/// variants.
#[derive(Debug, Clone)]
pub struct GroupOutcome<V> {
    pub status: GroupStatus,
    pub id: GroupId,
    pub variants: Vec<V>,
    pub error: Option<String>,
}

impl<V> GroupOutcome<V> {
    fn from_result(result: Result<ProcessedGroup<V>>, filename: &str) -> Self {
        match result {
            Ok(group) => Self {
                status: GroupStatus::Success,
                id: group.id,
                variants: group.variants,
                error: None,
            },
            Err(e) => {
                tracing::warn!(filename, error = %e, "Asset failed");
                Self {
                    status: GroupStatus::Error,
                    id: GroupId::new(),
                    variants: Vec::new(),
                    error: Some(e.to_string()),
                }
            }
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == GroupStatus::Success
    }
}

fn require_files<T>(files: &[T]) -> Result<()> {
    if files.is_empty() {
        return Err(Error::Validation("at least one file is required".into()));
    }
    Ok(())
}

impl Orchestrator {
    /// Process every uploaded image concurrently.
    ///
    /// Request-level problems (bad configs, single-mode count mismatch)
    /// fail the whole call before anything is processed. After that, each
    /// asset succeeds or fails on its own; outcomes keep request order.
    pub async fn ingest_images(
        &self,
        uploads: Vec<ImageUpload>,
        request: &UploadRequest<ImageConfig>,
    ) -> Result<Vec<GroupOutcome<ImageVariant>>> {
        require_files(&uploads)?;
        request.validate()?;
        let pairs = request.mode.pair(uploads, &request.configs)?;

        Ok(join_all(pairs.into_iter().map(|(upload, configs)| async move {
            let filename = upload.filename.clone();
            GroupOutcome::from_result(self.process_image(upload, configs).await, &filename)
        }))
        .await)
    }

    /// Process every uploaded video concurrently. Same contract as
    /// [`Orchestrator::ingest_images`].
    pub async fn ingest_videos(
        &self,
        uploads: Vec<VideoUpload>,
        request: &UploadRequest<VideoConfig>,
    ) -> Result<Vec<GroupOutcome<VideoVariant>>> {
        require_files(&uploads)?;
        request.validate()?;
        let pairs = request.mode.pair(uploads, &request.configs)?;

        Ok(join_all(pairs.into_iter().map(|(upload, configs)| async move {
            let filename = upload.filename.clone();
            GroupOutcome::from_result(self.process_video(upload, configs).await, &filename)
        }))
        .await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::testing::{fake_video, harness, png_upload};
    use bytes::Bytes;
    use mc_core::UploadMode;
    use mc_db::pool::get_conn;

    fn image_request(mode: &str, tags: &[&str]) -> UploadRequest<ImageConfig> {
        let configs: Vec<String> = tags
            .iter()
            .map(|t| {
                format!(r#"{{"tag":"{t}","width":16,"height":16,"content_type":"image/png"}}"#)
            })
            .collect();
        UploadRequest::from_json(&format!(
            r#"{{"mode":"{mode}","configs":[{}]}}"#,
            configs.join(",")
        ))
        .unwrap()
    }

    fn corrupt_upload() -> ImageUpload {
        ImageUpload {
            filename: "corrupt.png".into(),
            content_type: "image/png".into(),
            bytes: Bytes::from_static(b"\x89PNG\r\n\x1a\ntruncated"),
        }
    }

    #[tokio::test]
    async fn one_corrupt_asset_does_not_sink_the_batch() {
        let h = harness();
        let request = image_request("batch", &["thumb", "icon"]);
        let outcomes = h
            .orchestrator
            .ingest_images(
                vec![png_upload(64, 48), corrupt_upload(), png_upload(32, 32)],
                &request,
            )
            .await
            .unwrap();

        let statuses: Vec<GroupStatus> = outcomes.iter().map(|o| o.status).collect();
        assert_eq!(
            statuses,
            vec![GroupStatus::Success, GroupStatus::Error, GroupStatus::Success]
        );
        assert!(outcomes[1].variants.is_empty());
        assert!(outcomes[1].error.is_some());
        assert_eq!(outcomes[0].variants.len(), 2);

        let conn = get_conn(h.orchestrator.db()).unwrap();
        let groups: i64 = conn
            .query_row("SELECT COUNT(*) FROM medcord_image_groups", [], |r| r.get(0))
            .unwrap();
        assert_eq!(groups, 2);
        let failed: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM medcord_image_groups WHERE id = ?1",
                [outcomes[1].id.to_string()],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(failed, 0);
    }

    #[tokio::test]
    async fn single_mode_pairs_positionally() {
        let h = harness();
        let request = image_request("single", &["first", "second"]);
        assert_eq!(request.mode, UploadMode::Single);
        let outcomes = h
            .orchestrator
            .ingest_images(vec![png_upload(20, 20), png_upload(30, 30)], &request)
            .await
            .unwrap();
        assert_eq!(outcomes[0].variants[0].tag, "first");
        assert_eq!(outcomes[1].variants[0].tag, "second");
    }

    #[tokio::test]
    async fn single_mode_count_mismatch_fails_whole_request() {
        let h = harness();
        let request = image_request("single", &["a", "b"]);
        let err = h
            .orchestrator
            .ingest_images(vec![png_upload(20, 20)], &request)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let conn = get_conn(h.orchestrator.db()).unwrap();
        let groups: i64 = conn
            .query_row("SELECT COUNT(*) FROM medcord_image_groups", [], |r| r.get(0))
            .unwrap();
        assert_eq!(groups, 0);
    }

    #[tokio::test]
    async fn no_files_is_a_validation_error() {
        let h = harness();
        let err = h
            .orchestrator
            .ingest_images(Vec::new(), &image_request("batch", &["a"]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn video_batch_isolates_failures() {
        let h = harness();
        let request: UploadRequest<VideoConfig> = UploadRequest::from_json(
            r#"{"configs":[{"tag":"sd","width":320,"height":240,"codec":"libvpx"}]}"#,
        )
        .unwrap();
        let junk = h.orchestrator.temp_dir().join("junk.bin");
        std::fs::write(&junk, b"nope").unwrap();

        let uploads = vec![
            VideoUpload::new("a.mp4", fake_video(h.orchestrator.temp_dir(), "a.bin")),
            VideoUpload::new("junk.mp4", junk),
        ];
        let outcomes = h.orchestrator.ingest_videos(uploads, &request).await.unwrap();
        assert!(outcomes[0].is_success());
        assert!(!outcomes[1].is_success());
        assert_eq!(outcomes[0].variants[0].codec, mc_core::VideoCodec::Libvpx);
    }
}
