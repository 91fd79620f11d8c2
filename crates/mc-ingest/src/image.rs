//! Image assets: decode once, render every variant, commit together.

use std::sync::Arc;

use bytes::Bytes;
use futures::future::join_all;
use mc_codec::image::{self as codec, DecodedImage, SourceFrame};
use mc_core::{validate_configs, GroupId, ImageConfig, Result};
use mc_db::models::ImageVariant;
use mc_db::pool::get_conn;
use mc_db::queries::images as queries;
use mc_db::session::WriteSession;
use mc_media::{plan_image, Dimensions};
use tokio::task::JoinSet;

use crate::orchestrator::{detached, persist_completed, Orchestrator, ProcessedGroup};
use crate::pool::WorkerPools;

/// One uploaded image file.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: String,
    /// Content type claimed by the client; recorded, never trusted.
    pub content_type: String,
    pub bytes: Bytes,
}

struct RenderedImage {
    config: ImageConfig,
    output: Dimensions,
    bytes: Vec<u8>,
}

impl Orchestrator {
    /// Produce every variant in `configs` from one uploaded image.
    ///
    /// Fails with [`mc_core::Error::Decode`] before any group exists when the bytes
    /// are not a readable image. If a variant fails, the group row remains
    /// but none of its variants are recorded and no blobs are left behind.
    /// The work runs on its own task; dropping the returned future does
    /// not cancel it.
    pub async fn process_image(
        &self,
        upload: ImageUpload,
        configs: Vec<ImageConfig>,
    ) -> Result<ProcessedGroup<ImageVariant>> {
        let this = self.clone();
        detached(async move { this.run_image(upload, configs).await }).await
    }

    async fn run_image(
        self,
        upload: ImageUpload,
        configs: Vec<ImageConfig>,
    ) -> Result<ProcessedGroup<ImageVariant>> {
        validate_configs(&configs)?;

        let bytes = upload.bytes;
        let decoded = Arc::new(
            self.pools
                .image
                .run_blocking(move || codec::decode(&bytes))
                .await?,
        );

        let group_id = GroupId::new();
        {
            let conn = get_conn(&self.db)?;
            queries::create_image_group(
                &conn,
                group_id,
                &upload.filename,
                decoded.width,
                decoded.height,
                &upload.content_type,
            )?;
        }
        tracing::info!(
            group_id = %group_id,
            filename = %upload.filename,
            frames = decoded.frames.len(),
            variants = configs.len(),
            "Created image group"
        );

        let mut tasks = JoinSet::new();
        for config in configs {
            tasks.spawn(render_image(self.pools.clone(), decoded.clone(), config));
        }

        let variants = persist_completed(
            &self.images,
            WriteSession::new(self.db.clone(), group_id),
            tasks,
            |group_id, rendered| self.store_image(group_id, rendered),
        )
        .await?;
        Ok(ProcessedGroup {
            id: group_id,
            variants,
        })
    }

    async fn store_image(
        &self,
        group_id: GroupId,
        rendered: RenderedImage,
    ) -> Result<(String, ImageVariant)> {
        let RenderedImage {
            config,
            output,
            bytes,
        } = rendered;

        let size = self.images.write(group_id, &config.tag, &bytes).await?;
        tracing::debug!(group_id = %group_id, tag = %config.tag, size, "Stored image variant");

        let row = ImageVariant {
            group_id,
            tag: config.tag.clone(),
            size,
            width: output.width,
            height: output.height,
            quality: config.quality,
            content_type: config.content_type,
        };
        Ok((config.tag, row))
    }

    /// Delete an image group and its blobs. Returns `false` if the group
    /// has no variants.
    pub async fn remove_image_group(&self, group_id: GroupId) -> Result<bool> {
        let tags = {
            let conn = get_conn(&self.db)?;
            let tags = queries::list_image_tags(&conn, group_id)?;
            if tags.is_empty() {
                return Ok(false);
            }
            queries::delete_image_group(&conn, group_id)?;
            tags
        };
        let removed = self.images.remove(group_id, &tags).await;
        tracing::info!(group_id = %group_id, variants = tags.len(), removed, "Removed image group");
        Ok(true)
    }
}

/// Transform the frames the target format keeps, in parallel, then encode.
async fn render_image(
    pools: Arc<WorkerPools>,
    decoded: Arc<DecodedImage>,
    config: ImageConfig,
) -> Result<RenderedImage> {
    let plan = plan_image(
        decoded.dimensions(),
        Dimensions::new(config.width, config.height),
        config.fit,
    );

    let count = if codec::keeps_all_frames(config.content_type) {
        decoded.frames.len()
    } else {
        1
    };

    // join_all keeps frame order regardless of completion order.
    let frames = join_all((0..count).map(|i| {
        let decoded = decoded.clone();
        pools.image.run_blocking(move || {
            let frame = &decoded.frames[i];
            Ok(SourceFrame {
                image: codec::transform_frame(&frame.image, &plan),
                delay: frame.delay,
            })
        })
    }))
    .await
    .into_iter()
    .collect::<Result<Vec<_>>>()?;

    let encode_config = config.clone();
    let bytes = pools
        .image
        .run_blocking(move || codec::encode(&frames, &encode_config))
        .await?;

    Ok(RenderedImage {
        config,
        output: plan.output,
        bytes,
    })
}
