//! Video group and video variant operations.

use mc_core::{Error, GroupId, Result};
use rusqlite::{Connection, OptionalExtension};

use crate::models::{VideoGroup, VideoVariant};

const GROUP_COLS: &str = "id, filename, width, height, duration, frame_rate, mute, created_at";
const VARIANT_COLS: &str = "group_id, tag, size, width, height, start_secs, end_secs, duration, \
                            frame_rate, codec, bitrate, mute, audio_sample_rate";

/// Create a new video group record.
#[allow(clippy::too_many_arguments)]
pub fn create_video_group(
    conn: &Connection,
    id: GroupId,
    filename: &str,
    width: u32,
    height: u32,
    duration: f64,
    frame_rate: u32,
    mute: bool,
) -> Result<VideoGroup> {
    let created_at = chrono::Utc::now().to_rfc3339();

    conn.execute(
        "INSERT INTO medcord_video_groups (id, filename, width, height, duration, frame_rate, mute, created_at)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8)",
        rusqlite::params![
            id.to_string(),
            filename,
            width,
            height,
            duration,
            frame_rate,
            mute,
            created_at,
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(VideoGroup {
        id,
        filename: filename.to_string(),
        width,
        height,
        duration,
        frame_rate,
        mute,
        created_at,
    })
}

/// Get a video group by ID.
pub fn get_video_group(conn: &Connection, id: GroupId) -> Result<Option<VideoGroup>> {
    let q = format!("SELECT {GROUP_COLS} FROM medcord_video_groups WHERE id = ?1");
    conn.query_row(&q, [id.to_string()], VideoGroup::from_row)
        .optional()
        .map_err(|e| Error::database(e.to_string()))
}

/// Insert one video variant row.
pub fn insert_video_variant(conn: &Connection, variant: &VideoVariant) -> Result<()> {
    conn.execute(
        "INSERT INTO medcord_videos (group_id, tag, size, width, height, start_secs, end_secs,
                                     duration, frame_rate, codec, bitrate, mute, audio_sample_rate)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13)",
        rusqlite::params![
            variant.group_id.to_string(),
            variant.tag,
            variant.size as i64,
            variant.width,
            variant.height,
            variant.start,
            variant.end,
            variant.duration,
            variant.frame_rate,
            variant.codec.as_str(),
            variant.bitrate,
            variant.mute,
            variant.audio_sample_rate,
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;
    Ok(())
}

/// List variants for a group.
pub fn list_video_variants(conn: &Connection, group_id: GroupId) -> Result<Vec<VideoVariant>> {
    let q = format!("SELECT {VARIANT_COLS} FROM medcord_videos WHERE group_id = ?1 ORDER BY id");
    let mut stmt = conn.prepare(&q).map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([group_id.to_string()], VideoVariant::from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

/// List the tags stored for a group.
pub fn list_video_tags(conn: &Connection, group_id: GroupId) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare("SELECT tag FROM medcord_videos WHERE group_id = ?1 ORDER BY id")
        .map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([group_id.to_string()], |row| row.get(0))
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<String>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

/// Delete a video group; variant rows go with it.
pub fn delete_video_group(conn: &Connection, id: GroupId) -> Result<bool> {
    let n = conn
        .execute("DELETE FROM medcord_video_groups WHERE id = ?1", [id.to_string()])
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}
