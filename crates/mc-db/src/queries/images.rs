//! Image group and image variant operations.

use mc_core::{Error, GroupId, Result};
use rusqlite::{Connection, OptionalExtension};

use crate::models::{ImageGroup, ImageVariant};

const GROUP_COLS: &str = "id, filename, width, height, content_type, created_at";
const VARIANT_COLS: &str = "group_id, tag, size, width, height, quality, content_type";

/// Create a new image group record.
pub fn create_image_group(
    conn: &Connection,
    id: GroupId,
    filename: &str,
    width: u32,
    height: u32,
    content_type: &str,
) -> Result<ImageGroup> {
    let created_at = chrono::Utc::now().to_rfc3339();

    conn.execute(
        "INSERT INTO medcord_image_groups (id, filename, width, height, content_type, created_at)
         VALUES (?1,?2,?3,?4,?5,?6)",
        rusqlite::params![id.to_string(), filename, width, height, content_type, created_at],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(ImageGroup {
        id,
        filename: filename.to_string(),
        width,
        height,
        content_type: content_type.to_string(),
        created_at,
    })
}

/// Get an image group by ID.
pub fn get_image_group(conn: &Connection, id: GroupId) -> Result<Option<ImageGroup>> {
    let q = format!("SELECT {GROUP_COLS} FROM medcord_image_groups WHERE id = ?1");
    conn.query_row(&q, [id.to_string()], ImageGroup::from_row)
        .optional()
        .map_err(|e| Error::database(e.to_string()))
}

/// Insert one image variant row.
pub fn insert_image_variant(conn: &Connection, variant: &ImageVariant) -> Result<()> {
    conn.execute(
        "INSERT INTO medcord_images (group_id, tag, size, width, height, quality, content_type)
         VALUES (?1,?2,?3,?4,?5,?6,?7)",
        rusqlite::params![
            variant.group_id.to_string(),
            variant.tag,
            variant.size as i64,
            variant.width,
            variant.height,
            variant.quality,
            variant.content_type.mime(),
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;
    Ok(())
}

/// List variants for a group.
pub fn list_image_variants(conn: &Connection, group_id: GroupId) -> Result<Vec<ImageVariant>> {
    let q = format!("SELECT {VARIANT_COLS} FROM medcord_images WHERE group_id = ?1 ORDER BY id");
    let mut stmt = conn.prepare(&q).map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([group_id.to_string()], ImageVariant::from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

/// List the tags stored for a group.
pub fn list_image_tags(conn: &Connection, group_id: GroupId) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare("SELECT tag FROM medcord_images WHERE group_id = ?1 ORDER BY id")
        .map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([group_id.to_string()], |row| row.get(0))
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<String>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

/// Delete an image group; variant rows go with it.
pub fn delete_image_group(conn: &Connection, id: GroupId) -> Result<bool> {
    let n = conn
        .execute("DELETE FROM medcord_image_groups WHERE id = ?1", [id.to_string()])
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::init_memory_pool;
    use mc_core::ImageFormat;

    fn variant(group_id: GroupId, tag: &str) -> ImageVariant {
        ImageVariant {
            group_id,
            tag: tag.into(),
            size: 1234,
            width: 64,
            height: 48,
            quality: 90,
            content_type: ImageFormat::Webp,
        }
    }

    #[test]
    fn create_and_get_group() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let id = GroupId::new();
        create_image_group(&conn, id, "cat.png", 640, 480, "image/png").unwrap();

        let group = get_image_group(&conn, id).unwrap().unwrap();
        assert_eq!(group.filename, "cat.png");
        assert_eq!((group.width, group.height), (640, 480));
        assert!(get_image_group(&conn, GroupId::new()).unwrap().is_none());
    }

    #[test]
    fn variants_roundtrip_and_cascade() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let id = GroupId::new();
        create_image_group(&conn, id, "cat.png", 640, 480, "image/png").unwrap();
        insert_image_variant(&conn, &variant(id, "small")).unwrap();
        insert_image_variant(&conn, &variant(id, "large")).unwrap();

        let list = list_image_variants(&conn, id).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0], variant(id, "small"));
        assert_eq!(list_image_tags(&conn, id).unwrap(), vec!["small", "large"]);

        assert!(delete_image_group(&conn, id).unwrap());
        assert!(list_image_tags(&conn, id).unwrap().is_empty());
        assert!(!delete_image_group(&conn, id).unwrap());
    }

    #[test]
    fn duplicate_tag_in_group_rejected() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let id = GroupId::new();
        create_image_group(&conn, id, "a.jpg", 1, 1, "image/jpeg").unwrap();
        insert_image_variant(&conn, &variant(id, "t")).unwrap();
        assert!(insert_image_variant(&conn, &variant(id, "t")).is_err());
    }

    #[test]
    fn variant_requires_group() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        assert!(insert_image_variant(&conn, &variant(GroupId::new(), "orphan")).is_err());
    }
}
