//! Buffered per-asset write session.
//!
//! Variant rows are appended as each variant's bytes land on disk and are
//! inserted together in one transaction by [`WriteSession::commit`]. A
//! session that is dropped without committing records nothing.

use mc_core::{Error, GroupId, Result};
use rusqlite::Connection;

use crate::models::{ImageVariant, VideoVariant};
use crate::pool::{get_conn, DbPool};
use crate::queries;

/// A variant row that a [`WriteSession`] can persist.
pub trait VariantRow {
    fn group_id(&self) -> GroupId;
    fn insert(&self, conn: &Connection) -> Result<()>;
}

impl VariantRow for ImageVariant {
    fn group_id(&self) -> GroupId {
        self.group_id
    }

    fn insert(&self, conn: &Connection) -> Result<()> {
        queries::images::insert_image_variant(conn, self)
    }
}

impl VariantRow for VideoVariant {
    fn group_id(&self) -> GroupId {
        self.group_id
    }

    fn insert(&self, conn: &Connection) -> Result<()> {
        queries::videos::insert_video_variant(conn, self)
    }
}

/// Write session owned by exactly one asset's orchestration flow.
#[derive(Debug)]
pub struct WriteSession<R> {
    pool: DbPool,
    group_id: GroupId,
    pending: Vec<R>,
}

impl<R: VariantRow> WriteSession<R> {
    pub fn new(pool: DbPool, group_id: GroupId) -> Self {
        Self {
            pool,
            group_id,
            pending: Vec::new(),
        }
    }

    pub fn group_id(&self) -> GroupId {
        self.group_id
    }

    /// Record a variant whose bytes are already stored.
    pub fn append(&mut self, row: R) -> Result<()> {
        if row.group_id() != self.group_id {
            return Err(Error::Internal(format!(
                "variant for group {} appended to session for group {}",
                row.group_id(),
                self.group_id
            )));
        }
        self.pending.push(row);
        Ok(())
    }

    pub fn pending(&self) -> &[R] {
        &self.pending
    }

    /// Insert every appended row in a single transaction.
    pub fn commit(self) -> Result<Vec<R>> {
        let conn = get_conn(&self.pool)?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| Error::database(e.to_string()))?;
        for row in &self.pending {
            row.insert(&tx)?;
        }
        tx.commit().map_err(|e| Error::database(e.to_string()))?;
        Ok(self.pending)
    }
}
