// ==========================================
// 内容排期系统 - 草稿仓储
// ==========================================
// 职责: 持久化分配结果生成的待发布草稿
// 表: draft_post（同一时段只允许一个草稿）
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::slot::{FilledSlot, Slot};
use crate::domain::types::{AssignmentSource, ChannelId, MediaId};
use crate::engine::sources::{DraftError, DraftId, DraftRequest, DraftSink, SourceResult};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::sql::{datetime_value, id_values, placeholders};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use rusqlite::{params, params_from_iter, Connection, Row};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// 草稿记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftPost {
    pub draft_id: DraftId,
    pub slot: Slot,
    pub media_id: MediaId,
    pub source: AssignmentSource,
    pub created_at: NaiveDateTime,
}

// ==========================================
// DraftPostRepository - 草稿仓储
// ==========================================
pub struct DraftPostRepository {
    conn: Arc<Mutex<Connection>>,
}

impl DraftPostRepository {
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Self::from_connection(Arc::new(Mutex::new(conn)))
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        let repo = Self { conn };
        repo.ensure_table()?;
        Ok(repo)
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn ensure_table(&self) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS draft_post (
              draft_id TEXT PRIMARY KEY,
              schedule_id TEXT NOT NULL,
              channel_id TEXT NOT NULL,
              scheduled_at TEXT NOT NULL,
              media_id TEXT NOT NULL,
              source TEXT NOT NULL,
              created_at TEXT NOT NULL,
              UNIQUE (schedule_id, scheduled_at)
            );

            CREATE INDEX IF NOT EXISTS idx_draft_post_channel_time
              ON draft_post(channel_id, scheduled_at);
            "#,
        )?;
        Ok(())
    }

    /// 插入草稿，返回新草稿ID
    ///
    /// # 返回
    /// - Err(UniqueConstraintViolation): 该时段已有草稿
    pub fn insert(&self, request: &DraftRequest) -> RepositoryResult<DraftId> {
        let draft_id = Uuid::new_v4().to_string();
        let now = chrono::Local::now().naive_local();

        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO draft_post (
              draft_id, schedule_id, channel_id, scheduled_at, media_id, source, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                draft_id,
                request.slot.schedule_id,
                request.slot.channel_id,
                request.slot.timestamp,
                request.media_id,
                request.source.to_string(),
                now,
            ],
        )?;
        Ok(draft_id)
    }

    /// 查询渠道的草稿（按发帖时刻排序）
    pub fn list_by_channel(&self, channel_id: &str) -> RepositoryResult<Vec<DraftPost>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT draft_id, schedule_id, channel_id, scheduled_at, media_id, source, created_at
            FROM draft_post
            WHERE channel_id = ?1
            ORDER BY scheduled_at, schedule_id
            "#,
        )?;

        let drafts = stmt
            .query_map(params![channel_id], map_draft_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(drafts)
    }

    /// 查询多个渠道在 from 起（含）的草稿
    pub fn find_from(
        &self,
        channel_ids: &[ChannelId],
        from: NaiveDateTime,
    ) -> RepositoryResult<Vec<DraftPost>> {
        if channel_ids.is_empty() {
            return Ok(vec![]);
        }

        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT draft_id, schedule_id, channel_id, scheduled_at, media_id, source, created_at
             FROM draft_post
             WHERE scheduled_at >= ? AND channel_id IN ({})
             ORDER BY scheduled_at, schedule_id",
            placeholders(channel_ids.len())
        );

        let mut values = vec![datetime_value(from)];
        values.extend(id_values(channel_ids));

        let mut stmt = conn.prepare(&sql)?;
        let drafts = stmt
            .query_map(params_from_iter(values), map_draft_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(drafts)
    }
}

fn map_draft_row(row: &Row) -> rusqlite::Result<DraftPost> {
    Ok(DraftPost {
        draft_id: row.get(0)?,
        slot: Slot {
            schedule_id: row.get(1)?,
            channel_id: row.get(2)?,
            timestamp: row.get(3)?,
        },
        media_id: row.get(4)?,
        source: AssignmentSource::parse_lossy(&row.get::<_, String>(5)?),
        created_at: row.get(6)?,
    })
}

#[async_trait]
impl DraftSink for DraftPostRepository {
    async fn create_draft(&self, request: DraftRequest) -> Result<DraftId, DraftError> {
        match self.insert(&request) {
            Ok(id) => Ok(id),
            Err(RepositoryError::UniqueConstraintViolation(_)) => Err(DraftError::Rejected(format!(
                "时段已有草稿: schedule_id={}, timestamp={}",
                request.slot.schedule_id, request.slot.timestamp
            ))),
            Err(e) => Err(DraftError::Storage(e.to_string())),
        }
    }

    async fn existing_drafts(
        &self,
        channel_ids: &[ChannelId],
        from: NaiveDateTime,
    ) -> SourceResult<Vec<FilledSlot>> {
        Ok(self
            .find_from(channel_ids, from)?
            .into_iter()
            .map(|d| FilledSlot {
                slot: d.slot,
                media_id: d.media_id,
                source: d.source,
            })
            .collect())
    }
}
