// ==========================================
// 内容排期系统 - 发帖历史仓储
// ==========================================
// 红线: 历史为外部事实，引擎只读；写入由发布流程完成
// 表: posting_history
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::channel::PostingHistoryEntry;
use crate::domain::types::ChannelId;
use crate::engine::sources::{HistoryStore, SourceResult};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::sql::{datetime_value, id_values, placeholders};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use rusqlite::{params, params_from_iter, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// PostingHistoryRepository - 发帖历史仓储
// ==========================================
pub struct PostingHistoryRepository {
    conn: Arc<Mutex<Connection>>,
}

impl PostingHistoryRepository {
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
            CREATE TABLE IF NOT EXISTS posting_history (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              media_id TEXT NOT NULL,
              channel_id TEXT NOT NULL,
              posted_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_posting_history_channel_time
              ON posting_history(channel_id, posted_at);
            "#,
        )?;
        Ok(())
    }

    /// 记录一次发帖
    pub fn record(&self, entry: &PostingHistoryEntry) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO posting_history (media_id, channel_id, posted_at) VALUES (?1, ?2, ?3)",
            params![entry.media_id, entry.channel_id, entry.posted_at],
        )?;
        Ok(())
    }

    /// 查询渠道在 since 之后的历史（按时间排序）
    pub fn find_since(
        &self,
        channel_ids: &[ChannelId],
        since: NaiveDateTime,
    ) -> RepositoryResult<Vec<PostingHistoryEntry>> {
        if channel_ids.is_empty() {
            return Ok(vec![]);
        }

        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT media_id, channel_id, posted_at FROM posting_history
             WHERE posted_at >= ? AND channel_id IN ({})
             ORDER BY posted_at, id",
            placeholders(channel_ids.len())
        );

        let mut values = vec![datetime_value(since)];
        values.extend(id_values(channel_ids));

        let mut stmt = conn.prepare(&sql)?;
        let entries = stmt
            .query_map(params_from_iter(values), |row| {
                Ok(PostingHistoryEntry {
                    media_id: row.get(0)?,
                    channel_id: row.get(1)?,
                    posted_at: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }
}

#[async_trait]
impl HistoryStore for PostingHistoryRepository {
    async fn load_history(
        &self,
        channel_ids: &[ChannelId],
        since: NaiveDateTime,
    ) -> SourceResult<Vec<PostingHistoryEntry>> {
        Ok(self.find_since(channel_ids, since)?)
    }
}
