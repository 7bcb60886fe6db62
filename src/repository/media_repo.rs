// ==========================================
// 内容排期系统 - 素材库仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 表: media_item（素材）、media_tag（标签分配）
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::filter::FilterExpression;
use crate::domain::media::{MediaItem, TagAssignment, TagValue};
use crate::domain::types::MediaKind;
use crate::engine::sources::{LibraryProvider, SourceResult};
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

// ==========================================
// MediaRepository - 素材库仓储
// ==========================================
pub struct MediaRepository {
    conn: Arc<Mutex<Connection>>,
}

/// media_item 行（类型字段未解析）
struct MediaRow {
    id: String,
    kind: String,
    name: String,
    path: String,
    caption: Option<String>,
    created_at: NaiveDateTime,
    modified_at: NaiveDateTime,
}

impl MediaRepository {
    /// 创建新的 MediaRepository 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Self::from_connection(Arc::new(Mutex::new(conn)))
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        let repo = Self { conn };
        repo.ensure_table()?;
        Ok(repo)
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn ensure_table(&self) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS media_item (
              media_id TEXT PRIMARY KEY,
              kind TEXT NOT NULL,
              name TEXT NOT NULL,
              path TEXT NOT NULL,
              caption TEXT,
              created_at TEXT NOT NULL,
              modified_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS media_tag (
              media_id TEXT NOT NULL REFERENCES media_item(media_id) ON DELETE CASCADE,
              tag_id TEXT NOT NULL,
              dimension TEXT NOT NULL,
              value_kind TEXT NOT NULL,
              value_text TEXT NOT NULL,
              PRIMARY KEY (media_id, tag_id)
            );

            CREATE INDEX IF NOT EXISTS idx_media_tag_tag ON media_tag(tag_id);
            "#,
        )?;
        Ok(())
    }

    /// 批量写入素材（INSERT OR REPLACE，标签整体替换）
    ///
    /// # 返回
    /// - Ok(usize): 写入的素材数
    pub fn batch_upsert(&self, items: &[MediaItem]) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        for item in items {
            tx.execute(
                r#"
                INSERT INTO media_item (media_id, kind, name, path, caption, created_at, modified_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ON CONFLICT(media_id) DO UPDATE SET
                  kind = excluded.kind,
                  name = excluded.name,
                  path = excluded.path,
                  caption = excluded.caption,
                  modified_at = excluded.modified_at
                "#,
                params![
                    item.id,
                    item.kind.to_string(),
                    item.name,
                    item.path,
                    item.caption,
                    item.created_at,
                    item.modified_at,
                ],
            )?;

            tx.execute("DELETE FROM media_tag WHERE media_id = ?1", params![item.id])?;
            for tag in &item.tags {
                tx.execute(
                    "INSERT OR REPLACE INTO media_tag (media_id, tag_id, dimension, value_kind, value_text)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        item.id,
                        tag.tag_id,
                        tag.dimension,
                        tag.value.kind_str(),
                        encode_tag_value(&tag.value),
                    ],
                )?;
            }
        }

        tx.commit()?;
        Ok(items.len())
    }

    /// 写入单个素材
    pub fn upsert(&self, item: &MediaItem) -> RepositoryResult<()> {
        self.batch_upsert(std::slice::from_ref(item)).map(|_| ())
    }

    /// 按素材ID查询
    pub fn find_by_id(&self, media_id: &str) -> RepositoryResult<Option<MediaItem>> {
        let conn = self.get_conn()?;
        let result = conn.query_row(
            "SELECT media_id, kind, name, path, caption, created_at, modified_at
             FROM media_item WHERE media_id = ?1",
            params![media_id],
            map_media_row,
        );

        let row = match result {
            Ok(row) => row,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut tags = load_tags(&conn, Some(media_id))?;
        let tags = tags.remove(media_id).unwrap_or_default();
        Ok(Some(into_media_item(row, tags)?))
    }

    /// 全部素材（按ID排序）
    pub fn list_all(&self) -> RepositoryResult<Vec<MediaItem>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT media_id, kind, name, path, caption, created_at, modified_at
             FROM media_item ORDER BY media_id",
        )?;
        let rows = stmt
            .query_map([], map_media_row)?
            .collect::<Result<Vec<_>, _>>()?;

        let mut tags = load_tags(&conn, None)?;
        rows.into_iter()
            .map(|row| {
                let item_tags = tags.remove(&row.id).unwrap_or_default();
                into_media_item(row, item_tags)
            })
            .collect()
    }
}

#[async_trait]
impl LibraryProvider for MediaRepository {
    async fn load_library(&self, prefilter: Option<&FilterExpression>) -> SourceResult<Vec<MediaItem>> {
        // 粗筛交给引擎精确求值，这里返回全部
        if prefilter.is_some() {
            debug!("素材库筛选由引擎求值");
        }
        Ok(self.list_all()?)
    }
}

// ==========================================
// 行映射
// ==========================================

fn map_media_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MediaRow> {
    Ok(MediaRow {
        id: row.get(0)?,
        kind: row.get(1)?,
        name: row.get(2)?,
        path: row.get(3)?,
        caption: row.get(4)?,
        created_at: row.get(5)?,
        modified_at: row.get(6)?,
    })
}

fn into_media_item(row: MediaRow, tags: Vec<TagAssignment>) -> RepositoryResult<MediaItem> {
    let kind: MediaKind = row.kind.parse().map_err(|e: String| RepositoryError::FieldValueError {
        field: "kind".to_string(),
        message: e,
    })?;

    Ok(MediaItem {
        id: row.id,
        kind,
        tags,
        name: row.name,
        path: row.path,
        caption: row.caption,
        created_at: row.created_at,
        modified_at: row.modified_at,
    })
}

/// 加载标签（media_id 为 None 时加载全部）
fn load_tags(
    conn: &Connection,
    media_id: Option<&str>,
) -> RepositoryResult<HashMap<String, Vec<TagAssignment>>> {
    let mut stmt = conn.prepare(
        "SELECT media_id, tag_id, dimension, value_kind, value_text
         FROM media_tag
         WHERE ?1 IS NULL OR media_id = ?1
         ORDER BY media_id, tag_id",
    )?;

    let rows = stmt
        .query_map(params![media_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut by_media: HashMap<String, Vec<TagAssignment>> = HashMap::new();
    for (media_id, tag_id, dimension, value_kind, value_text) in rows {
        let value = decode_tag_value(&value_kind, &value_text)?;
        by_media.entry(media_id).or_default().push(TagAssignment {
            tag_id,
            dimension,
            value,
        });
    }
    Ok(by_media)
}

fn encode_tag_value(value: &TagValue) -> String {
    match value {
        TagValue::Boolean(b) => b.to_string(),
        TagValue::Numeric(n) => n.to_string(),
        TagValue::Categorical(s) => s.clone(),
    }
}

fn decode_tag_value(kind: &str, text: &str) -> RepositoryResult<TagValue> {
    let invalid = || RepositoryError::FieldValueError {
        field: "value_text".to_string(),
        message: format!("{} 取值无法解析: {}", kind, text),
    };

    match kind {
        "boolean" => text.parse::<bool>().map(TagValue::Boolean).map_err(|_| invalid()),
        "numeric" => text.parse::<f64>().map(TagValue::Numeric).map_err(|_| invalid()),
        "categorical" => Ok(TagValue::Categorical(text.to_string())),
        _ => Err(RepositoryError::FieldValueError {
            field: "value_kind".to_string(),
            message: format!("未知标签取值类型: {}", kind),
        }),
    }
}
