// ==========================================
// 内容排期系统 - 渠道与排期规则仓储
// ==========================================
// 红线: Repository 不含业务逻辑（规则校验在引擎编译阶段）
// 表: channel、channel_schedule
// 说明: 筛选表达式、偏好星期/时刻以 JSON 文本存储
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::channel::{Channel, ChannelSchedule};
use crate::domain::filter::FilterExpression;
use crate::domain::types::{ChannelId, PlatformType};
use crate::engine::sources::{ScheduleStore, SourceResult};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::sql::{id_values, placeholders};
use async_trait::async_trait;
use rusqlite::{params, params_from_iter, Connection};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::{Arc, Mutex};

// ==========================================
// ChannelRepository - 渠道仓储
// ==========================================
pub struct ChannelRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ChannelRepository {
    /// 创建新的 ChannelRepository 实例
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

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn ensure_table(&self) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS channel (
              channel_id TEXT PRIMARY KEY,
              name TEXT NOT NULL,
              platform TEXT NOT NULL,
              eligible_media_filter TEXT,
              repost_cooldown_hours INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS channel_schedule (
              schedule_id TEXT PRIMARY KEY,
              channel_id TEXT NOT NULL REFERENCES channel(channel_id) ON DELETE CASCADE,
              cadence TEXT NOT NULL,
              posts_per_timeframe INTEGER NOT NULL,
              preferred_days TEXT NOT NULL DEFAULT '[]',
              preferred_times TEXT NOT NULL DEFAULT '[]',
              media_filters TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_channel_schedule_channel
              ON channel_schedule(channel_id);
            "#,
        )?;
        Ok(())
    }

    /// 写入渠道（UPSERT）
    pub fn upsert_channel(&self, channel: &Channel) -> RepositoryResult<()> {
        let filter_json = to_json_opt("eligible_media_filter", channel.eligible_media_filter.as_ref())?;
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO channel (channel_id, name, platform, eligible_media_filter, repost_cooldown_hours)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(channel_id) DO UPDATE SET
              name = excluded.name,
              platform = excluded.platform,
              eligible_media_filter = excluded.eligible_media_filter,
              repost_cooldown_hours = excluded.repost_cooldown_hours
            "#,
            params![
                channel.id,
                channel.name,
                channel.platform.to_string(),
                filter_json,
                channel.repost_cooldown_hours,
            ],
        )?;
        Ok(())
    }

    /// 写入排期规则（UPSERT，原样保存，不做校验）
    pub fn upsert_schedule(&self, schedule: &ChannelSchedule) -> RepositoryResult<()> {
        let days_json = to_json("preferred_days", &schedule.preferred_days)?;
        let times_json = to_json("preferred_times", &schedule.preferred_times)?;
        let filter_json = to_json_opt("media_filters", schedule.media_filters.as_ref())?;

        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO channel_schedule (
              schedule_id, channel_id, cadence, posts_per_timeframe,
              preferred_days, preferred_times, media_filters
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(schedule_id) DO UPDATE SET
              channel_id = excluded.channel_id,
              cadence = excluded.cadence,
              posts_per_timeframe = excluded.posts_per_timeframe,
              preferred_days = excluded.preferred_days,
              preferred_times = excluded.preferred_times,
              media_filters = excluded.media_filters
            "#,
            params![
                schedule.id,
                schedule.channel_id,
                schedule.cadence,
                schedule.posts_per_timeframe,
                days_json,
                times_json,
                filter_json,
            ],
        )?;
        Ok(())
    }

    /// 删除排期规则
    pub fn delete_schedule(&self, schedule_id: &str) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        Ok(conn.execute(
            "DELETE FROM channel_schedule WHERE schedule_id = ?1",
            params![schedule_id],
        )?)
    }

    /// 按ID查询渠道（不存在的ID被忽略，按ID排序）
    pub fn find_channels(&self, ids: &[ChannelId]) -> RepositoryResult<Vec<Channel>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT channel_id, name, platform, eligible_media_filter, repost_cooldown_hours
             FROM channel WHERE channel_id IN ({}) ORDER BY channel_id",
            placeholders(ids.len())
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(id_values(ids)), |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, i64>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, name, platform, filter, cooldown)| {
                Ok(Channel {
                    id,
                    name,
                    platform: PlatformType::parse_lossy(&platform),
                    eligible_media_filter: from_json_opt("eligible_media_filter", filter)?,
                    repost_cooldown_hours: cooldown,
                })
            })
            .collect()
    }

    /// 查询渠道下的排期规则（按渠道、规则ID排序）
    pub fn find_schedules(&self, channel_ids: &[ChannelId]) -> RepositoryResult<Vec<ChannelSchedule>> {
        if channel_ids.is_empty() {
            return Ok(vec![]);
        }

        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT schedule_id, channel_id, cadence, posts_per_timeframe,
                    preferred_days, preferred_times, media_filters
             FROM channel_schedule WHERE channel_id IN ({})
             ORDER BY channel_id, schedule_id",
            placeholders(channel_ids.len())
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(id_values(channel_ids)), |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i32>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, Option<String>>(6)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, channel_id, cadence, posts, days, times, filters)| {
                Ok(ChannelSchedule {
                    id,
                    channel_id,
                    cadence,
                    posts_per_timeframe: posts,
                    preferred_days: from_json("preferred_days", &days)?,
                    preferred_times: from_json("preferred_times", &times)?,
                    media_filters: from_json_opt("media_filters", filters)?,
                })
            })
            .collect()
    }

    /// 全部渠道ID
    pub fn list_ids(&self) -> RepositoryResult<Vec<ChannelId>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT channel_id FROM channel ORDER BY channel_id")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }
}

#[async_trait]
impl ScheduleStore for ChannelRepository {
    async fn load_channels(&self, ids: &[ChannelId]) -> SourceResult<Vec<Channel>> {
        Ok(self.find_channels(ids)?)
    }

    async fn load_schedules(&self, channel_ids: &[ChannelId]) -> SourceResult<Vec<ChannelSchedule>> {
        Ok(self.find_schedules(channel_ids)?)
    }

    async fn list_channel_ids(&self) -> SourceResult<Vec<ChannelId>> {
        Ok(self.list_ids()?)
    }
}

// ==========================================
// 工具函数
// ==========================================

fn to_json<T: Serialize + ?Sized>(field: &str, value: &T) -> RepositoryResult<String> {
    serde_json::to_string(value).map_err(|e| RepositoryError::FieldValueError {
        field: field.to_string(),
        message: e.to_string(),
    })
}

fn to_json_opt(field: &str, value: Option<&FilterExpression>) -> RepositoryResult<Option<String>> {
    value.map(|v| to_json(field, v)).transpose()
}

fn from_json<T: DeserializeOwned>(field: &str, raw: &str) -> RepositoryResult<T> {
    serde_json::from_str(raw).map_err(|e| RepositoryError::FieldValueError {
        field: field.to_string(),
        message: e.to_string(),
    })
}

fn from_json_opt(field: &str, raw: Option<String>) -> RepositoryResult<Option<FilterExpression>> {
    match raw {
        Some(s) if !s.trim().is_empty() => from_json(field, &s).map(Some),
        _ => Ok(None),
    }
}
