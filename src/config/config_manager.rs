// ==========================================
// 内容排期系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::engine_config_trait::{defaults, ConfigResult, EngineConfigReader};
use crate::db::open_sqlite_connection;
use crate::engine::recurrence::parse_time_of_day;
use async_trait::async_trait;
use chrono::NaiveTime;
use rusqlite::{params, Connection};
use serde_json::json;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> ConfigResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Self::from_connection(Arc::new(Mutex::new(conn)))
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：会对传入连接再次应用统一 PRAGMA（幂等），并确保 config_kv 存在。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ConfigResult<Self> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        let manager = Self { conn };
        manager.ensure_table()?;
        Ok(manager)
    }

    /// 建表（幂等）
    pub fn ensure_table(&self) -> ConfigResult<()> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS config_kv (
              scope_id TEXT NOT NULL,
              key TEXT NOT NULL,
              value TEXT NOT NULL,
              updated_at TEXT NOT NULL DEFAULT (datetime('now')),
              PRIMARY KEY (scope_id, key)
            );
            "#,
        )?;
        Ok(())
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    fn get_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 读取 global scope 的配置值（公开方法，供其他模块复用）
    pub fn get_global_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        self.get_config_value(key)
    }

    /// 写入 global scope 的配置值（UPSERT）
    pub fn set_config_value(&self, key: &str, value: &str) -> ConfigResult<()> {
        let key = key.trim();
        if key.is_empty() {
            return Err("配置键不能为空".into());
        }

        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at) VALUES ('global', ?1, ?2, datetime('now'))
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    /// 从 config_kv 表读取配置值，带默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> ConfigResult<String> {
        Ok(self.get_config_value(key)?.unwrap_or_else(|| default.to_string()))
    }

    /// 解析数值配置，格式错误时回退默认值
    fn get_parsed_or_default<T>(&self, key: &str, default: T) -> ConfigResult<T>
    where
        T: FromStr + ToString + Copy,
    {
        let raw = match self.get_config_value(key)? {
            Some(v) => v,
            None => return Ok(default),
        };

        match raw.trim().parse::<T>() {
            Ok(v) => Ok(v),
            Err(_) => {
                tracing::warn!(
                    config_key = key,
                    raw_value = %raw,
                    default_value = %default.to_string(),
                    "配置格式错误，使用默认值"
                );
                Ok(default)
            }
        }
    }

    /// 获取所有配置的快照（JSON格式）
    ///
    /// # 用途
    /// - 每次运行记录所用配置，便于排查
    pub fn get_config_snapshot(&self) -> ConfigResult<String> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt = conn.prepare(
            "SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key",
        )?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&json!(config_map))?)
    }
}

// ==========================================
// EngineConfigReader Trait 实现
// ==========================================
#[async_trait]
impl EngineConfigReader for ConfigManager {
    async fn get_default_post_time(&self) -> ConfigResult<NaiveTime> {
        let value = self.get_config_or_default(config_keys::DEFAULT_POST_TIME, defaults::DEFAULT_POST_TIME)?;
        match parse_time_of_day(&value) {
            Ok(t) => Ok(t),
            Err(_) => {
                tracing::warn!(
                    config_key = config_keys::DEFAULT_POST_TIME,
                    raw_value = %value,
                    "默认发帖时刻格式错误，使用 12:00"
                );
                Ok(NaiveTime::from_hms_opt(12, 0, 0).unwrap_or(NaiveTime::MIN))
            }
        }
    }

    async fn get_history_lookback_hours(&self) -> ConfigResult<i64> {
        let hours = self.get_parsed_or_default(
            config_keys::HISTORY_LOOKBACK_HOURS,
            defaults::HISTORY_LOOKBACK_HOURS,
        )?;
        Ok(hours.max(0))
    }

    async fn get_draft_concurrency(&self) -> ConfigResult<usize> {
        let n = self.get_parsed_or_default(config_keys::DRAFT_CONCURRENCY, defaults::DRAFT_CONCURRENCY)?;
        Ok(n.max(1))
    }

    async fn get_rerun_interval_minutes(&self) -> ConfigResult<u64> {
        let n = self.get_parsed_or_default(
            config_keys::RERUN_INTERVAL_MINUTES,
            defaults::RERUN_INTERVAL_MINUTES,
        )?;
        Ok(n.max(1))
    }

    async fn get_planning_horizon_days(&self) -> ConfigResult<i64> {
        let n = self.get_parsed_or_default(
            config_keys::PLANNING_HORIZON_DAYS,
            defaults::PLANNING_HORIZON_DAYS,
        )?;
        Ok(n.max(1))
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 排期
    pub const DEFAULT_POST_TIME: &str = "default_post_time";
    pub const PLANNING_HORIZON_DAYS: &str = "planning_horizon_days";

    // 冷却 / 历史
    pub const HISTORY_LOOKBACK_HOURS: &str = "history_lookback_hours";

    // 草稿创建
    pub const DRAFT_CONCURRENCY: &str = "draft_concurrency";

    // 定时任务
    pub const RERUN_INTERVAL_MINUTES: &str = "rerun_interval_minutes";
}
