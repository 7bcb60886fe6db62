// ==========================================
// 内容排期系统 - 引擎配置读取 Trait
// ==========================================
// 职责: 定义编排器与定时任务所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use async_trait::async_trait;
use chrono::NaiveTime;
use std::error::Error;

/// 配置读取结果
pub type ConfigResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

// ==========================================
// EngineConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）、StaticEngineConfig（固定值）
#[async_trait]
pub trait EngineConfigReader: Send + Sync {
    /// 未配置发帖时刻时使用的默认时刻
    ///
    /// # 默认值
    /// - 12:00
    async fn get_default_post_time(&self) -> ConfigResult<NaiveTime>;

    /// 发帖历史回溯小时数（实际回溯取该值与最长冷却的较大者）
    ///
    /// # 默认值
    /// - 720
    async fn get_history_lookback_hours(&self) -> ConfigResult<i64>;

    /// 草稿创建并发上限
    ///
    /// # 默认值
    /// - 4（最小 1）
    async fn get_draft_concurrency(&self) -> ConfigResult<usize>;

    /// 定时重跑间隔（分钟）
    ///
    /// # 默认值
    /// - 60（最小 1）
    async fn get_rerun_interval_minutes(&self) -> ConfigResult<u64>;

    /// 定时任务的排期天数
    ///
    /// # 默认值
    /// - 7（最小 1）
    async fn get_planning_horizon_days(&self) -> ConfigResult<i64>;
}

// ==========================================
// 默认值
// ==========================================
pub mod defaults {
    pub const DEFAULT_POST_TIME: &str = "12:00";
    pub const HISTORY_LOOKBACK_HOURS: i64 = 720;
    pub const DRAFT_CONCURRENCY: usize = 4;
    pub const RERUN_INTERVAL_MINUTES: u64 = 60;
    pub const PLANNING_HORIZON_DAYS: i64 = 7;
}

// ==========================================
// StaticEngineConfig - 固定值配置
// ==========================================
// 用途: 无数据库场景（单元测试、嵌入调用）
#[derive(Debug, Clone)]
pub struct StaticEngineConfig {
    pub default_post_time: NaiveTime,
    pub history_lookback_hours: i64,
    pub draft_concurrency: usize,
    pub rerun_interval_minutes: u64,
    pub planning_horizon_days: i64,
}

impl Default for StaticEngineConfig {
    fn default() -> Self {
        Self {
            default_post_time: NaiveTime::from_hms_opt(12, 0, 0).unwrap_or(NaiveTime::MIN),
            history_lookback_hours: defaults::HISTORY_LOOKBACK_HOURS,
            draft_concurrency: defaults::DRAFT_CONCURRENCY,
            rerun_interval_minutes: defaults::RERUN_INTERVAL_MINUTES,
            planning_horizon_days: defaults::PLANNING_HORIZON_DAYS,
        }
    }
}

#[async_trait]
impl EngineConfigReader for StaticEngineConfig {
    async fn get_default_post_time(&self) -> ConfigResult<NaiveTime> {
        Ok(self.default_post_time)
    }

    async fn get_history_lookback_hours(&self) -> ConfigResult<i64> {
        Ok(self.history_lookback_hours)
    }

    async fn get_draft_concurrency(&self) -> ConfigResult<usize> {
        Ok(self.draft_concurrency.max(1))
    }

    async fn get_rerun_interval_minutes(&self) -> ConfigResult<u64> {
        Ok(self.rerun_interval_minutes.max(1))
    }

    async fn get_planning_horizon_days(&self) -> ConfigResult<i64> {
        Ok(self.planning_horizon_days.max(1))
    }
}
