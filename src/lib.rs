// ==========================================
// 内容排期系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite + Tokio
// 系统定位: 多渠道发帖排期 + 素材自动分配（人工可覆盖）
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 应用层 - 宿主进程集成
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    AssignmentSource, CadenceKind, ChannelId, MediaId, MediaKind, PlatformType, ScheduleId,
    UnfilledReason,
};

// 领域实体
pub use domain::{
    AssignmentResult, Channel, ChannelSchedule, FilledSlot, FilterExpression, MediaItem,
    PostingHistoryEntry, Slot, SlotKey, UnfilledSlot,
};

// 引擎
pub use engine::{
    AssignmentEngine, EligibilityResolver, FilterEvaluator, PipelineOrchestrator,
    RecurrenceExpander,
};

// API
pub use api::{ApiError, AssignmentApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "内容排期系统";
