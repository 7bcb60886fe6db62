// ==========================================
// 内容排期系统 - 应用层
// ==========================================
// 职责: 组装共享连接、仓储与API，供宿主进程使用
// ==========================================

pub mod state;

// 重导出
pub use state::{get_default_db_path, AppState};
