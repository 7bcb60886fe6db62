// ==========================================
// 内容排期系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节；实现引擎的外部协作方接口
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod channel_repo;
pub mod draft_repo;
pub mod error;
pub mod history_repo;
pub mod media_repo;
mod sql;

// 重导出核心仓储
pub use channel_repo::ChannelRepository;
pub use draft_repo::{DraftPost, DraftPostRepository};
pub use error::{RepositoryError, RepositoryResult};
pub use history_repo::PostingHistoryRepository;
pub use media_repo::MediaRepository;
