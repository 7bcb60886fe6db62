// ==========================================
// 内容排期系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享连接、仓储与API实例
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::AssignmentApi;
use crate::config::config_manager::ConfigManager;
use crate::db::{ensure_schema_version, open_sqlite_connection};
use crate::engine::sources::PipelineSources;
use crate::repository::{
    ChannelRepository, DraftPostRepository, MediaRepository, PostingHistoryRepository,
};

/// 应用状态
///
/// 所有仓储共享同一个连接
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 分配API
    pub assignment_api: Arc<AssignmentApi<ConfigManager>>,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,

    /// 素材库仓储
    pub media_repo: Arc<MediaRepository>,

    /// 渠道与排期规则仓储
    pub channel_repo: Arc<ChannelRepository>,

    /// 发帖历史仓储
    pub history_repo: Arc<PostingHistoryRepository>,

    /// 草稿仓储
    pub draft_repo: Arc<DraftPostRepository>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    ///
    /// # 返回
    /// - Ok(AppState): 应用状态实例
    /// - Err(String): 初始化错误
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = open_sqlite_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;
        let schema_version = ensure_schema_version(&conn)
            .map_err(|e| format!("无法初始化schema_version: {}", e))?;
        tracing::debug!(schema_version, "schema_version 检查完成");
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 初始化Repository层
        // ==========================================
        let media_repo = Arc::new(
            MediaRepository::from_connection(conn.clone())
                .map_err(|e| format!("无法创建MediaRepository: {}", e))?,
        );
        let channel_repo = Arc::new(
            ChannelRepository::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ChannelRepository: {}", e))?,
        );
        let history_repo = Arc::new(
            PostingHistoryRepository::from_connection(conn.clone())
                .map_err(|e| format!("无法创建PostingHistoryRepository: {}", e))?,
        );
        let draft_repo = Arc::new(
            DraftPostRepository::from_connection(conn.clone())
                .map_err(|e| format!("无法创建DraftPostRepository: {}", e))?,
        );

        // 配置管理器
        let config_manager = Arc::new(
            ConfigManager::from_connection(conn)
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );

        // ==========================================
        // 初始化API层
        // ==========================================
        let sources = PipelineSources::new(
            media_repo.clone(),
            channel_repo.clone(),
            history_repo.clone(),
            draft_repo.clone(),
        );
        let assignment_api = Arc::new(AssignmentApi::new(config_manager.clone(), sources));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            assignment_api,
            config_manager,
            media_repo,
            channel_repo,
            history_repo,
            draft_repo,
        })
    }
}

/// 获取默认数据库路径
///
/// 优先读取环境变量 CONTENT_PIPELINE_DB_PATH，否则使用用户数据目录
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("CONTENT_PIPELINE_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./content_pipeline.db");

    if let Some(data_dir) = dirs::data_dir() {
        #[cfg(debug_assertions)]
        {
            path = data_dir.join("content-pipeline-dev");
        }

        #[cfg(not(debug_assertions))]
        {
            path = data_dir.join("content-pipeline");
        }

        // 目录创建失败时 SQLite 打开会报错，这里不中断
        std::fs::create_dir_all(&path).ok();
        path = path.join("content_pipeline.db");
    }

    path.to_string_lossy().to_string()
}
