// ==========================================
// 宪兵纪律案卷导入系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// ==========================================

use std::path::PathBuf;
use std::sync::Arc;

use crate::api::ImportApi;
use crate::config::config_manager::ConfigManager;

/// 数据库路径环境变量
pub const DB_PATH_ENV: &str = "GENDARMERIE_DISCIPLINE_DB_PATH";

const DB_FILE_NAME: &str = "gendarmerie_discipline.db";

/// 应用状态
///
/// 包含API实例和共享资源
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 导入API
    pub import_api: Arc<ImportApi>,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// 会确保数据库文件存在且表结构已初始化
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        if let Some(parent) = PathBuf::from(&db_path).parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| format!("无法创建数据库目录 {}: {}", parent.display(), e))?;
            }
        }

        // ConfigManager::new 会执行幂等建表
        let config_manager = Arc::new(
            ConfigManager::new(&db_path).map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );
        let import_api = Arc::new(ImportApi::new(db_path.clone()));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            import_api,
            config_manager,
        })
    }
}

/// 获取默认数据库路径
///
/// 优先级: 环境变量 > 用户数据目录 > 当前目录
pub fn get_default_db_path() -> String {
    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let path = path.trim();
        if !path.is_empty() {
            return path.to_string();
        }
    }

    if let Some(data_dir) = dirs::data_dir() {
        return data_dir
            .join("gendarmerie-discipline")
            .join(DB_FILE_NAME)
            .to_string_lossy()
            .into_owned();
    }

    format!("./{}", DB_FILE_NAME)
}
