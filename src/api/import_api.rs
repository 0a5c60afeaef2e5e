// ==========================================
// 纪律案卷导入API
// ==========================================
// 职责: 异步门面；阻塞的导入管道放到 tokio 阻塞线程执行，
//       进度经 mpsc 通道转发给调用方
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::{ConfigManager, ImportConfig};
use crate::db::{init_schema, open_sqlite_connection};
use crate::domain::import::{CommitMode, ImportBatch, ImportMode, ImportOutcome, ImportProgress, RowFailure};
use crate::importer::orchestrator::ImportOrchestrator;
use crate::importer::progress::{ChannelProgress, NoProgress, ProgressSink};
use crate::repository::discipline_repo::{DisciplineRepository, TableCounts};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::mpsc::UnboundedSender;

/// 导入API响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportApiResponse {
    /// 管道返回的最终结果
    #[serde(flatten)]
    pub outcome: ImportOutcome,
    pub mode: ImportMode,
    pub commit_mode: CommitMode,
    /// 导入耗时（毫秒，含文件解析）
    pub elapsed_ms: i64,
}

// ==========================================
// DisciplineImporter Trait
// ==========================================
// 实现者: ImportApi
#[async_trait]
pub trait DisciplineImporter: Send + Sync {
    /// 导入一个表格文件
    ///
    /// # 参数
    /// - file_path: .csv / .xlsx / .xls / .ods
    /// - mode: 案卷导入或名册导入
    /// - commit_mode: 覆盖配置中的提交模式（None 则按配置）
    /// - progress: 每处理一行推送一次 (total, success, error)
    async fn import_file(
        &self,
        file_path: &str,
        mode: ImportMode,
        commit_mode: Option<CommitMode>,
        progress: Option<UnboundedSender<ImportProgress>>,
    ) -> ApiResult<ImportApiResponse>;
}

/// 导入API
pub struct ImportApi {
    db_path: String,
}

impl ImportApi {
    /// 创建新的ImportApi实例
    pub fn new(db_path: String) -> Self {
        Self { db_path }
    }

    pub fn db_path(&self) -> &str {
        &self.db_path
    }

    fn open_repository(&self) -> ApiResult<DisciplineRepository> {
        let conn = open_sqlite_connection(&self.db_path)
            .map_err(|e| ApiError::DatabaseConnectionError(e.to_string()))?;
        init_schema(&conn).map_err(|e| ApiError::DatabaseError(e.to_string()))?;
        Ok(DisciplineRepository::from_connection(Arc::new(Mutex::new(conn))))
    }

    /// 各表行数
    pub fn table_counts(&self) -> ApiResult<TableCounts> {
        Ok(self.open_repository()?.table_counts()?)
    }

    /// 最近的导入批次（按开始时间倒序）
    pub fn recent_batches(&self, limit: usize) -> ApiResult<Vec<ImportBatch>> {
        Ok(self.open_repository()?.recent_batches(limit)?)
    }

    /// 某批次的行级失败明细
    pub fn row_errors(&self, batch_id: &str) -> ApiResult<Vec<RowFailure>> {
        Ok(self.open_repository()?.row_errors_by_batch(batch_id)?)
    }

    /// 阻塞执行一次导入（在 spawn_blocking 中调用）
    fn run_blocking(
        db_path: &str,
        file_path: &Path,
        mode: ImportMode,
        commit_mode: Option<CommitMode>,
        sink: &mut dyn ProgressSink,
    ) -> ApiResult<ImportApiResponse> {
        let timer = Instant::now();

        let config_manager = ConfigManager::new(db_path)?;
        let mut config = ImportConfig::load(&config_manager)?;
        if let Some(commit_mode) = commit_mode {
            config = config.with_commit_mode(commit_mode);
        }
        let commit_mode = config.commit_mode;

        let mut conn = open_sqlite_connection(db_path)
            .map_err(|e| ApiError::DatabaseConnectionError(e.to_string()))?;
        let mut orchestrator = ImportOrchestrator::new(config);
        let outcome = orchestrator.import_file(&mut conn, mode, file_path, sink)?;

        Ok(ImportApiResponse {
            outcome,
            mode,
            commit_mode,
            elapsed_ms: i64::try_from(timer.elapsed().as_millis()).unwrap_or(i64::MAX),
        })
    }
}

#[async_trait]
impl DisciplineImporter for ImportApi {
    async fn import_file(
        &self,
        file_path: &str,
        mode: ImportMode,
        commit_mode: Option<CommitMode>,
        progress: Option<UnboundedSender<ImportProgress>>,
    ) -> ApiResult<ImportApiResponse> {
        if file_path.trim().is_empty() {
            return Err(ApiError::InvalidInput("文件路径不能为空".to_string()));
        }

        let db_path = self.db_path.clone();
        let file_path = file_path.to_string();

        tokio::task::spawn_blocking(move || {
            let path = Path::new(&file_path);
            match progress {
                Some(tx) => Self::run_blocking(&db_path, path, mode, commit_mode, &mut ChannelProgress(tx)),
                None => Self::run_blocking(&db_path, path, mode, commit_mode, &mut NoProgress),
            }
        })
        .await
        .map_err(|e| ApiError::InternalError(format!("导入任务异常退出: {}", e)))?
    }
}
