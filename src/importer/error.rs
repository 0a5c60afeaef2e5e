// ==========================================
// 宪兵纪律案卷导入系统 - 导入模块错误类型
// ==========================================
// 分层:
// - ImportError: 批次级，立即终止管道
// - RowError: 行级，只影响当前行，绝不越过单行边界
// - TransformWarning: 非错误，静默取默认值
// 工具: thiserror 派生宏
// ==========================================

use crate::domain::dimension::Dimension;
use crate::domain::import::{ImportMode, RowErrorKind};
use crate::repository::error::RepositoryError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ==========================================
// ValidationError - 缺少必需列
// ==========================================
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("缺少必需列 ({mode} 导入): {}", .missing.join(", "))]
pub struct ValidationError {
    pub mode: ImportMode,
    pub missing: Vec<String>,
}

/// 导入模块错误类型（批次级）
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件格式不支持: {0}（仅支持 .xlsx/.xls/.ods/.csv）")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("Excel 解析失败: {0}")]
    ExcelParseError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    // ===== 数据库错误 =====
    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    #[error("数据库查询失败: {0}")]
    DatabaseQueryError(String),

    // ===== 配置错误 =====
    #[error("配置读取失败 (key: {key}): {message}")]
    ConfigReadError { key: String, message: String },

    #[error("配置值格式错误 (key: {key}, value: {value}): {message}")]
    ConfigValueError {
        key: String,
        value: String,
        message: String,
    },

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

// 实现 From<rusqlite::Error>
impl From<rusqlite::Error> for ImportError {
    fn from(err: rusqlite::Error) -> Self {
        ImportError::DatabaseTransactionError(err.to_string())
    }
}

// 实现 From<RepositoryError>
impl From<RepositoryError> for ImportError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::DatabaseConnectionError(msg) => {
                ImportError::DatabaseConnectionError(msg)
            }
            RepositoryError::DatabaseTransactionError(msg) => {
                ImportError::DatabaseTransactionError(msg)
            }
            other => ImportError::DatabaseQueryError(other.to_string()),
        }
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

// 实现 From<calamine::Error>
impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;

// ==========================================
// RowError - 行级错误
// ==========================================
#[derive(Error, Debug)]
pub enum RowError {
    #[error("维度解析失败 ({dimension} = {label:?}): {source}")]
    DimensionResolution {
        dimension: Dimension,
        label: String,
        #[source]
        source: RepositoryError,
    },

    #[error("写入失败: {0}")]
    Integrity(#[from] RepositoryError),

    #[error("人员服役编号 (matricule) 为空")]
    MissingPersonKey,

    #[error("案卷编号缺失，且无法由序号与年份合成")]
    MissingCaseReference,

    #[error("案卷状态为 {status}，但处分类型为空")]
    MissingSanctionType { status: String },

    #[error("案卷状态为 {status}，但处分时长 (TAUX) 为空")]
    MissingSanctionDuration { status: String },
}

impl RowError {
    /// 归类为行级失败类别
    pub fn kind(&self) -> RowErrorKind {
        match self {
            RowError::DimensionResolution { .. } => RowErrorKind::DimensionResolution,
            RowError::Integrity(_) | RowError::MissingPersonKey => RowErrorKind::Integrity,
            RowError::MissingCaseReference
            | RowError::MissingSanctionType { .. }
            | RowError::MissingSanctionDuration { .. } => RowErrorKind::BusinessRule,
        }
    }
}

// ==========================================
// TransformWarning - 字段转换警告（非致命）
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformWarning {
    pub field: String,
    pub value: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_names_every_column() {
        let err = ValidationError {
            mode: ImportMode::Roster,
            missing: vec!["MATRICULE".to_string(), "SEXE".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("MATRICULE"));
        assert!(msg.contains("SEXE"));
        assert!(msg.contains("roster"));
    }

    #[test]
    fn test_row_error_kind() {
        assert_eq!(RowError::MissingPersonKey.kind(), RowErrorKind::Integrity);
        assert_eq!(
            RowError::MissingSanctionType {
                status: "SANCTIONNE".to_string()
            }
            .kind(),
            RowErrorKind::BusinessRule
        );
        let err = RowError::DimensionResolution {
            dimension: Dimension::Unit,
            label: "X".to_string(),
            source: RepositoryError::DatabaseQueryError("disk I/O".to_string()),
        };
        assert_eq!(err.kind(), RowErrorKind::DimensionResolution);
    }

    #[test]
    fn test_repository_error_converts_to_import_error() {
        let err: ImportError =
            RepositoryError::DatabaseTransactionError("busy".to_string()).into();
        assert!(matches!(err, ImportError::DatabaseTransactionError(_)));
    }
}
