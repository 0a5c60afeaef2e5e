// ==========================================
// 宪兵纪律案卷导入系统 - 导入过程模型
// ==========================================
// 职责: 导入模式 / 提交模式 / 进度 / 结果 / 批次记录
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// ImportMode - 导入模式
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    /// 纪律案卷导入（33 列）
    Case,
    /// 人员名册导入（7 列）
    Roster,
}

impl ImportMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ImportMode::Case => "case",
            ImportMode::Roster => "roster",
        }
    }
}

impl fmt::Display for ImportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImportMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "case" | "dossier" => Ok(ImportMode::Case),
            "roster" | "gendarme" => Ok(ImportMode::Roster),
            other => Err(format!("未知导入模式: {}", other)),
        }
    }
}

// ==========================================
// CommitMode - 工作单元边界
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitMode {
    /// 每行独立事务，成功行立即持久化
    #[default]
    PerRow,
    /// 整批一个事务，每行一个 SAVEPOINT，失败行回滚到保存点
    Batch,
}

impl CommitMode {
    pub fn as_str(self) -> &'static str {
        match self {
            CommitMode::PerRow => "per_row",
            CommitMode::Batch => "batch",
        }
    }
}

impl FromStr for CommitMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "per_row" | "row" => Ok(CommitMode::PerRow),
            "batch" => Ok(CommitMode::Batch),
            other => Err(format!("未知提交模式: {}", other)),
        }
    }
}

// ==========================================
// ImportState - 编排器状态机
// ==========================================
// Idle → Validating → (Aborted | Processing → Completed)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImportState {
    Idle,
    Validating,
    Processing,
    Completed,
    Aborted,
}

/// 进度回调载荷: (total, success, error)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportProgress {
    pub total_rows: usize,
    pub success_count: usize,
    pub error_count: usize,
}

/// 导入汇总
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportTotals {
    pub total_rows: usize,
    pub success_count: usize,
    pub error_count: usize,
}

// ==========================================
// ImportOutcome - 返回给调用方的最终结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportOutcome {
    pub success: bool,
    pub message: String,
    pub details: ImportTotals,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<String>,
}

// ==========================================
// 行级失败
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RowErrorKind {
    DimensionResolution,
    Integrity,
    BusinessRule,
}

impl RowErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RowErrorKind::DimensionResolution => "DIMENSION_RESOLUTION",
            RowErrorKind::Integrity => "INTEGRITY",
            RowErrorKind::BusinessRule => "BUSINESS_RULE",
        }
    }
}

/// 单行失败记录（行号为 1-based 源文件行号，已计入表头偏移）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowFailure {
    pub row_number: usize,
    pub kind: RowErrorKind,
    pub detail: String,
}

// ==========================================
// ImportBatch - 导入批次诊断记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportBatch {
    pub batch_id: String,
    pub mode: ImportMode,
    pub commit_mode: CommitMode,
    pub file_name: Option<String>,
    pub total_rows: usize,
    pub duplicate_rows: usize,
    pub success_rows: usize,
    pub error_rows: usize,
    pub warning_count: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed_ms: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parse() {
        assert_eq!("CASE".parse::<ImportMode>().unwrap(), ImportMode::Case);
        assert_eq!("roster".parse::<ImportMode>().unwrap(), ImportMode::Roster);
        assert!("materials".parse::<ImportMode>().is_err());
    }

    #[test]
    fn test_commit_mode_parse() {
        assert_eq!("per-row".parse::<CommitMode>().unwrap(), CommitMode::PerRow);
        assert_eq!("batch".parse::<CommitMode>().unwrap(), CommitMode::Batch);
        assert_eq!(CommitMode::default(), CommitMode::PerRow);
    }

    #[test]
    fn test_outcome_serializes_details() {
        let outcome = ImportOutcome {
            success: true,
            message: "ok".to_string(),
            details: ImportTotals {
                total_rows: 3,
                success_count: 2,
                error_count: 1,
            },
            batch_id: None,
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["details"]["total_rows"], 3);
        assert_eq!(json["details"]["error_count"], 1);
        assert!(json.get("batch_id").is_none());
    }
}
