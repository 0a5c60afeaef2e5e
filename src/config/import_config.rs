// ==========================================
// 宪兵纪律案卷导入系统 - 导入配置快照
// ==========================================
// 一次导入开始时读取一次，整个批次内不变
// ==========================================

use crate::config::import_config_trait::ImportConfigReader;
use crate::domain::import::CommitMode;
use crate::importer::error::ImportResult;
use serde::{Deserialize, Serialize};

pub const DEFAULT_NUMERIC_DEFAULT: i64 = 0;
pub const DEFAULT_PENDING_STATUSES: &[&str] = &["EN ATTENTE", "EN COURS"];
pub const DEFAULT_SANCTIONED_STATUS: &str = "SANCTIONNE";
pub const DEFAULT_PENDING_SANCTION_LABEL: &str = "EN ATTENTE";
pub const DEFAULT_SEVERE_SANCTION_MARKER: &str = "RADIATION";
pub const DEFAULT_HEADER_ROWS: usize = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportConfig {
    pub numeric_default: i64,
    pub pending_statuses: Vec<String>,
    pub sanctioned_status: String,
    pub pending_sanction_label: String,
    pub severe_sanction_marker: String,
    pub header_rows: usize,
    pub commit_mode: CommitMode,
    pub roster_reference_year: Option<i32>,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            numeric_default: DEFAULT_NUMERIC_DEFAULT,
            pending_statuses: DEFAULT_PENDING_STATUSES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            sanctioned_status: DEFAULT_SANCTIONED_STATUS.to_string(),
            pending_sanction_label: DEFAULT_PENDING_SANCTION_LABEL.to_string(),
            severe_sanction_marker: DEFAULT_SEVERE_SANCTION_MARKER.to_string(),
            header_rows: DEFAULT_HEADER_ROWS,
            commit_mode: CommitMode::default(),
            roster_reference_year: None,
        }
    }
}

impl ImportConfig {
    /// 从配置读取器加载完整快照
    pub fn load(reader: &dyn ImportConfigReader) -> ImportResult<Self> {
        Ok(Self {
            numeric_default: reader.get_numeric_default()?,
            pending_statuses: reader.get_pending_statuses()?,
            sanctioned_status: reader.get_sanctioned_status()?,
            pending_sanction_label: reader.get_pending_sanction_label()?,
            severe_sanction_marker: reader.get_severe_sanction_marker()?,
            header_rows: reader.get_header_rows()?,
            commit_mode: reader.get_commit_mode()?,
            roster_reference_year: reader.get_roster_reference_year()?,
        })
    }

    pub fn with_commit_mode(mut self, commit_mode: CommitMode) -> Self {
        self.commit_mode = commit_mode;
        self
    }
}
