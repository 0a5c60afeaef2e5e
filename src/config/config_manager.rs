// ==========================================
// 宪兵纪律案卷导入系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写
// 存储: config_kv 表 (scope_id + key → value)
// ==========================================

use crate::config::import_config::{
    ImportConfig, DEFAULT_HEADER_ROWS, DEFAULT_NUMERIC_DEFAULT, DEFAULT_PENDING_SANCTION_LABEL,
    DEFAULT_PENDING_STATUSES, DEFAULT_SANCTIONED_STATUS, DEFAULT_SEVERE_SANCTION_MARKER,
};
use crate::config::import_config_trait::ImportConfigReader;
use crate::db::open_sqlite_connection;
use crate::domain::import::CommitMode;
use crate::importer::error::{ImportError, ImportResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

/// 配置键
pub mod config_keys {
    pub const NUMERIC_DEFAULT: &str = "import/numeric_default";
    pub const PENDING_STATUSES: &str = "import/pending_statuses";
    pub const SANCTIONED_STATUS: &str = "import/sanctioned_status";
    pub const PENDING_SANCTION_LABEL: &str = "import/pending_sanction_label";
    pub const SEVERE_SANCTION_MARKER: &str = "import/severe_sanction_marker";
    pub const HEADER_ROWS: &str = "import/header_rows";
    pub const COMMIT_MODE: &str = "import/commit_mode";
    pub const ROSTER_REFERENCE_YEAR: &str = "import/roster_reference_year";
}

const GLOBAL_SCOPE: &str = "global";

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
    /// 待写入的键值，读取时优先于 config_kv（写前校验用）
    pending: Option<(String, String)>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    pub fn new(db_path: &str) -> ImportResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| ImportError::DatabaseConnectionError(e.to_string()))?;
        crate::db::init_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            pending: None,
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ImportResult<Self> {
        {
            let guard = Self::lock_conn(&conn)?;
            crate::db::configure_sqlite_connection(&guard)?;
        }
        Ok(Self {
            conn,
            pending: None,
        })
    }

    fn lock_conn(conn: &Arc<Mutex<Connection>>) -> ImportResult<MutexGuard<'_, Connection>> {
        conn.lock()
            .map_err(|e| ImportError::InternalError(format!("锁获取失败: {}", e)))
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    fn get_config_value(&self, key: &str) -> ImportResult<Option<String>> {
        if let Some((pending_key, pending_value)) = &self.pending {
            if pending_key == key {
                return Ok(Some(pending_value.clone()));
            }
        }
        let conn = Self::lock_conn(&self.conn)?;
        conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
            params![GLOBAL_SCOPE, key],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .map_err(|e| ImportError::ConfigReadError {
            key: key.to_string(),
            message: e.to_string(),
        })
    }

    /// 读取 global scope 的配置值（公开方法，供其他模块复用）
    pub fn get_global_config_value(&self, key: &str) -> ImportResult<Option<String>> {
        self.get_config_value(key)
    }

    /// 写入 global scope 配置（覆盖已有值）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> ImportResult<()> {
        let conn = Self::lock_conn(&self.conn)?;
        conn.execute(
            r#"
            INSERT INTO config_kv (scope_id, key, value, updated_at)
            VALUES (?1, ?2, ?3, datetime('now'))
            ON CONFLICT(scope_id, key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
            params![GLOBAL_SCOPE, key, value],
        )?;
        Ok(())
    }

    /// 校验后写入导入配置：新值与现有配置能组成完整快照才落库
    ///
    /// 校验失败时返回 ConfigValueError，已存储的值保持不变。
    pub fn set_import_config_value(&self, key: &str, value: &str) -> ImportResult<ImportConfig> {
        let candidate = ConfigManager {
            conn: Arc::clone(&self.conn),
            pending: Some((key.to_string(), value.to_string())),
        };
        let config = ImportConfig::load(&candidate)?;
        self.set_global_config_value(key, value)?;
        Ok(config)
    }

    /// 获取全部 global 配置（调试/导出用）
    pub fn get_all_global(&self) -> ImportResult<HashMap<String, String>> {
        let conn = Self::lock_conn(&self.conn)?;
        let mut stmt = conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = ?1")?;
        let map = stmt
            .query_map(params![GLOBAL_SCOPE], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<HashMap<String, String>, _>>()?;
        Ok(map)
    }

    /// 读取文本配置，缺失或空白时取默认值
    fn get_text_or_default(&self, key: &str, default: &str) -> ImportResult<String> {
        Ok(self
            .get_config_value(key)?
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| default.to_string()))
    }

    /// 读取并解析配置，缺失时取默认值，格式错误返回 ConfigValueError
    fn get_parsed_or_default<T>(&self, key: &str, default: T) -> ImportResult<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get_config_value(key)? {
            None => Ok(default),
            Some(raw) if raw.trim().is_empty() => Ok(default),
            Some(raw) => raw
                .trim()
                .parse::<T>()
                .map_err(|e| ImportError::ConfigValueError {
                    key: key.to_string(),
                    value: raw.clone(),
                    message: e.to_string(),
                }),
        }
    }
}

impl ImportConfigReader for ConfigManager {
    fn get_numeric_default(&self) -> ImportResult<i64> {
        self.get_parsed_or_default(config_keys::NUMERIC_DEFAULT, DEFAULT_NUMERIC_DEFAULT)
    }

    fn get_pending_statuses(&self) -> ImportResult<Vec<String>> {
        let statuses = match self.get_config_value(config_keys::PENDING_STATUSES)? {
            Some(raw) if !raw.trim().is_empty() => raw
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            _ => DEFAULT_PENDING_STATUSES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        };
        Ok(statuses)
    }

    fn get_sanctioned_status(&self) -> ImportResult<String> {
        self.get_text_or_default(config_keys::SANCTIONED_STATUS, DEFAULT_SANCTIONED_STATUS)
    }

    fn get_pending_sanction_label(&self) -> ImportResult<String> {
        self.get_text_or_default(
            config_keys::PENDING_SANCTION_LABEL,
            DEFAULT_PENDING_SANCTION_LABEL,
        )
    }

    fn get_severe_sanction_marker(&self) -> ImportResult<String> {
        self.get_text_or_default(
            config_keys::SEVERE_SANCTION_MARKER,
            DEFAULT_SEVERE_SANCTION_MARKER,
        )
    }

    fn get_header_rows(&self) -> ImportResult<usize> {
        self.get_parsed_or_default(config_keys::HEADER_ROWS, DEFAULT_HEADER_ROWS)
    }

    fn get_commit_mode(&self) -> ImportResult<CommitMode> {
        self.get_parsed_or_default(config_keys::COMMIT_MODE, CommitMode::default())
    }

    fn get_roster_reference_year(&self) -> ImportResult<Option<i32>> {
        match self.get_config_value(config_keys::ROSTER_REFERENCE_YEAR)? {
            None => Ok(None),
            Some(raw) if raw.trim().is_empty() => Ok(None),
            Some(raw) => raw
                .trim()
                .parse::<i32>()
                .map(Some)
                .map_err(|e| ImportError::ConfigValueError {
                    key: config_keys::ROSTER_REFERENCE_YEAR.to_string(),
                    value: raw.clone(),
                    message: e.to_string(),
                }),
        }
    }
}
