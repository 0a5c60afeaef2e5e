// ==========================================
// 宪兵纪律案卷导入系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为（外键每个连接单独开启）
// - 统一 busy_timeout
// - 幂等建表（不做迁移）
// ==========================================

use crate::domain::dimension::Dimension;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 打开内存库并建表（测试 / 试运行）
pub fn open_in_memory() -> rusqlite::Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure_sqlite_connection(&conn)?;
    init_schema(&conn)?;
    Ok(conn)
}

// 事实表与诊断表；维度表由 dimension_table_ddl 逐个生成
const FACT_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS config_kv (
    scope_id TEXT NOT NULL DEFAULT 'global',
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (scope_id, key)
);

CREATE TABLE IF NOT EXISTS gendarme (
    matricule TEXT PRIMARY KEY,
    full_name TEXT,
    sex TEXT,
    birth_date TEXT,
    birth_place TEXT,
    age INTEGER NOT NULL DEFAULT 0,
    service_entry_date TEXT,
    years_of_service INTEGER NOT NULL DEFAULT 0,
    children_count INTEGER NOT NULL DEFAULT 0,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS sanction (
    sanction_id INTEGER PRIMARY KEY AUTOINCREMENT,
    sanction_type_id INTEGER REFERENCES sanction_type(id),
    rate INTEGER,
    decision_number TEXT,
    order_number TEXT,
    radiation_year INTEGER,
    statute_reference TEXT,
    committee TEXT
);

-- reference 不设唯一约束：重复导入会累积案卷行
CREATE TABLE IF NOT EXISTS dossier (
    dossier_id INTEGER PRIMARY KEY AUTOINCREMENT,
    reference TEXT NOT NULL,
    source_dossier_id TEXT,
    punishment_year INTEGER NOT NULL DEFAULT 0,
    order_sequence INTEGER,
    year_sequence INTEGER,
    registration_date TEXT,
    incident_date TEXT,
    incident_year INTEGER NOT NULL DEFAULT 0,
    description TEXT,
    matricule TEXT NOT NULL REFERENCES gendarme(matricule),
    grade_id INTEGER REFERENCES grade(id),
    marital_status_id INTEGER REFERENCES marital_status(id),
    unit_id INTEGER REFERENCES unit(id),
    legion_id INTEGER REFERENCES legion(id),
    subdivision_id INTEGER REFERENCES subdivision(id),
    region_id INTEGER REFERENCES region(id),
    fault_type_id INTEGER REFERENCES fault_type(id),
    category_id INTEGER REFERENCES category(id),
    case_status_id INTEGER REFERENCES case_status(id),
    sanction_type_id INTEGER REFERENCES sanction_type(id),
    sanction_id INTEGER NOT NULL REFERENCES sanction(sanction_id),
    batch_id TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS dossier_reference_idx ON dossier(reference);
CREATE INDEX IF NOT EXISTS dossier_matricule_idx ON dossier(matricule);

CREATE TABLE IF NOT EXISTS import_batch (
    batch_id TEXT PRIMARY KEY,
    mode TEXT NOT NULL,
    commit_mode TEXT NOT NULL,
    file_name TEXT,
    total_rows INTEGER NOT NULL,
    duplicate_rows INTEGER NOT NULL,
    success_rows INTEGER NOT NULL,
    error_rows INTEGER NOT NULL,
    warning_count INTEGER NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT NOT NULL,
    elapsed_ms INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS import_row_error (
    error_id INTEGER PRIMARY KEY AUTOINCREMENT,
    batch_id TEXT NOT NULL,
    row_number INTEGER NOT NULL,
    kind TEXT NOT NULL,
    detail TEXT NOT NULL,
    raw_data TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS import_row_error_batch_idx ON import_row_error(batch_id);
"#;

/// 单个维度表 DDL: (id, label)
fn dimension_table_ddl(dimension: Dimension) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    id INTEGER PRIMARY KEY AUTOINCREMENT,\n    label TEXT NOT NULL UNIQUE\n);",
        dimension.table_name()
    )
}

/// 幂等建表并登记 schema_version
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    let mut ddl = String::new();
    for dimension in Dimension::ALL {
        ddl.push_str(&dimension_table_ddl(dimension));
        ddl.push('\n');
    }
    ddl.push_str(FACT_SCHEMA);
    conn.execute_batch(&ddl)?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_schema_is_idempotent() {
        let conn = open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));
    }

    #[test]
    fn test_all_dimension_tables_created() {
        let conn = open_in_memory().unwrap();
        for dimension in Dimension::ALL {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                    [dimension.table_name()],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "missing table {}", dimension);
        }
    }

    #[test]
    fn test_foreign_keys_enabled() {
        let conn = open_in_memory().unwrap();
        let fk: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fk, 1);
    }

    #[test]
    fn test_schema_version_absent_on_blank_db() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), None);
    }
}
