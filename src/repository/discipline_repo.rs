// ==========================================
// 宪兵纪律案卷导入系统 - 人员/案卷/处分 Repository
// ==========================================
// 职责: 事实表与诊断表的数据访问（使用 rusqlite）
// 红线: Repository 不含业务规则，只做数据 CRUD
// 说明: `*_tx` 系列在调用方给定的事务/保存点上执行，
//       实例方法走独立连接，供查询与统计使用
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::dimension::{Dimension, ResolvedKeys};
use crate::domain::discipline::{Dossier, DossierView, Gendarme, Sanction};
use crate::domain::import::{ImportBatch, RowErrorKind, RowFailure};
use crate::repository::dimension_repo::DimensionRepository;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

fn parse_row_error_kind(raw: &str) -> RowErrorKind {
    match raw.trim() {
        "DIMENSION_RESOLUTION" => RowErrorKind::DimensionResolution,
        "BUSINESS_RULE" => RowErrorKind::BusinessRule,
        _ => RowErrorKind::Integrity,
    }
}

fn text_conversion_error(idx: usize, msg: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::from(msg))
}

/// 各表行数快照
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableCounts {
    pub gendarme: i64,
    pub dossier: i64,
    pub sanction: i64,
    pub dimensions: BTreeMap<String, i64>,
}

impl TableCounts {
    /// 六类表族（十个维度 + 三个实体）是否全部为空
    pub fn is_empty(&self) -> bool {
        self.gendarme == 0
            && self.dossier == 0
            && self.sanction == 0
            && self.dimensions.values().all(|c| *c == 0)
    }
}

// ==========================================
// DisciplineRepository
// ==========================================
pub struct DisciplineRepository {
    conn: Arc<Mutex<Connection>>,
}

impl DisciplineRepository {
    /// 创建新的 Repository 实例
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn lock(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ===== 事务内写入 =====

    /// 按 matricule upsert 人员（冲突时覆盖全部字段）
    ///
    /// 使用 ON CONFLICT DO UPDATE 而非 INSERT OR REPLACE：
    /// 后者会先删除旧行，破坏已有案卷对该人员的外键引用
    pub fn upsert_gendarme_tx(conn: &Connection, person: &Gendarme) -> RepositoryResult<()> {
        conn.execute(
            r#"
            INSERT INTO gendarme (
                matricule, full_name, sex, birth_date, birth_place, age,
                service_entry_date, years_of_service, children_count, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ON CONFLICT(matricule) DO UPDATE SET
                full_name = excluded.full_name,
                sex = excluded.sex,
                birth_date = excluded.birth_date,
                birth_place = excluded.birth_place,
                age = excluded.age,
                service_entry_date = excluded.service_entry_date,
                years_of_service = excluded.years_of_service,
                children_count = excluded.children_count,
                updated_at = excluded.updated_at
            "#,
            params![
                person.matricule,
                person.full_name,
                person.sex,
                person.birth_date,
                person.birth_place,
                person.age,
                person.service_entry_date,
                person.years_of_service,
                person.children_count,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// 插入处分行，返回 sanction_id
    pub fn insert_sanction_tx(conn: &Connection, sanction: &Sanction) -> RepositoryResult<i64> {
        conn.execute(
            r#"
            INSERT INTO sanction (
                sanction_type_id, rate, decision_number, order_number,
                radiation_year, statute_reference, committee
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                sanction.sanction_type_id,
                sanction.rate,
                sanction.decision_number,
                sanction.order_number,
                sanction.radiation_year,
                sanction.statute_reference,
                sanction.committee,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// 插入案卷行（挂接 sanction_id），返回 dossier_id
    pub fn insert_dossier_tx(
        conn: &Connection,
        dossier: &Dossier,
        sanction_id: i64,
        batch_id: Option<&str>,
    ) -> RepositoryResult<i64> {
        let keys = &dossier.keys;
        conn.execute(
            r#"
            INSERT INTO dossier (
                reference, source_dossier_id, punishment_year, order_sequence,
                year_sequence, registration_date, incident_date, incident_year,
                description, matricule, grade_id, marital_status_id, unit_id,
                legion_id, subdivision_id, region_id, fault_type_id, category_id,
                case_status_id, sanction_type_id, sanction_id, batch_id, created_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12,
                ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23
            )
            "#,
            params![
                dossier.reference,
                dossier.source_dossier_id,
                dossier.punishment_year,
                dossier.order_sequence,
                dossier.year_sequence,
                dossier.registration_date,
                dossier.incident_date,
                dossier.incident_year,
                dossier.description,
                dossier.matricule,
                keys.grade_id,
                keys.marital_status_id,
                keys.unit_id,
                keys.legion_id,
                keys.subdivision_id,
                keys.region_id,
                keys.fault_type_id,
                keys.category_id,
                keys.case_status_id,
                keys.sanction_type_id,
                sanction_id,
                batch_id,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// 记录行级失败（诊断用）
    pub fn insert_row_error_tx(
        conn: &Connection,
        batch_id: &str,
        failure: &RowFailure,
        raw_data: &serde_json::Value,
    ) -> RepositoryResult<()> {
        conn.execute(
            r#"
            INSERT INTO import_row_error (batch_id, row_number, kind, detail, raw_data, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                batch_id,
                failure.row_number as i64,
                failure.kind.as_str(),
                failure.detail,
                serde_json::to_string(raw_data)?,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// 记录导入批次
    pub fn insert_batch_tx(conn: &Connection, batch: &ImportBatch) -> RepositoryResult<()> {
        conn.execute(
            r#"
            INSERT INTO import_batch (
                batch_id, mode, commit_mode, file_name, total_rows, duplicate_rows,
                success_rows, error_rows, warning_count, started_at, finished_at, elapsed_ms
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
            params![
                batch.batch_id,
                batch.mode.as_str(),
                batch.commit_mode.as_str(),
                batch.file_name,
                batch.total_rows as i64,
                batch.duplicate_rows as i64,
                batch.success_rows as i64,
                batch.error_rows as i64,
                batch.warning_count as i64,
                batch.started_at,
                batch.finished_at,
                batch.elapsed_ms,
            ],
        )?;
        Ok(())
    }

    /// 统计各表行数（事务内可用）
    pub fn table_counts_tx(conn: &Connection) -> RepositoryResult<TableCounts> {
        let count = |table: &str| -> RepositoryResult<i64> {
            Ok(conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                row.get(0)
            })?)
        };

        let mut dimensions = BTreeMap::new();
        for dimension in Dimension::ALL {
            dimensions.insert(
                dimension.table_name().to_string(),
                DimensionRepository::count(conn, dimension)?,
            );
        }

        Ok(TableCounts {
            gendarme: count("gendarme")?,
            dossier: count("dossier")?,
            sanction: count("sanction")?,
            dimensions,
        })
    }

    // ===== 查询 =====

    pub fn table_counts(&self) -> RepositoryResult<TableCounts> {
        let conn = self.lock()?;
        Self::table_counts_tx(&conn)
    }

    pub fn list_dimension(&self, dimension: Dimension) -> RepositoryResult<Vec<(i64, String)>> {
        let conn = self.lock()?;
        DimensionRepository::list(&conn, dimension)
    }

    /// 按 matricule 查询人员
    pub fn find_gendarme(&self, matricule: &str) -> RepositoryResult<Option<Gendarme>> {
        let conn = self.lock()?;
        let person = conn
            .query_row(
                r#"
                SELECT matricule, full_name, sex, birth_date, birth_place, age,
                       service_entry_date, years_of_service, children_count
                FROM gendarme WHERE matricule = ?1
                "#,
                params![matricule],
                |row| {
                    Ok(Gendarme {
                        matricule: row.get(0)?,
                        full_name: row.get(1)?,
                        sex: row.get(2)?,
                        birth_date: row.get(3)?,
                        birth_place: row.get(4)?,
                        age: row.get(5)?,
                        service_entry_date: row.get(6)?,
                        years_of_service: row.get(7)?,
                        children_count: row.get(8)?,
                    })
                },
            )
            .optional()?;
        Ok(person)
    }

    /// 查询某人员名下全部案卷（按 dossier_id 升序）
    pub fn list_dossiers_by_matricule(&self, matricule: &str) -> RepositoryResult<Vec<DossierView>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT d.dossier_id, d.reference, d.matricule, cs.label, st.label, u.label,
                   s.rate, s.decision_number, s.order_number
            FROM dossier d
            JOIN sanction s ON s.sanction_id = d.sanction_id
            LEFT JOIN case_status cs ON cs.id = d.case_status_id
            LEFT JOIN sanction_type st ON st.id = d.sanction_type_id
            LEFT JOIN unit u ON u.id = d.unit_id
            WHERE d.matricule = ?1
            ORDER BY d.dossier_id
            "#,
        )?;
        let rows = stmt
            .query_map(params![matricule], |row| {
                Ok(DossierView {
                    dossier_id: row.get(0)?,
                    reference: row.get(1)?,
                    matricule: row.get(2)?,
                    case_status: row.get(3)?,
                    sanction_type: row.get(4)?,
                    unit: row.get(5)?,
                    rate: row.get(6)?,
                    decision_number: row.get(7)?,
                    order_number: row.get(8)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// 查询最近的导入批次
    pub fn recent_batches(&self, limit: usize) -> RepositoryResult<Vec<ImportBatch>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT batch_id, mode, commit_mode, file_name, total_rows, duplicate_rows,
                   success_rows, error_rows, warning_count, started_at, finished_at, elapsed_ms
            FROM import_batch
            ORDER BY started_at DESC
            LIMIT ?1
            "#,
        )?;
        let rows = stmt
            .query_map(params![limit as i64], |row| {
                let mode: String = row.get(1)?;
                let commit_mode: String = row.get(2)?;
                Ok(ImportBatch {
                    batch_id: row.get(0)?,
                    mode: mode.parse().map_err(|e| text_conversion_error(1, e))?,
                    commit_mode: commit_mode
                        .parse()
                        .map_err(|e| text_conversion_error(2, e))?,
                    file_name: row.get(3)?,
                    total_rows: row.get::<_, i64>(4)? as usize,
                    duplicate_rows: row.get::<_, i64>(5)? as usize,
                    success_rows: row.get::<_, i64>(6)? as usize,
                    error_rows: row.get::<_, i64>(7)? as usize,
                    warning_count: row.get::<_, i64>(8)? as usize,
                    started_at: row.get(9)?,
                    finished_at: row.get(10)?,
                    elapsed_ms: row.get(11)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// 查询某批次的行级失败（按行号升序）
    pub fn row_errors_by_batch(&self, batch_id: &str) -> RepositoryResult<Vec<RowFailure>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT row_number, kind, detail FROM import_row_error
            WHERE batch_id = ?1
            ORDER BY row_number
            "#,
        )?;
        let rows = stmt
            .query_map(params![batch_id], |row| {
                let kind: String = row.get(1)?;
                Ok(RowFailure {
                    row_number: row.get::<_, i64>(0)? as usize,
                    kind: parse_row_error_kind(&kind),
                    detail: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
