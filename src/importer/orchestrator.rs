// ==========================================
// 宪兵纪律案卷导入系统 - 导入编排器
// ==========================================
// 状态机: Idle → Validating → (失败 → Aborted) | (通过 → Processing) → Completed
// 流程: 列校验（快速失败）→ 去重 → 逐行 [转换 → 维度解析 → 组装 → 落库] → 进度回调
// 红线:
// - 列校验失败时不写任何表（含诊断表）
// - 行级失败只影响当前行，按 1-based 源文件行号记录
// - success_count + error_count == total_rows（去重后）
// ==========================================

use crate::config::{ImportConfig, ImportConfigReader};
use crate::domain::discipline::RowIds;
use crate::domain::import::{
    ImportBatch, ImportMode, ImportOutcome, ImportProgress, ImportState, ImportTotals, RowFailure,
};
use crate::importer::column_validator::{ColumnValidator, HeaderMap};
use crate::importer::dimension_registry::DimensionRegistry;
use crate::importer::error::{ImportError, ImportResult, RowError};
use crate::importer::field_transformer::FieldTransformer;
use crate::importer::file_parser::{FileParser, ParsedSheet, SourceRow, UniversalFileParser};
use crate::importer::loader::{BatchScope, Loader};
use crate::importer::progress::ProgressSink;
use crate::importer::record_builder::RecordBuilder;
use crate::repository::discipline_repo::DisciplineRepository;
use chrono::{Datelike, Local, NaiveDate, Utc};
use rusqlite::Connection;
use std::collections::HashSet;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// 单行处理上下文（批次内不变部分）
struct RowContext<'a> {
    mode: ImportMode,
    header_map: &'a HeaderMap,
    reference_year: i32,
    today: NaiveDate,
}

// ==========================================
// ImportOrchestrator
// ==========================================
pub struct ImportOrchestrator {
    config: ImportConfig,
    state: ImportState,
    validator: ColumnValidator,
    transformer: FieldTransformer,
    builder: RecordBuilder,
}

impl ImportOrchestrator {
    pub fn new(config: ImportConfig) -> Self {
        Self {
            transformer: FieldTransformer::new(config.numeric_default),
            builder: RecordBuilder::new(&config),
            validator: ColumnValidator,
            state: ImportState::Idle,
            config,
        }
    }

    /// 从配置读取器加载配置快照后创建
    pub fn from_reader(reader: &dyn ImportConfigReader) -> ImportResult<Self> {
        Ok(Self::new(ImportConfig::load(reader)?))
    }

    pub fn state(&self) -> ImportState {
        self.state
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// 解析文件后执行导入
    pub fn import_file(
        &mut self,
        conn: &mut Connection,
        mode: ImportMode,
        file_path: &Path,
        sink: &mut dyn ProgressSink,
    ) -> ImportResult<ImportOutcome> {
        debug!(file = %file_path.display(), "解析文件");
        let sheet = UniversalFileParser.parse(file_path)?;
        let file_name = file_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());
        self.run(conn, mode, sheet, file_name.as_deref(), sink)
    }

    /// 执行一次导入
    ///
    /// 列校验失败返回 `success = false` 且不触碰数据库；
    /// 只有连接/事务级故障才返回 `Err`
    #[instrument(skip(self, conn, sheet, sink), fields(mode = %mode, batch_id))]
    pub fn run(
        &mut self,
        conn: &mut Connection,
        mode: ImportMode,
        sheet: ParsedSheet,
        file_name: Option<&str>,
        sink: &mut dyn ProgressSink,
    ) -> ImportResult<ImportOutcome> {
        self.state = ImportState::Validating;
        let header_map = match self.validator.validate(mode, &sheet.headers) {
            Ok(map) => map,
            Err(e) => {
                self.state = ImportState::Aborted;
                error!(missing = ?e.missing, "列校验失败，导入中止");
                return Ok(ImportOutcome {
                    success: false,
                    message: e.to_string(),
                    details: ImportTotals::default(),
                    batch_id: None,
                });
            }
        };

        let parsed_rows = sheet.rows.len();
        let rows = dedup_rows(sheet.rows);
        let duplicate_rows = parsed_rows - rows.len();

        let batch_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("batch_id", batch_id.as_str());
        let started_at = Utc::now();
        let timer = Instant::now();

        info!(
            total_rows = rows.len(),
            duplicate_rows,
            commit_mode = self.config.commit_mode.as_str(),
            "开始导入"
        );

        self.state = ImportState::Processing;
        let ctx = RowContext {
            mode,
            header_map: &header_map,
            reference_year: self
                .config
                .roster_reference_year
                .unwrap_or_else(|| Local::now().year()),
            today: Local::now().date_naive(),
        };

        let mut scope = BatchScope::begin(conn, self.config.commit_mode)
            .map_err(|e| ImportError::DatabaseTransactionError(e.to_string()))?;
        let mut registry = DimensionRegistry::new();
        let loader = Loader::new(Some(batch_id.clone()));

        let mut totals = ImportTotals {
            total_rows: rows.len(),
            ..ImportTotals::default()
        };
        let mut warning_count = 0usize;
        let mut failures: Vec<(RowFailure, serde_json::Value)> = Vec::new();

        for (idx, source) in rows.iter().enumerate() {
            let row_number = source.data_index + self.config.header_rows + 1;
            let row_scope = scope.begin_row()?;

            let result = self.process_row(
                &ctx,
                &mut registry,
                &loader,
                row_scope.conn(),
                source,
                idx + 1,
                &mut warning_count,
            );

            let result = match result {
                Ok(ids) => row_scope
                    .commit()
                    .map(|_| ids)
                    .map_err(|e| RowError::Integrity(e.into())),
                Err(err) => {
                    row_scope.rollback()?;
                    Err(err)
                }
            };

            match result {
                Ok(ids) => {
                    registry.commit_staged();
                    totals.success_count += 1;
                    debug!(row_number, dossier_id = ids.dossier_id, "行导入成功");
                }
                Err(err) => {
                    registry.discard_staged();
                    totals.error_count += 1;
                    let failure = RowFailure {
                        row_number,
                        kind: err.kind(),
                        detail: err.to_string(),
                    };
                    warn!(
                        row_number,
                        kind = failure.kind.as_str(),
                        error = %failure.detail,
                        "行导入失败，已跳过"
                    );
                    failures.push((failure, raw_row_json(&sheet.headers, source)));
                }
            }

            sink.on_progress(ImportProgress {
                total_rows: totals.total_rows,
                success_count: totals.success_count,
                error_count: totals.error_count,
            });
        }

        let batch = ImportBatch {
            batch_id: batch_id.clone(),
            mode,
            commit_mode: self.config.commit_mode,
            file_name: file_name.map(str::to_string),
            total_rows: totals.total_rows,
            duplicate_rows,
            success_rows: totals.success_count,
            error_rows: totals.error_count,
            warning_count,
            started_at,
            finished_at: Utc::now(),
            elapsed_ms: i64::try_from(timer.elapsed().as_millis()).unwrap_or(i64::MAX),
        };
        if let Err(e) = write_diagnostics(&mut scope, &batch, &failures) {
            warn!(error = %e, "导入诊断记录写入失败");
        }

        scope
            .finish()
            .map_err(|e| ImportError::DatabaseTransactionError(e.to_string()))?;
        self.state = ImportState::Completed;

        info!(
            success = totals.success_count,
            errors = totals.error_count,
            warnings = warning_count,
            new_labels = registry.cached_labels(),
            elapsed_ms = batch.elapsed_ms,
            "导入完成"
        );

        Ok(ImportOutcome {
            success: true,
            message: format!(
                "导入完成: 共 {} 行，成功 {} 行，失败 {} 行",
                totals.total_rows, totals.success_count, totals.error_count
            ),
            details: totals,
            batch_id: Some(batch_id),
        })
    }

    /// 单行: 转换 → 维度解析 → 组装 → 落库
    #[allow(clippy::too_many_arguments)]
    fn process_row(
        &self,
        ctx: &RowContext<'_>,
        registry: &mut DimensionRegistry,
        loader: &Loader,
        conn: &Connection,
        source: &SourceRow,
        sequence: usize,
        warning_count: &mut usize,
    ) -> Result<RowIds, RowError> {
        let record = match ctx.mode {
            ImportMode::Case => {
                let transformed = self.transformer.transform_case(ctx.header_map, source);
                *warning_count += transformed.warnings.len();
                let plan = self.builder.plan_sanction(&transformed.row)?;
                let keys = registry.resolve_case_keys(
                    conn,
                    &transformed.row,
                    plan.sanction_type.as_deref(),
                )?;
                self.builder.build_case(&transformed.row, plan, keys)?
            }
            ImportMode::Roster => {
                let transformed = self.transformer.transform_roster(ctx.header_map, source);
                *warning_count += transformed.warnings.len();
                self.builder.build_roster(
                    &transformed.row,
                    sequence,
                    ctx.reference_year,
                    ctx.today,
                )?
            }
        };
        loader.load_row(conn, &record)
    }
}

/// 去重：完全相同的行只保留第一次出现
fn dedup_rows(rows: Vec<SourceRow>) -> Vec<SourceRow> {
    let mut seen = HashSet::new();
    rows.into_iter()
        .filter(|row| seen.insert(row.dedup_key()))
        .collect()
}

/// 原始行转 JSON（列名 → 单元格文本），用于诊断
fn raw_row_json(headers: &[String], source: &SourceRow) -> serde_json::Value {
    let map: serde_json::Map<String, serde_json::Value> = headers
        .iter()
        .enumerate()
        .filter(|(_, header)| !header.is_empty())
        .map(|(idx, header)| {
            (
                header.clone(),
                serde_json::Value::String(source.cell(idx).canonical_text()),
            )
        })
        .collect();
    serde_json::Value::Object(map)
}

/// 批次记录与失败行明细同进同退
fn write_diagnostics(
    scope: &mut BatchScope<'_>,
    batch: &ImportBatch,
    failures: &[(RowFailure, serde_json::Value)],
) -> ImportResult<()> {
    let unit = scope.begin_row()?;
    match record_diagnostics(unit.conn(), batch, failures) {
        Ok(()) => {
            unit.commit()?;
            Ok(())
        }
        Err(e) => {
            unit.rollback()?;
            Err(e)
        }
    }
}

fn record_diagnostics(
    conn: &Connection,
    batch: &ImportBatch,
    failures: &[(RowFailure, serde_json::Value)],
) -> ImportResult<()> {
    DisciplineRepository::insert_batch_tx(conn, batch)?;
    for (failure, raw) in failures {
        DisciplineRepository::insert_row_error_tx(conn, &batch.batch_id, failure, raw)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dimension::Dimension;
    use crate::domain::import::CommitMode;
    use crate::importer::column_validator::{case_columns, roster_columns};
    use crate::importer::file_parser::CellValue;
    use crate::importer::progress::NoProgress;
    use crate::repository::dimension_repo::DimensionRepository;

    fn sheet(columns: &[&str], rows: Vec<Vec<(&str, &str)>>) -> ParsedSheet {
        let headers: Vec<String> = columns.iter().map(|c| c.to_string()).collect();
        let rows = rows
            .into_iter()
            .enumerate()
            .map(|(data_index, values)| {
                let mut cells = vec![CellValue::Empty; headers.len()];
                for (column, value) in values {
                    let idx = headers.iter().position(|h| h == column).unwrap();
                    cells[idx] = CellValue::Text(value.to_string());
                }
                SourceRow { data_index, cells }
            })
            .collect();
        ParsedSheet { headers, rows }
    }

    fn case_row<'a>(
        reference: &'a str,
        matricule: &'a str,
        status: &'a str,
        sanction: &'a str,
    ) -> Vec<(&'a str, &'a str)> {
        vec![
            ("REFERENCE", reference),
            ("MLE", matricule),
            ("NOM ET PRENOMS", "KOUADIO ALAIN"),
            ("UNITE", "BDE COCODY"),
            ("STATUT DOSSIER", status),
            ("TYPE SANCTION", sanction),
            ("TAUX (JAR)", "10"),
            ("AGE", "inconnu"),
        ]
    }

    fn count(conn: &Connection, table: &str) -> i64 {
        conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn test_three_rows_with_one_business_rule_failure() {
        let mut conn = crate::db::open_in_memory().unwrap();
        let mut orchestrator = ImportOrchestrator::new(ImportConfig::default());
        let data = sheet(
            case_columns::REQUIRED,
            vec![
                case_row("1/2024", "M001", "SANCTIONNE", "BLAME"),
                case_row("2/2024", "M002", "SANCTIONNE", ""),
                case_row("3/2024", "M003", "EN ATTENTE", ""),
            ],
        );

        let mut calls = Vec::new();
        let mut sink = |p: ImportProgress| calls.push(p);
        let outcome = orchestrator
            .run(&mut conn, ImportMode::Case, data, Some("cases.csv"), &mut sink)
            .unwrap();

        assert!(outcome.success);
        assert_eq!(outcome.details.total_rows, 3);
        assert_eq!(outcome.details.success_count, 2);
        assert_eq!(outcome.details.error_count, 1);
        assert_eq!(orchestrator.state(), ImportState::Completed);
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[2].error_count, 1);

        let repo = DisciplineRepository::from_connection(std::sync::Arc::new(
            std::sync::Mutex::new(conn),
        ));
        let batch_id = outcome.batch_id.unwrap();
        let failures = repo.row_errors_by_batch(&batch_id).unwrap();
        assert_eq!(failures.len(), 1);
        // 表头占 1 行，第二条数据位于源文件第 3 行
        assert_eq!(failures[0].row_number, 3);
    }

    #[test]
    fn test_shared_unit_label_creates_one_dimension_row() {
        let mut conn = crate::db::open_in_memory().unwrap();
        let mut orchestrator = ImportOrchestrator::new(ImportConfig::default());
        let data = sheet(
            case_columns::REQUIRED,
            vec![
                case_row("1/2024", "M001", "SANCTIONNE", "BLAME"),
                case_row("2/2024", "M002", "SANCTIONNE", "BLAME"),
            ],
        );
        orchestrator
            .run(&mut conn, ImportMode::Case, data, None, &mut NoProgress)
            .unwrap();

        assert_eq!(DimensionRepository::count(&conn, Dimension::Unit).unwrap(), 1);
        let distinct: i64 = conn
            .query_row("SELECT COUNT(DISTINCT unit_id) FROM dossier", [], |r| r.get(0))
            .unwrap();
        assert_eq!(distinct, 1);
    }

    #[test]
    fn test_validation_failure_touches_nothing() {
        let mut conn = crate::db::open_in_memory().unwrap();
        let mut orchestrator = ImportOrchestrator::new(ImportConfig::default());
        let data = sheet(roster_columns::REQUIRED, vec![vec![("MATRICULE", "M1")]]);

        let outcome = orchestrator
            .run(&mut conn, ImportMode::Case, data, None, &mut NoProgress)
            .unwrap();

        assert!(!outcome.success);
        assert_eq!(outcome.details, ImportTotals::default());
        assert_eq!(outcome.batch_id, None);
        assert!(outcome.message.contains("MLE"));
        assert_eq!(orchestrator.state(), ImportState::Aborted);
        assert!(DisciplineRepository::table_counts_tx(&conn).unwrap().is_empty());
        assert_eq!(count(&conn, "import_batch"), 0);
    }

    #[test]
    fn test_identical_rows_collapsed() {
        let mut conn = crate::db::open_in_memory().unwrap();
        let mut orchestrator = ImportOrchestrator::new(ImportConfig::default());
        let row = case_row("1/2024", "M001", "SANCTIONNE", "BLAME");
        let data = sheet(case_columns::REQUIRED, vec![row.clone(), row]);

        let outcome = orchestrator
            .run(&mut conn, ImportMode::Case, data, None, &mut NoProgress)
            .unwrap();
        assert_eq!(outcome.details.total_rows, 1);
        assert_eq!(count(&conn, "dossier"), 1);
    }

    #[test]
    fn test_batch_commit_mode_counts_match() {
        let mut conn = crate::db::open_in_memory().unwrap();
        let config = ImportConfig::default().with_commit_mode(CommitMode::Batch);
        let mut orchestrator = ImportOrchestrator::new(config);
        let data = sheet(
            case_columns::REQUIRED,
            vec![
                case_row("1/2024", "M001", "SANCTIONNE", "BLAME"),
                case_row("2/2024", "", "SANCTIONNE", "BLAME"),
                case_row("3/2024", "M003", "SANCTIONNE", "NOUVEAU TYPE"),
            ],
        );
        let outcome = orchestrator
            .run(&mut conn, ImportMode::Case, data, None, &mut NoProgress)
            .unwrap();

        let totals = outcome.details;
        assert_eq!(totals.success_count + totals.error_count, totals.total_rows);
        assert_eq!(totals.error_count, 1);
        assert_eq!(count(&conn, "dossier"), 2);
        assert_eq!(count(&conn, "import_batch"), 1);
    }

    #[test]
    fn test_failed_row_error_write_drops_batch_record() {
        let mut conn = crate::db::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TRIGGER reject_row_error BEFORE INSERT ON import_row_error
             BEGIN SELECT RAISE(ABORT, 'disk full'); END;",
        )
        .unwrap();
        let mut orchestrator = ImportOrchestrator::new(ImportConfig::default());
        let data = sheet(
            case_columns::REQUIRED,
            vec![
                case_row("1/2024", "M001", "SANCTIONNE", "BLAME"),
                case_row("2/2024", "M002", "SANCTIONNE", ""),
            ],
        );

        let outcome = orchestrator
            .run(&mut conn, ImportMode::Case, data, None, &mut NoProgress)
            .unwrap();

        // 诊断写入失败不影响已提交的数据行
        assert!(outcome.success);
        assert_eq!(outcome.details.success_count, 1);
        assert_eq!(count(&conn, "dossier"), 1);
        // 批次记录随失败行明细一起回滚
        assert_eq!(count(&conn, "import_batch"), 0);
        assert_eq!(count(&conn, "import_row_error"), 0);
    }

    #[test]
    fn test_roster_import_synthesizes_references() {
        let mut conn = crate::db::open_in_memory().unwrap();
        let mut config = ImportConfig::default();
        config.roster_reference_year = Some(2024);
        let mut orchestrator = ImportOrchestrator::new(config);
        let data = sheet(
            roster_columns::REQUIRED,
            vec![
                vec![("MATRICULE", "M100"), ("NOM", "KONE"), ("PRENOMS", "AWA")],
                vec![("MATRICULE", "M101"), ("NOM", "TRAORE"), ("PRENOMS", "ISSA")],
            ],
        );
        let outcome = orchestrator
            .run(&mut conn, ImportMode::Roster, data, None, &mut NoProgress)
            .unwrap();
        assert_eq!(outcome.details.success_count, 2);

        let refs: Vec<String> = conn
            .prepare("SELECT reference FROM dossier ORDER BY dossier_id")
            .unwrap()
            .query_map([], |r| r.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(refs, vec!["1/2024", "2/2024"]);
    }
}
