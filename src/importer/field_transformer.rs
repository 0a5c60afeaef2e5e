// ==========================================
// 宪兵纪律案卷导入系统 - 字段转换器
// ==========================================
// 职责: 单元格原值 → 规范类型
// - 日期: 日/月/年文本、ISO 文本、原生日期/时间戳 → NaiveDate；无法解析 → None
// - 数字: 转整数；缺失或无法解析 → 配置默认值（静默，不算行失败）
// - 文本: 去首尾空白；非文本单元格转字符串
// 红线: 转换器永不中止一行，只返回尽力转换的结果 + 警告
// ==========================================

use crate::importer::column_validator::{case_columns as cc, roster_columns as rc, HeaderMap};
use crate::importer::error::TransformWarning;
use crate::importer::file_parser::{CellValue, SourceRow};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

const DATE_FORMATS: &[&str] = &["%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%Y-%m-%d", "%Y/%m/%d"];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

// Excel 序列日期的合理范围（1900-01-01 .. 9999-12-31）
const EXCEL_SERIAL_MIN: f64 = 1.0;
const EXCEL_SERIAL_MAX: f64 = 2_958_465.0;

// ==========================================
// 固定记录类型（每种导入模式一种）
// ==========================================

/// 案卷导入单行（已转换）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaseRow {
    pub reference: Option<String>,
    pub punishment_year: i64,
    pub order_sequence: Option<i64>,
    pub year_sequence: Option<i64>,
    pub source_dossier_id: Option<String>,
    pub registration_date: Option<NaiveDate>,
    pub matricule: Option<String>,
    pub full_name: Option<String>,
    pub grade: Option<String>,
    pub sex: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub age: i64,
    pub unit: Option<String>,
    pub legion: Option<String>,
    pub subdivision: Option<String>,
    pub region: Option<String>,
    pub service_entry_date: Option<NaiveDate>,
    pub years_of_service: i64,
    pub marital_status: Option<String>,
    pub children_count: i64,
    pub fault: Option<String>,
    pub incident_date: Option<NaiveDate>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub sanction_type: Option<String>,
    pub statute_reference: Option<String>,
    pub decision_number: Option<String>,
    pub order_number: Option<String>,
    /// None 表示单元格为空；无法解析时为 Some(默认值)
    pub rate: Option<i64>,
    pub incident_year: i64,
    pub radiation_year: Option<i64>,
    pub committee: Option<String>,
    pub case_status: Option<String>,
}

/// 名册导入单行（已转换）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RosterRow {
    pub matricule: Option<String>,
    pub last_name: Option<String>,
    pub first_names: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub birth_place: Option<String>,
    pub service_entry_date: Option<NaiveDate>,
    pub sex: Option<String>,
}

/// 转换结果：尽力转换的行 + 非致命警告
#[derive(Debug, Clone, PartialEq)]
pub struct Transformed<T> {
    pub row: T,
    pub warnings: Vec<TransformWarning>,
}

// ==========================================
// FieldTransformer
// ==========================================
pub struct FieldTransformer {
    numeric_default: i64,
}

impl FieldTransformer {
    pub fn new(numeric_default: i64) -> Self {
        Self { numeric_default }
    }

    pub fn transform_case(&self, map: &HeaderMap, source: &SourceRow) -> Transformed<CaseRow> {
        let mut cx = RowCursor {
            map,
            source,
            numeric_default: self.numeric_default,
            warnings: Vec::new(),
        };

        let row = CaseRow {
            reference: cx.text(cc::REFERENCE),
            punishment_year: cx.int(cc::PUNISHMENT_YEAR),
            order_sequence: cx.opt_int(cc::ORDER_SEQUENCE),
            year_sequence: cx.opt_int(cc::YEAR_SEQUENCE),
            source_dossier_id: cx.text(cc::SOURCE_DOSSIER_ID),
            registration_date: cx.date(cc::REGISTRATION_DATE),
            matricule: cx.text(cc::MATRICULE),
            full_name: cx.text(cc::FULL_NAME),
            grade: cx.text(cc::GRADE),
            sex: cx.text(cc::SEX),
            birth_date: cx.date(cc::BIRTH_DATE),
            age: cx.int(cc::AGE),
            unit: cx.text(cc::UNIT),
            legion: cx.text(cc::LEGION),
            subdivision: cx.text(cc::SUBDIVISION),
            region: cx.text(cc::REGION),
            service_entry_date: cx.date(cc::SERVICE_ENTRY_DATE),
            years_of_service: cx.int(cc::YEARS_OF_SERVICE),
            marital_status: cx.text(cc::MARITAL_STATUS),
            children_count: cx.int(cc::CHILDREN_COUNT),
            fault: cx.text(cc::FAULT),
            incident_date: cx.date(cc::INCIDENT_DATE),
            description: cx.text(cc::DESCRIPTION),
            category: cx.text(cc::CATEGORY),
            sanction_type: cx.text(cc::SANCTION_TYPE),
            statute_reference: cx.text(cc::STATUTE_REFERENCE),
            decision_number: cx.text(cc::DECISION_NUMBER),
            order_number: cx.text(cc::ORDER_NUMBER),
            rate: cx.opt_int(cc::RATE),
            incident_year: cx.int(cc::INCIDENT_YEAR),
            radiation_year: cx.opt_int(cc::RADIATION_YEAR),
            committee: cx.text(cc::COMMITTEE),
            case_status: cx.text(cc::CASE_STATUS),
        };

        Transformed {
            row,
            warnings: cx.warnings,
        }
    }

    pub fn transform_roster(&self, map: &HeaderMap, source: &SourceRow) -> Transformed<RosterRow> {
        let mut cx = RowCursor {
            map,
            source,
            numeric_default: self.numeric_default,
            warnings: Vec::new(),
        };

        let row = RosterRow {
            matricule: cx.text(rc::MATRICULE),
            last_name: cx.text(rc::LAST_NAME),
            first_names: cx.text(rc::FIRST_NAMES),
            birth_date: cx.date(rc::BIRTH_DATE),
            birth_place: cx.text(rc::BIRTH_PLACE),
            service_entry_date: cx.date(rc::SERVICE_ENTRY_DATE),
            sex: cx.text(rc::SEX),
        };

        Transformed {
            row,
            warnings: cx.warnings,
        }
    }

    /// 将单元格转为去空白文本；空值返回 None
    pub fn text(cell: &CellValue) -> Option<String> {
        let text = match cell {
            CellValue::Empty => return None,
            CellValue::Text(s) => s.trim().to_string(),
            CellValue::Int(i) => i.to_string(),
            CellValue::Float(f) if f.is_finite() && f.fract() == 0.0 => format!("{}", *f as i64),
            CellValue::Float(f) => f.to_string(),
            CellValue::Bool(b) => b.to_string(),
            CellValue::DateTime(dt) => dt.date().format("%Y-%m-%d").to_string(),
        };
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    /// 解析日期；Err 表示非空但无法解析
    pub fn parse_date(cell: &CellValue) -> Result<Option<NaiveDate>, String> {
        match cell {
            CellValue::Empty => Ok(None),
            CellValue::DateTime(dt) => Ok(Some(dt.date())),
            CellValue::Int(i) => excel_serial_to_date(*i as f64).map(Some),
            CellValue::Float(f) => excel_serial_to_date(*f).map(Some),
            CellValue::Bool(b) => Err(format!("布尔值不是日期: {}", b)),
            CellValue::Text(s) => {
                let value = s.trim();
                if value.is_empty() {
                    return Ok(None);
                }
                parse_date_text(value)
                    .map(Some)
                    .ok_or_else(|| format!("无法解析为日期: {}", value))
            }
        }
    }

    /// 解析整数；Ok(None) 表示缺失，Err 表示非空但无法解析
    pub fn parse_int(cell: &CellValue) -> Result<Option<i64>, String> {
        match cell {
            CellValue::Empty => Ok(None),
            CellValue::Int(i) => Ok(Some(*i)),
            CellValue::Float(f) if f.is_finite() => Ok(Some(f.trunc() as i64)),
            CellValue::Float(f) => Err(format!("非有限数值: {}", f)),
            CellValue::Bool(b) => Err(format!("布尔值不是数字: {}", b)),
            CellValue::DateTime(dt) => Err(format!("日期不是数字: {}", dt)),
            CellValue::Text(s) => {
                let value = s.trim();
                if value.is_empty() {
                    return Ok(None);
                }
                if let Ok(i) = value.parse::<i64>() {
                    return Ok(Some(i));
                }
                // 兼容 "3.0" / "3,0"
                match value.replace(',', ".").parse::<f64>() {
                    Ok(f) if f.is_finite() => Ok(Some(f.trunc() as i64)),
                    _ => Err(format!("无法解析为整数: {}", value)),
                }
            }
        }
    }
}

fn parse_date_text(value: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
                .map(|dt| dt.date())
        })
}

/// Excel 序列日期（1900 日期系统，纪元 1899-12-30）
fn excel_serial_to_date(serial: f64) -> Result<NaiveDate, String> {
    if !(EXCEL_SERIAL_MIN..=EXCEL_SERIAL_MAX).contains(&serial) {
        return Err(format!("数值不是有效的日期序列: {}", serial));
    }
    NaiveDate::from_ymd_opt(1899, 12, 30)
        .and_then(|epoch| epoch.checked_add_signed(Duration::days(serial.trunc() as i64)))
        .ok_or_else(|| format!("数值不是有效的日期序列: {}", serial))
}

// 单行取值游标：按列名取单元格并收集警告
struct RowCursor<'a> {
    map: &'a HeaderMap,
    source: &'a SourceRow,
    numeric_default: i64,
    warnings: Vec<TransformWarning>,
}

impl RowCursor<'_> {
    fn cell(&self, column: &str) -> &CellValue {
        match self.map.index_of(column) {
            Some(idx) => self.source.cell(idx),
            None => &CellValue::Empty,
        }
    }

    fn warn(&mut self, column: &str, message: String) {
        let value = self.cell(column).canonical_text();
        tracing::debug!(field = column, value = %value, %message, "字段转换警告");
        self.warnings.push(TransformWarning {
            field: column.to_string(),
            value,
            message,
        });
    }

    fn text(&mut self, column: &str) -> Option<String> {
        FieldTransformer::text(self.cell(column))
    }

    fn date(&mut self, column: &str) -> Option<NaiveDate> {
        match FieldTransformer::parse_date(self.cell(column)) {
            Ok(date) => date,
            Err(message) => {
                self.warn(column, message);
                None
            }
        }
    }

    fn int(&mut self, column: &str) -> i64 {
        match FieldTransformer::parse_int(self.cell(column)) {
            Ok(Some(i)) => i,
            Ok(None) => self.numeric_default,
            Err(message) => {
                self.warn(column, message);
                self.numeric_default
            }
        }
    }

    fn opt_int(&mut self, column: &str) -> Option<i64> {
        match FieldTransformer::parse_int(self.cell(column)) {
            Ok(value) => value,
            Err(message) => {
                self.warn(column, message);
                Some(self.numeric_default)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importer::column_validator::ColumnValidator;
    use crate::domain::import::ImportMode;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    fn roster_map() -> HeaderMap {
        let headers: Vec<String> = rc::REQUIRED.iter().map(|c| c.to_string()).collect();
        ColumnValidator.validate(ImportMode::Roster, &headers).unwrap()
    }

    fn case_source(values: &[(&str, CellValue)]) -> (HeaderMap, SourceRow) {
        let headers: Vec<String> = cc::REQUIRED.iter().map(|c| c.to_string()).collect();
        let map = ColumnValidator.validate(ImportMode::Case, &headers).unwrap();
        let mut cells = vec![CellValue::Empty; headers.len()];
        for (column, value) in values {
            cells[map.index_of(column).unwrap()] = value.clone();
        }
        (map, SourceRow { data_index: 0, cells })
    }

    #[test]
    fn test_dmy_and_iso_dates_normalize_identically() {
        let a = FieldTransformer::parse_date(&text("01/02/1980")).unwrap();
        let b = FieldTransformer::parse_date(&text("1980-02-01")).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, NaiveDate::from_ymd_opt(1980, 2, 1));
    }

    #[test]
    fn test_native_datetime_and_excel_serial() {
        let dt = NaiveDate::from_ymd_opt(1980, 2, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(
            FieldTransformer::parse_date(&CellValue::DateTime(dt)).unwrap(),
            NaiveDate::from_ymd_opt(1980, 2, 1)
        );
        // 29252 = 1980-02-01
        assert_eq!(
            FieldTransformer::parse_date(&CellValue::Float(29252.0)).unwrap(),
            NaiveDate::from_ymd_opt(1980, 2, 1)
        );
        assert_eq!(
            FieldTransformer::parse_date(&text("1980-02-01 08:30:00")).unwrap(),
            NaiveDate::from_ymd_opt(1980, 2, 1)
        );
    }

    #[test]
    fn test_unparseable_date_is_error_not_panic() {
        assert!(FieldTransformer::parse_date(&text("31/02/1980")).is_err());
        assert!(FieldTransformer::parse_date(&text("bientôt")).is_err());
        assert_eq!(FieldTransformer::parse_date(&text("   ")).unwrap(), None);
    }

    #[test]
    fn test_parse_int_variants() {
        assert_eq!(FieldTransformer::parse_int(&text(" 42 ")).unwrap(), Some(42));
        assert_eq!(FieldTransformer::parse_int(&text("3.0")).unwrap(), Some(3));
        assert_eq!(FieldTransformer::parse_int(&text("3,5")).unwrap(), Some(3));
        assert_eq!(FieldTransformer::parse_int(&CellValue::Float(7.9)).unwrap(), Some(7));
        assert_eq!(FieldTransformer::parse_int(&CellValue::Empty).unwrap(), None);
        assert!(FieldTransformer::parse_int(&text("trente")).is_err());
    }

    #[test]
    fn test_text_stringifies_non_text_cells() {
        assert_eq!(FieldTransformer::text(&CellValue::Int(12)), Some("12".to_string()));
        assert_eq!(FieldTransformer::text(&CellValue::Float(12.0)), Some("12".to_string()));
        assert_eq!(FieldTransformer::text(&CellValue::Float(1.5)), Some("1.5".to_string()));
        assert_eq!(FieldTransformer::text(&text("  BDE COCODY ")), Some("BDE COCODY".to_string()));
        assert_eq!(FieldTransformer::text(&text("   ")), None);
    }

    #[test]
    fn test_non_numeric_age_defaults_with_warning() {
        let (map, source) = case_source(&[
            ("MLE", text("M001")),
            ("AGE", text("inconnu")),
            ("NB ENF", CellValue::Empty),
        ]);
        let out = FieldTransformer::new(0).transform_case(&map, &source);
        assert_eq!(out.row.age, 0);
        assert_eq!(out.row.children_count, 0);
        assert_eq!(out.warnings.len(), 1);
        assert_eq!(out.warnings[0].field, "AGE");
        assert_eq!(out.warnings[0].value, "inconnu");
    }

    #[test]
    fn test_configured_numeric_default() {
        let (map, source) = case_source(&[("AGE", text("?")), ("TAUX (JAR)", text("x"))]);
        let out = FieldTransformer::new(-1).transform_case(&map, &source);
        assert_eq!(out.row.age, -1);
        assert_eq!(out.row.rate, Some(-1));
        assert_eq!(out.row.radiation_year, None);
    }

    #[test]
    fn test_transform_roster_row() {
        let map = roster_map();
        let source = SourceRow {
            data_index: 0,
            cells: vec![
                text(" M123 "),
                text("KOUASSI"),
                text("JEAN PAUL"),
                text("01/02/1980"),
                text("BOUAKE"),
                text("not a date"),
                text("M"),
            ],
        };
        let out = FieldTransformer::new(0).transform_roster(&map, &source);
        assert_eq!(out.row.matricule.as_deref(), Some("M123"));
        assert_eq!(out.row.birth_date, NaiveDate::from_ymd_opt(1980, 2, 1));
        assert_eq!(out.row.service_entry_date, None);
        assert_eq!(out.warnings.len(), 1);
        assert_eq!(out.warnings[0].field, "DATE ENTREE GIE");
    }
}
