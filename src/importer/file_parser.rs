// ==========================================
// 宪兵纪律案卷导入系统 - 文件解析器实现
// ==========================================
// 职责: 文件 → 有序的 (表头, 数据行) 序列
// 支持: Excel (.xlsx/.xls/.ods) / CSV (.csv)
// 说明: Excel 原生日期单元格保留为时间戳，不转成文本
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use calamine::{open_workbook_auto, Data, DataType, Reader};
use chrono::NaiveDateTime;
use csv::ReaderBuilder;
use std::fs::File;
use std::path::Path;

// ==========================================
// CellValue - 单元格值
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
}

impl CellValue {
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// 去重比较用的规范文本
    pub fn canonical_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.trim().to_string(),
            CellValue::Int(i) => i.to_string(),
            CellValue::Float(f) => f.to_string(),
            CellValue::Bool(b) => b.to_string(),
            CellValue::DateTime(dt) => dt.format("%Y-%m-%dT%H:%M:%S").to_string(),
        }
    }
}

impl From<&Data> for CellValue {
    fn from(cell: &Data) -> Self {
        match cell {
            Data::Empty | Data::Error(_) => CellValue::Empty,
            Data::String(s) => CellValue::Text(s.clone()),
            Data::Int(i) => CellValue::Int(*i),
            Data::Float(f) => CellValue::Float(*f),
            Data::Bool(b) => CellValue::Bool(*b),
            Data::DateTime(_) => match cell.as_datetime() {
                Some(dt) => CellValue::DateTime(dt),
                None => CellValue::Text(cell.to_string()),
            },
            Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        }
    }
}

// ==========================================
// SourceRow / ParsedSheet
// ==========================================
/// 一条数据行；data_index 为 0-based 数据行位置，按源文件物理行计
/// （含被跳过的空行与跨行引号字段），源文件行号由编排器按表头行数换算
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRow {
    pub data_index: usize,
    pub cells: Vec<CellValue>,
}

impl SourceRow {
    pub fn cell(&self, column: usize) -> &CellValue {
        self.cells.get(column).unwrap_or(&CellValue::Empty)
    }

    /// 去重键：忽略尾部空单元格
    pub fn dedup_key(&self) -> Vec<String> {
        let mut key: Vec<String> = self.cells.iter().map(CellValue::canonical_text).collect();
        while key.last().is_some_and(|s| s.is_empty()) {
            key.pop();
        }
        key
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedSheet {
    pub headers: Vec<String>,
    pub rows: Vec<SourceRow>,
}

// ==========================================
// FileParser Trait
// ==========================================
pub trait FileParser {
    fn parse(&self, file_path: &Path) -> ImportResult<ParsedSheet>;
}

fn check_exists(path: &Path) -> ImportResult<()> {
    if !path.exists() {
        return Err(ImportError::FileNotFound(path.display().to_string()));
    }
    Ok(())
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl FileParser for CsvParser {
    fn parse(&self, file_path: &Path) -> ImportResult<ParsedSheet> {
        check_exists(file_path)?;

        let ext = extension_of(file_path);
        if ext != "csv" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let file = File::open(file_path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // 允许行长度不一致
            .from_reader(file);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for (ordinal, result) in reader.records().enumerate() {
            let record = result?;
            // csv 会吞掉空行、引号字段可跨行，按记录起始行号定位（表头占第 1 行）
            let data_index = record
                .position()
                .map(|pos| (pos.line() as usize).saturating_sub(2))
                .unwrap_or(ordinal);
            let cells: Vec<CellValue> = record
                .iter()
                .map(|v| {
                    if v.trim().is_empty() {
                        CellValue::Empty
                    } else {
                        CellValue::Text(v.to_string())
                    }
                })
                .collect();

            // 跳过完全空白的行
            if cells.iter().all(CellValue::is_blank) {
                continue;
            }

            rows.push(SourceRow { data_index, cells });
        }

        Ok(ParsedSheet { headers, rows })
    }
}

// ==========================================
// Excel Parser 实现（读取第一个工作表）
// ==========================================
pub struct ExcelParser;

impl FileParser for ExcelParser {
    fn parse(&self, file_path: &Path) -> ImportResult<ParsedSheet> {
        check_exists(file_path)?;

        let ext = extension_of(file_path);
        if !matches!(ext.as_str(), "xlsx" | "xlsm" | "xls" | "ods") {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let mut workbook = open_workbook_auto(file_path)?;

        let sheet_name = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无工作表".to_string()))?;
        let range = workbook.worksheet_range(&sheet_name)?;

        // 提取表头（第一行）
        let mut iter = range.rows();
        let header_row = iter
            .next()
            .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无数据行".to_string()))?;
        let headers: Vec<String> = header_row
            .iter()
            .map(|cell| cell.to_string().trim().to_string())
            .collect();

        // 工作表可能不从 A1 开始，前置空行计入位置
        let start_row = range.start().map(|(row, _)| row as usize).unwrap_or(0);

        let mut rows = Vec::new();
        for (offset, data_row) in iter.enumerate() {
            let data_index = start_row + offset;
            let cells: Vec<CellValue> = data_row.iter().map(CellValue::from).collect();

            if cells.iter().all(CellValue::is_blank) {
                continue;
            }

            rows.push(SourceRow { data_index, cells });
        }

        Ok(ParsedSheet { headers, rows })
    }
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser;

impl FileParser for UniversalFileParser {
    fn parse(&self, file_path: &Path) -> ImportResult<ParsedSheet> {
        match extension_of(file_path).as_str() {
            "csv" => CsvParser.parse(file_path),
            "xlsx" | "xlsm" | "xls" | "ods" => ExcelParser.parse(file_path),
            other => Err(ImportError::UnsupportedFormat(other.to_string())),
        }
    }
}
