// ==========================================
// Cusmon 表格数据管理 - 文件解析器实现
// ==========================================
// 职责: 表格文件 → 工作簿（工作表名 + 原始网格）
// 支持: Excel (.xlsx/.xlsm/.xls/.ods) / CSV (.csv)
// 说明: 不做表头识别，网格保留工作表原始坐标
// ==========================================

use crate::domain::{CellValue, Grid};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::importer_trait::FileParser;
use calamine::{open_workbook_auto, Data, Range, Reader};
use chrono::{Duration, NaiveDate};
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;
use tracing::{debug, info, instrument};

const EXCEL_EXTENSIONS: [&str; 4] = ["xlsx", "xlsm", "xls", "ods"];

// ==========================================
// Workbook / Sheet
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sheet {
    pub name: String,
    pub grid: Grid,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn sheet(&self, name: &str) -> ImportResult<&Sheet> {
        self.sheets
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| ImportError::SheetNotFound(name.to_string()))
    }

    pub fn first_sheet(&self) -> ImportResult<&Sheet> {
        self.sheets.first().ok_or(ImportError::NoSheets)
    }
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
// 单个工作表，名称取文件主名；所有单元格为文本，空串视为空单元格
pub struct CsvParser;

impl FileParser for CsvParser {
    fn parse(&self, file_path: &Path) -> ImportResult<Workbook> {
        check_exists(file_path)?;
        let ext = extension_of(file_path);
        if ext != "csv" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let file = File::open(file_path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true) // 允许行长度不一致
            .from_reader(file);

        let mut grid: Grid = Vec::new();
        for result in reader.records() {
            let record = result?;
            grid.push(
                record
                    .iter()
                    .map(|value| {
                        if value.is_empty() {
                            CellValue::Empty
                        } else {
                            CellValue::Text(value.to_string())
                        }
                    })
                    .collect(),
            );
        }

        let name = file_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "Sheet1".to_string());
        debug!(sheet = %name, rows = grid.len(), "CSV 解码完成");
        Ok(Workbook {
            sheets: vec![Sheet { name, grid }],
        })
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
pub struct ExcelParser;

impl ExcelParser {
    /// Range 转网格；按 range.start() 补齐左上空白，坐标与工作表一致
    fn range_to_grid(range: &Range<Data>) -> Grid {
        let Some((start_row, start_col)) = range.start() else {
            return Vec::new();
        };
        let mut grid: Grid = vec![Vec::new(); start_row as usize];
        for row in range.rows() {
            let mut cells = vec![CellValue::Empty; start_col as usize];
            cells.extend(row.iter().map(Self::to_cell));
            grid.push(cells);
        }
        grid
    }

    fn to_cell(data: &Data) -> CellValue {
        match data {
            Data::Empty => CellValue::Empty,
            Data::String(s) => CellValue::Text(s.clone()),
            Data::Int(i) => CellValue::Int(*i),
            Data::Float(f) => CellValue::Float(*f),
            Data::Bool(b) => CellValue::Bool(*b),
            Data::Error(e) => CellValue::Text(e.to_string()),
            Data::DateTime(dt) => CellValue::Text(serial_to_iso(dt.as_f64())),
            Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        }
    }
}

/// Excel 序列日期（1900 体系）→ ISO 文本
fn serial_to_iso(serial: f64) -> String {
    let Some(epoch) = NaiveDate::from_ymd_opt(1899, 12, 30) else {
        return serial.to_string();
    };
    let days = serial.floor();
    let seconds = ((serial - days) * 86_400.0).round() as i64;
    let Some(date) = epoch.checked_add_signed(Duration::days(days as i64)) else {
        return serial.to_string();
    };
    if seconds == 0 {
        return date.format("%Y-%m-%d").to_string();
    }
    match date.and_hms_opt(0, 0, 0) {
        Some(midnight) => (midnight + Duration::seconds(seconds))
            .format("%Y-%m-%dT%H:%M:%S")
            .to_string(),
        None => date.format("%Y-%m-%d").to_string(),
    }
}

impl FileParser for ExcelParser {
    fn parse(&self, file_path: &Path) -> ImportResult<Workbook> {
        check_exists(file_path)?;
        let ext = extension_of(file_path);
        if !EXCEL_EXTENSIONS.contains(&ext.as_str()) {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let mut workbook = open_workbook_auto(file_path)?;
        let names = workbook.sheet_names();
        if names.is_empty() {
            return Err(ImportError::NoSheets);
        }

        let mut sheets = Vec::with_capacity(names.len());
        for name in names {
            let range = workbook.worksheet_range(&name)?;
            let grid = Self::range_to_grid(&range);
            debug!(sheet = %name, rows = grid.len(), "工作表解码完成");
            sheets.push(Sheet { name, grid });
        }
        Ok(Workbook { sheets })
    }
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser;

impl FileParser for UniversalFileParser {
    #[instrument(skip(self), fields(path = %file_path.display()))]
    fn parse(&self, file_path: &Path) -> ImportResult<Workbook> {
        let ext = extension_of(file_path);
        let workbook = match ext.as_str() {
            "csv" => CsvParser.parse(file_path)?,
            e if EXCEL_EXTENSIONS.contains(&e) => ExcelParser.parse(file_path)?,
            _ => return Err(ImportError::UnsupportedFormat(ext)),
        };
        info!(sheets = workbook.sheets.len(), "文件解码完成");
        Ok(workbook)
    }
}
