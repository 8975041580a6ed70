// ==========================================
// Cusmon 表格数据管理 - 导入 Trait
// ==========================================
// 职责: 定义文件解码接口（不包含实现）
// ==========================================

use crate::importer::error::ImportResult;
use crate::importer::file_parser::Workbook;
use std::path::Path;

// ==========================================
// FileParser Trait
// ==========================================
// 用途: 将表格文件解码为工作簿（工作表名 + 原始网格）
// 实现者: CsvParser, ExcelParser, UniversalFileParser
pub trait FileParser: Send + Sync {
    /// 解码文件
    ///
    /// # 返回
    /// - Ok(Workbook): 至少包含一个工作表
    /// - Err: 文件不存在、格式不支持、解码失败
    fn parse(&self, file_path: &Path) -> ImportResult<Workbook>;
}
