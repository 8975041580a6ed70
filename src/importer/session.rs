// ==========================================
// Cusmon 表格数据管理 - 导入会话状态
// ==========================================
// 职责: 一次导入交互的不可变状态值
// 流程: 打开工作簿 → 选择工作表（检测表头/自动映射/初始自动填充）
//       → 调整映射与自动填充 → 预览（前 N 行）→ 完成（全部行）
// 每次修改返回新的会话值；生成的记录保留在会话中，提交失败可重试
// ==========================================

use crate::domain::{AutoFillMethod, Item, TableSchema};
use crate::importer::auto_fill::AutoFillConfig;
use crate::importer::column_mapper::ColumnMapping;
use crate::importer::error::ImportResult;
use crate::importer::file_parser::{Sheet, Workbook};
use crate::importer::pipeline::ImportPipeline;
use crate::importer::source_reader::{Anchor, TabularSource};
use crate::importer::value_coercion::{ValueCoercionEngine, DEFAULT_DATE_FORMAT};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// 会话参数
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub preview_rows: usize,
    pub default_date_format: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            preview_rows: 5,
            default_date_format: DEFAULT_DATE_FORMAT.to_string(),
        }
    }
}

/// 文件列及首行示例值
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSample {
    pub index: usize,
    pub name: String,
    pub sample: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ImportSession {
    workbook: Arc<Workbook>,
    schema: TableSchema,
    config: SessionConfig,
    sheet: String,
    anchor: Anchor,
    columns: Vec<String>,
    mapping: ColumnMapping,
    autofill: AutoFillConfig,
    items: Vec<Item>,
}

impl ImportSession {
    /// 打开工作簿并选择第一个工作表
    pub fn open(workbook: Workbook, schema: TableSchema, config: SessionConfig) -> ImportResult<Self> {
        let first = workbook.first_sheet()?.name.clone();
        let session = Self {
            workbook: Arc::new(workbook),
            schema,
            config,
            sheet: String::new(),
            anchor: Anchor::default(),
            columns: Vec::new(),
            mapping: ColumnMapping::new(),
            autofill: AutoFillConfig::new(),
            items: Vec::new(),
        };
        session.select_sheet(&first)
    }

    /// 选择工作表并重建检测结果
    pub fn select_sheet(self, name: &str) -> ImportResult<Self> {
        let sheet = self.workbook.sheet(name)?;
        let source = TabularSource::detect(&sheet.grid);
        let columns = source.columns().to_vec();
        let mapping = ColumnMapping::auto(&columns, &self.schema);
        let autofill = AutoFillConfig::seeded(&self.schema, &mapping);
        let anchor = source.anchor();
        info!(
            sheet = %name,
            anchor_row = anchor.row,
            anchor_col = anchor.col,
            columns = columns.len(),
            "工作表已选择"
        );
        Ok(Self {
            sheet: name.to_string(),
            anchor,
            columns,
            mapping,
            autofill,
            items: Vec::new(),
            ..self
        })
    }

    /// 替换某列映射（空列表取消映射）
    pub fn with_mapping(mut self, column_index: usize, keys: Vec<String>) -> Self {
        debug!(column = column_index, fields = ?keys, "更新列映射");
        self.mapping.set(column_index, keys);
        self
    }

    pub fn with_auto_fill(mut self, key: impl Into<String>, value: Value) -> Self {
        self.autofill = self.autofill.with_basic(key, value);
        self
    }

    pub fn with_advanced(mut self, key: impl Into<String>, method: Option<AutoFillMethod>) -> Self {
        self.autofill = self.autofill.with_advanced(key, method);
        self
    }

    /// 预览：仅生成前 preview_rows 条
    pub fn preview(self, reference_data: &HashMap<String, Vec<Item>>) -> ImportResult<Self> {
        let limit = self.config.preview_rows;
        self.generate(reference_data, Some(limit))
    }

    /// 完成：生成全部记录
    pub fn finish(self, reference_data: &HashMap<String, Vec<Item>>) -> ImportResult<Self> {
        self.generate(reference_data, None)
    }

    fn generate(
        mut self,
        reference_data: &HashMap<String, Vec<Item>>,
        max_rows: Option<usize>,
    ) -> ImportResult<Self> {
        let items = {
            let sheet = self.current_sheet()?;
            let source = TabularSource::at(&sheet.grid, self.anchor);
            let pipeline = ImportPipeline::new(&self.schema, &self.mapping, &self.autofill, reference_data)
                .with_engine(ValueCoercionEngine::new(self.config.default_date_format.clone()));
            pipeline.run(&source, max_rows).collect::<Vec<_>>()
        };
        info!(sheet = %self.sheet, items = items.len(), "导入记录已生成");
        self.items = items;
        Ok(self)
    }

    fn current_sheet(&self) -> ImportResult<&Sheet> {
        self.workbook.sheet(&self.sheet)
    }

    /// 未映射字段（自动填充候选）
    pub fn unmapped_fields(&self) -> Vec<&str> {
        self.mapping.unmapped_fields(&self.schema)
    }

    pub fn column_samples(&self) -> ImportResult<Vec<ColumnSample>> {
        let sheet = self.current_sheet()?;
        let source = TabularSource::at(&sheet.grid, self.anchor);
        Ok(self
            .columns
            .iter()
            .enumerate()
            .map(|(index, name)| ColumnSample {
                index,
                name: name.clone(),
                sample: source.sample(index),
            })
            .collect())
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.workbook.sheet_names()
    }

    pub fn sheet_name(&self) -> &str {
        &self.sheet
    }

    pub fn anchor(&self) -> Anchor {
        self.anchor
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn mapping(&self) -> &ColumnMapping {
        &self.mapping
    }

    pub fn autofill(&self) -> &AutoFillConfig {
        &self.autofill
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn into_items(self) -> Vec<Item> {
        self.items
    }
}
