// ==========================================
// Cusmon 表格数据管理 - 列映射器
// ==========================================
// 职责: 决定每个文件列写入哪些字段
// 自动映射: 表头与字段 import.columnNames 精确匹配（区分大小写），
//           一个表头可映射多个字段
// 手动覆盖: 按文件列下标整体替换该列的字段列表
// 同一字段被多列映射时，列下标大者后写生效
// ==========================================

use crate::domain::TableSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// 文件列下标 → 字段键列表
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ColumnMapping {
    columns: BTreeMap<usize, Vec<String>>,
}

impl ColumnMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按表头自动映射
    pub fn auto(headers: &[String], schema: &TableSchema) -> Self {
        let mut mapping = Self::new();
        for (index, header) in headers.iter().enumerate() {
            let keys: Vec<String> = schema
                .iter()
                .filter(|(_, field)| field.column_names().iter().any(|name| name == header))
                .map(|(key, _)| key.to_string())
                .collect();
            if !keys.is_empty() {
                debug!(column = index, header = %header, fields = ?keys, "自动映射");
                mapping.columns.insert(index, keys);
            }
        }
        mapping
    }

    /// 替换某列的映射（空列表即取消映射）
    pub fn with_column(mut self, column_index: usize, keys: Vec<String>) -> Self {
        self.set(column_index, keys);
        self
    }

    pub fn set(&mut self, column_index: usize, keys: Vec<String>) {
        if keys.is_empty() {
            self.columns.remove(&column_index);
        } else {
            self.columns.insert(column_index, keys);
        }
    }

    /// 以展示名设置某列映射（未知展示名被忽略）
    pub fn set_by_display_names(
        &mut self,
        column_index: usize,
        display_names: &[String],
        schema: &TableSchema,
    ) {
        let keys = display_names
            .iter()
            .filter_map(|name| schema.key_by_display_name(name))
            .map(str::to_string)
            .collect();
        self.set(column_index, keys);
    }

    pub fn get(&self, column_index: usize) -> &[String] {
        self.columns
            .get(&column_index)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// 按列下标升序遍历 (列下标, 字段键)
    pub fn pairs(&self) -> impl Iterator<Item = (usize, &str)> {
        self.columns
            .iter()
            .flat_map(|(col, keys)| keys.iter().map(move |k| (*col, k.as_str())))
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// 已被映射的字段键
    pub fn mapped_keys(&self) -> BTreeSet<&str> {
        self.columns
            .values()
            .flat_map(|keys| keys.iter().map(String::as_str))
            .collect()
    }

    /// 未被映射的字段（自动填充候选），保持模式顺序
    pub fn unmapped_fields<'a>(&self, schema: &'a TableSchema) -> Vec<&'a str> {
        let mapped = self.mapped_keys();
        schema.keys().filter(|k| !mapped.contains(*k)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FieldSchema, FieldType};

    fn schema() -> TableSchema {
        TableSchema::new()
            .with_field(
                "name",
                FieldSchema::new(FieldType::String, "Name").with_column_names(["Name", "Nombre"]),
            )
            .with_field(
                "label",
                FieldSchema::new(FieldType::String, "Label").with_column_names(["Name"]),
            )
            .with_field(
                "code",
                FieldSchema::new(FieldType::String, "Code").with_column_names(["Code"]),
            )
            .with_field("note", FieldSchema::new(FieldType::String, "Note"))
    }

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_auto_mapping_one_header_many_fields() {
        let mapping = ColumnMapping::auto(&headers(&["Name", "Code"]), &schema());
        assert_eq!(mapping.get(0), &["name".to_string(), "label".to_string()]);
        assert_eq!(mapping.get(1), &["code".to_string()]);
        assert_eq!(mapping.unmapped_fields(&schema()), vec!["note"]);
    }

    #[test]
    fn test_auto_mapping_is_case_sensitive() {
        let mapping = ColumnMapping::auto(&headers(&["name", "CODE"]), &schema());
        assert!(mapping.is_empty());
    }

    #[test]
    fn test_alias_match() {
        let mapping = ColumnMapping::auto(&headers(&["x", "Nombre"]), &schema());
        assert_eq!(mapping.get(1), &["name".to_string()]);
        assert!(mapping.get(0).is_empty());
    }

    #[test]
    fn test_manual_override_replaces_column() {
        let mut mapping = ColumnMapping::auto(&headers(&["Name", "Code"]), &schema());
        mapping.set(0, vec!["note".to_string()]);
        assert_eq!(mapping.get(0), &["note".to_string()]);
        mapping.set_by_display_names(1, &["Label".to_string(), "Unknown".to_string()], &schema());
        assert_eq!(mapping.get(1), &["label".to_string()]);
        mapping.set(1, Vec::new());
        assert!(mapping.get(1).is_empty());
    }

    #[test]
    fn test_pairs_are_ordered_by_column() {
        let mapping = ColumnMapping::new()
            .with_column(3, vec!["a".to_string()])
            .with_column(1, vec!["b".to_string(), "c".to_string()]);
        let pairs: Vec<(usize, &str)> = mapping.pairs().collect();
        assert_eq!(pairs, vec![(1, "b"), (1, "c"), (3, "a")]);
    }
}
