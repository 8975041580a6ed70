// ==========================================
// Cusmon 表格数据管理 - 模式模型 (Schema Model)
// ==========================================
// 职责: 字段模式 / 表模式 / 表设置
// 存储: _settings 集合中 _id = "table#<表名>" 的文档
// 约束:
// - reference / copy 类型必须配置 reference.table
// - copy 类型必须配置 reference.fields[0]
// - import.copyFromReference 必须指向同表的 reference 字段
// ==========================================

use crate::domain::item::Item;
use crate::domain::types::{FieldType, SortDirection};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

// ==========================================
// 模式错误
// ==========================================
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("字段 {field} 类型为 {field_type}，但缺少 reference.table")]
    MissingReferenceTable { field: String, field_type: FieldType },

    #[error("字段 {field} 类型为 copy，但缺少 reference.fields")]
    MissingReferenceFields { field: String },

    #[error("字段 {field} 的 copyFromReference 指向不存在的字段 {source_key}")]
    CopySourceMissing { field: String, source_key: String },

    #[error("字段 {field} 的 copyFromReference 指向非 reference 字段 {source_key}")]
    CopySourceNotReference { field: String, source_key: String },

    #[error("字段 {field} 的默认值只能为标量、null 或字符串列表")]
    InvalidDefault { field: String },

    #[error("字段键为空")]
    EmptyKey,

    #[error("字段键重复: {0}")]
    DuplicateKey(String),
}

// ==========================================
// 外观配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appearance {
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hide: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_width: Option<f64>,
}

// ==========================================
// 校验配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Validations {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiple: Option<bool>,
}

// ==========================================
// 引用配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReferenceConfig {
    pub table: String,
    #[serde(default)]
    pub fields: Vec<String>,
}

// ==========================================
// 导入配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOptions {
    /// 自动映射用的候选源列名（精确匹配，区分大小写）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_names: Option<Vec<String>>,
    /// 日期解析格式（DD-MM-YYYY 风格记号）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_format: Option<String>,
    /// 引用表中作为正则模式匹配的列
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_reference_column: Option<String>,
    /// copy 字段的来源 reference 字段键
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copy_from_reference: Option<String>,
}

// ==========================================
// FieldSchema - 字段模式
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    pub appearance: Appearance,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validations: Option<Validations>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<ReferenceConfig>,
    #[serde(rename = "import", default, skip_serializing_if = "Option::is_none")]
    pub import: Option<ImportOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortDirection>,
}

impl FieldSchema {
    pub fn new(field_type: FieldType, display_name: impl Into<String>) -> Self {
        Self {
            field_type,
            editable: None,
            default: None,
            appearance: Appearance {
                display_name: display_name.into(),
                ..Appearance::default()
            },
            validations: None,
            reference: None,
            import: None,
            sort: None,
        }
    }

    pub fn with_column_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.import_mut().column_names = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_date_format(mut self, format: impl Into<String>) -> Self {
        self.import_mut().date_format = Some(format.into());
        self
    }

    pub fn with_search_reference_column(mut self, column: impl Into<String>) -> Self {
        self.import_mut().search_reference_column = Some(column.into());
        self
    }

    pub fn with_copy_from_reference(mut self, key: impl Into<String>) -> Self {
        self.import_mut().copy_from_reference = Some(key.into());
        self
    }

    pub fn with_reference<I, S>(mut self, table: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reference = Some(ReferenceConfig {
            table: table.into(),
            fields: fields.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn with_sort(mut self, direction: SortDirection) -> Self {
        self.sort = Some(direction);
        self
    }

    fn import_mut(&mut self) -> &mut ImportOptions {
        self.import.get_or_insert_with(ImportOptions::default)
    }

    pub fn column_names(&self) -> &[String] {
        self.import
            .as_ref()
            .and_then(|i| i.column_names.as_deref())
            .unwrap_or(&[])
    }

    pub fn date_format(&self) -> Option<&str> {
        self.import.as_ref().and_then(|i| i.date_format.as_deref())
    }

    pub fn search_reference_column(&self) -> Option<&str> {
        self.import
            .as_ref()
            .and_then(|i| i.search_reference_column.as_deref())
    }

    pub fn copy_from_reference(&self) -> Option<&str> {
        self.import
            .as_ref()
            .and_then(|i| i.copy_from_reference.as_deref())
    }

    pub fn reference_table(&self) -> Option<&str> {
        self.reference
            .as_ref()
            .map(|r| r.table.as_str())
            .filter(|t| !t.is_empty())
    }

    /// 引用表中的首个展示字段（copy 字段的取值列）
    pub fn first_reference_field(&self) -> Option<&str> {
        self.reference
            .as_ref()
            .and_then(|r| r.fields.first())
            .map(String::as_str)
    }

    pub fn is_multiple(&self) -> bool {
        self.validations
            .as_ref()
            .and_then(|v| v.multiple)
            .unwrap_or(false)
    }

    pub fn display_name(&self) -> &str {
        &self.appearance.display_name
    }
}

// ==========================================
// TableSchema - 表模式（有序）
// ==========================================
// 顺序即展示/列顺序；通过 move_up / move_down 显式调整
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableSchema {
    entries: Vec<(String, FieldSchema)>,
}

impl TableSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldSchema)> {
        self.entries.iter().map(|(k, s)| (k.as_str(), s))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn get(&self, key: &str) -> Option<&FieldSchema> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, s)| s)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut FieldSchema> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, s)| s)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index_of(key).is_some()
    }

    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == key)
    }

    /// 插入字段：已存在则原位替换，否则追加到末尾
    pub fn insert(&mut self, key: impl Into<String>, schema: FieldSchema) {
        let key = key.into();
        match self.index_of(&key) {
            Some(idx) => self.entries[idx].1 = schema,
            None => self.entries.push((key, schema)),
        }
    }

    /// 链式插入
    pub fn with_field(mut self, key: impl Into<String>, schema: FieldSchema) -> Self {
        self.insert(key, schema);
        self
    }

    pub fn remove(&mut self, key: &str) -> Option<FieldSchema> {
        self.index_of(key).map(|idx| self.entries.remove(idx).1)
    }

    /// 重命名字段键（保持位置）
    pub fn rename_key(&mut self, from: &str, to: impl Into<String>) -> Result<(), SchemaError> {
        let to = to.into();
        if to.is_empty() {
            return Err(SchemaError::EmptyKey);
        }
        if from != to && self.contains_key(&to) {
            return Err(SchemaError::DuplicateKey(to));
        }
        if let Some(idx) = self.index_of(from) {
            self.entries[idx].0 = to;
        }
        Ok(())
    }

    /// 字段上移一位；已在首位返回 false
    pub fn move_up(&mut self, index: usize) -> bool {
        if index == 0 || index >= self.entries.len() {
            return false;
        }
        self.entries.swap(index - 1, index);
        true
    }

    /// 字段下移一位；已在末位返回 false
    pub fn move_down(&mut self, index: usize) -> bool {
        if index + 1 >= self.entries.len() {
            return false;
        }
        self.entries.swap(index, index + 1);
        true
    }

    /// 按展示名查找字段键
    pub fn key_by_display_name(&self, display_name: &str) -> Option<&str> {
        self.iter()
            .find(|(_, s)| s.display_name() == display_name)
            .map(|(k, _)| k)
    }

    /// reference 字段引用的表（去重，导入前需预取这些表的记录）
    pub fn referenced_tables(&self) -> BTreeSet<String> {
        self.entries
            .iter()
            .filter(|(_, s)| s.field_type.requires_reference())
            .filter_map(|(_, s)| s.reference_table().map(str::to_string))
            .collect()
    }

    /// 校验模式不变量
    pub fn validate(&self) -> Result<(), SchemaError> {
        let mut seen = BTreeSet::new();
        for (key, schema) in &self.entries {
            if key.is_empty() {
                return Err(SchemaError::EmptyKey);
            }
            if !seen.insert(key.as_str()) {
                return Err(SchemaError::DuplicateKey(key.clone()));
            }

            if schema.field_type.requires_reference() && schema.reference_table().is_none() {
                return Err(SchemaError::MissingReferenceTable {
                    field: key.clone(),
                    field_type: schema.field_type,
                });
            }

            if schema.field_type == FieldType::Copy && schema.first_reference_field().is_none() {
                return Err(SchemaError::MissingReferenceFields { field: key.clone() });
            }

            if let Some(source_key) = schema.copy_from_reference() {
                match self.get(source_key) {
                    None => {
                        return Err(SchemaError::CopySourceMissing {
                            field: key.clone(),
                            source_key: source_key.to_string(),
                        })
                    }
                    Some(source) if source.field_type != FieldType::Reference => {
                        return Err(SchemaError::CopySourceNotReference {
                            field: key.clone(),
                            source_key: source_key.to_string(),
                        })
                    }
                    Some(_) => {}
                }
            }

            if let Some(default) = &schema.default {
                let valid = match default {
                    Value::Array(values) => values.iter().all(Value::is_string),
                    Value::Object(_) | Value::Bool(_) => false,
                    _ => true,
                };
                if !valid {
                    return Err(SchemaError::InvalidDefault { field: key.clone() });
                }
            }
        }
        Ok(())
    }

    /// 默认排序：依次按带 sort 标记的字段比较字符串化的值
    pub fn sort_items(&self, items: &mut [Item]) {
        let sort_columns: Vec<(&str, SortDirection)> = self
            .entries
            .iter()
            .filter_map(|(k, s)| s.sort.map(|d| (k.as_str(), d)))
            .collect();
        if sort_columns.is_empty() {
            return;
        }

        items.sort_by(|a, b| {
            for (key, direction) in &sort_columns {
                let left = a.text_of(key).unwrap_or_default();
                let right = b.text_of(key).unwrap_or_default();
                let ordering = left.cmp(&right);
                if ordering == Ordering::Equal {
                    continue;
                }
                return match direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                };
            }
            Ordering::Equal
        });
    }
}

impl Serialize for TableSchema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, schema) in &self.entries {
            map.serialize_entry(key, schema)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for TableSchema {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TableSchemaVisitor;

        impl<'de> Visitor<'de> for TableSchemaVisitor {
            type Value = TableSchema;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("字段键到字段模式的映射")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut schema = TableSchema::new();
                while let Some((key, field)) = access.next_entry::<String, FieldSchema>()? {
                    schema.insert(key, field);
                }
                Ok(schema)
            }
        }

        deserializer.deserialize_map(TableSchemaVisitor)
    }
}

// ==========================================
// TableSettings - 表设置
// ==========================================
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TableSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<TableSchema>,
}

impl TableSettings {
    pub fn with_schema(schema: TableSchema) -> Self {
        Self {
            schema: Some(schema),
        }
    }

    pub fn validate(&self) -> Result<(), SchemaError> {
        match &self.schema {
            Some(schema) => schema.validate(),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_schema() -> TableSchema {
        TableSchema::new()
            .with_field("name", FieldSchema::new(FieldType::String, "Name"))
            .with_field(
                "customer",
                FieldSchema::new(FieldType::Reference, "Customer")
                    .with_reference("customers", ["name"])
                    .with_search_reference_column("code"),
            )
            .with_field(
                "customer_name",
                FieldSchema::new(FieldType::Copy, "Customer name")
                    .with_reference("customers", ["name"])
                    .with_copy_from_reference("customer"),
            )
    }

    #[test]
    fn test_deserialize_preserves_document_order() {
        let raw = r#"{
            "zeta": {"type": "string", "appearance": {"displayName": "Z"}},
            "alpha": {"type": "date", "appearance": {"displayName": "A"},
                      "import": {"columnNames": ["Fecha"], "dateFormat": "YYYY/MM/DD"}}
        }"#;
        let schema: TableSchema = serde_json::from_str(raw).unwrap();
        let keys: Vec<&str> = schema.keys().collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);
        assert_eq!(schema.get("alpha").unwrap().date_format(), Some("YYYY/MM/DD"));
        assert_eq!(schema.get("alpha").unwrap().column_names(), &["Fecha".to_string()]);

        let back = serde_json::to_string(&schema).unwrap();
        assert!(back.find("zeta").unwrap() < back.find("alpha").unwrap());
    }

    #[test]
    fn test_move_up_and_down() {
        let mut schema = sample_schema();
        assert!(!schema.move_up(0));
        assert!(schema.move_up(1));
        assert_eq!(schema.keys().next(), Some("customer"));
        assert!(!schema.move_down(2));
        assert!(schema.move_down(0));
        assert_eq!(schema.keys().next(), Some("name"));
    }

    #[test]
    fn test_validate_accepts_consistent_schema() {
        assert!(sample_schema().validate().is_ok());
        assert_eq!(
            sample_schema().referenced_tables().into_iter().collect::<Vec<_>>(),
            vec!["customers".to_string()]
        );
    }

    #[test]
    fn test_validate_rejects_reference_without_table() {
        let schema = TableSchema::new()
            .with_field("r", FieldSchema::new(FieldType::Reference, "R"));
        assert!(matches!(
            schema.validate(),
            Err(SchemaError::MissingReferenceTable { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_copy_from_non_reference() {
        let schema = TableSchema::new()
            .with_field("name", FieldSchema::new(FieldType::String, "Name"))
            .with_field(
                "c",
                FieldSchema::new(FieldType::Copy, "C")
                    .with_reference("t", ["x"])
                    .with_copy_from_reference("name"),
            );
        assert!(matches!(
            schema.validate(),
            Err(SchemaError::CopySourceNotReference { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_object_default() {
        let schema = TableSchema::new().with_field(
            "name",
            FieldSchema::new(FieldType::String, "Name").with_default(json!({"a": 1})),
        );
        assert!(matches!(schema.validate(), Err(SchemaError::InvalidDefault { .. })));
    }

    #[test]
    fn test_rename_key_rejects_duplicate() {
        let mut schema = sample_schema();
        assert!(schema.rename_key("name", "customer").is_err());
        schema.rename_key("name", "title").unwrap();
        assert_eq!(schema.index_of("title"), Some(0));
    }

    #[test]
    fn test_sort_items_by_marked_fields() {
        let schema = TableSchema::new()
            .with_field(
                "group",
                FieldSchema::new(FieldType::String, "Group").with_sort(SortDirection::Asc),
            )
            .with_field(
                "name",
                FieldSchema::new(FieldType::String, "Name").with_sort(SortDirection::Desc),
            );
        let mut items: Vec<Item> = vec![
            Item::from_value(json!({"_id": "1", "group": "b", "name": "x"})).unwrap(),
            Item::from_value(json!({"_id": "2", "group": "a", "name": "m"})).unwrap(),
            Item::from_value(json!({"_id": "3", "group": "a", "name": "z"})).unwrap(),
        ];
        schema.sort_items(&mut items);
        let ids: Vec<&str> = items.iter().filter_map(Item::id).collect();
        assert_eq!(ids, vec!["3", "2", "1"]);
    }
}
