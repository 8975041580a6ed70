// ==========================================
// Cusmon 表格数据管理 - 自动填充解析器
// ==========================================
// 职责: 为未映射字段提供值
// 优先级（后者覆盖前者）:
// 1. 基础: 本次导入配置的静态值；值为假（null/false/0/""）、该字段
//    已有列映射或已配置高级方法时跳过
// 2. 高级: 计算方法，目前仅 InputRowHash
//    = SHA-256(原始行单元格以 "#" 连接)，默认用于 _id
// ==========================================

use crate::domain::{AutoFillMethod, CellValue, Item, TableSchema, ITEM_ID_KEY};
use crate::importer::column_mapper::ColumnMapping;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};

/// 值是否为真（与表单语义一致：空列表为真）
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// 原始行内容哈希（小写十六进制 SHA-256）
pub fn row_hash(row: &[CellValue]) -> String {
    let joined = row
        .iter()
        .map(CellValue::to_text)
        .collect::<Vec<_>>()
        .join("#");
    format!("{:x}", Sha256::digest(joined.as_bytes()))
}

// ==========================================
// AutoFillConfig - 自动填充配置（不可变值）
// ==========================================
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AutoFillConfig {
    basic: BTreeMap<String, Value>,
    advanced: BTreeMap<String, AutoFillMethod>,
}

impl AutoFillConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// 初始配置: 未映射字段取模式默认值；_id 使用 InputRowHash
    pub fn seeded(schema: &TableSchema, mapping: &ColumnMapping) -> Self {
        let basic = mapping
            .unmapped_fields(schema)
            .into_iter()
            .filter_map(|key| {
                schema
                    .get(key)
                    .and_then(|s| s.default.clone())
                    .map(|v| (key.to_string(), v))
            })
            .collect();
        let mut advanced = BTreeMap::new();
        advanced.insert(ITEM_ID_KEY.to_string(), AutoFillMethod::InputRowHash);
        Self { basic, advanced }
    }

    pub fn with_basic(mut self, key: impl Into<String>, value: Value) -> Self {
        self.basic.insert(key.into(), value);
        self
    }

    /// 设置或清除（None）高级方法
    pub fn with_advanced(mut self, key: impl Into<String>, method: Option<AutoFillMethod>) -> Self {
        let key = key.into();
        match method {
            Some(m) => {
                self.advanced.insert(key, m);
            }
            None => {
                self.advanced.remove(&key);
            }
        }
        self
    }

    pub fn basic(&self) -> &BTreeMap<String, Value> {
        &self.basic
    }

    pub fn advanced(&self) -> &BTreeMap<String, AutoFillMethod> {
        &self.advanced
    }

    pub fn advanced_method(&self, key: &str) -> Option<AutoFillMethod> {
        self.advanced.get(key).copied()
    }
}

// ==========================================
// AutoFillResolver
// ==========================================
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoFillResolver;

impl AutoFillResolver {
    /// 基础填充；mapped 为已有列映射的字段键，映射值优先
    pub fn apply_basic(&self, item: &mut Item, config: &AutoFillConfig, mapped: &BTreeSet<&str>) {
        for (key, value) in &config.basic {
            if !is_truthy(value)
                || config.advanced.contains_key(key)
                || mapped.contains(key.as_str())
            {
                continue;
            }
            item.set(key.clone(), value.clone());
        }
    }

    /// 高级填充
    pub fn apply_advanced(&self, item: &mut Item, config: &AutoFillConfig, row: &[CellValue]) {
        for (key, method) in &config.advanced {
            let value = match method {
                AutoFillMethod::InputRowHash => Value::String(row_hash(row)),
            };
            item.set(key.clone(), value);
        }
    }
}
