// ==========================================
// Cusmon 表格数据管理 - 引用/复制解析
// ==========================================
// 职责: 行构建完成后，为 copy 字段填充镜像值
// 算法: copy 字段 k 配置 copyFromReference = refKey 时，
//       在引用表中找 _id == row[refKey] 的记录，
//       读取 k 自身的 reference.fields[0] 列写入 k
// 约束: 每行只执行一遍，不做 copy → copy 链式传递
// ==========================================

use crate::domain::{FieldSchema, FieldType, Item, TableSchema, ITEM_ID_KEY};
use crate::importer::error::{ImportError, ImportResult};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, warn};

/// 单个 copy 字段的解析计划（配置已校验）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyPlan {
    pub field: String,
    pub source_key: String,
    pub table: String,
    pub column: String,
}

impl CopyPlan {
    /// 从字段配置推导计划；配置不一致返回 SchemaMismatch
    pub fn derive(key: &str, field: &FieldSchema, schema: &TableSchema) -> ImportResult<Self> {
        if field.field_type != FieldType::Copy {
            return Err(ImportError::schema_mismatch(key, "字段类型不是 copy"));
        }
        let source_key = field
            .copy_from_reference()
            .ok_or_else(|| ImportError::schema_mismatch(key, "缺少 import.copyFromReference"))?;
        let source = schema.get(source_key).ok_or_else(|| {
            ImportError::schema_mismatch(key, format!("copyFromReference 指向不存在的字段 {}", source_key))
        })?;
        if source.field_type != FieldType::Reference {
            return Err(ImportError::schema_mismatch(
                key,
                format!("copyFromReference 指向的字段 {} 不是 reference 类型", source_key),
            ));
        }
        let table = field
            .reference_table()
            .or_else(|| source.reference_table())
            .ok_or_else(|| ImportError::schema_mismatch(key, "缺少 reference.table"))?;
        let column = field
            .first_reference_field()
            .ok_or_else(|| ImportError::schema_mismatch(key, "缺少 reference.fields[0]"))?;

        Ok(Self {
            field: key.to_string(),
            source_key: source_key.to_string(),
            table: table.to_string(),
            column: column.to_string(),
        })
    }

    /// 对单行求值；引用记录或列不可用时返回 None
    pub fn lookup<'a>(
        &self,
        row: &Item,
        reference_data: &'a HashMap<String, Vec<Item>>,
    ) -> Option<&'a Value> {
        let target = row.get(&self.source_key)?;
        reference_data
            .get(&self.table)?
            .iter()
            .find(|candidate| candidate.get(ITEM_ID_KEY) == Some(target))?
            .get(&self.column)
    }
}

// ==========================================
// CopyResolver
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct CopyResolver {
    plans: Vec<CopyPlan>,
}

impl CopyResolver {
    /// 为模式中所有配置了 copyFromReference 的 copy 字段生成计划
    /// 配置不一致的字段记录警告后跳过（不影响其他字段）
    pub fn from_schema(schema: &TableSchema) -> Self {
        let plans = schema
            .iter()
            .filter(|(_, field)| {
                field.field_type == FieldType::Copy && field.copy_from_reference().is_some()
            })
            .filter_map(|(key, field)| match CopyPlan::derive(key, field, schema) {
                Ok(plan) => Some(plan),
                Err(e) => {
                    warn!(field = %key, error = %e, "copy 字段配置不一致，跳过");
                    None
                }
            })
            .collect::<Vec<_>>();
        debug!(count = plans.len(), "copy 解析计划就绪");
        Self { plans }
    }

    pub fn plans(&self) -> &[CopyPlan] {
        &self.plans
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }

    /// 解析一行；所有计划读取的都是本轮开始前的行值
    pub fn apply(&self, row: &mut Item, reference_data: &HashMap<String, Vec<Item>>) {
        let resolved: Vec<(&str, Option<Value>)> = self
            .plans
            .iter()
            .map(|plan| (plan.field.as_str(), plan.lookup(row, reference_data).cloned()))
            .collect();
        for (field, value) in resolved {
            if let Some(value) = value {
                row.set(field, value);
            }
        }
    }
}
