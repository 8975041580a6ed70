// ==========================================
// Cusmon 表格数据管理 - 字段类型注册表
// ==========================================
// 职责: 字段类型标签 → 能力集 {导入转换, 编辑规整, 展示文本, 模式选项}
// 约定: 启动时注册全部类型；copy 在运行时委托给被引用列的类型
// ==========================================

pub mod reference;
pub mod scalar;
pub mod temporal;

use crate::domain::{CellValue, FieldSchema, FieldType, Item, TableSchema, TableSettings, ITEM_ID_KEY};
use crate::importer::value_coercion::ReferenceIndex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::OnceLock;

/// 导入转换上下文
pub struct ImportContext<'a> {
    /// 当前字段引用表的正则索引（仅 reference 字段）
    pub reference_index: Option<&'a ReferenceIndex>,
    /// 字段未配置 dateFormat 时使用的格式
    pub default_date_format: &'a str,
}

/// 展示上下文
#[derive(Clone, Copy)]
pub struct RenderContext<'a> {
    /// 表名 → 已加载记录
    pub tables_items: &'a HashMap<String, Vec<Item>>,
    /// 表名 → 表设置
    pub tables_settings: &'a HashMap<String, TableSettings>,
}

// ==========================================
// FieldKind Trait
// ==========================================
pub trait FieldKind: Send + Sync {
    /// 类型标签
    fn field_type(&self) -> FieldType;

    /// 导入时的单元格转换（不得报错，失败为 None 或哨兵值）
    fn coerce_import(
        &self,
        raw: &CellValue,
        schema: &FieldSchema,
        ctx: &ImportContext<'_>,
    ) -> Option<Value>;

    /// 编辑时的值规整
    fn normalize_edit(&self, value: &Value, schema: &FieldSchema) -> Option<Value>;

    /// 只读展示文本
    fn render_text(
        &self,
        value: Option<&Value>,
        schema: &FieldSchema,
        ctx: &RenderContext<'_>,
    ) -> String;

    /// 该类型可配置的模式选项（字段路径）
    fn schema_options(&self) -> &'static [&'static str];
}

// ==========================================
// FieldRegistry
// ==========================================
pub struct FieldRegistry {
    kinds: HashMap<FieldType, Box<dyn FieldKind>>,
}

impl FieldRegistry {
    pub fn empty() -> Self {
        Self {
            kinds: HashMap::new(),
        }
    }

    /// 注册全部内置类型
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(scalar::StringField));
        registry.register(Box::new(scalar::SelectField));
        registry.register(Box::new(scalar::NumberField::decimal()));
        registry.register(Box::new(scalar::NumberField::integer()));
        registry.register(Box::new(scalar::CurrencyField));
        registry.register(Box::new(temporal::DateField::date()));
        registry.register(Box::new(scalar::TimeField));
        registry.register(Box::new(temporal::DateField::date_time()));
        registry.register(Box::new(reference::ReferenceField));
        registry.register(Box::new(reference::CopyField));
        registry
    }

    pub fn register(&mut self, kind: Box<dyn FieldKind>) {
        self.kinds.insert(kind.field_type(), kind);
    }

    pub fn get(&self, field_type: FieldType) -> Option<&dyn FieldKind> {
        self.kinds.get(&field_type).map(|k| k.as_ref())
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

/// 进程级内置注册表
pub fn registry() -> &'static FieldRegistry {
    static REGISTRY: OnceLock<FieldRegistry> = OnceLock::new();
    REGISTRY.get_or_init(FieldRegistry::standard)
}

/// 按字段模式展示值
pub fn render_value(value: Option<&Value>, schema: &FieldSchema, ctx: &RenderContext<'_>) -> String {
    match registry().get(schema.field_type) {
        Some(kind) => kind.render_text(value, schema, ctx),
        None => value.map(crate::domain::value_to_text).unwrap_or_default(),
    }
}

/// 按字段模式规整编辑值
pub fn normalize_value(value: &Value, schema: &FieldSchema) -> Option<Value> {
    match registry().get(schema.field_type) {
        Some(kind) => kind.normalize_edit(value, schema),
        None => Some(value.clone()),
    }
}

/// 按表模式规整整条编辑记录；规整为未定义的字段被移除，模式外字段与 _id 原样保留
pub fn normalize_item(item: &mut Item, schema: &TableSchema) {
    for (key, field) in schema.iter() {
        if key == ITEM_ID_KEY {
            continue;
        }
        let Some(value) = item.get(key) else {
            continue;
        };
        let normalized = normalize_value(value, field);
        item.assign(key, normalized);
    }
}

/// 列表取首元素（单值字段）
pub(crate) fn unbox(value: &Value) -> Option<&Value> {
    match value {
        Value::Array(values) => values.first(),
        Value::Null => None,
        other => Some(other),
    }
}
