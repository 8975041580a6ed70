// ==========================================
// Cusmon 表格数据管理 - 导入流水线
// ==========================================
// 职责: 组合各阶段，惰性产出完整记录
// 阶段顺序（每行）:
// 0. 随机 UUID 作为基础 _id
// 1. 列映射 + 值转换（列下标升序，后写生效）
// 2. 自动填充: 基础（仅未映射字段）
// 3. 自动填充: 高级
// 4. copy 字段解析
// 5. _id 规整（必须为字符串）
// 说明: 流水线整体不会失败；逐字段转换失败退化为未定义
// ==========================================

use crate::domain::{CellValue, FieldType, Item, TableSchema, ITEM_ID_KEY};
use crate::importer::auto_fill::{AutoFillConfig, AutoFillResolver};
use crate::importer::column_mapper::ColumnMapping;
use crate::importer::copy_resolver::CopyResolver;
use crate::importer::source_reader::{DataRows, TabularSource};
use crate::importer::value_coercion::{ReferenceIndex, ValueCoercionEngine};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::iter::Take;
use tracing::{debug, info, instrument, trace, warn};
use uuid::Uuid;

const EMPTY_CELL: CellValue = CellValue::Empty;

// ==========================================
// ImportPipeline
// ==========================================
pub struct ImportPipeline<'a> {
    schema: &'a TableSchema,
    mapping: &'a ColumnMapping,
    autofill: &'a AutoFillConfig,
    reference_data: &'a HashMap<String, Vec<Item>>,
    engine: ValueCoercionEngine,
    // 字段键 → 引用索引
    reference_indexes: HashMap<String, ReferenceIndex>,
    mapped_keys: BTreeSet<&'a str>,
    copy_resolver: CopyResolver,
    auto_fill: AutoFillResolver,
}

impl<'a> ImportPipeline<'a> {
    /// 构建流水线（预编译引用索引与 copy 计划）
    ///
    /// # 参数
    /// - schema: 目标表模式
    /// - mapping: 列映射
    /// - autofill: 自动填充配置
    /// - reference_data: 表名 → 该表全部记录（仅需包含被引用的表）
    #[instrument(skip_all, fields(fields = schema.len()))]
    pub fn new(
        schema: &'a TableSchema,
        mapping: &'a ColumnMapping,
        autofill: &'a AutoFillConfig,
        reference_data: &'a HashMap<String, Vec<Item>>,
    ) -> Self {
        let reference_indexes = build_reference_indexes(schema, reference_data);
        let copy_resolver = CopyResolver::from_schema(schema);
        debug!(
            reference_indexes = reference_indexes.len(),
            copy_fields = copy_resolver.plans().len(),
            "导入流水线就绪"
        );
        Self {
            schema,
            mapping,
            autofill,
            reference_data,
            engine: ValueCoercionEngine::default(),
            reference_indexes,
            mapped_keys: mapping.mapped_keys(),
            copy_resolver,
            auto_fill: AutoFillResolver,
        }
    }

    pub fn with_engine(mut self, engine: ValueCoercionEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn engine(&self) -> &ValueCoercionEngine {
        &self.engine
    }

    /// 构建单条记录
    pub fn build_row(&self, row: &[CellValue]) -> Item {
        let fallback_id = Uuid::new_v4().to_string();
        let mut item = Item::new();
        item.set(ITEM_ID_KEY, Value::String(fallback_id.clone()));

        // 阶段 1: 映射 + 转换
        for (column, key) in self.mapping.pairs() {
            let raw = row.get(column).unwrap_or(&EMPTY_CELL);
            let value = match self.schema.get(key) {
                Some(field) => self
                    .engine
                    .coerce(raw, field, self.reference_indexes.get(key)),
                None if key == ITEM_ID_KEY => raw.to_field_value(),
                None => {
                    trace!(field = %key, "映射到模式之外的字段，忽略");
                    continue;
                }
            };
            item.assign(key, value);
        }

        // 阶段 2/3: 自动填充
        self.auto_fill.apply_basic(&mut item, self.autofill, &self.mapped_keys);
        self.auto_fill.apply_advanced(&mut item, self.autofill, row);

        // 阶段 4: copy 解析
        self.copy_resolver.apply(&mut item, self.reference_data);

        // 阶段 5: _id 规整
        finalize_id(&mut item, fallback_id);
        item
    }

    /// 产出记录序列；max_rows 截断（预览用），每次调用都是新的序列
    pub fn run<'p, 's>(
        &'p self,
        source: &TabularSource<'s>,
        max_rows: Option<usize>,
    ) -> PipelineRows<'p, 'a, 's> {
        info!(
            anchor_row = source.anchor().row,
            anchor_col = source.anchor().col,
            columns = source.columns().len(),
            max_rows = ?max_rows,
            "开始生成导入记录"
        );
        PipelineRows {
            pipeline: self,
            rows: source.rows().take(max_rows.unwrap_or(usize::MAX)),
        }
    }
}

/// 惰性记录序列
pub struct PipelineRows<'p, 'a, 's> {
    pipeline: &'p ImportPipeline<'a>,
    rows: Take<DataRows<'s>>,
}

impl Iterator for PipelineRows<'_, '_, '_> {
    type Item = Item;

    fn next(&mut self) -> Option<Self::Item> {
        self.rows.next().map(|row| self.pipeline.build_row(row))
    }
}

/// 为每个 reference 字段构建一次正则索引
fn build_reference_indexes(
    schema: &TableSchema,
    reference_data: &HashMap<String, Vec<Item>>,
) -> HashMap<String, ReferenceIndex> {
    let mut indexes = HashMap::new();
    for (key, field) in schema.iter() {
        if field.field_type != FieldType::Reference {
            continue;
        }
        let Some(search_column) = field.search_reference_column() else {
            continue;
        };
        let Some(table) = field.reference_table() else {
            warn!(field = %key, "reference 字段缺少 reference.table，跳过");
            continue;
        };
        let rows = reference_data.get(table).map(Vec::as_slice).unwrap_or(&[]);
        let index = ReferenceIndex::build(rows, search_column);
        debug!(field = %key, table = %table, entries = index.len(), "引用索引已构建");
        indexes.insert(key.to_string(), index);
    }
    indexes
}

/// _id 必须为字符串：数字字符串化，其他回退到基础 UUID
fn finalize_id(item: &mut Item, fallback_id: String) {
    let id = match item.get(ITEM_ID_KEY) {
        Some(Value::String(_)) => return,
        Some(Value::Number(n)) => n.to_string(),
        _ => fallback_id,
    };
    item.set(ITEM_ID_KEY, Value::String(id));
}
