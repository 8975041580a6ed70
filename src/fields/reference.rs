// ==========================================
// 引用字段: reference / copy
// ==========================================
// reference: 值为另一表记录的 _id，展示为被引用记录的展示字段
// copy: 值镜像自同行 reference 字段指向记录的某列，
//       编辑/展示委托给被引用列的字段类型
// ==========================================

use crate::domain::{value_to_text, CellValue, FieldSchema, FieldType, ITEM_ID_KEY};
use crate::fields::scalar::parse_string_value;
use crate::fields::{registry, FieldKind, ImportContext, RenderContext};
use crate::importer::value_coercion::coerce_reference;
use serde_json::Value;

// ==========================================
// reference
// ==========================================
pub struct ReferenceField;

impl FieldKind for ReferenceField {
    fn field_type(&self) -> FieldType {
        FieldType::Reference
    }

    fn coerce_import(
        &self,
        raw: &CellValue,
        _: &FieldSchema,
        ctx: &ImportContext<'_>,
    ) -> Option<Value> {
        coerce_reference(raw, ctx.reference_index)
    }

    fn normalize_edit(&self, value: &Value, _: &FieldSchema) -> Option<Value> {
        parse_string_value(value)
    }

    fn render_text(
        &self,
        value: Option<&Value>,
        schema: &FieldSchema,
        ctx: &RenderContext<'_>,
    ) -> String {
        let Some(raw) = value else {
            return String::new();
        };
        let fields = schema
            .reference
            .as_ref()
            .map(|r| r.fields.as_slice())
            .unwrap_or(&[]);
        let referenced = schema
            .reference_table()
            .and_then(|table| ctx.tables_items.get(table))
            .and_then(|items| items.iter().find(|i| i.get(ITEM_ID_KEY) == Some(raw)));

        match referenced {
            Some(item) if !fields.is_empty() => fields
                .iter()
                .map(|f| item.text_of(f).unwrap_or_default())
                .collect::<Vec<_>>()
                .join(", "),
            _ => value_to_text(raw),
        }
    }

    fn schema_options(&self) -> &'static [&'static str] {
        &[
            "reference.table",
            "reference.fields",
            "import.searchReferenceColumn",
        ]
    }
}

// ==========================================
// copy
// ==========================================
pub struct CopyField;

impl CopyField {
    /// 被引用列的字段模式（引用表设置中 reference.fields[0] 对应的字段）
    fn referenced_column<'a>(
        schema: &FieldSchema,
        ctx: &RenderContext<'a>,
    ) -> Option<&'a FieldSchema> {
        let table = schema.reference_table()?;
        let column = schema.first_reference_field()?;
        ctx.tables_settings
            .get(table)?
            .schema
            .as_ref()?
            .get(column)
            .filter(|s| s.field_type != FieldType::Copy)
    }
}

impl FieldKind for CopyField {
    fn field_type(&self) -> FieldType {
        FieldType::Copy
    }

    fn coerce_import(&self, raw: &CellValue, _: &FieldSchema, _: &ImportContext<'_>) -> Option<Value> {
        raw.to_field_value()
    }

    fn normalize_edit(&self, value: &Value, _: &FieldSchema) -> Option<Value> {
        Some(value.clone())
    }

    fn render_text(
        &self,
        value: Option<&Value>,
        schema: &FieldSchema,
        ctx: &RenderContext<'_>,
    ) -> String {
        match Self::referenced_column(schema, ctx)
            .and_then(|column| registry().get(column.field_type).map(|kind| (column, kind)))
        {
            Some((column, kind)) => kind.render_text(value, column, ctx),
            None => value.map(value_to_text).unwrap_or_default(),
        }
    }

    fn schema_options(&self) -> &'static [&'static str] {
        &[
            "reference.table",
            "reference.fields",
            "import.copyFromReference",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Item, TableSchema, TableSettings};
    use serde_json::json;
    use std::collections::HashMap;

    fn context_data() -> (HashMap<String, Vec<Item>>, HashMap<String, TableSettings>) {
        let mut items = HashMap::new();
        items.insert(
            "customers".to_string(),
            vec![Item::from_value(json!({"_id": "a", "name": "Alice", "city": "Lyon", "credit": 3})).unwrap()],
        );
        let mut settings = HashMap::new();
        settings.insert(
            "customers".to_string(),
            TableSettings::with_schema(
                TableSchema::new()
                    .with_field("name", FieldSchema::new(FieldType::String, "Name"))
                    .with_field("credit", FieldSchema::new(FieldType::Currency, "Credit")),
            ),
        );
        (items, settings)
    }

    #[test]
    fn test_reference_renders_display_fields() {
        let (items, settings) = context_data();
        let ctx = RenderContext {
            tables_items: &items,
            tables_settings: &settings,
        };
        let schema =
            FieldSchema::new(FieldType::Reference, "Customer").with_reference("customers", ["name", "city"]);
        assert_eq!(
            ReferenceField.render_text(Some(&json!("a")), &schema, &ctx),
            "Alice, Lyon"
        );
        assert_eq!(ReferenceField.render_text(Some(&json!("zz")), &schema, &ctx), "zz");
    }

    #[test]
    fn test_copy_delegates_to_referenced_column_kind() {
        let (items, settings) = context_data();
        let ctx = RenderContext {
            tables_items: &items,
            tables_settings: &settings,
        };
        let schema = FieldSchema::new(FieldType::Copy, "Credit")
            .with_reference("customers", ["credit"])
            .with_copy_from_reference("customer");
        assert_eq!(CopyField.render_text(Some(&json!(3)), &schema, &ctx), "3.00 €");
    }

    #[test]
    fn test_copy_without_settings_renders_raw() {
        let items = HashMap::new();
        let settings = HashMap::new();
        let ctx = RenderContext {
            tables_items: &items,
            tables_settings: &settings,
        };
        let schema = FieldSchema::new(FieldType::Copy, "Credit").with_reference("customers", ["credit"]);
        assert_eq!(CopyField.render_text(Some(&json!("x")), &schema, &ctx), "x");
    }
}
