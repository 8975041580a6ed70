// ==========================================
// 日期字段: date / date-time
// ==========================================

use crate::domain::{value_to_text, CellValue, FieldSchema, FieldType};
use crate::fields::scalar::parse_string_value;
use crate::fields::{FieldKind, ImportContext, RenderContext};
use crate::importer::value_coercion::coerce_date;
use serde_json::Value;

pub struct DateField {
    field_type: FieldType,
}

impl DateField {
    pub fn date() -> Self {
        Self {
            field_type: FieldType::Date,
        }
    }

    pub fn date_time() -> Self {
        Self {
            field_type: FieldType::DateTime,
        }
    }
}

impl FieldKind for DateField {
    fn field_type(&self) -> FieldType {
        self.field_type
    }

    fn coerce_import(
        &self,
        raw: &CellValue,
        schema: &FieldSchema,
        ctx: &ImportContext<'_>,
    ) -> Option<Value> {
        coerce_date(raw, Some(schema.date_format().unwrap_or(ctx.default_date_format)))
    }

    fn normalize_edit(&self, value: &Value, _: &FieldSchema) -> Option<Value> {
        parse_string_value(value)
    }

    fn render_text(&self, value: Option<&Value>, _: &FieldSchema, _: &RenderContext<'_>) -> String {
        value.map(value_to_text).unwrap_or_default()
    }

    fn schema_options(&self) -> &'static [&'static str] {
        &["import.dateFormat"]
    }
}
