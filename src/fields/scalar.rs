// ==========================================
// 标量字段: string / select / decimal / integer / currency / time
// ==========================================
// 导入时原值透传；数值与列表规整仅在编辑时进行
// ==========================================

use crate::domain::{value_to_text, CellValue, FieldSchema, FieldType};
use crate::fields::{unbox, FieldKind, ImportContext, RenderContext};
use serde_json::Value;

/// 字符串规整：列表取首元素，非字符串转文本
pub fn parse_string_value(value: &Value) -> Option<Value> {
    unbox(value).map(|v| match v {
        Value::String(s) => Value::String(s.clone()),
        other => Value::String(value_to_text(other)),
    })
}

/// 数值规整：列表取首元素；字符串按数字解析（空白为 0，非法为未定义）
pub fn parse_number_value(value: &Value) -> Option<Value> {
    match unbox(value)? {
        Value::Number(n) => Some(Value::Number(n.clone())),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Some(Value::from(0));
            }
            trimmed
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
        }
        Value::Bool(b) => Some(Value::from(if *b { 1 } else { 0 })),
        _ => None,
    }
}

/// 选项规整：multiple 时统一为字符串列表
pub fn parse_select_value(value: &Value, schema: &FieldSchema) -> Option<Value> {
    if schema.is_multiple() {
        return Some(match value {
            Value::Array(values) => Value::Array(values.clone()),
            Value::Null => Value::Array(Vec::new()),
            Value::String(s) if s.is_empty() => Value::Array(Vec::new()),
            other => Value::Array(vec![Value::String(value_to_text(other))]),
        });
    }
    parse_string_value(value)
}

fn plain_text(value: Option<&Value>) -> String {
    value.map(value_to_text).unwrap_or_default()
}

// ==========================================
// string
// ==========================================
pub struct StringField;

impl FieldKind for StringField {
    fn field_type(&self) -> FieldType {
        FieldType::String
    }

    fn coerce_import(&self, raw: &CellValue, _: &FieldSchema, _: &ImportContext<'_>) -> Option<Value> {
        raw.to_field_value()
    }

    fn normalize_edit(&self, value: &Value, _: &FieldSchema) -> Option<Value> {
        parse_string_value(value)
    }

    fn render_text(&self, value: Option<&Value>, _: &FieldSchema, _: &RenderContext<'_>) -> String {
        plain_text(value)
    }

    fn schema_options(&self) -> &'static [&'static str] {
        &["appearance.mask"]
    }
}

// ==========================================
// select
// ==========================================
pub struct SelectField;

impl FieldKind for SelectField {
    fn field_type(&self) -> FieldType {
        FieldType::Select
    }

    fn coerce_import(&self, raw: &CellValue, _: &FieldSchema, _: &ImportContext<'_>) -> Option<Value> {
        raw.to_field_value()
    }

    fn normalize_edit(&self, value: &Value, schema: &FieldSchema) -> Option<Value> {
        parse_select_value(value, schema)
    }

    fn render_text(&self, value: Option<&Value>, schema: &FieldSchema, _: &RenderContext<'_>) -> String {
        match value {
            Some(Value::Array(values)) if schema.is_multiple() => values
                .iter()
                .map(value_to_text)
                .collect::<Vec<_>>()
                .join(", "),
            other => plain_text(other),
        }
    }

    fn schema_options(&self) -> &'static [&'static str] {
        &["validations.options", "validations.multiple"]
    }
}

// ==========================================
// decimal / integer
// ==========================================
pub struct NumberField {
    field_type: FieldType,
}

impl NumberField {
    pub fn decimal() -> Self {
        Self {
            field_type: FieldType::Decimal,
        }
    }

    pub fn integer() -> Self {
        Self {
            field_type: FieldType::Integer,
        }
    }
}

impl FieldKind for NumberField {
    fn field_type(&self) -> FieldType {
        self.field_type
    }

    fn coerce_import(&self, raw: &CellValue, _: &FieldSchema, _: &ImportContext<'_>) -> Option<Value> {
        raw.to_field_value()
    }

    fn normalize_edit(&self, value: &Value, _: &FieldSchema) -> Option<Value> {
        parse_number_value(value)
    }

    fn render_text(&self, value: Option<&Value>, _: &FieldSchema, _: &RenderContext<'_>) -> String {
        plain_text(value)
    }

    fn schema_options(&self) -> &'static [&'static str] {
        &["validations.min", "validations.max"]
    }
}

// ==========================================
// currency
// ==========================================
// 展示: 两位小数 + " €"，未定义为 "-"
pub struct CurrencyField;

impl FieldKind for CurrencyField {
    fn field_type(&self) -> FieldType {
        FieldType::Currency
    }

    fn coerce_import(&self, raw: &CellValue, _: &FieldSchema, _: &ImportContext<'_>) -> Option<Value> {
        raw.to_field_value()
    }

    fn normalize_edit(&self, value: &Value, _: &FieldSchema) -> Option<Value> {
        parse_number_value(value)
    }

    fn render_text(&self, value: Option<&Value>, _: &FieldSchema, _: &RenderContext<'_>) -> String {
        let Some(value) = value else {
            return "-".to_string();
        };
        match parse_number_value(value).and_then(|v| v.as_f64()) {
            Some(amount) => format!("{:.2} €", amount),
            None => "NaN €".to_string(),
        }
    }

    fn schema_options(&self) -> &'static [&'static str] {
        &["validations.min", "validations.max"]
    }
}

// ==========================================
// time
// ==========================================
pub struct TimeField;

impl FieldKind for TimeField {
    fn field_type(&self) -> FieldType {
        FieldType::Time
    }

    fn coerce_import(&self, raw: &CellValue, _: &FieldSchema, _: &ImportContext<'_>) -> Option<Value> {
        raw.to_field_value()
    }

    fn normalize_edit(&self, value: &Value, _: &FieldSchema) -> Option<Value> {
        parse_string_value(value)
    }

    fn render_text(&self, value: Option<&Value>, _: &FieldSchema, _: &RenderContext<'_>) -> String {
        plain_text(value)
    }

    fn schema_options(&self) -> &'static [&'static str] {
        &[]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn test_parse_number_value() {
        assert_eq!(parse_number_value(&json!("2.5")), Some(json!(2.5)));
        assert_eq!(parse_number_value(&json!([7])), Some(json!(7)));
        assert_eq!(parse_number_value(&json!("")), Some(json!(0)));
        assert_eq!(parse_number_value(&json!("abc")), None);
        assert_eq!(parse_number_value(&Value::Null), None);
    }

    #[test]
    fn test_parse_select_value_multiple() {
        let schema = FieldSchema {
            validations: Some(crate::domain::Validations {
                multiple: Some(true),
                ..Default::default()
            }),
            ..FieldSchema::new(FieldType::Select, "Tags")
        };
        assert_eq!(parse_select_value(&json!("a"), &schema), Some(json!(["a"])));
        assert_eq!(parse_select_value(&Value::Null, &schema), Some(json!([])));
        assert_eq!(
            parse_select_value(&json!(["a", "b"]), &schema),
            Some(json!(["a", "b"]))
        );
    }

    #[test]
    fn test_parse_select_value_single_unboxes() {
        let schema = FieldSchema::new(FieldType::Select, "Kind");
        assert_eq!(parse_select_value(&json!(["a", "b"]), &schema), Some(json!("a")));
        assert_eq!(parse_select_value(&json!(3), &schema), Some(json!("3")));
    }

    #[test]
    fn test_currency_render() {
        let items = HashMap::new();
        let settings = HashMap::new();
        let ctx = RenderContext {
            tables_items: &items,
            tables_settings: &settings,
        };
        let schema = FieldSchema::new(FieldType::Currency, "Amount");
        assert_eq!(CurrencyField.render_text(Some(&json!(12.5)), &schema, &ctx), "12.50 €");
        assert_eq!(CurrencyField.render_text(Some(&json!("3")), &schema, &ctx), "3.00 €");
        assert_eq!(CurrencyField.render_text(None, &schema, &ctx), "-");
    }
}
