// ==========================================
// Cusmon 表格数据管理 - 原始单元格
// ==========================================
// 职责: 表格文件解码后的单元格值（异构标量）
// ==========================================

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// 原始单元格值
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Empty,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl CellValue {
    /// 单元格是否为空（空单元格或空字符串）
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// 单元格是否为空白（空或仅含空白字符）
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// 文本表示（空单元格为 ""）
    pub fn to_text(&self) -> String {
        self.to_string()
    }

    /// 转换为记录字段值（空单元格无值）
    pub fn to_field_value(&self) -> Option<Value> {
        match self {
            CellValue::Empty => None,
            CellValue::Bool(b) => Some(Value::Bool(*b)),
            CellValue::Int(i) => Some(Value::from(*i)),
            CellValue::Float(f) => serde_json::Number::from_f64(*f).map(Value::Number),
            CellValue::Text(s) => Some(Value::String(s.clone())),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Bool(b) => write!(f, "{}", b),
            CellValue::Int(i) => write!(f, "{}", i),
            CellValue::Float(v) => write!(f, "{}", v),
            CellValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Int(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Float(value)
    }
}

/// 原始表格（行优先，行长度可不一致）
pub type Grid = Vec<Vec<CellValue>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_and_empty() {
        assert!(CellValue::Empty.is_empty());
        assert!(CellValue::from("").is_empty());
        assert!(!CellValue::from("  ").is_empty());
        assert!(CellValue::from("  ").is_blank());
        assert!(!CellValue::Int(0).is_blank());
    }

    #[test]
    fn test_float_text_drops_trailing_zero() {
        assert_eq!(CellValue::Float(3.0).to_text(), "3");
        assert_eq!(CellValue::Float(2.5).to_text(), "2.5");
        assert_eq!(CellValue::Empty.to_text(), "");
    }

    #[test]
    fn test_to_field_value() {
        assert_eq!(CellValue::Empty.to_field_value(), None);
        assert_eq!(
            CellValue::from("X1").to_field_value(),
            Some(Value::String("X1".to_string()))
        );
        assert_eq!(CellValue::Int(7).to_field_value(), Some(Value::from(7)));
    }
}
