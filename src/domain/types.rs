// ==========================================
// Cusmon 表格数据管理 - 领域类型定义
// ==========================================
// 职责: 字段类型标签、排序方向、自动填充方法
// 序列化格式: 与表设置 JSON 文档一致
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// 字段类型 (Field Type)
// ==========================================
// 序列化格式: kebab-case ("date-time")
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldType {
    String,
    Select,
    Decimal,
    Integer,
    Currency,
    Date,
    Time,
    DateTime,
    Reference,
    Copy,
}

impl FieldType {
    /// 全部字段类型（注册表初始化顺序）
    pub const ALL: [FieldType; 10] = [
        FieldType::String,
        FieldType::Select,
        FieldType::Decimal,
        FieldType::Integer,
        FieldType::Currency,
        FieldType::Date,
        FieldType::Time,
        FieldType::DateTime,
        FieldType::Reference,
        FieldType::Copy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Select => "select",
            FieldType::Decimal => "decimal",
            FieldType::Integer => "integer",
            FieldType::Currency => "currency",
            FieldType::Date => "date",
            FieldType::Time => "time",
            FieldType::DateTime => "date-time",
            FieldType::Reference => "reference",
            FieldType::Copy => "copy",
        }
    }

    /// 是否为日期类（导入时按日期格式解析）
    pub fn is_temporal_date(&self) -> bool {
        matches!(self, FieldType::Date | FieldType::DateTime)
    }

    /// 是否需要 reference 配置
    pub fn requires_reference(&self) -> bool {
        matches!(self, FieldType::Reference | FieldType::Copy)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("未知字段类型: {}", s))
    }
}

// ==========================================
// 排序方向 (Sort Direction)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    #[serde(rename = "ASC")]
    Asc,
    #[serde(rename = "DESC")]
    Desc,
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Asc => write!(f, "ASC"),
            SortDirection::Desc => write!(f, "DESC"),
        }
    }
}

// ==========================================
// 高级自动填充方法 (Advanced Auto-fill Method)
// ==========================================
// InputRowHash: 原始行内容 SHA-256，用作稳定 _id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AutoFillMethod {
    InputRowHash,
}

impl AutoFillMethod {
    pub const ALL: [AutoFillMethod; 1] = [AutoFillMethod::InputRowHash];
}

impl fmt::Display for AutoFillMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AutoFillMethod::InputRowHash => write!(f, "InputRowHash"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_type_serde_tags() {
        let json = serde_json::to_string(&FieldType::DateTime).unwrap();
        assert_eq!(json, "\"date-time\"");

        let parsed: FieldType = serde_json::from_str("\"reference\"").unwrap();
        assert_eq!(parsed, FieldType::Reference);
    }

    #[test]
    fn test_field_type_from_str_roundtrip_all() {
        for t in FieldType::ALL {
            assert_eq!(t.as_str().parse::<FieldType>().unwrap(), t);
        }
        assert!("datetime".parse::<FieldType>().is_err());
    }

    #[test]
    fn test_sort_direction_serde() {
        let parsed: SortDirection = serde_json::from_str("\"DESC\"").unwrap();
        assert_eq!(parsed, SortDirection::Desc);
    }
}
