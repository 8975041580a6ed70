// ==========================================
// Cusmon 表格数据管理 - 值转换引擎
// ==========================================
// 职责: 原始单元格值 → 字段模式声明的表示
// 规则:
// - date / date-time: 按 import.dateFormat（默认 DD-MM-YYYY）解析，输出 YYYY-MM-DD
// - reference: 引用表候选行的搜索列作为正则，匹配单元格文本，取首个命中行 _id
// - 其他类型: 原值透传（数值/列表的规整在编辑时进行）
// 错误策略: 从不报错；无法解析的日期为 "Invalid Date"，无法解析的引用为未定义
// ==========================================

use crate::domain::{CellValue, FieldSchema, Item, ITEM_ID_KEY};
use crate::fields::{registry, ImportContext};
use chrono::format::{parse, parse_and_remainder, Parsed, StrftimeItems};
use chrono::NaiveDate;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

/// 默认日期解析格式
pub const DEFAULT_DATE_FORMAT: &str = "DD-MM-YYYY";

/// 日期解析失败时的哨兵值
pub const INVALID_DATE: &str = "Invalid Date";

/// ISO 兜底格式（原生日期单元格解码后的文本）
const ISO_FALLBACK_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

// ==========================================
// 日期格式记号 → strftime
// ==========================================
// 支持: YYYY YY MMMM MMM MM M DD D HH H hh h mm m ss s SSS A a ZZ Z
// 方括号内为字面量
pub fn translate_date_format(format: &str) -> String {
    const TOKENS: [(&str, &str); 21] = [
        ("YYYY", "%Y"),
        ("MMMM", "%B"),
        ("SSS", "%3f"),
        ("MMM", "%b"),
        ("YY", "%y"),
        ("MM", "%m"),
        ("DD", "%d"),
        ("HH", "%H"),
        ("hh", "%I"),
        ("mm", "%M"),
        ("ss", "%S"),
        ("ZZ", "%z"),
        ("M", "%m"),
        ("D", "%d"),
        ("H", "%H"),
        ("h", "%I"),
        ("m", "%M"),
        ("s", "%S"),
        ("A", "%p"),
        ("a", "%p"),
        ("Z", "%:z"),
    ];

    let mut out = String::with_capacity(format.len() * 2);
    let mut rest = format;
    'outer: while !rest.is_empty() {
        if let Some(stripped) = rest.strip_prefix('[') {
            let end = stripped.find(']').unwrap_or(stripped.len());
            push_literal(&mut out, &stripped[..end]);
            rest = stripped.get(end + 1..).unwrap_or("");
            continue;
        }
        for (token, strftime) in TOKENS {
            if let Some(stripped) = rest.strip_prefix(token) {
                out.push_str(strftime);
                rest = stripped;
                continue 'outer;
            }
        }
        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            push_literal(&mut out, c.encode_utf8(&mut [0u8; 4]));
        }
        rest = chars.as_str();
    }
    out
}

fn push_literal(out: &mut String, literal: &str) {
    for c in literal.chars() {
        if c == '%' {
            out.push_str("%%");
        } else {
            out.push(c);
        }
    }
}

/// 按格式解析日期（时间部分被忽略）
///
/// 配置格式为宽松匹配: 格式之后的剩余文本（如 "15-03-2024 10:30" 中的时间）被忽略
pub fn parse_date(value: &str, format: &str) -> Option<NaiveDate> {
    let value = value.trim();
    let strftime = translate_date_format(format);
    let mut parsed = Parsed::new();
    if let Ok(rest) = parse_and_remainder(&mut parsed, value, StrftimeItems::new(&strftime)) {
        if let Ok(date) = parsed.to_naive_date() {
            if !rest.is_empty() {
                debug!(value = %value, ignored = %rest, "日期格式之后的文本被忽略");
            }
            return Some(date);
        }
    }

    ISO_FALLBACK_FORMATS.iter().find_map(|iso| {
        let mut parsed = Parsed::new();
        parse(&mut parsed, value, StrftimeItems::new(iso))
            .ok()
            .and_then(|_| parsed.to_naive_date().ok())
    })
}

/// 日期 → "YYYY-MM-DD"；失败返回 "Invalid Date"
pub fn coerce_date(raw: &CellValue, format: Option<&str>) -> Option<Value> {
    if raw.is_empty() {
        return None;
    }
    let format = format.unwrap_or(DEFAULT_DATE_FORMAT);
    let text = raw.to_text();
    match parse_date(&text, format) {
        Some(date) => Some(Value::String(date.format("%Y-%m-%d").to_string())),
        None => {
            debug!(value = %text, format = %format, "日期解析失败");
            Some(Value::String(INVALID_DATE.to_string()))
        }
    }
}

// ==========================================
// ReferenceIndex - 引用表正则索引
// ==========================================
// 每个候选行的搜索列值预编译为正则（Unicode 模式）
// 顺序与引用表记录顺序一致，首个命中获胜
#[derive(Debug, Default)]
pub struct ReferenceIndex {
    entries: Vec<(Regex, Value)>,
}

impl ReferenceIndex {
    /// 构建索引；搜索列非字符串或正则非法的行被跳过
    pub fn build(rows: &[Item], search_column: &str) -> Self {
        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let Some(pattern) = row.get(search_column).and_then(Value::as_str) else {
                continue;
            };
            let Some(id) = row.get(ITEM_ID_KEY) else {
                continue;
            };
            match Regex::new(pattern) {
                Ok(regex) => entries.push((regex, id.clone())),
                Err(e) => {
                    warn!(pattern = %pattern, error = %e, "引用搜索列不是合法正则，跳过该行");
                }
            }
        }
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 返回首个匹配行的 _id
    pub fn resolve(&self, text: &str) -> Option<Value> {
        self.entries
            .iter()
            .find(|(regex, _)| regex.is_match(text))
            .map(|(_, id)| id.clone())
    }
}

/// 引用解析：缺少前置条件或无命中 → 未定义
pub fn coerce_reference(raw: &CellValue, index: Option<&ReferenceIndex>) -> Option<Value> {
    let index = index?;
    if raw.is_empty() {
        return None;
    }
    let text = raw.to_text();
    let resolved = index.resolve(&text);
    if resolved.is_none() {
        debug!(value = %text, "引用未命中");
    }
    resolved
}

// ==========================================
// ValueCoercionEngine
// ==========================================
// 按字段类型标签分派到字段注册表
#[derive(Debug, Clone)]
pub struct ValueCoercionEngine {
    default_date_format: String,
}

impl Default for ValueCoercionEngine {
    fn default() -> Self {
        Self::new(DEFAULT_DATE_FORMAT)
    }
}

impl ValueCoercionEngine {
    pub fn new(default_date_format: impl Into<String>) -> Self {
        Self {
            default_date_format: default_date_format.into(),
        }
    }

    pub fn default_date_format(&self) -> &str {
        &self.default_date_format
    }

    /// 转换单个单元格
    pub fn coerce(
        &self,
        raw: &CellValue,
        schema: &FieldSchema,
        reference_index: Option<&ReferenceIndex>,
    ) -> Option<Value> {
        let ctx = ImportContext {
            reference_index,
            default_date_format: &self.default_date_format,
        };
        match registry().get(schema.field_type) {
            Some(kind) => kind.coerce_import(raw, schema, &ctx),
            None => raw.to_field_value(),
        }
    }
}
