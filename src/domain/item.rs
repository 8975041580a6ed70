// ==========================================
// Cusmon 表格数据管理 - 记录 (Item)
// ==========================================
// 职责: 字段键 → 标量/标量列表 的记录，必带字符串 _id
// 约束: 字段缺失即"未定义"，不存储 null 占位
// ==========================================

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// 主键字段名
pub const ITEM_ID_KEY: &str = "_id";

/// 表记录
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Item(Map<String, Value>);

impl Item {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// 以随机 UUID v4 为主键创建记录
    pub fn with_random_id() -> Self {
        let mut item = Self::new();
        item.set(ITEM_ID_KEY, Value::String(Uuid::new_v4().to_string()));
        item
    }

    /// 主键（仅当 _id 为字符串时）
    pub fn id(&self) -> Option<&str> {
        self.0.get(ITEM_ID_KEY).and_then(Value::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    /// 写入或清除（None 表示字段未定义）
    pub fn assign(&mut self, key: &str, value: Option<Value>) {
        match value {
            Some(v) => {
                self.0.insert(key.to_string(), v);
            }
            None => {
                self.0.remove(key);
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// 字段值字符串化（排序/展示用，字符串不带引号）
    pub fn text_of(&self, key: &str) -> Option<String> {
        self.0.get(key).map(value_to_text)
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// 从 JSON 值构造（必须为对象）
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }
}

impl From<Map<String, Value>> for Item {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl FromIterator<(String, Value)> for Item {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// 值的文本表示：字符串原样、列表以 "," 连接、null 为空
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(values) => values.iter().map(value_to_text).collect::<Vec<_>>().join(","),
        other => other.to_string(),
    }
}
