// ==========================================
// Cusmon 表格数据管理 - 记录 API
// ==========================================
// 职责: 记录的列举 / 插入 / 批量插入 / 覆盖 / 删除
// 请求校验:
// - 插入: _id 必须为字符串 ("Field _id is missing")
// - 批量: 请求体必须为数组 ("Data must be array")，每个元素带字符串 _id
// - 覆盖: _id 必须与路径中的 itemId 一致 ("Field _id does not match itemId")
// 插入与覆盖的记录按表模式规整（数值解析、单值列表取首元素）后写入
// ==========================================

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::api::error::{ApiError, ApiResult};
use crate::api::session_api::require_gateway;
use crate::config::ImportConfigReader;
use crate::domain::{Item, ITEM_ID_KEY};
use crate::fields::normalize_item;
use crate::repository::ItemRepository;
use crate::session::SessionStore;

const MSG_ID_MISSING: &str = "Field _id is missing";
const MSG_NOT_ARRAY: &str = "Data must be array";
const MSG_ID_MISMATCH: &str = "Field _id does not match itemId";

/// 请求体 → 记录；要求对象且 _id 为字符串
fn item_with_id(body: Value) -> ApiResult<Item> {
    let has_id = body.get(ITEM_ID_KEY).map(Value::is_string).unwrap_or(false);
    if !has_id {
        return Err(ApiError::InvalidInput(MSG_ID_MISSING.to_string()));
    }
    Item::from_value(body).ok_or_else(|| ApiError::InvalidInput(MSG_ID_MISSING.to_string()))
}

/// 按表设置中的模式规整编辑记录；表未配置模式时原样返回
async fn normalized(gateway: &dyn ItemRepository, table_name: &str, mut item: Item) -> ApiResult<Item> {
    if let Some(schema) = gateway.get_settings(table_name).await?.and_then(|s| s.schema) {
        normalize_item(&mut item, &schema);
        debug!(table = table_name, "记录已按表模式规整");
    }
    Ok(item)
}

fn require_param(value: &str, name: &str) -> ApiResult<()> {
    if value.trim().is_empty() {
        return Err(ApiError::InvalidInput(format!("PathParam {} missing", name)));
    }
    Ok(())
}

// ==========================================
// ItemApi - 记录 API
// ==========================================
pub struct ItemApi {
    store: Arc<SessionStore>,
    config: Arc<dyn ImportConfigReader>,
}

impl ItemApi {
    pub fn new(store: Arc<SessionStore>, config: Arc<dyn ImportConfigReader>) -> Self {
        Self { store, config }
    }

    /// 按写入顺序返回记录（条数受 items_limit 配置限制）
    pub async fn list_items(&self, token: Option<&str>, table_name: &str) -> ApiResult<Vec<Item>> {
        require_param(table_name, "tableName")?;
        let gateway = require_gateway(&self.store, token).await?;
        let limit = self
            .config
            .get_items_limit()
            .await
            .map_err(|e| ApiError::InternalError(format!("读取配置失败: {}", e)))?;
        let items = gateway.list_items(table_name, limit).await?;
        debug!(table = table_name, count = items.len(), limit, "记录已读取");
        Ok(items)
    }

    #[instrument(skip(self, token, body))]
    pub async fn insert_item(&self, token: Option<&str>, table_name: &str, body: Value) -> ApiResult<()> {
        require_param(table_name, "tableName")?;
        let item = item_with_id(body)?;
        let gateway = require_gateway(&self.store, token).await?;
        let item = normalized(gateway.as_ref(), table_name, item).await?;
        gateway.insert_item(table_name, &item).await?;
        Ok(())
    }

    /// 批量插入
    ///
    /// # 返回
    /// - Ok(usize): 插入条数
    /// - Err(ApiError::DuplicateKey): 遇到首个重复 _id 即停止，之前的记录保持已写入
    #[instrument(skip(self, token, body))]
    pub async fn bulk_insert(&self, token: Option<&str>, table_name: &str, body: Value) -> ApiResult<usize> {
        require_param(table_name, "tableName")?;
        let Value::Array(values) = body else {
            return Err(ApiError::InvalidInput(MSG_NOT_ARRAY.to_string()));
        };
        let items = values
            .into_iter()
            .map(item_with_id)
            .collect::<ApiResult<Vec<Item>>>()?;

        let gateway = require_gateway(&self.store, token).await?;
        let inserted = gateway.bulk_insert(table_name, &items).await?;
        info!(table = table_name, inserted, "批量插入完成");
        Ok(inserted)
    }

    #[instrument(skip(self, token, body))]
    pub async fn replace_item(
        &self,
        token: Option<&str>,
        table_name: &str,
        item_id: &str,
        body: Value,
    ) -> ApiResult<()> {
        require_param(table_name, "tableName")?;
        require_param(item_id, "itemId")?;
        let item = item_with_id(body)?;
        if item.id() != Some(item_id) {
            return Err(ApiError::InvalidInput(MSG_ID_MISMATCH.to_string()));
        }

        let gateway = require_gateway(&self.store, token).await?;
        let item = normalized(gateway.as_ref(), table_name, item).await?;
        gateway.replace_item(table_name, item_id, &item).await?;
        Ok(())
    }

    /// 删除记录；返回记录是否存在
    #[instrument(skip(self, token))]
    pub async fn delete_item(&self, token: Option<&str>, table_name: &str, item_id: &str) -> ApiResult<bool> {
        require_param(table_name, "tableName")?;
        require_param(item_id, "itemId")?;
        let gateway = require_gateway(&self.store, token).await?;
        Ok(gateway.delete_item(table_name, item_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_item_with_id_validation() {
        assert!(item_with_id(json!({"_id": "a", "x": 1})).is_ok());
        for body in [json!({"x": 1}), json!({"_id": 5}), json!("text")] {
            match item_with_id(body) {
                Err(ApiError::InvalidInput(msg)) => assert_eq!(msg, MSG_ID_MISSING),
                other => panic!("unexpected: {:?}", other),
            }
        }
    }
}
