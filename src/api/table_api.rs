// ==========================================
// Cusmon 表格数据管理 - 表管理 API
// ==========================================
// 职责: 表的创建 / 删除 / 列举，表设置（含表模式）的读写
// 校验顺序: 先校验请求，再解析会话
// ==========================================

use std::sync::Arc;

use serde_json::Value;
use tracing::{info, instrument};

use crate::api::error::{ApiError, ApiResult};
use crate::api::session_api::require_gateway;
use crate::domain::TableSettings;
use crate::session::SessionStore;

fn require_table_name(name: &str) -> ApiResult<()> {
    if name.trim().is_empty() {
        return Err(ApiError::InvalidInput("PathParam tableName missing".to_string()));
    }
    Ok(())
}

// ==========================================
// TableApi - 表管理 API
// ==========================================
pub struct TableApi {
    store: Arc<SessionStore>,
}

impl TableApi {
    pub fn new(store: Arc<SessionStore>) -> Self {
        Self { store }
    }

    /// 可见表名
    pub async fn list_tables(&self, token: Option<&str>) -> ApiResult<Vec<String>> {
        let gateway = require_gateway(&self.store, token).await?;
        Ok(gateway.list_tables().await?)
    }

    #[instrument(skip(self, token))]
    pub async fn create_table(&self, token: Option<&str>, table_name: &str) -> ApiResult<()> {
        require_table_name(table_name)?;
        let gateway = require_gateway(&self.store, token).await?;
        gateway.create_table(table_name).await?;
        info!(table = table_name, "表已创建");
        Ok(())
    }

    /// 删除表；返回表是否存在
    #[instrument(skip(self, token))]
    pub async fn drop_table(&self, token: Option<&str>, table_name: &str) -> ApiResult<bool> {
        require_table_name(table_name)?;
        let gateway = require_gateway(&self.store, token).await?;
        let existed = gateway.drop_table(table_name).await?;
        info!(table = table_name, existed, "表已删除");
        Ok(existed)
    }

    /// 读取表设置；未配置时返回空设置
    pub async fn get_settings(&self, token: Option<&str>, table_name: &str) -> ApiResult<TableSettings> {
        require_table_name(table_name)?;
        let gateway = require_gateway(&self.store, token).await?;
        Ok(gateway.get_settings(table_name).await?.unwrap_or_default())
    }

    /// 覆盖写入表设置
    ///
    /// # 参数
    /// - body: 表设置 JSON，必须符合表模式结构并满足模式约束
    #[instrument(skip(self, token, body))]
    pub async fn put_settings(&self, token: Option<&str>, table_name: &str, body: Value) -> ApiResult<()> {
        require_table_name(table_name)?;
        let settings: TableSettings = serde_json::from_value(body)
            .map_err(|e| ApiError::InvalidInput(format!("表设置不合法: {}", e)))?;
        settings.validate()?;

        let gateway = require_gateway(&self.store, token).await?;
        gateway.put_settings(table_name, &settings).await?;
        info!(
            table = table_name,
            fields = settings.schema.as_ref().map(|s| s.len()).unwrap_or(0),
            "表设置已保存"
        );
        Ok(())
    }
}
