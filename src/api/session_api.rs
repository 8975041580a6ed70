// ==========================================
// Cusmon 表格数据管理 - 会话 API
// ==========================================
// 职责: 登录 / 登出；为其他 API 解析令牌对应的网关
// ==========================================

use std::sync::Arc;

use serde_json::Value;
use tracing::{info, instrument};

use crate::api::error::{ApiError, ApiResult};
use crate::repository::ItemRepository;
use crate::session::{ConnectData, Connected, SessionStore};

/// 解析令牌；无令牌、未知令牌或已过期均返回 Unauthorized
pub(crate) async fn require_gateway(
    store: &SessionStore,
    token: Option<&str>,
) -> ApiResult<Arc<dyn ItemRepository>> {
    let Some(token) = token else {
        return Err(ApiError::Unauthorized);
    };
    store.resolve(token).await?.ok_or(ApiError::Unauthorized)
}

// ==========================================
// SessionApi - 会话 API
// ==========================================
pub struct SessionApi {
    store: Arc<SessionStore>,
}

impl SessionApi {
    pub fn new(store: Arc<SessionStore>) -> Self {
        Self { store }
    }

    /// 登录
    ///
    /// # 参数
    /// - body: 连接参数 JSON（username / password / server 必填，parameters 可选）
    /// - previous_token: 调用方当前持有的令牌，登录成功后被淘汰
    ///
    /// # 返回
    /// - Ok(Connected): 新令牌、过期时间与可见表名
    /// - Err(ApiError::InvalidInput): 参数不合法或网关无法打开
    #[instrument(skip(self, body, previous_token))]
    pub async fn login(&self, body: Value, previous_token: Option<&str>) -> ApiResult<Connected> {
        let connect: ConnectData = serde_json::from_value(body)
            .map_err(|e| ApiError::InvalidInput(format!("连接参数不合法: {}", e)))?;
        let connected = self.store.login(connect, previous_token).await?;
        info!(tables = connected.tables.len(), "会话已建立");
        Ok(connected)
    }

    /// 登出；返回令牌是否存在
    pub async fn logout(&self, token: &str) -> ApiResult<bool> {
        Ok(self.store.logout(token).await?)
    }

    /// 当前令牌是否有效
    pub async fn is_active(&self, token: &str) -> ApiResult<bool> {
        Ok(self.store.resolve(token).await?.is_some())
    }
}
