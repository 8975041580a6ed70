// ==========================================
// Cusmon 表格数据管理 - 会话存储
// ==========================================
// 职责: 令牌 → 持久化网关 的进程级会话表
// 生命周期:
// - login: 打开网关成功后签发 UUID v4 令牌（替换旧令牌）
// - resolve: 每次需要数据库时读取；过期即淘汰；
//            从文件恢复的条目在首次使用时才打开网关
// - logout: 显式淘汰
// 每次变更后将 {token → {expiry, connect}} 写入 JSON 文件
// ==========================================

use crate::repository::{ItemRepository, ItemRepositoryImpl, RepositoryError};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

// ==========================================
// 错误类型
// ==========================================
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("连接失败: {0}")]
    ConnectFailed(#[from] RepositoryError),

    #[error("会话文件写入失败: {0}")]
    PersistFailed(String),
}

pub type SessionResult<T> = Result<T, SessionError>;

// ==========================================
// 连接参数
// ==========================================
/// 登录请求；server 为网关数据库位置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectData {
    pub username: String,
    pub password: String,
    pub server: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<String>,
}

/// 登录结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connected {
    pub token: String,
    /// 过期时间（毫秒时间戳）
    pub expiry: i64,
    pub tables: Vec<String>,
}

/// 持久化条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct StoredConnection {
    expiry: i64,
    connect: ConnectData,
}

// ==========================================
// GatewayConnector - 网关打开方式
// ==========================================
#[async_trait]
pub trait GatewayConnector: Send + Sync {
    async fn connect(&self, connect: &ConnectData) -> Result<Arc<dyn ItemRepository>, RepositoryError>;
}

/// 以 server 为 SQLite 文件路径打开网关
pub struct SqliteConnector;

#[async_trait]
impl GatewayConnector for SqliteConnector {
    async fn connect(&self, connect: &ConnectData) -> Result<Arc<dyn ItemRepository>, RepositoryError> {
        let repo = ItemRepositoryImpl::new(&connect.server)?;
        Ok(Arc::new(repo))
    }
}

struct Entry {
    stored: StoredConnection,
    gateway: Option<Arc<dyn ItemRepository>>,
}

// ==========================================
// SessionStore
// ==========================================
pub struct SessionStore {
    file: PathBuf,
    token_expiry_secs: i64,
    connector: Arc<dyn GatewayConnector>,
    entries: Mutex<HashMap<String, Entry>>,
}

impl SessionStore {
    /// 创建会话存储并从文件恢复条目（文件缺失或损坏时从空表开始）
    pub fn open(
        file: impl Into<PathBuf>,
        token_expiry_secs: i64,
        connector: Arc<dyn GatewayConnector>,
    ) -> Self {
        let file = file.into();
        let entries = load_entries(&file);
        info!(file = %file.display(), restored = entries.len(), "会话存储已加载");
        Self {
            file,
            token_expiry_secs,
            connector,
            entries: Mutex::new(entries),
        }
    }

    /// 使用 SQLite 网关
    pub fn sqlite(file: impl Into<PathBuf>, token_expiry_secs: i64) -> Self {
        Self::open(file, token_expiry_secs, Arc::new(SqliteConnector))
    }

    /// 登录
    ///
    /// # 参数
    /// - connect: 连接参数
    /// - previous_token: 调用方持有的旧令牌（登录成功后被淘汰）
    #[instrument(skip(self, connect, previous_token), fields(server = %connect.server))]
    pub async fn login(
        &self,
        connect: ConnectData,
        previous_token: Option<&str>,
    ) -> SessionResult<Connected> {
        let gateway = self.connector.connect(&connect).await?;
        let tables = gateway.list_tables().await?;

        let token = Uuid::new_v4().to_string();
        let expiry = Utc::now().timestamp_millis() + self.token_expiry_secs * 1000;

        let mut entries = self.entries.lock().await;
        if let Some(previous) = previous_token {
            if entries.remove(previous).is_some() {
                debug!("旧令牌已淘汰");
            }
        }
        entries.insert(
            token.clone(),
            Entry {
                stored: StoredConnection { expiry, connect },
                gateway: Some(gateway),
            },
        );
        self.flush(&entries)?;
        info!(tables = tables.len(), "登录成功");

        Ok(Connected {
            token,
            expiry,
            tables,
        })
    }

    /// 解析令牌；未知或已过期返回 None
    pub async fn resolve(&self, token: &str) -> SessionResult<Option<Arc<dyn ItemRepository>>> {
        let mut entries = self.entries.lock().await;
        let Some(entry) = entries.get(token) else {
            return Ok(None);
        };

        if entry.stored.expiry < Utc::now().timestamp_millis() {
            entries.remove(token);
            warn!("令牌已过期，已淘汰");
            self.flush(&entries)?;
            return Ok(None);
        }

        if let Some(gateway) = &entry.gateway {
            return Ok(Some(Arc::clone(gateway)));
        }

        // 从文件恢复的条目：首次使用时打开网关
        let connect = entry.stored.connect.clone();
        let gateway = self.connector.connect(&connect).await?;
        if let Some(entry) = entries.get_mut(token) {
            entry.gateway = Some(Arc::clone(&gateway));
        }
        debug!(server = %connect.server, "恢复的会话已打开网关");
        Ok(Some(gateway))
    }

    /// 登出；返回令牌是否存在
    pub async fn logout(&self, token: &str) -> SessionResult<bool> {
        let mut entries = self.entries.lock().await;
        let existed = entries.remove(token).is_some();
        self.flush(&entries)?;
        Ok(existed)
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn flush(&self, entries: &HashMap<String, Entry>) -> SessionResult<()> {
        let data: BTreeMap<&str, &StoredConnection> = entries
            .iter()
            .map(|(token, entry)| (token.as_str(), &entry.stored))
            .collect();
        let json = serde_json::to_string(&data).map_err(|e| SessionError::PersistFailed(e.to_string()))?;
        std::fs::write(&self.file, json).map_err(|e| SessionError::PersistFailed(e.to_string()))?;
        debug!(file = %self.file.display(), entries = data.len(), "会话文件已更新");
        Ok(())
    }
}

fn load_entries(file: &Path) -> HashMap<String, Entry> {
    let raw = match std::fs::read_to_string(file) {
        Ok(raw) => raw,
        Err(e) => {
            debug!(file = %file.display(), error = %e, "会话文件不可读，从空会话开始");
            return HashMap::new();
        }
    };
    match serde_json::from_str::<HashMap<String, StoredConnection>>(&raw) {
        Ok(stored) => stored
            .into_iter()
            .map(|(token, stored)| {
                (
                    token,
                    Entry {
                        stored,
                        gateway: None,
                    },
                )
            })
            .collect(),
        Err(e) => {
            error!(file = %file.display(), error = %e, "会话文件解析失败");
            HashMap::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn connect(dir: &TempDir) -> ConnectData {
        ConnectData {
            username: "user".to_string(),
            password: "secret".to_string(),
            server: dir.path().join("gateway.db").to_string_lossy().to_string(),
            parameters: None,
        }
    }

    #[tokio::test]
    async fn test_login_resolve_logout() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::sqlite(dir.path().join("connections.json"), 3600);

        let connected = store.login(connect(&dir), None).await.unwrap();
        assert!(connected.tables.is_empty());
        assert!(connected.expiry > Utc::now().timestamp_millis());

        let gateway = store.resolve(&connected.token).await.unwrap();
        assert!(gateway.is_some());

        assert!(store.logout(&connected.token).await.unwrap());
        assert!(store.resolve(&connected.token).await.unwrap().is_none());
        assert!(store.resolve("unknown").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_login_replaces_previous_token() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::sqlite(dir.path().join("connections.json"), 3600);
        let first = store.login(connect(&dir), None).await.unwrap();
        let second = store.login(connect(&dir), Some(&first.token)).await.unwrap();
        assert_ne!(first.token, second.token);
        assert_eq!(store.len().await, 1);
        assert!(store.resolve(&first.token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sessions_restore_from_file_and_expire() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("connections.json");
        let token = {
            let store = SessionStore::sqlite(&file, 3600);
            store.login(connect(&dir), None).await.unwrap().token
        };

        let restored = SessionStore::sqlite(&file, 3600);
        assert!(restored.resolve(&token).await.unwrap().is_some());

        let expired = SessionStore::sqlite(&file, -10);
        let old = expired.login(connect(&dir), None).await.unwrap();
        assert!(expired.resolve(&old.token).await.unwrap().is_none());
        // 过期条目已从文件中移除
        let reloaded = SessionStore::sqlite(&file, 3600);
        assert!(reloaded.resolve(&old.token).await.unwrap().is_none());
        assert!(reloaded.resolve(&token).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_failed_connect_issues_no_token() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::sqlite(dir.path().join("connections.json"), 3600);
        let bad = ConnectData {
            server: dir.path().join("missing").join("gateway.db").to_string_lossy().to_string(),
            ..connect(&dir)
        };
        assert!(matches!(
            store.login(bad, None).await,
            Err(SessionError::ConnectFailed(_))
        ));
        assert!(store.is_empty().await);
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("connections.json");
        std::fs::write(&file, "not json").unwrap();
        assert!(load_entries(&file).is_empty());
    }
}
