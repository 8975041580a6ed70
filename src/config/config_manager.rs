// ==========================================
// Cusmon 表格数据管理 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (scope_id='global' + key-value)
// 未覆写的键使用内置默认值
// ==========================================

use crate::config::import_config_trait::{ConfigResult, ImportConfigReader};
use crate::db::{init_schema, open_sqlite_connection};
use crate::importer::DEFAULT_DATE_FORMAT;
use async_trait::async_trait;
use rusqlite::{params, Connection};
use serde_json::json;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tracing::warn;

// ==========================================
// 配置键
// ==========================================
pub mod config_keys {
    pub const DEFAULT_DATE_FORMAT: &str = "import_default_date_format";
    pub const PREVIEW_ROWS: &str = "import_preview_rows";
    pub const ITEMS_LIMIT: &str = "items_limit";
    pub const TOKEN_EXPIRY_SECS: &str = "session_token_expiry_secs";
    pub const SESSION_FILE: &str = "session_file";
}

pub const DEFAULT_PREVIEW_ROWS: usize = 5;
pub const DEFAULT_ITEMS_LIMIT: usize = 100;
pub const DEFAULT_TOKEN_EXPIRY_SECS: i64 = 86_400;
pub const DEFAULT_SESSION_FILE: &str = "./connections.json";

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> ConfigResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        init_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：会对传入连接再次应用统一 PRAGMA 并建表（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ConfigResult<Self> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
            init_schema(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 写入配置值（UPSERT）
    pub fn set_config_value(&self, key: &str, value: &str) -> ConfigResult<()> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    fn get_config_or_default(&self, key: &str, default: &str) -> ConfigResult<String> {
        Ok(self.get_config_value(key)?.unwrap_or_else(|| default.to_string()))
    }

    /// 读取并解析数值配置；格式错误时告警并使用默认值
    fn get_parsed_or_default<T>(&self, key: &str, default: T) -> ConfigResult<T>
    where
        T: FromStr + Copy + std::fmt::Display,
    {
        let Some(raw) = self.get_config_value(key)? else {
            return Ok(default);
        };
        match raw.trim().parse::<T>() {
            Ok(value) => Ok(value),
            Err(_) => {
                warn!(config_key = key, raw_value = %raw, default = %default, "配置值格式错误，使用默认值");
                Ok(default)
            }
        }
    }

    /// 获取所有覆写配置的快照（JSON格式）
    pub fn get_config_snapshot(&self) -> ConfigResult<String> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&json!(config_map))?)
    }
}

// ==========================================
// ImportConfigReader Trait 实现
// ==========================================
#[async_trait]
impl ImportConfigReader for ConfigManager {
    async fn get_default_date_format(&self) -> ConfigResult<String> {
        let value = self.get_config_or_default(config_keys::DEFAULT_DATE_FORMAT, DEFAULT_DATE_FORMAT)?;
        if value.trim().is_empty() {
            return Ok(DEFAULT_DATE_FORMAT.to_string());
        }
        Ok(value)
    }

    async fn get_preview_rows(&self) -> ConfigResult<usize> {
        self.get_parsed_or_default(config_keys::PREVIEW_ROWS, DEFAULT_PREVIEW_ROWS)
    }

    async fn get_items_limit(&self) -> ConfigResult<usize> {
        self.get_parsed_or_default(config_keys::ITEMS_LIMIT, DEFAULT_ITEMS_LIMIT)
    }

    async fn get_token_expiry_secs(&self) -> ConfigResult<i64> {
        self.get_parsed_or_default(config_keys::TOKEN_EXPIRY_SECS, DEFAULT_TOKEN_EXPIRY_SECS)
    }

    async fn get_session_file(&self) -> ConfigResult<String> {
        self.get_config_or_default(config_keys::SESSION_FILE, DEFAULT_SESSION_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[tokio::test]
    async fn test_defaults_when_no_overrides() {
        let config = manager();
        assert_eq!(config.get_default_date_format().await.unwrap(), "DD-MM-YYYY");
        assert_eq!(config.get_preview_rows().await.unwrap(), 5);
        assert_eq!(config.get_items_limit().await.unwrap(), 100);
        assert_eq!(config.get_token_expiry_secs().await.unwrap(), 86_400);
        assert_eq!(config.get_session_file().await.unwrap(), "./connections.json");
        assert_eq!(config.get_config_snapshot().unwrap(), "{}");
    }

    #[tokio::test]
    async fn test_overrides_and_invalid_values() {
        let config = manager();
        config.set_config_value(config_keys::PREVIEW_ROWS, "10").unwrap();
        config.set_config_value(config_keys::ITEMS_LIMIT, "lots").unwrap();
        config.set_config_value(config_keys::DEFAULT_DATE_FORMAT, "YYYY/MM/DD").unwrap();
        assert_eq!(config.get_preview_rows().await.unwrap(), 10);
        assert_eq!(config.get_items_limit().await.unwrap(), 100);
        assert_eq!(config.get_default_date_format().await.unwrap(), "YYYY/MM/DD");

        config.set_config_value(config_keys::PREVIEW_ROWS, "3").unwrap();
        assert_eq!(config.get_preview_rows().await.unwrap(), 3);

        let snapshot: BTreeMap<String, String> =
            serde_json::from_str(&config.get_config_snapshot().unwrap()).unwrap();
        assert_eq!(snapshot.len(), 3);
    }
}
