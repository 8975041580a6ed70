// ==========================================
// Cusmon 表格数据管理 - 持久化网关实现
// ==========================================
// 职责: 在 SQLite 中模拟文档集合（使用 rusqlite）
// 存储: collections(name) + items(seq, collection, item_id, doc)
//       doc 为记录 JSON；seq 决定写入顺序
// 红线: Repository 不含业务规则，只做数据 CRUD
// ==========================================

use crate::db::{init_schema, open_sqlite_connection};
use crate::domain::{Item, TableSettings, ITEM_ID_KEY};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::item_repo::{settings_document_id, ItemRepository, SETTINGS_COLLECTION};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, instrument, warn};

// ==========================================
// ItemRepositoryImpl
// ==========================================
pub struct ItemRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
}

impl ItemRepositoryImpl {
    /// 打开（必要时创建）数据库文件并建表
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例（调用方负责建表）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn ensure_collection(conn: &Connection, name: &str) -> RepositoryResult<()> {
        conn.execute("INSERT OR IGNORE INTO collections (name) VALUES (?1)", params![name])?;
        Ok(())
    }

    fn insert_doc(conn: &Connection, table: &str, item: &Item) -> RepositoryResult<()> {
        let id = item
            .id()
            .ok_or_else(|| RepositoryError::ValidationError(format!("Field {} is missing", ITEM_ID_KEY)))?;
        let doc = serde_json::to_string(item)?;
        conn.execute(
            "INSERT INTO items (collection, item_id, doc) VALUES (?1, ?2, ?3)",
            params![table, id, doc],
        )?;
        Ok(())
    }

    fn query_docs(conn: &Connection, table: &str, limit: Option<usize>) -> RepositoryResult<Vec<Item>> {
        let limit = limit.map(|l| l as i64).unwrap_or(-1);
        let mut stmt = conn.prepare(
            "SELECT doc FROM items WHERE collection = ?1 ORDER BY seq LIMIT ?2",
        )?;
        let docs = stmt
            .query_map(params![table, limit], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        docs.iter()
            .map(|doc| serde_json::from_str::<Item>(doc).map_err(RepositoryError::from))
            .collect()
    }

    fn get_doc(conn: &Connection, table: &str, item_id: &str) -> RepositoryResult<Option<Item>> {
        let doc: Option<String> = conn
            .query_row(
                "SELECT doc FROM items WHERE collection = ?1 AND item_id = ?2",
                params![table, item_id],
                |row| row.get(0),
            )
            .optional()?;
        match doc {
            Some(doc) => Ok(Some(serde_json::from_str(&doc)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl ItemRepository for ItemRepositoryImpl {
    async fn list_tables(&self) -> RepositoryResult<Vec<String>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT name FROM collections ORDER BY name")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names.into_iter().filter(|n| !n.starts_with('_')).collect())
    }

    #[instrument(skip(self))]
    async fn create_table(&self, name: &str) -> RepositoryResult<()> {
        if name.is_empty() {
            return Err(RepositoryError::ValidationError("表名不能为空".to_string()));
        }
        let conn = self.get_conn()?;
        conn.execute("INSERT INTO collections (name) VALUES (?1)", params![name])?;
        info!("表已创建");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn drop_table(&self, name: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let removed_items = conn.execute("DELETE FROM items WHERE collection = ?1", params![name])?;
        let removed = conn.execute("DELETE FROM collections WHERE name = ?1", params![name])?;
        info!(removed_items, existed = removed > 0, "表已删除");
        Ok(removed > 0)
    }

    async fn get_settings(&self, table: &str) -> RepositoryResult<Option<TableSettings>> {
        let conn = self.get_conn()?;
        let Some(doc) = Self::get_doc(&conn, SETTINGS_COLLECTION, &settings_document_id(table))? else {
            return Ok(None);
        };
        let mut value = doc.into_value();
        if let Value::Object(map) = &mut value {
            map.remove(ITEM_ID_KEY);
        }
        Ok(Some(serde_json::from_value(value)?))
    }

    #[instrument(skip(self, settings))]
    async fn put_settings(&self, table: &str, settings: &TableSettings) -> RepositoryResult<()> {
        let id = settings_document_id(table);
        let mut value = serde_json::to_value(settings)?;
        match &mut value {
            Value::Object(map) => {
                map.insert(ITEM_ID_KEY.to_string(), Value::String(id.clone()));
            }
            _ => {
                return Err(RepositoryError::SerializationError(
                    "表设置必须序列化为对象".to_string(),
                ))
            }
        }
        let doc = serde_json::to_string(&value)?;

        let conn = self.get_conn()?;
        Self::ensure_collection(&conn, SETTINGS_COLLECTION)?;
        conn.execute(
            r#"
            INSERT INTO items (collection, item_id, doc) VALUES (?1, ?2, ?3)
            ON CONFLICT(collection, item_id) DO UPDATE SET doc = excluded.doc
            "#,
            params![SETTINGS_COLLECTION, id, doc],
        )?;
        debug!("表设置已写入");
        Ok(())
    }

    async fn list_items(&self, table: &str, limit: usize) -> RepositoryResult<Vec<Item>> {
        let conn = self.get_conn()?;
        Self::query_docs(&conn, table, Some(limit))
    }

    async fn get_item(&self, table: &str, item_id: &str) -> RepositoryResult<Option<Item>> {
        let conn = self.get_conn()?;
        Self::get_doc(&conn, table, item_id)
    }

    async fn insert_item(&self, table: &str, item: &Item) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        Self::ensure_collection(&conn, table)?;
        Self::insert_doc(&conn, table, item)
    }

    #[instrument(skip(self, items), fields(count = items.len()))]
    async fn bulk_insert(&self, table: &str, items: &[Item]) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        Self::ensure_collection(&conn, table)?;

        let mut inserted = 0;
        for (index, item) in items.iter().enumerate() {
            match Self::insert_doc(&conn, table, item) {
                Ok(()) => inserted += 1,
                Err(RepositoryError::DuplicateKey(msg)) => {
                    warn!(index, inserted, id = ?item.id(), "批量插入遇到重复主键，停止");
                    return Err(RepositoryError::DuplicateKey(format!(
                        "第 {} 条 (_id={}) 重复，已写入 {} 条: {}",
                        index + 1,
                        item.id().unwrap_or_default(),
                        inserted,
                        msg
                    )));
                }
                Err(e) => return Err(e),
            }
        }
        info!(inserted, "批量插入完成");
        Ok(inserted)
    }

    async fn replace_item(&self, table: &str, item_id: &str, item: &Item) -> RepositoryResult<()> {
        let doc = serde_json::to_string(item)?;
        let conn = self.get_conn()?;
        let updated = conn.execute(
            "UPDATE items SET doc = ?3 WHERE collection = ?1 AND item_id = ?2",
            params![table, item_id, doc],
        )?;
        if updated == 0 {
            return Err(RepositoryError::not_found(table, item_id));
        }
        Ok(())
    }

    async fn delete_item(&self, table: &str, item_id: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let removed = conn.execute(
            "DELETE FROM items WHERE collection = ?1 AND item_id = ?2",
            params![table, item_id],
        )?;
        Ok(removed > 0)
    }

    async fn fetch_tables(
        &self,
        tables: &BTreeSet<String>,
    ) -> RepositoryResult<HashMap<String, Vec<Item>>> {
        let conn = self.get_conn()?;
        let mut data = HashMap::with_capacity(tables.len());
        for table in tables {
            let items = Self::query_docs(&conn, table, None)?;
            debug!(table = %table, items = items.len(), "引用表已读取");
            data.insert(table.clone(), items);
        }
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FieldSchema, FieldType, TableSchema};
    use serde_json::json;

    fn repo() -> ItemRepositoryImpl {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        ItemRepositoryImpl::from_connection(Arc::new(Mutex::new(conn)))
    }

    fn item(value: Value) -> Item {
        Item::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn test_tables_hide_internal_collections() {
        let repo = repo();
        repo.create_table("orders").await.unwrap();
        repo.put_settings("orders", &TableSettings::default()).await.unwrap();
        assert_eq!(repo.list_tables().await.unwrap(), vec!["orders".to_string()]);
        assert!(matches!(
            repo.create_table("orders").await,
            Err(RepositoryError::UniqueConstraintViolation(_))
        ));
    }

    #[tokio::test]
    async fn test_settings_roundtrip_and_overwrite() {
        let repo = repo();
        assert!(repo.get_settings("orders").await.unwrap().is_none());

        let schema = TableSchema::new().with_field("name", FieldSchema::new(FieldType::String, "Name"));
        repo.put_settings("orders", &TableSettings::with_schema(schema.clone()))
            .await
            .unwrap();
        let extended = schema.with_field("code", FieldSchema::new(FieldType::String, "Code"));
        repo.put_settings("orders", &TableSettings::with_schema(extended.clone()))
            .await
            .unwrap();

        let loaded = repo.get_settings("orders").await.unwrap().unwrap();
        assert_eq!(loaded.schema, Some(extended));
    }

    #[tokio::test]
    async fn test_items_keep_insertion_order_and_limit() {
        let repo = repo();
        for id in ["c", "a", "b"] {
            repo.insert_item("orders", &item(json!({"_id": id}))).await.unwrap();
        }
        let items = repo.list_items("orders", 2).await.unwrap();
        let ids: Vec<&str> = items.iter().filter_map(Item::id).collect();
        assert_eq!(ids, vec!["c", "a"]);
        // 插入时隐式创建表
        assert_eq!(repo.list_tables().await.unwrap(), vec!["orders".to_string()]);
    }

    #[tokio::test]
    async fn test_insert_duplicate_id_fails() {
        let repo = repo();
        repo.insert_item("orders", &item(json!({"_id": "x"}))).await.unwrap();
        let err = repo.insert_item("orders", &item(json!({"_id": "x"}))).await.unwrap_err();
        assert!(matches!(err, RepositoryError::DuplicateKey(_)));
        // 不同表可使用相同主键
        repo.insert_item("other", &item(json!({"_id": "x"}))).await.unwrap();
    }

    #[tokio::test]
    async fn test_bulk_insert_stops_at_first_duplicate() {
        let repo = repo();
        repo.insert_item("orders", &item(json!({"_id": "2"}))).await.unwrap();
        let batch = vec![
            item(json!({"_id": "1"})),
            item(json!({"_id": "2"})),
            item(json!({"_id": "3"})),
        ];
        let err = repo.bulk_insert("orders", &batch).await.unwrap_err();
        assert!(matches!(err, RepositoryError::DuplicateKey(_)));

        let ids: Vec<String> = repo
            .list_items("orders", 100)
            .await
            .unwrap()
            .iter()
            .filter_map(|i| i.id().map(str::to_string))
            .collect();
        assert_eq!(ids, vec!["2".to_string(), "1".to_string()]);
    }

    #[tokio::test]
    async fn test_replace_and_delete() {
        let repo = repo();
        repo.insert_item("orders", &item(json!({"_id": "x", "n": 1}))).await.unwrap();
        repo.replace_item("orders", "x", &item(json!({"_id": "x", "n": 2})))
            .await
            .unwrap();
        let loaded = repo.get_item("orders", "x").await.unwrap().unwrap();
        assert_eq!(loaded.get("n"), Some(&json!(2)));

        assert!(matches!(
            repo.replace_item("orders", "missing", &item(json!({"_id": "missing"}))).await,
            Err(RepositoryError::NotFound { .. })
        ));
        assert!(repo.delete_item("orders", "x").await.unwrap());
        assert!(!repo.delete_item("orders", "x").await.unwrap());
    }

    #[tokio::test]
    async fn test_drop_table_removes_items() {
        let repo = repo();
        repo.insert_item("orders", &item(json!({"_id": "x"}))).await.unwrap();
        assert!(repo.drop_table("orders").await.unwrap());
        assert!(repo.list_items("orders", 10).await.unwrap().is_empty());
        assert!(!repo.drop_table("orders").await.unwrap());
    }

    #[tokio::test]
    async fn test_fetch_tables() {
        let repo = repo();
        repo.insert_item("customers", &item(json!({"_id": "a", "code": "X1"})))
            .await
            .unwrap();
        let tables: BTreeSet<String> = ["customers".to_string(), "empty".to_string()].into();
        let data = repo.fetch_tables(&tables).await.unwrap();
        assert_eq!(data["customers"].len(), 1);
        assert!(data["empty"].is_empty());
    }
}
