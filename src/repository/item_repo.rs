// ==========================================
// Cusmon 表格数据管理 - 持久化网关 Trait
// ==========================================
// 职责: 定义表（集合）、表设置与记录的数据访问接口
// 红线: Repository 不含业务规则，只做数据 CRUD
// ==========================================

use crate::domain::{Item, TableSettings};
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};

/// 表设置所在的内部集合
pub const SETTINGS_COLLECTION: &str = "_settings";

/// 表设置文档的 _id
pub fn settings_document_id(table: &str) -> String {
    format!("table#{}", table)
}

// ==========================================
// ItemRepository Trait
// ==========================================
// 实现者: ItemRepositoryImpl（使用 rusqlite）
#[async_trait]
pub trait ItemRepository: Send + Sync {
    // ===== 表管理 =====

    /// 可见表名（排除以 "_" 开头的内部集合）
    async fn list_tables(&self) -> RepositoryResult<Vec<String>>;

    /// 创建表；已存在返回 UniqueConstraintViolation
    async fn create_table(&self, name: &str) -> RepositoryResult<()>;

    /// 删除表及其全部记录；返回表是否存在
    async fn drop_table(&self, name: &str) -> RepositoryResult<bool>;

    // ===== 表设置 =====

    async fn get_settings(&self, table: &str) -> RepositoryResult<Option<TableSettings>>;

    /// 写入表设置（覆盖）
    async fn put_settings(&self, table: &str, settings: &TableSettings) -> RepositoryResult<()>;

    // ===== 记录 =====

    /// 按写入顺序返回前 limit 条
    async fn list_items(&self, table: &str, limit: usize) -> RepositoryResult<Vec<Item>>;

    async fn get_item(&self, table: &str, item_id: &str) -> RepositoryResult<Option<Item>>;

    /// 单条插入；_id 重复返回 DuplicateKey
    async fn insert_item(&self, table: &str, item: &Item) -> RepositoryResult<()>;

    /// 有序批量插入（不覆盖、不使用事务）
    ///
    /// # 返回
    /// - Ok(usize): 插入条数
    /// - Err(DuplicateKey): 遇到首个重复 _id 即停止，之前的记录保持已写入
    async fn bulk_insert(&self, table: &str, items: &[Item]) -> RepositoryResult<usize>;

    /// 覆盖已存在的记录；不存在返回 NotFound
    async fn replace_item(&self, table: &str, item_id: &str, item: &Item) -> RepositoryResult<()>;

    /// 删除记录；返回记录是否存在
    async fn delete_item(&self, table: &str, item_id: &str) -> RepositoryResult<bool>;

    /// 一次性取出多张表的全部记录（导入前预取被引用表）
    async fn fetch_tables(
        &self,
        tables: &BTreeSet<String>,
    ) -> RepositoryResult<HashMap<String, Vec<Item>>>;
}
