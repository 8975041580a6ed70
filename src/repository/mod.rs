// ==========================================
// Cusmon 表格数据管理 - 数据仓储层（持久化网关）
// ==========================================
// 红线: Repository 不含业务逻辑
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod error;
pub mod item_repo;
pub mod item_repo_impl;

// 重导出核心仓储
pub use error::{RepositoryError, RepositoryResult};
pub use item_repo::{settings_document_id, ItemRepository, SETTINGS_COLLECTION};
pub use item_repo_impl::ItemRepositoryImpl;
