// ==========================================
// Cusmon 表格数据管理 - 核心库
// ==========================================
// 职责: 模式驱动的表格导入 + 表/记录持久化网关
// 技术栈: Rust + SQLite + calamine/csv
// 流程: 表格文件 → 源读取 → 列映射/值转换 → 自动填充 → copy 解析 → 批量写入
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "zh-CN");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 模式与记录
pub mod domain;

// 字段类型能力注册表
pub mod fields;

// 导入层 - 表格文件 → 记录
pub mod importer;

// 数据仓储层 - 持久化网关
pub mod repository;

// 会话层 - 令牌 → 网关
pub mod session;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// API 层 - 业务接口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

pub use domain::{
    AutoFillMethod, CellValue, FieldSchema, FieldType, Item, SortDirection, TableSchema,
    TableSettings,
};

pub use importer::{
    ColumnMapping, ImportError, ImportPipeline, ImportSession, TabularSource, UniversalFileParser,
};

pub use repository::{ItemRepository, ItemRepositoryImpl, RepositoryError};

pub use session::{ConnectData, Connected, SessionStore};

pub use api::{ApiError, ImportApi, ItemApi, SessionApi, TableApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "Cusmon 表格数据管理";
