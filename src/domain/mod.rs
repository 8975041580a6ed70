// ==========================================
// Cusmon 表格数据管理 - 领域模型层
// ==========================================
// 职责: 定义模式、记录、单元格等领域类型
// 红线: 不含数据访问逻辑,不含导入流程逻辑
// ==========================================

pub mod cell;
pub mod item;
pub mod schema;
pub mod types;

// 重导出核心类型
pub use cell::{CellValue, Grid};
pub use item::{value_to_text, Item, ITEM_ID_KEY};
pub use schema::{
    Appearance, FieldSchema, ImportOptions, ReferenceConfig, SchemaError, TableSchema,
    TableSettings, Validations,
};
pub use types::{AutoFillMethod, FieldType, SortDirection};
