// ==========================================
// Cusmon 表格数据管理 - API 层
// ==========================================
// 职责: 提供表 / 记录 / 导入 / 会话接口，供 CLI 或上层服务调用
// ==========================================

pub mod error;
pub mod import_api;
pub mod item_api;
pub mod session_api;
pub mod table_api;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use import_api::{ImportApi, ImportApiResponse, RenderedPreview};
pub use item_api::ItemApi;
pub use session_api::SessionApi;
pub use table_api::TableApi;
