// ==========================================
// Cusmon 表格数据管理 - 会话层
// ==========================================
// 职责: 显式传递的进程级会话存储（令牌 → 网关）
// ==========================================

pub mod store;

pub use store::{
    ConnectData, Connected, GatewayConnector, SessionError, SessionResult, SessionStore,
    SqliteConnector,
};
