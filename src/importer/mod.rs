// ==========================================
// Cusmon 表格数据管理 - 导入层
// ==========================================
// 职责: 表格文件 → 符合表模式的记录序列
// 阶段: 源读取 → 列映射 + 值转换 → 自动填充 → copy 解析
// ==========================================

// 模块声明
pub mod auto_fill;
pub mod column_mapper;
pub mod copy_resolver;
pub mod error;
pub mod file_parser;
pub mod importer_trait;
pub mod pipeline;
pub mod session;
pub mod source_reader;
pub mod value_coercion;

// 重导出核心类型
pub use auto_fill::{row_hash, AutoFillConfig, AutoFillResolver};
pub use column_mapper::ColumnMapping;
pub use copy_resolver::{CopyPlan, CopyResolver};
pub use error::{ImportError, ImportResult};
pub use file_parser::{CsvParser, ExcelParser, Sheet, UniversalFileParser, Workbook};
pub use pipeline::{ImportPipeline, PipelineRows};
pub use session::{ColumnSample, ImportSession, SessionConfig};
pub use source_reader::{find_anchor, Anchor, TabularSource};
pub use value_coercion::{
    ReferenceIndex, ValueCoercionEngine, DEFAULT_DATE_FORMAT, INVALID_DATE,
};

// 重导出 Trait 接口
pub use importer_trait::FileParser;
