//! # Módula病历模块
//!
//! 提供完整的病历（anamnese）进度管理功能，包括：
//! - 部分模板注册表：八个固定部分的字段模式，进程级只读常量
//! - 部分验证器：持久化前根据模板验证提交数据，收集全部违规
//! - 完成度计算：从各部分内容派生0-100的完成度分数
//! - 进度顾问：缺失部分、下一建议部分和待办优先级评分
//! - 自动保存防护：判定传入的自动保存是过期、冲突还是可写入

pub mod advisor;
pub mod autosave;
pub mod completion;
pub mod engine;
pub mod schema;
pub mod validator;

// 重新导出主要类型
pub use advisor::{MissingSection, ProgressAdvisor, RECOMMENDED_ORDER};
pub use autosave::{
    AutoSaveDecision, AutoSaveGuard, CODE_AUTO_SAVE_ERROR, CODE_CONFLICT, CODE_OUTDATED,
    MAX_CLIENT_AGE_SECS,
};
pub use completion::{
    section_has_content, value_has_content, CompletionCalculator, COMPLETION_THRESHOLD,
};
pub use engine::{AnamnesisEngine, AnamnesisProgress};
pub use schema::{FieldSchema, FieldType, SchemaRegistry, SectionTemplate};
pub use validator::{SectionValidator, ValidationReport};
