//! # Módula转诊工作流模块
//!
//! 管理患者在专业人员之间的转诊请求，包括：
//! - 转诊状态机：pending → approved/rejected → completed的生命周期
//! - 批量处理：管理员批量批准/拒绝，逐项独立成败
//! - 紧急度分类：按等待时间为待处理转诊分桶排序

pub mod state_machine;
pub mod transfer;
pub mod urgency;

// 重新导出主要类型
pub use state_machine::{TransferEvent, TransferStateMachine};
pub use transfer::{
    BulkActionReport, BulkItemOutcome, BulkTransferAction, TransferProcessor,
    MIN_REJECT_REASON_CHARS,
};
pub use urgency::{classify_wait, sort_by_urgency, TransferUrgency, TransferWaitInfo};
