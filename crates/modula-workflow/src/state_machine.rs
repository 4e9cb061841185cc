//! 转诊状态机
//!
//! 管理转诊请求的完整生命周期状态转换。批量批准把批准与完成
//! 合并为一个用户可见的转换，用显式命名的事件表达。

use modula_core::{ModulaError, Result, TransferStatus};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 转诊状态转换事件
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TransferEvent {
    /// 单项批准，停留在approved
    Approve,
    /// 批量流程：批准并立即完成
    ApproveAndComplete,
    Reject,
    Complete,
    /// 发起的专业人员撤回
    Cancel,
}

/// 转诊状态机
#[derive(Debug)]
pub struct TransferStateMachine {
    transitions: HashMap<(TransferStatus, TransferEvent), TransferStatus>,
}

impl TransferStateMachine {
    /// 创建新的状态机实例
    pub fn new() -> Self {
        let mut transitions = HashMap::new();

        // 定义状态转换规则
        transitions.insert(
            (TransferStatus::Pending, TransferEvent::Approve),
            TransferStatus::Approved,
        );
        transitions.insert(
            (TransferStatus::Pending, TransferEvent::ApproveAndComplete),
            TransferStatus::Completed,
        );
        transitions.insert(
            (TransferStatus::Pending, TransferEvent::Reject),
            TransferStatus::Rejected,
        );
        transitions.insert(
            (TransferStatus::Pending, TransferEvent::Cancel),
            TransferStatus::Rejected,
        );
        transitions.insert(
            (TransferStatus::Approved, TransferEvent::Complete),
            TransferStatus::Completed,
        );

        Self { transitions }
    }

    /// 检查状态转换是否有效
    pub fn can_transition(&self, from: &TransferStatus, event: &TransferEvent) -> bool {
        self.transitions.contains_key(&(*from, event.clone()))
    }

    /// 执行状态转换
    pub fn transition(&self, from: &TransferStatus, event: &TransferEvent) -> Result<TransferStatus> {
        match self.transitions.get(&(*from, event.clone())) {
            Some(to) => Ok(*to),
            None => Err(ModulaError::InvalidStateTransition {
                from: format!("{:?}", from),
                event: format!("{:?}", event),
            }),
        }
    }

}

impl Default for TransferStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_transitions() {
        let sm = TransferStateMachine::new();

        assert!(sm.can_transition(&TransferStatus::Pending, &TransferEvent::Approve));
        assert!(sm.can_transition(&TransferStatus::Pending, &TransferEvent::ApproveAndComplete));
        assert!(sm.can_transition(&TransferStatus::Pending, &TransferEvent::Reject));
        assert!(sm.can_transition(&TransferStatus::Approved, &TransferEvent::Complete));
    }

    #[test]
    fn test_invalid_transitions() {
        let sm = TransferStateMachine::new();

        // 终态不再接受事件
        assert!(!sm.can_transition(&TransferStatus::Rejected, &TransferEvent::Approve));
        assert!(!sm.can_transition(&TransferStatus::Completed, &TransferEvent::Reject));
        assert!(!sm.can_transition(&TransferStatus::Approved, &TransferEvent::Approve));
    }

    #[test]
    fn test_transition_execution() {
        let sm = TransferStateMachine::new();

        let result = sm.transition(&TransferStatus::Pending, &TransferEvent::ApproveAndComplete);
        assert_eq!(result.unwrap(), TransferStatus::Completed);

        let result = sm.transition(&TransferStatus::Pending, &TransferEvent::Cancel);
        assert_eq!(result.unwrap(), TransferStatus::Rejected);

        let result = sm.transition(&TransferStatus::Completed, &TransferEvent::Cancel);
        assert!(result.is_err());
    }

    #[test]
    fn test_terminal_states_accept_no_events() {
        let sm = TransferStateMachine::new();
        let events = [
            TransferEvent::Approve,
            TransferEvent::ApproveAndComplete,
            TransferEvent::Reject,
            TransferEvent::Complete,
            TransferEvent::Cancel,
        ];
        for status in [TransferStatus::Rejected, TransferStatus::Completed] {
            for event in &events {
                assert!(!sm.can_transition(&status, event));
            }
        }
    }
}
