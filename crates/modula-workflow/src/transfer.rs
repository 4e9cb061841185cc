//! 转诊请求处理
//!
//! 发起请求的验证、管理员批量批准/拒绝、发起人撤回。批量动作
//! 逐项独立成败，从不整批回滚 —— 部分完成是设计行为。

use crate::state_machine::{TransferEvent, TransferStateMachine};
use chrono::{DateTime, Utc};
use modula_core::{ModulaError, Result, TransferRequest, TransferStatus, User, UserRole};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

/// 拒绝理由的最少字符数
pub const MIN_REJECT_REASON_CHARS: usize = 10;

/// 批量动作
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BulkTransferAction {
    Approve,
    Reject,
}

impl BulkTransferAction {
    /// 从请求体解析动作名
    pub fn parse(action: &str) -> Result<Self> {
        match action {
            "approve" => Ok(BulkTransferAction::Approve),
            "reject" => Ok(BulkTransferAction::Reject),
            other => Err(ModulaError::Validation(format!(
                "ação inválida: {} (esperado approve ou reject)",
                other
            ))),
        }
    }
}

/// 批量动作中单项的结果
#[derive(Debug, Clone, Serialize)]
pub struct BulkItemOutcome {
    pub transfer_id: Uuid,
    pub success: bool,
    pub new_status: Option<TransferStatus>,
    pub error: Option<String>,
}

/// 批量动作的汇总报告
///
/// processed + failed 恒等于实际尝试的待处理项数。
#[derive(Debug, Clone, Serialize)]
pub struct BulkActionReport {
    pub total_requested: usize,
    pub attempted: usize,
    pub processed: usize,
    pub failed: usize,
    pub details: Vec<BulkItemOutcome>,
}

impl BulkActionReport {
    pub fn new(total_requested: usize) -> Self {
        Self {
            total_requested,
            attempted: 0,
            processed: 0,
            failed: 0,
            details: Vec::new(),
        }
    }

    pub fn record_success(&mut self, transfer_id: Uuid, new_status: TransferStatus) {
        self.attempted += 1;
        self.processed += 1;
        self.details.push(BulkItemOutcome {
            transfer_id,
            success: true,
            new_status: Some(new_status),
            error: None,
        });
    }

    pub fn record_failure(&mut self, transfer_id: Uuid, error: String) {
        self.attempted += 1;
        self.failed += 1;
        self.details.push(BulkItemOutcome {
            transfer_id,
            success: false,
            new_status: None,
            error: Some(error),
        });
    }

    /// 把一个已记录成功的项降级为失败
    ///
    /// 状态转换在内存中成功、随后落盘失败时使用；不改变attempted，
    /// processed + failed == attempted 的恒等式保持成立。
    pub fn demote_to_failure(&mut self, transfer_id: Uuid, error: String) {
        let Some(outcome) = self
            .details
            .iter_mut()
            .find(|o| o.transfer_id == transfer_id && o.success)
        else {
            return;
        };
        outcome.success = false;
        outcome.new_status = None;
        outcome.error = Some(error);
        self.processed -= 1;
        self.failed += 1;
    }
}

/// 转诊处理器
#[derive(Debug, Default)]
pub struct TransferProcessor {
    state_machine: TransferStateMachine,
}

impl TransferProcessor {
    pub fn new() -> Self {
        Self {
            state_machine: TransferStateMachine::new(),
        }
    }

    /// 验证转诊请求的前置条件
    ///
    /// 目标必须是另一位处于激活状态的专业人员；每个患者同一时间
    /// 只允许一个待处理转诊。
    pub fn validate_request(
        &self,
        from: &User,
        to: &User,
        reason: &str,
        existing_pending: Option<&TransferRequest>,
    ) -> Result<()> {
        if reason.trim().is_empty() {
            return Err(ModulaError::Validation(
                "o motivo da transferência é obrigatório".to_string(),
            ));
        }
        if to.id == from.id {
            return Err(ModulaError::Validation(
                "não é possível transferir um paciente para o próprio profissional".to_string(),
            ));
        }
        if to.role != UserRole::Professional {
            return Err(ModulaError::Validation(
                "o destino da transferência deve ser um profissional".to_string(),
            ));
        }
        if !to.is_active {
            return Err(ModulaError::Validation(
                "o profissional de destino está inativo".to_string(),
            ));
        }
        if let Some(pending) = existing_pending {
            return Err(ModulaError::Conflict(format!(
                "o paciente já possui uma transferência pendente ({})",
                pending.id
            )));
        }
        Ok(())
    }

    /// 构建一条新的待处理转诊
    pub fn build_request(
        &self,
        patient_id: Uuid,
        from_professional_id: Uuid,
        to_professional_id: Uuid,
        reason: String,
        now: DateTime<Utc>,
    ) -> TransferRequest {
        let transfer = TransferRequest {
            id: Uuid::new_v4(),
            patient_id,
            from_professional_id,
            to_professional_id,
            reason,
            status: TransferStatus::Pending,
            admin_notes: None,
            requested_at: now,
            processed_at: None,
        };
        info!(
            "transfer {} requested for patient {} ({} -> {})",
            transfer.id, patient_id, from_professional_id, to_professional_id
        );
        transfer
    }

    /// 批量动作的整体前置验证，在触碰任何转诊之前执行
    pub fn validate_bulk_action(
        &self,
        action: BulkTransferAction,
        reason: Option<&str>,
    ) -> Result<()> {
        if action == BulkTransferAction::Reject {
            let reason_chars = reason.map(|r| r.trim().chars().count()).unwrap_or(0);
            if reason_chars < MIN_REJECT_REASON_CHARS {
                return Err(ModulaError::Validation(format!(
                    "o motivo da rejeição deve ter pelo menos {} caracteres",
                    MIN_REJECT_REASON_CHARS
                )));
            }
        }
        Ok(())
    }

    /// 对单个转诊应用批量动作
    ///
    /// 批准在批量流程中合并为批准+完成，一步到达completed。
    pub fn apply_bulk_item(
        &self,
        transfer: &mut TransferRequest,
        action: BulkTransferAction,
        reason: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<TransferStatus> {
        let event = match action {
            BulkTransferAction::Approve => TransferEvent::ApproveAndComplete,
            BulkTransferAction::Reject => TransferEvent::Reject,
        };

        let new_status = self.state_machine.transition(&transfer.status, &event)?;
        transfer.status = new_status;
        transfer.processed_at = Some(now);
        if let Some(reason) = reason {
            transfer.admin_notes = Some(reason.to_string());
        }

        info!("transfer {} processed: {:?}", transfer.id, new_status);
        Ok(new_status)
    }

    /// 纯内存的批量处理（持久化由调用方逐项负责时用于核算语义）
    ///
    /// 只尝试当前待处理的项；非待处理的项不计入attempted。
    pub fn apply_bulk(
        &self,
        transfers: &mut [TransferRequest],
        action: BulkTransferAction,
        reason: Option<&str>,
        total_requested: usize,
        now: DateTime<Utc>,
    ) -> Result<BulkActionReport> {
        self.validate_bulk_action(action, reason)?;

        let mut report = BulkActionReport::new(total_requested);
        for transfer in transfers
            .iter_mut()
            .filter(|t| t.status == TransferStatus::Pending)
        {
            match self.apply_bulk_item(transfer, action, reason, now) {
                Ok(new_status) => report.record_success(transfer.id, new_status),
                Err(e) => {
                    warn!("transfer {} failed in bulk action: {}", transfer.id, e);
                    report.record_failure(transfer.id, e.to_string());
                }
            }
        }
        Ok(report)
    }

    /// 发起的专业人员撤回自己的待处理转诊
    pub fn cancel(
        &self,
        transfer: &mut TransferRequest,
        caller_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if transfer.from_professional_id != caller_id {
            return Err(ModulaError::Forbidden(
                "apenas o profissional solicitante pode cancelar a transferência".to_string(),
            ));
        }

        let new_status = self
            .state_machine
            .transition(&transfer.status, &TransferEvent::Cancel)?;
        transfer.status = new_status;
        transfer.processed_at = Some(now);
        transfer.admin_notes = Some("cancelada pelo profissional solicitante".to_string());

        info!("transfer {} cancelled by requester", transfer.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn professional(active: bool) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Dra. Ana Souza".to_string(),
            email: "ana@modula.com.br".to_string(),
            role: UserRole::Professional,
            is_active: active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn pending_transfer(from: Uuid, to: Uuid) -> TransferRequest {
        TransferProcessor::new().build_request(
            Uuid::new_v4(),
            from,
            to,
            "Mudança de especialidade".to_string(),
            Utc::now(),
        )
    }

    #[test]
    fn test_validate_request() {
        let processor = TransferProcessor::new();
        let from = professional(true);
        let to = professional(true);

        assert!(processor
            .validate_request(&from, &to, "Mudança de especialidade", None)
            .is_ok());

        // 目标与发起人相同
        assert!(matches!(
            processor.validate_request(&from, &from, "motivo qualquer", None),
            Err(ModulaError::Validation(_))
        ));

        // 目标不活跃
        let inactive = professional(false);
        assert!(matches!(
            processor.validate_request(&from, &inactive, "motivo qualquer", None),
            Err(ModulaError::Validation(_))
        ));

        // 目标不是专业人员
        let mut admin = professional(true);
        admin.role = UserRole::Admin;
        assert!(matches!(
            processor.validate_request(&from, &admin, "motivo qualquer", None),
            Err(ModulaError::Validation(_))
        ));

        // 已有待处理转诊
        let existing = pending_transfer(from.id, to.id);
        assert!(matches!(
            processor.validate_request(&from, &to, "motivo qualquer", Some(&existing)),
            Err(ModulaError::Conflict(_))
        ));
    }

    #[test]
    fn test_bulk_approve_completes_in_one_step() {
        let processor = TransferProcessor::new();
        let now = Utc::now();
        let mut transfers = vec![pending_transfer(Uuid::new_v4(), Uuid::new_v4())];

        let report = processor
            .apply_bulk(&mut transfers, BulkTransferAction::Approve, None, 1, now)
            .unwrap();

        assert_eq!(report.processed, 1);
        assert_eq!(report.failed, 0);
        // 批准不停留在approved，直接到completed
        assert_eq!(transfers[0].status, TransferStatus::Completed);
        assert_eq!(transfers[0].processed_at, Some(now));
    }

    #[test]
    fn test_bulk_reject_requires_long_reason() {
        let processor = TransferProcessor::new();
        let mut transfers = vec![pending_transfer(Uuid::new_v4(), Uuid::new_v4())];

        // 理由过短 → 整批在处理前被拒绝
        let err = processor
            .apply_bulk(
                &mut transfers,
                BulkTransferAction::Reject,
                Some("ok"),
                1,
                Utc::now(),
            )
            .unwrap_err();
        assert!(matches!(err, ModulaError::Validation(_)));
        assert_eq!(transfers[0].status, TransferStatus::Pending);

        // 合格理由 → 正常拒绝
        let report = processor
            .apply_bulk(
                &mut transfers,
                BulkTransferAction::Reject,
                Some("documentação clínica incompleta"),
                1,
                Utc::now(),
            )
            .unwrap();
        assert_eq!(report.processed, 1);
        assert_eq!(transfers[0].status, TransferStatus::Rejected);
        assert_eq!(
            transfers[0].admin_notes.as_deref(),
            Some("documentação clínica incompleta")
        );
    }

    #[test]
    fn test_bulk_skips_non_pending() {
        let processor = TransferProcessor::new();
        let now = Utc::now();
        let mut transfers = vec![
            pending_transfer(Uuid::new_v4(), Uuid::new_v4()),
            pending_transfer(Uuid::new_v4(), Uuid::new_v4()),
            pending_transfer(Uuid::new_v4(), Uuid::new_v4()),
        ];
        transfers[1].status = TransferStatus::Rejected;

        let report = processor
            .apply_bulk(&mut transfers, BulkTransferAction::Approve, None, 3, now)
            .unwrap();

        // 3个请求的id中只有2个是待处理 → 只尝试2个
        assert_eq!(report.total_requested, 3);
        assert_eq!(report.attempted, 2);
        assert_eq!(report.processed + report.failed, 2);
        assert_eq!(transfers[1].status, TransferStatus::Rejected);
    }

    #[test]
    fn test_demote_to_failure_keeps_accounting() {
        let processor = TransferProcessor::new();
        let now = Utc::now();
        let mut transfers = vec![
            pending_transfer(Uuid::new_v4(), Uuid::new_v4()),
            pending_transfer(Uuid::new_v4(), Uuid::new_v4()),
        ];

        let mut report = processor
            .apply_bulk(&mut transfers, BulkTransferAction::Approve, None, 2, now)
            .unwrap();
        assert_eq!(report.processed, 2);

        // 落盘失败后该项变为失败，计数恒等式不变
        report.demote_to_failure(transfers[0].id, "connection reset".to_string());
        assert_eq!(report.processed, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.processed + report.failed, report.attempted);
        let outcome = report
            .details
            .iter()
            .find(|o| o.transfer_id == transfers[0].id)
            .unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("connection reset"));

        // 对同一项重复降级没有效果
        report.demote_to_failure(transfers[0].id, "again".to_string());
        assert_eq!(report.failed, 1);
    }

    #[test]
    fn test_cancel_only_by_requester() {
        let processor = TransferProcessor::new();
        let from = Uuid::new_v4();
        let mut transfer = pending_transfer(from, Uuid::new_v4());

        let err = processor
            .cancel(&mut transfer, Uuid::new_v4(), Utc::now())
            .unwrap_err();
        assert!(matches!(err, ModulaError::Forbidden(_)));
        assert_eq!(transfer.status, TransferStatus::Pending);

        processor.cancel(&mut transfer, from, Utc::now()).unwrap();
        assert_eq!(transfer.status, TransferStatus::Rejected);
        assert!(transfer.processed_at.is_some());
    }

    #[test]
    fn test_cancel_terminal_state_fails() {
        let processor = TransferProcessor::new();
        let from = Uuid::new_v4();
        let mut transfer = pending_transfer(from, Uuid::new_v4());
        transfer.status = TransferStatus::Completed;
        transfer.processed_at = Some(Utc::now() - Duration::hours(1));

        let err = processor
            .cancel(&mut transfer, from, Utc::now())
            .unwrap_err();
        assert!(matches!(err, ModulaError::InvalidStateTransition { .. }));
    }

    #[test]
    fn test_action_parsing() {
        assert_eq!(
            BulkTransferAction::parse("approve").unwrap(),
            BulkTransferAction::Approve
        );
        assert_eq!(
            BulkTransferAction::parse("reject").unwrap(),
            BulkTransferAction::Reject
        );
        assert!(BulkTransferAction::parse("delete").is_err());
    }
}
