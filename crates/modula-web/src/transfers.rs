//! 转诊HTTP处理器

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::Utc;
use modula_core::{ModulaError, TransferStatus};
use modula_workflow::{classify_wait, sort_by_urgency, BulkTransferAction};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::server::AppState;

/// 转诊请求体
#[derive(Debug, Deserialize)]
pub struct TransferCreateRequest {
    pub patient_id: Uuid,
    pub to_professional_id: Uuid,
    pub reason: String,
}

/// 发起转诊请求
pub async fn request_transfer(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    Json(body): Json<TransferCreateRequest>,
) -> ApiResult<impl IntoResponse> {
    let queries = state.queries();

    // 三个读取互不依赖，并发执行
    let (patient, target, pending) = tokio::join!(
        queries.get_patient_by_id(&body.patient_id),
        queries.get_user_by_id(&body.to_professional_id),
        queries.get_pending_transfer_by_patient(&body.patient_id),
    );

    let patient = patient?.ok_or_else(|| {
        ModulaError::NotFound(format!("paciente {} não encontrado", body.patient_id))
    })?;
    let target = target?.ok_or_else(|| {
        ModulaError::NotFound(format!(
            "profissional {} não encontrado",
            body.to_professional_id
        ))
    })?;
    let pending = pending?;

    if let Some(owner) = patient.professional_id {
        if !caller.can_access(owner) {
            return Err(ModulaError::Forbidden(
                "o paciente pertence a outro profissional".to_string(),
            )
            .into());
        }
    }

    state
        .transfers
        .validate_request(&caller.0, &target, &body.reason, pending.as_ref())?;

    let transfer = state.transfers.build_request(
        patient.id,
        caller.id(),
        target.id,
        body.reason,
        Utc::now(),
    );
    queries.create_transfer(&transfer).await?;

    Ok((StatusCode::CREATED, Json(json!({ "transfer": transfer }))))
}

/// 批量动作请求体
#[derive(Debug, Deserialize)]
pub struct BulkActionRequest {
    pub transfer_ids: Vec<Uuid>,
    pub action: String,
    pub reason: Option<String>,
}

/// 管理员批量批准/拒绝
///
/// 整体前置验证在触碰任何转诊之前执行；之后逐项独立成败，
/// 单项失败不回滚其余项。
pub async fn bulk_action(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    Json(body): Json<BulkActionRequest>,
) -> ApiResult<impl IntoResponse> {
    if !caller.is_admin() {
        return Err(ModulaError::Forbidden(
            "apenas administradores podem processar transferências".to_string(),
        )
        .into());
    }

    let action = BulkTransferAction::parse(&body.action)?;

    let queries = state.queries();
    let mut transfers = queries.get_transfers_by_ids(&body.transfer_ids).await?;

    // 批量语义（前置验证、只处理待处理项、逐项核算）在处理器内完成
    let now = Utc::now();
    let mut report = state.transfers.apply_bulk(
        &mut transfers,
        action,
        body.reason.as_deref(),
        body.transfer_ids.len(),
        now,
    )?;

    // 状态转换成功的项逐个落盘，落盘失败降级为该项失败
    for i in 0..report.details.len() {
        let outcome = &report.details[i];
        if !outcome.success {
            continue;
        }
        let transfer_id = outcome.transfer_id;
        let new_status = outcome.new_status;

        let Some(transfer) = transfers.iter().find(|t| t.id == transfer_id) else {
            continue;
        };

        let persisted = async {
            queries.save_transfer(transfer).await?;
            // 批准即完成：患者划归新的专业人员
            if new_status == Some(TransferStatus::Completed) {
                queries
                    .reassign_patient(&transfer.patient_id, &transfer.to_professional_id)
                    .await?;
            }
            Ok::<(), ModulaError>(())
        };

        if let Err(e) = persisted.await {
            report.demote_to_failure(transfer_id, e.to_string());
        }
    }

    info!(
        "bulk {} processed: {} ok, {} failed of {} requested",
        body.action, report.processed, report.failed, report.total_requested
    );
    Ok(Json(report))
}

/// 发起人撤回待处理转诊
pub async fn cancel_transfer(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let queries = state.queries();
    let mut transfer = queries
        .get_transfer_by_id(&id)
        .await?
        .ok_or_else(|| ModulaError::NotFound(format!("transferência {} não encontrada", id)))?;

    state.transfers.cancel(&mut transfer, caller.id(), Utc::now())?;
    queries.save_transfer(&transfer).await?;

    Ok(Json(json!({ "transfer": transfer })))
}

/// 管理员的待处理转诊面板，按紧急度降序
pub async fn pending_transfers(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
) -> ApiResult<impl IntoResponse> {
    if !caller.is_admin() {
        return Err(ModulaError::Forbidden(
            "apenas administradores podem ver a fila de transferências".to_string(),
        )
        .into());
    }

    let queries = state.queries();
    let mut transfers = queries.list_pending_transfers().await?;

    let now = Utc::now();
    sort_by_urgency(&mut transfers, now);

    let mut counts = [0usize; 4]; // critical, high, medium, low
    let items: Vec<Value> = transfers
        .iter()
        .map(|transfer| {
            let wait = classify_wait(transfer.requested_at, now);
            counts[3 - wait.urgency.rank() as usize] += 1;
            json!({
                "transfer": transfer,
                "wait_days": wait.wait_days,
                "wait_hours": wait.wait_hours,
                "urgency": wait.urgency
            })
        })
        .collect();

    Ok(Json(json!({
        "total": items.len(),
        "counts": {
            "critical": counts[0],
            "high": counts[1],
            "medium": counts[2],
            "low": counts[3]
        },
        "items": items
    })))
}
