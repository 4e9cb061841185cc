//! 病历HTTP处理器

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::{DateTime, Utc};
use modula_anamnesis::{AutoSaveDecision, CODE_AUTO_SAVE_ERROR, CODE_CONFLICT, CODE_OUTDATED};
use modula_core::{AnamnesisRecord, ModulaError, SectionName};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::server::AppState;

/// API根路径处理器
pub async fn api_root() -> impl IntoResponse {
    Json(json!({
        "service": "Modula API",
        "version": "1.0.0",
        "status": "running",
        "endpoints": {
            "health": "/health",
            "api": "/api/v1"
        }
    }))
}

/// 健康检查处理器
pub async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
        "version": "1.0.0"
    }))
}

/// 获取患者病历，不存在时创建空草稿
pub async fn get_or_create_anamnesis(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    Path(patient_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let queries = state.queries();

    // 患者和病历互不依赖，并发读取
    let (patient, existing) = tokio::join!(
        queries.get_patient_by_id(&patient_id),
        queries.get_anamnesis_by_patient_id(&patient_id),
    );

    let patient = patient?.ok_or_else(|| {
        ModulaError::NotFound(format!("paciente {} não encontrado", patient_id))
    })?;

    let owner = patient.professional_id.unwrap_or_else(|| caller.id());
    if !caller.can_access(owner) {
        return Err(ModulaError::Forbidden(
            "o paciente pertence a outro profissional".to_string(),
        )
        .into());
    }

    let record = match existing? {
        Some(record) => record,
        None => {
            let record = AnamnesisRecord::new_draft(patient_id, owner, Utc::now());
            queries.create_anamnesis(&record).await?;
            info!("anamnesis {} created for patient {}", record.id, patient_id);
            record
        }
    };

    let progress = state.engine.progress(&record, record.last_modified_section);
    Ok(Json(json!({
        "anamnesis": record,
        "progress": progress
    })))
}

/// 显式创建病历，已存在时返回409
pub async fn create_anamnesis(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    Path(patient_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let queries = state.queries();

    let patient = queries.get_patient_by_id(&patient_id).await?.ok_or_else(|| {
        ModulaError::NotFound(format!("paciente {} não encontrado", patient_id))
    })?;

    let owner = patient.professional_id.unwrap_or_else(|| caller.id());
    if !caller.can_access(owner) {
        return Err(ModulaError::Forbidden(
            "o paciente pertence a outro profissional".to_string(),
        )
        .into());
    }

    let record = AnamnesisRecord::new_draft(patient_id, owner, Utc::now());
    queries.create_anamnesis(&record).await?;
    info!("anamnesis {} created for patient {}", record.id, patient_id);

    Ok((StatusCode::CREATED, Json(json!({ "anamnesis": record }))))
}

/// 验证并写入一个部分
pub async fn update_section(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    Path((id, section)): Path<(Uuid, String)>,
    Json(data): Json<Value>,
) -> ApiResult<impl IntoResponse> {
    let section = SectionName::parse(&section).ok_or_else(|| {
        ModulaError::Validation(format!("seção desconhecida: {}", section))
    })?;

    let queries = state.queries();
    let mut record = load_owned(&state, &caller, &id).await?;

    let now = Utc::now();
    state.engine.update_section(&mut record, section, data, now)?;
    queries.save_section(&record, section).await?;

    let progress = state.engine.progress(&record, Some(section));
    Ok(Json(json!({
        "completion_percentage": record.completion_percentage,
        "progress": progress
    })))
}

/// 自动保存请求体
#[derive(Debug, Deserialize)]
pub struct AutoSaveRequest {
    pub section: SectionName,
    pub data: Value,
    pub client_timestamp: DateTime<Utc>,
}

/// 自动保存：防护出口决定响应
///
/// 持久化失败是软响应（HTTP 200, success=false），自动保存从不
/// 让编辑会话因为存储问题而中断。
pub async fn auto_save(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<AutoSaveRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let queries = state.queries();
    let mut record = load_owned(&state, &caller, &id).await?;

    let now = Utc::now();
    let decision = state.engine.apply_auto_save(
        &mut record,
        body.section,
        &body.data,
        body.client_timestamp,
        now,
    );

    let response = match decision {
        AutoSaveDecision::Outdated { server_value } => (
            StatusCode::CONFLICT,
            Json(json!({
                "success": false,
                "code": CODE_OUTDATED,
                "message": "os dados do cliente estão desatualizados, recarregue a seção",
                "server_value": server_value
            })),
        ),
        AutoSaveDecision::Conflict {
            server_value,
            server_updated_at,
        } => (
            StatusCode::CONFLICT,
            Json(json!({
                "success": false,
                "code": CODE_CONFLICT,
                "message": "a seção foi modificada por outra sessão",
                "server_value": server_value,
                "server_updated_at": server_updated_at
            })),
        ),
        AutoSaveDecision::NoChanges => {
            match queries.touch_auto_save(&record.id, now).await {
                Ok(()) => (
                    StatusCode::OK,
                    Json(json!({
                        "success": true,
                        "has_changes": false,
                        "last_auto_save": now
                    })),
                ),
                Err(e) => soft_failure(&record.id, e),
            }
        }
        AutoSaveDecision::Apply => {
            match queries.save_section(&record, body.section).await {
                Ok(()) => (
                    StatusCode::OK,
                    Json(json!({
                        "success": true,
                        "has_changes": true,
                        "completion_percentage": record.completion_percentage,
                        "last_auto_save": now
                    })),
                ),
                Err(e) => soft_failure(&record.id, e),
            }
        }
    };

    Ok(response)
}

fn soft_failure(id: &Uuid, e: ModulaError) -> (StatusCode, Json<Value>) {
    warn!("auto-save persistence failed for anamnesis {}: {}", id, e);
    (
        StatusCode::OK,
        Json(json!({
            "success": false,
            "code": CODE_AUTO_SAVE_ERROR,
            "message": "não foi possível salvar automaticamente, tente novamente"
        })),
    )
}

/// 完成请求体
#[derive(Debug, Deserialize)]
pub struct CompleteRequest {
    pub professional_notes: Option<String>,
    pub treatment_plan: Option<String>,
}

/// 完成病历（完成度阈值门控）
pub async fn complete_anamnesis(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<CompleteRequest>,
) -> ApiResult<impl IntoResponse> {
    let queries = state.queries();
    let mut record = load_owned(&state, &caller, &id).await?;

    state.engine.complete(
        &mut record,
        body.professional_notes,
        body.treatment_plan,
        Utc::now(),
    )?;
    queries.save_completion(&record).await?;

    Ok(Json(json!({ "anamnesis": record })))
}

/// 调用方的未完成病历，按优先级降序
pub async fn pending_anamneses(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
) -> ApiResult<impl IntoResponse> {
    let queries = state.queries();
    let records = queries
        .list_incomplete_by_professional(&caller.id())
        .await?;

    let now = Utc::now();
    let mut items: Vec<(i32, Value)> = records
        .into_iter()
        .map(|record| {
            let priority = state.engine.priority_score(&record, now);
            let progress = state.engine.progress(&record, record.last_modified_section);
            let item = json!({
                "anamnesis_id": record.id,
                "patient_id": record.patient_id,
                "status": record.status,
                "completion_percentage": progress.completion_percentage,
                "missing_sections": progress.missing_sections,
                "next_suggested_section": progress.next_suggested_section,
                "priority": priority,
                "created_at": record.created_at,
                "updated_at": record.updated_at
            });
            (priority, item)
        })
        .collect();

    items.sort_by_key(|(priority, _)| std::cmp::Reverse(*priority));

    let items: Vec<Value> = items.into_iter().map(|(_, item)| item).collect();
    Ok(Json(json!({
        "total": items.len(),
        "items": items
    })))
}

/// 加载病历并检查归属权限
async fn load_owned(
    state: &AppState,
    caller: &CurrentUser,
    id: &Uuid,
) -> Result<AnamnesisRecord, ModulaError> {
    let record = state
        .queries()
        .get_anamnesis_by_id(id)
        .await?
        .ok_or_else(|| ModulaError::NotFound(format!("anamnese {} não encontrada", id)))?;

    if !caller.can_access(record.professional_id) {
        return Err(ModulaError::Forbidden(
            "a anamnese pertence a outro profissional".to_string(),
        ));
    }

    Ok(record)
}
