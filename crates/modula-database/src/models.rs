//! 数据库模型
//!
//! 数据库表模型 - 使用FromRow trait用于SQL查询，状态以字符串存储，
//! 读取时转换为领域枚举。

use chrono::{DateTime, NaiveDate, Utc};
use modula_core::{
    AnamnesisRecord, AnamnesisSections, AnamnesisStatus, Patient, SectionName, TransferRequest,
    TransferStatus, User, UserRole,
};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// 数据库用户表
#[derive(Debug, FromRow)]
pub struct DbUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<DbUser> for User {
    fn from(db_user: DbUser) -> Self {
        User {
            id: db_user.id,
            name: db_user.name,
            email: db_user.email,
            role: match db_user.role.as_str() {
                "ADMIN" => UserRole::Admin,
                _ => UserRole::Professional, // 默认角色
            },
            is_active: db_user.is_active,
            created_at: db_user.created_at,
            updated_at: db_user.updated_at,
        }
    }
}

/// 数据库患者表
#[derive(Debug, FromRow)]
pub struct DbPatient {
    pub id: Uuid,
    pub name: String,
    pub birth_date: Option<NaiveDate>,
    pub professional_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<DbPatient> for Patient {
    fn from(db_patient: DbPatient) -> Self {
        Patient {
            id: db_patient.id,
            name: db_patient.name,
            birth_date: db_patient.birth_date,
            professional_id: db_patient.professional_id,
            created_at: db_patient.created_at,
            updated_at: db_patient.updated_at,
        }
    }
}

/// 数据库病历表（每个部分一个JSONB列）
#[derive(Debug, FromRow)]
pub struct DbAnamnesis {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub professional_id: Uuid,
    pub identification: Option<Value>,
    pub family_history: Option<Value>,
    pub current_complaint: Option<Value>,
    pub treatment_goals: Option<Value>,
    pub medical_history: Option<Value>,
    pub psychological_history: Option<Value>,
    pub lifestyle: Option<Value>,
    pub relationships: Option<Value>,
    pub status: String,
    pub completion_percentage: i32,
    pub last_modified_section: Option<String>,
    pub professional_notes: Option<String>,
    pub treatment_plan: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_auto_save: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<DbAnamnesis> for AnamnesisRecord {
    fn from(db: DbAnamnesis) -> Self {
        AnamnesisRecord {
            id: db.id,
            patient_id: db.patient_id,
            professional_id: db.professional_id,
            sections: AnamnesisSections {
                identification: db.identification,
                family_history: db.family_history,
                current_complaint: db.current_complaint,
                treatment_goals: db.treatment_goals,
                medical_history: db.medical_history,
                psychological_history: db.psychological_history,
                lifestyle: db.lifestyle,
                relationships: db.relationships,
            },
            status: match db.status.as_str() {
                "IN_PROGRESS" => AnamnesisStatus::InProgress,
                "COMPLETED" => AnamnesisStatus::Completed,
                _ => AnamnesisStatus::Draft, // 默认状态
            },
            completion_percentage: db.completion_percentage,
            last_modified_section: db
                .last_modified_section
                .as_deref()
                .and_then(SectionName::parse),
            professional_notes: db.professional_notes,
            treatment_plan: db.treatment_plan,
            created_at: db.created_at,
            updated_at: db.updated_at,
            last_auto_save: db.last_auto_save,
            completed_at: db.completed_at,
        }
    }
}

/// 数据库转诊表
#[derive(Debug, FromRow)]
pub struct DbTransfer {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub from_professional_id: Uuid,
    pub to_professional_id: Uuid,
    pub reason: String,
    pub status: String,
    pub admin_notes: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl From<DbTransfer> for TransferRequest {
    fn from(db: DbTransfer) -> Self {
        TransferRequest {
            id: db.id,
            patient_id: db.patient_id,
            from_professional_id: db.from_professional_id,
            to_professional_id: db.to_professional_id,
            reason: db.reason,
            status: match db.status.as_str() {
                "APPROVED" => TransferStatus::Approved,
                "REJECTED" => TransferStatus::Rejected,
                "COMPLETED" => TransferStatus::Completed,
                _ => TransferStatus::Pending, // 默认状态
            },
            admin_notes: db.admin_notes,
            requested_at: db.requested_at,
            processed_at: db.processed_at,
        }
    }
}
