//! 核心数据模型定义

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// 病历（anamnese）的八个固定部分
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SectionName {
    Identification,
    FamilyHistory,
    CurrentComplaint,
    TreatmentGoals,
    MedicalHistory,
    PsychologicalHistory,
    Lifestyle,
    Relationships,
}

impl SectionName {
    /// 全部固定部分，按数据模型顺序排列
    pub const ALL: [SectionName; 8] = [
        SectionName::Identification,
        SectionName::FamilyHistory,
        SectionName::CurrentComplaint,
        SectionName::TreatmentGoals,
        SectionName::MedicalHistory,
        SectionName::PsychologicalHistory,
        SectionName::Lifestyle,
        SectionName::Relationships,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SectionName::Identification => "identification",
            SectionName::FamilyHistory => "family_history",
            SectionName::CurrentComplaint => "current_complaint",
            SectionName::TreatmentGoals => "treatment_goals",
            SectionName::MedicalHistory => "medical_history",
            SectionName::PsychologicalHistory => "psychological_history",
            SectionName::Lifestyle => "lifestyle",
            SectionName::Relationships => "relationships",
        }
    }

    /// 从URL路径或数据库字段名解析
    pub fn parse(name: &str) -> Option<SectionName> {
        match name {
            "identification" => Some(SectionName::Identification),
            "family_history" => Some(SectionName::FamilyHistory),
            "current_complaint" => Some(SectionName::CurrentComplaint),
            "treatment_goals" => Some(SectionName::TreatmentGoals),
            "medical_history" => Some(SectionName::MedicalHistory),
            "psychological_history" => Some(SectionName::PsychologicalHistory),
            "lifestyle" => Some(SectionName::Lifestyle),
            "relationships" => Some(SectionName::Relationships),
            _ => None,
        }
    }
}

impl std::fmt::Display for SectionName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 病历各部分的内容
///
/// 每个部分是由对应模板声明形状的任意JSON负载，
/// 在API入口处验证，而不是依赖结构类型。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnamnesisSections {
    pub identification: Option<Value>,
    pub family_history: Option<Value>,
    pub current_complaint: Option<Value>,
    pub treatment_goals: Option<Value>,
    pub medical_history: Option<Value>,
    pub psychological_history: Option<Value>,
    pub lifestyle: Option<Value>,
    pub relationships: Option<Value>,
}

impl AnamnesisSections {
    pub fn get(&self, section: SectionName) -> Option<&Value> {
        match section {
            SectionName::Identification => self.identification.as_ref(),
            SectionName::FamilyHistory => self.family_history.as_ref(),
            SectionName::CurrentComplaint => self.current_complaint.as_ref(),
            SectionName::TreatmentGoals => self.treatment_goals.as_ref(),
            SectionName::MedicalHistory => self.medical_history.as_ref(),
            SectionName::PsychologicalHistory => self.psychological_history.as_ref(),
            SectionName::Lifestyle => self.lifestyle.as_ref(),
            SectionName::Relationships => self.relationships.as_ref(),
        }
    }

    pub fn set(&mut self, section: SectionName, value: Value) {
        let slot = match section {
            SectionName::Identification => &mut self.identification,
            SectionName::FamilyHistory => &mut self.family_history,
            SectionName::CurrentComplaint => &mut self.current_complaint,
            SectionName::TreatmentGoals => &mut self.treatment_goals,
            SectionName::MedicalHistory => &mut self.medical_history,
            SectionName::PsychologicalHistory => &mut self.psychological_history,
            SectionName::Lifestyle => &mut self.lifestyle,
            SectionName::Relationships => &mut self.relationships,
        };
        *slot = Some(value);
    }

    /// 按固定顺序遍历全部部分
    pub fn iter(&self) -> impl Iterator<Item = (SectionName, Option<&Value>)> + '_ {
        SectionName::ALL.iter().map(move |s| (*s, self.get(*s)))
    }
}

/// 病历状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AnamnesisStatus {
    Draft,
    InProgress,
    Completed,
}

impl AnamnesisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnamnesisStatus::Draft => "DRAFT",
            AnamnesisStatus::InProgress => "IN_PROGRESS",
            AnamnesisStatus::Completed => "COMPLETED",
        }
    }
}

/// 病历记录
///
/// 每个患者只有一条记录，归创建它的专业人员所有。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnamnesisRecord {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub professional_id: Uuid, // 归属的专业人员ID
    pub sections: AnamnesisSections,
    pub status: AnamnesisStatus,
    pub completion_percentage: i32, // 派生值，写入后缓存
    pub last_modified_section: Option<SectionName>,
    pub professional_notes: Option<String>, // 完成时采集的临床备注
    pub treatment_plan: Option<String>,     // 完成时采集的治疗计划
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_auto_save: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl AnamnesisRecord {
    /// 创建一条空白的草稿记录
    pub fn new_draft(patient_id: Uuid, professional_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            patient_id,
            professional_id,
            sections: AnamnesisSections::default(),
            status: AnamnesisStatus::Draft,
            completion_percentage: 0,
            last_modified_section: None,
            professional_notes: None,
            treatment_plan: None,
            created_at: now,
            updated_at: now,
            last_auto_save: None,
            completed_at: None,
        }
    }
}

/// 转诊请求状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    Pending,
    Approved,
    Rejected,
    Completed,
}

impl TransferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Pending => "PENDING",
            TransferStatus::Approved => "APPROVED",
            TransferStatus::Rejected => "REJECTED",
            TransferStatus::Completed => "COMPLETED",
        }
    }

    /// 终态不再接受任何事件
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferStatus::Rejected | TransferStatus::Completed)
    }
}

/// 转诊请求
///
/// 表示将患者从一位专业人员移交给另一位的请求，需管理员审批。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRequest {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub from_professional_id: Uuid,
    pub to_professional_id: Uuid,
    pub reason: String,
    pub status: TransferStatus,
    pub admin_notes: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

/// 用户角色
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// 管理员 - 审批转诊、查看全部待办
    Admin,
    /// 专业人员 - 维护自己患者的病历
    Professional,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "ADMIN",
            UserRole::Professional => "PROFESSIONAL",
        }
    }
}

/// 用户基本信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 患者基本信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub name: String,
    pub birth_date: Option<NaiveDate>,
    pub professional_id: Option<Uuid>, // 当前负责的专业人员
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_section_name_roundtrip() {
        for section in SectionName::ALL {
            assert_eq!(SectionName::parse(section.as_str()), Some(section));
        }
        assert_eq!(SectionName::parse("unknown_section"), None);
    }

    #[test]
    fn test_sections_get_set() {
        let mut sections = AnamnesisSections::default();
        assert!(sections.get(SectionName::CurrentComplaint).is_none());

        sections.set(SectionName::CurrentComplaint, json!({"main_complaint": "ansiedade"}));
        assert_eq!(
            sections.get(SectionName::CurrentComplaint),
            Some(&json!({"main_complaint": "ansiedade"}))
        );

        let filled: Vec<_> = sections.iter().filter(|(_, v)| v.is_some()).collect();
        assert_eq!(filled.len(), 1);
    }
}
