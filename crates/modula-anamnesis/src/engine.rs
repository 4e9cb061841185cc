//! 病历引擎
//!
//! 协调模板注册表、验证器、完成度计算、进度顾问和自动保存防护的
//! 核心引擎。只操作内存中的记录，持久化由调用方负责。

use crate::advisor::{MissingSection, ProgressAdvisor};
use crate::autosave::{AutoSaveDecision, AutoSaveGuard};
use crate::completion::{CompletionCalculator, COMPLETION_THRESHOLD};
use crate::validator::SectionValidator;
use chrono::{DateTime, Utc};
use modula_core::{AnamnesisRecord, AnamnesisStatus, ModulaError, Result, SectionName};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

/// 病历引擎
#[derive(Debug, Default)]
pub struct AnamnesisEngine {
    validator: SectionValidator,
    calculator: CompletionCalculator,
    advisor: ProgressAdvisor,
    guard: AutoSaveGuard,
}

/// 进度视图：完成度 + 缺失部分 + 下一建议部分
#[derive(Debug, Clone, Serialize)]
pub struct AnamnesisProgress {
    pub completion_percentage: i32,
    pub status: AnamnesisStatus,
    pub missing_sections: Vec<MissingSection>,
    pub next_suggested_section: Option<SectionName>,
}

impl AnamnesisEngine {
    pub fn new() -> Self {
        Self {
            validator: SectionValidator::new(),
            calculator: CompletionCalculator::new(),
            advisor: ProgressAdvisor::new(),
            guard: AutoSaveGuard::new(),
        }
    }

    /// 验证并写入一个部分，返回重新计算的完成度
    pub fn update_section(
        &self,
        record: &mut AnamnesisRecord,
        section: SectionName,
        data: Value,
        now: DateTime<Utc>,
    ) -> Result<i32> {
        if record.status == AnamnesisStatus::Completed {
            return Err(ModulaError::Conflict(
                "anamnese concluída não aceita novas edições".to_string(),
            ));
        }

        let report = self.validator.validate(section, &data);
        if !report.valid {
            return Err(ModulaError::Validation(report.errors.join("; ")));
        }

        self.apply_section(record, section, data, now);
        info!(
            "anamnesis {} section {} updated, completion {}%",
            record.id, section, record.completion_percentage
        );
        Ok(record.completion_percentage)
    }

    /// 自动保存：评估防护出口，接受时应用变更
    ///
    /// 不做模式验证 —— 自动保存是尽力而为的草稿持久化，严格验证
    /// 留给显式的部分更新。
    pub fn apply_auto_save(
        &self,
        record: &mut AnamnesisRecord,
        section: SectionName,
        incoming: &Value,
        client_timestamp: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AutoSaveDecision {
        let decision = self
            .guard
            .evaluate(record, section, incoming, client_timestamp, now);

        match decision {
            AutoSaveDecision::Apply => {
                self.apply_section(record, section, incoming.clone(), now);
                record.last_auto_save = Some(now);
            }
            AutoSaveDecision::NoChanges => {
                record.last_auto_save = Some(now);
            }
            AutoSaveDecision::Outdated { .. } | AutoSaveDecision::Conflict { .. } => {}
        }

        decision
    }

    /// 完成动作：低于阈值时拒绝，同时采集自由文本临床字段
    pub fn complete(
        &self,
        record: &mut AnamnesisRecord,
        professional_notes: Option<String>,
        treatment_plan: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if record.status == AnamnesisStatus::Completed {
            return Err(ModulaError::Conflict(
                "anamnese já foi concluída".to_string(),
            ));
        }

        let completion = self.calculator.calculate(record);
        if completion < COMPLETION_THRESHOLD {
            return Err(ModulaError::Validation(format!(
                "é necessário pelo menos {}% de preenchimento para concluir a anamnese (atual: {}%)",
                COMPLETION_THRESHOLD, completion
            )));
        }

        record.completion_percentage = completion;
        record.status = AnamnesisStatus::Completed;
        record.completed_at = Some(now);
        record.updated_at = now;
        if let Some(notes) = professional_notes {
            record.professional_notes = Some(notes);
        }
        if let Some(plan) = treatment_plan {
            record.treatment_plan = Some(plan);
        }

        info!("anamnesis {} completed at {}%", record.id, completion);
        Ok(())
    }

    /// 进度视图
    pub fn progress(
        &self,
        record: &AnamnesisRecord,
        current: Option<SectionName>,
    ) -> AnamnesisProgress {
        AnamnesisProgress {
            completion_percentage: self.calculator.calculate(record),
            status: record.status,
            missing_sections: self.advisor.missing_sections(record),
            next_suggested_section: self.advisor.next_suggested_section(record, current),
        }
    }

    /// 待办优先级评分
    pub fn priority_score(&self, record: &AnamnesisRecord, now: DateTime<Utc>) -> i32 {
        self.advisor.priority_score(record, now)
    }

    fn apply_section(
        &self,
        record: &mut AnamnesisRecord,
        section: SectionName,
        data: Value,
        now: DateTime<Utc>,
    ) {
        record.sections.set(section, data);
        record.last_modified_section = Some(section);
        record.completion_percentage = self.calculator.calculate(record);
        if record.status == AnamnesisStatus::Draft && record.completion_percentage > 0 {
            record.status = AnamnesisStatus::InProgress;
        }
        record.updated_at = now;
    }
}
