//! 进度顾问
//!
//! 从病历当前状态派生三类独立视图：缺失部分、下一建议部分、
//! 待办队列的优先级评分。

use crate::completion::section_has_content;
use crate::schema::{SchemaRegistry, DEFAULT_ESTIMATED_MINUTES};
use chrono::{DateTime, Utc};
use modula_core::{AnamnesisRecord, SectionName};
use serde::Serialize;

/// 推荐的填写顺序，决定下一建议部分的遍历次序
pub const RECOMMENDED_ORDER: [SectionName; 8] = [
    SectionName::CurrentComplaint,
    SectionName::TreatmentGoals,
    SectionName::MedicalHistory,
    SectionName::PsychologicalHistory,
    SectionName::Identification,
    SectionName::Lifestyle,
    SectionName::Relationships,
    SectionName::FamilyHistory,
];

/// 缺失部分及其填写估时
#[derive(Debug, Clone, Serialize)]
pub struct MissingSection {
    pub section: SectionName,
    pub title: String,
    pub estimated_minutes: u32,
}

/// 进度顾问
#[derive(Debug, Default)]
pub struct ProgressAdvisor {
    registry: SchemaRegistry,
}

impl ProgressAdvisor {
    pub fn new() -> Self {
        Self {
            registry: SchemaRegistry::new(),
        }
    }

    /// 部分被判为缺失：顶层没有任何携带内容的值
    pub fn is_missing(&self, record: &AnamnesisRecord, section: SectionName) -> bool {
        record
            .sections
            .get(section)
            .map(|data| !section_has_content(data))
            .unwrap_or(true)
    }

    /// 缺失部分列表，带标题和估时
    pub fn missing_sections(&self, record: &AnamnesisRecord) -> Vec<MissingSection> {
        SectionName::ALL
            .iter()
            .filter(|section| self.is_missing(record, **section))
            .map(|section| {
                let template = self.registry.get(*section);
                MissingSection {
                    section: *section,
                    title: template
                        .map(|t| t.title.to_string())
                        .unwrap_or_else(|| section.as_str().to_string()),
                    estimated_minutes: template
                        .map(|t| t.estimated_minutes)
                        .unwrap_or(DEFAULT_ESTIMATED_MINUTES),
                }
            })
            .collect()
    }

    /// 下一建议部分
    ///
    /// 给定current时返回推荐顺序中current之后的第一个缺失部分；
    /// current之后没有缺失时回到全局顺序，但不再建议current本身；
    /// 未给定current时取全局顺序的第一个缺失部分；没有可建议的
    /// 部分时返回None。
    pub fn next_suggested_section(
        &self,
        record: &AnamnesisRecord,
        current: Option<SectionName>,
    ) -> Option<SectionName> {
        if let Some(current) = current {
            if let Some(pos) = RECOMMENDED_ORDER.iter().position(|s| *s == current) {
                if let Some(next) = RECOMMENDED_ORDER[pos + 1..]
                    .iter()
                    .copied()
                    .find(|s| self.is_missing(record, *s))
                {
                    return Some(next);
                }
            }

            return RECOMMENDED_ORDER
                .iter()
                .copied()
                .find(|s| *s != current && self.is_missing(record, *s));
        }

        RECOMMENDED_ORDER
            .iter()
            .copied()
            .find(|s| self.is_missing(record, *s))
    }

    /// 待办优先级评分（1-10，分数越高越紧急）
    ///
    /// 基础分5；创建超过7天+2、超过14天再+2；完成度超过50%减1、
    /// 超过70%再减1；queixa atual已有内容减1。
    pub fn priority_score(&self, record: &AnamnesisRecord, now: DateTime<Utc>) -> i32 {
        let mut score = 5;

        let age_days = now.signed_duration_since(record.created_at).num_days();
        if age_days > 7 {
            score += 2;
        }
        if age_days > 14 {
            score += 2;
        }

        if record.completion_percentage > 50 {
            score -= 1;
        }
        if record.completion_percentage > 70 {
            score -= 1;
        }

        if !self.is_missing(record, SectionName::CurrentComplaint) {
            score -= 1;
        }

        score.clamp(1, 10)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::CompletionCalculator;
    use crate::test_support::full_payload;
    use chrono::Duration;
    use serde_json::json;
    use uuid::Uuid;

    fn empty_record() -> AnamnesisRecord {
        AnamnesisRecord::new_draft(Uuid::new_v4(), Uuid::new_v4(), Utc::now())
    }

    #[test]
    fn test_all_sections_missing_on_empty_record() {
        let advisor = ProgressAdvisor::new();
        let record = empty_record();
        let missing = advisor.missing_sections(&record);
        assert_eq!(missing.len(), 8);
        assert!(missing.iter().all(|m| m.estimated_minutes > 0));
    }

    #[test]
    fn test_section_with_content_not_missing() {
        let advisor = ProgressAdvisor::new();
        let mut record = empty_record();
        record.sections.set(
            SectionName::CurrentComplaint,
            json!({"main_complaint": "insônia"}),
        );
        assert!(!advisor.is_missing(&record, SectionName::CurrentComplaint));
        assert_eq!(advisor.missing_sections(&record).len(), 7);
    }

    #[test]
    fn test_missing_agrees_with_completion() {
        // 顾问判为缺失的部分对整体分数的贡献必须是0
        let advisor = ProgressAdvisor::new();
        let calc = CompletionCalculator::new();
        let mut record = empty_record();
        record.sections.set(
            SectionName::Lifestyle,
            json!({"sleep_quality": "", "diet": null}),
        );

        assert!(advisor.is_missing(&record, SectionName::Lifestyle));
        assert_eq!(
            calc.section_completion(
                SectionName::Lifestyle,
                record.sections.get(SectionName::Lifestyle)
            ),
            0
        );
    }

    #[test]
    fn test_next_suggested_follows_recommended_order() {
        let advisor = ProgressAdvisor::new();
        let record = empty_record();
        // 空记录：推荐顺序的第一个
        assert_eq!(
            advisor.next_suggested_section(&record, None),
            Some(SectionName::CurrentComplaint)
        );
        // current之后的第一个缺失
        assert_eq!(
            advisor.next_suggested_section(&record, Some(SectionName::CurrentComplaint)),
            Some(SectionName::TreatmentGoals)
        );
    }

    #[test]
    fn test_next_suggested_wraps_to_start() {
        let advisor = ProgressAdvisor::new();
        let mut record = empty_record();
        // 只剩推荐顺序中最靠前和最靠后的两个部分缺失
        for section in SectionName::ALL {
            if section != SectionName::CurrentComplaint && section != SectionName::FamilyHistory {
                record.sections.set(section, full_payload(section));
            }
        }
        // current是顺序中最后的缺失部分 → 回到开头的第一个缺失
        assert_eq!(
            advisor.next_suggested_section(&record, Some(SectionName::FamilyHistory)),
            Some(SectionName::CurrentComplaint)
        );
    }

    #[test]
    fn test_next_suggested_skips_current_when_only_it_missing() {
        let advisor = ProgressAdvisor::new();
        let mut record = empty_record();
        // 只剩family_history缺失，而它正是current → 不再建议它自己
        for section in SectionName::ALL {
            if section != SectionName::FamilyHistory {
                record.sections.set(section, full_payload(section));
            }
        }
        assert_eq!(
            advisor.next_suggested_section(&record, Some(SectionName::FamilyHistory)),
            None
        );
        // 不给current时它仍是全局顺序的第一个缺失部分
        assert_eq!(
            advisor.next_suggested_section(&record, None),
            Some(SectionName::FamilyHistory)
        );
    }

    #[test]
    fn test_next_suggested_none_when_complete() {
        let advisor = ProgressAdvisor::new();
        let mut record = empty_record();
        for section in SectionName::ALL {
            record.sections.set(section, full_payload(section));
        }
        assert_eq!(advisor.next_suggested_section(&record, None), None);
        assert_eq!(
            advisor.next_suggested_section(&record, Some(SectionName::Lifestyle)),
            None
        );
    }

    #[test]
    fn test_priority_score_base() {
        let advisor = ProgressAdvisor::new();
        let record = empty_record();
        assert_eq!(advisor.priority_score(&record, Utc::now()), 5);
    }

    #[test]
    fn test_priority_score_age_increases() {
        let advisor = ProgressAdvisor::new();
        let now = Utc::now();
        let mut record = empty_record();

        record.created_at = now - Duration::days(8);
        assert_eq!(advisor.priority_score(&record, now), 7);

        record.created_at = now - Duration::days(15);
        assert_eq!(advisor.priority_score(&record, now), 9);
    }

    #[test]
    fn test_priority_score_completion_decreases() {
        let advisor = ProgressAdvisor::new();
        let now = Utc::now();
        let mut record = empty_record();

        record.completion_percentage = 60;
        assert_eq!(advisor.priority_score(&record, now), 4);

        record.completion_percentage = 80;
        assert_eq!(advisor.priority_score(&record, now), 3);
    }

    #[test]
    fn test_priority_score_bounds() {
        let advisor = ProgressAdvisor::new();
        let now = Utc::now();
        let mut record = empty_record();

        // 最低情形：新记录、完成度高、queixa已填 → 不低于1
        record.completion_percentage = 90;
        record.sections.set(
            SectionName::CurrentComplaint,
            json!({"main_complaint": "x"}),
        );
        let low = advisor.priority_score(&record, now);
        assert!((1..=10).contains(&low));

        // 最高情形：很旧且完全空 → 不超过10
        let mut old = empty_record();
        old.created_at = now - Duration::days(30);
        let high = advisor.priority_score(&old, now);
        assert!((1..=10).contains(&high));
        assert_eq!(high, 9);
    }

    #[test]
    fn test_priority_monotonic_in_age() {
        let advisor = ProgressAdvisor::new();
        let now = Utc::now();
        let mut previous = 0;
        for days in [0, 5, 8, 12, 15, 40] {
            let mut record = empty_record();
            record.created_at = now - Duration::days(days);
            let score = advisor.priority_score(&record, now);
            assert!(score >= previous, "score caiu com idade {}", days);
            previous = score;
        }
    }

    #[test]
    fn test_priority_monotonic_in_completion() {
        let advisor = ProgressAdvisor::new();
        let now = Utc::now();
        let mut previous = 10;
        for completion in [0, 40, 55, 75, 100] {
            let mut record = empty_record();
            record.completion_percentage = completion;
            let score = advisor.priority_score(&record, now);
            assert!(score <= previous, "score subiu com completude {}", completion);
            previous = score;
        }
    }
}
