//! 完成度计算
//!
//! 纯函数：分数只取决于各部分的内容，与写入顺序无关，重复调用结果一致。

use crate::schema::SchemaRegistry;
use modula_core::{AnamnesisRecord, SectionName};
use serde_json::Value;

/// 允许执行完成动作的最低完成度
pub const COMPLETION_THRESHOLD: i32 = 80;

/// 判定一个值是否携带内容
///
/// 数组要求非空，对象要求至少一个键，标量要求非null且非空字符串。
pub fn value_has_content(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::Bool(_) | Value::Number(_) => true,
    }
}

/// 判定一个部分是否有任何有效内容（顶层任一值携带内容）
pub fn section_has_content(data: &Value) -> bool {
    match data {
        Value::Object(map) => map.values().any(value_has_content),
        other => value_has_content(other),
    }
}

/// 完成度计算器
#[derive(Debug, Default)]
pub struct CompletionCalculator {
    registry: SchemaRegistry,
}

impl CompletionCalculator {
    pub fn new() -> Self {
        Self {
            registry: SchemaRegistry::new(),
        }
    }

    /// 单个部分的完成度（0-100）
    ///
    /// 有模板时按已填写字段占比计算；无模板但有任何键的部分按50%计。
    pub fn section_completion(&self, section: SectionName, data: Option<&Value>) -> i32 {
        let Some(data) = data else {
            return 0;
        };

        match self.registry.get(section) {
            Some(template) => {
                let total = template.fields.len();
                if total == 0 {
                    return 0;
                }
                let filled = template
                    .fields
                    .iter()
                    .filter(|field| {
                        data.get(field.name)
                            .map(value_has_content)
                            .unwrap_or(false)
                    })
                    .count();
                ((filled as f64 / total as f64) * 100.0).round() as i32
            }
            None => {
                if data.as_object().map(|m| !m.is_empty()).unwrap_or(false) {
                    50
                } else {
                    0
                }
            }
        }
    }

    /// 整体完成度：八个固定部分的平均值，四舍五入为整数
    pub fn calculate(&self, record: &AnamnesisRecord) -> i32 {
        let sum: i32 = SectionName::ALL
            .iter()
            .map(|section| self.section_completion(*section, record.sections.get(*section)))
            .sum();
        (sum as f64 / SectionName::ALL.len() as f64).round() as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::full_payload;
    use chrono::Utc;
    use modula_core::AnamnesisRecord;
    use serde_json::json;
    use uuid::Uuid;

    fn empty_record() -> AnamnesisRecord {
        AnamnesisRecord::new_draft(Uuid::new_v4(), Uuid::new_v4(), Utc::now())
    }

    #[test]
    fn test_empty_record_is_zero() {
        let calc = CompletionCalculator::new();
        assert_eq!(calc.calculate(&empty_record()), 0);
    }

    #[test]
    fn test_full_record_is_hundred() {
        let calc = CompletionCalculator::new();
        let mut record = empty_record();
        for section in SectionName::ALL {
            record.sections.set(section, full_payload(section));
        }
        assert_eq!(calc.calculate(&record), 100);
    }

    #[test]
    fn test_partial_section() {
        let calc = CompletionCalculator::new();
        let mut record = empty_record();
        // current_complaint有4个字段，只填1个 → 25%
        record.sections.set(
            SectionName::CurrentComplaint,
            json!({"main_complaint": "crises de ansiedade"}),
        );
        assert_eq!(
            calc.section_completion(
                SectionName::CurrentComplaint,
                record.sections.get(SectionName::CurrentComplaint)
            ),
            25
        );
        let overall = calc.calculate(&record);
        assert!(overall > 0 && overall < 100);
    }

    #[test]
    fn test_empty_values_do_not_count() {
        let calc = CompletionCalculator::new();
        let data = json!({
            "main_complaint": "",
            "symptom_duration": null,
            "triggers": []
        });
        assert_eq!(
            calc.section_completion(SectionName::CurrentComplaint, Some(&data)),
            0
        );
    }

    #[test]
    fn test_deterministic_and_order_independent() {
        let calc = CompletionCalculator::new();

        let mut forward = empty_record();
        for section in SectionName::ALL.iter().take(4) {
            forward.sections.set(*section, full_payload(*section));
        }

        let mut backward = empty_record();
        for section in SectionName::ALL.iter().take(4).rev() {
            backward.sections.set(*section, full_payload(*section));
        }

        let a = calc.calculate(&forward);
        assert_eq!(a, calc.calculate(&forward));
        assert_eq!(a, calc.calculate(&backward));
    }

    #[test]
    fn test_value_has_content() {
        assert!(!value_has_content(&json!(null)));
        assert!(!value_has_content(&json!("")));
        assert!(!value_has_content(&json!([])));
        assert!(!value_has_content(&json!({})));
        assert!(value_has_content(&json!("x")));
        assert!(value_has_content(&json!(0)));
        assert!(value_has_content(&json!(false)));
        assert!(value_has_content(&json!(["x"])));
        assert!(value_has_content(&json!({"k": null})));
    }

    #[test]
    fn test_section_has_content_ignores_empty_values() {
        assert!(!section_has_content(&json!({"a": "", "b": null, "c": []})));
        assert!(section_has_content(&json!({"a": "", "b": "algo"})));
    }
}
