//! 自动保存冲突防护
//!
//! 乐观并发检查：基于时间戳比较，不加行锁。两个并发自动保存可能
//! 都通过检查，最后落盘者胜出 —— 设计上接受的竞争窗口。

use chrono::{DateTime, Duration, Utc};
use modula_core::{AnamnesisRecord, SectionName};
use serde_json::Value;

/// 客户端时间戳允许的最大滞后（秒）
pub const MAX_CLIENT_AGE_SECS: i64 = 5 * 60;

/// API响应里的机器可读代码
pub const CODE_OUTDATED: &str = "OUTDATED_DATA";
pub const CODE_CONFLICT: &str = "CONFLICT_DETECTED";
pub const CODE_AUTO_SAVE_ERROR: &str = "AUTO_SAVE_ERROR";

/// 自动保存尝试的三类出口
#[derive(Debug, Clone, PartialEq)]
pub enum AutoSaveDecision {
    /// 客户端数据过旧，应重新同步而不是覆盖
    Outdated { server_value: Option<Value> },
    /// 服务端已有比客户端时间戳更新的写入
    Conflict {
        server_value: Option<Value>,
        server_updated_at: DateTime<Utc>,
    },
    /// 负载与存储内容一致，只需刷新自动保存时间戳
    NoChanges,
    /// 接受写入
    Apply,
}

/// 自动保存防护
#[derive(Debug, Default)]
pub struct AutoSaveGuard;

impl AutoSaveGuard {
    pub fn new() -> Self {
        Self
    }

    /// 判定一次自动保存尝试的出口
    pub fn evaluate(
        &self,
        record: &AnamnesisRecord,
        section: SectionName,
        incoming: &Value,
        client_timestamp: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AutoSaveDecision {
        if now.signed_duration_since(client_timestamp) > Duration::seconds(MAX_CLIENT_AGE_SECS) {
            return AutoSaveDecision::Outdated {
                server_value: record.sections.get(section).cloned(),
            };
        }

        if record.updated_at > client_timestamp {
            return AutoSaveDecision::Conflict {
                server_value: record.sections.get(section).cloned(),
                server_updated_at: record.updated_at,
            };
        }

        // 深度相等比较，键顺序无关
        if record.sections.get(section) == Some(incoming) {
            AutoSaveDecision::NoChanges
        } else {
            AutoSaveDecision::Apply
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    fn record_at(updated_at: DateTime<Utc>) -> AnamnesisRecord {
        let mut record = AnamnesisRecord::new_draft(Uuid::new_v4(), Uuid::new_v4(), updated_at);
        record.updated_at = updated_at;
        record
    }

    #[test]
    fn test_stale_client_timestamp_is_outdated() {
        let guard = AutoSaveGuard::new();
        let now = Utc::now();
        let record = record_at(now - Duration::hours(1));

        let decision = guard.evaluate(
            &record,
            SectionName::Lifestyle,
            &json!({"diet": "regular"}),
            now - Duration::minutes(6),
            now,
        );
        assert!(matches!(decision, AutoSaveDecision::Outdated { .. }));
    }

    #[test]
    fn test_newer_server_write_is_conflict() {
        let guard = AutoSaveGuard::new();
        let now = Utc::now();
        let mut record = record_at(now - Duration::minutes(1));
        record.sections.set(
            SectionName::Lifestyle,
            json!({"diet": "versão do servidor"}),
        );

        let decision = guard.evaluate(
            &record,
            SectionName::Lifestyle,
            &json!({"diet": "versão do cliente"}),
            now - Duration::minutes(2), // 早于updated_at
            now,
        );
        match decision {
            AutoSaveDecision::Conflict {
                server_value,
                server_updated_at,
            } => {
                assert_eq!(server_value, Some(json!({"diet": "versão do servidor"})));
                assert_eq!(server_updated_at, record.updated_at);
            }
            other => panic!("esperava conflito, veio {:?}", other),
        }
    }

    #[test]
    fn test_identical_payload_is_noop() {
        let guard = AutoSaveGuard::new();
        let now = Utc::now();
        let mut record = record_at(now - Duration::minutes(3));
        record
            .sections
            .set(SectionName::Lifestyle, json!({"diet": "ok", "sleep_quality": "boa"}));

        // 键顺序不同仍然视为相同负载
        let decision = guard.evaluate(
            &record,
            SectionName::Lifestyle,
            &json!({"sleep_quality": "boa", "diet": "ok"}),
            now - Duration::minutes(1),
            now,
        );
        assert_eq!(decision, AutoSaveDecision::NoChanges);
    }

    #[test]
    fn test_changed_payload_is_applied() {
        let guard = AutoSaveGuard::new();
        let now = Utc::now();
        let mut record = record_at(now - Duration::minutes(3));
        record
            .sections
            .set(SectionName::Lifestyle, json!({"diet": "antiga"}));

        let decision = guard.evaluate(
            &record,
            SectionName::Lifestyle,
            &json!({"diet": "nova"}),
            now - Duration::minutes(1),
            now,
        );
        assert_eq!(decision, AutoSaveDecision::Apply);
    }

    #[test]
    fn test_first_write_to_empty_section_is_applied() {
        let guard = AutoSaveGuard::new();
        let now = Utc::now();
        let record = record_at(now - Duration::minutes(3));

        let decision = guard.evaluate(
            &record,
            SectionName::Relationships,
            &json!({"family_dynamics": "boa"}),
            now - Duration::minutes(1),
            now,
        );
        assert_eq!(decision, AutoSaveDecision::Apply);
    }
}
