//! 转诊紧急度分类
//!
//! 为待处理转诊面板派生等待时间和紧急度分桶。排序只看分桶，
//! 同一桶内不再按原始等待时间区分。

use chrono::{DateTime, Utc};
use modula_core::TransferRequest;
use serde::{Deserialize, Serialize};

/// 紧急度分桶
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransferUrgency {
    Critical, // 等待≥7天
    High,     // 等待≥3天
    Medium,   // 等待≥1天
    Low,      // 不足1天
}

impl TransferUrgency {
    /// 排序用的权重，越大越紧急
    pub fn rank(&self) -> u8 {
        match self {
            TransferUrgency::Critical => 3,
            TransferUrgency::High => 2,
            TransferUrgency::Medium => 1,
            TransferUrgency::Low => 0,
        }
    }
}

/// 等待时间信息
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TransferWaitInfo {
    pub wait_days: i64,
    pub wait_hours: i64,
    pub urgency: TransferUrgency,
}

/// 根据请求时间分类等待紧急度
pub fn classify_wait(requested_at: DateTime<Utc>, now: DateTime<Utc>) -> TransferWaitInfo {
    let elapsed = now.signed_duration_since(requested_at);
    let wait_days = elapsed.num_days().max(0);
    let wait_hours = elapsed.num_hours().max(0);

    let urgency = if wait_days >= 7 {
        TransferUrgency::Critical
    } else if wait_days >= 3 {
        TransferUrgency::High
    } else if wait_days >= 1 {
        TransferUrgency::Medium
    } else {
        TransferUrgency::Low
    };

    TransferWaitInfo {
        wait_days,
        wait_hours,
        urgency,
    }
}

/// 按紧急度降序排序待处理转诊（critical在前）
///
/// 稳定排序：同一桶内保持原有顺序。
pub fn sort_by_urgency(transfers: &mut [TransferRequest], now: DateTime<Utc>) {
    transfers.sort_by_key(|t| std::cmp::Reverse(classify_wait(t.requested_at, now).urgency.rank()));
}
