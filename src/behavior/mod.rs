/// 行为分析系统 (Behavior Analysis)
///
/// 基于轨迹历史与当前帧上下文的启发式分析器
/// - Loitering:  逗留时间
/// - Proximity:  贵重物品邻近
/// - Movement:   可疑移动模式
/// - Posture:    可疑姿态 (需要姿态关键点)
/// - Throttle:   告警节流
pub mod loitering;
pub mod movement;
pub mod posture;
pub mod proximity;
pub mod throttle;

use std::fmt;

use serde::Serialize;

use crate::detection::types::TrackPoint;

pub use movement::MovementScore;
pub use posture::PostureScore;
pub use throttle::{ThrottleState, LOG_INTERVAL};

/// 可疑行为类型
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BehaviorType {
    Loitering,
    ValuableProximity,
    SuspiciousMovement,
    SuspiciousPose,
}

impl BehaviorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Loitering => "LOITERING",
            Self::ValuableProximity => "VALUABLE_PROXIMITY",
            Self::SuspiciousMovement => "SUSPICIOUS_MOVEMENT",
            Self::SuspiciousPose => "SUSPICIOUS_POSE",
        }
    }
}

impl fmt::Display for BehaviorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 告警等级
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Normal,
    High,
}

impl Severity {
    /// 置信度达到高风险阈值即为 High
    pub fn classify(confidence: f32, high_threshold: f32) -> Self {
        if confidence >= high_threshold {
            Self::High
        } else {
            Self::Normal
        }
    }
}

/// 可疑行为事件 (引擎 → 渲染/日志)
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SuspiciousBehavior {
    pub behavior: BehaviorType,
    /// 置信度 [0,1]
    pub confidence: f32,
    pub description: String,
    pub detail: String,
    pub track_id: u32,
    pub location: TrackPoint,
    /// 本周期是否应输出日志 (节流结果)
    pub should_log: bool,
    pub severity: Severity,
}

impl fmt::Display for SuspiciousBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} #{} (置信度: {:.1}%) - {} [{}]",
            self.behavior,
            self.track_id,
            self.confidence * 100.0,
            self.description,
            self.detail
        )
    }
}
