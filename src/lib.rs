// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
pub mod behavior; // 行为分析 (逗留/邻近/移动/姿态) 与告警节流
pub mod config; // 引擎配置参数
pub mod detection; // 检测输入、贵重物品目录与人员跟踪
pub mod error; // 错误类型
pub mod sentinel; // 每帧处理引擎

pub use crate::behavior::{BehaviorType, Severity, SuspiciousBehavior};
pub use crate::config::{CapacityPolicy, SentinelConfig};
pub use crate::detection::{
    BBox, Detection, ObjectDetector, PersonPose, PoseEstimator, TrackPoint, TrackStore,
    TrackedEntity, ValuableItemCatalog,
};
pub use crate::error::{Result, SentinelError};
pub use crate::sentinel::{FrameOutput, Sentinel, SentinelStats};

const BEIJING_OFFSET_SECS: i32 = 8 * 60 * 60;

/// 北京时间时间戳, 字段之间用 `delimiter` 分隔
pub fn gen_time_string(delimiter: &str) -> String {
    let fmt = format!(
        "%Y{}%m{}%d{}%H{}%M{}%S{}%3f",
        delimiter, delimiter, delimiter, delimiter, delimiter, delimiter
    );
    let t_now = chrono::Utc::now();
    match chrono::FixedOffset::east_opt(BEIJING_OFFSET_SECS) {
        Some(offset) => t_now.with_timezone(&offset).format(&fmt).to_string(),
        None => t_now.format(&fmt).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_string_fields() {
        let s = gen_time_string("-");
        // YYYY-MM-DD-HH-MM-SS-mmm
        assert_eq!(s.split('-').count(), 7);
        assert_eq!(s.len(), 23);
    }
}
