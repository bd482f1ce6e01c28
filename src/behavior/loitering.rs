//! 逗留分析 (Loitering)

use std::time::{Duration, Instant};

/// 置信度归一化窗口(秒), 大于触发阈值, 使置信度在触发后连续上升
pub const LOITERING_NORMALIZATION_SECS: f32 = 30.0;

/// 逗留置信度 = min(elapsed / 30s, 1.0)
pub fn loitering_confidence(elapsed: Duration) -> f32 {
    (elapsed.as_secs_f32() / LOITERING_NORMALIZATION_SECS).min(1.0)
}

/// 逗留时间超过阈值时返回 (逗留时长, 置信度)
pub fn analyze(first_seen: Instant, now: Instant, threshold: Duration) -> Option<(Duration, f32)> {
    let elapsed = now.saturating_duration_since(first_seen);
    if elapsed > threshold {
        Some((elapsed, loitering_confidence(elapsed)))
    } else {
        None
    }
}
