//! 告警节流 (Alert throttle)
//!
//! 条件判断与日志输出解耦: 行为成立时事件总是返回给调用方,
//! 但同一 (轨迹, 行为类型) 在 1 秒内只有第一次标记为可输出.

use std::time::{Duration, Instant};

/// 同一 (轨迹, 行为类型) 两次可输出事件的最小间隔
pub const LOG_INTERVAL: Duration = Duration::from_secs(1);

/// 单个行为类型的节流状态 (归属于轨迹)
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ThrottleState {
    /// 最近一次条件成立的时间
    pub last_triggered: Option<Instant>,
    /// 最近一次可输出的时间
    pub last_logged: Option<Instant>,
    /// 条件成立的累计次数
    pub occurrences: u64,
}

impl ThrottleState {
    /// 记录一次条件成立, 返回本次是否可输出
    pub fn record(&mut self, now: Instant) -> bool {
        self.last_triggered = Some(now);
        self.occurrences += 1;

        let should_log = match self.last_logged {
            Some(last) => now.saturating_duration_since(last) >= LOG_INTERVAL,
            None => true,
        };
        if should_log {
            self.last_logged = Some(now);
        }
        should_log
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_occurrence_logs() {
        let mut state = ThrottleState::default();
        assert!(state.record(Instant::now()));
        assert_eq!(state.occurrences, 1);
    }

    #[test]
    fn test_suppressed_within_interval() {
        let t0 = Instant::now();
        let mut state = ThrottleState::default();
        assert!(state.record(t0));
        assert!(!state.record(t0 + Duration::from_millis(300)));
        assert!(!state.record(t0 + Duration::from_millis(999)));
        assert!(state.record(t0 + Duration::from_millis(1000)));
        assert_eq!(state.occurrences, 4);
        assert_eq!(state.last_triggered, Some(t0 + Duration::from_millis(1000)));
    }

    #[test]
    fn test_steady_stream_at_30fps() {
        // 持续成立时每秒恰好输出一次
        let t0 = Instant::now();
        let mut state = ThrottleState::default();
        let mut logged = Vec::new();
        for frame in 0..90u64 {
            let now = t0 + Duration::from_millis(frame * 1000 / 30);
            if state.record(now) {
                logged.push(now);
            }
        }
        assert_eq!(logged.len(), 3);
        for pair in logged.windows(2) {
            assert!(pair[1] - pair[0] >= LOG_INTERVAL);
        }
        assert_eq!(state.occurrences, 90);
        assert_eq!(
            state.last_triggered,
            Some(t0 + Duration::from_millis(89 * 1000 / 30))
        );
    }
}
