//! 可疑移动模式分析 (Movement pattern)
//!
//! 三个独立子分数加权求和后截断到 [0,1]:
//! 1. 折返率: 显著位移中方向反转 (点积 < 0) 的比例
//! 2. 徘徊: 最近若干点集中在小范围内
//! 3. 速度不一致: 逐帧位移的方差过大

use std::time::{Duration, Instant};

use crate::detection::types::TrackPoint;

/// 触发分析所需的最少历史点数
pub const MIN_HISTORY: usize = 16;
/// 分析窗口 (最近的点)
pub const WINDOW: usize = 12;
/// 评分所需最少点数
pub const MIN_SCORING_POINTS: usize = 10;
/// 徘徊检测子窗口
pub const CONFINEMENT_WINDOW: usize = 10;
/// 显著位移阈值(像素), 过滤抖动
pub const SIGNIFICANT_MOVE_PX: f32 = 5.0;
/// 徘徊半径(像素)
pub const CONFINEMENT_RADIUS_PX: f32 = 30.0;
/// 速度方差阈值
pub const SPEED_VARIANCE_LIMIT: f32 = 100.0;
/// 触发阈值 (高于简单多数, 抑制误报)
pub const ALERT_THRESHOLD: f32 = 0.9;

const ERRATIC_WEIGHT: f32 = 0.6;
const ERRATIC_MIN_RATIO: f32 = 0.5;
const CONFINEMENT_SCORE: f32 = 0.4;
const VELOCITY_SCORE: f32 = 0.3;

/// 移动评分明细
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MovementScore {
    pub erratic: f32,
    pub confinement: f32,
    pub velocity: f32,
    /// 截断后的总分
    pub total: f32,
}

/// 对一段位置序列评分
pub fn score(positions: &[TrackPoint]) -> MovementScore {
    if positions.len() < MIN_SCORING_POINTS {
        return MovementScore::default();
    }

    // 1. 折返 (只统计两段位移都显著的三元组)
    let mut direction_changes = 0usize;
    let mut significant_moves = 0usize;
    for w in positions.windows(3) {
        let (v1x, v1y) = (w[1].x - w[0].x, w[1].y - w[0].y);
        let (v2x, v2y) = (w[2].x - w[1].x, w[2].y - w[1].y);
        let d1 = (v1x * v1x + v1y * v1y).sqrt();
        let d2 = (v2x * v2x + v2y * v2y).sqrt();
        if d1 > SIGNIFICANT_MOVE_PX && d2 > SIGNIFICANT_MOVE_PX {
            significant_moves += 1;
            if v1x * v2x + v1y * v2y < 0.0 {
                direction_changes += 1;
            }
        }
    }
    let mut erratic = 0.0;
    if significant_moves > 0 {
        let ratio = direction_changes as f32 / significant_moves as f32;
        if ratio > ERRATIC_MIN_RATIO {
            erratic = ratio * ERRATIC_WEIGHT;
        }
    }

    // 2. 小范围徘徊
    let recent = &positions[positions.len() - CONFINEMENT_WINDOW..];
    let n = recent.len() as f32;
    let centroid = TrackPoint::new(
        recent.iter().map(|p| p.x).sum::<f32>() / n,
        recent.iter().map(|p| p.y).sum::<f32>() / n,
    );
    let max_distance = recent
        .iter()
        .map(|p| p.distance_to(&centroid))
        .fold(0.0f32, f32::max);
    let confinement = if max_distance < CONFINEMENT_RADIUS_PX {
        CONFINEMENT_SCORE
    } else {
        0.0
    };

    // 3. 速度方差
    let speeds: Vec<f32> = positions
        .windows(2)
        .map(|w| w[0].distance_to(&w[1]))
        .collect();
    let mut velocity = 0.0;
    if speeds.len() > 5 {
        let mean = speeds.iter().sum::<f32>() / speeds.len() as f32;
        let variance =
            speeds.iter().map(|s| (s - mean) * (s - mean)).sum::<f32>() / speeds.len() as f32;
        if variance > SPEED_VARIANCE_LIMIT {
            velocity = VELOCITY_SCORE;
        }
    }

    MovementScore {
        erratic,
        confinement,
        velocity,
        total: (erratic + confinement + velocity).clamp(0.0, 1.0),
    }
}

/// 完整门控: 历史足够 + 冷却已过 + 分数超过阈值
///
/// `history` 为轨迹的完整位置历史 (旧 → 新). 触发后由调用方更新告警时间.
pub fn analyze(
    history: &[TrackPoint],
    last_alert: Option<Instant>,
    now: Instant,
    cooldown: Duration,
) -> Option<MovementScore> {
    if history.len() < MIN_HISTORY {
        return None;
    }
    if let Some(last) = last_alert {
        if now.saturating_duration_since(last) <= cooldown {
            return None;
        }
    }
    let window = &history[history.len() - WINDOW..];
    let result = score(window);
    (result.total > ALERT_THRESHOLD).then_some(result)
}
