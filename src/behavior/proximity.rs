//! 贵重物品邻近分析 (Valuable-item proximity)

use crate::detection::types::{Detection, TrackPoint};

/// 单个邻近命中
#[derive(Clone, Debug, PartialEq)]
pub struct ProximityHit<'a> {
    pub item: &'a Detection,
    pub distance: f32,
    pub confidence: f32,
}

/// 置信度 = 1 - d / threshold, 距离达到阈值时为 0
pub fn proximity_confidence(distance: f32, threshold: f32) -> f32 {
    (1.0 - distance / threshold).clamp(0.0, 1.0)
}

/// 对每个距离小于阈值的贵重物品返回一个命中
pub fn analyze<'a>(
    location: TrackPoint,
    valuables: &[&'a Detection],
    threshold: f32,
) -> Vec<ProximityHit<'a>> {
    valuables
        .iter()
        .copied()
        .filter_map(|item| {
            let distance = location.distance_to(&item.center());
            (distance < threshold).then(|| ProximityHit {
                item,
                distance,
                confidence: proximity_confidence(distance, threshold),
            })
        })
        .collect()
}
