//! 人员跟踪 (Track store & associator)
//!
//! 贪心最近质心关联: 每个检测按到达顺序独立匹配距离最近的已有轨迹,
//! 非全局最优, 两人交叉时可能发生ID互换.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::time::{Duration, Instant};

use log::{debug, warn};

use super::types::{Detection, PersonPose, TrackPoint};
use crate::behavior::{BehaviorType, ThrottleState};
use crate::config::{CapacityPolicy, SentinelConfig};

// ========== 跟踪对象 ==========

/// 跟踪对象
#[derive(Clone, Debug)]
pub struct TrackedEntity {
    /// 唯一跟踪ID
    id: u32,

    first_seen: Instant,
    last_seen: Instant,

    /// 历史轨迹 (中心点, 旧 → 新)
    positions: VecDeque<TrackPoint>,

    /// 历史姿态
    poses: VecDeque<PersonPose>,

    /// 最近一次可疑移动告警
    last_movement_alert: Option<Instant>,

    /// 各行为类型的节流状态
    throttle: HashMap<BehaviorType, ThrottleState>,


    /// 被匹配的帧数
    hits: u32,

    capacity: usize,
}

impl TrackedEntity {
    fn new(id: u32, center: TrackPoint, now: Instant, capacity: usize) -> Self {
        let mut positions = VecDeque::with_capacity(capacity);
        positions.push_back(center);
        Self {
            id,
            first_seen: now,
            last_seen: now,
            positions,
            poses: VecDeque::new(),
            last_movement_alert: None,
            throttle: HashMap::new(),
            hits: 1,
            capacity,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn first_seen(&self) -> Instant {
        self.first_seen
    }

    pub fn last_seen(&self) -> Instant {
        self.last_seen
    }

    pub fn positions(&self) -> &VecDeque<TrackPoint> {
        &self.positions
    }

    pub fn poses(&self) -> &VecDeque<PersonPose> {
        &self.poses
    }

    /// 最新质心 (轨迹创建时即存在)
    pub fn location(&self) -> TrackPoint {
        self.positions.back().copied().unwrap_or_default()
    }

    pub fn latest_pose(&self) -> Option<&PersonPose> {
        self.poses.back()
    }

    pub fn last_movement_alert(&self) -> Option<Instant> {
        self.last_movement_alert
    }

    pub fn throttle_state(&self, behavior: BehaviorType) -> Option<&ThrottleState> {
        self.throttle.get(&behavior)
    }

    pub fn hits(&self) -> u32 {
        self.hits
    }

    /// 添加轨迹点, 超出容量时淘汰最旧的
    fn add_trajectory_point(&mut self, center: TrackPoint) {
        self.positions.push_back(center);
        while self.positions.len() > self.capacity {
            self.positions.pop_front();
        }
    }

    fn add_pose(&mut self, pose: PersonPose) {
        self.poses.push_back(pose);
        while self.poses.len() > self.capacity {
            self.poses.pop_front();
        }
    }

    pub(crate) fn mark_movement_alert(&mut self, now: Instant) {
        self.last_movement_alert = Some(now);
    }

    /// 记录一次行为成立, 返回是否可输出
    pub(crate) fn record_behavior(&mut self, behavior: BehaviorType, now: Instant) -> bool {
        self.throttle.entry(behavior).or_default().record(now)
    }
}

// ========== 跟踪仓库 ==========

/// 跟踪仓库: 独占所有跟踪对象
pub struct TrackStore {
    /// 按ID升序存放, 距离相同时先创建的轨迹优先
    tracks: BTreeMap<u32, TrackedEntity>,

    /// 下一个分配的ID
    next_id: u32,

    proximity_threshold: f32,
    max_tracks: usize,
    max_history: usize,
    timeout: Duration,
    policy: CapacityPolicy,
}

impl TrackStore {
    pub fn new(config: &SentinelConfig) -> Self {
        Self {
            tracks: BTreeMap::new(),
            next_id: 1,
            proximity_threshold: config.proximity_threshold_px,
            max_tracks: config.max_tracked_entities,
            max_history: config.max_position_history,
            timeout: config.tracker_timeout(),
            policy: config.capacity_policy,
        }
    }

    /// 用当前帧的人员检测更新跟踪
    ///
    /// `poses` 与 `people` 按下标对齐, 缺失即无姿态.
    pub fn update(&mut self, people: &[Detection], poses: &[Option<PersonPose>], now: Instant) {
        for (idx, person) in people.iter().enumerate() {
            let center = person.center();

            let (id, created) = match self.find_nearest(center) {
                Some(id) => (id, false),
                None => match self.allocate(center, now) {
                    Some(id) => (id, true),
                    None => continue,
                },
            };

            let Some(track) = self.tracks.get_mut(&id) else {
                continue;
            };
            // 新建轨迹已包含当前点
            if !created {
                track.add_trajectory_point(center);
                track.hits += 1;
                track.last_seen = now;
            }
            if let Some(Some(pose)) = poses.get(idx) {
                track.add_pose(pose.clone());
            }
        }
    }

    /// 找到最新质心距离最近且小于阈值的轨迹
    fn find_nearest(&self, center: TrackPoint) -> Option<u32> {
        let mut best: Option<(u32, f32)> = None;
        for (id, track) in &self.tracks {
            let distance = track.location().distance_to(&center);
            if distance >= self.proximity_threshold {
                continue;
            }
            match best {
                Some((_, d)) if distance >= d => {}
                _ => best = Some((*id, distance)),
            }
        }
        best.map(|(id, _)| id)
    }

    /// 新建轨迹, 受数量上限约束
    fn allocate(&mut self, center: TrackPoint, now: Instant) -> Option<u32> {
        if self.tracks.len() >= self.max_tracks {
            match self.policy {
                CapacityPolicy::Reject => {
                    warn!(
                        "⚠️ 跟踪数量已达上限 {}, 忽略新目标 ({:.0}, {:.0})",
                        self.max_tracks, center.x, center.y
                    );
                    return None;
                }
                CapacityPolicy::EvictStale => {
                    // 本帧已匹配的轨迹不参与淘汰
                    let Some(stale) = self
                        .tracks
                        .values()
                        .filter(|t| t.last_seen < now)
                        .min_by_key(|t| (t.last_seen, t.id))
                        .map(|t| t.id)
                    else {
                        warn!(
                            "⚠️ 跟踪数量已达上限 {} 且均在本帧出现, 忽略新目标 ({:.0}, {:.0})",
                            self.max_tracks, center.x, center.y
                        );
                        return None;
                    };
                    self.tracks.remove(&stale);
                    warn!(
                        "⚠️ 跟踪数量已达上限 {}, 淘汰最久未出现的轨迹 #{}",
                        self.max_tracks, stale
                    );
                }
            }
        }

        let id = self.next_id;
        self.next_id += 1;
        self.tracks
            .insert(id, TrackedEntity::new(id, center, now, self.max_history));
        debug!("🆕 新轨迹 #{} @ ({:.0}, {:.0})", id, center.x, center.y);
        Some(id)
    }

    /// 删除超时未出现的轨迹, 返回被删除的ID
    pub fn sweep_expired(&mut self, now: Instant) -> Vec<u32> {
        let timeout = self.timeout;
        let expired: Vec<u32> = self
            .tracks
            .values()
            .filter(|t| now.saturating_duration_since(t.last_seen) > timeout)
            .map(|t| t.id)
            .collect();
        for id in &expired {
            self.tracks.remove(id);
            debug!("🗑️ 轨迹 #{} 超时删除", id);
        }
        expired
    }

    pub fn get(&self, id: u32) -> Option<&TrackedEntity> {
        self.tracks.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: u32) -> Option<&mut TrackedEntity> {
        self.tracks.get_mut(&id)
    }

    /// 按ID升序遍历
    pub fn iter(&self) -> impl Iterator<Item = &TrackedEntity> {
        self.tracks.values()
    }

    pub fn ids(&self) -> Vec<u32> {
        self.tracks.keys().copied().collect()
    }

    /// 获取当前跟踪数量
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// 重置 (清除所有跟踪, ID继续递增不复用)
    pub fn reset(&mut self) {
        self.tracks.clear();
    }

    /// 已分配的ID总数
    pub fn total_ids(&self) -> u32 {
        self.next_id - 1
    }

    /// 获取跟踪统计信息
    pub fn get_stats(&self) -> String {
        format!("跟踪: {} 人 | 总ID: {}", self.tracks.len(), self.total_ids())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::types::BBox;

    fn person(cx: f32, cy: f32) -> Detection {
        Detection::new(BBox::from_center(cx, cy, 40.0, 100.0, 0.9, 0), "person")
    }

    fn store_with(f: impl FnOnce(&mut SentinelConfig)) -> TrackStore {
        let mut config = SentinelConfig::default();
        f(&mut config);
        TrackStore::new(&config)
    }

    #[test]
    fn test_same_location_single_track() {
        let mut store = store_with(|_| {});
        let t0 = Instant::now();
        for i in 0..50u64 {
            store.update(&[person(100.0, 100.0)], &[], t0 + Duration::from_millis(i * 33));
        }
        assert_eq!(store.track_count(), 1);
        let track = store.iter().next().unwrap();
        assert_eq!(track.id(), 1);
        assert_eq!(track.hits(), 50);
        assert_eq!(track.last_seen(), t0 + Duration::from_millis(49 * 33));
    }

    #[test]
    fn test_far_detections_get_new_ids() {
        let mut store = store_with(|_| {});
        let now = Instant::now();
        store.update(
            &[person(100.0, 100.0), person(400.0, 100.0), person(100.0, 400.0)],
            &[],
            now,
        );
        assert_eq!(store.ids(), vec![1, 2, 3]);
        assert_eq!(store.get(2).unwrap().location(), TrackPoint::new(400.0, 100.0));
    }

    #[test]
    fn test_history_bounded() {
        let mut store = store_with(|c| c.max_position_history = 5);
        let t0 = Instant::now();
        for i in 0..12 {
            let now = t0 + Duration::from_millis(i * 100);
            store.update(&[person(100.0 + i as f32 * 2.0, 100.0)], &[], now);
        }
        let track = store.get(1).unwrap();
        assert_eq!(track.positions().len(), 5);
        assert_eq!(track.positions().front().unwrap().x, 114.0);
        assert_eq!(track.location().x, 122.0);
    }

    #[test]
    fn test_nearest_track_wins() {
        let mut store = store_with(|_| {});
        let t0 = Instant::now();
        store.update(&[person(100.0, 100.0), person(200.0, 100.0)], &[], t0);
        store.update(&[person(160.0, 100.0)], &[], t0 + Duration::from_millis(33));
        assert_eq!(store.get(2).unwrap().positions().len(), 2);
        assert_eq!(store.get(1).unwrap().positions().len(), 1);
    }

    #[test]
    fn test_tie_goes_to_oldest_track() {
        let mut store = store_with(|_| {});
        let t0 = Instant::now();
        store.update(&[person(100.0, 100.0), person(200.0, 100.0)], &[], t0);
        store.update(&[person(150.0, 100.0)], &[], t0 + Duration::from_millis(33));
        assert_eq!(store.get(1).unwrap().location(), TrackPoint::new(150.0, 100.0));
        assert_eq!(store.get(2).unwrap().positions().len(), 1);
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let mut store = store_with(|c| c.proximity_threshold_px = 80.0);
        let t0 = Instant::now();
        store.update(&[person(100.0, 100.0)], &[], t0);
        store.update(&[person(180.0, 100.0)], &[], t0 + Duration::from_millis(33));
        assert_eq!(store.track_count(), 2);
    }

    #[test]
    fn test_empty_frame_mutates_nothing() {
        let mut store = store_with(|_| {});
        let t0 = Instant::now();
        store.update(&[person(100.0, 100.0)], &[], t0);
        store.update(&[], &[], t0 + Duration::from_secs(1));
        let track = store.get(1).unwrap();
        assert_eq!(track.last_seen(), t0);
        assert_eq!(track.positions().len(), 1);
    }

    #[test]
    fn test_expired_track_not_resurrected() {
        let mut store = store_with(|c| c.tracker_timeout_secs = 5.0);
        let t0 = Instant::now();
        store.update(&[person(100.0, 100.0)], &[], t0);

        assert!(store.sweep_expired(t0 + Duration::from_secs(5)).is_empty());
        assert_eq!(store.sweep_expired(t0 + Duration::from_millis(5001)), vec![1]);
        assert!(store.is_empty());

        store.update(&[person(100.0, 100.0)], &[], t0 + Duration::from_secs(6));
        assert_eq!(store.ids(), vec![2]);
    }

    #[test]
    fn test_capacity_evicts_stale() {
        let mut store = store_with(|c| c.max_tracked_entities = 2);
        let t0 = Instant::now();
        store.update(&[person(100.0, 100.0)], &[], t0);
        store.update(&[person(400.0, 100.0)], &[], t0 + Duration::from_millis(10));
        // 刷新 #1, #2 变为最久未出现
        store.update(&[person(100.0, 100.0)], &[], t0 + Duration::from_millis(20));
        store.update(&[person(100.0, 400.0)], &[], t0 + Duration::from_millis(30));
        assert_eq!(store.ids(), vec![1, 3]);
    }

    #[test]
    fn test_capacity_never_evicts_track_seen_this_frame() {
        let mut store = store_with(|c| c.max_tracked_entities = 2);
        let t0 = Instant::now();
        store.update(&[person(100.0, 100.0), person(400.0, 100.0)], &[], t0);

        // 两条轨迹都在本帧刷新, 第三个人无处容纳
        let t1 = t0 + Duration::from_millis(33);
        store.update(
            &[person(100.0, 100.0), person(400.0, 100.0), person(100.0, 400.0)],
            &[],
            t1,
        );
        assert_eq!(store.ids(), vec![1, 2]);
        assert_eq!(store.total_ids(), 2);

        // 下一帧 #1 缺席, 可被淘汰
        let t2 = t1 + Duration::from_millis(33);
        store.update(&[person(400.0, 100.0), person(100.0, 400.0)], &[], t2);
        assert_eq!(store.ids(), vec![2, 3]);
    }

    #[test]
    fn test_capacity_reject() {
        let mut store = store_with(|c| {
            c.max_tracked_entities = 1;
            c.capacity_policy = CapacityPolicy::Reject;
        });
        let t0 = Instant::now();
        store.update(&[person(100.0, 100.0), person(400.0, 100.0)], &[], t0);
        assert_eq!(store.ids(), vec![1]);
        assert_eq!(store.total_ids(), 1);
    }

    #[test]
    fn test_pose_aligned_with_detection() {
        let mut store = store_with(|_| {});
        let pose = PersonPose::from_keypoints(vec![]);
        store.update(
            &[person(100.0, 100.0), person(400.0, 100.0)],
            &[None, Some(pose.clone())],
            Instant::now(),
        );
        assert!(store.get(1).unwrap().latest_pose().is_none());
        assert_eq!(store.get(2).unwrap().latest_pose(), Some(&pose));
    }

    #[test]
    fn test_reset_keeps_id_sequence() {
        let mut store = store_with(|_| {});
        let now = Instant::now();
        store.update(&[person(100.0, 100.0)], &[], now);
        store.reset();
        store.update(&[person(100.0, 100.0)], &[], now);
        assert_eq!(store.ids(), vec![2]);
        assert_eq!(store.get_stats(), "跟踪: 1 人 | 总ID: 2");
    }

    #[test]
    fn test_pose_history_bounded() {
        let mut store = store_with(|c| c.max_position_history = 3);
        let t0 = Instant::now();
        for i in 0..6u64 {
            let pose = PersonPose::from_keypoints(vec![]);
            let now = t0 + Duration::from_millis(i * 33);
            store.update(&[person(100.0, 100.0)], &[Some(pose)], now);
        }
        assert_eq!(store.get(1).unwrap().poses().len(), 3);
    }
}
