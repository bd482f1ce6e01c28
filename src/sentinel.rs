//! 数字卫兵引擎 (Sentinel engine)
//!
//! 每帧一次完整流程, 单线程同步执行:
//! 检测输入 → 轨迹关联 → 行为分析 → 节流 → 输出事件 → 清理超时轨迹
//!
//! 每路视频流使用独立的 `Sentinel` 实例, 实例之间不共享可变状态.

use std::time::{Duration, Instant};

use log::{debug, info, trace, warn};

use crate::behavior::{
    loitering, movement, posture, proximity, BehaviorType, Severity, SuspiciousBehavior,
};
use crate::config::SentinelConfig;
use crate::detection::{
    Detection, ObjectDetector, PersonPose, PoseEstimator, TrackStore, TrackedEntity,
    ValuableItemCatalog,
};
use crate::error::Result;

/// 单帧输出 (引擎 → 渲染/日志)
#[derive(Clone, Debug, Default)]
pub struct FrameOutput {
    /// 原始检测结果 (透传)
    pub detections: Vec<Detection>,
    /// 本帧的可疑行为事件
    pub behaviors: Vec<SuspiciousBehavior>,
}

impl FrameOutput {
    /// 本帧应输出日志的告警
    pub fn alerts(&self) -> impl Iterator<Item = &SuspiciousBehavior> {
        self.behaviors.iter().filter(|b| b.should_log)
    }
}

/// 运行统计
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SentinelStats {
    pub frames: u64,
    pub detections: u64,
    /// 畸形检测 (被跳过)
    pub skipped_detections: u64,
    pub behaviors: u64,
    /// 可输出日志的告警
    pub alerts: u64,
    pub expired_tracks: u64,
}

impl SentinelStats {
    /// 每帧平均行为事件数 (百分比)
    pub fn alert_rate(&self) -> f64 {
        if self.frames == 0 {
            return 0.0;
        }
        self.behaviors as f64 / self.frames as f64 * 100.0
    }

    pub fn summary(&self) -> String {
        format!(
            "帧数: {} | 检测: {} (跳过 {}) | 行为: {} | 告警: {} | 告警率: {:.2}% | 过期轨迹: {}",
            self.frames,
            self.detections,
            self.skipped_detections,
            self.behaviors,
            self.alerts,
            self.alert_rate(),
            self.expired_tracks
        )
    }
}

pub struct Sentinel {
    config: SentinelConfig,
    catalog: ValuableItemCatalog,
    store: TrackStore,
    stats: SentinelStats,

    // 构建时换算一次, 避免逐帧转换
    tracker_timeout: Duration,
    loitering_threshold: Duration,
    movement_cooldown: Duration,

    // 姿态采样缓存
    pose_cache: Vec<Option<PersonPose>>,
    last_pose_frame: Option<u64>,
}

impl Sentinel {
    /// 创建引擎, 配置无效时失败
    pub fn new(config: SentinelConfig) -> Result<Self> {
        config.validate()?;
        let catalog = config.catalog();
        let store = TrackStore::new(&config);
        info!(
            "🛡️ 数字卫兵引擎就绪: 贵重物品 {} 类, 最多跟踪 {} 人",
            catalog.len(),
            config.max_tracked_entities
        );
        Ok(Self {
            tracker_timeout: config.tracker_timeout(),
            loitering_threshold: config.loitering_threshold(),
            movement_cooldown: config.movement_alert_cooldown(),
            config,
            catalog,
            store,
            stats: SentinelStats::default(),
            pose_cache: Vec::new(),
            last_pose_frame: None,
        })
    }

    pub fn config(&self) -> &SentinelConfig {
        &self.config
    }

    pub fn catalog(&self) -> &ValuableItemCatalog {
        &self.catalog
    }

    pub fn tracks(&self) -> &TrackStore {
        &self.store
    }

    pub fn stats(&self) -> &SentinelStats {
        &self.stats
    }

    /// 清除所有轨迹与姿态缓存, 统计与ID序列保留
    pub fn reset(&mut self) {
        self.store.reset();
        self.pose_cache.clear();
        self.last_pose_frame = None;
    }

    /// 调用检测器(和可选的姿态估计)处理一帧
    pub fn step<F, D>(
        &mut self,
        detector: &mut D,
        pose_estimator: Option<&mut dyn PoseEstimator<F>>,
        frame: &F,
    ) -> Result<FrameOutput>
    where
        D: ObjectDetector<F> + ?Sized,
    {
        self.step_at(detector, pose_estimator, frame, Instant::now())
    }

    pub fn step_at<F, D>(
        &mut self,
        detector: &mut D,
        pose_estimator: Option<&mut dyn PoseEstimator<F>>,
        frame: &F,
        now: Instant,
    ) -> Result<FrameOutput>
    where
        D: ObjectDetector<F> + ?Sized,
    {
        let detections = detector.detect(frame)?;

        let poses = match pose_estimator {
            Some(estimator) => {
                let people: Vec<Detection> = detections
                    .iter()
                    .filter(|d| d.class_id() == self.config.person_class_id)
                    .cloned()
                    .collect();
                if people.is_empty() {
                    Vec::new()
                } else {
                    self.sample_poses(estimator, frame, &people)
                }
            }
            None => Vec::new(),
        };

        Ok(self.process_frame_at(detections, &poses, now))
    }

    /// 每隔 `pose_interval_frames` 帧重新估计姿态, 其余帧复用缓存
    fn sample_poses<F>(
        &mut self,
        estimator: &mut dyn PoseEstimator<F>,
        frame: &F,
        people: &[Detection],
    ) -> Vec<Option<PersonPose>> {
        let frame_no = self.stats.frames;
        let due = self.last_pose_frame.map_or(true, |last| {
            frame_no - last >= u64::from(self.config.pose_interval_frames)
        });
        if !due {
            return self.pose_cache.clone();
        }

        match estimator.estimate(frame, people) {
            Ok(poses) => {
                self.pose_cache = poses;
                self.last_pose_frame = Some(frame_no);
                self.pose_cache.clone()
            }
            Err(e) => {
                warn!("⚠️ 姿态估计失败, 本帧跳过姿态分析: {}", e);
                Vec::new()
            }
        }
    }

    /// 处理一帧检测结果 (使用当前时间)
    ///
    /// `poses` 与本帧人员类别的检测按出现顺序对齐.
    pub fn process_frame(
        &mut self,
        detections: Vec<Detection>,
        poses: &[Option<PersonPose>],
    ) -> FrameOutput {
        self.process_frame_at(detections, poses, Instant::now())
    }

    pub fn process_frame_at(
        &mut self,
        detections: Vec<Detection>,
        poses: &[Option<PersonPose>],
        now: Instant,
    ) -> FrameOutput {
        self.stats.frames += 1;
        self.stats.detections += detections.len() as u64;

        // 1. 过滤人员与贵重物品, 跳过畸形检测
        let min_size = self.config.min_object_size_px;
        let person_class = self.config.person_class_id;
        let mut people = Vec::new();
        let mut people_poses = Vec::new();
        for (idx, det) in detections
            .iter()
            .filter(|d| d.class_id() == person_class)
            .enumerate()
        {
            if !det.bbox.is_well_formed(min_size) {
                self.stats.skipped_detections += 1;
                debug!("⚠️ 跳过畸形检测: {:?}", det.bbox);
                continue;
            }
            // 姿态与人员检测按下标对齐, 畸形检测的姿态一并丢弃
            let pose = poses
                .get(idx)
                .cloned()
                .flatten()
                .filter(|p| p.confidence > self.config.min_pose_confidence);
            people.push(det.clone());
            people_poses.push(pose);
        }

        let mut valuables = Vec::new();
        for det in self.catalog.filter(&detections) {
            if det.bbox.is_well_formed(min_size) {
                valuables.push(det);
            } else {
                self.stats.skipped_detections += 1;
                debug!("⚠️ 跳过畸形检测: {:?}", det.bbox);
            }
        }

        // 2. 轨迹关联
        self.store.update(&people, &people_poses, now);

        // 3. 行为分析 + 节流
        let behaviors = self.analyze(&valuables, now);

        // 4. 清理超时轨迹
        let expired = self.store.sweep_expired(now);

        let alerts = behaviors.iter().filter(|b| b.should_log).count();
        self.stats.behaviors += behaviors.len() as u64;
        self.stats.alerts += alerts as u64;
        self.stats.expired_tracks += expired.len() as u64;

        trace!(
            "帧 {}: 人 {} | 贵重物品 {} | 行为 {} | 告警 {}",
            self.stats.frames,
            people.len(),
            valuables.len(),
            behaviors.len(),
            alerts
        );
        if self.stats.frames % 300 == 0 {
            debug!("📊 {} | {}", self.store.get_stats(), self.stats.summary());
        }

        FrameOutput {
            detections,
            behaviors,
        }
    }

    fn analyze(&mut self, valuables: &[&Detection], now: Instant) -> Vec<SuspiciousBehavior> {
        let timeout = self.tracker_timeout;
        let loitering_threshold = self.loitering_threshold;
        let proximity_threshold = self.config.proximity_threshold_px;
        let cooldown = self.movement_cooldown;
        let pose_threshold = self.config.suspicious_pose_threshold;
        let high = self.config.hiding_behavior_threshold;

        let mut behaviors = Vec::new();
        for id in self.store.ids() {
            let Some(track) = self.store.get_mut(id) else {
                continue;
            };
            // 本周期将被清理的轨迹不再产生事件
            if now.saturating_duration_since(track.last_seen()) > timeout {
                continue;
            }

            // 逗留
            if let Some((elapsed, confidence)) =
                loitering::analyze(track.first_seen(), now, loitering_threshold)
            {
                behaviors.push(emit(
                    track,
                    BehaviorType::Loitering,
                    confidence,
                    format!("人员在区域内停留 {:.1} 秒", elapsed.as_secs_f32()),
                    format!(
                        "逗留 {:.1}s / 阈值 {:.1}s",
                        elapsed.as_secs_f32(),
                        loitering_threshold.as_secs_f32()
                    ),
                    now,
                    high,
                ));
            }

            // 贵重物品邻近
            for hit in proximity::analyze(track.location(), valuables, proximity_threshold) {
                let label = self
                    .catalog
                    .label(hit.item.class_id())
                    .unwrap_or(hit.item.label.as_str());
                behaviors.push(emit(
                    track,
                    BehaviorType::ValuableProximity,
                    hit.confidence,
                    format!("靠近 {}", label),
                    format!(
                        "距离 {:.1}px / 阈值 {:.1}px",
                        hit.distance, proximity_threshold
                    ),
                    now,
                    high,
                ));
            }

            // 可疑移动
            let history: Vec<_> = track.positions().iter().copied().collect();
            if let Some(score) =
                movement::analyze(&history, track.last_movement_alert(), now, cooldown)
            {
                track.mark_movement_alert(now);
                behaviors.push(emit(
                    track,
                    BehaviorType::SuspiciousMovement,
                    score.total,
                    "检测到高度可疑的移动模式".to_string(),
                    format!(
                        "折返 {:.2} | 徘徊 {:.2} | 速度不一致 {:.2}",
                        score.erratic, score.confinement, score.velocity
                    ),
                    now,
                    high,
                ));
            }

            // 可疑姿态 (无姿态数据时跳过)
            let pose_score = track
                .latest_pose()
                .and_then(|pose| posture::analyze(pose, pose_threshold));
            if let Some(score) = pose_score {
                behaviors.push(emit(
                    track,
                    BehaviorType::SuspiciousPose,
                    score.total.min(1.0),
                    "检测到可疑姿态".to_string(),
                    format!("蹲伏 {:.1} | 遮挡 {:.1}", score.crouch, score.concealment),
                    now,
                    high,
                ));
            }
        }
        behaviors
    }
}

/// 生成事件并更新该轨迹的节流状态
fn emit(
    track: &mut TrackedEntity,
    behavior: BehaviorType,
    confidence: f32,
    description: String,
    detail: String,
    now: Instant,
    high_threshold: f32,
) -> SuspiciousBehavior {
    let should_log = track.record_behavior(behavior, now);
    SuspiciousBehavior {
        behavior,
        confidence,
        description,
        detail,
        track_id: track.id(),
        location: track.location(),
        should_log,
        severity: Severity::classify(confidence, high_threshold),
    }
}
