/// 检测系统数据结构定义
/// Data structures for the detection system
use serde::{Deserialize, Serialize};

// ========== 公共常量 ==========

/// COCO 姿态关键点数量
pub const NUM_KEYPOINTS: usize = 17;

// ========== 数据结构 ==========

/// 检测框 (Detection bounding box)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub confidence: f32,
    pub class_id: u32,
}

impl BBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32, confidence: f32, class_id: u32) -> Self {
        Self {
            x1,
            y1,
            x2,
            y2,
            confidence,
            class_id,
        }
    }

    /// 以中心点和宽高构建
    pub fn from_center(cx: f32, cy: f32, w: f32, h: f32, confidence: f32, class_id: u32) -> Self {
        Self::new(
            cx - w / 2.0,
            cy - h / 2.0,
            cx + w / 2.0,
            cy + h / 2.0,
            confidence,
            class_id,
        )
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    /// 获取中心点
    pub fn center(&self) -> TrackPoint {
        TrackPoint {
            x: (self.x1 + self.x2) / 2.0,
            y: (self.y1 + self.y2) / 2.0,
        }
    }

    /// 检查检测框是否可用
    ///
    /// 坐标必须有限, 宽高必须为正且不小于 `min_size`, 置信度在 [0,1] 内.
    pub fn is_well_formed(&self, min_size: f32) -> bool {
        let finite = [self.x1, self.y1, self.x2, self.y2, self.confidence]
            .iter()
            .all(|v| v.is_finite());
        if !finite {
            return false;
        }
        let (w, h) = (self.width(), self.height());
        w > 0.0
            && h > 0.0
            && w >= min_size
            && h >= min_size
            && (0.0..=1.0).contains(&self.confidence)
    }
}

/// 单个检测结果 (检测器 → 引擎)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub bbox: BBox,
    /// 显示标签
    #[serde(default)]
    pub label: String,
}

impl Detection {
    pub fn new(bbox: BBox, label: impl Into<String>) -> Self {
        Self {
            bbox,
            label: label.into(),
        }
    }

    pub fn class_id(&self) -> u32 {
        self.bbox.class_id
    }

    pub fn confidence(&self) -> f32 {
        self.bbox.confidence
    }

    pub fn center(&self) -> TrackPoint {
        self.bbox.center()
    }
}

/// 跟踪点 (质心)
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    pub x: f32,
    pub y: f32,
}

impl TrackPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// 欧氏距离
    pub fn distance_to(&self, other: &TrackPoint) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

// ========== 姿态 ==========

/// COCO 17 关键点布局
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Keypoint {
    Nose = 0,
    LeftEye = 1,
    RightEye = 2,
    LeftEar = 3,
    RightEar = 4,
    LeftShoulder = 5,
    RightShoulder = 6,
    LeftElbow = 7,
    RightElbow = 8,
    LeftWrist = 9,
    RightWrist = 10,
    LeftHip = 11,
    RightHip = 12,
    LeftKnee = 13,
    RightKnee = 14,
    LeftAnkle = 15,
    RightAnkle = 16,
}

impl Keypoint {
    pub const ALL: [Keypoint; NUM_KEYPOINTS] = [
        Keypoint::Nose,
        Keypoint::LeftEye,
        Keypoint::RightEye,
        Keypoint::LeftEar,
        Keypoint::RightEar,
        Keypoint::LeftShoulder,
        Keypoint::RightShoulder,
        Keypoint::LeftElbow,
        Keypoint::RightElbow,
        Keypoint::LeftWrist,
        Keypoint::RightWrist,
        Keypoint::LeftHip,
        Keypoint::RightHip,
        Keypoint::LeftKnee,
        Keypoint::RightKnee,
        Keypoint::LeftAnkle,
        Keypoint::RightAnkle,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// 姿态关键点 (x, y, confidence)
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PoseKeypoint {
    pub x: f32,
    pub y: f32,
    pub confidence: f32,
}

impl PoseKeypoint {
    pub fn new(x: f32, y: f32, confidence: f32) -> Self {
        Self { x, y, confidence }
    }
}

/// 单人姿态 (Person pose)
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonPose {
    pub keypoints: Vec<PoseKeypoint>,
    /// 整体置信度 (可见关键点的平均置信度)
    pub confidence: f32,
}

impl PersonPose {
    /// 由关键点构建, 整体置信度取置信度 > 0.5 的关键点均值
    pub fn from_keypoints(keypoints: Vec<PoseKeypoint>) -> Self {
        let visible: Vec<f32> = keypoints
            .iter()
            .map(|k| k.confidence)
            .filter(|c| *c > 0.5)
            .collect();
        let confidence = if visible.is_empty() {
            0.0
        } else {
            visible.iter().sum::<f32>() / visible.len() as f32
        };
        Self {
            keypoints,
            confidence,
        }
    }

    /// 是否包含完整的 17 点骨架
    pub fn is_complete(&self) -> bool {
        self.keypoints.len() >= NUM_KEYPOINTS
    }

    pub fn get(&self, kp: Keypoint) -> Option<&PoseKeypoint> {
        self.keypoints.get(kp.index())
    }
}
