/// 检测系统 (Detection System)
///
/// - Detector: 外部检测/姿态能力接口
/// - Catalog:  贵重物品目录
/// - Tracker:  人员跟踪与生命周期
pub mod catalog;
pub mod detector;
pub mod tracker;
pub mod types;

pub use catalog::ValuableItemCatalog;
pub use detector::{
    load_script, parse_script, ObjectDetector, PoseEstimator, ReplayDetector,
    ReplayPoseEstimator, ScriptedDetector, ScriptedFrame,
};
pub use tracker::{TrackStore, TrackedEntity};
pub use types::{BBox, Detection, Keypoint, PersonPose, PoseKeypoint, TrackPoint};
