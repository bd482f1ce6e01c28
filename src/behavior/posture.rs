//! 可疑姿态分析 (Posture)
//!
//! 两个叠加的启发式规则, 都要求相关关键点置信度足够:
//! - 蹲伏: 肩部与髋部高度差过小 (躯干被压缩)
//! - 遮挡: 双手腕都贴近肩部中线 (手靠近躯干)

use crate::detection::types::{Keypoint, PersonPose};

/// 关键点置信度下限
pub const KEYPOINT_MIN_CONFIDENCE: f32 = 0.3;
/// 肩-髋高度差阈值(像素)
pub const CROUCH_TORSO_PX: f32 = 50.0;
/// 手腕-中线水平距离阈值(像素)
pub const CONCEALMENT_WRIST_PX: f32 = 30.0;

const CROUCH_SCORE: f32 = 0.4;
const CONCEALMENT_SCORE: f32 = 0.3;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PostureScore {
    pub crouch: f32,
    pub concealment: f32,
    pub total: f32,
}

/// 对单个姿态评分, 关键点不完整时返回 0 分
pub fn score(pose: &PersonPose) -> PostureScore {
    if !pose.is_complete() {
        return PostureScore::default();
    }

    let confident = |kps: &[Keypoint]| {
        kps.iter().all(|kp| {
            pose.get(*kp)
                .map_or(false, |p| p.confidence > KEYPOINT_MIN_CONFIDENCE)
        })
    };
    // 完整骨架下索引必然存在
    let at = |kp: Keypoint| pose.keypoints[kp.index()];

    let (ls, rs) = (at(Keypoint::LeftShoulder), at(Keypoint::RightShoulder));

    let mut crouch = 0.0;
    if confident(&[
        Keypoint::LeftShoulder,
        Keypoint::RightShoulder,
        Keypoint::LeftHip,
        Keypoint::RightHip,
    ]) {
        let (lh, rh) = (at(Keypoint::LeftHip), at(Keypoint::RightHip));
        let shoulder_y = (ls.y + rs.y) / 2.0;
        let hip_y = (lh.y + rh.y) / 2.0;
        if (shoulder_y - hip_y).abs() < CROUCH_TORSO_PX {
            crouch = CROUCH_SCORE;
        }
    }

    let mut concealment = 0.0;
    if confident(&[
        Keypoint::LeftWrist,
        Keypoint::RightWrist,
        Keypoint::LeftShoulder,
        Keypoint::RightShoulder,
    ]) {
        let center_x = (ls.x + rs.x) / 2.0;
        let left = (at(Keypoint::LeftWrist).x - center_x).abs();
        let right = (at(Keypoint::RightWrist).x - center_x).abs();
        if left < CONCEALMENT_WRIST_PX && right < CONCEALMENT_WRIST_PX {
            concealment = CONCEALMENT_SCORE;
        }
    }

    PostureScore {
        crouch,
        concealment,
        total: crouch + concealment,
    }
}

/// 分数超过阈值时返回评分
pub fn analyze(pose: &PersonPose, threshold: f32) -> Option<PostureScore> {
    let result = score(pose);
    (result.total > threshold).then_some(result)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::detection::types::{PoseKeypoint, NUM_KEYPOINTS};
    use approx::assert_abs_diff_eq;

    /// 构造姿态: 指定肩/髋高度与手腕x坐标, 肩宽 60px 以 x=200 为中线
    pub(crate) fn pose(shoulder_y: f32, hip_y: f32, wrist_x: (f32, f32)) -> PersonPose {
        let mut kps = vec![PoseKeypoint::new(200.0, 100.0, 0.9); NUM_KEYPOINTS];
        kps[Keypoint::LeftShoulder.index()] = PoseKeypoint::new(170.0, shoulder_y, 0.9);
        kps[Keypoint::RightShoulder.index()] = PoseKeypoint::new(230.0, shoulder_y, 0.9);
        kps[Keypoint::LeftHip.index()] = PoseKeypoint::new(180.0, hip_y, 0.9);
        kps[Keypoint::RightHip.index()] = PoseKeypoint::new(220.0, hip_y, 0.9);
        kps[Keypoint::LeftWrist.index()] = PoseKeypoint::new(wrist_x.0, hip_y, 0.9);
        kps[Keypoint::RightWrist.index()] = PoseKeypoint::new(wrist_x.1, hip_y, 0.9);
        PersonPose::from_keypoints(kps)
    }

    #[test]
    fn test_upright_arms_out() {
        let s = score(&pose(100.0, 220.0, (120.0, 280.0)));
        assert_eq!(s, PostureScore::default());
    }

    #[test]
    fn test_crouch_only() {
        let s = score(&pose(200.0, 230.0, (120.0, 280.0)));
        assert_abs_diff_eq!(s.crouch, 0.4);
        assert_eq!(s.concealment, 0.0);
        assert!(analyze(&pose(200.0, 230.0, (120.0, 280.0)), 0.5).is_none());
    }

    #[test]
    fn test_crouch_and_concealment() {
        let p = pose(200.0, 230.0, (190.0, 215.0));
        let s = analyze(&p, 0.5).unwrap();
        assert_abs_diff_eq!(s.total, 0.7, epsilon = 1e-6);
    }

    #[test]
    fn test_low_confidence_wrists_ignored() {
        let mut p = pose(100.0, 220.0, (195.0, 205.0));
        p.keypoints[Keypoint::LeftWrist.index()].confidence = 0.2;
        assert_eq!(score(&p).concealment, 0.0);
    }

    #[test]
    fn test_incomplete_pose() {
        let mut p = pose(200.0, 230.0, (190.0, 215.0));
        p.keypoints.truncate(12);
        assert_eq!(score(&p).total, 0.0);
    }
}
