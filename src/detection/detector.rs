//! 检测器接口 (Detector)
//! 职责: 外部检测/姿态模型与引擎之间的边界
//!
//! 引擎只依赖单方法能力接口, 模型加载与推理由宿主程序实现.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::types::{Detection, PersonPose};
use crate::error::{Result, SentinelError};

/// 目标检测能力: 一帧 → 有序检测列表
pub trait ObjectDetector<F> {
    fn detect(&mut self, frame: &F) -> Result<Vec<Detection>>;
}

/// 姿态估计能力 (可选)
///
/// 返回值与 `people` 按下标对齐, `None` 表示该人无可用姿态.
pub trait PoseEstimator<F> {
    fn estimate(&mut self, frame: &F, people: &[Detection]) -> Result<Vec<Option<PersonPose>>>;
}

// ========== 回放 ==========

/// 回放脚本中的一帧 (JSON Lines, 每行一帧)
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScriptedFrame {
    #[serde(default)]
    pub detections: Vec<Detection>,
    /// 与本帧人员检测按顺序对齐
    #[serde(default)]
    pub poses: Vec<Option<PersonPose>>,
}

/// 解析回放脚本, 空行与 `#` 开头的行被忽略
pub fn parse_script<R: BufRead>(reader: R) -> Result<Vec<ScriptedFrame>> {
    let mut frames = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let frame = serde_json::from_str(trimmed).map_err(|source| SentinelError::Script {
            line: idx + 1,
            source,
        })?;
        frames.push(frame);
    }
    Ok(frames)
}

/// 从文件加载回放脚本
pub fn load_script(path: impl AsRef<Path>) -> Result<Vec<ScriptedFrame>> {
    let file = File::open(path.as_ref())?;
    parse_script(BufReader::new(file))
}

/// 回放检测器: 直接返回帧内记录的检测结果
#[derive(Debug, Default)]
pub struct ReplayDetector;

impl ObjectDetector<ScriptedFrame> for ReplayDetector {
    fn detect(&mut self, frame: &ScriptedFrame) -> Result<Vec<Detection>> {
        Ok(frame.detections.clone())
    }
}

/// 回放姿态估计: 直接返回帧内记录的姿态
#[derive(Debug, Default)]
pub struct ReplayPoseEstimator;

impl PoseEstimator<ScriptedFrame> for ReplayPoseEstimator {
    fn estimate(
        &mut self,
        frame: &ScriptedFrame,
        people: &[Detection],
    ) -> Result<Vec<Option<PersonPose>>> {
        let mut poses = frame.poses.clone();
        poses.resize(people.len(), None);
        Ok(poses)
    }
}

/// 脚本检测器: 忽略输入帧, 按顺序吐出预设的检测序列
///
/// 序列耗尽后返回空列表.
#[derive(Debug, Default)]
pub struct ScriptedDetector {
    frames: VecDeque<Vec<Detection>>,
}

impl ScriptedDetector {
    pub fn new(frames: impl IntoIterator<Item = Vec<Detection>>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl<F> ObjectDetector<F> for ScriptedDetector {
    fn detect(&mut self, _frame: &F) -> Result<Vec<Detection>> {
        Ok(self.frames.pop_front().unwrap_or_default())
    }
}
