//! 错误类型 (Error types)

use thiserror::Error;

/// 引擎结果类型
pub type Result<T> = std::result::Result<T, SentinelError>;

/// 引擎可能返回的错误
///
/// 单帧内的坏数据 (畸形检测框、缺失姿态) 不会走到这里,
/// 只在构建阶段或外部协作者失败时返回.
#[derive(Error, Debug)]
pub enum SentinelError {
    #[error("配置无效 (invalid config): {0}")]
    InvalidConfig(String),

    #[error("检测器失败 (detector failed): {0}")]
    Detector(String),

    #[error("姿态估计失败 (pose estimator failed): {0}")]
    PoseEstimator(String),

    #[error("回放脚本第 {line} 行解析失败: {source}")]
    Script {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SentinelError {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    pub fn detector<S: Into<String>>(msg: S) -> Self {
        Self::Detector(msg.into())
    }

    pub fn pose<S: Into<String>>(msg: S) -> Self {
        Self::PoseEstimator(msg.into())
    }
}
