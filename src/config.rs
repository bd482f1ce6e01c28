//! 引擎配置 - 通过JSON文件调整参数

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::behavior::movement::MIN_HISTORY;
use crate::detection::catalog::{default_valuable_items, ValuableItemCatalog};
use crate::error::{Result, SentinelError};

/// 跟踪数量达到上限时的处理策略
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapacityPolicy {
    /// 淘汰最久未出现的轨迹, 本帧已出现的轨迹不会被淘汰 (全部出现时忽略新目标)
    #[default]
    EvictStale,
    /// 拒绝新建轨迹
    Reject,
}

/// 引擎参数配置
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SentinelConfig {
    // === 跟踪参数 ===
    pub person_class_id: u32,         // 可跟踪类别 (人)
    pub proximity_threshold_px: f32,  // 关联/贵重物品邻近距离(像素)
    pub max_tracked_entities: usize,  // 最大跟踪数量
    pub tracker_timeout_secs: f32,    // 轨迹超时(秒)
    pub max_position_history: usize,  // 轨迹历史长度
    pub capacity_policy: CapacityPolicy,
    pub min_object_size_px: f32,      // 最小检测框尺寸

    // === 行为分析参数 ===
    pub loitering_threshold_secs: f32,     // 逗留阈值(秒)
    pub hiding_behavior_threshold: f32,    // 高风险置信度阈值
    pub movement_alert_cooldown_secs: f32, // 可疑移动告警冷却(秒)
    pub suspicious_pose_threshold: f32,    // 可疑姿态阈值

    // === 姿态参数 ===
    pub pose_interval_frames: u32, // 姿态估计间隔帧数
    pub min_pose_confidence: f32,  // 姿态整体置信度下限

    // === 贵重物品 ===
    pub valuable_items: BTreeMap<u32, String>,
}

impl Default for SentinelConfig {
    fn default() -> Self {
        Self {
            person_class_id: 0,
            proximity_threshold_px: 80.0,
            max_tracked_entities: 50,
            tracker_timeout_secs: 5.0,
            max_position_history: 30,
            capacity_policy: CapacityPolicy::EvictStale,
            min_object_size_px: 0.0,

            loitering_threshold_secs: 20.0,
            hiding_behavior_threshold: 0.7,
            movement_alert_cooldown_secs: 8.0,
            suspicious_pose_threshold: 0.5,

            pose_interval_frames: 10,
            min_pose_confidence: 0.3,

            valuable_items: default_valuable_items(),
        }
    }
}

impl SentinelConfig {
    /// 从JSON文件加载配置, 文件不存在时写出默认配置
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(json) => {
                let config: Self = serde_json::from_str(&json)?;
                info!("✅ 配置已从 {} 加载", path.display());
                config.validate()?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("📝 配置文件不存在,创建默认配置...");
                let config = Self::default();
                config.save(path)?;
                Ok(config)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// 保存配置到JSON文件
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), json)?;
        info!("💾 配置已保存到 {}", path.as_ref().display());
        Ok(())
    }

    /// 校验配置, 构建引擎前调用
    pub fn validate(&self) -> Result<()> {
        fn positive(name: &str, v: f32) -> Result<()> {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                Err(SentinelError::config(format!("{} 必须为正数, 当前 {}", name, v)))
            }
        }
        fn unit(name: &str, v: f32) -> Result<()> {
            if (0.0..=1.0).contains(&v) {
                Ok(())
            } else {
                Err(SentinelError::config(format!("{} 必须在 [0,1] 内, 当前 {}", name, v)))
            }
        }

        fn duration(name: &str, secs: f32) -> Result<Duration> {
            positive(name, secs)?;
            Duration::try_from_secs_f32(secs)
                .map_err(|e| SentinelError::config(format!("{} 超出范围 {}: {}", name, secs, e)))
        }

        positive("proximity_threshold_px", self.proximity_threshold_px)?;
        duration("tracker_timeout_secs", self.tracker_timeout_secs)?;
        duration("loitering_threshold_secs", self.loitering_threshold_secs)?;
        duration("movement_alert_cooldown_secs", self.movement_alert_cooldown_secs)?;
        unit("hiding_behavior_threshold", self.hiding_behavior_threshold)?;
        unit("suspicious_pose_threshold", self.suspicious_pose_threshold)?;
        unit("min_pose_confidence", self.min_pose_confidence)?;

        if !(self.min_object_size_px.is_finite() && self.min_object_size_px >= 0.0) {
            return Err(SentinelError::config("min_object_size_px 不能为负数"));
        }
        if self.max_tracked_entities == 0 {
            return Err(SentinelError::config("max_tracked_entities 必须大于 0"));
        }
        if self.max_position_history == 0 {
            return Err(SentinelError::config("max_position_history 必须大于 0"));
        }
        if self.pose_interval_frames == 0 {
            return Err(SentinelError::config("pose_interval_frames 必须大于 0"));
        }
        if self.valuable_items.contains_key(&self.person_class_id) {
            return Err(SentinelError::config(format!(
                "类别 {} 不能同时是人和贵重物品",
                self.person_class_id
            )));
        }

        if self.max_position_history < MIN_HISTORY {
            warn!(
                "⚠️  轨迹历史 {} < {}, 可疑移动分析将不会触发",
                self.max_position_history, MIN_HISTORY
            );
        }
        Ok(())
    }

    // 未经校验的超范围值饱和为 Duration::MAX, 不会 panic

    pub fn tracker_timeout(&self) -> Duration {
        saturating_secs(self.tracker_timeout_secs)
    }

    pub fn loitering_threshold(&self) -> Duration {
        saturating_secs(self.loitering_threshold_secs)
    }

    pub fn movement_alert_cooldown(&self) -> Duration {
        saturating_secs(self.movement_alert_cooldown_secs)
    }

    pub fn catalog(&self) -> ValuableItemCatalog {
        ValuableItemCatalog::new(self.valuable_items.clone())
    }

    /// 打印当前配置
    pub fn print_summary(&self) {
        info!("🎛️  当前引擎配置:");
        info!("  邻近阈值: {:.1}px", self.proximity_threshold_px);
        info!("  逗留阈值: {:.1}s", self.loitering_threshold_secs);
        info!(
            "  轨迹上限: {} ({:?}) | 超时: {:.1}s | 历史: {}",
            self.max_tracked_entities,
            self.capacity_policy,
            self.tracker_timeout_secs,
            self.max_position_history
        );
        info!(
            "  移动告警冷却: {:.1}s | 姿态阈值: {:.2} | 高风险阈值: {:.2}",
            self.movement_alert_cooldown_secs,
            self.suspicious_pose_threshold,
            self.hiding_behavior_threshold
        );
        info!("  贵重物品类别: {} 个", self.valuable_items.len());
    }
}

fn saturating_secs(secs: f32) -> Duration {
    Duration::try_from_secs_f32(secs.max(0.0)).unwrap_or(Duration::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = SentinelConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.tracker_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = SentinelConfig::default();
        config.proximity_threshold_px = 0.0;
        assert!(matches!(
            config.validate(),
            Err(SentinelError::InvalidConfig(_))
        ));

        let mut config = SentinelConfig::default();
        config.suspicious_pose_threshold = 1.5;
        assert!(config.validate().is_err());

        let mut config = SentinelConfig::default();
        config.max_tracked_entities = 0;
        assert!(config.validate().is_err());

        let mut config = SentinelConfig::default();
        config.valuable_items.insert(0, "person?".into());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_out_of_range_durations_rejected() {
        let mut config = SentinelConfig::default();
        config.tracker_timeout_secs = 1e20;
        assert!(matches!(
            config.validate(),
            Err(SentinelError::InvalidConfig(_))
        ));

        let mut config = SentinelConfig::default();
        config.loitering_threshold_secs = 1e20;
        assert!(matches!(
            config.validate(),
            Err(SentinelError::InvalidConfig(_))
        ));
        assert_eq!(config.loitering_threshold(), Duration::MAX);

        let mut config = SentinelConfig::default();
        config.movement_alert_cooldown_secs = f32::INFINITY;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{ "proximity_threshold_px": 120.0, "capacity_policy": "reject" }"#;
        let config: SentinelConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.proximity_threshold_px, 120.0);
        assert_eq!(config.capacity_policy, CapacityPolicy::Reject);
        assert_eq!(config.max_position_history, 30);
        assert!(!config.valuable_items.is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!(
            "sentinel_config_test_{}.json",
            std::process::id()
        ));
        let mut config = SentinelConfig::default();
        config.loitering_threshold_secs = 12.5;
        config.save(&path).unwrap();

        let loaded = SentinelConfig::load(&path).unwrap();
        assert_eq!(loaded.loitering_threshold_secs, 12.5);
        assert_eq!(loaded.valuable_items, config.valuable_items);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_load_missing_file_writes_defaults() {
        let path = std::env::temp_dir().join(format!(
            "sentinel_config_missing_{}.json",
            std::process::id()
        ));
        let _ = fs::remove_file(&path);

        let config = SentinelConfig::load(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.proximity_threshold_px, 80.0);

        let written: SentinelConfig =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written.max_tracked_entities, config.max_tracked_entities);
        assert_eq!(written.valuable_items, config.valuable_items);
        let _ = fs::remove_file(&path);
    }
}
