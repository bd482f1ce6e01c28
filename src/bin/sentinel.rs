/// 数字卫兵 (Digital Sentinel)
///
/// 行为分析回放工具: 读取录制好的检测结果 (JSON Lines), 逐帧送入引擎并输出告警
///
/// 系统架构:
/// 1. 读取线程: 按帧发送回放脚本 (独立工作线程)
/// 2. 主线程:   跟踪、行为分析与告警输出
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{ensure, Context, Result};
use clap::Parser;
use crossbeam_channel::bounded;
use log::{info, warn};

use sentinel_rs::detection::{load_script, ReplayDetector, ReplayPoseEstimator, ScriptedFrame};
use sentinel_rs::{gen_time_string, PoseEstimator, Sentinel, SentinelConfig, Severity};

/// 数字卫兵参数
#[derive(Parser, Debug)]
#[command(author, version, about = "数字卫兵 - 行为分析回放", long_about = None)]
struct Args {
    /// 回放脚本 (JSON Lines, 每行一帧)
    #[arg(short, long)]
    script: PathBuf,

    /// 配置文件 (不存在时写入默认配置)
    #[arg(short, long, default_value = "sentinel_config.json")]
    config: PathBuf,

    /// 脚本帧率, 决定帧间时间间隔
    #[arg(short, long, default_value_t = 30.0)]
    fps: f32,

    /// 按帧率实时回放 (默认尽快处理)
    #[arg(long)]
    realtime: bool,

    /// 关闭姿态分析
    #[arg(long)]
    no_pose: bool,

    /// 以JSON格式输出告警到标准输出
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    ensure!(
        args.fps.is_finite() && args.fps > 0.0,
        "帧率必须为正数: {}",
        args.fps
    );

    let config = SentinelConfig::load(&args.config)
        .with_context(|| format!("加载配置失败: {}", args.config.display()))?;
    config.print_summary();

    let frames = load_script(&args.script)
        .with_context(|| format!("读取回放脚本失败: {}", args.script.display()))?;

    info!("🚀 数字卫兵回放启动");
    info!("📄 回放脚本: {} ({} 帧)", args.script.display(), frames.len());
    info!("🎞️ 帧率: {} fps{}", args.fps, if args.realtime { " (实时)" } else { "" });

    let mut sentinel = Sentinel::new(config)?;
    let frame_interval = Duration::from_secs_f32(1.0 / args.fps);

    // ========== 启动读取线程 ==========
    let (tx, rx) = bounded::<ScriptedFrame>(8);
    let realtime = args.realtime;
    let reader = thread::spawn(move || {
        for frame in frames {
            if tx.send(frame).is_err() {
                break;
            }
            if realtime {
                thread::sleep(frame_interval);
            }
        }
    });

    // ========== 主线程: 行为分析 ==========
    // 时间轴由帧序号推算, 回放结果与处理速度无关
    let start = Instant::now();
    let mut detector = ReplayDetector;
    let mut pose_estimator = ReplayPoseEstimator;

    for (idx, frame) in rx.iter().enumerate() {
        let now = start + frame_interval * idx as u32;
        let estimator: Option<&mut dyn PoseEstimator<ScriptedFrame>> = if args.no_pose {
            None
        } else {
            Some(&mut pose_estimator)
        };
        let output = sentinel.step_at(&mut detector, estimator, &frame, now)?;

        for alert in output.alerts() {
            let icon = match alert.severity {
                Severity::High => "🚨",
                Severity::Normal => "⚠️",
            };
            warn!(
                "{} [{}] 帧 {} | {}",
                icon,
                gen_time_string(":"),
                idx + 1,
                alert
            );
            if args.json {
                println!("{}", serde_json::to_string(alert)?);
            }
        }
    }

    if reader.join().is_err() {
        warn!("⚠️ 读取线程异常退出");
    }

    info!("📊 {}", sentinel.tracks().get_stats());
    info!("📊 {}", sentinel.stats().summary());
    Ok(())
}
