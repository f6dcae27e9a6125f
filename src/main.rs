//! form_coach - 动作重复分段与纠错
//!
//! 输入为姿态估计输出的地标表 (frame,id,x,y,z)

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use form_coach::io::read_landmarks;
use form_coach::utils::time::{format_frame_range, format_mmss, frame_to_seconds};
use form_coach::{AlignTarget, AnalysisContext, EngineConfig, LandmarkFrame, RepEvent};

/// 动作重复计数与姿态纠错
#[derive(Parser, Debug)]
#[command(name = "form_coach")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 输出 debug 日志
    #[arg(short, long, global = true)]
    verbose: bool,

    /// 引擎配置 (JSON)
    #[arg(short, long, global = true, default_value = "config.json")]
    config: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 完整录像分析：分段、与参考动作对比、输出错误反馈
    Video {
        /// 地标表
        input: PathBuf,

        /// 练习名称
        #[arg(short, long)]
        exercise: String,

        /// 参考数据根目录 (<root>/<exercise>/features/reference)
        #[arg(long, default_value = "data")]
        reference_root: PathBuf,

        /// 结果输出目录
        #[arg(short, long, default_value = "results")]
        output: PathBuf,

        /// 对齐时以哪一侧的长度为准 (reference | live)
        #[arg(long, default_value = "reference")]
        align_target: AlignTarget,

        /// 保存结果
        #[arg(long)]
        save_results: bool,

        /// 录像帧率 (仅用于日志)
        #[arg(long, default_value_t = 30.0)]
        fps: f64,
    },

    /// 实时进度与计数
    Live {
        /// 地标表
        input: PathBuf,

        /// 练习名称
        #[arg(short, long)]
        exercise: String,

        /// 结果输出目录
        #[arg(short, long, default_value = "results")]
        output: PathBuf,

        /// 保存关节与角度表
        #[arg(long)]
        save_results: bool,

        /// 输入结束后从头循环
        #[arg(long = "loop")]
        loop_input: bool,

        /// 回放帧率
        #[arg(long, default_value_t = 30.0)]
        fps: f64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 初始化日志
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Video {
            input,
            exercise,
            reference_root,
            output,
            align_target,
            save_results,
            fps,
        } => {
            run_video(
                &cli.config,
                &input,
                &exercise,
                &reference_root,
                &output,
                align_target,
                save_results,
                fps,
            )
            .await
        }
        Commands::Live {
            input,
            exercise,
            output,
            save_results,
            loop_input,
            fps,
        } => run_live(&cli.config, &input, &exercise, &output, save_results, loop_input, fps).await,
    }
}

/// Ctrl-C 时置位的停止标志
fn stop_signal() -> Arc<AtomicBool> {
    let stop = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&stop);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            flag.store(true, Ordering::SeqCst);
        }
    });
    stop
}

async fn run_video(
    config: &Path,
    input: &Path,
    exercise: &str,
    reference_root: &Path,
    output: &Path,
    align_target: AlignTarget,
    save_results: bool,
    fps: f64,
) -> anyhow::Result<()> {
    // 配置与参考数据错误在处理帧之前终止
    let context = AnalysisContext::load(config, reference_root, exercise)?.with_align_target(align_target);
    let frames = read_landmarks(input)?;
    let stop = stop_signal();

    info!(
        "Starting feature extraction for '{}' from {} ({} frames, aligned to {:?})",
        context.exercise(),
        input.display(),
        frames.len(),
        align_target
    );
    let mut session = context.video_session()?;
    for landmarks in &frames {
        if stop.load(Ordering::SeqCst) {
            warn!(
                "Stopped at frame {} after {} frames; unfinished repetition discarded",
                landmarks.frame,
                session.frames_processed()
            );
            break;
        }
        // 单帧错误已记录，继续下一帧
        let _ = session.process(landmarks);
    }

    let report = session.finish();
    for segment in &report.segmentation.segments {
        info!(
            "Repetition {}: {}",
            segment.rep,
            format_frame_range(segment.start_frame, segment.finish_frame, fps)
        );
    }
    for result in report.results.snapshot() {
        info!(
            "Rep {}: {} ({:.1}°) - {}",
            result.rep, result.mistake_name, result.measured_deviation, result.fix_info
        );
    }

    if save_results {
        match report.save(output).and_then(|_| report.save_features(output)) {
            Ok(_) => info!("Results here: {}", output.display()),
            Err(e) => error!("Error on trying to save results: {}", e),
        }
    }
    Ok(())
}

async fn run_live(
    config: &Path,
    input: &Path,
    exercise: &str,
    output: &Path,
    save_results: bool,
    loop_input: bool,
    fps: f64,
) -> anyhow::Result<()> {
    let context = AnalysisContext::new(EngineConfig::load(config)?, exercise)?;
    let frames = read_landmarks(input)?;
    if frames.is_empty() {
        anyhow::bail!("No landmarks in {}", input.display());
    }

    info!("Live tracking '{}' from {}", context.exercise(), input.display());
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let mut session = context.live_session(save_results).with_event_channel(event_tx);

    // 模拟实时输入：按帧率回放，循环时帧号顺延
    let (frame_tx, mut frame_rx) = mpsc::channel::<LandmarkFrame>(8);
    let period = Duration::from_secs_f64(1.0 / fps.max(1.0));
    tokio::spawn(async move {
        let span = frames.last().map(|f| f.frame + 1).unwrap_or(1);
        let mut offset = 0;
        loop {
            for landmarks in &frames {
                let mut landmarks = landmarks.clone();
                landmarks.frame += offset;
                if frame_tx.send(landmarks).await.is_err() {
                    return;
                }
                tokio::time::sleep(period).await;
            }
            if !loop_input {
                return;
            }
            offset += span;
        }
    });

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("Stop requested");
                break;
            }
            next = frame_rx.recv() => {
                let Some(landmarks) = next else { break };
                match session.process(&landmarks) {
                    Ok(Some(status)) => info!(
                        "[{}] progress {:>5.1}% | state {} | reps {}",
                        format_mmss(frame_to_seconds(status.frame, fps)),
                        status.progress * 100.0,
                        status.state,
                        status.repetitions
                    ),
                    Ok(None) => {}
                    Err(e) => warn!("Frame {} skipped: {}", landmarks.frame, e),
                }
                while let Ok(event) = event_rx.try_recv() {
                    if let RepEvent::RepCompleted { repetitions, .. } = event {
                        info!("Repetition {} completed", repetitions);
                    }
                }
            }
        }
    }

    info!("Total repetitions: {}", session.repetitions());
    if save_results {
        match session.save(output) {
            Ok(_) => info!("Results here: {}", output.display()),
            Err(e) => error!("Error on trying to save results: {}", e),
        }
    }
    Ok(())
}
