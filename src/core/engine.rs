//! 分析上下文与会话
//!
//! 启动时构建一次 `AnalysisContext` (配置 + 阶段表 + 参考片段)，显式传给各会话，
//! 不使用全局状态。
//!
//! - `VideoSession`：完整录像，逐帧提取后统一分段、对齐、评分
//! - `LiveSession`：实时 / 循环输入，逐帧更新进度与计数
//!
//! 两种会话都可以在任意两帧之间停止；未完成的片段不会输出。

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::buffer::{AngleLog, FrameAngles, JointFrame, JointLog, JointSelector, LandmarkFrame};
use crate::config::EngineConfig;
use crate::core::aligner::{AlignTarget, SegmentAligner};
use crate::core::geometry::AngleCalculator;
use crate::core::phase::PhaseTable;
use crate::core::reference::{ReferenceLibrary, ReferenceSegment};
use crate::core::scorer::{DeviationScorer, ResultsSink};
use crate::core::segmenter::{RepetitionSegmenter, SegmentationOutcome};
use crate::core::tracker::{LiveProgressTracker, LiveStatus, RepEvent};
use crate::error::{AnalysisError, Result};
use crate::io;
use crate::models::MistakeRule;

// ============================================================
// 分析上下文
// ============================================================

/// 单个练习的分析上下文 (只读)
pub struct AnalysisContext {
    exercise: String,
    selector: JointSelector,
    calculator: AngleCalculator,
    table: PhaseTable,
    rules: Vec<MistakeRule>,
    reference: Option<Arc<ReferenceSegment>>,
    align_target: AlignTarget,
}

impl AnalysisContext {
    /// 由已校验的配置构建 (不含参考片段)
    pub fn new(config: EngineConfig, exercise: &str) -> Result<Self> {
        let exercise_config = config.exercise(exercise)?;
        let table = PhaseTable::from_config(exercise_config)?;
        let rules = exercise_config.mistakes.clone();
        let calculator = AngleCalculator::new(config.angles.clone());

        Ok(Self {
            selector: config.joint_selector(),
            calculator,
            table,
            rules,
            exercise: exercise.to_string(),
            reference: None,
            align_target: AlignTarget::default(),
        })
    }

    /// 加载配置与参考片段；任何错误都在处理帧之前返回
    pub fn load(config_path: &Path, reference_root: &Path, exercise: &str) -> Result<Self> {
        let config = EngineConfig::load(config_path)?;
        let mut library = ReferenceLibrary::new(reference_root);
        let reference = library.get(exercise)?;
        Ok(Self::new(config, exercise)?.with_reference(reference))
    }

    pub fn with_reference(mut self, reference: Arc<ReferenceSegment>) -> Self {
        self.reference = Some(reference);
        self
    }

    pub fn with_align_target(mut self, target: AlignTarget) -> Self {
        self.align_target = target;
        self
    }

    pub fn exercise(&self) -> &str {
        &self.exercise
    }

    /// 开始一次录像分析，需要参考片段
    pub fn video_session(&self) -> Result<VideoSession<'_>> {
        let reference = self.reference.clone().ok_or_else(|| {
            AnalysisError::Config(format!("no reference loaded for '{}'", self.exercise))
        })?;
        Ok(VideoSession {
            context: self,
            reference,
            joints: JointLog::new(),
            angles: AngleLog::new(),
            frames_skipped: 0,
        })
    }

    /// 开始一次实时分析
    pub fn live_session(&self, record: bool) -> LiveSession {
        LiveSession {
            selector: self.selector.clone(),
            calculator: self.calculator.clone(),
            tracker: LiveProgressTracker::new(self.table.clone()),
            record,
            joints: JointLog::new(),
            angles: AngleLog::new(),
        }
    }

    /// 逐帧提取：地标 → 关节帧 → 角度
    fn extract(&self, landmarks: &LandmarkFrame) -> (JointFrame, FrameAngles) {
        let joints = self.selector.select(landmarks);
        let angles = self.calculator.compute_frame(&joints);
        (joints, angles)
    }
}

impl Drop for AnalysisContext {
    fn drop(&mut self) {
        debug!("Analysis context for '{}' released", self.exercise);
    }
}

/// 追加前检查帧号单调，保证两张日志同步
fn check_frame_order(joints: &JointLog, frame: u64) -> Result<()> {
    match joints.frames().last() {
        Some(last) if frame <= last.frame => Err(AnalysisError::Validation(format!(
            "frame {} arrived after frame {}",
            frame, last.frame
        ))),
        _ => Ok(()),
    }
}

// ============================================================
// 录像分析
// ============================================================

/// 录像分析会话
pub struct VideoSession<'a> {
    context: &'a AnalysisContext,
    reference: Arc<ReferenceSegment>,
    joints: JointLog,
    angles: AngleLog,
    frames_skipped: usize,
}

impl<'a> VideoSession<'a> {
    /// 处理一帧地标
    ///
    /// 出错的帧被跳过并返回错误，会话状态不受影响。
    pub fn process(&mut self, landmarks: &LandmarkFrame) -> Result<()> {
        let result = check_frame_order(&self.joints, landmarks.frame)
            .map(|_| self.context.extract(landmarks));

        match result {
            Ok((joints, angles)) => {
                self.joints.push(joints)?;
                self.angles.push(angles)?;
                Ok(())
            }
            Err(e) => {
                self.frames_skipped += 1;
                warn!("Frame {} skipped: {}", landmarks.frame, e);
                Err(e)
            }
        }
    }

    pub fn frames_processed(&self) -> usize {
        self.joints.frame_count()
    }

    /// 结束输入：分段、对齐、评分
    pub fn finish(self) -> AnalysisReport {
        info!(
            "Analyzed {} frames, extracted {} joint features and {} angle features",
            self.joints.frame_count(),
            self.joints.feature_count(),
            self.angles.feature_count()
        );

        let required: Vec<String> = self.context.calculator.angle_names().map(str::to_string).collect();
        let segmenter = RepetitionSegmenter::new(self.context.table.clone(), required);
        let segmentation = segmenter.segment(&self.angles);

        for segment in &segmentation.segments {
            info!(
                "Repetition {}: frames [{}; {}]",
                segment.rep, segment.start_frame, segment.finish_frame
            );
        }

        let aligner = SegmentAligner::new(self.context.align_target);
        let scorer = DeviationScorer::new(self.context.rules.clone());
        let results = ResultsSink::new();

        for segment in &segmentation.segments {
            info!("Starting comparison with reference for rep {}", segment.rep);
            let pairs = aligner.align(&self.angles, segment, &self.reference);
            let found = scorer.score_into(segment.rep, &pairs, &results);
            debug!("Rep {}: {} mistakes", segment.rep, found);
        }
        info!("Analysis complete: {} mistakes over {} repetitions", results.len(), segmentation.segments.len());

        AnalysisReport {
            joints: self.joints,
            angles: self.angles,
            segmentation,
            results,
            frames_skipped: self.frames_skipped,
        }
    }
}

/// 录像分析结果
pub struct AnalysisReport {
    pub joints: JointLog,
    pub angles: AngleLog,
    pub segmentation: SegmentationOutcome,
    pub results: ResultsSink,
    pub frames_skipped: usize,
}

impl AnalysisReport {
    /// 写出结果表；失败时内存中的结果保持不变
    pub fn save(&self, output_dir: &Path) -> Result<PathBuf> {
        io::write_results(output_dir, &self.results.snapshot())
    }

    /// 写出关节、角度、片段表
    pub fn save_features(&self, output_dir: &Path) -> Result<Vec<PathBuf>> {
        Ok(vec![
            io::write_joints(output_dir, &self.joints)?,
            io::write_angles(output_dir, &self.angles)?,
            io::write_segments(output_dir, &self.segmentation.segments)?,
        ])
    }
}

// ============================================================
// 实时分析
// ============================================================

/// 实时分析会话
pub struct LiveSession {
    selector: JointSelector,
    calculator: AngleCalculator,
    tracker: LiveProgressTracker,
    /// 是否保留关节 / 角度日志以便保存
    record: bool,
    joints: JointLog,
    angles: AngleLog,
}

impl LiveSession {
    /// 设置事件通道
    pub fn with_event_channel(mut self, tx: mpsc::UnboundedSender<RepEvent>) -> Self {
        self.tracker = self.tracker.with_event_channel(tx);
        self
    }

    /// 处理一帧地标，返回最新显示状态
    pub fn process(&mut self, landmarks: &LandmarkFrame) -> Result<Option<LiveStatus>> {
        if self.record {
            check_frame_order(&self.joints, landmarks.frame)?;
        }
        let joints = self.selector.select(landmarks);
        let angles = self.calculator.compute_frame(&joints);
        let status = self.tracker.update(&angles);

        if self.record {
            self.joints.push(joints)?;
            self.angles.push(angles)?;
        }
        Ok(status)
    }

    pub fn repetitions(&self) -> u32 {
        self.tracker.repetitions()
    }

    /// 写出已记录的关节与角度表
    pub fn save(&self, output_dir: &Path) -> Result<Vec<PathBuf>> {
        Ok(vec![
            io::write_joints(output_dir, &self.joints)?,
            io::write_angles(output_dir, &self.angles)?,
        ])
    }
}
