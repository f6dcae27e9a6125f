//! 动作重复分段与姿态纠错核心库
//!
//! 核心流程：
//! - 3D 地标 → 关节角度 (逐帧)
//! - 角度序列 → 阶段状态机 → 重复动作片段
//! - 片段 ↔ 参考动作 按比例重采样对齐
//! - 对齐后的偏差 → 错误规则 → 反馈结果

pub mod buffer;
pub mod config;
pub mod core;
pub mod error;
pub mod io;
pub mod models;
pub mod utils;

// Re-exports - 核心组件
pub use crate::core::aligner::{AlignTarget, AlignedPair, SegmentAligner};
pub use crate::core::engine::{AnalysisContext, AnalysisReport, LiveSession, VideoSession};
pub use crate::core::geometry::{angle_between, joint_angle, AngleCalculator};
pub use crate::core::phase::{PhaseMachine, PhaseTable, RepState, Transition};
pub use crate::core::reference::{ReferenceLibrary, ReferenceSegment};
pub use crate::core::scorer::{DeviationScorer, ResultsSink};
pub use crate::core::segmenter::{RepetitionSegmenter, SegmentationOutcome};
pub use crate::core::tracker::{LiveProgressTracker, LiveStatus, RepEvent};

// Re-exports - 数据
pub use buffer::{AngleLog, FrameAngles, JointFrame, JointLog, JointSelector, LandmarkFrame, MAX_JOINTS};
pub use config::EngineConfig;
pub use error::{AnalysisError, Result};
pub use models::{Angle, Joint, MistakeResult, MistakeRule, Point3, Segment};
