//! 参考动作库
//!
//! 每个练习一段标准重复动作 (关节表 + 角度表)，进程启动时加载一次，之后只读共享

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use crate::buffer::{AngleLog, JointLog};
use crate::error::{AnalysisError, Result};
use crate::io::{self, ANGLES_FILE, JOINTS_FILE};
use crate::models::{Angle, Joint, Segment};

/// 参考片段：覆盖两张表完整帧范围的一次重复
#[derive(Debug, Clone)]
pub struct ReferenceSegment {
    pub segment: Segment,
    pub joints: JointLog,
    pub angles: AngleLog,
}

impl ReferenceSegment {
    /// 由两张按帧索引的表重建参考片段
    ///
    /// 两张表的帧集合必须完全一致，且至少覆盖两帧；角度值必须是有限值。
    pub fn from_tables(joints: Vec<Joint>, angles: Vec<Angle>) -> Result<Self> {
        if let Some(bad) = angles.iter().find(|a| !a.value.is_finite()) {
            return Err(AnalysisError::ReferenceIntegrity(format!(
                "angle '{}' at frame {} is not finite ({})",
                bad.name, bad.frame, bad.value
            )));
        }
        let joints = JointLog::from_joints(joints)
            .map_err(|e| AnalysisError::ReferenceIntegrity(e.to_string()))?;
        let angles = AngleLog::from_angles(angles)
            .map_err(|e| AnalysisError::ReferenceIntegrity(e.to_string()))?;

        let joint_frames = joints.frame_numbers();
        let angle_frames = angles.frame_numbers();
        if joint_frames != angle_frames {
            let only_joints = joint_frames.iter().filter(|f| angles.get(**f).is_none()).count();
            let only_angles = angle_frames.iter().filter(|f| joints.get(**f).is_none()).count();
            return Err(AnalysisError::ReferenceIntegrity(format!(
                "joint and angle tables cover different frames ({} only in joints, {} only in angles)",
                only_joints, only_angles
            )));
        }

        let (start, finish) = match (joint_frames.first(), joint_frames.last()) {
            (Some(first), Some(last)) if first < last => (*first, *last),
            _ => {
                return Err(AnalysisError::ReferenceIntegrity(format!(
                    "reference must span at least two frames, got {}",
                    joint_frames.len()
                )))
            }
        };

        Ok(Self {
            segment: Segment::new(1, start, finish)?,
            joints,
            angles,
        })
    }

    /// 从参考目录加载 (joints.csv + angles.csv)
    pub fn load(dir: &Path) -> Result<Self> {
        let joints = io::read_joints(&dir.join(JOINTS_FILE))
            .map_err(|e| AnalysisError::ReferenceIntegrity(format!("{}: {}", dir.display(), e)))?;
        let angles = io::read_angles(&dir.join(ANGLES_FILE))
            .map_err(|e| AnalysisError::ReferenceIntegrity(format!("{}: {}", dir.display(), e)))?;
        Self::from_tables(joints, angles)
    }
}

/// 参考动作库
pub struct ReferenceLibrary {
    root: PathBuf,
    cache: HashMap<String, Arc<ReferenceSegment>>,
}

impl ReferenceLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: HashMap::new(),
        }
    }

    /// 练习的参考数据目录：`<root>/<exercise>/features/reference`
    pub fn reference_dir(&self, exercise: &str) -> PathBuf {
        self.root.join(exercise).join("features").join("reference")
    }

    /// 获取参考片段，首次访问时从磁盘加载
    pub fn get(&mut self, exercise: &str) -> Result<Arc<ReferenceSegment>> {
        if let Some(reference) = self.cache.get(exercise) {
            return Ok(Arc::clone(reference));
        }

        let dir = self.reference_dir(exercise);
        let reference = Arc::new(ReferenceSegment::load(&dir)?);
        info!(
            "Loaded reference for '{}': frames [{}; {}], {} angles",
            exercise,
            reference.segment.start_frame,
            reference.segment.finish_frame,
            reference.angles.angle_count()
        );

        self.cache.insert(exercise.to_string(), Arc::clone(&reference));
        Ok(reference)
    }

    pub fn is_loaded(&self, exercise: &str) -> bool {
        self.cache.contains_key(exercise)
    }
}
