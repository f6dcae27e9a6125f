//! 关节日志 (按帧排序，只追加)

use crate::buffer::frame::JointFrame;
use crate::error::{AnalysisError, Result};
use crate::models::Joint;

/// 每个关节记录的坐标参数数量 (frame, x, y, z)
pub const JOINT_PARAMETERS_NUM: usize = 4;

#[derive(Debug, Clone, Default)]
pub struct JointLog {
    frames: Vec<JointFrame>,
}

impl JointLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一帧，帧号必须严格递增
    pub fn push(&mut self, frame: JointFrame) -> Result<()> {
        if let Some(last) = self.frames.last() {
            if frame.frame <= last.frame {
                return Err(AnalysisError::Validation(format!(
                    "joint frame {} does not follow frame {}",
                    frame.frame, last.frame
                )));
            }
        }
        self.frames.push(frame);
        Ok(())
    }

    /// 从任意顺序的关节记录构建
    pub fn from_joints(joints: impl IntoIterator<Item = Joint>) -> Result<Self> {
        let mut joints: Vec<Joint> = joints.into_iter().collect();
        joints.sort_by_key(|j| (j.frame, j.id));

        let mut log = Self::new();
        let mut current: Option<JointFrame> = None;
        for joint in joints {
            match current.as_mut() {
                Some(frame) if frame.frame == joint.frame => {
                    frame.insert(joint.id, joint.point())?;
                }
                _ => {
                    if let Some(done) = current.take() {
                        log.push(done)?;
                    }
                    let mut frame = JointFrame::new(joint.frame);
                    frame.insert(joint.id, joint.point())?;
                    current = Some(frame);
                }
            }
        }
        if let Some(done) = current {
            log.push(done)?;
        }
        Ok(log)
    }

    pub fn get(&self, frame: u64) -> Option<&JointFrame> {
        self.frames
            .binary_search_by_key(&frame, |f| f.frame)
            .ok()
            .map(|idx| &self.frames[idx])
    }

    pub fn frames(&self) -> impl Iterator<Item = &JointFrame> {
        self.frames.iter()
    }

    pub fn frame_numbers(&self) -> Vec<u64> {
        self.frames.iter().map(|f| f.frame).collect()
    }

    pub fn to_joints(&self) -> Vec<Joint> {
        self.frames.iter().flat_map(|f| f.joints()).collect()
    }

    /// 关节记录总数
    pub fn joint_count(&self) -> usize {
        self.frames.iter().map(|f| f.len()).sum()
    }

    /// 提取的关节特征数
    pub fn feature_count(&self) -> usize {
        self.joint_count() * JOINT_PARAMETERS_NUM
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Point3;

    #[test]
    fn test_from_unordered_joints() {
        let joints = vec![
            Joint::new(2, 1, Point3::new(2.0, 0.0, 0.0)),
            Joint::new(0, 1, Point3::new(0.0, 0.0, 0.0)),
            Joint::new(2, 0, Point3::new(1.0, 0.0, 0.0)),
        ];
        let log = JointLog::from_joints(joints).unwrap();

        assert_eq!(log.frame_numbers(), vec![0, 2]);
        assert_eq!(log.joint_count(), 3);
        assert_eq!(log.feature_count(), 12);
        assert_eq!(log.get(2).unwrap().get(0), Some(Point3::new(1.0, 0.0, 0.0)));
        assert!(log.get(1).is_none());
    }

    #[test]
    fn test_push_rejects_out_of_order() {
        let mut log = JointLog::new();
        log.push(JointFrame::new(5)).unwrap();
        assert!(log.push(JointFrame::new(5)).is_err());
        assert!(log.push(JointFrame::new(3)).is_err());
        assert_eq!(log.frame_count(), 1);
    }
}
