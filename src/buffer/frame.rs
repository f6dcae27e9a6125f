//! 关节帧
//!
//! 按关节 id 索引的定长结构，"关节在本帧缺失" 是显式检查的条件

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AnalysisError, Result};
use crate::models::{Joint, Point3};

/// 每帧最多关节数 (BlazePose 33 个地标)
pub const MAX_JOINTS: usize = 33;

/// 姿态估计输出的一帧原始地标
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkFrame {
    /// 帧号 (单调递增，可能跳帧)
    pub frame: u64,
    /// (关节 id, 坐标)
    pub points: Vec<(usize, Point3)>,
}

impl LandmarkFrame {
    pub fn new(frame: u64, points: Vec<(usize, Point3)>) -> Self {
        Self { frame, points }
    }
}

/// 单帧关节坐标
#[derive(Debug, Clone, PartialEq)]
pub struct JointFrame {
    pub frame: u64,
    joints: [Option<Point3>; MAX_JOINTS],
}

impl JointFrame {
    pub fn new(frame: u64) -> Self {
        Self {
            frame,
            joints: [None; MAX_JOINTS],
        }
    }

    /// 写入关节坐标
    pub fn insert(&mut self, id: usize, point: Point3) -> Result<()> {
        let slot = self.joints.get_mut(id).ok_or(AnalysisError::JointOutOfRange {
            id,
            max: MAX_JOINTS - 1,
        })?;
        *slot = Some(point);
        Ok(())
    }

    pub fn get(&self, id: usize) -> Option<Point3> {
        self.joints.get(id).copied().flatten()
    }

    /// 获取关节，缺失时返回 `MissingJoint`
    pub fn require(&self, id: usize) -> Result<Point3> {
        self.get(id).ok_or(AnalysisError::MissingJoint {
            frame: self.frame,
            id,
        })
    }

    /// 已检测到的关节数
    pub fn len(&self) -> usize {
        self.joints.iter().filter(|j| j.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 按 id 升序展开为关节记录
    pub fn joints(&self) -> impl Iterator<Item = Joint> + '_ {
        self.joints
            .iter()
            .enumerate()
            .filter_map(move |(id, p)| p.map(|p| Joint::new(self.frame, id, p)))
    }
}

/// 关节筛选
///
/// 只保留角度三元组用到的关节和配置中命名的关节；其余地标 (包括越界 id) 直接丢弃。
#[derive(Debug, Clone)]
pub struct JointSelector {
    tracked: [bool; MAX_JOINTS],
    names: BTreeMap<usize, String>,
}

impl JointSelector {
    /// `ids` 中越界的 id 被忽略
    pub fn new(ids: impl IntoIterator<Item = usize>, names: BTreeMap<usize, String>) -> Self {
        let mut tracked = [false; MAX_JOINTS];
        for id in ids {
            if let Some(slot) = tracked.get_mut(id) {
                *slot = true;
            }
        }
        Self { tracked, names }
    }

    pub fn is_tracked(&self, id: usize) -> bool {
        self.tracked.get(id).copied().unwrap_or(false)
    }

    /// 关节名称，未命名时回退为 id
    pub fn name(&self, id: usize) -> String {
        self.names.get(&id).cloned().unwrap_or_else(|| id.to_string())
    }

    /// 地标帧 → 关节帧
    pub fn select(&self, landmarks: &LandmarkFrame) -> JointFrame {
        let mut joint_frame = JointFrame::new(landmarks.frame);
        for (id, point) in &landmarks.points {
            if !self.is_tracked(*id) {
                continue;
            }
            if let Err(e) = joint_frame.insert(*id, *point) {
                debug!("Frame {}: landmark dropped: {}", landmarks.frame, e);
            }
        }

        for id in (0..MAX_JOINTS).filter(|id| self.tracked[*id]) {
            if joint_frame.get(id).is_none() {
                debug!("Frame {}: joint '{}' not detected", landmarks.frame, self.name(id));
            }
        }
        joint_frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_joint_frame_lookup() {
        let landmarks = LandmarkFrame::new(
            7,
            vec![(11, Point3::new(0.0, 1.0, 0.0)), (13, Point3::new(1.0, 1.0, 0.0))],
        );
        let frame = JointSelector::new([11, 13, 15], BTreeMap::new()).select(&landmarks);

        assert_eq!(frame.len(), 2);
        assert_eq!(frame.get(13), Some(Point3::new(1.0, 1.0, 0.0)));
        assert!(frame.get(15).is_none());
        assert!(matches!(
            frame.require(15),
            Err(AnalysisError::MissingJoint { frame: 7, id: 15 })
        ));

        let ids: Vec<usize> = frame.joints().map(|j| j.id).collect();
        assert_eq!(ids, vec![11, 13]);
    }

    #[test]
    fn test_joint_out_of_range() {
        let mut frame = JointFrame::new(0);
        assert!(matches!(
            frame.insert(MAX_JOINTS, Point3::new(0.0, 0.0, 0.0)),
            Err(AnalysisError::JointOutOfRange { .. })
        ));
        // 越界不影响其他槽位
        assert!(frame.is_empty());
    }

    #[test]
    fn test_selector_drops_untracked_and_out_of_range() {
        let mut names = BTreeMap::new();
        names.insert(1, "left_elbow".to_string());
        let selector = JointSelector::new([0, 1, 2], names);

        let landmarks = LandmarkFrame::new(
            4,
            vec![
                (0, Point3::new(1.0, 0.0, 0.0)),
                (1, Point3::new(0.0, 0.0, 0.0)),
                (2, Point3::new(0.0, 1.0, 0.0)),
                (5, Point3::new(3.0, 3.0, 3.0)),
                (40, Point3::new(9.0, 9.0, 9.0)),
            ],
        );
        let frame = selector.select(&landmarks);

        let ids: Vec<usize> = frame.joints().map(|j| j.id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(selector.name(1), "left_elbow");
        assert_eq!(selector.name(2), "2");
        assert!(!selector.is_tracked(40));
    }
}
