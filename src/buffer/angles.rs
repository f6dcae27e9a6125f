//! 角度日志
//!
//! 每帧一组命名角度，按帧排序；提供按名称取时间序列的视图

use std::collections::BTreeSet;

use ndarray::Array1;

use crate::error::{AnalysisError, Result};
use crate::models::Angle;

/// 每个角度记录的参数数量 (frame, name, value)
pub const ANGLE_PARAMETERS_NUM: usize = 3;

/// 单帧的命名角度 (保持配置顺序)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FrameAngles {
    pub frame: u64,
    values: Vec<(String, f64)>,
}

impl FrameAngles {
    pub fn new(frame: u64) -> Self {
        Self {
            frame,
            values: Vec::new(),
        }
    }

    /// 写入角度，同名覆盖
    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        let name = name.into();
        match self.values.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.values.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn to_angles(&self) -> impl Iterator<Item = Angle> + '_ {
        self.values
            .iter()
            .map(move |(name, value)| Angle::new(self.frame, name.clone(), *value))
    }
}

/// 按帧排序的角度日志 (只追加)
#[derive(Debug, Clone, Default)]
pub struct AngleLog {
    frames: Vec<FrameAngles>,
}

impl AngleLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一帧，帧号必须严格递增
    pub fn push(&mut self, angles: FrameAngles) -> Result<()> {
        if let Some(last) = self.frames.last() {
            if angles.frame <= last.frame {
                return Err(AnalysisError::Validation(format!(
                    "angle frame {} does not follow frame {}",
                    angles.frame, last.frame
                )));
            }
        }
        self.frames.push(angles);
        Ok(())
    }

    /// 从任意顺序的角度记录构建
    pub fn from_angles(angles: impl IntoIterator<Item = Angle>) -> Result<Self> {
        let mut angles: Vec<Angle> = angles.into_iter().collect();
        // 稳定排序，保留同帧内的原始顺序
        angles.sort_by_key(|a| a.frame);

        let mut log = Self::new();
        let mut current: Option<FrameAngles> = None;
        for angle in angles {
            match current.as_mut() {
                Some(frame) if frame.frame == angle.frame => frame.insert(angle.name, angle.value),
                _ => {
                    if let Some(done) = current.take() {
                        log.push(done)?;
                    }
                    let mut frame = FrameAngles::new(angle.frame);
                    frame.insert(angle.name, angle.value);
                    current = Some(frame);
                }
            }
        }
        if let Some(done) = current {
            log.push(done)?;
        }
        Ok(log)
    }

    pub fn get(&self, frame: u64) -> Option<&FrameAngles> {
        self.frames
            .binary_search_by_key(&frame, |f| f.frame)
            .ok()
            .map(|idx| &self.frames[idx])
    }

    pub fn frames(&self) -> impl Iterator<Item = &FrameAngles> {
        self.frames.iter()
    }

    /// `[start; finish]` 内已记录的帧
    pub fn range(&self, start: u64, finish: u64) -> impl Iterator<Item = &FrameAngles> {
        let lo = self.frames.partition_point(|f| f.frame < start);
        let hi = self.frames.partition_point(|f| f.frame <= finish);
        self.frames[lo..hi.max(lo)].iter()
    }

    /// `[start; finish]` 内某个角度的时间序列，没有任何样本时返回 None
    pub fn series(&self, name: &str, start: u64, finish: u64) -> Option<Array1<f64>> {
        let values: Vec<f64> = self
            .range(start, finish)
            .filter_map(|f| f.get(name))
            .collect();
        if values.is_empty() {
            None
        } else {
            Some(Array1::from_vec(values))
        }
    }

    /// 出现过的角度名称
    pub fn names(&self) -> BTreeSet<String> {
        self.frames
            .iter()
            .flat_map(|f| f.names().map(str::to_string))
            .collect()
    }

    pub fn frame_numbers(&self) -> Vec<u64> {
        self.frames.iter().map(|f| f.frame).collect()
    }

    pub fn to_angles(&self) -> Vec<Angle> {
        self.frames.iter().flat_map(|f| f.to_angles()).collect()
    }

    /// 角度记录总数
    pub fn angle_count(&self) -> usize {
        self.frames.iter().map(|f| f.len()).sum()
    }

    /// 提取的角度特征数
    pub fn feature_count(&self) -> usize {
        self.angle_count() * ANGLE_PARAMETERS_NUM
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

    fn sample_log() -> AngleLog {
        AngleLog::from_angles(vec![
            Angle::new(0, "knee", 170.0),
            Angle::new(0, "hip", 160.0),
            Angle::new(1, "knee", 150.0),
            Angle::new(3, "knee", 120.0),
            Angle::new(3, "hip", 130.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_series_skips_missing_frames() {
        let log = sample_log();
        let knee = log.series("knee", 0, 3).unwrap();
        assert_eq!(knee.to_vec(), vec![170.0, 150.0, 120.0]);

        let hip = log.series("hip", 0, 3).unwrap();
        assert_eq!(hip.to_vec(), vec![160.0, 130.0]);

        assert!(log.series("elbow", 0, 3).is_none());
        assert!(log.series("knee", 4, 10).is_none());
    }

    #[test]
    fn test_range_and_counts() {
        let log = sample_log();
        let frames: Vec<u64> = log.range(1, 3).map(|f| f.frame).collect();
        assert_eq!(frames, vec![1, 3]);
        assert_eq!(log.angle_count(), 5);
        assert_eq!(log.feature_count(), 15);
        assert_eq!(log.names().len(), 2);
        // 同帧内保持插入顺序
        let names: Vec<&str> = log.get(0).unwrap().names().collect();
        assert_eq!(names, vec!["knee", "hip"]);
    }
}
