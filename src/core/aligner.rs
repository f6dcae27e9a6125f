//! 片段对齐
//!
//! 按归一化时间位置把一条序列重采样到另一条的长度：
//! 目标位置 j → p = j / (N - 1)，取源序列下标 round(p · (M - 1)) 的样本。

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::buffer::AngleLog;
use crate::core::reference::ReferenceSegment;
use crate::models::Segment;

/// 以哪一侧的时间轴为准
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignTarget {
    /// 实时片段重采样到参考长度
    #[default]
    Reference,
    /// 参考片段重采样到实时长度
    Live,
}

impl std::str::FromStr for AlignTarget {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "reference" => Ok(Self::Reference),
            "live" => Ok(Self::Live),
            other => Err(format!("unknown align target '{}' (expected reference or live)", other)),
        }
    }
}

/// 同一角度对齐后的两条等长序列
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedPair {
    pub angle_name: String,
    pub live: Array1<f64>,
    pub reference: Array1<f64>,
}

impl AlignedPair {
    pub fn len(&self) -> usize {
        self.reference.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reference.is_empty()
    }
}

/// 把 `source` 按比例重采样为 `target_len` 个样本
pub fn resample(source: &Array1<f64>, target_len: usize) -> Array1<f64> {
    if source.is_empty() || target_len == 0 {
        return Array1::zeros(0);
    }
    let last = (source.len() - 1) as f64;
    Array1::from_shape_fn(target_len, |j| {
        let position = if target_len == 1 {
            0.0
        } else {
            j as f64 / (target_len - 1) as f64
        };
        source[(position * last).round() as usize]
    })
}

/// 片段对齐器
#[derive(Debug, Clone, Copy, Default)]
pub struct SegmentAligner {
    target: AlignTarget,
}

impl SegmentAligner {
    pub fn new(target: AlignTarget) -> Self {
        Self { target }
    }

    /// 对齐实时片段与参考片段中两侧都有的角度
    pub fn align(&self, live: &AngleLog, segment: &Segment, reference: &ReferenceSegment) -> Vec<AlignedPair> {
        let reference_names = reference.angles.names();
        let live_names = live.names();

        let mut pairs = Vec::new();
        for name in reference_names.union(&live_names) {
            let live_series = live.series(name, segment.start_frame, segment.finish_frame);
            let reference_series = reference.angles.series(
                name,
                reference.segment.start_frame,
                reference.segment.finish_frame,
            );

            match (live_series, reference_series) {
                (Some(live_series), Some(reference_series)) => {
                    pairs.push(self.align_series(name, &live_series, &reference_series));
                }
                _ => debug!("Rep {}: angle '{}' not present on both sides, skipped", segment.rep, name),
            }
        }
        pairs
    }

    /// 对齐单个角度的两条序列
    pub fn align_series(&self, name: &str, live: &Array1<f64>, reference: &Array1<f64>) -> AlignedPair {
        let (live, reference) = match self.target {
            AlignTarget::Reference => (resample(live, reference.len()), reference.clone()),
            AlignTarget::Live => (live.clone(), resample(reference, live.len())),
        };
        AlignedPair {
            angle_name: name.to_string(),
            live,
            reference,
        }
    }
}
