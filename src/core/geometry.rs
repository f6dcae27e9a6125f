//! 关节角度计算
//!
//! 三个 3D 点 A, B, C (B 为顶点) → 夹角 (度)

use std::collections::BTreeMap;

use ndarray::{ArrayView1, aview1};
use tracing::debug;

use crate::buffer::{FrameAngles, JointFrame};
use crate::error::{AnalysisError, Result};
use crate::models::Point3;

/// 骨骼向量长度低于此值视为退化
const MIN_BONE_LENGTH: f64 = 1e-12;

/// 计算顶点 B 处的夹角 (度, 0-180)
///
/// 输入必须都是 3 分量的有限值向量，否则返回 `Validation`；
/// 任一骨骼向量长度为 0 或溢出时返回 `DegenerateGeometry`。
pub fn angle_between(a: ArrayView1<f64>, b: ArrayView1<f64>, c: ArrayView1<f64>) -> Result<f64> {
    if a.len() != 3 || b.len() != 3 || c.len() != 3 {
        return Err(AnalysisError::Validation(format!(
            "input vectors must all have 3 components, got ({}, {}, {})",
            a.len(),
            b.len(),
            c.len()
        )));
    }

    if a.iter().chain(b.iter()).chain(c.iter()).any(|v| !v.is_finite()) {
        return Err(AnalysisError::Validation(format!(
            "non-finite coordinate in ({:?}, {:?}, {:?})",
            a.to_vec(),
            b.to_vec(),
            c.to_vec()
        )));
    }

    let ba = &a - &b;
    let bc = &c - &b;

    let norm_ba = ba.dot(&ba).sqrt();
    let norm_bc = bc.dot(&bc).sqrt();
    let degenerate = || AnalysisError::DegenerateGeometry {
        vertex: format!("{:?}", b.to_vec()),
    };
    let norm = norm_ba * norm_bc;
    if norm_ba < MIN_BONE_LENGTH || norm_bc < MIN_BONE_LENGTH || !norm.is_finite() {
        return Err(degenerate());
    }

    let cosine = ba.dot(&bc) / norm;
    if !cosine.is_finite() {
        return Err(degenerate());
    }
    Ok(cosine.clamp(-1.0, 1.0).acos().to_degrees())
}

/// `angle_between` 的强类型版本
pub fn joint_angle(a: &Point3, b: &Point3, c: &Point3) -> Result<f64> {
    let (a, b, c) = (a.to_array(), b.to_array(), c.to_array());
    angle_between(aview1(&a), aview1(&b), aview1(&c))
}

/// 按配置计算每帧的全部角度
#[derive(Debug, Clone)]
pub struct AngleCalculator {
    /// 角度名称 → (A, B, C) 关节 id
    triplets: BTreeMap<String, [usize; 3]>,
}

impl AngleCalculator {
    pub fn new(triplets: BTreeMap<String, [usize; 3]>) -> Self {
        Self { triplets }
    }

    pub fn angle_names(&self) -> impl Iterator<Item = &str> {
        self.triplets.keys().map(String::as_str)
    }

    /// 计算一帧的角度
    ///
    /// 关节缺失或几何退化只影响对应角度，不影响同帧其他角度。
    pub fn compute_frame(&self, joints: &JointFrame) -> FrameAngles {
        let mut angles = FrameAngles::new(joints.frame);
        for (name, ids) in &self.triplets {
            match Self::compute_one(joints, ids) {
                Ok(value) => angles.insert(name.clone(), value),
                Err(e) => debug!("Frame {}: angle '{}' skipped: {}", joints.frame, name, e),
            }
        }
        angles
    }

    fn compute_one(joints: &JointFrame, ids: &[usize; 3]) -> Result<f64> {
        let a = joints.require(ids[0])?;
        let b = joints.require(ids[1])?;
        let c = joints.require(ids[2])?;
        joint_angle(&a, &b, &c)
    }
}
