//! 关节 (地标点)

use serde::{Deserialize, Serialize};

/// 3D 点 (世界坐标，任意单位)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

impl From<[f64; 3]> for Point3 {
    fn from(v: [f64; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

/// 单帧中检测到的一个关节
///
/// 创建后不可变，按帧顺序追加到 `JointLog`。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Joint {
    pub frame: u64,
    pub id: usize,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Joint {
    pub fn new(frame: u64, id: usize, point: Point3) -> Self {
        Self {
            frame,
            id,
            x: point.x,
            y: point.y,
            z: point.z,
        }
    }

    pub fn point(&self) -> Point3 {
        Point3::new(self.x, self.y, self.z)
    }
}
