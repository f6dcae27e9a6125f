//! 关节角度

use serde::{Deserialize, Serialize};

/// 某一帧的一个命名角度 (度, 0-180)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Angle {
    pub frame: u64,
    pub name: String,
    pub value: f64,
}

impl Angle {
    pub fn new(frame: u64, name: impl Into<String>, value: f64) -> Self {
        Self {
            frame,
            name: name.into(),
            value,
        }
    }
}
