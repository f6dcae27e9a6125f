//! 重复动作片段

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};

/// 一次重复动作覆盖的连续帧区间 `[start_frame; finish_frame]` (两端都包含)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub rep: u32,
    pub start_frame: u64,
    pub finish_frame: u64,
}

impl Segment {
    /// 创建片段，要求 `rep >= 1` 且 `start_frame < finish_frame`
    pub fn new(rep: u32, start_frame: u64, finish_frame: u64) -> Result<Self> {
        if rep == 0 {
            return Err(AnalysisError::Validation("rep numbers start at 1".to_string()));
        }
        if start_frame >= finish_frame {
            return Err(AnalysisError::Validation(format!(
                "segment start {} must precede finish {}",
                start_frame, finish_frame
            )));
        }
        Ok(Self {
            rep,
            start_frame,
            finish_frame,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_invariants() {
        assert!(Segment::new(1, 3, 10).is_ok());
        assert!(Segment::new(0, 3, 10).is_err());
        assert!(Segment::new(1, 10, 10).is_err());
        assert!(Segment::new(1, 11, 10).is_err());
    }
}
