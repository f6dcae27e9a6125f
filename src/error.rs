//! 错误类型
//!
//! 逐帧 / 逐片段错误只影响当前帧或片段；配置与参考数据错误在流处理开始前终止运行。

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Invalid geometry input: {0}")]
    Validation(String),
    #[error("Degenerate geometry: zero-length bone at joint {vertex}")]
    DegenerateGeometry { vertex: String },
    #[error("Joint {id} missing in frame {frame}")]
    MissingJoint { frame: u64, id: usize },
    #[error("Joint id {id} out of range (max {max})")]
    JointOutOfRange { id: usize, max: usize },
    #[error("Segment [{start_frame}; {finish_frame}] missing angle '{angle}' at frame {frame}")]
    IncompleteSegment {
        start_frame: u64,
        finish_frame: u64,
        frame: u64,
        angle: String,
    },
    #[error("Reference integrity error: {0}")]
    ReferenceIntegrity(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
