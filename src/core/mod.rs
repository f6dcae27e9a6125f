//! 核心分析组件

pub mod geometry;
pub mod phase;
pub mod segmenter;
pub mod tracker;
pub mod reference;
pub mod aligner;
pub mod scorer;
pub mod engine;
