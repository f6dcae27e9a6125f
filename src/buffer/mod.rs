//! 帧缓冲与日志

pub mod frame;
pub mod joints;
pub mod angles;

pub use frame::{JointFrame, JointSelector, LandmarkFrame, MAX_JOINTS};
pub use joints::JointLog;
pub use angles::{AngleLog, FrameAngles};
