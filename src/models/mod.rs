//! 数据模型

pub mod joint;
pub mod angle;
pub mod segment;
pub mod mistake;

pub use joint::{Joint, Point3};
pub use angle::Angle;
pub use segment::Segment;
pub use mistake::{MistakeResult, MistakeRule};
