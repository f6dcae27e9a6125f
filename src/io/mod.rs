//! 表格读写 (CSV)

pub mod tables;

pub use tables::{
    read_angles, read_joints, read_landmarks, validate_output, write_angles, write_joints,
    write_results, write_segments, ANGLES_FILE, JOINTS_FILE, RESULTS_FILE, SEGMENTS_FILE,
};
