//! CSV 表格
//!
//! 关节表 (frame,id,x,y,z)、角度表 (frame,name,value)、片段表与结果表

use std::fs::File;
use std::io::{Error as IoError, ErrorKind};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::buffer::{AngleLog, JointLog, LandmarkFrame};
use crate::error::{AnalysisError, Result};
use crate::models::{Angle, Joint, MistakeResult, Segment};

pub const JOINTS_FILE: &str = "joints.csv";
pub const ANGLES_FILE: &str = "angles.csv";
pub const SEGMENTS_FILE: &str = "segments.csv";
pub const RESULTS_FILE: &str = "results.csv";

fn read_table<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::Reader::from_path(path)?;
    let rows = reader.deserialize().collect::<std::result::Result<Vec<T>, _>>()?;
    debug!("Read {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

fn write_table<T: Serialize>(output_dir: &Path, file_name: &str, rows: &[T]) -> Result<PathBuf> {
    let dir = validate_output(output_dir)?;
    let path = dir.join(file_name);

    let mut writer = csv::Writer::from_writer(File::create(&path)?);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    debug!("Wrote {} rows to {}", rows.len(), path.display());
    Ok(path)
}

/// 检查输出目录，不存在时创建
pub fn validate_output(output_dir: &Path) -> Result<PathBuf> {
    if output_dir.exists() && !output_dir.is_dir() {
        return Err(AnalysisError::Io(IoError::new(
            ErrorKind::InvalidInput,
            format!("output path {} is not a directory", output_dir.display()),
        )));
    }
    std::fs::create_dir_all(output_dir)?;
    Ok(output_dir.to_path_buf())
}

pub fn read_joints(path: &Path) -> Result<Vec<Joint>> {
    read_table(path)
}

pub fn read_angles(path: &Path) -> Result<Vec<Angle>> {
    read_table(path)
}

/// 读取关节表并按帧分组为地标帧
pub fn read_landmarks(path: &Path) -> Result<Vec<LandmarkFrame>> {
    let mut joints = read_joints(path)?;
    joints.sort_by_key(|j| j.frame);

    let mut frames: Vec<LandmarkFrame> = Vec::new();
    for joint in joints {
        match frames.last_mut() {
            Some(last) if last.frame == joint.frame => last.points.push((joint.id, joint.point())),
            _ => frames.push(LandmarkFrame::new(joint.frame, vec![(joint.id, joint.point())])),
        }
    }
    Ok(frames)
}

pub fn write_joints(output_dir: &Path, joints: &JointLog) -> Result<PathBuf> {
    write_table(output_dir, JOINTS_FILE, &joints.to_joints())
}

pub fn write_angles(output_dir: &Path, angles: &AngleLog) -> Result<PathBuf> {
    write_table(output_dir, ANGLES_FILE, &angles.to_angles())
}

pub fn write_segments(output_dir: &Path, segments: &[Segment]) -> Result<PathBuf> {
    write_table(output_dir, SEGMENTS_FILE, segments)
}

pub fn write_results(output_dir: &Path, results: &[MistakeResult]) -> Result<PathBuf> {
    write_table(output_dir, RESULTS_FILE, results)
}
