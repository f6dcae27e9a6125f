//! 离线重复动作分段
//!
//! 扫描完整的逐帧角度序列，用阶段状态机找出每次重复的帧区间。
//!
//! 区间约定：
//! - `start_frame`：离开首阶段 (Up → Down) 之前最后一个处于静止 (进度 <= 0) 的帧；
//!   若此前没有静止帧，取本轮扫描的第一帧
//! - `finish_frame`：回到首阶段 (Down → Up) 的那一帧，包含在区间内

use tracing::{debug, warn};

use crate::buffer::AngleLog;
use crate::core::phase::{PhaseMachine, PhaseTable, Transition};
use crate::error::{AnalysisError, Result};
use crate::models::Segment;

/// 分段结果
#[derive(Debug, Default)]
pub struct SegmentationOutcome {
    /// 完整的片段，rep 从 1 连续编号
    pub segments: Vec<Segment>,
    /// 因缺少角度数据被丢弃的候选片段
    pub dropped: Vec<AnalysisError>,
    /// 状态机完成的重复次数 (含被丢弃的)
    pub repetitions: u32,
}

/// 重复动作分段器
#[derive(Debug, Clone)]
pub struct RepetitionSegmenter {
    table: PhaseTable,
    /// 片段内每个已记录帧都必须具备的角度
    required_angles: Vec<String>,
}

impl RepetitionSegmenter {
    pub fn new(table: PhaseTable, required_angles: Vec<String>) -> Self {
        Self {
            table,
            required_angles,
        }
    }

    pub fn table(&self) -> &PhaseTable {
        &self.table
    }

    /// 扫描角度日志并输出片段
    ///
    /// 结尾处未回到首阶段的半个动作被丢弃。
    pub fn segment(&self, angles: &AngleLog) -> SegmentationOutcome {
        let mut outcome = SegmentationOutcome::default();
        let mut machine = PhaseMachine::new();

        // 当前一轮 (上次完成之后) 的第一帧与最后静止帧
        let mut scan_start: Option<u64> = None;
        let mut rest_frame: Option<u64> = None;
        let mut candidate_start: Option<u64> = None;

        for frame in angles.frames() {
            let current = match self.table.current_values(frame) {
                Some(values) => values,
                None => {
                    debug!("Frame {}: phase angles incomplete, state unchanged", frame.frame);
                    continue;
                }
            };

            match machine.step(&self.table, &current) {
                Transition::Departed => {
                    let start = rest_frame.or(scan_start).unwrap_or(frame.frame);
                    debug!("Frame {}: down-phase started, candidate start {}", frame.frame, start);
                    candidate_start = Some(start);
                }
                Transition::Advanced { phase } => {
                    debug!(
                        "Frame {}: reached phase '{}'",
                        frame.frame,
                        self.table.phase_name(phase).unwrap_or("?")
                    );
                }
                Transition::RepCompleted { repetitions } => {
                    outcome.repetitions = repetitions;
                    scan_start = None;
                    rest_frame = None;

                    if let Some(start) = candidate_start.take() {
                        let rep = outcome.segments.len() as u32 + 1;
                        match self.build_segment(angles, rep, start, frame.frame) {
                            Ok(segment) => outcome.segments.push(segment),
                            Err(e) => {
                                warn!("Dropping candidate repetition: {}", e);
                                outcome.dropped.push(e);
                            }
                        }
                    }
                    continue;
                }
                Transition::Stay => {}
            }

            if machine.state().phase_index() == 0 {
                scan_start.get_or_insert(frame.frame);
                if machine.progress() <= 0.0 {
                    rest_frame = Some(frame.frame);
                }
            }
        }

        if candidate_start.is_some() {
            debug!("Discarding trailing partial repetition at end of input");
        }

        outcome
    }

    /// 校验候选区间的角度完整性后生成片段
    fn build_segment(&self, angles: &AngleLog, rep: u32, start: u64, finish: u64) -> Result<Segment> {
        for frame in angles.range(start, finish) {
            if let Some(missing) = self
                .required_angles
                .iter()
                .find(|name| frame.get(name).is_none())
            {
                return Err(AnalysisError::IncompleteSegment {
                    start_frame: start,
                    finish_frame: finish,
                    frame: frame.frame,
                    angle: missing.clone(),
                });
            }
        }
        Segment::new(rep, start, finish)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::FrameAngles;
    use crate::core::phase::tests::knee_table;

    fn log_from(values: &[f64]) -> AngleLog {
        let mut log = AngleLog::new();
        for (i, value) in values.iter().enumerate() {
            let mut frame = FrameAngles::new(i as u64);
            frame.insert("knee", *value);
            log.push(frame).unwrap();
        }
        log
    }

    fn segmenter() -> RepetitionSegmenter {
        RepetitionSegmenter::new(knee_table(), vec!["knee".to_string()])
    }

    /// 170° 保持 5 帧，10 帧降到 90°，5 帧回到 170°
    fn squat_ramp() -> Vec<f64> {
        let mut values = vec![170.0; 5];
        values.extend((1..=10).map(|i| 170.0 - 8.0 * i as f64));
        values.extend((1..=5).map(|i| 90.0 + 16.0 * i as f64));
        values
    }

    /// k 次完整动作，叠加小于滞回余量的噪声
    fn cycles(k: usize, noise: f64) -> Vec<f64> {
        let mut values = Vec::new();
        for _ in 0..k {
            values.extend(std::iter::repeat(175.0).take(3));
            values.extend((0..=20).map(|i| 175.0 - 4.5 * i as f64));
            values.extend((0..=20).map(|i| 85.0 + 4.5 * i as f64));
        }
        values
            .iter()
            .enumerate()
            .map(|(i, v)| v + if i % 2 == 0 { noise } else { -noise })
            .collect()
    }

    #[test]
    fn test_single_ramp_one_segment() {
        let outcome = segmenter().segment(&log_from(&squat_ramp()));

        assert_eq!(outcome.repetitions, 1);
        assert_eq!(outcome.segments.len(), 1);
        let segment = outcome.segments[0];
        assert_eq!(segment.rep, 1);
        assert!(segment.start_frame < segment.finish_frame);
    }

    #[test]
    fn test_boundary_contract() {
        // 最后一个 170° 静止帧为 4；帧 14 到达 90°；帧 19 回到 170°
        let outcome = segmenter().segment(&log_from(&squat_ramp()));
        let segment = outcome.segments[0];
        assert_eq!(segment.start_frame, 4);
        assert_eq!(segment.finish_frame, 19);
    }

    #[test]
    fn test_trailing_partial_discarded() {
        let mut values = vec![170.0; 3];
        values.extend((1..=10).map(|i| 170.0 - 8.0 * i as f64));
        values.extend(vec![95.0; 4]);

        let outcome = segmenter().segment(&log_from(&values));
        assert!(outcome.segments.is_empty());
        assert_eq!(outcome.repetitions, 0);
    }

    #[test]
    fn test_k_cycles_with_noise() {
        for k in 1..=4 {
            let outcome = segmenter().segment(&log_from(&cycles(k, 2.0)));
            assert_eq!(outcome.repetitions, k as u32);
            assert_eq!(outcome.segments.len(), k);

            let reps: Vec<u32> = outcome.segments.iter().map(|s| s.rep).collect();
            assert_eq!(reps, (1..=k as u32).collect::<Vec<_>>());
            for pair in outcome.segments.windows(2) {
                assert!(pair[0].finish_frame < pair[1].start_frame);
            }
        }
    }

    #[test]
    fn test_incomplete_segment_dropped() {
        let values = cycles(2, 0.0);
        let mut log = AngleLog::new();
        for (i, value) in values.iter().enumerate() {
            let mut frame = FrameAngles::new(i as u64);
            frame.insert("knee", *value);
            // 第一次动作中间的一帧缺少 hip 角度
            if i != 10 {
                frame.insert("hip", 150.0);
            }
            log.push(frame).unwrap();
        }

        let segmenter = RepetitionSegmenter::new(
            knee_table(),
            vec!["knee".to_string(), "hip".to_string()],
        );
        let outcome = segmenter.segment(&log);

        assert_eq!(outcome.repetitions, 2);
        assert_eq!(outcome.dropped.len(), 1);
        assert!(matches!(
            outcome.dropped[0],
            AnalysisError::IncompleteSegment { frame: 10, .. }
        ));
        // 剩余片段从 1 开始编号
        assert_eq!(outcome.segments.len(), 1);
        assert_eq!(outcome.segments[0].rep, 1);
        assert!(outcome.segments[0].start_frame > 10);
    }

    #[test]
    fn test_skipped_frames_keep_state() {
        // 帧号跳跃 (未检测到姿态的帧不存在)
        let mut log = AngleLog::new();
        for (frame, value) in [(0, 170.0), (3, 130.0), (9, 90.0), (12, 130.0), (20, 170.0)] {
            let mut angles = FrameAngles::new(frame);
            angles.insert("knee", value);
            log.push(angles).unwrap();
        }
        let outcome = segmenter().segment(&log);
        assert_eq!(outcome.segments, vec![Segment::new(1, 0, 20).unwrap()]);
    }
}
