//! 实时进度跟踪
//!
//! 与离线分段相同的进度公式和状态转移，逐帧计算，不保留历史

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

use crate::buffer::FrameAngles;
use crate::core::phase::{PhaseMachine, PhaseTable, RepState, Transition};

/// 每帧处理后的显示状态
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LiveStatus {
    pub frame: u64,
    pub progress: f64,
    pub state: RepState,
    pub repetitions: u32,
}

/// 实时事件
#[derive(Debug, Clone, PartialEq)]
pub enum RepEvent {
    /// 到达某个阶段极值
    PhaseReached { frame: u64, phase: String },
    /// 完成一次重复
    RepCompleted { frame: u64, repetitions: u32 },
}

/// 实时进度跟踪器
pub struct LiveProgressTracker {
    table: PhaseTable,
    machine: PhaseMachine,
    /// 事件发送器
    event_tx: Option<mpsc::UnboundedSender<RepEvent>>,
}

impl LiveProgressTracker {
    pub fn new(table: PhaseTable) -> Self {
        Self {
            table,
            machine: PhaseMachine::new(),
            event_tx: None,
        }
    }

    /// 设置事件通道
    pub fn with_event_channel(mut self, tx: mpsc::UnboundedSender<RepEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// 处理一帧角度
    ///
    /// 缺少阶段角度的帧不改变状态，返回 None。
    pub fn update(&mut self, angles: &FrameAngles) -> Option<LiveStatus> {
        let current = match self.table.current_values(angles) {
            Some(values) => values,
            None => {
                debug!("Frame {}: phase angles incomplete", angles.frame);
                return None;
            }
        };

        match self.machine.step(&self.table, &current) {
            Transition::Departed => self.emit_phase(angles.frame, 1),
            Transition::Advanced { phase } => self.emit_phase(angles.frame, phase),
            Transition::RepCompleted { repetitions } => {
                debug!("Frame {}: repetition {} completed", angles.frame, repetitions);
                self.emit(RepEvent::RepCompleted {
                    frame: angles.frame,
                    repetitions,
                });
            }
            Transition::Stay => {}
        }

        Some(LiveStatus {
            frame: angles.frame,
            progress: self.machine.progress(),
            state: self.machine.state(),
            repetitions: self.machine.repetitions(),
        })
    }

    pub fn progress(&self) -> f64 {
        self.machine.progress()
    }

    pub fn state(&self) -> RepState {
        self.machine.state()
    }

    pub fn repetitions(&self) -> u32 {
        self.machine.repetitions()
    }

    pub fn reset(&mut self) {
        self.machine.reset();
    }

    fn emit_phase(&self, frame: u64, phase: usize) {
        let phase = self.table.phase_name(phase).unwrap_or_default().to_string();
        self.emit(RepEvent::PhaseReached { frame, phase });
    }

    fn emit(&self, event: RepEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::phase::tests::knee_table;

    fn frame(frame: u64, knee: f64) -> FrameAngles {
        let mut angles = FrameAngles::new(frame);
        angles.insert("knee", knee);
        angles
    }

    #[test]
    fn test_live_counts_reps() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut tracker = LiveProgressTracker::new(knee_table()).with_event_channel(tx);

        let values = [170.0, 150.0, 130.0, 110.0, 90.0, 120.0, 150.0, 170.0];
        let mut statuses = Vec::new();
        for (i, v) in values.iter().enumerate() {
            statuses.push(tracker.update(&frame(i as u64, *v)).unwrap());
        }

        assert_eq!(statuses[2].progress, 0.5);
        assert_eq!(statuses[3].state, RepState::Up);
        assert_eq!(statuses[4].state, RepState::Down(1));
        assert_eq!(statuses[6].repetitions, 0);
        assert_eq!(statuses[7].repetitions, 1);
        assert_eq!(tracker.state(), RepState::Up);

        assert_eq!(
            rx.try_recv().unwrap(),
            RepEvent::PhaseReached { frame: 4, phase: "finish".to_string() }
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            RepEvent::RepCompleted { frame: 7, repetitions: 1 }
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_live_skips_incomplete_frame() {
        let mut tracker = LiveProgressTracker::new(knee_table());
        tracker.update(&frame(0, 90.0)).unwrap();

        let empty = FrameAngles::new(1);
        assert!(tracker.update(&empty).is_none());
        assert_eq!(tracker.state(), RepState::Down(1));
        assert_eq!(tracker.progress(), 1.0);

        tracker.reset();
        assert_eq!(tracker.state(), RepState::Up);
        assert_eq!(tracker.repetitions(), 0);
    }
}
