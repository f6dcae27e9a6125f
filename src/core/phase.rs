//! 阶段表与重复计数状态机
//!
//! 离线分段与实时进度共用同一套进度公式和状态转移表。
//!
//! 进度 = mean(S[i] - D[i]) / (S[0] - F[0])，截断到 [0, 1]。
//! 分母只取首个角度的跨度，多角度时不做平均。

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::buffer::FrameAngles;
use crate::config::ExerciseConfig;
use crate::error::{AnalysisError, Result};

/// 练习的阶段表：阶段 × 角度 的参考值矩阵
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseTable {
    phase_names: Vec<String>,
    angle_names: Vec<String>,
    /// values[phase][angle]
    values: Vec<Vec<f64>>,
}

impl PhaseTable {
    pub fn from_config(config: &ExerciseConfig) -> Result<Self> {
        let first = config
            .phases
            .first()
            .ok_or_else(|| AnalysisError::Config("phase table is empty".to_string()))?;
        let angle_names: Vec<String> = first.angles.iter().map(|a| a.name.clone()).collect();

        let mut values = Vec::with_capacity(config.phases.len());
        for phase in &config.phases {
            let row: Vec<f64> = angle_names
                .iter()
                .map(|name| {
                    phase
                        .angles
                        .iter()
                        .find(|a| &a.name == name)
                        .map(|a| a.value)
                        .ok_or_else(|| {
                            AnalysisError::Config(format!(
                                "phase '{}' lacks angle '{}'",
                                phase.name, name
                            ))
                        })
                })
                .collect::<Result<_>>()?;
            values.push(row);
        }

        Self::new(
            config.phases.iter().map(|p| p.name.clone()).collect(),
            angle_names,
            values,
        )
    }

    pub fn new(phase_names: Vec<String>, angle_names: Vec<String>, values: Vec<Vec<f64>>) -> Result<Self> {
        if phase_names.len() < 2 || values.len() != phase_names.len() {
            return Err(AnalysisError::Config(format!(
                "need at least 2 phases with values, got {} names and {} rows",
                phase_names.len(),
                values.len()
            )));
        }
        if angle_names.is_empty() || values.iter().any(|row| row.len() != angle_names.len()) {
            return Err(AnalysisError::Config(
                "every phase must list a value for each angle".to_string(),
            ));
        }
        if values.windows(2).any(|pair| pair[0][0] == pair[1][0]) {
            return Err(AnalysisError::Config(
                "adjacent phases must differ on the first angle".to_string(),
            ));
        }
        Ok(Self {
            phase_names,
            angle_names,
            values,
        })
    }

    pub fn phase_count(&self) -> usize {
        self.phase_names.len()
    }

    pub fn phase_name(&self, index: usize) -> Option<&str> {
        self.phase_names.get(index).map(String::as_str)
    }

    pub fn angle_names(&self) -> &[String] {
        &self.angle_names
    }

    /// 当前帧的角度值 (按阶段表顺序)，缺任一角度返回 None
    pub fn current_values(&self, angles: &FrameAngles) -> Option<Vec<f64>> {
        self.angle_names.iter().map(|name| angles.get(name)).collect()
    }

    /// 从阶段 `from` 到阶段 `to` 这一段的进度
    pub fn leg_progress(&self, from: usize, to: usize, current: &[f64]) -> f64 {
        let start = &self.values[from];
        let finish = &self.values[to];

        let reference_span = start[0] - finish[0];
        let mean = start
            .iter()
            .zip(current)
            .map(|(s, d)| s - d)
            .sum::<f64>()
            / start.len() as f64;

        (mean / reference_span).clamp(0.0, 1.0)
    }

    /// 整体进度：从首阶段到第二阶段
    pub fn progress(&self, current: &[f64]) -> f64 {
        self.leg_progress(0, 1, current)
    }
}

/// 重复动作状态
///
/// `Up` 表示处于首阶段；`Down(k)` 表示已到达第 k 个阶段极值 (k >= 1)。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RepState {
    #[default]
    Up,
    Down(usize),
}

impl RepState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down(_) => "down",
        }
    }

    /// 当前所在阶段的下标
    pub fn phase_index(&self) -> usize {
        match self {
            Self::Up => 0,
            Self::Down(k) => *k,
        }
    }
}

impl fmt::Display for RepState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 单帧状态转移结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// 状态未变
    Stay,
    /// 离开首阶段 (Up → Down(1))
    Departed,
    /// 到达下一个中间阶段极值
    Advanced { phase: usize },
    /// 回到首阶段，计数 +1
    RepCompleted { repetitions: u32 },
}

/// 阶段状态机
///
/// 每次转移都要求完整越过对应极值 (进度 >= 1 或 <= 0)，
/// 极值附近的抖动不会重复计数。
#[derive(Debug, Clone)]
pub struct PhaseMachine {
    state: RepState,
    repetitions: u32,
    progress: f64,
}

impl PhaseMachine {
    pub fn new() -> Self {
        Self {
            state: RepState::Up,
            repetitions: 0,
            progress: 0.0,
        }
    }

    pub fn state(&self) -> RepState {
        self.state
    }

    pub fn repetitions(&self) -> u32 {
        self.repetitions
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    /// 用当前帧角度值推进状态机
    pub fn step(&mut self, table: &PhaseTable, current: &[f64]) -> Transition {
        self.progress = table.progress(current);
        let last = table.phase_count() - 1;

        match self.state {
            RepState::Up => {
                if self.progress >= 1.0 {
                    self.state = RepState::Down(1);
                    Transition::Departed
                } else {
                    Transition::Stay
                }
            }
            RepState::Down(k) if k < last => {
                if table.leg_progress(k, k + 1, current) >= 1.0 {
                    self.state = RepState::Down(k + 1);
                    Transition::Advanced { phase: k + 1 }
                } else {
                    Transition::Stay
                }
            }
            RepState::Down(_) => {
                if self.progress <= 0.0 {
                    self.state = RepState::Up;
                    self.repetitions += 1;
                    Transition::RepCompleted {
                        repetitions: self.repetitions,
                    }
                } else {
                    Transition::Stay
                }
            }
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for PhaseMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// 单角度 170° → 90° 的两阶段表
    pub(crate) fn knee_table() -> PhaseTable {
        PhaseTable::new(
            vec!["start".into(), "finish".into()],
            vec!["knee".into()],
            vec![vec![170.0], vec![90.0]],
        )
        .unwrap()
    }

    #[test]
    fn test_progress_monotonic() {
        let table = knee_table();
        let mut last = -1.0;
        for step in 0..=80 {
            let value = 170.0 - step as f64;
            let progress = table.progress(&[value]);
            assert!(progress >= last);
            last = progress;
        }
        assert_eq!(table.progress(&[170.0]), 0.0);
        assert_eq!(table.progress(&[90.0]), 1.0);
        assert_eq!(table.progress(&[130.0]), 0.5);
        // 超出两端时截断
        assert_eq!(table.progress(&[60.0]), 1.0);
        assert_eq!(table.progress(&[175.0]), 0.0);
    }

    #[test]
    fn test_first_angle_span_denominator() {
        // 第二个角度跨度为 40，但分母只用首个角度的 80
        let table = PhaseTable::new(
            vec!["start".into(), "finish".into()],
            vec!["knee".into(), "hip".into()],
            vec![vec![170.0, 160.0], vec![90.0, 120.0]],
        )
        .unwrap();
        // mean(170-130, 160-140) / 80 = 30 / 80
        let progress = table.progress(&[130.0, 140.0]);
        assert!((progress - 0.375).abs() < 1e-12);
    }

    #[test]
    fn test_two_phase_hysteresis() {
        let table = knee_table();
        let mut machine = PhaseMachine::new();

        assert_eq!(machine.step(&table, &[120.0]), Transition::Stay);
        assert_eq!(machine.step(&table, &[90.0]), Transition::Departed);
        assert_eq!(machine.state(), RepState::Down(1));

        // 底部抖动不影响
        assert_eq!(machine.step(&table, &[92.0]), Transition::Stay);
        assert_eq!(machine.step(&table, &[89.0]), Transition::Stay);
        assert_eq!(machine.step(&table, &[169.0]), Transition::Stay);

        assert_eq!(
            machine.step(&table, &[171.0]),
            Transition::RepCompleted { repetitions: 1 }
        );
        assert_eq!(machine.state(), RepState::Up);
        assert_eq!(machine.state().to_string(), "up");

        // 顶部抖动不计数
        assert_eq!(machine.step(&table, &[168.0]), Transition::Stay);
        assert_eq!(machine.step(&table, &[170.0]), Transition::Stay);
        assert_eq!(machine.repetitions(), 1);
    }

    #[test]
    fn test_three_phase_table() {
        let table = PhaseTable::new(
            vec!["start".into(), "bottom".into(), "lockout".into()],
            vec!["knee".into()],
            vec![vec![170.0], vec![90.0], vec![130.0]],
        )
        .unwrap();
        let mut machine = PhaseMachine::new();

        assert_eq!(machine.step(&table, &[90.0]), Transition::Departed);
        // 首阶段进度 <= 0 之前必须先到达最后阶段
        assert_eq!(machine.step(&table, &[110.0]), Transition::Stay);
        assert_eq!(
            machine.step(&table, &[130.0]),
            Transition::Advanced { phase: 2 }
        );
        assert_eq!(machine.state(), RepState::Down(2));
        assert_eq!(
            machine.step(&table, &[170.0]),
            Transition::RepCompleted { repetitions: 1 }
        );
    }

    #[test]
    fn test_rejects_single_phase() {
        assert!(PhaseTable::new(vec!["start".into()], vec!["knee".into()], vec![vec![170.0]]).is_err());
    }
}
