//! 引擎配置
//!
//! JSON 格式，启动时加载一次并校验；之后只读

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::buffer::{JointSelector, MAX_JOINTS};
use crate::error::{AnalysisError, Result};
use crate::models::MistakeRule;

/// 阶段极值处某个角度的参考值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseAngle {
    pub name: String,
    pub value: f64,
}

/// 一个阶段 (例如 "start" / "finish")，角度顺序即配置顺序
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseConfig {
    pub name: String,
    pub angles: Vec<PhaseAngle>,
}

/// 单个练习的配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseConfig {
    pub phases: Vec<PhaseConfig>,
    #[serde(default)]
    pub mistakes: Vec<MistakeRule>,
}

/// 引擎配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// 角度名称 → 关节 id 三元组 (中间为顶点)
    pub angles: BTreeMap<String, [usize; 3]>,
    /// 关节 id → 名称；命名的关节与角度用到的关节一起被保留
    #[serde(default)]
    pub joints: BTreeMap<usize, String>,
    pub exercises: BTreeMap<String, ExerciseConfig>,
}

impl EngineConfig {
    /// 从 JSON 字符串解析并校验
    pub fn from_json_str(content: &str) -> Result<Self> {
        let mut config: Self = serde_json::from_str(content)?;
        for (exercise, exercise_config) in config.exercises.iter_mut() {
            for rule in exercise_config.mistakes.iter_mut() {
                if rule.exercise.is_empty() {
                    rule.exercise = exercise.clone();
                }
            }
        }
        config.validate()?;
        Ok(config)
    }

    /// 从文件加载
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// 校验配置取值
    pub fn validate(&self) -> Result<()> {
        if self.angles.is_empty() {
            return Err(AnalysisError::Config("angle map must not be empty".to_string()));
        }
        for (name, ids) in &self.angles {
            if let Some(id) = ids.iter().find(|id| **id >= MAX_JOINTS) {
                return Err(AnalysisError::Config(format!(
                    "angle '{}' references joint {} beyond {}",
                    name,
                    id,
                    MAX_JOINTS - 1
                )));
            }
        }

        if let Some(id) = self.joints.keys().find(|id| **id >= MAX_JOINTS) {
            return Err(AnalysisError::Config(format!(
                "joint name given for id {} beyond {}",
                id,
                MAX_JOINTS - 1
            )));
        }

        for (exercise, config) in &self.exercises {
            if config.phases.len() < 2 {
                return Err(AnalysisError::Config(format!(
                    "exercise '{}' needs at least 2 phases, got {}",
                    exercise,
                    config.phases.len()
                )));
            }

            let first = &config.phases[0];
            if first.angles.is_empty() {
                return Err(AnalysisError::Config(format!(
                    "exercise '{}' phase '{}' lists no angles",
                    exercise, first.name
                )));
            }
            let names: Vec<&str> = first.angles.iter().map(|a| a.name.as_str()).collect();

            for phase in &config.phases {
                let phase_names: Vec<&str> = phase.angles.iter().map(|a| a.name.as_str()).collect();
                if phase_names != names {
                    return Err(AnalysisError::Config(format!(
                        "exercise '{}' phase '{}' must list angles {:?}, got {:?}",
                        exercise, phase.name, names, phase_names
                    )));
                }
                if let Some(unknown) = phase_names.iter().find(|n| !self.angles.contains_key(**n)) {
                    return Err(AnalysisError::Config(format!(
                        "exercise '{}' phase '{}' uses unknown angle '{}'",
                        exercise, phase.name, unknown
                    )));
                }
            }

            // 相邻阶段首个角度的跨度不能为 0 (进度的分母)
            for pair in config.phases.windows(2) {
                if pair[0].angles[0].value == pair[1].angles[0].value {
                    return Err(AnalysisError::Config(format!(
                        "exercise '{}' phases '{}' and '{}' share first-angle value {}",
                        exercise, pair[0].name, pair[1].name, pair[0].angles[0].value
                    )));
                }
            }

            for rule in &config.mistakes {
                if !self.angles.contains_key(&rule.angle_name) {
                    return Err(AnalysisError::Config(format!(
                        "mistake '{}' uses unknown angle '{}'",
                        rule.mistake_name, rule.angle_name
                    )));
                }
                if rule.threshold.is_nan() || rule.threshold < 0.0 {
                    return Err(AnalysisError::Config(format!(
                        "mistake '{}' threshold must be >= 0, got {}",
                        rule.mistake_name, rule.threshold
                    )));
                }
            }
        }
        Ok(())
    }

    /// 获取练习配置
    pub fn exercise(&self, name: &str) -> Result<&ExerciseConfig> {
        self.exercises
            .get(name)
            .ok_or_else(|| AnalysisError::Config(format!("unknown exercise '{}'", name)))
    }

    /// 按配置筛选关节：角度三元组用到的 id 加上命名的 id
    pub fn joint_selector(&self) -> JointSelector {
        let ids = self
            .angles
            .values()
            .flatten()
            .copied()
            .chain(self.joints.keys().copied());
        JointSelector::new(ids, self.joints.clone())
    }
}
