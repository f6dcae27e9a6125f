//! 偏差评分
//!
//! 对每条错误规则取对齐后的 (实时, 参考) 序列，偏差 = 实时 - 参考，
//! 聚合为最大绝对偏差；超过阈值即输出一条结果。

use std::sync::Arc;
use std::thread;

use parking_lot::RwLock;
use tracing::{debug, error};

use crate::core::aligner::AlignedPair;
use crate::models::{MistakeResult, MistakeRule};

/// 结果收集器
///
/// 线程安全，克隆后共享同一份结果；只追加，不修改已有结果。
pub struct ResultsSink {
    results: Arc<RwLock<Vec<MistakeResult>>>,
}

impl ResultsSink {
    pub fn new() -> Self {
        Self {
            results: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn extend(&self, results: impl IntoIterator<Item = MistakeResult>) {
        self.results.write().extend(results);
    }

    /// 当前结果快照
    pub fn snapshot(&self) -> Vec<MistakeResult> {
        self.results.read().clone()
    }

    pub fn len(&self) -> usize {
        self.results.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.read().is_empty()
    }
}

impl Clone for ResultsSink {
    fn clone(&self) -> Self {
        Self {
            results: Arc::clone(&self.results),
        }
    }
}

impl Default for ResultsSink {
    fn default() -> Self {
        Self::new()
    }
}

/// 最大绝对偏差
pub fn peak_deviation(pair: &AlignedPair) -> f64 {
    (&pair.live - &pair.reference)
        .iter()
        .fold(0.0_f64, |peak, d| peak.max(d.abs()))
}

/// 偏差评分器
#[derive(Debug, Clone, Default)]
pub struct DeviationScorer {
    rules: Vec<MistakeRule>,
}

impl DeviationScorer {
    pub fn new(rules: Vec<MistakeRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[MistakeRule] {
        &self.rules
    }

    /// 评估单条规则
    pub fn evaluate(rule: &MistakeRule, rep: u32, pairs: &[AlignedPair]) -> Option<MistakeResult> {
        let pair = match pairs.iter().find(|p| p.angle_name == rule.angle_name) {
            Some(pair) => pair,
            None => {
                debug!("Rep {}: no aligned data for '{}', rule '{}' skipped", rep, rule.angle_name, rule.mistake_name);
                return None;
            }
        };

        let deviation = peak_deviation(pair);
        if deviation > rule.threshold {
            Some(MistakeResult {
                rep,
                mistake_name: rule.mistake_name.clone(),
                fix_info: rule.fix_info.clone(),
                measured_deviation: deviation,
            })
        } else {
            None
        }
    }

    /// 并行评估全部规则，按规则顺序汇总
    pub fn score(&self, rep: u32, pairs: &[AlignedPair]) -> Vec<MistakeResult> {
        thread::scope(|scope| {
            let handles: Vec<_> = self
                .rules
                .iter()
                .map(|rule| scope.spawn(move || Self::evaluate(rule, rep, pairs)))
                .collect();

            handles
                .into_iter()
                .filter_map(|handle| match handle.join() {
                    Ok(result) => result,
                    Err(_) => {
                        error!("Rep {}: rule evaluation panicked", rep);
                        None
                    }
                })
                .collect()
        })
    }

    /// 评估并写入结果收集器，返回新增数量
    pub fn score_into(&self, rep: u32, pairs: &[AlignedPair], sink: &ResultsSink) -> usize {
        let results = self.score(rep, pairs);
        let count = results.len();
        sink.extend(results);
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn rule(name: &str, angle: &str, threshold: f64) -> MistakeRule {
        MistakeRule {
            exercise: "squat".to_string(),
            mistake_name: name.to_string(),
            fix_info: format!("fix {}", name),
            angle_name: angle.to_string(),
            threshold,
        }
    }

    fn pairs() -> Vec<AlignedPair> {
        vec![
            AlignedPair {
                angle_name: "left_knee".to_string(),
                live: array![170.0, 120.0, 100.0, 170.0],
                reference: array![170.0, 130.0, 90.0, 170.0],
            },
            AlignedPair {
                angle_name: "hip".to_string(),
                live: array![160.0, 140.0, 150.0],
                reference: array![160.0, 140.0, 120.0],
            },
        ]
    }

    #[test]
    fn test_peak_deviation_is_max_abs() {
        assert_eq!(peak_deviation(&pairs()[0]), 10.0);
        assert_eq!(peak_deviation(&pairs()[1]), 30.0);
    }

    #[test]
    fn test_rules_independent() {
        let scorer = DeviationScorer::new(vec![
            rule("knee_strict", "left_knee", 5.0),
            rule("knee_loose", "left_knee", 10.0),
            rule("hip_lean", "hip", 20.0),
            rule("elbow", "elbow", 0.0),
        ]);
        let results = scorer.score(3, &pairs());

        // 阈值为严格大于
        let names: Vec<&str> = results.iter().map(|r| r.mistake_name.as_str()).collect();
        assert_eq!(names, vec!["knee_strict", "hip_lean"]);
        assert!(results.iter().all(|r| r.rep == 3));
        assert_eq!(results[1].measured_deviation, 30.0);
        assert_eq!(results[1].fix_info, "fix hip_lean");
    }

    #[test]
    fn test_identical_series_no_results() {
        let pair = AlignedPair {
            angle_name: "left_knee".to_string(),
            live: array![170.0, 90.0, 170.0],
            reference: array![170.0, 90.0, 170.0],
        };
        let scorer = DeviationScorer::new(vec![rule("any", "left_knee", 1e-9)]);
        assert!(scorer.score(1, &[pair]).is_empty());
    }

    #[test]
    fn test_sink_shared_between_clones() {
        let sink = ResultsSink::new();
        let writer = sink.clone();
        let scorer = DeviationScorer::new(vec![rule("hip_lean", "hip", 1.0)]);

        assert_eq!(scorer.score_into(1, &pairs(), &writer), 1);
        assert_eq!(scorer.score_into(2, &pairs(), &writer), 1);
        assert_eq!(sink.len(), 2);
        assert_eq!(sink.snapshot()[1].rep, 2);
    }
}
