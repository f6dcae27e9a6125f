//! 动作错误规则与结果

use serde::{Deserialize, Serialize};

/// 错误规则：某个角度与参考动作的偏差超过阈值时给出反馈
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MistakeRule {
    /// 配置文件中可省略，加载时由所属练习补全
    #[serde(default)]
    pub exercise: String,
    pub mistake_name: String,
    pub fix_info: String,
    pub angle_name: String,
    pub threshold: f64,
}

/// 一个 (片段, 触发规则) 对应一条结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MistakeResult {
    pub rep: u32,
    pub mistake_name: String,
    pub fix_info: String,
    pub measured_deviation: f64,
}
