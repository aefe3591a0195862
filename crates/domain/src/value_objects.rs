//! 值对象
//!
//! 任务标识、优先级、指标样本、告警与反馈记录

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use mindforge_errors::SchedulerError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 任务ID，创建时分配，重试期间保持不变
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TaskId {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| SchedulerError::validation_error(format!("无效的任务ID '{s}': {e}")))
    }
}

impl From<Uuid> for TaskId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// 任务优先级
///
/// 派生的 `Ord` 让 `High` 排在最前，调度队列直接按它排序。
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    High,
    #[default]
    Medium,
    Low,
}

impl TaskPriority {
    /// 从任务参数中解析优先级，无法识别时回退为 `Medium`
    pub fn from_param(value: Option<&serde_json::Value>) -> Self {
        value
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::High => "high",
            TaskPriority::Medium => "medium",
            TaskPriority::Low => "low",
        }
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskPriority {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(TaskPriority::High),
            "medium" => Ok(TaskPriority::Medium),
            "low" => Ok(TaskPriority::Low),
            other => Err(SchedulerError::invalid_params(format!(
                "未知的任务优先级: {other}"
            ))),
        }
    }
}

/// 单个指标采样点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub name: String,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

impl MetricSample {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Warning,
    Critical,
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertLevel::Warning => write!(f, "warning"),
            AlertLevel::Critical => write!(f, "critical"),
        }
    }
}

/// 阈值告警
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub level: AlertLevel,
    pub message: String,
    pub metric: String,
    pub value: f64,
    pub threshold: f64,
    pub timestamp: DateTime<Utc>,
    pub acknowledged: bool,
}

impl Alert {
    pub fn new(
        level: AlertLevel,
        message: impl Into<String>,
        metric: impl Into<String>,
        value: f64,
        threshold: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            level,
            message: message.into(),
            metric: metric.into(),
            value,
            threshold,
            timestamp: Utc::now(),
            acknowledged: false,
        }
    }
}

/// 反馈评分对应的调整信号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackSignal {
    Reinforcing,
    Neutral,
    Corrective,
}

impl FeedbackSignal {
    /// 4分及以上为正向强化，2分及以下为纠正
    pub fn from_rating(rating: u8) -> Self {
        match rating {
            r if r >= 4 => FeedbackSignal::Reinforcing,
            r if r <= 2 => FeedbackSignal::Corrective,
            _ => FeedbackSignal::Neutral,
        }
    }

    pub fn is_actionable(&self) -> bool {
        !matches!(self, FeedbackSignal::Neutral)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub task_id: TaskId,
    pub feedback: String,
    pub rating: u8,
    pub timestamp: DateTime<Utc>,
}

impl FeedbackRecord {
    pub fn signal(&self) -> FeedbackSignal {
        FeedbackSignal::from_rating(self.rating)
    }
}

/// 指标窗口内的变化趋势
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trend::Increasing => write!(f, "increasing"),
            Trend::Decreasing => write!(f, "decreasing"),
            Trend::Stable => write!(f, "stable"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_priority_ordering() {
        let mut priorities = vec![TaskPriority::Low, TaskPriority::High, TaskPriority::Medium];
        priorities.sort();
        assert_eq!(
            priorities,
            vec![TaskPriority::High, TaskPriority::Medium, TaskPriority::Low]
        );
    }

    #[test]
    fn test_priority_from_param() {
        assert_eq!(
            TaskPriority::from_param(Some(&json!("HIGH"))),
            TaskPriority::High
        );
        assert_eq!(TaskPriority::from_param(Some(&json!("low"))), TaskPriority::Low);
        assert_eq!(
            TaskPriority::from_param(Some(&json!("urgent"))),
            TaskPriority::Medium
        );
        assert_eq!(TaskPriority::from_param(Some(&json!(1))), TaskPriority::Medium);
        assert_eq!(TaskPriority::from_param(None), TaskPriority::Medium);
    }

    #[test]
    fn test_priority_from_str_rejects_unknown() {
        assert!("critical".parse::<TaskPriority>().is_err());
        assert_eq!(" Medium ".parse::<TaskPriority>().unwrap(), TaskPriority::Medium);
    }

    #[test]
    fn test_feedback_signal_from_rating() {
        assert_eq!(FeedbackSignal::from_rating(5), FeedbackSignal::Reinforcing);
        assert_eq!(FeedbackSignal::from_rating(4), FeedbackSignal::Reinforcing);
        assert_eq!(FeedbackSignal::from_rating(3), FeedbackSignal::Neutral);
        assert_eq!(FeedbackSignal::from_rating(2), FeedbackSignal::Corrective);
        assert_eq!(FeedbackSignal::from_rating(1), FeedbackSignal::Corrective);
        assert!(!FeedbackSignal::Neutral.is_actionable());
    }

    #[test]
    fn test_task_id_roundtrip_through_string() {
        let id = TaskId::new();
        let parsed: TaskId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
        assert!("not-a-uuid".parse::<TaskId>().is_err());
    }
}
