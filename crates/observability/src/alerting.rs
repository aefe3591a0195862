use async_trait::async_trait;
use mindforge_config::{AlertRuleConfig, ThresholdCondition};
use mindforge_domain::{Alert, AlertLevel, Notification, Notifier};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertCondition {
    GreaterThan,
    LessThan,
}

impl AlertCondition {
    pub fn check(&self, current: f64, threshold: f64) -> bool {
        match self {
            AlertCondition::GreaterThan => current > threshold,
            AlertCondition::LessThan => current < threshold,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            AlertCondition::GreaterThan => ">",
            AlertCondition::LessThan => "<",
        }
    }
}

impl From<ThresholdCondition> for AlertCondition {
    fn from(condition: ThresholdCondition) -> Self {
        match condition {
            ThresholdCondition::GreaterThan => AlertCondition::GreaterThan,
            ThresholdCondition::LessThan => AlertCondition::LessThan,
        }
    }
}

/// 静态阈值规则，每次越界都会产生一条告警
#[derive(Debug, Clone)]
pub struct AlertRule {
    pub metric: String,
    pub condition: AlertCondition,
    pub threshold: f64,
    pub level: AlertLevel,
}

impl AlertRule {
    pub fn new(
        metric: impl Into<String>,
        condition: AlertCondition,
        threshold: f64,
        level: AlertLevel,
    ) -> Self {
        Self {
            metric: metric.into(),
            condition,
            threshold,
            level,
        }
    }

    pub fn evaluate(&self, value: f64) -> Option<Alert> {
        if !self.condition.check(value, self.threshold) {
            return None;
        }
        Some(Alert::new(
            self.level,
            self.format_message(value),
            self.metric.clone(),
            value,
            self.threshold,
        ))
    }

    fn format_message(&self, value: f64) -> String {
        match self.metric.as_str() {
            "queue_depth" => format!("任务队列较长: {value} 个任务"),
            "memory_mb" => format!("内存使用较高: {value}MB"),
            "task_failures" => format!("任务失败次数过多: {value}"),
            _ => format!(
                "{} {} {} (阈值: {})",
                self.metric,
                self.condition.symbol(),
                value,
                self.threshold
            ),
        }
    }
}

impl From<&AlertRuleConfig> for AlertRule {
    fn from(config: &AlertRuleConfig) -> Self {
        Self::new(
            config.metric.clone(),
            config.condition.into(),
            config.threshold,
            config.level,
        )
    }
}

/// 把通知写入日志的协作方实现
pub struct LogNotifier {
    name: String,
}

impl LogNotifier {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for LogNotifier {
    fn default() -> Self {
        Self::new("log")
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: Notification) {
        match &notification {
            Notification::TaskCompleted(task) => info!(
                channel = %self.name,
                task.id = %task.id,
                task.type = %task.task_type,
                "任务完成: {}",
                task.description
            ),
            Notification::TaskFailed(task) => warn!(
                channel = %self.name,
                task.id = %task.id,
                task.type = %task.task_type,
                error = task.error.as_deref().unwrap_or_default(),
                "任务失败: {}",
                task.description
            ),
            Notification::AlertRaised(alert) => warn!(
                channel = %self.name,
                alert.id = %alert.id,
                alert.level = %alert.level,
                "系统{}: {}",
                alert.level,
                alert.message
            ),
            Notification::FeedbackSignal { signal, record } => info!(
                channel = %self.name,
                task.id = %record.task_id,
                rating = record.rating,
                signal = ?signal,
                "收到反馈信号"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_condition_check() {
        assert!(AlertCondition::GreaterThan.check(11.0, 10.0));
        assert!(!AlertCondition::GreaterThan.check(10.0, 10.0));
        assert!(AlertCondition::LessThan.check(0.5, 1.0));
        assert!(!AlertCondition::LessThan.check(1.0, 1.0));
    }

    #[test]
    fn test_rule_evaluation() {
        let rule = AlertRule::new(
            "queue_depth",
            AlertCondition::GreaterThan,
            10.0,
            AlertLevel::Warning,
        );
        assert!(rule.evaluate(10.0).is_none());

        let alert = rule.evaluate(12.0).unwrap();
        assert_eq!(alert.metric, "queue_depth");
        assert_eq!(alert.level, AlertLevel::Warning);
        assert_eq!(alert.value, 12.0);
        assert_eq!(alert.threshold, 10.0);
        assert!(!alert.acknowledged);
        assert_eq!(alert.message, "任务队列较长: 12 个任务");
    }

    #[test]
    fn test_rule_from_config() {
        let config = AlertRuleConfig::new(
            "latency_ms",
            ThresholdCondition::LessThan,
            1.0,
            AlertLevel::Critical,
        );
        let rule = AlertRule::from(&config);
        assert_eq!(rule.condition, AlertCondition::LessThan);
        let alert = rule.evaluate(0.0).unwrap();
        assert_eq!(alert.message, "latency_ms < 0 (阈值: 1)");
    }
}
