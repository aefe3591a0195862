use mindforge_domain::AlertLevel;
use serde::{Deserialize, Serialize};

use crate::validation::{ConfigValidator, ValidationUtils};
use crate::ConfigError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdCondition {
    GreaterThan,
    LessThan,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlertRuleConfig {
    pub metric: String,
    pub condition: ThresholdCondition,
    pub threshold: f64,
    pub level: AlertLevel,
}

impl AlertRuleConfig {
    pub fn new(
        metric: impl Into<String>,
        condition: ThresholdCondition,
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
}

impl ConfigValidator for AlertRuleConfig {
    fn validate(&self) -> crate::ConfigResult<()> {
        ValidationUtils::validate_not_empty(&self.metric, "monitor.alert_rules.metric")?;
        if !self.threshold.is_finite() {
            return Err(ConfigError::Validation(format!(
                "threshold for metric '{}' must be finite",
                self.metric
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MonitorConfig {
    pub metric_history_size: usize,
    pub alert_history_size: usize,
    pub health_report_interval_seconds: u64,
    pub alert_rules: Vec<AlertRuleConfig>,
}

impl MonitorConfig {
    pub fn default_alert_rules() -> Vec<AlertRuleConfig> {
        vec![
            AlertRuleConfig::new(
                "queue_depth",
                ThresholdCondition::GreaterThan,
                10.0,
                AlertLevel::Warning,
            ),
            AlertRuleConfig::new(
                "memory_mb",
                ThresholdCondition::GreaterThan,
                100.0,
                AlertLevel::Warning,
            ),
            AlertRuleConfig::new(
                "task_failures",
                ThresholdCondition::GreaterThan,
                10.0,
                AlertLevel::Critical,
            ),
        ]
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            metric_history_size: 100,
            alert_history_size: 50,
            health_report_interval_seconds: 60,
            alert_rules: Self::default_alert_rules(),
        }
    }
}

impl ConfigValidator for MonitorConfig {
    fn validate(&self) -> crate::ConfigResult<()> {
        ValidationUtils::validate_count(self.metric_history_size, "monitor.metric_history_size")?;
        ValidationUtils::validate_count(self.alert_history_size, "monitor.alert_history_size")?;
        for rule in &self.alert_rules {
            rule.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FeedbackConfig {
    pub history_size: usize,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self { history_size: 100 }
    }
}

impl ConfigValidator for FeedbackConfig {
    fn validate(&self) -> crate::ConfigResult<()> {
        ValidationUtils::validate_count(self.history_size, "feedback.history_size")
    }
}
