use serde::{Deserialize, Serialize};

use crate::validation::{ConfigValidator, ValidationUtils};

/// 自主驱动器配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AutonomyConfig {
    pub enabled: bool,
    pub tick_interval_ms: u64,
    /// 待处理任务少于该值时才考虑补充目标任务
    pub low_water_mark: usize,
    pub goal_probability: f64,
    pub reflect_probability: f64,
    pub insight_probability: f64,
    pub seed: Option<u64>,
}

impl Default for AutonomyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tick_interval_ms: 5000,
            low_water_mark: 3,
            goal_probability: 0.3,
            reflect_probability: 0.2,
            insight_probability: 0.1,
            seed: None,
        }
    }
}

impl ConfigValidator for AutonomyConfig {
    fn validate(&self) -> crate::ConfigResult<()> {
        ValidationUtils::validate_interval_ms(self.tick_interval_ms, "autonomy.tick_interval_ms")?;
        ValidationUtils::validate_probability(self.goal_probability, "autonomy.goal_probability")?;
        ValidationUtils::validate_probability(
            self.reflect_probability,
            "autonomy.reflect_probability",
        )?;
        ValidationUtils::validate_probability(
            self.insight_probability,
            "autonomy.insight_probability",
        )?;
        Ok(())
    }
}
