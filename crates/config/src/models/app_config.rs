use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{
    autonomy::AutonomyConfig,
    logging::ObservabilityConfig,
    monitor::{FeedbackConfig, MonitorConfig},
    scheduler::SchedulerConfig,
};
use crate::validation::ConfigValidator;

pub const ENV_PREFIX: &str = "MINDFORGE";

const DEFAULT_CONFIG_PATHS: [&str; 2] = ["config/mindforge.toml", "mindforge.toml"];

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub scheduler: SchedulerConfig,
    pub monitor: MonitorConfig,
    pub feedback: FeedbackConfig,
    pub autonomy: AutonomyConfig,
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// 加载顺序：配置文件 → `MINDFORGE_*` 环境变量，最后统一校验
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = config_path {
            if Path::new(path).exists() {
                builder = builder.add_source(File::new(path, FileFormat::Toml));
            } else {
                return Err(anyhow::anyhow!("配置文件不存在: {}", path));
            }
        } else if let Some(path) = DEFAULT_CONFIG_PATHS
            .iter()
            .find(|path| Path::new(path).exists())
        {
            builder = builder.add_source(File::new(path, FileFormat::Toml));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: AppConfig = builder
            .build()
            .context("构建配置失败")?
            .try_deserialize()
            .context("反序列化配置失败")?;

        config.validate()?;

        Ok(config)
    }

    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(toml_str).context("解析TOML配置失败")?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("序列化配置为TOML失败")
    }
}

impl ConfigValidator for AppConfig {
    fn validate(&self) -> crate::ConfigResult<()> {
        self.scheduler.validate()?;
        self.monitor.validate()?;
        self.feedback.validate()?;
        self.autonomy.validate()?;
        self.observability.validate()?;
        Ok(())
    }
}
