use std::net::SocketAddr;

use anyhow::{Context, Result};
use mindforge_config::{LogFormat, ObservabilityConfig};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// `RUST_LOG` 优先于配置文件中的日志级别
pub fn init_structured_logging(config: &ObservabilityConfig) -> Result<()> {
    let level = config.log_level.to_string();
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&level));

    let registry = tracing_subscriber::registry().with(env_filter);

    let initialized = match config.log_format {
        LogFormat::Json => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .with_thread_ids(true);

            registry.with(fmt_layer).try_init()
        }
        LogFormat::Pretty => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .pretty()
                .with_file(true)
                .with_line_number(true);

            registry.with(fmt_layer).try_init()
        }
        LogFormat::Compact => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .compact()
                .with_target(false);

            registry.with(fmt_layer).try_init()
        }
    };
    initialized.context("初始化日志系统失败")?;

    info!(
        logging.format = ?config.log_format,
        logging.level = %level,
        "Structured logging initialized"
    );

    Ok(())
}

/// 安装 Prometheus recorder 并启动 HTTP 导出端点，需要在 tokio 运行时中调用
pub fn init_metrics(listen_address: &str) -> Result<()> {
    let addr: SocketAddr = listen_address
        .parse()
        .with_context(|| format!("无效的指标监听地址: {listen_address}"))?;

    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("Failed to install Prometheus exporter: {}", e))?;

    info!(address = %addr, "Prometheus metrics exporter started");
    Ok(())
}

pub fn init_observability(config: &ObservabilityConfig) -> Result<()> {
    init_structured_logging(config)?;
    if config.metrics_enabled {
        init_metrics(&config.metrics_listen_address)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_metrics_rejects_bad_address() {
        assert!(init_metrics("not an address").is_err());
    }
}
