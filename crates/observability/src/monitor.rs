//! 系统监控
//!
//! 维护按名称划分的指标序列，按静态阈值规则产生告警，并汇总调度器队列状态。

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Weak};
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mindforge_config::MonitorConfig;
use mindforge_domain::{
    Alert, MetricSample, MetricsSink, Notification, Notifier, QueueStatus, QueueStatusProvider,
    Trend,
};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;
use uuid::Uuid;

use crate::alerting::AlertRule;
use crate::metrics_collector::MetricsCollector;
use crate::series::MetricSeries;
use crate::structured_logger::StructuredLogger;

/// 健康报告中展示的告警条数上限
const REPORT_ALERT_LIMIT: usize = 5;
const REPORT_TREND_WINDOW: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemStatus {
    pub timestamp: DateTime<Utc>,
    pub uptime_seconds: u64,
    /// 尚未关联调度器时为 `None`
    pub queue: Option<QueueCounts>,
    pub active_alerts: usize,
    pub latest_metrics: BTreeMap<String, f64>,
}

impl SystemStatus {
    pub fn pending_tasks(&self) -> usize {
        self.queue.map(|q| q.pending).unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueCounts {
    pub pending: usize,
    pub running: usize,
    pub completed: usize,
}

impl From<&QueueStatus> for QueueCounts {
    fn from(status: &QueueStatus) -> Self {
        Self {
            pending: status.pending_count,
            running: status.running_count,
            completed: status.completed_count,
        }
    }
}

pub struct SystemMonitor {
    series: RwLock<HashMap<String, Arc<Mutex<MetricSeries>>>>,
    rules: HashMap<String, Vec<AlertRule>>,
    alerts: RwLock<VecDeque<Alert>>,
    metric_capacity: usize,
    alert_capacity: usize,
    queue: RwLock<Option<Weak<dyn QueueStatusProvider>>>,
    notifier: Arc<dyn Notifier>,
    metrics: Arc<MetricsCollector>,
    started_at: Instant,
}

impl SystemMonitor {
    pub fn new(
        config: &MonitorConfig,
        notifier: Arc<dyn Notifier>,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        let mut rules: HashMap<String, Vec<AlertRule>> = HashMap::new();
        for rule in config.alert_rules.iter().map(AlertRule::from) {
            rules.entry(rule.metric.clone()).or_default().push(rule);
        }

        Self {
            series: RwLock::new(HashMap::new()),
            rules,
            alerts: RwLock::new(VecDeque::with_capacity(config.alert_history_size)),
            metric_capacity: config.metric_history_size.max(1),
            alert_capacity: config.alert_history_size.max(1),
            queue: RwLock::new(None),
            notifier,
            metrics,
            started_at: Instant::now(),
        }
    }

    /// 关联调度器队列，只持有弱引用
    pub async fn attach_queue(&self, provider: Weak<dyn QueueStatusProvider>) {
        *self.queue.write().await = Some(provider);
    }

    /// 追加一个样本并按规则检查阈值，返回本次产生的告警
    pub async fn record(&self, name: &str, value: f64) -> Vec<Alert> {
        let series = self.series_for(name).await;
        series.lock().await.push(value);
        self.metrics.set_metric_value(name, value);

        let raised: Vec<Alert> = self
            .rules
            .get(name)
            .map(|rules| rules.iter().filter_map(|r| r.evaluate(value)).collect())
            .unwrap_or_default();
        if raised.is_empty() {
            return raised;
        }

        {
            let mut alerts = self.alerts.write().await;
            for alert in &raised {
                if alerts.len() >= self.alert_capacity {
                    alerts.pop_front();
                }
                alerts.push_back(alert.clone());
            }
        }

        for alert in &raised {
            StructuredLogger::log_alert_raised(alert);
            self.metrics.record_alert();
            self.notifier
                .notify(Notification::AlertRaised(alert.clone()))
                .await;
        }

        raised
    }

    async fn series_for(&self, name: &str) -> Arc<Mutex<MetricSeries>> {
        if let Some(series) = self.series.read().await.get(name) {
            return series.clone();
        }
        let mut map = self.series.write().await;
        map.entry(name.to_string())
            .or_insert_with(|| {
                debug!(metric = name, "创建指标序列");
                Arc::new(Mutex::new(MetricSeries::new(name, self.metric_capacity)))
            })
            .clone()
    }

    async fn get_series(&self, name: &str) -> Option<Arc<Mutex<MetricSeries>>> {
        self.series.read().await.get(name).cloned()
    }

    pub async fn get_average(&self, name: &str, window: usize) -> f64 {
        match self.get_series(name).await {
            Some(series) => series.lock().await.average(window),
            None => 0.0,
        }
    }

    pub async fn get_trend(&self, name: &str, window: usize) -> Trend {
        match self.get_series(name).await {
            Some(series) => series.lock().await.trend(window),
            None => Trend::Stable,
        }
    }

    /// 最近 `limit` 个样本，按时间先后排列
    pub async fn get_metrics(&self, name: &str, limit: usize) -> Vec<MetricSample> {
        match self.get_series(name).await {
            Some(series) => series.lock().await.recent(limit),
            None => Vec::new(),
        }
    }

    pub async fn latest_values(&self) -> BTreeMap<String, f64> {
        let all: Vec<Arc<Mutex<MetricSeries>>> =
            self.series.read().await.values().cloned().collect();

        let mut latest = BTreeMap::new();
        for series in all {
            let series = series.lock().await;
            if let Some(sample) = series.latest() {
                latest.insert(series.name().to_string(), sample.value);
            }
        }
        latest
    }

    pub async fn get_alerts(&self, unacknowledged_only: bool) -> Vec<Alert> {
        self.alerts
            .read()
            .await
            .iter()
            .filter(|a| !unacknowledged_only || !a.acknowledged)
            .cloned()
            .collect()
    }

    /// 重复确认同一告警是安全的，返回告警是否存在
    pub async fn acknowledge_alert(&self, alert_id: Uuid) -> bool {
        let mut alerts = self.alerts.write().await;
        match alerts.iter_mut().find(|a| a.id == alert_id) {
            Some(alert) => {
                alert.acknowledged = true;
                true
            }
            None => false,
        }
    }

    async fn queue_snapshot(&self) -> Option<QueueStatus> {
        let provider = self.queue.read().await.as_ref().and_then(Weak::upgrade)?;
        Some(provider.queue_status().await)
    }

    pub async fn get_system_status(&self) -> SystemStatus {
        // 先取调度器快照，此时不持有任何监控锁
        let queue = self.queue_snapshot().await;
        let active_alerts = self.get_alerts(true).await.len();
        let latest_metrics = self.latest_values().await;

        SystemStatus {
            timestamp: Utc::now(),
            uptime_seconds: self.started_at.elapsed().as_secs(),
            queue: queue.as_ref().map(QueueCounts::from),
            active_alerts,
            latest_metrics,
        }
    }

    pub async fn generate_health_report(&self) -> String {
        let status = self.get_system_status().await;
        let alerts = self.get_alerts(true).await;

        let mut report = format!(
            "🏥 系统健康报告 ({})\n\n",
            status.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
        );
        report.push_str(&format!("⏱️ 运行时间: {} 秒\n\n", status.uptime_seconds));

        if let Some(queue) = status.queue {
            report.push_str("⚡ 任务队列:\n");
            report.push_str(&format!("  • 等待中: {}\n", queue.pending));
            report.push_str(&format!("  • 执行中: {}\n", queue.running));
            report.push_str(&format!("  • 已完成: {}\n\n", queue.completed));
        }

        if !status.latest_metrics.is_empty() {
            report.push_str("📊 最新指标:\n");
            for (name, value) in &status.latest_metrics {
                let trend = self.get_trend(name, REPORT_TREND_WINDOW).await;
                report.push_str(&format!("  • {name}: {value} ({trend})\n"));
            }
            report.push('\n');
        }

        if !alerts.is_empty() {
            report.push_str(&format!("⚠️ 警报 ({}):\n", alerts.len()));
            for alert in alerts.iter().take(REPORT_ALERT_LIMIT) {
                report.push_str(&format!("  [{}] {}\n", alert.level, alert.message));
            }
        }

        report
    }
}

#[async_trait]
impl MetricsSink for SystemMonitor {
    async fn record(&self, name: &str, value: f64) {
        SystemMonitor::record(self, name, value).await;
    }
}
