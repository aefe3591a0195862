pub mod alerting;
pub mod feedback;
pub mod metrics_collector;
pub mod monitor;
pub mod resource;
pub mod series;
pub mod structured_logger;
pub mod telemetry_setup;

pub use alerting::{AlertCondition, AlertRule, LogNotifier};
pub use feedback::{FeedbackRecorder, FeedbackStats};
pub use metrics_collector::MetricsCollector;
pub use monitor::{QueueCounts, SystemMonitor, SystemStatus};
pub use series::MetricSeries;
pub use structured_logger::StructuredLogger;
pub use telemetry_setup::{init_metrics, init_observability, init_structured_logging};
