use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use chrono::Utc;
use mindforge_domain::{
    FeedbackRecord, FeedbackSignal, Notification, Notifier, SchedulerError, SchedulerResult,
    TaskId,
};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;

use crate::metrics_collector::MetricsCollector;

const MIN_RATING: u8 = 1;
const MAX_RATING: u8 = 5;
const SUGGESTION_SAMPLE: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackStats {
    pub total: usize,
    pub average: f64,
    /// 评分 1..=5 各自的条数
    pub distribution: BTreeMap<u8, usize>,
}

/// 任务执行反馈记录
pub struct FeedbackRecorder {
    records: RwLock<VecDeque<FeedbackRecord>>,
    capacity: usize,
    notifier: Arc<dyn Notifier>,
    metrics: Arc<MetricsCollector>,
}

impl FeedbackRecorder {
    pub fn new(
        capacity: usize,
        notifier: Arc<dyn Notifier>,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity,
            notifier,
            metrics,
        }
    }

    pub async fn record_feedback(
        &self,
        task_id: TaskId,
        feedback: impl Into<String>,
        rating: u8,
    ) -> SchedulerResult<FeedbackRecord> {
        if !(MIN_RATING..=MAX_RATING).contains(&rating) {
            return Err(SchedulerError::validation_error(format!(
                "评分必须在 {MIN_RATING} 到 {MAX_RATING} 之间, 实际为 {rating}"
            )));
        }

        let record = FeedbackRecord {
            task_id,
            feedback: feedback.into(),
            rating,
            timestamp: Utc::now(),
        };

        {
            let mut records = self.records.write().await;
            if records.len() >= self.capacity {
                records.pop_front();
            }
            records.push_back(record.clone());
        }
        self.metrics.record_feedback();

        let signal = FeedbackSignal::from_rating(rating);
        info!(task.id = %task_id, rating, signal = ?signal, "记录执行反馈");
        if signal.is_actionable() {
            self.notifier
                .notify(Notification::FeedbackSignal {
                    signal,
                    record: record.clone(),
                })
                .await;
        }

        Ok(record)
    }

    pub async fn get_stats(&self) -> FeedbackStats {
        let records = self.records.read().await;
        let mut distribution: BTreeMap<u8, usize> =
            (MIN_RATING..=MAX_RATING).map(|r| (r, 0)).collect();
        let mut sum = 0u64;
        for record in records.iter() {
            *distribution.entry(record.rating).or_default() += 1;
            sum += u64::from(record.rating);
        }

        let total = records.len();
        let average = if total == 0 {
            0.0
        } else {
            sum as f64 / total as f64
        };

        FeedbackStats {
            total,
            average,
            distribution,
        }
    }

    pub async fn recent(&self, limit: usize) -> Vec<FeedbackRecord> {
        let records = self.records.read().await;
        let skip = records.len().saturating_sub(limit);
        records.iter().skip(skip).cloned().collect()
    }

    pub async fn improvement_suggestions(&self) -> Vec<String> {
        let stats = self.get_stats().await;
        let mut suggestions = Vec::new();

        if stats.total > 0 && stats.average < 3.0 {
            suggestions.push("整体表现需要改进，建议回顾失败案例".to_string());
        }

        let records = self.records.read().await;
        let corrective: Vec<&FeedbackRecord> = records
            .iter()
            .filter(|r| r.signal() == FeedbackSignal::Corrective)
            .collect();
        let skip = corrective.len().saturating_sub(SUGGESTION_SAMPLE);
        for record in corrective.into_iter().skip(skip) {
            suggestions.push(format!("从 \"{}\" 中学习", record.feedback));
        }

        suggestions
    }
}
