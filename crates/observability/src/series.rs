use std::collections::VecDeque;

use mindforge_domain::{MetricSample, Trend};

/// 趋势判断的相对阈值，相对于窗口首个值的绝对值
const TREND_THRESHOLD_RATIO: f64 = 0.1;

/// 固定容量的指标序列，超出容量时丢弃最旧的样本
#[derive(Debug, Clone)]
pub struct MetricSeries {
    name: String,
    capacity: usize,
    samples: VecDeque<MetricSample>,
}

impl MetricSeries {
    pub fn new(name: impl Into<String>, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            name: name.into(),
            capacity,
            samples: VecDeque::with_capacity(capacity),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn push(&mut self, value: f64) -> MetricSample {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        let sample = MetricSample::new(self.name.clone(), value);
        self.samples.push_back(sample.clone());
        sample
    }

    pub fn latest(&self) -> Option<&MetricSample> {
        self.samples.back()
    }

    /// 最近 `limit` 个样本，按时间先后排列
    pub fn recent(&self, limit: usize) -> Vec<MetricSample> {
        let skip = self.samples.len().saturating_sub(limit);
        self.samples.iter().skip(skip).cloned().collect()
    }

    fn window_values(&self, window: usize) -> Vec<f64> {
        let skip = self.samples.len().saturating_sub(window);
        self.samples.iter().skip(skip).map(|s| s.value).collect()
    }

    pub fn average(&self, window: usize) -> f64 {
        let values = self.window_values(window);
        if values.is_empty() {
            return 0.0;
        }
        values.iter().sum::<f64>() / values.len() as f64
    }

    pub fn trend(&self, window: usize) -> Trend {
        let values = self.window_values(window);
        let (Some(first), Some(last)) = (values.first(), values.last()) else {
            return Trend::Stable;
        };
        if values.len() < 2 {
            return Trend::Stable;
        }

        let threshold = first.abs() * TREND_THRESHOLD_RATIO;
        let delta = last - first;
        if delta > threshold {
            Trend::Increasing
        } else if delta < -threshold {
            Trend::Decreasing
        } else {
            Trend::Stable
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series_with(values: &[f64]) -> MetricSeries {
        let mut series = MetricSeries::new("queue_depth", 100);
        for v in values {
            series.push(*v);
        }
        series
    }

    #[test]
    fn test_eviction_keeps_last_capacity_samples() {
        let mut series = MetricSeries::new("queue_depth", 100);
        for i in 0..150 {
            series.push(i as f64);
        }
        assert_eq!(series.len(), 100);
        let values: Vec<f64> = series.recent(100).iter().map(|s| s.value).collect();
        let expected: Vec<f64> = (50..150).map(|i| i as f64).collect();
        assert_eq!(values, expected);
        assert_eq!(series.latest().map(|s| s.value), Some(149.0));
    }

    #[test]
    fn test_average_over_window() {
        let series = series_with(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(series.average(2), 3.5);
        assert_eq!(series.average(10), 2.5);
        assert_eq!(MetricSeries::new("empty", 10).average(5), 0.0);
    }

    #[test]
    fn test_trend_detection() {
        assert_eq!(series_with(&[10.0, 12.0]).trend(10), Trend::Increasing);
        assert_eq!(series_with(&[10.0, 8.0]).trend(10), Trend::Decreasing);
        assert_eq!(series_with(&[10.0, 10.5]).trend(10), Trend::Stable);
        assert_eq!(series_with(&[10.0]).trend(10), Trend::Stable);
        // 阈值基于首个值的绝对值
        assert_eq!(series_with(&[-10.0, -12.0]).trend(10), Trend::Decreasing);
        assert_eq!(series_with(&[-10.0, -9.5]).trend(10), Trend::Stable);
    }

    #[test]
    fn test_trend_uses_only_window() {
        let series = series_with(&[100.0, 1.0, 1.0, 1.05]);
        assert_eq!(series.trend(4), Trend::Decreasing);
        assert_eq!(series.trend(3), Trend::Stable);
    }
}
