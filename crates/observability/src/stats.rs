//! 节拍统计：在线 Welford 统计与运行结束摘要。

use std::collections::BTreeMap;

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    /// 样本数量
    pub fn count(&self) -> u64 {
        self.count
    }

    /// 均值
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// 标准差
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// 最小值
    pub fn min(&self) -> f64 {
        self.min
    }

    /// 最大值
    pub fn max(&self) -> f64 {
        self.max
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 节拍指标聚合器
///
/// 在内存中聚合一个角色的节拍统计，供运行结束时输出摘要。
#[derive(Debug, Clone, Default)]
pub struct TickStatsAggregator {
    /// 角色标签 ("sender" / "receiver")
    pub role: String,

    /// 节拍总数
    pub ticks: u64,

    /// 被吞咽的瞬态故障数
    pub transient_failures: u64,

    /// 流经该角色的样本数（发送端为推送数，接收端为拉取数）
    pub samples: u64,

    /// 节拍唤醒延迟统计 (毫秒)
    pub lag_ms: RunningStats,

    /// 各消费者 写入/失败/丢弃 计数
    pub consumer_counts: BTreeMap<String, (u64, u64, u64)>,
}

impl TickStatsAggregator {
    /// 创建指定角色的聚合器
    pub fn new(role: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            ..Self::default()
        }
    }

    /// 合并一次循环运行的结果
    pub fn record_report(&mut self, ticks: u64, transient_failures: u64, lag_ms: &RunningStats) {
        self.ticks += ticks;
        self.transient_failures += transient_failures;
        // Per-run stats are folded in value-by-value equivalent: count-weighted
        // merge of two Welford accumulators.
        self.merge_lag(lag_ms);
    }

    /// 记录样本吞吐量
    pub fn record_samples(&mut self, samples: u64) {
        self.samples += samples;
    }

    /// 记录一个消费者的最终计数
    pub fn record_consumer(&mut self, name: &str, writes: u64, failures: u64, dropped: u64) {
        let entry = self.consumer_counts.entry(name.to_string()).or_default();
        entry.0 += writes;
        entry.1 += failures;
        entry.2 += dropped;
    }

    fn merge_lag(&mut self, other: &RunningStats) {
        if other.count == 0 {
            return;
        }
        if self.lag_ms.count == 0 {
            self.lag_ms = other.clone();
            return;
        }

        let a = &self.lag_ms;
        let n_a = a.count as f64;
        let n_b = other.count as f64;
        let n = n_a + n_b;
        let delta = other.mean - a.mean;

        self.lag_ms = RunningStats {
            count: a.count + other.count,
            mean: a.mean + delta * (n_b / n),
            m2: a.m2 + other.m2 + delta * delta * (n_a * n_b / n),
            min: a.min.min(other.min),
            max: a.max.max(other.max),
        };
    }

    /// 生成摘要报告
    pub fn summary(&self) -> RelaySummary {
        RelaySummary {
            role: self.role.clone(),
            ticks: self.ticks,
            transient_failures: self.transient_failures,
            samples: self.samples,
            failure_rate: if self.ticks > 0 {
                self.transient_failures as f64 / self.ticks as f64 * 100.0
            } else {
                0.0
            },
            lag_ms: StatsSummary::from(&self.lag_ms),
            consumer_counts: self.consumer_counts.clone(),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::new(std::mem::take(&mut self.role));
    }
}

/// 运行结束摘要
#[derive(Debug, Clone, Default)]
pub struct RelaySummary {
    pub role: String,
    pub ticks: u64,
    pub transient_failures: u64,
    pub samples: u64,
    pub failure_rate: f64,
    pub lag_ms: StatsSummary,
    pub consumer_counts: BTreeMap<String, (u64, u64, u64)>,
}

impl std::fmt::Display for RelaySummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Relay Summary ({}) ===", self.role)?;
        writeln!(f, "Ticks: {}", self.ticks)?;
        writeln!(f, "Samples: {}", self.samples)?;
        writeln!(
            f,
            "Transient failures: {} ({:.2}%)",
            self.transient_failures, self.failure_rate
        )?;
        writeln!(f, "Tick lag (ms): {}", self.lag_ms)?;

        if !self.consumer_counts.is_empty() {
            writeln!(f, "Consumers (writes/failures/dropped):")?;
            for (name, (writes, failures, dropped)) in &self.consumer_counts {
                writeln!(f, "  {name}: {writes}/{failures}/{dropped}")?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            stats.push(v);
        }

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_merged_reports_match_single_pass() {
        let mut left = RunningStats::default();
        let mut right = RunningStats::default();
        let mut whole = RunningStats::default();
        for v in [0.5, 1.5, 2.5] {
            left.push(v);
            whole.push(v);
        }
        for v in [10.0, 20.0] {
            right.push(v);
            whole.push(v);
        }

        let mut agg = TickStatsAggregator::new("sender");
        agg.record_report(3, 0, &left);
        agg.record_report(2, 1, &right);

        assert_eq!(agg.ticks, 5);
        assert_eq!(agg.transient_failures, 1);
        assert_eq!(agg.lag_ms.count(), whole.count());
        assert!((agg.lag_ms.mean() - whole.mean()).abs() < 1e-9);
        assert!((agg.lag_ms.variance() - whole.variance()).abs() < 1e-9);
        assert!((agg.lag_ms.max() - 20.0).abs() < 1e-10);
    }

    #[test]
    fn test_summary_display() {
        let mut agg = TickStatsAggregator::new("receiver");
        let mut lag = RunningStats::default();
        lag.push(0.2);
        lag.push(0.4);
        agg.record_report(100, 5, &lag);
        agg.record_samples(95);
        agg.record_consumer("console", 90, 0, 5);

        let output = agg.summary().to_string();
        assert!(output.contains("Relay Summary (receiver)"));
        assert!(output.contains("Ticks: 100"));
        assert!(output.contains("5.00%"));
        assert!(output.contains("console: 90/0/5"));
    }
}
