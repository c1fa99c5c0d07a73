//! Bridge relay 指标收集模块
//!
//! 通过 `metrics` facade 记录路由决策、广播、调度 tick 与清扫结果；
//! 未安装 recorder 时所有调用均为空操作。

use metrics::{counter, gauge, histogram};

/// 记录一次路由决策
///
/// `outcome` 为 `forwarded` / `dropped` / `send_failed`，`reason` 为具体原因。
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_route_outcome;
///
/// record_route_outcome("tg", "dropped", "rate_limited");
/// ```
pub fn record_route_outcome(origin: &str, outcome: &str, reason: &str) {
    counter!(
        "bridge_relay_messages_total",
        "origin" => origin.to_string(),
        "outcome" => outcome.to_string(),
        "reason" => reason.to_string()
    )
    .increment(1);
}

/// 记录路由耗时 (含一次 sink 发送)
pub fn record_route_latency_ms(latency_ms: f64) {
    histogram!("bridge_relay_route_latency_ms").record(latency_ms);
}

/// 记录广播到单个平台的结果
pub fn record_broadcast(destination: &str, delivered: bool) {
    let status = if delivered { "success" } else { "failure" };
    counter!(
        "bridge_relay_broadcasts_total",
        "destination" => destination.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// 记录一次调度 tick
pub fn record_tick(job: &str, status: &str, elapsed_ms: f64) {
    counter!(
        "bridge_relay_ticks_total",
        "job" => job.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!("bridge_relay_tick_duration_ms", "job" => job.to_string()).record(elapsed_ms);
}

/// 记录一次 feed 拉取
///
/// `outcome` 为 `new` / `seen` / `filtered` / `primed` / `empty` / `error`。
pub fn record_feed_poll(outcome: &str) {
    counter!(
        "bridge_relay_feed_polls_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// 记录清扫结果
pub fn record_sweep(component: &str, evicted: usize, remaining: usize) {
    if evicted > 0 {
        counter!(
            "bridge_relay_sweep_evicted_total",
            "component" => component.to_string()
        )
        .increment(evicted as u64);
    }

    gauge!(
        "bridge_relay_tracked_entries",
        "component" => component.to_string()
    )
    .set(remaining as f64);
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

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn summary(&self) -> StatsSummary {
        StatsSummary::from(self)
    }
}
