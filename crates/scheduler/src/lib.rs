//! # Scheduler
//!
//! 周期任务调度模块。
//!
//! 负责：
//! - 按固定间隔执行异步 action，直到显式停止
//! - 单个 tick 失败/panic 隔离，不影响后续 tick
//! - 优雅停止：等待进行中的 tick，超出宽限期则取消
//!
//! ## 使用示例
//!
//! ```ignore
//! use std::time::Duration;
//! use scheduler::{PeriodicScheduler, SchedulerConfig};
//!
//! let config = SchedulerConfig::new(Duration::from_secs(3600))?.with_send_on_start(true);
//! let digest = PeriodicScheduler::new("digest", config, move || async move {
//!     post_digest().await
//! });
//!
//! digest.start();
//! // ...
//! digest.stop().await;
//! ```

mod config;
mod error;
mod periodic;

pub use config::{SchedulerConfig, DEFAULT_GRACE_PERIOD, MIN_INTERVAL};
pub use error::SchedulerError;
pub use periodic::{PeriodicScheduler, SchedulerState};
