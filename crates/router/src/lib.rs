//! # Router
//!
//! 消息路由模块。
//!
//! 负责：
//! - 接收来自任一平台的 `BridgeMessage`
//! - 防回环、限流、去重后转发到对端平台
//! - 定时广播 (统计摘要等) 同时推送到两个平台
//! - 失败隔离：sink 错误只记录，不向监听方传播

pub mod error;
pub mod format;
pub mod metrics;
pub mod outcome;
pub mod penalty;
pub mod router;
pub mod sinks;

pub use contracts::{BridgeMessage, MessageSink, Platform};
pub use error::RouterError;
pub use metrics::{RouterMetrics, RouterMetricsSnapshot};
pub use outcome::{
    BroadcastOutcome, BroadcastPost, Delivery, DropReason, RouteOutcome, SendFailure, SweepReport,
};
pub use penalty::{LogPenaltyHook, PenaltyHook};
pub use router::{BridgeRouter, RouterBuilder};
pub use router::DEFAULT_SEND_TIMEOUT;
pub use sinks::{ChannelSink, DynMessageSink, LogSink, OutboundMessage, SharedSink};
