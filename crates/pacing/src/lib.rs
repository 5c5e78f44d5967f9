//! # Pacing
//!
//! 固定速率节拍循环（绝对截止时刻，不累积漂移）。
//!
//! 负责：
//! - 算术截止序列 `d_k = start + k * interval`
//! - 瞬态故障吞咽与连续失败升级
//! - 停止信号的及时响应
//!
//! ## 使用示例
//!
//! ```ignore
//! use pacing::{PacingLoop, TickAction};
//!
//! let pacer = PacingLoop::new("sender", interval, 5);
//! let report = pacer.run(&mut action, stop_rx).await?;
//! println!("{} ticks, {} transient failures", report.ticks, report.transient_failures);
//! ```

mod pacer;
mod ticker;

pub use pacer::{PacingAbort, PacingLoop, PacingReport};
pub use ticker::Ticker;

use contracts::Result;

/// One unit of per-tick work driven by [`PacingLoop`]
///
/// Implementations do bounded work per call: one sample emitted, or one
/// sample pulled and fanned out.
#[trait_variant::make(TickAction: Send)]
pub trait LocalTickAction {
    /// Stream name used in logs and error escalation
    fn stream(&self) -> &str;

    /// Perform the work for tick `tick`
    ///
    /// Transient errors are swallowed by the loop (up to the consecutive
    /// failure threshold); any other error terminates it.
    async fn tick(&mut self, tick: u64) -> Result<()>;
}
