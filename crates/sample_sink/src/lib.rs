//! # Sample Sink
//!
//! 接收端适配器：解析流、限时拉取样本并扇出到消费者。
//!
//! 负责：
//! - `resolve_one`：发现超时内无匹配流即为致命 `StreamNotFound`
//! - 每节拍限时拉取一个样本（永不无界阻塞）
//! - 经独立 worker 任务扇出到 log / console / csv 消费者
//!   （非阻塞投递，队列满则丢弃计数，慢消费者不拖累节拍）

pub mod consumers;
mod handle;
mod metrics;
mod resolve;
mod sink;

pub use handle::ConsumerHandle;
pub use metrics::{ConsumerMetrics, ConsumerSnapshot};
pub use resolve::resolve_one;
pub use sink::{SampleSink, SinkTick};
