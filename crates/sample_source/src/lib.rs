//! # Sample Source
//!
//! 发送端适配器：合成测试信号并逐样本推入出口流。
//!
//! 负责：
//! - 本地形状校验（通道数不匹配立即失败，不触碰传输层）
//! - 测试信号合成（设备通道随机，其余通道为节拍计数器）
//! - 作为 [`pacing::TickAction`] 接入节拍循环

mod source;
mod synth;

pub use source::{SampleSource, SourceTick};
pub use synth::{SampleSynth, TestPatternSynth};
