//! 音频核心模块
//!
//! 包含：
//! - Format: 解码字节流的格式描述与样本解码
//! - Clip: 解码后的音频容器
//! - Engine: 外部引擎的调用契约（trait 接缝）
//! - Output: cpal 真实后端
//! - Fake: 可脚本化的测试后端

pub mod clip;
pub mod engine;
pub mod fake;
pub mod format;
pub mod output;

pub use clip::AudioClip;
pub use engine::{AudioEngine, EngineCall, EngineError, MasteringVoice, SourceVoice};
pub use format::{AudioFormat, SampleKind};
pub use output::CpalEngine;
