//! 外部音频引擎的调用契约
//!
//! 引擎本体（设备枚举、格式协商、混音、调度）完全由外部提供，
//! 这里只定义播放一个 clip 所需的最小调用面：
//!
//!   创建引擎 → 创建 mastering voice → 创建 source voice
//!   → 提交 buffer → start → 反序释放
//!
//! 所有失败都折叠为带调用点和状态码的 [`EngineError`]，
//! 由调用方显式传播；句柄是 RAII 包装，任何退出路径上
//! 每个句柄恰好释放一次

use std::fmt;

use thiserror::Error;

use super::clip::AudioClip;
use super::format::AudioFormat;

/// 引擎调用点
///
/// 每个外部调用各占一个判别值，失败时随错误一起上报
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EngineCall {
    CreateEngine,
    CreateMasteringVoice,
    CreateSourceVoice,
    SubmitBuffer,
    StartVoice,
    StopVoice,
}

impl fmt::Display for EngineCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CreateEngine => "create-engine",
            Self::CreateMasteringVoice => "create-mastering-voice",
            Self::CreateSourceVoice => "create-source-voice",
            Self::SubmitBuffer => "submit-buffer",
            Self::StartVoice => "start-voice",
            Self::StopVoice => "stop-voice",
        };
        f.write_str(name)
    }
}

/// 引擎调用失败
///
/// `status` 是后端映射出的数值状态码，`detail` 携带底层错误文本
#[derive(Clone, Debug, Error)]
#[error("engine call {call} failed (status {status}): {detail}")]
pub struct EngineError {
    pub call: EngineCall,
    pub status: i32,
    pub detail: String,
}

impl EngineError {
    pub fn new(call: EngineCall, status: i32, detail: impl Into<String>) -> Self {
        Self {
            call,
            status,
            detail: detail.into(),
        }
    }
}

/// 输出端 voice：设备网关
///
/// 声道数和采样率由后端从默认输出设备自动探测
pub trait MasteringVoice {
    fn channels(&self) -> u16;
    fn sample_rate(&self) -> u32;
}

/// 播放端 voice：接受调用方提交的 buffer
///
/// 调用顺序固定：submit 一次，然后 start。
/// start 立即返回，渲染发生在引擎内部线程；
/// 句柄 Drop 即销毁 voice
pub trait SourceVoice {
    /// 提交整个 clip 作为一个连续 buffer
    fn submit(&mut self, clip: &AudioClip) -> Result<(), EngineError>;

    /// 开始播放
    fn start(&mut self) -> Result<(), EngineError>;

    /// 停止播放（清场用，幂等）
    fn stop(&mut self) -> Result<(), EngineError>;
}

/// 音频引擎实例
///
/// 平台初始化和引擎创建折叠在后端构造函数里完成，
/// 因此拿到实现即处于可用状态
pub trait AudioEngine {
    type Mastering: MasteringVoice;
    type Source: SourceVoice;

    /// 创建 mastering voice（参数自动探测）
    fn create_mastering_voice(&mut self) -> Result<Self::Mastering, EngineError>;

    /// 创建绑定到指定格式的 source voice
    fn create_source_voice(
        &mut self,
        mastering: &Self::Mastering,
        format: &AudioFormat,
    ) -> Result<Self::Source, EngineError>;
}
