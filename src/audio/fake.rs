//! 可脚本化的 fake 引擎
//!
//! 与真实后端实现同一套调用契约，用于在没有音频设备的环境里
//! 验证调用顺序、提交内容和释放次数：
//! - 按调用点注入失败（返回指定状态码）
//! - 记录完整调用日志，包括 voice 的销毁事件

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::clip::AudioClip;
use super::engine::{AudioEngine, EngineCall, EngineError, MasteringVoice, SourceVoice};
use super::format::AudioFormat;

/// 日志里的一条引擎调用记录
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FakeCall {
    CreateMasteringVoice,
    CreateSourceVoice { channels: u16, sample_rate: u32 },
    SubmitBuffer { bytes: Vec<u8> },
    StartVoice,
    StopVoice,
    DestroyMasteringVoice,
    DestroySourceVoice,
}

struct Shared {
    calls: Mutex<Vec<FakeCall>>,
    failures: Mutex<HashMap<EngineCall, i32>>,
}

impl Shared {
    fn record(&self, call: FakeCall) {
        self.calls.lock().unwrap().push(call);
    }

    /// 该调用点是否脚本化了失败
    fn check(&self, call: EngineCall) -> Result<(), EngineError> {
        if let Some(&status) = self.failures.lock().unwrap().get(&call) {
            return Err(EngineError::new(call, status, "scripted failure"));
        }
        Ok(())
    }
}

/// 测试侧探针：引擎移交给 Player 后仍可注入失败、读取日志
#[derive(Clone)]
pub struct FakeProbe {
    shared: Arc<Shared>,
}

impl FakeProbe {
    /// 让指定调用点返回失败
    pub fn fail_on(&self, call: EngineCall, status: i32) {
        self.shared.failures.lock().unwrap().insert(call, status);
    }

    /// 当前调用日志的快照
    pub fn calls(&self) -> Vec<FakeCall> {
        self.shared.calls.lock().unwrap().clone()
    }

    /// 统计某类调用出现的次数
    pub fn count(&self, pred: impl Fn(&FakeCall) -> bool) -> usize {
        self.shared.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }
}

/// fake 引擎实例
pub struct FakeEngine {
    shared: Arc<Shared>,
    /// mastering voice 上报的探测参数
    pub device_channels: u16,
    pub device_sample_rate: u32,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                calls: Mutex::new(Vec::new()),
                failures: Mutex::new(HashMap::new()),
            }),
            device_channels: 2,
            device_sample_rate: 48000,
        }
    }

    pub fn probe(&self) -> FakeProbe {
        FakeProbe {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl Default for FakeEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// fake mastering voice；Drop 时记录销毁
pub struct FakeMasteringVoice {
    shared: Arc<Shared>,
    channels: u16,
    sample_rate: u32,
}

impl MasteringVoice for FakeMasteringVoice {
    fn channels(&self) -> u16 {
        self.channels
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

impl Drop for FakeMasteringVoice {
    fn drop(&mut self) {
        self.shared.record(FakeCall::DestroyMasteringVoice);
    }
}

/// fake source voice；记录提交的字节内容
pub struct FakeSourceVoice {
    shared: Arc<Shared>,
}

impl SourceVoice for FakeSourceVoice {
    fn submit(&mut self, clip: &AudioClip) -> Result<(), EngineError> {
        self.shared.record(FakeCall::SubmitBuffer {
            bytes: clip.data().to_vec(),
        });
        self.shared.check(EngineCall::SubmitBuffer)
    }

    fn start(&mut self) -> Result<(), EngineError> {
        self.shared.record(FakeCall::StartVoice);
        self.shared.check(EngineCall::StartVoice)
    }

    fn stop(&mut self) -> Result<(), EngineError> {
        self.shared.record(FakeCall::StopVoice);
        self.shared.check(EngineCall::StopVoice)
    }
}

impl Drop for FakeSourceVoice {
    fn drop(&mut self) {
        self.shared.record(FakeCall::DestroySourceVoice);
    }
}

impl AudioEngine for FakeEngine {
    type Mastering = FakeMasteringVoice;
    type Source = FakeSourceVoice;

    fn create_mastering_voice(&mut self) -> Result<Self::Mastering, EngineError> {
        self.shared.record(FakeCall::CreateMasteringVoice);
        self.shared.check(EngineCall::CreateMasteringVoice)?;
        Ok(FakeMasteringVoice {
            shared: Arc::clone(&self.shared),
            channels: self.device_channels,
            sample_rate: self.device_sample_rate,
        })
    }

    fn create_source_voice(
        &mut self,
        _mastering: &Self::Mastering,
        format: &AudioFormat,
    ) -> Result<Self::Source, EngineError> {
        self.shared.record(FakeCall::CreateSourceVoice {
            channels: format.channels,
            sample_rate: format.sample_rate,
        });
        self.shared.check(EngineCall::CreateSourceVoice)?;
        Ok(FakeSourceVoice {
            shared: Arc::clone(&self.shared),
        })
    }
}
