//! cpal 输出后端
//!
//! 把引擎调用契约映射到 cpal：
//! - 引擎实例 = 默认 host + 默认输出设备
//! - mastering voice = 设备默认输出配置（声道/采样率自动探测）
//! - source voice = 绑定 clip 格式的输出流，submit 建流，start 放音
//!
//! cpal 的错误没有数值状态码，这里按调用点映射为小负数，
//! 原始错误文本放进 detail

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, SampleRate, StreamConfig};

use super::clip::AudioClip;
use super::engine::{AudioEngine, EngineCall, EngineError, MasteringVoice, SourceVoice};
use super::format::AudioFormat;

/// 状态码：没有可用的输出设备
pub const STATUS_NO_DEVICE: i32 = -1;
/// 状态码：设备拒绝请求的流配置
pub const STATUS_CONFIG_REJECTED: i32 = -2;
/// 状态码：流操作失败（build/play/pause）
pub const STATUS_STREAM_FAILED: i32 = -3;
/// 状态码：无效的绑定格式
pub const STATUS_BAD_FORMAT: i32 = -4;
/// 状态码：调用顺序错误（未提交就 start 等）
pub const STATUS_BAD_SEQUENCE: i32 = -5;

/// cpal 引擎实例
///
/// 构造即完成平台初始化：拿不到默认输出设备直接失败，
/// 不做重试或候选设备回退
pub struct CpalEngine {
    device: cpal::Device,
}

impl CpalEngine {
    pub fn new() -> Result<Self, EngineError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or_else(|| {
            EngineError::new(
                EngineCall::CreateEngine,
                STATUS_NO_DEVICE,
                "no default output device",
            )
        })?;

        if let Ok(name) = device.name() {
            log::info!("Output device: {}", name);
        }

        Ok(Self { device })
    }
}

/// mastering voice：默认输出设备的网关
///
/// 创建时从设备探测声道数与采样率
pub struct CpalMasteringVoice {
    channels: u16,
    sample_rate: u32,
}

impl MasteringVoice for CpalMasteringVoice {
    fn channels(&self) -> u16 {
        self.channels
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

/// source voice：绑定 clip 格式的输出流
///
/// submit 一次性建流并挂上整个 buffer，start 开始渲染。
/// Drop 即销毁流（引擎侧的 DestroyVoice）
pub struct CpalSourceVoice {
    device: cpal::Device,
    format: AudioFormat,
    stream: Option<cpal::Stream>,
    position: Arc<AtomicUsize>,
    total_samples: usize,
}

impl CpalSourceVoice {
    /// 已提交 buffer 是否渲染完毕
    ///
    /// 仅在 submit 之后有意义
    pub fn is_exhausted(&self) -> bool {
        self.position.load(Ordering::Relaxed) >= self.total_samples
    }
}

impl SourceVoice for CpalSourceVoice {
    fn submit(&mut self, clip: &AudioClip) -> Result<(), EngineError> {
        if self.stream.is_some() {
            return Err(EngineError::new(
                EngineCall::SubmitBuffer,
                STATUS_BAD_SEQUENCE,
                "buffer already submitted",
            ));
        }

        let config = StreamConfig {
            channels: self.format.channels,
            sample_rate: SampleRate(self.format.sample_rate),
            buffer_size: BufferSize::Default,
        };

        // 提交 = 整个 clip 的一份连续拷贝交给渲染回调
        let data: Arc<[u8]> = clip.data().into();
        let format = self.format;
        self.total_samples = format.sample_count(data.len());
        self.position.store(0, Ordering::Relaxed);
        let position = Arc::clone(&self.position);

        let stream = self
            .device
            .build_output_stream(
                &config,
                move |out: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    // 回调内只做批量样本解码，绝不阻塞
                    let start = position.load(Ordering::Relaxed);
                    let filled = format.decode_samples(&data, start, out);
                    for slot in &mut out[filled..] {
                        *slot = 0.0;
                    }
                    position.store(start + filled, Ordering::Relaxed);
                },
                |err| log::warn!("Output stream error: {}", err),
                None,
            )
            .map_err(|e| {
                let status = match e {
                    cpal::BuildStreamError::DeviceNotAvailable => STATUS_NO_DEVICE,
                    cpal::BuildStreamError::StreamConfigNotSupported => STATUS_CONFIG_REJECTED,
                    cpal::BuildStreamError::InvalidArgument => STATUS_BAD_FORMAT,
                    _ => STATUS_STREAM_FAILED,
                };
                EngineError::new(EngineCall::SubmitBuffer, status, e.to_string())
            })?;

        // 部分 host 建流后立即出声，先压住等 start
        stream.pause().map_err(|e| {
            EngineError::new(EngineCall::SubmitBuffer, STATUS_STREAM_FAILED, e.to_string())
        })?;

        self.stream = Some(stream);
        Ok(())
    }

    fn start(&mut self) -> Result<(), EngineError> {
        let stream = self.stream.as_ref().ok_or_else(|| {
            EngineError::new(
                EngineCall::StartVoice,
                STATUS_BAD_SEQUENCE,
                "no buffer submitted",
            )
        })?;

        stream.play().map_err(|e| {
            let status = match e {
                cpal::PlayStreamError::DeviceNotAvailable => STATUS_NO_DEVICE,
                _ => STATUS_STREAM_FAILED,
            };
            EngineError::new(EngineCall::StartVoice, status, e.to_string())
        })
    }

    fn stop(&mut self) -> Result<(), EngineError> {
        // 未建流时视为幂等成功
        if let Some(stream) = self.stream.as_ref() {
            stream.pause().map_err(|e| {
                EngineError::new(EngineCall::StopVoice, STATUS_STREAM_FAILED, e.to_string())
            })?;
        }
        Ok(())
    }
}

impl Drop for CpalSourceVoice {
    fn drop(&mut self) {
        // 流随 take 销毁，恰好一次
        if let Some(stream) = self.stream.take() {
            drop(stream);
            log::debug!("Source voice destroyed");
        }
    }
}

impl AudioEngine for CpalEngine {
    type Mastering = CpalMasteringVoice;
    type Source = CpalSourceVoice;

    fn create_mastering_voice(&mut self) -> Result<Self::Mastering, EngineError> {
        // 声道数与采样率从默认输出配置自动探测
        let config = self.device.default_output_config().map_err(|e| {
            EngineError::new(
                EngineCall::CreateMasteringVoice,
                STATUS_CONFIG_REJECTED,
                e.to_string(),
            )
        })?;

        log::info!(
            "Mastering voice: {}ch @ {}Hz",
            config.channels(),
            config.sample_rate().0
        );

        Ok(CpalMasteringVoice {
            channels: config.channels(),
            sample_rate: config.sample_rate().0,
        })
    }

    fn create_source_voice(
        &mut self,
        _mastering: &Self::Mastering,
        format: &AudioFormat,
    ) -> Result<Self::Source, EngineError> {
        if format.channels == 0 || format.sample_rate == 0 {
            return Err(EngineError::new(
                EngineCall::CreateSourceVoice,
                STATUS_BAD_FORMAT,
                format!(
                    "invalid source format: {}ch @ {}Hz",
                    format.channels, format.sample_rate
                ),
            ));
        }

        Ok(CpalSourceVoice {
            device: self.device.clone(),
            format: *format,
            stream: None,
            position: Arc::new(AtomicUsize::new(0)),
            total_samples: 0,
        })
    }
}

/// 输出设备信息（info 子命令用）
#[derive(Clone, Debug)]
pub struct DeviceInfo {
    pub name: String,
    pub channels: u16,
    pub sample_rate: u32,
    pub is_default: bool,
}

/// 枚举所有输出设备，标记系统默认
pub fn list_output_devices() -> Vec<DeviceInfo> {
    let host = cpal::default_host();
    let default_name = host
        .default_output_device()
        .and_then(|d| d.name().ok());

    let Ok(devices) = host.output_devices() else {
        return Vec::new();
    };

    devices
        .filter_map(|device| {
            let config = device.default_output_config().ok()?;
            let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
            let is_default = default_name.as_deref() == Some(name.as_str());
            Some(DeviceInfo {
                name,
                channels: config.channels(),
                sample_rate: config.sample_rate().0,
                is_default,
            })
        })
        .collect()
}
