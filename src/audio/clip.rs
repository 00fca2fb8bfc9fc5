//! 解码后的音频容器
//!
//! 一次运行只产生一个 clip：由解码循环批量追加字节填充，
//! 整体提交给 source voice 播放后随作用域失效。
//! 不做持久化，不跨消费者共享

use std::time::Duration;

use super::format::AudioFormat;

/// 解码后的音频 clip
///
/// 字节序（chunk 追加顺序）和总长度是解码环节唯一的可观察契约
#[derive(Clone, Debug)]
pub struct AudioClip {
    data: Vec<u8>,
    format: AudioFormat,
}

impl AudioClip {
    /// 创建空 clip
    pub fn new(format: AudioFormat) -> Self {
        Self {
            data: Vec::new(),
            format,
        }
    }

    /// 批量追加一个解码 chunk，保持追加顺序与总长不变
    pub fn append(&mut self, chunk: &[u8]) {
        self.data.extend_from_slice(chunk);
    }

    pub fn format(&self) -> &AudioFormat {
        &self.format
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// 字节长度
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// clip 的播放时长
    pub fn duration(&self) -> Duration {
        self.format.duration_of(self.data.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::format::SampleKind;

    #[test]
    fn test_append_preserves_order_and_length() {
        let mut clip = AudioClip::new(AudioFormat::new(48000, 1, SampleKind::I16));
        assert!(clip.is_empty());

        clip.append(b"aa");
        clip.append(b"bb");

        assert_eq!(clip.len(), 4);
        assert_eq!(clip.data(), b"aabb");
    }

    #[test]
    fn test_duration_from_format() {
        let mut clip = AudioClip::new(AudioFormat::new(48000, 2, SampleKind::I16));
        clip.append(&[0u8; 192000]); // 1 秒
        assert_eq!(clip.duration(), Duration::from_secs(1));
    }
}
