//! 音频格式和样本解码
//!
//! 解码后的 clip 统一为交错（interleaved）little-endian 字节流，
//! 两种样本编码：
//! - 16-bit 有符号整数 PCM（压缩源解码后的默认目标）
//! - 32-bit 浮点 PCM（浮点源直通）
//!
//! 输出后端消费 f32 帧，这里提供字节 → f32 的批量转换

use std::time::Duration;

/// 样本编码
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SampleKind {
    /// 16-bit 有符号整数 PCM，little-endian
    I16,
    /// 32-bit IEEE 浮点 PCM，little-endian
    F32,
}

impl SampleKind {
    /// 每样本字节数
    #[inline]
    pub fn bytes_per_sample(self) -> usize {
        match self {
            Self::I16 => 2,
            Self::F32 => 4,
        }
    }
}

/// 音频格式
///
/// 描述 clip 内字节流的布局；source voice 必须绑定到
/// 与解码输出完全一致的格式
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub kind: SampleKind,
}

impl AudioFormat {
    pub fn new(sample_rate: u32, channels: u16, kind: SampleKind) -> Self {
        Self {
            sample_rate,
            channels,
            kind,
        }
    }

    /// 每样本字节数
    #[inline]
    pub fn bytes_per_sample(&self) -> usize {
        self.kind.bytes_per_sample()
    }

    /// 每帧字节数（帧 = 各声道各一个样本）
    #[inline]
    pub fn bytes_per_frame(&self) -> usize {
        self.bytes_per_sample() * self.channels as usize
    }

    /// 给定字节数对应的播放时长
    ///
    /// 末尾不足一帧的字节被忽略
    pub fn duration_of(&self, byte_len: usize) -> Duration {
        let bpf = self.bytes_per_frame();
        if bpf == 0 || self.sample_rate == 0 {
            return Duration::ZERO;
        }
        let frames = (byte_len / bpf) as u64;
        Duration::from_nanos(frames * 1_000_000_000 / self.sample_rate as u64)
    }

    /// 字节流中的样本总数
    #[inline]
    pub fn sample_count(&self, byte_len: usize) -> usize {
        byte_len / self.bytes_per_sample()
    }

    /// 将字节流中从 `start_sample` 开始的样本批量解码为 f32
    ///
    /// 填充至多 `out.len()` 个样本，返回实际解码的数量。
    /// 超出字节流末尾的部分不写入（调用方补零/静音）
    pub fn decode_samples(&self, bytes: &[u8], start_sample: usize, out: &mut [f32]) -> usize {
        let bps = self.bytes_per_sample();
        let total = bytes.len() / bps;
        if start_sample >= total {
            return 0;
        }
        let count = out.len().min(total - start_sample);

        match self.kind {
            SampleKind::I16 => {
                for (i, slot) in out[..count].iter_mut().enumerate() {
                    let off = (start_sample + i) * 2;
                    let raw = i16::from_le_bytes([bytes[off], bytes[off + 1]]);
                    // i16 满刻度归一化到 [-1.0, 1.0)
                    *slot = raw as f32 / 32768.0;
                }
            }
            SampleKind::F32 => {
                for (i, slot) in out[..count].iter_mut().enumerate() {
                    let off = (start_sample + i) * 4;
                    *slot = f32::from_le_bytes([
                        bytes[off],
                        bytes[off + 1],
                        bytes[off + 2],
                        bytes[off + 3],
                    ]);
                }
            }
        }

        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_per_frame() {
        let f = AudioFormat::new(48000, 2, SampleKind::I16);
        assert_eq!(f.bytes_per_sample(), 2);
        assert_eq!(f.bytes_per_frame(), 4);

        let f = AudioFormat::new(44100, 1, SampleKind::F32);
        assert_eq!(f.bytes_per_frame(), 4);
    }

    #[test]
    fn test_duration() {
        // 48kHz 立体声 16-bit：1 秒 = 192000 字节
        let f = AudioFormat::new(48000, 2, SampleKind::I16);
        assert_eq!(f.duration_of(192000), Duration::from_secs(1));
        assert_eq!(f.duration_of(0), Duration::ZERO);

        // 不足一帧的尾部忽略
        assert_eq!(f.duration_of(3), Duration::ZERO);
    }

    #[test]
    fn test_decode_i16() {
        let f = AudioFormat::new(48000, 1, SampleKind::I16);

        // +16384, -16384, -32768
        let bytes = [0x00, 0x40, 0x00, 0xC0, 0x00, 0x80];
        let mut out = [0.0f32; 3];
        assert_eq!(f.decode_samples(&bytes, 0, &mut out), 3);
        assert_eq!(out[0], 0.5);
        assert_eq!(out[1], -0.5);
        assert_eq!(out[2], -1.0);
    }

    #[test]
    fn test_decode_f32_passthrough() {
        let f = AudioFormat::new(48000, 1, SampleKind::F32);

        let mut bytes = Vec::new();
        bytes.extend_from_slice(&0.25f32.to_le_bytes());
        bytes.extend_from_slice(&(-1.0f32).to_le_bytes());

        let mut out = [0.0f32; 2];
        assert_eq!(f.decode_samples(&bytes, 0, &mut out), 2);
        assert_eq!(out, [0.25, -1.0]);
    }

    #[test]
    fn test_decode_offset_and_tail() {
        let f = AudioFormat::new(48000, 1, SampleKind::I16);
        let bytes = [0x00, 0x40, 0x00, 0xC0]; // 2 个样本

        // 从第 1 个样本开始，只剩 1 个
        let mut out = [0.0f32; 4];
        assert_eq!(f.decode_samples(&bytes, 1, &mut out), 1);
        assert_eq!(out[0], -0.5);

        // 起点超出末尾
        assert_eq!(f.decode_samples(&bytes, 2, &mut out), 0);
    }
}
