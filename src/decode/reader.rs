//! 媒体读取会话的调用契约
//!
//! 解码本体由外部服务完成，这里只定义播放路径需要的读取面：
//! 选中首个音频流、检查原生格式、必要时请求一次 PCM 转换、
//! 循环拉取解码 chunk 直到流结束或流内格式变化

use thiserror::Error;

use crate::audio::format::AudioFormat;

/// 解码错误
#[derive(Debug, Error)]
pub enum DecodeError {
    /// 文件打开失败
    #[error("failed to open file: {0}")]
    FileOpen(#[from] std::io::Error),
    /// 容器不被识别或格式不支持
    #[error("unsupported audio format")]
    UnsupportedFormat,
    /// 没有找到音频轨道
    #[error("no audio track found")]
    NoAudioTrack,
    /// 解码器创建失败
    #[error("failed to create decoder: {0}")]
    DecoderCreation(String),
    /// 解码失败
    #[error("decode failed: {0}")]
    DecodeFailed(String),
}

/// 流的原生编码分类
///
/// 只区分播放路径关心的三类：整数 PCM、浮点 PCM、其余（压缩）
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamEncoding {
    PcmInteger,
    PcmFloat,
    Compressed,
}

impl StreamEncoding {
    /// 原生编码是否已经是（整数或浮点）PCM
    #[inline]
    pub fn is_pcm(self) -> bool {
        !matches!(self, Self::Compressed)
    }
}

/// 选中音频流的原生格式
#[derive(Clone, Debug)]
pub struct StreamFormat {
    pub encoding: StreamEncoding,
    pub sample_rate: u32,
    pub channels: u16,
    /// 原始位深（容器未声明时为 None）
    pub bits_per_sample: Option<u32>,
    /// 编解码器名称
    pub codec: String,
}

/// 一次读取的结果
///
/// FormatChanged 与 EndOfStream 对读取循环的含义相同：终止。
/// 流内格式变化不做重新协商
#[derive(Debug, PartialEq, Eq)]
pub enum ReadEvent<'a> {
    /// 一个解码 chunk（交错字节）
    Chunk(&'a [u8]),
    /// 流内格式变化
    FormatChanged,
    /// 流结束
    EndOfStream,
}

/// 媒体读取会话
///
/// 每次运行打开一个会话，限定在首个音频流上
pub trait MediaReader {
    /// 选中流的原生格式
    fn stream_format(&self) -> &StreamFormat;

    /// 请求把输出转换为 PCM
    ///
    /// 仅当原生编码不是 PCM 时由读取循环调用，且恰好一次，
    /// 必须发生在任何 next_chunk 之前
    fn request_pcm_output(&mut self) -> Result<(), DecodeError>;

    /// 实际产出字节流的格式
    fn output_format(&self) -> AudioFormat;

    /// 拉取下一个解码 chunk
    fn next_chunk(&mut self) -> Result<ReadEvent<'_>, DecodeError>;
}
