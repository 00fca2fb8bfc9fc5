//! 可脚本化的 fake 读取会话
//!
//! 按脚本逐条返回读取事件，并统计 PCM 转换请求次数，
//! 用于验证读取循环的终止条件与转换请求契约

use std::collections::VecDeque;

use crate::audio::format::AudioFormat;

use super::reader::{DecodeError, MediaReader, ReadEvent, StreamEncoding, StreamFormat};

/// 脚本条目
#[derive(Clone, Debug)]
pub enum FakeRead {
    Chunk(Vec<u8>),
    FormatChanged,
    EndOfStream,
    /// 下一次读取返回解码错误
    Error(String),
}

/// fake 读取会话
pub struct FakeReader {
    stream_format: StreamFormat,
    output: AudioFormat,
    script: VecDeque<FakeRead>,
    pcm_requests: usize,
    reads_started: bool,
    /// 正在外借的 chunk
    current: Vec<u8>,
}

impl FakeReader {
    pub fn new(encoding: StreamEncoding, output: AudioFormat) -> Self {
        Self {
            stream_format: StreamFormat {
                encoding,
                sample_rate: output.sample_rate,
                channels: output.channels,
                bits_per_sample: None,
                codec: "fake".to_string(),
            },
            output,
            script: VecDeque::new(),
            pcm_requests: 0,
            reads_started: false,
            current: Vec::new(),
        }
    }

    /// 追加一条脚本
    pub fn push(&mut self, read: FakeRead) -> &mut Self {
        self.script.push_back(read);
        self
    }

    pub fn push_chunk(&mut self, bytes: &[u8]) -> &mut Self {
        self.push(FakeRead::Chunk(bytes.to_vec()))
    }

    /// PCM 转换被请求的次数
    pub fn pcm_requests(&self) -> usize {
        self.pcm_requests
    }
}

impl MediaReader for FakeReader {
    fn stream_format(&self) -> &StreamFormat {
        &self.stream_format
    }

    fn request_pcm_output(&mut self) -> Result<(), DecodeError> {
        // 契约：必须发生在任何读取之前
        assert!(
            !self.reads_started,
            "pcm conversion requested after reads started"
        );
        self.pcm_requests += 1;
        Ok(())
    }

    fn output_format(&self) -> AudioFormat {
        self.output
    }

    fn next_chunk(&mut self) -> Result<ReadEvent<'_>, DecodeError> {
        self.reads_started = true;
        match self.script.pop_front() {
            Some(FakeRead::Chunk(bytes)) => {
                self.current = bytes;
                Ok(ReadEvent::Chunk(&self.current))
            }
            Some(FakeRead::FormatChanged) => Ok(ReadEvent::FormatChanged),
            Some(FakeRead::EndOfStream) | None => Ok(ReadEvent::EndOfStream),
            Some(FakeRead::Error(msg)) => Err(DecodeError::DecodeFailed(msg)),
        }
    }
}
