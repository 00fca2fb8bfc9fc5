//! symphonia 读取会话
//!
//! 把 symphonia 的 probe/decode 管线适配到 [`MediaReader`] 契约：
//! - 打开文件并探测容器，选中首个音频轨道
//! - 原生浮点 PCM 直通为 f32 字节流，其余输出 16-bit PCM
//! - `ResetRequired` 映射为流内格式变化，与 EOF 同样终止读取
//! - 损坏的帧跳过，不中断整个会话

use std::fs::File;
use std::path::Path;

use symphonia::core::audio::RawSampleBuffer;
use symphonia::core::codecs::{
    Decoder, DecoderOptions, CodecType, CODEC_TYPE_NULL, CODEC_TYPE_PCM_F32BE,
    CODEC_TYPE_PCM_F32LE, CODEC_TYPE_PCM_F64BE, CODEC_TYPE_PCM_F64LE, CODEC_TYPE_PCM_S16BE,
    CODEC_TYPE_PCM_S16LE, CODEC_TYPE_PCM_S24BE, CODEC_TYPE_PCM_S24LE, CODEC_TYPE_PCM_S32BE,
    CODEC_TYPE_PCM_S32LE, CODEC_TYPE_PCM_S8, CODEC_TYPE_PCM_U16BE, CODEC_TYPE_PCM_U16LE,
    CODEC_TYPE_PCM_U24BE, CODEC_TYPE_PCM_U24LE, CODEC_TYPE_PCM_U32BE, CODEC_TYPE_PCM_U32LE,
    CODEC_TYPE_PCM_U8,
};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::audio::format::{AudioFormat, SampleKind};

use super::reader::{DecodeError, MediaReader, ReadEvent, StreamEncoding, StreamFormat};

/// 线性整数 PCM 编码
const INT_PCM_CODECS: &[CodecType] = &[
    CODEC_TYPE_PCM_S8,
    CODEC_TYPE_PCM_S16LE,
    CODEC_TYPE_PCM_S16BE,
    CODEC_TYPE_PCM_S24LE,
    CODEC_TYPE_PCM_S24BE,
    CODEC_TYPE_PCM_S32LE,
    CODEC_TYPE_PCM_S32BE,
    CODEC_TYPE_PCM_U8,
    CODEC_TYPE_PCM_U16LE,
    CODEC_TYPE_PCM_U16BE,
    CODEC_TYPE_PCM_U24LE,
    CODEC_TYPE_PCM_U24BE,
    CODEC_TYPE_PCM_U32LE,
    CODEC_TYPE_PCM_U32BE,
];

/// 浮点 PCM 编码
const FLOAT_PCM_CODECS: &[CodecType] = &[
    CODEC_TYPE_PCM_F32LE,
    CODEC_TYPE_PCM_F32BE,
    CODEC_TYPE_PCM_F64LE,
    CODEC_TYPE_PCM_F64BE,
];

fn classify_codec(codec: CodecType) -> StreamEncoding {
    if FLOAT_PCM_CODECS.contains(&codec) {
        StreamEncoding::PcmFloat
    } else if INT_PCM_CODECS.contains(&codec) {
        StreamEncoding::PcmInteger
    } else {
        StreamEncoding::Compressed
    }
}

/// 输出缓冲：按输出编码二选一
enum OutputBuf {
    I16(RawSampleBuffer<i16>),
    F32(RawSampleBuffer<f32>),
}

/// symphonia 媒体读取会话
pub struct MediaSession {
    reader: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    stream_format: StreamFormat,
    /// 输出编码：浮点源直通 f32，其余 16-bit PCM
    output_kind: SampleKind,
    pcm_requested: bool,
    buf: Option<OutputBuf>,
    /// 当前 buf 按多少帧分配
    buf_frames: u64,
}

impl MediaSession {
    /// 打开文件并选中首个音频轨道
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, DecodeError> {
        let path = path.as_ref();

        let file = File::open(path)?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        // 用扩展名提示探测
        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let format_opts = FormatOptions::default();
        let metadata_opts = MetadataOptions::default();

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &format_opts, &metadata_opts)
            .map_err(|_| DecodeError::UnsupportedFormat)?;

        let reader = probed.format;

        // 首个音频轨道
        let track = reader
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or(DecodeError::NoAudioTrack)?;

        let track_id = track.id;
        let codec_params = track.codec_params.clone();

        let sample_rate = codec_params.sample_rate.ok_or(DecodeError::NoAudioTrack)?;
        let channels = codec_params
            .channels
            .map(|c| c.count() as u16)
            .unwrap_or(2);

        let codec_name = symphonia::default::get_codecs()
            .get_codec(codec_params.codec)
            .map(|c| c.short_name.to_string())
            .unwrap_or_else(|| "unknown".to_string());

        let encoding = classify_codec(codec_params.codec);

        let stream_format = StreamFormat {
            encoding,
            sample_rate,
            channels,
            bits_per_sample: codec_params.bits_per_sample,
            codec: codec_name,
        };

        let decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| DecodeError::DecoderCreation(e.to_string()))?;

        // 浮点源直通；其余输出 16-bit PCM
        let output_kind = match encoding {
            StreamEncoding::PcmFloat => SampleKind::F32,
            _ => SampleKind::I16,
        };

        log::info!(
            "Opened stream: codec={} {}ch @ {}Hz ({:?})",
            stream_format.codec,
            channels,
            sample_rate,
            encoding
        );

        Ok(Self {
            reader,
            decoder,
            track_id,
            stream_format,
            output_kind,
            pcm_requested: false,
            buf: None,
            buf_frames: 0,
        })
    }

    /// 确保输出缓冲按当前解码规格分配
    fn ensure_buf(
        buf: &mut Option<OutputBuf>,
        buf_frames: &mut u64,
        output_kind: SampleKind,
        frames: u64,
        spec: symphonia::core::audio::SignalSpec,
    ) {
        if buf.is_some() && frames <= *buf_frames {
            return;
        }
        *buf = Some(match output_kind {
            SampleKind::I16 => OutputBuf::I16(RawSampleBuffer::new(frames, spec)),
            SampleKind::F32 => OutputBuf::F32(RawSampleBuffer::new(frames, spec)),
        });
        *buf_frames = frames;
    }
}

impl MediaReader for MediaSession {
    fn stream_format(&self) -> &StreamFormat {
        &self.stream_format
    }

    fn request_pcm_output(&mut self) -> Result<(), DecodeError> {
        // 压缩源解码后统一产出 16-bit PCM
        self.pcm_requested = true;
        self.output_kind = SampleKind::I16;
        self.buf = None;
        self.buf_frames = 0;
        Ok(())
    }

    fn output_format(&self) -> AudioFormat {
        AudioFormat::new(
            self.stream_format.sample_rate,
            self.stream_format.channels,
            self.output_kind,
        )
    }

    fn next_chunk(&mut self) -> Result<ReadEvent<'_>, DecodeError> {
        loop {
            let packet = match self.reader.next_packet() {
                Ok(p) => p,
                Err(SymphoniaError::ResetRequired) => return Ok(ReadEvent::FormatChanged),
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    return Ok(ReadEvent::EndOfStream);
                }
                Err(e) => return Err(DecodeError::DecodeFailed(e.to_string())),
            };

            // 跳过非目标轨道
            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = match self.decoder.decode(&packet) {
                Ok(d) => d,
                Err(SymphoniaError::ResetRequired) => return Ok(ReadEvent::FormatChanged),
                // 跳过损坏的帧
                Err(SymphoniaError::DecodeError(_)) => continue,
                Err(e) => return Err(DecodeError::DecodeFailed(e.to_string())),
            };

            let spec = *decoded.spec();
            let frames = decoded.capacity() as u64;
            Self::ensure_buf(
                &mut self.buf,
                &mut self.buf_frames,
                self.output_kind,
                frames,
                spec,
            );

            match self.buf.as_mut().unwrap() {
                OutputBuf::I16(buf) => buf.copy_interleaved_ref(decoded),
                OutputBuf::F32(buf) => buf.copy_interleaved_ref(decoded),
            }
            break;
        }

        let bytes = match self.buf.as_ref().unwrap() {
            OutputBuf::I16(buf) => buf.as_bytes(),
            OutputBuf::F32(buf) => buf.as_bytes(),
        };
        Ok(ReadEvent::Chunk(bytes))
    }
}
