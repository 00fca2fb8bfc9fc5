//! 解码模块
//!
//! 包含：
//! - Reader: 媒体读取会话的调用契约
//! - Session: symphonia 真实会话
//! - Fake: 可脚本化的测试会话
//! - `load_clip`: 把一个会话完整读成内存中的 clip

pub mod fake;
pub mod reader;
pub mod session;

pub use reader::{DecodeError, MediaReader, ReadEvent, StreamEncoding, StreamFormat};
pub use session::MediaSession;

use crate::audio::clip::AudioClip;

/// 把整个流解码进内存
///
/// 原生编码不是 PCM 时先请求一次转换，然后循环拉取 chunk
/// 批量追加，直到流结束或流内格式变化（两者同样终止，
/// 不做重新协商）。chunk 顺序与总字节数是这里唯一的可观察契约
pub fn load_clip<R: MediaReader>(reader: &mut R) -> Result<AudioClip, DecodeError> {
    if !reader.stream_format().encoding.is_pcm() {
        reader.request_pcm_output()?;
    }

    let mut clip = AudioClip::new(reader.output_format());

    loop {
        match reader.next_chunk()? {
            ReadEvent::Chunk(bytes) => clip.append(bytes),
            ReadEvent::FormatChanged => {
                log::warn!("Stream format changed mid-read, stopping decode");
                break;
            }
            ReadEvent::EndOfStream => break,
        }
    }

    log::info!(
        "Decoded {} bytes ({:.2}s)",
        clip.len(),
        clip.duration().as_secs_f64()
    );

    Ok(clip)
}

#[cfg(test)]
mod tests {
    use super::fake::{FakeRead, FakeReader};
    use super::*;
    use crate::audio::format::{AudioFormat, SampleKind};

    fn pcm_output() -> AudioFormat {
        AudioFormat::new(48000, 1, SampleKind::I16)
    }

    #[test]
    fn test_chunks_concatenated_in_order() {
        let mut reader = FakeReader::new(StreamEncoding::PcmInteger, pcm_output());
        reader.push_chunk(b"aa");
        reader.push_chunk(b"bb");
        reader.push(FakeRead::EndOfStream);

        let clip = load_clip(&mut reader).unwrap();
        assert_eq!(clip.len(), 4);
        assert_eq!(clip.data(), b"aabb");
    }

    #[test]
    fn test_eos_on_first_read_gives_empty_clip() {
        let mut reader = FakeReader::new(StreamEncoding::PcmInteger, pcm_output());
        reader.push(FakeRead::EndOfStream);

        let clip = load_clip(&mut reader).unwrap();
        assert!(clip.is_empty());
    }

    #[test]
    fn test_conversion_requested_once_for_compressed() {
        let mut reader = FakeReader::new(StreamEncoding::Compressed, pcm_output());
        reader.push_chunk(b"\x00\x00");

        load_clip(&mut reader).unwrap();
        assert_eq!(reader.pcm_requests(), 1);
    }

    #[test]
    fn test_no_conversion_for_pcm_inputs() {
        let mut reader = FakeReader::new(StreamEncoding::PcmInteger, pcm_output());
        reader.push_chunk(b"\x00\x00");
        load_clip(&mut reader).unwrap();
        assert_eq!(reader.pcm_requests(), 0);

        let float_out = AudioFormat::new(48000, 1, SampleKind::F32);
        let mut reader = FakeReader::new(StreamEncoding::PcmFloat, float_out);
        reader.push_chunk(&1.0f32.to_le_bytes());
        load_clip(&mut reader).unwrap();
        assert_eq!(reader.pcm_requests(), 0);
    }

    #[test]
    fn test_format_change_terminates_like_eos() {
        let mut reader = FakeReader::new(StreamEncoding::PcmInteger, pcm_output());
        reader.push_chunk(b"aa");
        reader.push(FakeRead::FormatChanged);
        // 格式变化之后的数据不可达
        reader.push_chunk(b"bb");

        let clip = load_clip(&mut reader).unwrap();
        assert_eq!(clip.data(), b"aa");
    }

    #[test]
    fn test_decode_error_propagates() {
        let mut reader = FakeReader::new(StreamEncoding::PcmInteger, pcm_output());
        reader.push(FakeRead::Error("bad packet".to_string()));

        let err = load_clip(&mut reader).unwrap_err();
        assert!(matches!(err, DecodeError::DecodeFailed(_)));
    }
}
