//! 播放运行编排
//!
//! 一次运行是一条严格线性的调用序列：
//!
//!   解码整个文件进内存 → 创建 mastering voice → 创建 source voice
//!   → 提交 buffer → start → 固定等待 → 反序释放
//!
//! 任何一步失败立即中止本次运行并向上传播错误，不重试、
//! 不回退设备；已创建的 voice 句柄由 RAII 保证在所有退出
//! 路径上恰好释放一次，顺序与创建相反

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::audio::clip::AudioClip;
use crate::audio::engine::{AudioEngine, EngineError, MasteringVoice, SourceVoice};
use crate::decode::{self, DecodeError, MediaReader, MediaSession};

/// 一次运行的状态
///
/// 迁移严格线性；失败时停留在最后到达的状态，
/// 但资源释放仍然保证（见模块文档）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// 引擎尚未创建（后端构造完成前）
    Uninitialized,
    EngineReady,
    DecodeReady,
    Decoded,
    VoiceReady,
    Playing,
    Stopped,
}

/// 运行错误
#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
    /// 解码产物为空：拒绝提交空 buffer
    #[error("decoded clip is empty, refusing to submit")]
    EmptyClip,
}

/// 等待检查间隔
const WAIT_SLICE: Duration = Duration::from_millis(50);

/// 播放器
///
/// 持有引擎实例，按运行状态机播放单个 clip
pub struct Player<E: AudioEngine> {
    engine: E,
    state: RunState,
    stop_flag: Arc<AtomicBool>,
    /// clip 时长之外的固定尾部余量
    tail_pad: Duration,
}

impl<E: AudioEngine> Player<E> {
    /// 创建播放器；引擎已构造完成，直接进入 EngineReady
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            state: RunState::EngineReady,
            stop_flag: Arc::new(AtomicBool::new(false)),
            tail_pad: Duration::from_millis(250),
        }
    }

    /// 调整尾部余量（测试里设为零）
    pub fn with_tail_pad(mut self, pad: Duration) -> Self {
        self.tail_pad = pad;
        self
    }

    /// 当前运行状态
    pub fn state(&self) -> RunState {
        self.state
    }

    /// 取外部中断句柄（Ctrl+C 处理器置位即提前结束等待）
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop_flag)
    }

    /// 打开文件并完整跑一次运行
    pub fn play_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), PlayerError> {
        let path = path.as_ref();
        log::info!("Loading: {}", path.display());

        let mut reader = MediaSession::open(path)?;
        self.run(&mut reader)
    }

    /// 用任意读取会话跑一次运行：解码到内存，然后播放
    pub fn run<R: MediaReader>(&mut self, reader: &mut R) -> Result<(), PlayerError> {
        self.state = RunState::DecodeReady;
        let clip = decode::load_clip(reader)?;
        self.state = RunState::Decoded;

        self.play_clip(&clip)
    }

    /// 播放一个已解码的 clip
    ///
    /// 整个 buffer 一次性提交；空 clip 在任何引擎调用之前拒绝
    pub fn play_clip(&mut self, clip: &AudioClip) -> Result<(), PlayerError> {
        if clip.is_empty() {
            return Err(PlayerError::EmptyClip);
        }

        // 创建顺序：mastering → source；局部变量反序 Drop
        // 正好是要求的反创建序释放
        let mastering = self.engine.create_mastering_voice()?;
        log::debug!(
            "Mastering voice ready: {}ch @ {}Hz",
            mastering.channels(),
            mastering.sample_rate()
        );

        let mut source = self.engine.create_source_voice(&mastering, clip.format())?;
        self.state = RunState::VoiceReady;

        source.submit(clip)?;
        source.start()?;
        self.state = RunState::Playing;

        log::info!("Playing ({:.2}s)", clip.duration().as_secs_f64());
        self.wait(clip.duration() + self.tail_pad);

        source.stop()?;
        self.state = RunState::Stopped;
        log::info!("Playback stopped");

        Ok(())
    }

    /// 固定等待：按 clip 时长推算，切片睡眠以便响应中断
    fn wait(&self, total: Duration) {
        let deadline = Instant::now() + total;
        while Instant::now() < deadline {
            if self.stop_flag.load(Ordering::Acquire) {
                log::info!("Playback interrupted");
                break;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            thread::sleep(remaining.min(WAIT_SLICE));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::engine::EngineCall;
    use crate::audio::fake::{FakeCall, FakeEngine};
    use crate::audio::format::{AudioFormat, SampleKind};
    use crate::decode::fake::{FakeRead, FakeReader};
    use crate::decode::StreamEncoding;

    fn player_with_probe() -> (Player<FakeEngine>, crate::audio::fake::FakeProbe) {
        let engine = FakeEngine::new();
        let probe = engine.probe();
        let player = Player::new(engine).with_tail_pad(Duration::ZERO);
        (player, probe)
    }

    fn reader_with_chunks(chunks: &[&[u8]]) -> FakeReader {
        let output = AudioFormat::new(48000, 1, SampleKind::I16);
        let mut reader = FakeReader::new(StreamEncoding::PcmInteger, output);
        for c in chunks {
            reader.push_chunk(c);
        }
        reader.push(FakeRead::EndOfStream);
        reader
    }

    #[test]
    fn test_full_run_call_sequence() {
        let (mut player, probe) = player_with_probe();
        let mut reader = reader_with_chunks(&[b"aa", b"bb"]);

        player.run(&mut reader).unwrap();
        assert_eq!(player.state(), RunState::Stopped);

        // 2 个 chunk → 4 字节按序合并，整体提交恰好一次
        assert_eq!(
            probe.calls(),
            vec![
                FakeCall::CreateMasteringVoice,
                FakeCall::CreateSourceVoice {
                    channels: 1,
                    sample_rate: 48000
                },
                FakeCall::SubmitBuffer {
                    bytes: b"aabb".to_vec()
                },
                FakeCall::StartVoice,
                FakeCall::StopVoice,
                FakeCall::DestroySourceVoice,
                FakeCall::DestroyMasteringVoice,
            ]
        );
    }

    #[test]
    fn test_empty_clip_rejected_before_any_engine_call() {
        let (mut player, probe) = player_with_probe();
        let mut reader = reader_with_chunks(&[]);

        let err = player.run(&mut reader).unwrap_err();
        assert!(matches!(err, PlayerError::EmptyClip));
        assert!(probe.calls().is_empty());
    }

    #[test]
    fn test_mastering_failure_stops_run_immediately() {
        let (mut player, probe) = player_with_probe();
        probe.fail_on(EngineCall::CreateMasteringVoice, -7);

        let mut reader = reader_with_chunks(&[b"aa"]);
        let err = player.run(&mut reader).unwrap_err();

        match err {
            PlayerError::Engine(e) => {
                assert_eq!(e.call, EngineCall::CreateMasteringVoice);
                assert_eq!(e.status, -7);
            }
            other => panic!("unexpected error: {other}"),
        }
        // 失败之后没有任何后续引擎调用
        assert_eq!(probe.calls(), vec![FakeCall::CreateMasteringVoice]);
    }

    #[test]
    fn test_source_voice_failure_releases_mastering_once() {
        let (mut player, probe) = player_with_probe();
        probe.fail_on(EngineCall::CreateSourceVoice, -2);

        let mut reader = reader_with_chunks(&[b"aa"]);
        player.run(&mut reader).unwrap_err();

        let calls = probe.calls();
        // 没有提交、没有启动
        assert_eq!(
            probe.count(|c| matches!(c, FakeCall::SubmitBuffer { .. })),
            0
        );
        assert_eq!(probe.count(|c| *c == FakeCall::StartVoice), 0);
        // mastering voice 恰好释放一次
        assert_eq!(
            probe.count(|c| *c == FakeCall::DestroyMasteringVoice),
            1
        );
        assert_eq!(calls.last(), Some(&FakeCall::DestroyMasteringVoice));
    }

    #[test]
    fn test_start_failure_still_releases_both_voices_once() {
        let (mut player, probe) = player_with_probe();
        probe.fail_on(EngineCall::StartVoice, -3);

        let mut reader = reader_with_chunks(&[b"aa", b"bb"]);
        player.run(&mut reader).unwrap_err();

        // 提交发生了恰好一次，失败后没有 stop 调用
        assert_eq!(
            probe.count(|c| matches!(c, FakeCall::SubmitBuffer { .. })),
            1
        );
        assert_eq!(probe.count(|c| *c == FakeCall::StopVoice), 0);
        // 两个句柄各释放一次，source 先于 mastering
        assert_eq!(probe.count(|c| *c == FakeCall::DestroySourceVoice), 1);
        assert_eq!(probe.count(|c| *c == FakeCall::DestroyMasteringVoice), 1);
        let calls = probe.calls();
        let src = calls
            .iter()
            .position(|c| *c == FakeCall::DestroySourceVoice)
            .unwrap();
        let mst = calls
            .iter()
            .position(|c| *c == FakeCall::DestroyMasteringVoice)
            .unwrap();
        assert!(src < mst);
    }

    #[test]
    fn test_stop_handle_interrupts_wait() {
        let engine = FakeEngine::new();
        let mut player = Player::new(engine).with_tail_pad(Duration::from_secs(60));
        let stop = player.stop_handle();

        // 置位后等待应立即结束，而不是睡满 60 秒
        stop.store(true, Ordering::Release);
        let mut reader = reader_with_chunks(&[b"aa"]);

        let started = Instant::now();
        player.run(&mut reader).unwrap();
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(player.state(), RunState::Stopped);
    }

    #[test]
    fn test_compressed_input_converted_then_played() {
        let (mut player, probe) = player_with_probe();

        let output = AudioFormat::new(44100, 2, SampleKind::I16);
        let mut reader = FakeReader::new(StreamEncoding::Compressed, output);
        reader.push_chunk(&[0u8; 8]);
        reader.push(FakeRead::EndOfStream);

        player.run(&mut reader).unwrap();
        assert_eq!(reader.pcm_requests(), 1);
        // source voice 绑定到解码输出格式
        assert_eq!(
            probe.count(|c| matches!(
                c,
                FakeCall::CreateSourceVoice {
                    channels: 2,
                    sample_rate: 44100
                }
            )),
            1
        );
    }
}
