//! Clip Player - 最小播放沙箱
//!
//! 解码一个音频文件进内存并在默认输出设备上播放一次

#![allow(dead_code)]

mod audio;
mod decode;
mod engine;

use std::path::PathBuf;
use std::sync::atomic::Ordering;

use clap::{Parser, Subcommand};

use crate::audio::output::{list_output_devices, CpalEngine};
use crate::engine::Player;

/// Clip Player - decode a file fully into memory and play it once
#[derive(Parser)]
#[command(name = "clip-player")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Audio file to play
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Show verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show audio output device information
    Info,

    /// Play a file and exit
    Play {
        /// Audio file to play
        file: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 初始化日志
    let default_level = if cli.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    match cli.command {
        Some(Commands::Info) => show_device_info(),
        Some(Commands::Play { ref file }) => play(file),
        None => match cli.file {
            Some(ref file) => play(file),
            None => {
                println!("Clip Player - minimal playback sandbox\n");
                println!("Usage: clip-player <FILE>");
                println!("       clip-player info");
                println!("\nOptions:");
                println!("  -v, --verbose   Show verbose output");
                println!("\nPress Ctrl+C to stop playback");
                Ok(())
            }
        },
    }
}

/// 显示输出设备信息
fn show_device_info() -> anyhow::Result<()> {
    println!("=== Audio Output Devices ===\n");

    let devices = list_output_devices();
    if devices.is_empty() {
        println!("No output devices found.");
        return Ok(());
    }

    for device in &devices {
        let default_mark = if device.is_default { " *" } else { "" };
        println!(
            "  {} ({}ch @ {}Hz){}",
            device.name, device.channels, device.sample_rate, default_mark
        );
    }

    println!("\n* = system default");
    Ok(())
}

/// 播放单个文件
fn play(file: &PathBuf) -> anyhow::Result<()> {
    let engine = CpalEngine::new()?;
    let mut player = Player::new(engine);

    // Ctrl+C 提前结束等待
    let stop = player.stop_handle();
    ctrlc::set_handler(move || {
        stop.store(true, Ordering::Release);
    })?;

    println!("Playing: {}", file.display());
    println!("Press Ctrl+C to stop.");

    player.play_file(file)?;

    println!("Done.");
    Ok(())
}
