//! Clip Player
//!
//! 最小播放沙箱：把一个音频文件完整解码进内存，
//! 通过默认输出设备一次性播放。所有实质工作（解码、混音、
//! 调度）都委托给外部服务，这里只负责按正确顺序发起调用、
//! 把失败翻译成类型化错误、以及保证句柄反序释放

pub mod audio;
pub mod decode;
pub mod engine;
