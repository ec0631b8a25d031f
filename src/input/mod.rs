/// 视频输入系统 (Video Input System)
///
/// 帧读取器抽象, 供帧源线程逐帧拉取
/// - ImageSequenceReader: 图片序列目录 (始终可用)
/// - VideoFileReader:     FFmpeg视频文件/摄像头解码 (ffmpeg 特性)
/// - MemoryReader:        内存帧 (测试/嵌入使用)
#[cfg(feature = "ffmpeg")]
pub mod decode_filter;
#[cfg(feature = "ffmpeg")]
pub mod decoder;
pub mod sequence;

#[cfg(feature = "ffmpeg")]
pub use decoder::VideoFileReader;
pub use sequence::{ImageSequenceReader, MemoryReader};

use crate::error::{CartographerError, Result};
use image::RgbImage;
use std::path::Path;

/// 摄像头输入前缀: camera:<设备索引>
pub const CAMERA_PREFIX: &str = "camera:";

/// 帧读取器 (openVideoStream / readNextFrame 的实现)
pub trait FrameReader: Send {
    /// 读取下一帧: None 表示流结束, 尺寸为0的图像表示空帧/损坏帧
    fn read_next(&mut self) -> Option<RgbImage>;

    /// 总帧数 (未知时为None)
    fn total_frames(&self) -> Option<u64> {
        None
    }

    /// 用于日志的来源描述
    fn describe(&self) -> String;
}

impl<R: FrameReader + ?Sized> FrameReader for Box<R> {
    fn read_next(&mut self) -> Option<RgbImage> {
        (**self).read_next()
    }

    fn total_frames(&self) -> Option<u64> {
        (**self).total_frames()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// 根据路径打开输入流: 目录 → 图片序列, camera:N → 摄像头, 其它 → 视频文件
pub fn open_stream(path: &Path) -> Result<Box<dyn FrameReader>> {
    if path.is_dir() {
        return Ok(Box::new(ImageSequenceReader::open(path)?));
    }

    #[cfg(feature = "ffmpeg")]
    {
        let source = path.to_string_lossy();
        if let Some(index) = source.strip_prefix(CAMERA_PREFIX) {
            let index = index.parse::<usize>().map_err(|_| CartographerError::StreamOpen {
                path: path.to_path_buf(),
                reason: format!("invalid camera index: {}", index),
            })?;
            return Ok(Box::new(VideoFileReader::open_camera(index)?));
        }
        Ok(Box::new(VideoFileReader::open(path)?))
    }

    #[cfg(not(feature = "ffmpeg"))]
    {
        Err(CartographerError::StreamOpen {
            path: path.to_path_buf(),
            reason: "video decoding requires the ffmpeg feature (or pass a directory of frames)"
                .to_string(),
        })
    }
}
