/// 图片序列与内存帧读取器
use super::FrameReader;
use crate::error::{CartographerError, Result};
use image::RgbImage;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

const FRAME_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// 按文件名字典序读取目录中的图片帧
/// 无法解码的文件作为空帧返回, 不中断会话
pub struct ImageSequenceReader {
    dir: PathBuf,
    files: Vec<PathBuf>,
    cursor: usize,
}

impl ImageSequenceReader {
    pub fn open(dir: &Path) -> Result<Self> {
        let open_err = |reason: String| CartographerError::StreamOpen {
            path: dir.to_path_buf(),
            reason,
        };

        let mut files: Vec<PathBuf> = fs::read_dir(dir)
            .map_err(|e| open_err(e.to_string()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && is_frame_file(path))
            .collect();
        files.sort();

        if files.is_empty() {
            return Err(open_err("no image frames in directory".to_string()));
        }

        log::info!("📂 图片序列: {} ({} 帧)", dir.display(), files.len());
        Ok(Self {
            dir: dir.to_path_buf(),
            files,
            cursor: 0,
        })
    }
}

fn is_frame_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| FRAME_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

impl FrameReader for ImageSequenceReader {
    fn read_next(&mut self) -> Option<RgbImage> {
        let path = self.files.get(self.cursor)?;
        self.cursor += 1;

        match image::open(path) {
            Ok(img) => Some(img.to_rgb8()),
            Err(e) => {
                log::warn!("⚠️ 无法解码帧 {}: {}", path.display(), e);
                Some(RgbImage::new(0, 0))
            }
        }
    }

    fn total_frames(&self) -> Option<u64> {
        Some(self.files.len() as u64)
    }

    fn describe(&self) -> String {
        format!("image sequence {}", self.dir.display())
    }
}

/// 内存帧读取器, None 表示空帧
pub struct MemoryReader {
    frames: VecDeque<Option<RgbImage>>,
    total: u64,
}

impl MemoryReader {
    pub fn new(frames: Vec<Option<RgbImage>>) -> Self {
        let total = frames.len() as u64;
        Self {
            frames: frames.into(),
            total,
        }
    }

    pub fn from_images(images: Vec<RgbImage>) -> Self {
        Self::new(images.into_iter().map(Some).collect())
    }
}

impl FrameReader for MemoryReader {
    fn read_next(&mut self) -> Option<RgbImage> {
        self.frames
            .pop_front()
            .map(|frame| frame.unwrap_or_else(|| RgbImage::new(0, 0)))
    }

    fn total_frames(&self) -> Option<u64> {
        Some(self.total)
    }

    fn describe(&self) -> String {
        format!("memory ({} frames)", self.total)
    }
}
