/// FFmpeg视频解码器
/// FFmpeg-backed video file / camera reader
///
/// FFmpeg 在独立的解码线程中运行, 解码帧通过有界通道交给读取端。
/// 读取端被丢弃时通道关闭, 过滤器返回错误, FFmpeg 随之停止。
use super::decode_filter::{DecodeFilter, RGB_FILTER_DESC};
use super::FrameReader;
use crate::error::{CartographerError, Result};
use crossbeam_channel::{bounded, Receiver};
use ez_ffmpeg::core::context::null_output::create_null_output;
use ez_ffmpeg::filter::frame_pipeline_builder::FramePipelineBuilder;
use ez_ffmpeg::{AVMediaType, FfmpegContext, Input};
use image::RgbImage;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

/// 解码器与读取端之间的缓冲帧数
const DECODED_QUEUE_CAPACITY: usize = 8;

pub struct VideoFileReader {
    source: String,
    rx: Option<Receiver<RgbImage>>,
    handle: Option<JoinHandle<()>>,
}

impl VideoFileReader {
    /// 打开视频文件
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(CartographerError::StreamOpen {
                path: path.to_path_buf(),
                reason: "no such file".to_string(),
            });
        }
        let source = path.to_string_lossy().to_string();
        Self::spawn(source.clone(), move || Input::new(source.as_str()))
    }

    /// 打开本地摄像头: DirectShow(Windows) / AVFoundation(macOS) / V4L2(Linux)
    pub fn open_camera(index: usize) -> Result<Self> {
        #[cfg(target_os = "windows")]
        let (url, format) = (format!("video={}", index), "dshow");
        #[cfg(target_os = "macos")]
        let (url, format) = (format!("{}", index), "avfoundation");
        #[cfg(not(any(target_os = "windows", target_os = "macos")))]
        let (url, format) = (format!("/dev/video{}", index), "v4l2");

        log::info!("📷 摄像头: {} ({})", url, format);
        Self::spawn(url.clone(), move || Input::new(url.as_str()).set_format(format))
    }

    fn spawn<F>(source: String, make_input: F) -> Result<Self>
    where
        F: FnOnce() -> Input + Send + 'static,
    {
        let (tx, rx) = bounded::<RgbImage>(DECODED_QUEUE_CAPACITY);
        let (ready_tx, ready_rx) = bounded::<std::result::Result<(), String>>(1);

        let handle = thread::Builder::new()
            .name("decoder".to_string())
            .spawn(move || {
                let pipe: FramePipelineBuilder = AVMediaType::AVMEDIA_TYPE_VIDEO.into();
                let pipe = pipe.filter("decode", Box::new(DecodeFilter::new(tx)));
                let out = create_null_output().add_frame_pipeline(pipe);

                let started = FfmpegContext::builder()
                    .input(make_input())
                    .filter_desc(RGB_FILTER_DESC)
                    .output(out)
                    .build()
                    .map_err(|e| format!("构建失败: {}", e))
                    .and_then(|ctx| ctx.start().map_err(|e| format!("启动失败: {}", e)));

                match started {
                    Ok(sch) => {
                        let _ = ready_tx.send(Ok(()));
                        let _ = sch.wait();
                        log::debug!("📹 解码循环结束");
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                    }
                }
            })
            .map_err(|e| CartographerError::StreamOpen {
                path: PathBuf::from(&source),
                reason: e.to_string(),
            })?;

        let open_err = |reason: String| CartographerError::StreamOpen {
            path: PathBuf::from(&source),
            reason,
        };
        match ready_rx.recv() {
            Ok(Ok(())) => {
                log::info!("✅ 视频流已打开: {}", source);
                Ok(Self {
                    source,
                    rx: Some(rx),
                    handle: Some(handle),
                })
            }
            Ok(Err(reason)) => {
                let _ = handle.join();
                Err(open_err(reason))
            }
            Err(_) => {
                let _ = handle.join();
                Err(open_err("decoder thread exited".to_string()))
            }
        }
    }
}

impl FrameReader for VideoFileReader {
    fn read_next(&mut self) -> Option<RgbImage> {
        self.rx.as_ref()?.recv().ok()
    }

    fn describe(&self) -> String {
        format!("video {}", self.source)
    }
}

impl Drop for VideoFileReader {
    fn drop(&mut self) {
        // 先关闭通道, 解码线程才能退出
        drop(self.rx.take());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
