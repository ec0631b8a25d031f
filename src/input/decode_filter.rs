/// FFmpeg解码过滤器模块
/// FFmpeg decode filter: RGB24 frames → RgbImage channel
use crossbeam_channel::Sender;
use ez_ffmpeg::filter::frame_filter::FrameFilter;
use ez_ffmpeg::filter::frame_filter_context::FrameFilterContext;
use ez_ffmpeg::{AVMediaType, Frame};
use image::RgbImage;

/// 解码图滤镜描述: 过滤器收到的帧总是 RGB24
pub const RGB_FILTER_DESC: &str = "format=rgb24";

/// FFmpeg解码过滤器: 视频帧 → RgbImage
/// 空帧/损坏帧作为尺寸为0的图像发送, 由帧源决定是否跳过
#[derive(Clone)]
pub struct DecodeFilter {
    tx: Sender<RgbImage>,
    pub total_frames: u64,
    pub corrupt_frames: u64,
}

impl DecodeFilter {
    pub fn new(tx: Sender<RgbImage>) -> Self {
        Self {
            tx,
            total_frames: 0,
            corrupt_frames: 0,
        }
    }

    /// 按行复制 RGB24 数据 (linesize 可能大于 width * 3)
    fn to_rgb_image(frame: &Frame) -> Option<RgbImage> {
        unsafe {
            let raw = frame.as_ptr();
            if raw.is_null() {
                return None;
            }
            let w = (*raw).width;
            let h = (*raw).height;
            let data = (*raw).data[0];
            let stride = (*raw).linesize[0];
            if w <= 0 || h <= 0 || data.is_null() || (stride as i64) < (w as i64) * 3 {
                return None;
            }

            let (w, h, stride) = (w as usize, h as usize, stride as usize);
            let row_bytes = w * 3;
            let mut buffer = Vec::with_capacity(row_bytes * h);
            for row in 0..h {
                let src = std::slice::from_raw_parts(data.add(row * stride), row_bytes);
                buffer.extend_from_slice(src);
            }
            RgbImage::from_raw(w as u32, h as u32, buffer)
        }
    }
}

impl FrameFilter for DecodeFilter {
    fn media_type(&self) -> AVMediaType {
        AVMediaType::AVMEDIA_TYPE_VIDEO
    }

    fn init(&mut self, _ctx: &FrameFilterContext) -> Result<(), String> {
        log::debug!("✅ 解码线程启动");
        Ok(())
    }

    fn filter_frame(
        &mut self,
        frame: Frame,
        _ctx: &FrameFilterContext,
    ) -> Result<Option<Frame>, String> {
        self.total_frames += 1;

        let image = if frame.is_empty() || frame.is_corrupt() {
            None
        } else {
            Self::to_rgb_image(&frame)
        };
        let image = image.unwrap_or_else(|| {
            self.corrupt_frames += 1;
            log::debug!("⚠️ 空帧/损坏帧 #{}", self.total_frames);
            RgbImage::new(0, 0)
        });

        // 读取端已关闭: 返回错误让 FFmpeg 停止解码
        self.tx
            .send(image)
            .map_err(|_| "frame reader closed".to_string())?;
        Ok(None)
    }

    fn uninit(&mut self, _ctx: &FrameFilterContext) {
        log::debug!(
            "🛑 解码过滤器退出: {} 帧, {} 空帧/损坏帧",
            self.total_frames,
            self.corrupt_frames
        );
    }
}
