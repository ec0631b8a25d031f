/// 帧源 (Frame Source)
/// 职责: 读取帧 → 按间隔采样 → 发送到帧队列
use super::{send_or_cancel, CancelToken, Frame};
use crate::input::FrameReader;
use crossbeam_channel::Sender;
use std::time::{Duration, Instant};

const PROGRESS_LOG_INTERVAL: Duration = Duration::from_secs(1);

/// 帧源统计
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SourceStats {
    pub frames_read: u64,
    pub frames_sampled: u64,
    pub empty_frames: u64,
}

/// 采样迭代器: 输出第一个可读帧, 之后每两次输出之间丢弃 k-1 帧。
/// 落在采样位置上的空帧不计为一次采样, 取其后第一个非空帧。
pub struct SampledFrames<R> {
    reader: R,
    interval: u32,
    to_discard: u32,
    stats: SourceStats,
}

impl<R: FrameReader> SampledFrames<R> {
    pub fn new(reader: R, interval: u32) -> Self {
        Self {
            reader,
            interval: interval.max(1),
            to_discard: 0,
            stats: SourceStats::default(),
        }
    }

    pub fn stats(&self) -> SourceStats {
        self.stats
    }
}

impl<R: FrameReader> Iterator for SampledFrames<R> {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        loop {
            let image = self.reader.read_next()?;
            let index = self.stats.frames_read;
            self.stats.frames_read += 1;

            if self.to_discard > 0 {
                self.to_discard -= 1;
                continue;
            }
            if image.width() == 0 || image.height() == 0 {
                self.stats.empty_frames += 1;
                continue;
            }

            self.to_discard = self.interval - 1;
            self.stats.frames_sampled += 1;
            return Some(Frame { index, image });
        }
    }
}

/// 帧源线程主循环, 返回时丢弃发送端 (关闭帧队列) 和读取器
pub fn run<R: FrameReader>(
    reader: R,
    interval: u32,
    tx: Sender<Frame>,
    cancel: &CancelToken,
) -> SourceStats {
    log::info!("▶️ 帧源启动: {}", reader.describe());
    let total = reader.total_frames();
    let mut frames = SampledFrames::new(reader, interval);
    let mut last_log = Instant::now();

    for frame in frames.by_ref() {
        if last_log.elapsed() >= PROGRESS_LOG_INTERVAL {
            match total {
                Some(total) => log::info!("📊 帧 {}/{}", frame.index + 1, total),
                None => log::info!("📊 帧 {}", frame.index + 1),
            }
            last_log = Instant::now();
        }
        log::debug!("帧 #{} → 帧队列", frame.index);

        if !send_or_cancel(&tx, frame, cancel) {
            log::debug!("帧队列已关闭或会话已取消");
            break;
        }
    }

    let stats = frames.stats();
    log::info!(
        "⏹️ 帧源停止: 读取 {} 帧, 采样 {} 帧, 空帧 {}",
        stats.frames_read,
        stats.frames_sampled,
        stats.empty_frames
    );
    stats
}
