/// 处理器 (Processor)
/// 职责: 接收采样帧 → 首次定位小地图区域 (锁存) → 模板匹配 → 发送定位点
use super::{recv_or_cancel, send_or_cancel, CancelToken, Frame};
use crate::config::SessionConfig;
use crate::detection::{LocalizedPoint, MinimapDetector, Rectangle, TemplateMatcher};
use crate::error::{CartographerError, Result};
use crate::utils::imgproc::{binarize, crop_top_left_quadrant, BINARY_THRESHOLD};
use crossbeam_channel::{Receiver, Sender};
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use once_cell::sync::OnceCell;
use std::path::PathBuf;

const PREVIEW_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

/// 处理器统计
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProcessorStats {
    pub frames: u64,
    pub detection_attempts: u64,
    pub detection_failures: u64,
    pub match_failures: u64,
    pub points: u64,
    pub region: Option<Rectangle>,
}

/// 在帧的左上区域中寻找小地图
pub fn discover_region(detector: &MinimapDetector, frame: &RgbImage) -> Result<Rectangle> {
    let quadrant = crop_top_left_quadrant(frame);
    detector.detect(&binarize(&quadrant, BINARY_THRESHOLD))
}

/// 左上区域 + 小地图区域边框, 用于调试预览
pub fn region_preview(frame: &RgbImage, region: &Rectangle) -> RgbImage {
    let mut quadrant = crop_top_left_quadrant(frame);
    if !region.is_empty() {
        let rect = Rect::at(region.min.x, region.min.y).of_size(region.width(), region.height());
        draw_hollow_rect_mut(&mut quadrant, rect, PREVIEW_COLOR);
    }
    quadrant
}

pub struct FrameProcessor {
    detector: MinimapDetector,
    matcher: TemplateMatcher,
    region: OnceCell<Rectangle>, // 小地图区域, 只写一次
    preview_path: Option<PathBuf>,
    stats: ProcessorStats,
}

impl FrameProcessor {
    pub fn new(matcher: TemplateMatcher, config: &SessionConfig) -> Self {
        Self {
            detector: MinimapDetector::default(),
            matcher,
            region: OnceCell::new(),
            preview_path: config.debug.then(|| config.minimap_preview_path()),
            stats: ProcessorStats::default(),
        }
    }

    pub fn region(&self) -> Option<Rectangle> {
        self.region.get().copied()
    }

    pub fn stats(&self) -> ProcessorStats {
        ProcessorStats {
            region: self.region(),
            ..self.stats
        }
    }

    /// 处理一帧: 区域未锁存时先检测, 之后每帧只做匹配
    pub fn process(&mut self, frame: &Frame) -> Result<LocalizedPoint> {
        self.stats.frames += 1;

        let region = match self.region.get() {
            Some(region) => *region,
            None => {
                log::info!("🔍 小地图尚未找到, 检测中... (帧 #{})", frame.index);
                self.stats.detection_attempts += 1;
                let region = discover_region(&self.detector, &frame.image).map_err(|e| {
                    self.stats.detection_failures += 1;
                    e
                })?;
                let region = *self.region.get_or_init(|| region);
                log::info!("✅ 小地图区域: {}", region);
                self.write_preview(&frame.image, &region);
                region
            }
        };

        let found = self.matcher.locate(&frame.image, &region).map_err(|e| {
            if matches!(e, CartographerError::MatchImpossible { .. }) {
                self.stats.match_failures += 1;
            }
            e
        })?;

        self.stats.points += 1;
        Ok(LocalizedPoint {
            frame_index: frame.index,
            position: found.center,
            score: found.score,
        })
    }

    fn write_preview(&self, frame: &RgbImage, region: &Rectangle) {
        let Some(path) = &self.preview_path else {
            return;
        };
        match region_preview(frame, region).save(path) {
            Ok(()) => log::debug!("🖼️ 小地图预览: {}", path.display()),
            Err(source) => log::warn!(
                "⚠️ {}",
                CartographerError::Persist {
                    path: path.clone(),
                    source,
                }
            ),
        }
    }

    /// 处理线程主循环, 返回时丢弃发送端 (关闭点队列)
    pub fn run(
        mut self,
        rx: Receiver<Frame>,
        tx: Sender<LocalizedPoint>,
        cancel: &CancelToken,
    ) -> ProcessorStats {
        let (map_w, map_h) = self.matcher.map_dimensions();
        log::info!("▶️ 处理器启动 (地图 {}x{}, C = {})", map_w, map_h, self.matcher.scale());

        while let Some(frame) = recv_or_cancel(&rx, cancel) {
            match self.process(&frame) {
                Ok(point) => {
                    log::info!(
                        "📍 帧 #{} → ({}, {}) score={:.3}",
                        point.frame_index,
                        point.position.x,
                        point.position.y,
                        point.score
                    );
                    if !send_or_cancel(&tx, point, cancel) {
                        log::debug!("点队列已关闭或会话已取消");
                        break;
                    }
                }
                Err(e) if e.is_recoverable() => {
                    log::warn!("⚠️ 跳过帧 #{}: {}", frame.index, e);
                }
                Err(e) => {
                    log::error!("❌ 处理器错误: {}", e);
                    break;
                }
            }
        }

        let stats = self.stats();
        log::info!(
            "⏹️ 处理器停止: {} 帧, {} 个定位点, 检测失败 {}",
            stats.frames,
            stats.points,
            stats.detection_failures
        );
        stats
    }
}
