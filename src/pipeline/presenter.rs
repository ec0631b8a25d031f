/// 展示器 (Presenter)
/// 职责: 接收定位点 → 在参考地图副本上绘制路线 → 保存/显示
use super::{recv_or_cancel, CancelToken};
use crate::config::SessionConfig;
use crate::detection::{LocalizedPoint, Point};
use crate::error::CartographerError;
use crate::utils::color::{Direction, Hsv};
use crossbeam_channel::Receiver;
use image::RgbImage;
use imageproc::drawing::draw_filled_circle_mut;
use std::path::{Path, PathBuf};

/// 每个点的色相旋转角度
pub const HUE_STEP: u32 = 5;

/// 展示器统计
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PresenterStats {
    pub points: u64,
    pub persist_failures: u64,
    pub last_point: Option<Point>,
    pub stopped_by_user: bool,
}

pub struct TrailPresenter {
    canvas: RgbImage, // 参考地图副本, 路线累积在上面
    color: Hsv,
    marker_radius: i32,
    persist_path: Option<PathBuf>,
    stats: PresenterStats,
}

impl TrailPresenter {
    pub fn new(map: RgbImage, config: &SessionConfig) -> Self {
        Self {
            canvas: map,
            color: Hsv::default(),
            marker_radius: config.marker_radius.max(1),
            persist_path: config.save_img.then(|| config.route_image_path()),
            stats: PresenterStats::default(),
        }
    }

    pub fn canvas(&self) -> &RgbImage {
        &self.canvas
    }

    pub fn color(&self) -> Hsv {
        self.color
    }

    pub fn persist_path(&self) -> Option<&Path> {
        self.persist_path.as_deref()
    }

    pub fn stats(&self) -> PresenterStats {
        self.stats
    }

    /// 绘制一个点: 旋转色相 → 画标记 → (可选) 覆盖保存路线图
    pub fn present(&mut self, point: &LocalizedPoint) {
        self.color.rotate_hue(HUE_STEP, Direction::Cw);
        let Point { x, y } = point.position;
        draw_filled_circle_mut(&mut self.canvas, (x, y), self.marker_radius, self.color.to_rgb());

        self.stats.points += 1;
        self.stats.last_point = Some(point.position);
        log::debug!(
            "🎨 点 #{} ({}, {}) hue={}",
            self.stats.points,
            x,
            y,
            self.color.h
        );

        if let Some(path) = &self.persist_path {
            if let Err(source) = self.canvas.save(path) {
                self.stats.persist_failures += 1;
                log::warn!(
                    "⚠️ {}",
                    CartographerError::Persist {
                        path: path.clone(),
                        source,
                    }
                );
            }
        }
    }

    /// 标记为用户停止
    pub fn mark_stopped(&mut self) {
        self.stats.stopped_by_user = true;
    }

    /// 无窗口模式: 处理所有定位点直到点队列关闭或会话取消
    pub fn run(mut self, rx: Receiver<LocalizedPoint>, cancel: &CancelToken) -> PresenterStats {
        log::info!("▶️ 展示器启动");

        while let Some(point) = recv_or_cancel(&rx, cancel) {
            self.present(&point);
        }
        if cancel.is_cancelled() {
            self.mark_stopped();
        }

        if let Some(path) = &self.persist_path {
            log::info!("💾 路线图: {}", path.display());
        }
        log::info!("⏹️ 展示器停止: {} 个点", self.stats.points);
        self.stats
    }
}
