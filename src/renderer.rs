/// 实时路线窗口 (display 特性)
/// Live trail window: macroquad loop on the calling thread
use crate::detection::LocalizedPoint;
use crate::pipeline::{CancelToken, PresenterStats, TrailPresenter};
use crossbeam_channel::{Receiver, TryRecvError};
use macroquad::prelude::*;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct WindowState {
    stats: PresenterStats,
    finished: bool, // 点队列已关闭
}

struct TrailView {
    presenter: TrailPresenter,
    texture: Texture2D,
}

impl TrailView {
    fn new(presenter: TrailPresenter) -> Self {
        let texture = Texture2D::from_image(&Self::to_image(&presenter));
        texture.set_filter(FilterMode::Linear);
        Self { presenter, texture }
    }

    fn to_image(presenter: &TrailPresenter) -> Image {
        let canvas = presenter.canvas();
        let rgba = ::image::DynamicImage::ImageRgb8(canvas.clone()).into_rgba8();
        Image {
            bytes: rgba.into_raw(),
            width: canvas.width() as u16,
            height: canvas.height() as u16,
        }
    }

    /// 取出所有已排队的点 (不阻塞), 返回点队列是否已关闭
    fn drain(&mut self, rx: &Receiver<LocalizedPoint>) -> bool {
        let mut changed = false;
        let closed = loop {
            match rx.try_recv() {
                Ok(point) => {
                    self.presenter.present(&point);
                    changed = true;
                }
                Err(TryRecvError::Empty) => break false,
                Err(TryRecvError::Disconnected) => break true,
            }
        };
        if changed {
            self.texture.update(&Self::to_image(&self.presenter));
        }
        closed
    }

    fn draw(&self, finished: bool) {
        clear_background(BLACK);

        // 保持宽高比居中显示
        let scale = (screen_width() / self.texture.width()).min(screen_height() / self.texture.height());
        let (w, h) = (self.texture.width() * scale, self.texture.height() * scale);
        draw_texture_ex(
            &self.texture,
            (screen_width() - w) / 2.0,
            (screen_height() - h) / 2.0,
            WHITE,
            DrawTextureParams {
                dest_size: Some(vec2(w, h)),
                ..Default::default()
            },
        );

        let stats = self.presenter.stats();
        let status = if finished {
            format!("{} points - stream ended, press any key to close", stats.points)
        } else {
            format!("{} points - press any key to stop", stats.points)
        };
        draw_text(&status, 10.0, 24.0, 24.0, GREEN);
    }
}

/// 打开窗口显示路线, 阻塞到窗口关闭; 未结束时按键或关闭窗口视为停止请求
pub fn run(
    presenter: TrailPresenter,
    points: Receiver<LocalizedPoint>,
    cancel: CancelToken,
) -> PresenterStats {
    log::info!("▶️ 展示器启动 (窗口)");
    let (width, height) = presenter.canvas().dimensions();
    let state = Arc::new(Mutex::new(WindowState::default()));

    let conf = Conf {
        window_title: "Map movement".to_string(),
        window_width: width.min(1280) as i32,
        window_height: height.min(960) as i32,
        window_resizable: true,
        ..Default::default()
    };

    let shared = Arc::clone(&state);
    let loop_cancel = cancel.clone();
    macroquad::Window::from_config(conf, async move {
        let mut view = TrailView::new(presenter);
        let mut finished = false;

        loop {
            if loop_cancel.is_cancelled() {
                break;
            }
            if view.drain(&points) && !finished {
                log::info!("📭 点队列已关闭");
                finished = true;
            }
            view.draw(finished);

            if let Ok(mut state) = shared.lock() {
                state.stats = view.presenter.stats();
                state.finished = finished;
            }

            if get_last_key_pressed().is_some() {
                if !finished {
                    log::info!("🛑 用户请求停止处理");
                }
                break;
            }
            next_frame().await;
        }
    });

    let (mut stats, finished) = match state.lock() {
        Ok(state) => (state.stats, state.finished),
        Err(_) => (PresenterStats::default(), false),
    };
    if !finished {
        stats.stopped_by_user = true;
        cancel.cancel();
    }
    log::info!("⏹️ 展示器停止: {} 个点", stats.points);
    stats
}
