/// 视频处理流水线 (Video Processing Pipeline)
///
/// 三线程架构, 通过有界通道通信:
/// - Source:    帧源, 按采样间隔读取帧 (独立线程)
/// - Processor: 小地图定位 + 模板匹配 (独立线程)
/// - Presenter: 路线绘制/显示/保存 (调用线程)
///
/// 每个通道只有一个生产者, 生产者结束时丢弃发送端即关闭通道,
/// 下游在通道耗尽后依次退出。用户停止时触发 CancelToken, 所有阻塞点随之返回。
pub mod presenter;
pub mod processor;
pub mod source;

pub use presenter::{PresenterStats, TrailPresenter};
pub use processor::{FrameProcessor, ProcessorStats};
pub use source::{SampledFrames, SourceStats};

use crate::config::SessionConfig;
use crate::detection::{LocalizedPoint, Rectangle, TemplateMatcher};
use crate::error::{CartographerError, Result};
use crate::input::FrameReader;
use crossbeam_channel::{bounded, select, Receiver, Sender};
use image::RgbImage;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

/// 帧队列容量 (帧源 → 处理器)
pub const FRAME_QUEUE_CAPACITY: usize = 1024;
/// 点队列容量 (处理器 → 展示器)
pub const POINT_QUEUE_CAPACITY: usize = 128;

/// 采样帧: 像素 + 在原始流中的序号
#[derive(Debug, Clone)]
pub struct Frame {
    pub index: u64,
    pub image: RgbImage,
}

// ========== 取消令牌 ==========

/// 会话取消令牌
///
/// `cancel()` 丢弃内部发送端, 所有在 `receiver()` 上 select 的阻塞点立即返回。
#[derive(Clone)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

struct CancelInner {
    cancelled: AtomicBool,
    trigger: Mutex<Option<Sender<()>>>,
    signal: Receiver<()>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (trigger, signal) = bounded(0);
        Self {
            inner: Arc::new(CancelInner {
                cancelled: AtomicBool::new(false),
                trigger: Mutex::new(Some(trigger)),
                signal,
            }),
        }
    }

    pub fn cancel(&self) {
        if !self.inner.cancelled.swap(true, Ordering::SeqCst) {
            log::info!("🛑 收到停止请求");
        }
        if let Ok(mut trigger) = self.inner.trigger.lock() {
            trigger.take();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// 取消后断开的通道, 用于 select!
    pub fn receiver(&self) -> &Receiver<()> {
        &self.inner.signal
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// 阻塞发送, 取消或下游关闭时返回 false
pub fn send_or_cancel<T>(tx: &Sender<T>, item: T, cancel: &CancelToken) -> bool {
    if cancel.is_cancelled() {
        return false;
    }
    select! {
        send(tx, item) -> res => res.is_ok(),
        recv(cancel.receiver()) -> _ => false,
    }
}

/// 阻塞接收, 取消或上游关闭时返回 None
pub fn recv_or_cancel<T>(rx: &Receiver<T>, cancel: &CancelToken) -> Option<T> {
    if cancel.is_cancelled() {
        return None;
    }
    select! {
        recv(rx) -> msg => msg.ok(),
        recv(cancel.receiver()) -> _ => None,
    }
}

// ========== 会话 ==========

/// 会话结束后的统计
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionReport {
    pub frames_read: u64,
    pub frames_sampled: u64,
    pub empty_frames: u64,
    pub detection_failures: u64,
    pub match_failures: u64,
    pub points: u64,
    pub points_presented: u64,
    pub region: Option<Rectangle>,
    pub stopped_by_user: bool,
}

impl fmt::Display for SessionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "读取 {} 帧, 采样 {} 帧 (空帧 {}), 检测失败 {}, 匹配失败 {}, 定位点 {}/{}",
            self.frames_read,
            self.frames_sampled,
            self.empty_frames,
            self.detection_failures,
            self.match_failures,
            self.points_presented,
            self.points
        )?;
        match self.region {
            Some(region) => write!(f, ", 小地图区域 {}", region)?,
            None => write!(f, ", 未找到小地图")?,
        }
        if self.stopped_by_user {
            write!(f, " (用户停止)")?;
        }
        Ok(())
    }
}

/// 加载参考地图
pub fn load_reference_map(config: &SessionConfig) -> Result<RgbImage> {
    let path = &config.map.path;
    let map = image::open(path)
        .map_err(|source| CartographerError::MapLoad {
            path: path.clone(),
            source,
        })?
        .to_rgb8();
    log::info!(
        "🗺️ 参考地图 {}: {}x{} (C = {})",
        config.map.name,
        map.width(),
        map.height(),
        config.map.scale
    );
    Ok(map)
}

/// 运行一次完整会话: 帧源/处理器线程 + 调用线程上的展示器
pub fn run_session<R>(config: &SessionConfig, reader: R, cancel: CancelToken) -> Result<SessionReport>
where
    R: FrameReader + 'static,
{
    let map = load_reference_map(config)?;
    let presenter = TrailPresenter::new(map.clone(), config);
    run_session_with(config, reader, map, presenter, cancel)
}

/// 与 `run_session` 相同, 参考地图与展示器由调用方提供
pub fn run_session_with<R>(
    config: &SessionConfig,
    reader: R,
    map: RgbImage,
    presenter: TrailPresenter,
    cancel: CancelToken,
) -> Result<SessionReport>
where
    R: FrameReader + 'static,
{
    log::info!("🎬 会话开始: {} (间隔 {})", reader.describe(), config.frame_interval);

    let (frame_tx, frame_rx) = bounded::<Frame>(FRAME_QUEUE_CAPACITY);
    let (point_tx, point_rx) = bounded::<LocalizedPoint>(POINT_QUEUE_CAPACITY);

    let matcher = TemplateMatcher::new(&map, config.map.scale);
    drop(map);

    let source_cancel = cancel.clone();
    let interval = config.frame_interval;
    let source_handle = thread::Builder::new()
        .name("source".to_string())
        .spawn(move || source::run(reader, interval, frame_tx, &source_cancel))
        .map_err(|source| CartographerError::Spawn {
            name: "source",
            source,
        })?;

    let processor = FrameProcessor::new(matcher, config);
    let processor_cancel = cancel.clone();
    let processor_handle = thread::Builder::new()
        .name("processor".to_string())
        .spawn(move || processor.run(frame_rx, point_tx, &processor_cancel))
        .map_err(|source| {
            cancel.cancel();
            CartographerError::Spawn {
                name: "processor",
                source,
            }
        })?;

    let presenter_stats = present(config, presenter, point_rx, &cancel);

    // 展示器退出后, 让上游不再阻塞
    if presenter_stats.stopped_by_user {
        cancel.cancel();
    }

    let source_stats = source_handle.join().unwrap_or_else(|_| {
        log::error!("❌ 帧源线程异常退出");
        SourceStats::default()
    });
    let processor_stats = processor_handle.join().unwrap_or_else(|_| {
        log::error!("❌ 处理线程异常退出");
        ProcessorStats::default()
    });

    let report = SessionReport {
        frames_read: source_stats.frames_read,
        frames_sampled: source_stats.frames_sampled,
        empty_frames: source_stats.empty_frames,
        detection_failures: processor_stats.detection_failures,
        match_failures: processor_stats.match_failures,
        points: processor_stats.points,
        points_presented: presenter_stats.points,
        region: processor_stats.region,
        stopped_by_user: presenter_stats.stopped_by_user || cancel.is_cancelled(),
    };
    log::info!("✅ 会话结束: {}", report);
    Ok(report)
}

#[cfg(feature = "display")]
fn present(
    config: &SessionConfig,
    presenter: TrailPresenter,
    points: Receiver<LocalizedPoint>,
    cancel: &CancelToken,
) -> PresenterStats {
    if config.show_gui {
        crate::renderer::run(presenter, points, cancel.clone())
    } else {
        presenter.run(points, cancel)
    }
}

#[cfg(not(feature = "display"))]
fn present(
    config: &SessionConfig,
    presenter: TrailPresenter,
    points: Receiver<LocalizedPoint>,
    cancel: &CancelToken,
) -> PresenterStats {
    if config.show_gui {
        log::warn!("⚠️ 未启用 display 特性, 以无窗口模式运行");
    }
    presenter.run(points, cancel)
}
