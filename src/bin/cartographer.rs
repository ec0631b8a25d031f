use anyhow::{bail, Context, Result};
/// 小地图路线追踪 - 视频帧源 + 小地图定位 + 路线绘制 三线程架构
///
/// 主程序入口 - 直接运行: cargo run --bin cartographer --release -- track <视频>
use cartographer_rs::config::{Args, Command, DetectArgs, TrackArgs};
use cartographer_rs::detection::MinimapDetector;
use cartographer_rs::input::open_stream;
use cartographer_rs::pipeline::processor::{discover_region, region_preview};
use cartographer_rs::pipeline::{run_session, CancelToken, SampledFrames};
use cartographer_rs::{MapRegistry, SessionConfig};
use clap::Parser;

fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let registry = match &args.maps {
        Some(path) => MapRegistry::load(path)
            .with_context(|| format!("加载地图档案失败: {}", path.display()))?,
        None => MapRegistry::builtin(),
    };

    match &args.command {
        Command::Track(track) => run_track(track, args.debug, &registry),
        Command::Detect(detect) => run_detect(detect),
        Command::Maps => {
            list_maps(&registry);
            Ok(())
        }
    }
}

fn run_track(track: &TrackArgs, debug: bool, registry: &MapRegistry) -> Result<()> {
    let config = SessionConfig::from_track_args(track, debug, registry)?;
    if config.save_img || config.debug {
        std::fs::create_dir_all(&config.output_dir).with_context(|| {
            format!("无法创建输出目录: {}", config.output_dir.display())
        })?;
    }

    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        ctrlc::set_handler(move || cancel.cancel()).context("无法注册 Ctrl-C 处理器")?;
    }

    // 打开失败: 不产生任何帧, 流水线空转后正常退出
    let reader = match open_stream(&track.source) {
        Ok(reader) => reader,
        Err(e) => {
            log::error!("❌ {}", e);
            return Ok(());
        }
    };

    let report = run_session(&config, reader, cancel)
        .with_context(|| format!("会话失败 (地图 {})", config.map.name))?;
    println!("{}", report);
    if config.save_img {
        println!("路线图: {}", config.route_image_path().display());
    }
    Ok(())
}

fn run_detect(detect: &DetectArgs) -> Result<()> {
    let reader = open_stream(&detect.source)?;
    let detector = MinimapDetector::default();

    for frame in SampledFrames::new(reader, 1).take(detect.max_frames as usize) {
        match discover_region(&detector, &frame.image) {
            Ok(region) => {
                log::info!("✅ 帧 #{}: 小地图区域 {}", frame.index, region);
                region_preview(&frame.image, &region)
                    .save(&detect.output)
                    .with_context(|| format!("无法保存预览图: {}", detect.output.display()))?;
                println!("{} -> {}", region, detect.output.display());
                return Ok(());
            }
            Err(e) => log::debug!("帧 #{}: {}", frame.index, e),
        }
    }
    bail!("在前 {} 帧中未找到小地图", detect.max_frames)
}

fn list_maps(registry: &MapRegistry) {
    for profile in registry.profiles() {
        let status = if profile.path.is_file() { "" } else { " (missing)" };
        println!(
            "{:<16} C={:<6} {}{}",
            profile.name,
            profile.scale,
            profile.path.display(),
            status
        );
    }
}
