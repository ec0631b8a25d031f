use cartographer_rs::config::{MapProfile, SessionConfig};
use cartographer_rs::detection::{Point, Rectangle, TemplateMatcher};
use cartographer_rs::input::MemoryReader;
use cartographer_rs::pipeline::{self, run_session, source, CancelToken, Frame, FrameProcessor};
use crossbeam_channel::bounded;
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::Path;
use std::thread;
use std::time::Duration;

const MAP_SIZE: u32 = 256;
const MINIMAP: Rectangle = Rectangle {
    min: Point { x: 30, y: 40 },
    max: Point { x: 94, y: 104 },
};

/// 随机灰度纹理, 所有像素低于二值化阈值
fn reference_map(seed: u64) -> RgbImage {
    let mut rng = StdRng::seed_from_u64(seed);
    RgbImage::from_fn(MAP_SIZE, MAP_SIZE, |_, _| {
        let v: u8 = rng.gen_range(10..=140);
        Rgb([v, v, v])
    })
}

/// 游戏帧: 左上区域中嵌入地图 (x0, y0) 处的一块, 上下边缘为白色边框
fn game_frame(map: &RgbImage, x0: u32, y0: u32) -> RgbImage {
    let (w, h) = (MINIMAP.width(), MINIMAP.height());
    let mut frame = RgbImage::new(400, 300);
    let patch = imageops::crop_imm(map, x0, y0, w, h).to_image();
    imageops::replace(&mut frame, &patch, MINIMAP.min.x as i64, MINIMAP.min.y as i64);

    let white = Rgb([255, 255, 255]);
    for dy in (0..4).chain(h - 4..h) {
        for dx in 0..w {
            frame.put_pixel(MINIMAP.min.x as u32 + dx, MINIMAP.min.y as u32 + dy, white);
        }
    }
    frame
}

/// 低对比度纹理, 放大后的振铃也不会超过二值化阈值
fn calibrated_map(seed: u64) -> RgbImage {
    let mut rng = StdRng::seed_from_u64(seed);
    RgbImage::from_fn(MAP_SIZE, MAP_SIZE, |_, _| {
        let v: u8 = rng.gen_range(40..=115);
        Rgb([v, v, v])
    })
}

/// C = 0.71 的游戏帧: 地图 (x0, y0) 处 71x71 的一块放大到 100x100,
/// 贴在 (20, 20), 上下各两行边框
fn calibrated_frame(map: &RgbImage, x0: u32, y0: u32) -> RgbImage {
    let patch = imageops::crop_imm(map, x0, y0, 71, 71).to_image();
    let mut enlarged = imageops::resize(&patch, 100, 100, FilterType::Lanczos3);
    for y in [0, 1, 98, 99] {
        for x in 0..100 {
            enlarged.put_pixel(x, y, Rgb([200, 200, 200]));
        }
    }
    let mut frame = RgbImage::new(400, 300);
    imageops::replace(&mut frame, &enlarged, 20, 20);
    frame
}

fn session_config(map_path: &Path, output_dir: &Path) -> SessionConfig {
    let mut config = SessionConfig::new(MapProfile {
        name: "synthetic".to_string(),
        path: map_path.to_path_buf(),
        scale: 1.0,
    });
    config.output_dir = output_dir.to_path_buf();
    config
}

#[test]
fn test_end_to_end_route() {
    let dir = tempfile::tempdir().unwrap();
    let map = reference_map(0x5EED);
    let map_path = dir.path().join("synthetic.png");
    map.save(&map_path).unwrap();

    let route = [(100, 120), (104, 118), (110, 115), (40, 20), (150, 160)];
    let reader = MemoryReader::from_images(
        route
            .iter()
            .map(|&(x0, y0)| game_frame(&map, x0, y0))
            .collect(),
    );

    let mut config = session_config(&map_path, dir.path());
    config.save_img = true;

    let report = run_session(&config, reader, CancelToken::new()).unwrap();
    assert_eq!(report.region, Some(MINIMAP));
    assert_eq!(report.frames_sampled, 5);
    assert_eq!(report.points, 5);
    assert_eq!(report.points_presented, 5);
    assert!(!report.stopped_by_user);

    // 每个点应画在 (x0 + w/2, y0 + h/2)
    let trail = image::open(config.route_image_path()).unwrap().to_rgb8();
    for &(x0, y0) in &route {
        let (cx, cy) = (x0 + MINIMAP.width() / 2, y0 + MINIMAP.height() / 2);
        let Rgb([r, g, b]) = *trail.get_pixel(cx, cy);
        assert!(r != g || g != b, "no colored marker at ({}, {})", cx, cy);
    }
}

#[test]
fn test_calibrated_points_at_scaled_centers() {
    let map = calibrated_map(0x71);
    let mut config = session_config(Path::new("unused.png"), Path::new("."));
    config.map.scale = 0.71;
    let mut processor = FrameProcessor::new(TemplateMatcher::new(&map, 0.71), &config);

    for (index, &(x0, y0)) in [(100u32, 120u32), (30, 60), (150, 10)].iter().enumerate() {
        let frame = Frame {
            index: index as u64,
            image: calibrated_frame(&map, x0, y0),
        };
        let point = processor.process(&frame).unwrap();
        assert_eq!(point.position, Point::new(x0 as i32 + 35, y0 as i32 + 35));
    }
    assert_eq!(processor.region(), Some(Rectangle::new(20, 20, 120, 120)));
}

#[test]
fn test_calibrated_session() {
    let dir = tempfile::tempdir().unwrap();
    let map = calibrated_map(0x0710);
    let map_path = dir.path().join("synthetic.png");
    map.save(&map_path).unwrap();

    let route = [(60, 80), (64, 84), (70, 90)];
    let reader = MemoryReader::from_images(
        route
            .iter()
            .map(|&(x0, y0)| calibrated_frame(&map, x0, y0))
            .collect(),
    );
    let mut config = session_config(&map_path, dir.path());
    config.map.scale = 0.71;
    config.save_img = true;

    let report = run_session(&config, reader, CancelToken::new()).unwrap();
    assert_eq!(report.region, Some(Rectangle::new(20, 20, 120, 120)));
    assert_eq!(report.points, 3);
    assert_eq!(report.match_failures, 0);

    let trail = image::open(config.route_image_path()).unwrap().to_rgb8();
    for &(x0, y0) in &route {
        let Rgb([r, g, b]) = *trail.get_pixel(x0 + 35, y0 + 35);
        assert!(r != g || g != b, "no colored marker at ({}, {})", x0 + 35, y0 + 35);
    }
}

#[test]
fn test_stride_sampling_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let map = reference_map(7);
    let map_path = dir.path().join("synthetic.png");
    map.save(&map_path).unwrap();

    // 12 帧, 第 4 帧为空
    let frames: Vec<Option<RgbImage>> = (0..12)
        .map(|i| (i != 4).then(|| game_frame(&map, 20 + i * 5, 30)))
        .collect();

    let mut config = session_config(&map_path, dir.path());
    config.frame_interval = 4;
    let report = run_session(&config, MemoryReader::new(frames), CancelToken::new()).unwrap();

    // 采样位置 0, 4(空) → 5, 9
    assert_eq!(report.frames_read, 12);
    assert_eq!(report.empty_frames, 1);
    assert_eq!(report.frames_sampled, 3);
    assert_eq!(report.points, 3);
}

#[test]
fn test_no_minimap_closes_every_queue() {
    let dir = tempfile::tempdir().unwrap();
    let map_path = dir.path().join("synthetic.png");
    reference_map(1).save(&map_path).unwrap();

    let blank = vec![RgbImage::new(320, 240); 6];
    let config = session_config(&map_path, dir.path());
    let report = run_session(&config, MemoryReader::from_images(blank), CancelToken::new()).unwrap();

    assert_eq!(report.frames_sampled, 6);
    assert_eq!(report.detection_failures, 6);
    assert_eq!(report.points, 0);
    assert_eq!(report.region, None);
    assert!(!config.route_image_path().exists());
}

#[test]
fn test_empty_stream() {
    let dir = tempfile::tempdir().unwrap();
    let map_path = dir.path().join("synthetic.png");
    reference_map(2).save(&map_path).unwrap();

    let config = session_config(&map_path, dir.path());
    let report = run_session(&config, MemoryReader::new(Vec::new()), CancelToken::new()).unwrap();
    assert_eq!(report, pipeline::SessionReport::default());
}

#[test]
fn test_missing_map_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let config = session_config(&dir.path().join("nope.png"), dir.path());
    let err = run_session(&config, MemoryReader::new(Vec::new()), CancelToken::new()).unwrap_err();
    assert!(matches!(err, cartographer_rs::CartographerError::MapLoad { .. }));
}

#[test]
fn test_source_backpressure_keeps_every_sample() {
    let frames = vec![RgbImage::new(8, 8); 50];
    let (tx, rx) = bounded::<Frame>(1);
    let cancel = CancelToken::new();

    let handle = {
        let cancel = cancel.clone();
        thread::spawn(move || source::run(MemoryReader::from_images(frames), 3, tx, &cancel))
    };

    let mut received = Vec::new();
    for frame in rx.iter() {
        thread::sleep(Duration::from_millis(2));
        received.push(frame.index);
    }
    let stats = handle.join().unwrap();

    let expected: Vec<u64> = (0..50).step_by(3).collect();
    assert_eq!(received, expected);
    assert_eq!(stats.frames_sampled, expected.len() as u64);
}

#[test]
fn test_cancel_unblocks_stalled_source() {
    let frames = vec![RgbImage::new(8, 8); 100];
    let (tx, rx) = bounded::<Frame>(2);
    let cancel = CancelToken::new();

    let handle = {
        let cancel = cancel.clone();
        thread::spawn(move || source::run(MemoryReader::from_images(frames), 1, tx, &cancel))
    };

    // 不消费: 帧源在队列满后阻塞
    thread::sleep(Duration::from_millis(50));
    cancel.cancel();
    let stats = handle.join().unwrap();

    assert!(stats.frames_sampled <= 3);
    assert!(stats.frames_read < 100);
    drop(rx);
}
