/// 底层图像操作封装 (image / imageproc)
/// Thin wrappers over the image primitives used by the detector and matcher
use crate::detection::types::{Point, Rectangle};
use image::imageops::{self, FilterType};
use image::{GrayImage, RgbImage};
use imageproc::contours::{find_contours, BorderType};
use imageproc::contrast::{threshold, ThresholdType};

/// 二值化阈值 (灰度 > 150 为前景)
pub const BINARY_THRESHOLD: u8 = 150;

/// 左上四分之一区域
pub fn top_left_quadrant(width: u32, height: u32) -> Rectangle {
    Rectangle::new(0, 0, (width / 2) as i32, (height / 2) as i32)
}

/// 裁剪出左上四分之一区域 (复制为新图像)
pub fn crop_top_left_quadrant(frame: &RgbImage) -> RgbImage {
    let quadrant = top_left_quadrant(frame.width(), frame.height());
    crop(frame, &quadrant)
}

/// 按矩形裁剪, 超出部分自动截断
pub fn crop(image: &RgbImage, rect: &Rectangle) -> RgbImage {
    let rect = rect.clamp_to(image.width(), image.height());
    imageops::crop_imm(
        image,
        rect.min.x as u32,
        rect.min.y as u32,
        rect.width(),
        rect.height(),
    )
    .to_image()
}

/// RGB → 灰度 → 二值图
pub fn binarize(image: &RgbImage, level: u8) -> GrayImage {
    let gray = imageops::grayscale(image);
    threshold(&gray, level, ThresholdType::Binary)
}

/// 提取最外层轮廓 (无父轮廓的外边界)
pub fn external_contours(binary: &GrayImage) -> Vec<Vec<Point>> {
    find_contours::<i32>(binary)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .map(|c| c.points.iter().map(|p| Point::new(p.x, p.y)).collect())
        .collect()
}

/// 轮廓面积 (鞋带公式, 与像素计数不同: 单像素宽的线面积为0)
pub fn contour_area(contour: &[Point]) -> f64 {
    if contour.len() < 3 {
        return 0.0;
    }
    let twice_area: i64 = contour
        .iter()
        .zip(contour.iter().cycle().skip(1))
        .map(|(a, b)| a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64)
        .sum();
    (twice_area as f64 / 2.0).abs()
}

/// 轮廓外接矩形 (max为不包含边界, 即像素坐标+1)
pub fn bounding_rect(contour: &[Point]) -> Rectangle {
    let Some(first) = contour.first() else {
        return Rectangle::default();
    };
    let (mut min, mut max) = (*first, *first);
    for p in contour {
        min.x = min.x.min(p.x);
        min.y = min.y.min(p.y);
        max.x = max.x.max(p.x);
        max.y = max.y.max(p.y);
    }
    Rectangle::new(min.x, min.y, max.x + 1, max.y + 1)
}

/// 按比例缩放, 尺寸向下取整 (至少为0)
pub fn rescale(image: &RgbImage, factor: f64, filter: FilterType) -> RgbImage {
    let width = (image.width() as f64 * factor) as u32;
    let height = (image.height() as f64 * factor) as u32;
    if width == 0 || height == 0 {
        return RgbImage::new(width, height);
    }
    if width == image.width() && height == image.height() {
        return image.clone();
    }
    imageops::resize(image, width, height, filter)
}
