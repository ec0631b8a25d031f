// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// 比例校正模板匹配器
/// Scale-corrected template matcher
///
/// 小地图模板按固定校准系数缩放到参考地图的像素比例, 然后在整张地图上做
/// 归一化互相关, 取全局最大响应位置。不做置信度过滤: 每帧必出一个点。
use super::types::{Point, Rectangle};
use crate::error::{CartographerError, Result};
use crate::utils::imgproc::{crop, crop_top_left_quadrant, rescale};
use image::imageops::{self, FilterType};
use image::{GrayImage, ImageBuffer, Luma, RgbImage};
use imageproc::template_matching::{match_template, MatchTemplateMethod};

/// 单次匹配结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapMatch {
    pub rect: Rectangle, // 地图上的匹配矩形
    pub center: Point,   // 匹配矩形中心 = 定位点
    pub score: f32,
}

pub struct TemplateMatcher {
    map: GrayImage,
    scale: f64,
    filter: FilterType,
}

impl TemplateMatcher {
    /// `scale`: 校准系数C (小地图在参考地图上的尺寸 / 第一人称画面中的尺寸)
    pub fn new(map: &RgbImage, scale: f64) -> Self {
        Self {
            map: imageops::grayscale(map),
            scale,
            filter: FilterType::Lanczos3,
        }
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn map_dimensions(&self) -> (u32, u32) {
        self.map.dimensions()
    }

    /// 从帧的左上四分之一区域中截取小地图模板
    pub fn extract_template(frame: &RgbImage, region: &Rectangle) -> RgbImage {
        let quadrant = crop_top_left_quadrant(frame);
        crop(&quadrant, region)
    }

    /// 截取 → 缩放 → 匹配
    pub fn locate(&self, frame: &RgbImage, region: &Rectangle) -> Result<MapMatch> {
        let template = Self::extract_template(frame, region);
        let scaled = rescale(&template, self.scale, self.filter);
        self.match_scaled(&scaled)
    }

    /// 对已缩放的模板做匹配
    pub fn match_scaled(&self, template: &RgbImage) -> Result<MapMatch> {
        let (tw, th) = template.dimensions();
        let (mw, mh) = self.map.dimensions();
        if tw == 0 || th == 0 || tw > mw || th > mh {
            return Err(CartographerError::MatchImpossible {
                template_width: tw,
                template_height: th,
                map_width: mw,
                map_height: mh,
            });
        }

        let template = imageops::grayscale(template);
        let scores = match_template(
            &self.map,
            &template,
            MatchTemplateMethod::CrossCorrelationNormalized,
        );
        let (origin, score) = global_max_location(&scores);

        let rect = Rectangle::from_origin_size(origin, tw, th);
        Ok(MapMatch {
            rect,
            center: rect.center(),
            score,
        })
    }
}

/// 全局最大响应位置 (取第一个最大值, 跳过NaN)
pub fn global_max_location(scores: &ImageBuffer<Luma<f32>, Vec<f32>>) -> (Point, f32) {
    let mut best = (Point::default(), f32::NEG_INFINITY);
    for (x, y, Luma([score])) in scores.enumerate_pixels() {
        if score.is_finite() && *score > best.1 {
            best = (Point::new(x as i32, y as i32), *score);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    /// 确定性纹理 (避免零方差区域)
    fn textured_map(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            let v = (x.wrapping_mul(73) ^ y.wrapping_mul(151)).wrapping_mul(2654435761) >> 24;
            let v = (v % 250 + 5) as u8;
            Rgb([v, v.wrapping_mul(3), v / 2 + 7])
        })
    }

    #[test]
    fn test_match_exact_subimage() {
        let map = textured_map(120, 90);
        let matcher = TemplateMatcher::new(&map, 1.0);

        let template = crop(&map, &Rectangle::new(40, 25, 61, 38));
        let found = matcher.match_scaled(&template).unwrap();

        assert_eq!(found.rect, Rectangle::new(40, 25, 61, 38));
        assert_eq!(found.center, Point::new(40 + 21 / 2, 25 + 13 / 2));
        assert!(found.score > 0.99);
    }

    #[test]
    fn test_locate_uses_quadrant_and_region() {
        let map = textured_map(100, 100);
        let matcher = TemplateMatcher::new(&map, 1.0);

        // 把地图的一块贴到帧左上区域的 (10, 12)
        let patch = crop(&map, &Rectangle::new(55, 60, 75, 78));
        let mut frame = RgbImage::new(160, 120);
        imageops::replace(&mut frame, &patch, 10, 12);

        let region = Rectangle::new(10, 12, 30, 30);
        let found = matcher.locate(&frame, &region).unwrap();
        assert_eq!(found.rect.min, Point::new(55, 60));
        assert_eq!(found.center, Point::new(65, 69));
    }

    #[test]
    fn test_locate_rescales_by_calibration_factor() {
        let map = textured_map(256, 256);

        // 小地图在画面中比参考地图大 1/C 倍: 放大地图的一块后贴入帧中
        for (scale, size) in [(0.71, 71u32), (0.5, 50)] {
            let patch = crop(&map, &Rectangle::new(100, 120, 100 + size as i32, 120 + size as i32));
            let enlarged = imageops::resize(&patch, 100, 100, FilterType::Lanczos3);
            let mut frame = RgbImage::new(320, 240);
            imageops::replace(&mut frame, &enlarged, 10, 10);

            let matcher = TemplateMatcher::new(&map, scale);
            let found = matcher.locate(&frame, &Rectangle::new(10, 10, 110, 110)).unwrap();
            assert_eq!(found.rect.min, Point::new(100, 120), "C = {}", scale);
            assert_eq!((found.rect.width(), found.rect.height()), (size, size));
            let half = (size / 2) as i32;
            assert_eq!(found.center, Point::new(100 + half, 120 + half));
        }
    }

    #[test]
    fn test_template_larger_than_map() {
        let matcher = TemplateMatcher::new(&textured_map(20, 20), 1.0);
        let err = matcher.match_scaled(&RgbImage::new(30, 10)).unwrap_err();
        assert!(matches!(err, CartographerError::MatchImpossible { .. }));
        assert!(matcher.match_scaled(&RgbImage::new(0, 0)).is_err());
    }

    #[test]
    fn test_global_max_skips_nan() {
        let mut scores = ImageBuffer::from_pixel(4, 3, Luma([0.2f32]));
        scores.put_pixel(0, 0, Luma([f32::NAN]));
        scores.put_pixel(2, 1, Luma([0.9]));
        scores.put_pixel(3, 2, Luma([0.9]));
        assert_eq!(global_max_location(&scores), (Point::new(2, 1), 0.9));
    }
}
