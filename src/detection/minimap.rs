// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// 小地图区域检测器
/// Minimap region detector
///
/// 小地图由若干细长的边框/括号形状组成, 不是一个实心块:
/// 取所有候选轮廓外接矩形的并集作为小地图区域, 再用宽高比做合理性检查。
use super::types::{CandidateRegion, Rectangle};
use crate::error::{CartographerError, Result};
use crate::utils::imgproc::{bounding_rect, contour_area, external_contours};
use image::GrayImage;

/// 检测参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorParams {
    pub min_area: f64,            // 候选轮廓最小面积
    pub min_aspect_ratio: f32,    // 候选轮廓最小宽高比
    pub max_region_aspect: f32,   // 并集区域宽高比上限
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            min_area: 10.0,
            min_aspect_ratio: 3.0,
            max_region_aspect: 2.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MinimapDetector {
    params: DetectorParams,
}

impl MinimapDetector {
    pub fn new(params: DetectorParams) -> Self {
        Self { params }
    }

    /// 在二值图中寻找小地图区域
    pub fn detect(&self, binary: &GrayImage) -> Result<Rectangle> {
        let candidates = self.candidates(binary);
        log::debug!("minimap candidates: {}", candidates.len());
        self.aggregate(&candidates)
    }

    /// 步骤1+2: 外轮廓 → 面积/宽高比过滤
    pub fn candidates(&self, binary: &GrayImage) -> Vec<CandidateRegion> {
        external_contours(binary)
            .iter()
            .filter_map(|contour| {
                let rect = bounding_rect(contour);
                let candidate = CandidateRegion {
                    rect,
                    area: contour_area(contour),
                    aspect_ratio: rect.aspect_ratio(),
                };
                self.accepts(&candidate).then_some(candidate)
            })
            .collect()
    }

    fn accepts(&self, candidate: &CandidateRegion) -> bool {
        candidate.area > self.params.min_area
            && candidate.aspect_ratio > self.params.min_aspect_ratio
    }

    /// 步骤3+4: 并集 → 宽高比检查
    pub fn aggregate(&self, candidates: &[CandidateRegion]) -> Result<Rectangle> {
        let region = candidates
            .iter()
            .map(|c| c.rect)
            .reduce(|acc, rect| acc.union(&rect))
            .ok_or_else(|| CartographerError::DetectionFailed("no candidate shapes".into()))?;

        let aspect = region.aspect_ratio();
        if aspect < self.params.max_region_aspect {
            Ok(region)
        } else {
            Err(CartographerError::DetectionFailed(format!(
                "region {} has aspect ratio {:.2}, expected below {:.2}",
                region, aspect, self.params.max_region_aspect
            )))
        }
    }
}
