/// 检测系统 (Detection System)
///
/// 处理线程中运行, 负责小地图定位
/// - MinimapDetector: 小地图区域发现 (每次会话只成功一次)
/// - TemplateMatcher: 比例校正模板匹配 (每帧一次)
pub mod matcher;
pub mod minimap;
pub mod types;

pub use matcher::{MapMatch, TemplateMatcher};
pub use minimap::{DetectorParams, MinimapDetector};
pub use types::{CandidateRegion, LocalizedPoint, Point, Rectangle};
