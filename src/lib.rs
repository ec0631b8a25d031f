// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
pub mod config; // 会话配置与地图档案
pub mod detection; // 小地图检测与地图定位
pub mod error; // 错误类型
pub mod input; // 视频输入系统
pub mod pipeline; // 三阶段流水线
#[cfg(feature = "display")]
pub mod renderer; // 实时路线窗口
pub mod utils; // 颜色与图像工具

pub use crate::config::{Args, MapProfile, MapRegistry, SessionConfig};
pub use crate::detection::{LocalizedPoint, MinimapDetector, Point, Rectangle, TemplateMatcher};
pub use crate::error::{CartographerError, Result};
pub use crate::input::{open_stream, FrameReader};
pub use crate::pipeline::{run_session, CancelToken, SessionReport};
