/// 错误类型定义
/// Error taxonomy of a tracking session
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CartographerError {
    /// 视频流无法打开 (会话级致命错误)
    #[error("cannot open video stream {path}: {reason}")]
    StreamOpen { path: PathBuf, reason: String },

    /// 小地图区域未找到 (单帧可恢复)
    #[error("could not find minimap rectangle: {0}")]
    DetectionFailed(String),

    /// 模板尺寸无法参与匹配 (单帧可恢复)
    #[error("template {template_width}x{template_height} cannot be matched against map {map_width}x{map_height}")]
    MatchImpossible {
        template_width: u32,
        template_height: u32,
        map_width: u32,
        map_height: u32,
    },

    /// 未知地图名称 (致命)
    #[error("unknown map: {0}")]
    UnknownMap(String),

    #[error("failed to load map image {path}: {source}")]
    MapLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to write {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("invalid map profile file {path}: {reason}")]
    Config { path: PathBuf, reason: String },

    #[error("failed to spawn {name} thread: {source}")]
    Spawn {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },
}

impl CartographerError {
    /// 单帧错误: 丢弃该帧, 会话继续
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CartographerError::DetectionFailed(_)
                | CartographerError::MatchImpossible { .. }
                | CartographerError::Persist { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, CartographerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_frame_errors_recoverable() {
        assert!(CartographerError::DetectionFailed("aspect".into()).is_recoverable());
        assert!(!CartographerError::UnknownMap("kings canyon".into()).is_recoverable());
        assert!(!CartographerError::StreamOpen {
            path: PathBuf::from("missing.mp4"),
            reason: "no such file".into(),
        }
        .is_recoverable());
    }

    #[test]
    fn test_unknown_map_message() {
        let err = CartographerError::UnknownMap("worlds-edge".into());
        assert_eq!(err.to_string(), "unknown map: worlds-edge");
    }
}
