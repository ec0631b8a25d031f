/// 会话配置 (命令行参数 + 地图档案)
/// Session configuration: CLI arguments and reference map profiles
use crate::error::{CartographerError, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use phf::phf_map;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

// ========== 内置地图档案 ==========

/// 内置地图: 图片路径 + 校准系数
#[derive(Debug, Clone, Copy)]
pub struct BuiltinMap {
    pub path: &'static str,
    pub scale: f64,
}

/// 地图名称 → 地图档案
/// scale: 小地图在参考地图上的尺寸 / 第一人称画面中的尺寸 (经验值)
pub static BUILTIN_MAPS: phf::Map<&'static str, BuiltinMap> = phf_map! {
    "olympus" => BuiltinMap { path: "resources/maps/olympus.png", scale: 0.71 },
};

pub const DEFAULT_MAP: &str = "olympus";

/// 已解析的地图档案
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapProfile {
    #[serde(skip)]
    pub name: String,
    pub path: PathBuf,
    #[serde(default = "default_scale")]
    pub scale: f64,
}

fn default_scale() -> f64 {
    1.0
}

/// 地图档案注册表: JSON文件中的档案优先于内置档案
#[derive(Debug, Clone, Default)]
pub struct MapRegistry {
    overrides: BTreeMap<String, MapProfile>,
}

impl MapRegistry {
    /// 仅内置档案
    pub fn builtin() -> Self {
        Self::default()
    }

    /// 从JSON文件加载: { "<name>": { "path": "...", "scale": 0.71 }, ... }
    pub fn load(path: &Path) -> Result<Self> {
        let config_err = |reason: String| CartographerError::Config {
            path: path.to_path_buf(),
            reason,
        };
        let json = fs::read_to_string(path).map_err(|e| config_err(e.to_string()))?;
        let mut overrides: BTreeMap<String, MapProfile> =
            serde_json::from_str(&json).map_err(|e| config_err(e.to_string()))?;

        for (name, profile) in overrides.iter_mut() {
            if !(profile.scale.is_finite() && profile.scale > 0.0) {
                return Err(config_err(format!(
                    "map {} has invalid scale {}",
                    name, profile.scale
                )));
            }
            profile.name = name.clone();
        }
        log::info!("✅ 地图档案已从 {} 加载 ({} 个)", path.display(), overrides.len());
        Ok(Self { overrides })
    }

    /// 名称 → 地图档案, 未知名称为致命错误
    pub fn resolve(&self, name: &str) -> Result<MapProfile> {
        if let Some(profile) = self.overrides.get(name) {
            return Ok(profile.clone());
        }
        BUILTIN_MAPS
            .get(name)
            .map(|builtin| MapProfile {
                name: name.to_string(),
                path: PathBuf::from(builtin.path),
                scale: builtin.scale,
            })
            .ok_or_else(|| CartographerError::UnknownMap(name.to_string()))
    }

    /// 所有已知档案, 按名称排序
    pub fn profiles(&self) -> Vec<MapProfile> {
        let mut names: Vec<&str> = BUILTIN_MAPS.keys().copied().collect();
        names.extend(self.overrides.keys().map(String::as_str));
        names.sort_unstable();
        names.dedup();
        names
            .into_iter()
            .filter_map(|name| self.resolve(name).ok())
            .collect()
    }
}

// ========== 会话配置 ==========

/// 会话配置, 构造后不可变, 显式传入每个阶段
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub frame_interval: u32, // 两次采样之间跳过的帧数 + 1
    pub map: MapProfile,
    pub debug: bool,
    pub show_gui: bool,
    pub save_img: bool,
    pub output_dir: PathBuf,
    pub marker_radius: i32,
}

impl SessionConfig {
    pub fn new(map: MapProfile) -> Self {
        Self {
            frame_interval: 1,
            map,
            debug: false,
            show_gui: false,
            save_img: false,
            output_dir: PathBuf::from("."),
            marker_radius: 3,
        }
    }

    pub fn from_track_args(args: &TrackArgs, debug: bool, registry: &MapRegistry) -> Result<Self> {
        let map = registry.resolve(&args.map)?;
        Ok(Self {
            frame_interval: args.interval.max(1),
            map,
            debug,
            show_gui: args.show,
            save_img: args.save,
            output_dir: args.output_dir.clone(),
            marker_radius: args.marker_radius,
        })
    }

    /// 路线图输出路径: <map>-route.png
    pub fn route_image_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}-route.png", self.map.name))
    }

    /// 调试模式下的小地图区域预览: <map>-minimap.png
    pub fn minimap_preview_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}-minimap.png", self.map.name))
    }
}

// ========== 命令行参数 ==========

/// 小地图路线追踪
#[derive(Parser, Debug)]
#[command(author, version, about = "根据游戏视频中的小地图追踪路线 - minimap route tracker", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// 调试模式 (debug日志 + 小地图区域预览图)
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// 额外的地图档案JSON文件
    #[arg(long, global = true)]
    pub maps: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// 追踪视频中的路线并绘制到参考地图上
    Track(TrackArgs),
    /// 只检测小地图区域并输出预览图
    Detect(DetectArgs),
    /// 列出已知地图
    Maps,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct TrackArgs {
    /// 图片序列目录, 或视频文件/camera:N (需要 --features ffmpeg)
    pub source: PathBuf,

    /// 采样间隔 (每N帧处理一帧)
    #[arg(short, long, default_value_t = 30, value_parser = clap::value_parser!(u32).range(1..))]
    pub interval: u32,

    /// 参考地图名称
    #[arg(short, long, default_value = DEFAULT_MAP)]
    pub map: String,

    /// 输出目录
    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,

    /// 实时显示路线窗口 (需要 display 特性)
    #[arg(long)]
    pub show: bool,

    /// 每个点之后保存路线图
    #[arg(long)]
    pub save: bool,

    /// 标记半径 (像素)
    #[arg(long, default_value_t = 3)]
    pub marker_radius: i32,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct DetectArgs {
    /// 图片序列目录, 或视频文件/camera:N (需要 --features ffmpeg)
    pub source: PathBuf,

    /// 预览图输出路径
    #[arg(short, long, default_value = "minimap-detect.png")]
    pub output: PathBuf,

    /// 最多尝试的帧数
    #[arg(long, default_value_t = 300)]
    pub max_frames: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_resolve_builtin() {
        let profile = MapRegistry::builtin().resolve("olympus").unwrap();
        assert_eq!(profile.name, "olympus");
        assert_eq!(profile.path, PathBuf::from("resources/maps/olympus.png"));
        assert_eq!(profile.scale, 0.71);
    }

    #[test]
    fn test_resolve_unknown() {
        let err = MapRegistry::builtin().resolve("storm-point").unwrap_err();
        assert!(matches!(err, CartographerError::UnknownMap(name) if name == "storm-point"));
    }

    #[test]
    fn test_json_overrides_builtin() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "olympus": {{ "path": "maps/olympus-hd.png", "scale": 1.42 }},
                 "canyon": {{ "path": "maps/canyon.png" }} }}"#
        )
        .unwrap();

        let registry = MapRegistry::load(file.path()).unwrap();
        let olympus = registry.resolve("olympus").unwrap();
        assert_eq!(olympus.scale, 1.42);
        assert_eq!(olympus.path, PathBuf::from("maps/olympus-hd.png"));

        let canyon = registry.resolve("canyon").unwrap();
        assert_eq!(canyon.name, "canyon");
        assert_eq!(canyon.scale, 1.0);

        let names: Vec<String> = registry.profiles().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["canyon", "olympus"]);
    }

    #[test]
    fn test_json_rejects_bad_scale() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "flat": {{ "path": "flat.png", "scale": 0.0 }} }}"#).unwrap();
        assert!(matches!(
            MapRegistry::load(file.path()),
            Err(CartographerError::Config { .. })
        ));
    }

    #[test]
    fn test_output_paths() {
        let mut config = SessionConfig::new(MapRegistry::builtin().resolve("olympus").unwrap());
        config.output_dir = PathBuf::from("out");
        assert_eq!(config.route_image_path(), PathBuf::from("out/olympus-route.png"));
        assert_eq!(config.minimap_preview_path(), PathBuf::from("out/olympus-minimap.png"));
    }

    #[test]
    fn test_parse_track_args() {
        let args = Args::try_parse_from([
            "cartographer", "track", "run.mp4", "-i", "5", "--save", "--debug",
        ])
        .unwrap();
        assert!(args.debug);
        let Command::Track(track) = args.command else {
            panic!("expected track command");
        };
        assert_eq!(track.interval, 5);
        assert_eq!(track.map, "olympus");
        assert!(track.save && !track.show);

        let config = SessionConfig::from_track_args(&track, args.debug, &MapRegistry::builtin()).unwrap();
        assert_eq!(config.frame_interval, 5);
        assert!(config.debug);
    }

    #[test]
    fn test_source_help_mentions_ffmpeg_feature() {
        use clap::CommandFactory;

        let mut cmd = Args::command();
        for name in ["track", "detect"] {
            let sub = cmd.find_subcommand_mut(name).unwrap();
            let source = sub.get_arguments().find(|a| a.get_id() == "source").unwrap();
            let help = source.get_help().unwrap().to_string();
            assert!(help.contains("--features ffmpeg"), "{}: {}", name, help);
        }
    }

    #[test]
    fn test_interval_must_be_positive() {
        assert!(Args::try_parse_from(["cartographer", "track", "run.mp4", "-i", "0"]).is_err());
    }
}
