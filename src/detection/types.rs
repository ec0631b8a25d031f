/// 检测系统数据结构定义
/// Data structures for minimap detection and map localization

// ========== 几何类型 ==========

/// 整数二维点
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// 轴对齐矩形, min包含 max不包含
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rectangle {
    pub min: Point,
    pub max: Point,
}

impl Rectangle {
    /// 由两个角点构造, 自动规范化使 min <= max
    pub fn new(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        Self {
            min: Point::new(x0.min(x1), y0.min(y1)),
            max: Point::new(x0.max(x1), y0.max(y1)),
        }
    }

    pub fn from_origin_size(origin: Point, width: u32, height: u32) -> Self {
        Self::new(
            origin.x,
            origin.y,
            origin.x + width as i32,
            origin.y + height as i32,
        )
    }

    pub fn width(&self) -> u32 {
        (self.max.x - self.min.x) as u32
    }

    pub fn height(&self) -> u32 {
        (self.max.y - self.min.y) as u32
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// 宽高比 w/h (高为0时为无穷大)
    pub fn aspect_ratio(&self) -> f32 {
        self.width() as f32 / self.height() as f32
    }

    /// 中心点 (整数除法)
    pub fn center(&self) -> Point {
        Point::new(
            self.min.x + self.width() as i32 / 2,
            self.min.y + self.height() as i32 / 2,
        )
    }

    /// 两个矩形的外接并集
    pub fn union(&self, other: &Rectangle) -> Rectangle {
        Rectangle {
            min: Point::new(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
            max: Point::new(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
        }
    }

    /// 裁剪到 [0, width) x [0, height) 范围内
    pub fn clamp_to(&self, width: u32, height: u32) -> Rectangle {
        let (w, h) = (width as i32, height as i32);
        Rectangle::new(
            self.min.x.clamp(0, w),
            self.min.y.clamp(0, h),
            self.max.x.clamp(0, w),
            self.max.y.clamp(0, h),
        )
    }
}

impl std::fmt::Display for Rectangle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({}, {})-({}, {})",
            self.min.x, self.min.y, self.max.x, self.max.y
        )
    }
}

/// 候选区域: 轮廓外接矩形 + 面积 + 宽高比 (仅检测过程中存在)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateRegion {
    pub rect: Rectangle,
    pub area: f64,
    pub aspect_ratio: f32,
}

// ========== 流水线消息 ==========

/// 地图坐标系中的定位点 (处理线程 → 展示线程)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalizedPoint {
    pub frame_index: u64, // 对应的帧序号
    pub position: Point,
    pub score: f32, // 相关系数, 仅用于日志
}
