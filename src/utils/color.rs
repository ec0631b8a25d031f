/// HSV颜色与色相旋转
/// HSV marker color with hue rotation
use image::{Rgb, Rgba};

/// 色相旋转方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Cw,  // 顺时针 (色相增加)
    Ccw, // 逆时针 (色相减少)
}

/// HSV颜色: 0 <= h < 360, 0 <= s,v <= 1
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsv {
    pub h: u32,
    pub s: f64,
    pub v: f64,
}

impl Default for Hsv {
    /// 纯红, 满饱和度满亮度
    fn default() -> Self {
        Self {
            h: 0,
            s: 1.0,
            v: 1.0,
        }
    }
}

impl Hsv {
    pub fn new(h: u32, s: f64, v: f64) -> Self {
        Self {
            h: h % 360,
            s: s.clamp(0.0, 1.0),
            v: v.clamp(0.0, 1.0),
        }
    }

    /// 按方向旋转色相 (模360循环)
    pub fn rotate_hue(&mut self, degrees: u32, direction: Direction) {
        let step = degrees % 360;
        self.h = match direction {
            Direction::Cw => (self.h + step) % 360,
            Direction::Ccw => (self.h + 360 - step) % 360,
        };
    }

    /// 转换为不透明RGBA (alpha = 255)
    pub fn to_rgba(&self) -> Rgba<u8> {
        let Rgb([r, g, b]) = self.to_rgb();
        Rgba([r, g, b, 255])
    }

    pub fn to_rgb(&self) -> Rgb<u8> {
        let h = (self.h % 360) as f64;
        let c = self.v * self.s;
        let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
        let m = self.v - c;

        // R' G' B'
        let (rp, gp, bp) = match self.h % 360 {
            0..=59 => (c, x, 0.0),
            60..=119 => (x, c, 0.0),
            120..=179 => (0.0, c, x),
            180..=239 => (0.0, x, c),
            240..=299 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };

        let channel = |p: f64| ((p + m) * 255.0).round().clamp(0.0, 255.0) as u8;
        Rgb([channel(rp), channel(gp), channel(bp)])
    }
}
