use std::str::FromStr;
use glam::Vec2;
use serde::{Deserialize, Serialize};
use crate::error::CanvasError;

/// Straight (non-premultiplied) RGBA8 color of a stroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StrokeColor(pub [u8; 4]);

impl StrokeColor {
    pub const BLACK: Self = Self::rgb(0x22, 0x22, 0x22);
    pub const RED: Self = Self::rgb(0xe5, 0x39, 0x35);
    pub const ORANGE: Self = Self::rgb(0xfb, 0x8c, 0x00);
    pub const YELLOW: Self = Self::rgb(0xfd, 0xd8, 0x35);
    pub const GREEN: Self = Self::rgb(0x43, 0xa0, 0x47);
    pub const BLUE: Self = Self::rgb(0x1e, 0x88, 0xe5);
    pub const PURPLE: Self = Self::rgb(0x8e, 0x24, 0xaa);
    pub const PINK: Self = Self::rgb(0xf0, 0x62, 0x92);
    pub const BROWN: Self = Self::rgb(0x6d, 0x4c, 0x41);
    pub const WHITE: Self = Self::rgb(0xff, 0xff, 0xff);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b, 255])
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self([r, g, b, a])
    }

    pub fn alpha(&self) -> u8 {
        self.0[3]
    }

    /// The crayon box offered to the user.
    pub fn palette() -> [(&'static str, StrokeColor); 10] {
        [
            ("black", Self::BLACK),
            ("red", Self::RED),
            ("orange", Self::ORANGE),
            ("yellow", Self::YELLOW),
            ("green", Self::GREEN),
            ("blue", Self::BLUE),
            ("purple", Self::PURPLE),
            ("pink", Self::PINK),
            ("brown", Self::BROWN),
            ("white", Self::WHITE),
        ]
    }
}

impl Default for StrokeColor {
    fn default() -> Self {
        Self::BLACK
    }
}

impl FromStr for StrokeColor {
    type Err = CanvasError;

    /// Accepts a palette name, `#rrggbb` or `#rrggbbaa`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some((_, color)) = Self::palette().into_iter().find(|(name, _)| name.eq_ignore_ascii_case(s)) {
            return Ok(color);
        }

        let invalid = || CanvasError::InvalidColor(s.to_string());
        let hex = s.strip_prefix('#').ok_or_else(invalid)?;
        if !(hex.len() == 6 || hex.len() == 8) || !hex.is_ascii() {
            return Err(invalid());
        }

        let mut channels = [255u8; 4];
        for (i, channel) in channels.iter_mut().enumerate().take(hex.len() / 2) {
            *channel = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).map_err(|_| invalid())?;
        }
        Ok(Self(channels))
    }
}

/// Brush diameter in canvas pixels, always within `[MIN, MAX]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(from = "f32", into = "f32")]
pub struct BrushWidth(f32);

impl BrushWidth {
    pub const MIN: f32 = 2.0;
    pub const MAX: f32 = 20.0;

    pub fn new(width: f32) -> Self {
        if width.is_nan() {
            return Self::default();
        }
        Self(width.clamp(Self::MIN, Self::MAX))
    }

    pub fn get(&self) -> f32 {
        self.0
    }
}

impl Default for BrushWidth {
    fn default() -> Self {
        Self(8.0)
    }
}

impl From<f32> for BrushWidth {
    fn from(width: f32) -> Self {
        Self::new(width)
    }
}

impl From<BrushWidth> for f32 {
    fn from(width: BrushWidth) -> Self {
        width.0
    }
}

/// One continuous freehand gesture. Style is fixed when the stroke begins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    points: Vec<Vec2>,
    color: StrokeColor,
    width: BrushWidth,
}

impl Stroke {
    pub fn new(start: Vec2, color: StrokeColor, width: BrushWidth) -> Self {
        Self {
            points: vec![start],
            color,
            width,
        }
    }

    pub(crate) fn push(&mut self, point: Vec2) {
        self.points.push(point);
    }

    pub fn points(&self) -> &[Vec2] {
        &self.points
    }

    pub fn color(&self) -> StrokeColor {
        self.color
    }

    pub fn width(&self) -> BrushWidth {
        self.width
    }

    /// Axis-aligned bounds including the brush radius, as (min, max).
    pub fn bounds(&self) -> (Vec2, Vec2) {
        let radius = Vec2::splat(self.width.get() / 2.0);
        let (min, max) = self.points.iter().fold(
            (Vec2::splat(f32::INFINITY), Vec2::splat(f32::NEG_INFINITY)),
            |(min, max), p| (min.min(*p), max.max(*p)),
        );
        (min - radius, max + radius)
    }
}
