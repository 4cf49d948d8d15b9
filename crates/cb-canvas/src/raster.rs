//! Software compositing of strokes over a background raster.
//!
//! Each stroke is turned into a coverage mask (distance to the polyline,
//! with a one pixel soft edge) and blended once, src-over. Measuring
//! distance to every segment gives round caps and round joins, and a
//! single-point stroke becomes a dot.

use std::io::Cursor;
use glam::Vec2;
use image::imageops::{self, FilterType};
use image::{ImageFormat, Rgba, RgbaImage};
use crate::error::{CanvasError, Result};
use crate::stroke::Stroke;

/// Export resolution relative to on-screen rendering.
pub const EXPORT_SCALE: u32 = 2;

/// Draw `strokes` in order over a copy of `background`, with every
/// coordinate and width multiplied by `scale`. The background must already
/// be at the target resolution.
pub fn composite<'a>(background: &RgbaImage, strokes: impl IntoIterator<Item = &'a Stroke>, scale: f32) -> RgbaImage {
    let mut target = background.clone();
    for stroke in strokes {
        draw_stroke(&mut target, stroke, scale);
    }
    target
}

/// Upscale `background` by [`EXPORT_SCALE`] and composite the strokes on it.
pub fn composite_export<'a>(background: &RgbaImage, strokes: impl IntoIterator<Item = &'a Stroke>) -> RgbaImage {
    let scaled = imageops::resize(
        background,
        background.width() * EXPORT_SCALE,
        background.height() * EXPORT_SCALE,
        FilterType::Triangle,
    );
    composite(&scaled, strokes, EXPORT_SCALE as f32)
}

pub fn draw_stroke(target: &mut RgbaImage, stroke: &Stroke, scale: f32) {
    let (width, height) = target.dimensions();
    if width == 0 || height == 0 || stroke.points().is_empty() {
        return;
    }

    let radius = stroke.width().get() * scale / 2.0;
    let (min, max) = stroke.bounds();
    let min = min * scale - Vec2::ONE;
    let max = max * scale + Vec2::ONE;

    let x0 = min.x.floor().max(0.0) as u32;
    let y0 = min.y.floor().max(0.0) as u32;
    let x1 = (max.x.ceil().max(0.0) as u32).min(width);
    let y1 = (max.y.ceil().max(0.0) as u32).min(height);
    if x0 >= x1 || y0 >= y1 {
        return;
    }

    let mask_w = (x1 - x0) as usize;
    let mut mask = vec![0f32; mask_w * (y1 - y0) as usize];

    let points: Vec<Vec2> = stroke.points().iter().map(|p| *p * scale).collect();
    let segments: Vec<(Vec2, Vec2)> = if points.len() == 1 {
        vec![(points[0], points[0])]
    } else {
        points.windows(2).map(|w| (w[0], w[1])).collect()
    };

    for (a, b) in segments {
        let lo = a.min(b) - Vec2::splat(radius + 1.0);
        let hi = a.max(b) + Vec2::splat(radius + 1.0);
        let sx0 = (lo.x.floor().max(x0 as f32) as u32).min(x1);
        let sy0 = (lo.y.floor().max(y0 as f32) as u32).min(y1);
        let sx1 = (hi.x.ceil().max(0.0) as u32).min(x1);
        let sy1 = (hi.y.ceil().max(0.0) as u32).min(y1);

        for y in sy0..sy1 {
            for x in sx0..sx1 {
                let center = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                let coverage = (radius + 0.5 - segment_distance(center, a, b)).clamp(0.0, 1.0);
                if coverage > 0.0 {
                    let cell = &mut mask[(y - y0) as usize * mask_w + (x - x0) as usize];
                    *cell = cell.max(coverage);
                }
            }
        }
    }

    let [r, g, b, a] = stroke.color().0;
    for y in y0..y1 {
        for x in x0..x1 {
            let coverage = mask[(y - y0) as usize * mask_w + (x - x0) as usize];
            if coverage <= 0.0 {
                continue;
            }
            let alpha = (a as f32 * coverage).round().clamp(0.0, 255.0) as u8;
            let dst = *target.get_pixel(x, y);
            target.put_pixel(x, y, alpha_blend(dst, Rgba([r, g, b, alpha])));
        }
    }
}

fn segment_distance(p: Vec2, a: Vec2, b: Vec2) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq <= f32::EPSILON {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

/// Simple alpha-composite: src over dst.
fn alpha_blend(dst: Rgba<u8>, src: Rgba<u8>) -> Rgba<u8> {
    if src[3] == 0 { return dst; }
    if src[3] == 255 || dst[3] == 0 { return src; }
    let sa = src[3] as f32 / 255.0;
    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a < 0.001 { return Rgba([0, 0, 0, 0]); }
    let inv = 1.0 / out_a;
    let channel = |i: usize| {
        ((src[i] as f32 * sa + dst[i] as f32 * da * (1.0 - sa)) * inv).round().clamp(0.0, 255.0) as u8
    };
    Rgba([channel(0), channel(1), channel(2), (out_a * 255.0).round().clamp(0.0, 255.0) as u8])
}

/// Decode fetched bytes (PNG, JPEG or WebP) into a background raster.
pub fn decode_background(bytes: &[u8]) -> Result<RgbaImage> {
    let image = image::load_from_memory(bytes).map_err(CanvasError::Decode)?.to_rgba8();
    if image.width() == 0 || image.height() == 0 {
        return Err(CanvasError::EmptyBackground);
    }
    Ok(image)
}

/// Plain white sheet shown when the real background could not be loaded.
pub fn placeholder_background(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_pixel(width.max(1), height.max(1), Rgba([255, 255, 255, 255]))
}

pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, ImageFormat::Png).map_err(CanvasError::Encode)?;
    Ok(out.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stroke::{BrushWidth, StrokeColor};

    #[test]
    fn test_single_point_renders_dot() {
        let background = placeholder_background(32, 32);
        let stroke = Stroke::new(Vec2::new(16.0, 16.0), StrokeColor::BLUE, BrushWidth::new(8.0));
        let out = composite(&background, [&stroke], 1.0);

        assert_eq!(*out.get_pixel(16, 16), Rgba(StrokeColor::BLUE.0));
        assert_eq!(*out.get_pixel(0, 0), Rgba([255, 255, 255, 255]));
        assert_eq!(*out.get_pixel(16, 25), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_segment_is_capped_round() {
        let background = placeholder_background(64, 32);
        let mut stroke = Stroke::new(Vec2::new(10.0, 16.0), StrokeColor::RED, BrushWidth::new(10.0));
        stroke.push(Vec2::new(50.0, 16.0));
        let out = composite(&background, [&stroke], 1.0);

        assert_eq!(*out.get_pixel(30, 16), Rgba(StrokeColor::RED.0));
        // inside the cap beyond the end point
        assert_eq!(*out.get_pixel(52, 16), Rgba(StrokeColor::RED.0));
        // cap corner stays clear
        assert_eq!(*out.get_pixel(54, 20), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_translucent_stroke_blends_once_at_joins() {
        let background = placeholder_background(40, 40);
        let color = StrokeColor::rgba(0, 0, 0, 128);
        let mut stroke = Stroke::new(Vec2::new(5.0, 20.0), color, BrushWidth::new(6.0));
        stroke.push(Vec2::new(20.0, 20.0));
        stroke.push(Vec2::new(20.0, 35.0));
        let out = composite(&background, [&stroke], 1.0);

        let joint = out.get_pixel(20, 20);
        let middle = out.get_pixel(12, 20);
        assert_eq!(joint, middle);
    }

    #[test]
    fn test_export_doubles_resolution() {
        let background = placeholder_background(20, 10);
        let stroke = Stroke::new(Vec2::new(5.0, 5.0), StrokeColor::GREEN, BrushWidth::new(4.0));
        let out = composite_export(&background, [&stroke]);

        assert_eq!(out.dimensions(), (40, 20));
        assert_eq!(*out.get_pixel(10, 10), Rgba(StrokeColor::GREEN.0));
    }

    #[test]
    fn test_strokes_outside_canvas_are_ignored() {
        let background = placeholder_background(10, 10);
        let stroke = Stroke::new(Vec2::new(-50.0, -50.0), StrokeColor::RED, BrushWidth::new(4.0));
        assert_eq!(composite(&background, [&stroke], 1.0), background);
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(matches!(decode_background(b"not an image"), Err(CanvasError::Decode(_))));
    }

    #[test]
    fn test_png_round_trip_keeps_pixels() {
        let image = placeholder_background(3, 2);
        let decoded = decode_background(&encode_png(&image).unwrap()).unwrap();
        assert_eq!(decoded, image);
    }
}
