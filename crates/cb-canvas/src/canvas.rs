use glam::Vec2;
use image::RgbaImage;
use log::debug;
use serde::{Deserialize, Serialize};
use crate::error::{CanvasError, Result};
use crate::raster;
use crate::stroke::{BrushWidth, Stroke, StrokeColor};

/// Finalized strokes plus at most one stroke being drawn.
///
/// Only finalized strokes are serialized; a half-drawn gesture is not part
/// of a saved session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanvasState {
    strokes: Vec<Stroke>,
    #[serde(skip)]
    active: Option<Stroke>,
}

impl CanvasState {
    pub fn new() -> Self {
        Self::default()
    }

    /// No-op while another stroke is in progress.
    pub fn begin_stroke(&mut self, point: Vec2, color: StrokeColor, width: BrushWidth) {
        if self.active.is_some() {
            return;
        }
        self.active = Some(Stroke::new(point, color, width));
    }

    pub fn extend_stroke(&mut self, point: Vec2) {
        if let Some(stroke) = self.active.as_mut() {
            stroke.push(point);
        }
    }

    pub fn end_stroke(&mut self) {
        if let Some(stroke) = self.active.take() {
            debug!("stroke finalized with {} points", stroke.points().len());
            self.strokes.push(stroke);
        }
    }

    /// Removes and returns the most recently finalized stroke.
    pub fn undo(&mut self) -> Option<Stroke> {
        self.strokes.pop()
    }

    pub fn clear(&mut self) {
        self.strokes.clear();
        self.active = None;
    }

    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    pub fn active(&self) -> Option<&Stroke> {
        self.active.as_ref()
    }

    pub fn is_drawing(&self) -> bool {
        self.active.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty() && self.active.is_none()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// A coloring page: a fixed background with the user's strokes on top.
#[derive(Debug, Clone)]
pub struct ColoringCanvas {
    background: RgbaImage,
    state: CanvasState,
    selected_color: StrokeColor,
    selected_width: BrushWidth,
}

impl ColoringCanvas {
    pub fn new(background: RgbaImage) -> Result<Self> {
        if background.width() == 0 || background.height() == 0 {
            return Err(CanvasError::EmptyBackground);
        }
        Ok(Self {
            background,
            state: CanvasState::default(),
            selected_color: StrokeColor::default(),
            selected_width: BrushWidth::default(),
        })
    }

    /// Decode fetched image bytes and open a canvas on them.
    pub fn from_encoded(bytes: &[u8]) -> Result<Self> {
        Self::new(raster::decode_background(bytes)?)
    }

    /// Replace the stroke history, e.g. with a saved session.
    pub fn with_state(mut self, state: CanvasState) -> Self {
        self.state = state;
        self
    }

    pub fn background(&self) -> &RgbaImage {
        &self.background
    }

    pub fn state(&self) -> &CanvasState {
        &self.state
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.background.dimensions()
    }

    pub fn selected_color(&self) -> StrokeColor {
        self.selected_color
    }

    pub fn selected_width(&self) -> BrushWidth {
        self.selected_width
    }

    pub fn select_color(&mut self, color: StrokeColor) {
        self.selected_color = color;
    }

    pub fn select_width(&mut self, width: BrushWidth) {
        self.selected_width = width;
    }

    pub fn begin_stroke(&mut self, point: Vec2, color: StrokeColor, width: BrushWidth) {
        self.state.begin_stroke(point, color, width);
    }

    pub fn extend_stroke(&mut self, point: Vec2) {
        self.state.extend_stroke(point);
    }

    pub fn end_stroke(&mut self) {
        self.state.end_stroke();
    }

    pub fn undo(&mut self) -> Option<Stroke> {
        let undone = self.state.undo();
        if undone.is_some() {
            debug!("undo, {} strokes left", self.state.strokes().len());
        }
        undone
    }

    pub fn clear(&mut self) {
        debug!("clearing {} strokes", self.state.strokes().len());
        self.state.clear();
    }

    /// Pointer-down with the current selection.
    pub fn pointer_down(&mut self, point: Vec2) {
        self.begin_stroke(point, self.selected_color, self.selected_width);
    }

    pub fn pointer_move(&mut self, point: Vec2) {
        self.extend_stroke(point);
    }

    pub fn pointer_up(&mut self) {
        self.end_stroke();
    }

    /// On-screen composite, with the in-progress stroke drawn last.
    pub fn render(&self) -> RgbaImage {
        raster::composite(
            &self.background,
            self.state.strokes().iter().chain(self.state.active()),
            1.0,
        )
    }

    /// Flattened raster at [`raster::EXPORT_SCALE`] for saving outside the app.
    pub fn export(&self) -> RgbaImage {
        raster::composite_export(&self.background, self.state.strokes())
    }

    pub fn export_png(&self) -> Result<Vec<u8>> {
        raster::encode_png(&self.export())
    }
}
