pub mod canvas;
pub mod error;
pub mod raster;
pub mod stroke;

pub use canvas::{CanvasState, ColoringCanvas};
pub use error::{CanvasError, Result};
pub use raster::{decode_background, encode_png, placeholder_background, EXPORT_SCALE};
pub use stroke::{BrushWidth, Stroke, StrokeColor};

pub use glam::Vec2;
