//! Geometry and style defaults shared by overlay creation and export.
//!
//! A record whose optional geometry is unset renders with these values both
//! on the overlay and in the exported document.

use crate::Color;

pub const ORIGIN_X: f32 = 100.0;
pub const ORIGIN_Y: f32 = 100.0;

pub const TEXT_PLACEHOLDER: &str = "Type here...";
pub const TEXT_WIDTH: f32 = 200.0;
pub const FONT_SIZE: f32 = 16.0;
pub const FONT_FAMILY: &str = "Helvetica";
pub const TEXT_COLOR: Color = Color::BLACK;

pub const BOX_WIDTH: f32 = 100.0;
pub const RECTANGLE_HEIGHT: f32 = 20.0;
pub const WHITEOUT_HEIGHT: f32 = 20.0;
pub const HIGHLIGHT_HEIGHT: f32 = 14.0;
pub const IMAGE_SIZE: f32 = 100.0;
pub const CIRCLE_RADIUS: f32 = 50.0;

/// Explicit sizes written by the overlay's creation tools.
pub const CREATED_HIGHLIGHT_SIZE: (f32, f32) = (200.0, 20.0);
pub const CREATED_WHITEOUT_SIZE: (f32, f32) = (200.0, 30.0);
pub const CREATED_RECTANGLE_SIZE: (f32, f32) = (150.0, 100.0);

pub const LINE_LENGTH: f32 = 200.0;
pub const STROKE_WIDTH: f32 = 2.0;
pub const STROKE_COLOR: Color = Color::BLACK;

pub const HIGHLIGHT_COLOR: Color = Color::YELLOW;
pub const HIGHLIGHT_OPACITY: f32 = 0.3;

pub const BRUSH_COLOR: Color = Color::BLACK;
pub const BRUSH_WIDTH: f32 = 3.0;

pub const ROTATION_DELTA: i32 = 90;
