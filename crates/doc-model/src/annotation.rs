//! Annotation records in overlay space.
//!
//! Geometry is stored exactly as authored on the overlay: origin at the
//! top-left of the page, Y increasing downward. Optional extents stay unset
//! until a caller provides them so a record round-trips byte-for-byte through
//! persistence; [`AnnotationShape::height`] resolves the shared defaults.

use crate::defaults;
use crate::{Color, Point};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Session-unique annotation identifier, stable across save/load.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotationId(String);

impl AnnotationId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn generate() -> Self {
        Self(format!("annot_{}", uuid::Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AnnotationId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// Semantic type tag of an annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationKind {
    Text,
    Rectangle,
    Highlight,
    Whiteout,
    Circle,
    Image,
    Line,
    Path,
}

impl AnnotationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Rectangle => "rectangle",
            Self::Highlight => "highlight",
            Self::Whiteout => "whiteout",
            Self::Circle => "circle",
            Self::Image => "image",
            Self::Line => "line",
            Self::Path => "path",
        }
    }
}

/// Axis-aligned box in overlay space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub fn contains(&self, point: &Point, tolerance: f32) -> bool {
        point.x >= self.x - tolerance
            && point.x <= self.x + self.width + tolerance
            && point.y >= self.y - tolerance
            && point.y <= self.y + self.height + tolerance
    }
}

/// Per-type geometry, tagged by the persisted `type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum AnnotationShape {
    Text {
        x: f32,
        y: f32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        width: Option<f32>,
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        font_size: Option<f32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        font_family: Option<String>,
    },
    Rectangle {
        x: f32,
        y: f32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        width: Option<f32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        height: Option<f32>,
    },
    Highlight {
        x: f32,
        y: f32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        width: Option<f32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        height: Option<f32>,
    },
    Whiteout {
        x: f32,
        y: f32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        width: Option<f32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        height: Option<f32>,
    },
    /// Circle whose bounding box starts at (`x`, `y`).
    Circle {
        x: f32,
        y: f32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        radius: Option<f32>,
    },
    Image {
        x: f32,
        y: f32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        width: Option<f32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        height: Option<f32>,
        /// Raster asset as a `data:image/...;base64,` URL.
        image_data: String,
    },
    Line {
        x: f32,
        y: f32,
        x2: f32,
        y2: f32,
    },
    Path {
        points: Vec<Point>,
    },
}

impl AnnotationShape {
    pub fn kind(&self) -> AnnotationKind {
        match self {
            Self::Text { .. } => AnnotationKind::Text,
            Self::Rectangle { .. } => AnnotationKind::Rectangle,
            Self::Highlight { .. } => AnnotationKind::Highlight,
            Self::Whiteout { .. } => AnnotationKind::Whiteout,
            Self::Circle { .. } => AnnotationKind::Circle,
            Self::Image { .. } => AnnotationKind::Image,
            Self::Line { .. } => AnnotationKind::Line,
            Self::Path { .. } => AnnotationKind::Path,
        }
    }

    /// Anchor point: top-left for boxed shapes, start point for lines, and the
    /// bounding-box corner for paths.
    pub fn origin(&self) -> Point {
        match self {
            Self::Text { x, y, .. }
            | Self::Rectangle { x, y, .. }
            | Self::Highlight { x, y, .. }
            | Self::Whiteout { x, y, .. }
            | Self::Circle { x, y, .. }
            | Self::Image { x, y, .. }
            | Self::Line { x, y, .. } => Point::new(*x, *y),
            Self::Path { .. } => {
                let bounds = self.bounds();
                Point::new(bounds.x, bounds.y)
            }
        }
    }

    pub fn width(&self) -> f32 {
        match self {
            Self::Text { width, .. } => width.unwrap_or(defaults::TEXT_WIDTH),
            Self::Rectangle { width, .. }
            | Self::Highlight { width, .. }
            | Self::Whiteout { width, .. } => width.unwrap_or(defaults::BOX_WIDTH),
            Self::Image { width, .. } => width.unwrap_or(defaults::IMAGE_SIZE),
            Self::Circle { radius, .. } => radius.unwrap_or(defaults::CIRCLE_RADIUS) * 2.0,
            Self::Line { x, x2, .. } => (x2 - x).abs(),
            Self::Path { .. } => self.bounds().width,
        }
    }

    /// Vertical extent used when mapping into document space.
    ///
    /// Text uses its font size; lines and paths are point geometry and
    /// contribute no extent.
    pub fn height(&self) -> f32 {
        match self {
            Self::Text { font_size, .. } => font_size.unwrap_or(defaults::FONT_SIZE),
            Self::Rectangle { height, .. } => height.unwrap_or(defaults::RECTANGLE_HEIGHT),
            Self::Whiteout { height, .. } => height.unwrap_or(defaults::WHITEOUT_HEIGHT),
            Self::Highlight { height, .. } => height.unwrap_or(defaults::HIGHLIGHT_HEIGHT),
            Self::Image { height, .. } => height.unwrap_or(defaults::IMAGE_SIZE),
            Self::Circle { radius, .. } => radius.unwrap_or(defaults::CIRCLE_RADIUS) * 2.0,
            Self::Line { .. } | Self::Path { .. } => 0.0,
        }
    }

    pub fn bounds(&self) -> Bounds {
        match self {
            Self::Line { x, y, x2, y2 } => Bounds {
                x: x.min(*x2),
                y: y.min(*y2),
                width: (x2 - x).abs(),
                height: (y2 - y).abs(),
            },
            Self::Path { points } => {
                let Some(first) = points.first() else {
                    return Bounds { x: 0.0, y: 0.0, width: 0.0, height: 0.0 };
                };
                let (mut min_x, mut min_y, mut max_x, mut max_y) =
                    (first.x, first.y, first.x, first.y);
                for point in points.iter().skip(1) {
                    min_x = min_x.min(point.x);
                    min_y = min_y.min(point.y);
                    max_x = max_x.max(point.x);
                    max_y = max_y.max(point.y);
                }
                Bounds { x: min_x, y: min_y, width: max_x - min_x, height: max_y - min_y }
            }
            Self::Text { x, y, text, .. } => {
                let lines = text.lines().count().max(1) as f32;
                Bounds { x: *x, y: *y, width: self.width(), height: self.height() * lines }
            }
            _ => {
                let origin = self.origin();
                Bounds { x: origin.x, y: origin.y, width: self.width(), height: self.height() }
            }
        }
    }

    /// Hit test for pointer selection.
    pub fn contains_point(&self, point: &Point, tolerance: f32) -> bool {
        match self {
            Self::Line { x, y, x2, y2 } => {
                point_near_segment(point, &Point::new(*x, *y), &Point::new(*x2, *y2), tolerance)
            }
            Self::Path { points } => match points.as_slice() {
                [] => false,
                [only] => point.distance_to(only) <= tolerance,
                _ => points
                    .windows(2)
                    .any(|pair| point_near_segment(point, &pair[0], &pair[1], tolerance)),
            },
            Self::Circle { x, y, radius } => {
                let r = radius.unwrap_or(defaults::CIRCLE_RADIUS);
                let center = Point::new(x + r, y + r);
                point.distance_to(&center) <= r + tolerance
            }
            _ => self.bounds().contains(point, tolerance),
        }
    }

    /// Copy of the shape shifted by (`dx`, `dy`) in overlay space.
    pub fn translated(&self, dx: f32, dy: f32) -> Self {
        let mut shape = self.clone();
        match &mut shape {
            Self::Text { x, y, .. }
            | Self::Rectangle { x, y, .. }
            | Self::Highlight { x, y, .. }
            | Self::Whiteout { x, y, .. }
            | Self::Circle { x, y, .. }
            | Self::Image { x, y, .. } => {
                *x += dx;
                *y += dy;
            }
            Self::Line { x, y, x2, y2 } => {
                *x += dx;
                *y += dy;
                *x2 += dx;
                *y2 += dy;
            }
            Self::Path { points } => {
                for point in points.iter_mut() {
                    *point = point.offset(dx, dy);
                }
            }
        }
        shape
    }
}

fn point_near_segment(point: &Point, start: &Point, end: &Point, tolerance: f32) -> bool {
    let dx = end.x - start.x;
    let dy = end.y - start.y;
    let length_sq = dx * dx + dy * dy;

    if length_sq < 1e-6 {
        return point.distance_to(start) <= tolerance;
    }

    let t = (((point.x - start.x) * dx + (point.y - start.y) * dy) / length_sq).clamp(0.0, 1.0);
    let closest = Point::new(start.x + t * dx, start.y + t * dy);
    point.distance_to(&closest) <= tolerance
}

/// Style fields; each type reads the subset that applies to it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationStyle {
    /// Fill for boxed shapes, glyph color for text, stroke for lines and paths.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
    /// Border color of rectangles and circles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_color: Option<Color>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<f32>,
}

/// One visual mark on one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    #[serde(default)]
    pub id: AnnotationId,
    #[serde(flatten)]
    pub shape: AnnotationShape,
    #[serde(flatten)]
    pub style: AnnotationStyle,
}

impl AnnotationRecord {
    pub fn new(shape: AnnotationShape, style: AnnotationStyle) -> Self {
        Self { id: AnnotationId::default(), shape, style }
    }

    pub fn with_id(mut self, id: AnnotationId) -> Self {
        self.id = id;
        self
    }

    pub fn kind(&self) -> AnnotationKind {
        self.shape.kind()
    }

    pub fn translated(&self, dx: f32, dy: f32) -> Self {
        Self { id: self.id.clone(), shape: self.shape.translated(dx, dy), style: self.style.clone() }
    }

    pub fn patched(&self, patch: &AnnotationPatch) -> Self {
        let mut record = self.clone();
        patch.apply(&mut record);
        record
    }
}

/// Annotation tagged with its page, as produced by the store's flattened view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatAnnotation {
    pub page: u32,
    #[serde(flatten)]
    pub record: AnnotationRecord,
}

/// Partial update merged into an existing record.
///
/// Fields that do not apply to the record's type are ignored. `x`/`y` move
/// the shape so its [`AnnotationShape::origin`] lands on the new position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotationPatch {
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub text: Option<String>,
    pub font_size: Option<f32>,
    pub font_family: Option<String>,
    pub color: Option<Color>,
    pub stroke_color: Option<Color>,
    pub opacity: Option<f32>,
    pub stroke_width: Option<f32>,
}

impl AnnotationPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(&self, record: &mut AnnotationRecord) {
        if self.x.is_some() || self.y.is_some() {
            let origin = record.shape.origin();
            let dx = self.x.map_or(0.0, |x| x - origin.x);
            let dy = self.y.map_or(0.0, |y| y - origin.y);
            record.shape = record.shape.translated(dx, dy);
        }

        match &mut record.shape {
            AnnotationShape::Text { width, text, font_size, font_family, .. } => {
                assign(width, self.width);
                if let Some(value) = &self.text {
                    *text = value.clone();
                }
                assign(font_size, self.font_size);
                if let Some(value) = &self.font_family {
                    *font_family = Some(value.clone());
                }
            }
            AnnotationShape::Rectangle { width, height, .. }
            | AnnotationShape::Highlight { width, height, .. }
            | AnnotationShape::Whiteout { width, height, .. }
            | AnnotationShape::Image { width, height, .. } => {
                assign(width, self.width);
                assign(height, self.height);
            }
            AnnotationShape::Circle { radius, .. } => {
                if let Some(diameter) = self.width.or(self.height) {
                    *radius = Some(diameter / 2.0);
                }
            }
            AnnotationShape::Line { x, y, x2, y2 } => {
                if let Some(width) = self.width {
                    *x2 = *x + width;
                }
                if let Some(height) = self.height {
                    *y2 = *y + height;
                }
            }
            AnnotationShape::Path { .. } => {}
        }

        if self.color.is_some() {
            record.style.color = self.color;
        }
        if self.stroke_color.is_some() {
            record.style.stroke_color = self.stroke_color;
        }
        if let Some(opacity) = self.opacity {
            record.style.opacity = Some(opacity.clamp(0.0, 1.0));
        }
        if self.stroke_width.is_some() {
            record.style.stroke_width = self.stroke_width;
        }
    }
}

fn assign(slot: &mut Option<f32>, value: Option<f32>) {
    if value.is_some() {
        *slot = value;
    }
}
