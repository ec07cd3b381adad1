//! Records produced by the creation tools, with their default geometry and style.
//!
//! Builders always write explicit geometry so a created object looks the same
//! on the overlay and in the exported document.

use super::tool::ShapeKind;
use crate::config::{BrushSettings, EditorConfig};
use doc_model::{defaults, AnnotationRecord, AnnotationShape, AnnotationStyle, Color, Point};

pub fn default_origin() -> Point {
    Point::new(defaults::ORIGIN_X, defaults::ORIGIN_Y)
}

pub fn text(at: Point, content: Option<&str>, config: &EditorConfig) -> AnnotationRecord {
    AnnotationRecord::new(
        AnnotationShape::Text {
            x: at.x,
            y: at.y,
            width: Some(defaults::TEXT_WIDTH),
            text: content.unwrap_or(defaults::TEXT_PLACEHOLDER).to_owned(),
            font_size: Some(config.text.font_size),
            font_family: Some(config.text.font_family.clone()),
        },
        AnnotationStyle { color: Some(config.text.color), ..AnnotationStyle::default() },
    )
}

pub fn highlight(at: Point, config: &EditorConfig) -> AnnotationRecord {
    let (width, height) = defaults::CREATED_HIGHLIGHT_SIZE;
    AnnotationRecord::new(
        AnnotationShape::Highlight { x: at.x, y: at.y, width: Some(width), height: Some(height) },
        AnnotationStyle {
            color: Some(config.highlight.color),
            opacity: Some(config.highlight.opacity),
            ..AnnotationStyle::default()
        },
    )
}

pub fn whiteout(at: Point) -> AnnotationRecord {
    let (width, height) = defaults::CREATED_WHITEOUT_SIZE;
    AnnotationRecord::new(
        AnnotationShape::Whiteout { x: at.x, y: at.y, width: Some(width), height: Some(height) },
        AnnotationStyle {
            color: Some(Color::WHITE),
            opacity: Some(1.0),
            ..AnnotationStyle::default()
        },
    )
}

/// Outlined shape; rectangles and circles are created unfilled.
pub fn shape(kind: ShapeKind, at: Point) -> AnnotationRecord {
    let outline = AnnotationStyle {
        stroke_color: Some(defaults::STROKE_COLOR),
        stroke_width: Some(defaults::STROKE_WIDTH),
        ..AnnotationStyle::default()
    };

    match kind {
        ShapeKind::Rectangle => {
            let (width, height) = defaults::CREATED_RECTANGLE_SIZE;
            AnnotationRecord::new(
                AnnotationShape::Rectangle {
                    x: at.x,
                    y: at.y,
                    width: Some(width),
                    height: Some(height),
                },
                outline,
            )
        }
        ShapeKind::Circle => AnnotationRecord::new(
            AnnotationShape::Circle { x: at.x, y: at.y, radius: Some(defaults::CIRCLE_RADIUS) },
            outline,
        ),
        ShapeKind::Line => AnnotationRecord::new(
            AnnotationShape::Line { x: at.x, y: at.y, x2: at.x + defaults::LINE_LENGTH, y2: at.y },
            AnnotationStyle {
                color: Some(defaults::STROKE_COLOR),
                stroke_width: Some(defaults::STROKE_WIDTH),
                ..AnnotationStyle::default()
            },
        ),
    }
}

/// Image sized to its pixel dimensions times `scale`.
pub fn image(
    at: Point,
    data_url: String,
    pixel_size: (u32, u32),
    scale: f32,
) -> AnnotationRecord {
    AnnotationRecord::new(
        AnnotationShape::Image {
            x: at.x,
            y: at.y,
            width: Some(pixel_size.0 as f32 * scale),
            height: Some(pixel_size.1 as f32 * scale),
            image_data: data_url,
        },
        AnnotationStyle::default(),
    )
}

pub fn path(points: Vec<Point>, brush: &BrushSettings) -> AnnotationRecord {
    AnnotationRecord::new(
        AnnotationShape::Path { points },
        AnnotationStyle {
            color: Some(brush.color),
            stroke_width: Some(brush.width),
            ..AnnotationStyle::default()
        },
    )
}
