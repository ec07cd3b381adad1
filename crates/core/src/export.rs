//! Bakes annotations and structural edits into a new copy of the document.
//!
//! Order is fixed. Annotations are drawn in flattened order (ascending page,
//! then z-order). Rotations follow, by original page index. Deletions come
//! last, highest index first, so no index is invalidated before it is used.
//! The source bytes are never modified; running the same job twice yields
//! the same bytes.

use crate::asset::{self, ImageKind};
use crate::error::ExportError;
use doc_model::{defaults, AnnotationId, AnnotationRecord, AnnotationShape, Color, FlatAnnotation, StructuralEdit};
use futures_lite::future::yield_now;
use pdf_engine::{
    DocumentMutator, EllipseOptions, ImagePlacement, LineOptions, RectangleOptions, RgbColor,
    StandardFont, StrokeOptions, TextOptions,
};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const PDF_MIME: &str = "application/pdf";

/// Maps an overlay-space top edge to a document-space bottom edge.
///
/// `extent` is the vertical size of the mark: the explicit height, the font
/// size for text, or zero for points and lines.
pub fn to_document_y(page_height: f32, overlay_y: f32, extent: f32) -> f32 {
    page_height - overlay_y - extent
}

/// Inputs of one export run.
#[derive(Debug, Clone)]
pub struct ExportJob {
    pub source: Arc<[u8]>,
    pub annotations: Vec<FlatAnnotation>,
    pub edits: Vec<StructuralEdit>,
    pub file_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    PageOutOfRange { page_count: u32 },
    ImageDecode(String),
}

/// An annotation or edit left out of the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkippedItem {
    Annotation { page: u32, id: AnnotationId, reason: SkipReason },
    Edit { edit: StructuralEdit, page_count: u32 },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportReport {
    pub drawn: usize,
    pub skipped: Vec<SkippedItem>,
}

/// Downloadable result of an export.
#[derive(Debug, Clone)]
pub struct ExportedDocument {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub mime: &'static str,
    pub report: ExportReport,
}

impl ExportedDocument {
    /// Writes the bytes to `dir` under [`Self::file_name`].
    pub fn write_to<P: AsRef<Path>>(&self, dir: P) -> Result<std::path::PathBuf, ExportError> {
        let path = dir.as_ref().join(&self.file_name);
        fs::write(&path, &self.bytes)?;
        Ok(path)
    }
}

/// Runs `job` against a fresh `M` loaded from the job's source bytes.
pub async fn export_document<M: DocumentMutator>(
    job: &ExportJob,
) -> Result<ExportedDocument, ExportError> {
    info!(
        annotations = job.annotations.len(),
        edits = job.edits.len(),
        file_name = %job.file_name,
        "export started"
    );

    let mut document = M::load(&job.source)?;
    yield_now().await;

    let page_count = document.page_count();
    let mut report = ExportReport::default();
    let mut current_page = None;

    for flat in &job.annotations {
        if flat.page == 0 || flat.page > page_count {
            warn!(page = flat.page, page_count, id = %flat.record.id, "annotation on missing page skipped");
            report.skipped.push(SkippedItem::Annotation {
                page: flat.page,
                id: flat.record.id.clone(),
                reason: SkipReason::PageOutOfRange { page_count },
            });
            continue;
        }

        if current_page != Some(flat.page) {
            if current_page.is_some() {
                yield_now().await;
            }
            current_page = Some(flat.page);
        }

        match draw_annotation(&mut document, flat.page - 1, &flat.record)? {
            Drawn::Yes => report.drawn += 1,
            Drawn::Skipped(reason) => report.skipped.push(SkippedItem::Annotation {
                page: flat.page,
                id: flat.record.id.clone(),
                reason,
            }),
        }
    }

    apply_structural_edits(&mut document, &job.edits, page_count, &mut report)?;

    yield_now().await;
    let bytes = document.save()?;

    info!(
        bytes = bytes.len(),
        drawn = report.drawn,
        skipped = report.skipped.len(),
        "export finished"
    );

    Ok(ExportedDocument { bytes, file_name: job.file_name.clone(), mime: PDF_MIME, report })
}

fn apply_structural_edits<M: DocumentMutator>(
    document: &mut M,
    edits: &[StructuralEdit],
    page_count: u32,
    report: &mut ExportReport,
) -> Result<(), ExportError> {
    let mut deletions = Vec::new();

    for edit in edits {
        let index = edit.page_index();
        if index >= page_count {
            warn!(?edit, page_count, "structural edit on missing page skipped");
            report.skipped.push(SkippedItem::Edit { edit: *edit, page_count });
            continue;
        }
        match edit {
            StructuralEdit::Rotate { angle, .. } => {
                let current = document.page(index)?.rotation;
                let rotation = (current.rem_euclid(360) + angle.rem_euclid(360)).rem_euclid(360);
                document.set_rotation(index, rotation)?;
            }
            StructuralEdit::Delete { .. } => deletions.push(index),
        }
    }

    deletions.sort_unstable_by(|a, b| b.cmp(a));
    deletions.dedup();
    if deletions.len() as u32 >= page_count {
        return Err(ExportError::NoPagesLeft);
    }
    for index in deletions {
        document.remove_page(index)?;
    }
    Ok(())
}

enum Drawn {
    Yes,
    Skipped(SkipReason),
}

fn rgb(color: Color) -> RgbColor {
    let (r, g, b) = color.to_normalized();
    RgbColor::new(r, g, b)
}

fn font_for(family: Option<&str>) -> StandardFont {
    let family = family.unwrap_or(defaults::FONT_FAMILY);
    StandardFont::from_family(family).unwrap_or_else(|| {
        debug!(family, "no standard font for family, using Helvetica");
        StandardFont::Helvetica
    })
}

fn draw_annotation<M: DocumentMutator>(
    document: &mut M,
    index: u32,
    record: &AnnotationRecord,
) -> Result<Drawn, ExportError> {
    let page_height = document.page(index)?.height;
    let style = &record.style;
    let opacity = style.opacity.unwrap_or(1.0).clamp(0.0, 1.0);
    let shape = &record.shape;
    let height = shape.height();
    let y_of = |y: f32| to_document_y(page_height, y, height);

    match shape {
        AnnotationShape::Text { x, y, text, font_family, .. } => {
            let font = document.embed_font(font_for(font_family.as_deref()))?;
            let options = TextOptions {
                x: *x,
                y: y_of(*y),
                size: height,
                font,
                color: rgb(style.color.unwrap_or(defaults::TEXT_COLOR)),
                opacity,
            };
            document.draw_text(index, text, &options)?;
        }
        AnnotationShape::Rectangle { x, y, .. } => {
            let border = style.stroke_color.map(rgb);
            let fill = match (style.color, border) {
                (Some(color), _) => Some(rgb(color)),
                (None, Some(_)) => None,
                (None, None) => Some(RgbColor::BLACK),
            };
            document.draw_rectangle(
                index,
                &RectangleOptions {
                    x: *x,
                    y: y_of(*y),
                    width: shape.width(),
                    height,
                    fill,
                    border,
                    border_width: style.stroke_width.unwrap_or(defaults::STROKE_WIDTH),
                    opacity,
                },
            )?;
        }
        AnnotationShape::Whiteout { x, y, .. } => {
            document.draw_rectangle(
                index,
                &RectangleOptions {
                    x: *x,
                    y: y_of(*y),
                    width: shape.width(),
                    height,
                    fill: Some(RgbColor::WHITE),
                    border: None,
                    border_width: 0.0,
                    opacity: 1.0,
                },
            )?;
        }
        AnnotationShape::Highlight { x, y, .. } => {
            document.draw_rectangle(
                index,
                &RectangleOptions {
                    x: *x,
                    y: y_of(*y),
                    width: shape.width(),
                    height,
                    fill: Some(rgb(style.color.unwrap_or(defaults::HIGHLIGHT_COLOR))),
                    border: None,
                    border_width: 0.0,
                    opacity: style.opacity.unwrap_or(defaults::HIGHLIGHT_OPACITY).clamp(0.0, 1.0),
                },
            )?;
        }
        AnnotationShape::Circle { x, y, .. } => {
            let radius = shape.width() / 2.0;
            let border = style.stroke_color.map(rgb);
            let fill = match (style.color, border) {
                (Some(color), _) => Some(rgb(color)),
                (None, Some(_)) => None,
                (None, None) => Some(RgbColor::BLACK),
            };
            document.draw_ellipse(
                index,
                &EllipseOptions {
                    x: x + radius,
                    y: y_of(*y) + radius,
                    x_scale: radius,
                    y_scale: radius,
                    fill,
                    border,
                    border_width: style.stroke_width.unwrap_or(defaults::STROKE_WIDTH),
                    opacity,
                },
            )?;
        }
        AnnotationShape::Image { x, y, image_data, .. } => {
            let embedded = asset::decode_data_url(image_data)
                .map_err(|err| err.to_string())
                .and_then(|asset| {
                    let result = match asset.kind {
                        ImageKind::Png => document.embed_png(&asset.bytes),
                        ImageKind::Jpeg => document.embed_jpg(&asset.bytes),
                    };
                    result.map_err(|err| err.to_string())
                });
            let image = match embedded {
                Ok(image) => image,
                Err(reason) => {
                    warn!(id = %record.id, %reason, "image annotation skipped");
                    return Ok(Drawn::Skipped(SkipReason::ImageDecode(reason)));
                }
            };
            document.draw_image(
                index,
                image,
                &ImagePlacement { x: *x, y: y_of(*y), width: shape.width(), height, opacity },
            )?;
        }
        AnnotationShape::Line { x, y, x2, y2 } => {
            document.draw_line(
                index,
                &LineOptions {
                    start: (*x, to_document_y(page_height, *y, 0.0)),
                    end: (*x2, to_document_y(page_height, *y2, 0.0)),
                    thickness: style.stroke_width.unwrap_or(defaults::STROKE_WIDTH),
                    color: rgb(style.color.unwrap_or(defaults::STROKE_COLOR)),
                    opacity,
                },
            )?;
        }
        AnnotationShape::Path { points } => {
            let points: Vec<(f32, f32)> = points
                .iter()
                .map(|point| (point.x, to_document_y(page_height, point.y, 0.0)))
                .collect();
            document.draw_polyline(
                index,
                &points,
                &StrokeOptions {
                    thickness: style.stroke_width.unwrap_or(defaults::BRUSH_WIDTH),
                    color: rgb(style.color.unwrap_or(defaults::BRUSH_COLOR)),
                    opacity,
                },
            )?;
        }
    }

    Ok(Drawn::Yes)
}
