#![allow(dead_code)]

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object};
use pdf_engine::{
    DocumentMutator, EllipseOptions, FontRef, ImagePlacement, ImageRef, LineOptions,
    LopdfDocument, PageInfo, PdfEngineError, RectangleOptions, StandardFont, StrokeOptions,
    TextOptions,
};
use pdf_engine::test_support::sample_pdf_bytes;
use pdf_markup_core::{Editor, SurfaceTarget};
use serde::{Deserialize, Serialize};

/// Builds a document with one page per `(width, height)`.
pub fn pdf_bytes(pages: &[(f32, f32)]) -> Vec<u8> {
    sample_pdf_bytes(pages, "Fixture")
}

/// Routes `tracing` output to the test harness; `RUST_LOG` picks the level.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// An editor with `pages` letter-size pages, every page mounted.
pub fn editor_with_pages(pages: &[(f32, f32)]) -> Editor {
    let mut editor = Editor::default();
    editor.load_document("file:///fixture.pdf", pdf_bytes(pages)).expect("fixture loads");
    for (index, (width, height)) in pages.iter().enumerate() {
        let page = index as u32 + 1;
        editor
            .init_surface(page, SurfaceTarget(format!("page-{page}")), *width, *height)
            .expect("surface mounts");
    }
    editor
}

/// Decoded content operations of a 1-based page of a saved document.
pub fn page_operations(bytes: &[u8], page: u32) -> Vec<Operation> {
    let doc = Document::load_mem(bytes).expect("output parses");
    let page_id = doc.get_pages()[&page];
    let content = doc.get_page_content(page_id).expect("page content");
    Content::decode(&content).expect("content decodes").operations
}

pub fn page_count(bytes: &[u8]) -> usize {
    Document::load_mem(bytes).expect("output parses").get_pages().len()
}

pub fn page_rotation(bytes: &[u8], page: u32) -> i64 {
    let doc = Document::load_mem(bytes).expect("output parses");
    let page_id = doc.get_pages()[&page];
    doc.get_dictionary(page_id)
        .expect("page dictionary")
        .get(b"Rotate")
        .and_then(Object::as_i64)
        .unwrap_or(0)
}

pub fn operands(operation: &Operation) -> Vec<f32> {
    operation.operands.iter().map(|o| o.as_float().expect("numeric operand")).collect()
}

/// One mutation call, as seen by [`RecordingDocument`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Recorded {
    Text { page: u32, text: String, x: f32, y: f32, size: f32, opacity: f32 },
    Rectangle {
        page: u32,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        fill: Option<[f32; 3]>,
        border: Option<[f32; 3]>,
        opacity: f32,
    },
    Ellipse { page: u32, x: f32, y: f32, x_scale: f32, y_scale: f32 },
    Image { page: u32, x: f32, y: f32, width: f32, height: f32 },
    Line { page: u32, start: (f32, f32), end: (f32, f32), thickness: f32 },
    Polyline { page: u32, points: Vec<(f32, f32)>, thickness: f32 },
    Rotate { page: u32, degrees: i32 },
    Remove { page: u32 },
}

/// Mutator that forwards to [`LopdfDocument`] and records every call.
///
/// `save` returns the recorded calls as JSON instead of document bytes.
pub struct RecordingDocument {
    inner: LopdfDocument,
    calls: Vec<Recorded>,
}

pub fn recorded(bytes: &[u8]) -> Vec<Recorded> {
    serde_json::from_slice(bytes).expect("recorded calls")
}

impl DocumentMutator for RecordingDocument {
    fn load(bytes: &[u8]) -> Result<Self, PdfEngineError> {
        Ok(Self { inner: LopdfDocument::load(bytes)?, calls: Vec::new() })
    }

    fn page_count(&self) -> u32 {
        self.inner.page_count()
    }

    fn page(&self, index: u32) -> Result<PageInfo, PdfEngineError> {
        self.inner.page(index)
    }

    fn embed_font(&mut self, font: StandardFont) -> Result<FontRef, PdfEngineError> {
        self.inner.embed_font(font)
    }

    fn embed_png(&mut self, bytes: &[u8]) -> Result<ImageRef, PdfEngineError> {
        self.inner.embed_png(bytes)
    }

    fn embed_jpg(&mut self, bytes: &[u8]) -> Result<ImageRef, PdfEngineError> {
        self.inner.embed_jpg(bytes)
    }

    fn draw_text(&mut self, index: u32, text: &str, options: &TextOptions) -> Result<(), PdfEngineError> {
        self.calls.push(Recorded::Text {
            page: index,
            text: text.to_owned(),
            x: options.x,
            y: options.y,
            size: options.size,
            opacity: options.opacity,
        });
        self.inner.draw_text(index, text, options)
    }

    fn draw_rectangle(&mut self, index: u32, options: &RectangleOptions) -> Result<(), PdfEngineError> {
        self.calls.push(Recorded::Rectangle {
            page: index,
            x: options.x,
            y: options.y,
            width: options.width,
            height: options.height,
            fill: options.fill.map(|c| [c.r, c.g, c.b]),
            border: options.border.map(|c| [c.r, c.g, c.b]),
            opacity: options.opacity,
        });
        self.inner.draw_rectangle(index, options)
    }

    fn draw_ellipse(&mut self, index: u32, options: &EllipseOptions) -> Result<(), PdfEngineError> {
        self.calls.push(Recorded::Ellipse {
            page: index,
            x: options.x,
            y: options.y,
            x_scale: options.x_scale,
            y_scale: options.y_scale,
        });
        self.inner.draw_ellipse(index, options)
    }

    fn draw_image(
        &mut self,
        index: u32,
        image: ImageRef,
        placement: &ImagePlacement,
    ) -> Result<(), PdfEngineError> {
        self.calls.push(Recorded::Image {
            page: index,
            x: placement.x,
            y: placement.y,
            width: placement.width,
            height: placement.height,
        });
        self.inner.draw_image(index, image, placement)
    }

    fn draw_line(&mut self, index: u32, options: &LineOptions) -> Result<(), PdfEngineError> {
        self.calls.push(Recorded::Line {
            page: index,
            start: options.start,
            end: options.end,
            thickness: options.thickness,
        });
        self.inner.draw_line(index, options)
    }

    fn draw_polyline(
        &mut self,
        index: u32,
        points: &[(f32, f32)],
        options: &StrokeOptions,
    ) -> Result<(), PdfEngineError> {
        self.calls.push(Recorded::Polyline {
            page: index,
            points: points.to_vec(),
            thickness: options.thickness,
        });
        self.inner.draw_polyline(index, points, options)
    }

    fn set_rotation(&mut self, index: u32, degrees: i32) -> Result<(), PdfEngineError> {
        self.calls.push(Recorded::Rotate { page: index, degrees });
        self.inner.set_rotation(index, degrees)
    }

    fn remove_page(&mut self, index: u32) -> Result<(), PdfEngineError> {
        self.calls.push(Recorded::Remove { page: index });
        self.inner.remove_page(index)
    }

    fn save(&mut self) -> Result<Vec<u8>, PdfEngineError> {
        self.inner.save()?;
        serde_json::to_vec(&self.calls).map_err(|err| PdfEngineError::Backend(err.to_string()))
    }
}
