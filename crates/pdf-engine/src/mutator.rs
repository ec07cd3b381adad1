//! Document mutation: the primitives annotations are baked with.
//!
//! Coordinates are document space (points, origin bottom-left, Y up). Page
//! indices are 0-based and refer to the document as it is at call time, so
//! removing a page renumbers the pages after it.

use crate::{load_document, page_size, PdfEngineError};
use image::codecs::jpeg::JpegDecoder;
use image::{ColorType, ImageDecoder, ImageFormat};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::collections::{HashMap, HashSet};
use std::io::Cursor;

const KAPPA: f32 = 0.552_284_8;

/// RGB color with components in 0.0..=1.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RgbColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl RgbColor {
    pub const BLACK: RgbColor = RgbColor { r: 0.0, g: 0.0, b: 0.0 };
    pub const WHITE: RgbColor = RgbColor { r: 1.0, g: 1.0, b: 1.0 };

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    fn operands(&self) -> Vec<Object> {
        vec![self.r.into(), self.g.into(), self.b.into()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageInfo {
    pub width: f32,
    pub height: f32,
    /// Current `/Rotate` value in degrees.
    pub rotation: i32,
}

/// The fourteen-font subset usable without embedding font programs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
    HelveticaOblique,
    TimesRoman,
    TimesBold,
    TimesItalic,
    Courier,
    CourierBold,
    CourierOblique,
}

impl StandardFont {
    pub fn base_font_name(&self) -> &'static str {
        match self {
            Self::Helvetica => "Helvetica",
            Self::HelveticaBold => "Helvetica-Bold",
            Self::HelveticaOblique => "Helvetica-Oblique",
            Self::TimesRoman => "Times-Roman",
            Self::TimesBold => "Times-Bold",
            Self::TimesItalic => "Times-Italic",
            Self::Courier => "Courier",
            Self::CourierBold => "Courier-Bold",
            Self::CourierOblique => "Courier-Oblique",
        }
    }

    /// Maps a CSS-ish family name onto a standard font, if one is close enough.
    pub fn from_family(family: &str) -> Option<Self> {
        let normalized: String = family
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '\'' && *c != '"')
            .collect::<String>()
            .to_ascii_lowercase();

        let font = match normalized.as_str() {
            "helvetica" | "arial" | "sans-serif" => Self::Helvetica,
            "helvetica-bold" | "arial-bold" => Self::HelveticaBold,
            "helvetica-oblique" | "helvetica-italic" | "arial-italic" => Self::HelveticaOblique,
            "times" | "times-roman" | "timesroman" | "timesnewroman" | "serif" => Self::TimesRoman,
            "times-bold" | "timesnewroman-bold" => Self::TimesBold,
            "times-italic" | "timesnewroman-italic" => Self::TimesItalic,
            "courier" | "couriernew" | "monospace" => Self::Courier,
            "courier-bold" | "couriernew-bold" => Self::CourierBold,
            "courier-oblique" | "courier-italic" => Self::CourierOblique,
            _ => return None,
        };
        Some(font)
    }
}

/// Handle to a font object added with [`DocumentMutator::embed_font`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FontRef(ObjectId);

/// Handle to an image XObject added with `embed_png`/`embed_jpg`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageRef {
    id: ObjectId,
    pub width_px: u32,
    pub height_px: u32,
}

/// Text placement; `y` is the baseline of the first line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextOptions {
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub font: FontRef,
    pub color: RgbColor,
    pub opacity: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RectangleOptions {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub fill: Option<RgbColor>,
    pub border: Option<RgbColor>,
    pub border_width: f32,
    pub opacity: f32,
}

/// Ellipse around (`x`, `y`) with radii `x_scale` and `y_scale`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EllipseOptions {
    pub x: f32,
    pub y: f32,
    pub x_scale: f32,
    pub y_scale: f32,
    pub fill: Option<RgbColor>,
    pub border: Option<RgbColor>,
    pub border_width: f32,
    pub opacity: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImagePlacement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub opacity: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineOptions {
    pub start: (f32, f32),
    pub end: (f32, f32),
    pub thickness: f32,
    pub color: RgbColor,
    pub opacity: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeOptions {
    pub thickness: f32,
    pub color: RgbColor,
    pub opacity: f32,
}

/// Mutation collaborator the export pipeline bakes annotations through.
pub trait DocumentMutator: Sized {
    fn load(bytes: &[u8]) -> Result<Self, PdfEngineError>;
    fn page_count(&self) -> u32;
    fn page(&self, index: u32) -> Result<PageInfo, PdfEngineError>;
    fn embed_font(&mut self, font: StandardFont) -> Result<FontRef, PdfEngineError>;
    fn embed_png(&mut self, bytes: &[u8]) -> Result<ImageRef, PdfEngineError>;
    fn embed_jpg(&mut self, bytes: &[u8]) -> Result<ImageRef, PdfEngineError>;
    fn draw_text(
        &mut self,
        index: u32,
        text: &str,
        options: &TextOptions,
    ) -> Result<(), PdfEngineError>;
    fn draw_rectangle(
        &mut self,
        index: u32,
        options: &RectangleOptions,
    ) -> Result<(), PdfEngineError>;
    fn draw_ellipse(&mut self, index: u32, options: &EllipseOptions) -> Result<(), PdfEngineError>;
    fn draw_image(
        &mut self,
        index: u32,
        image: ImageRef,
        placement: &ImagePlacement,
    ) -> Result<(), PdfEngineError>;
    fn draw_line(&mut self, index: u32, options: &LineOptions) -> Result<(), PdfEngineError>;
    fn draw_polyline(
        &mut self,
        index: u32,
        points: &[(f32, f32)],
        options: &StrokeOptions,
    ) -> Result<(), PdfEngineError>;
    fn set_rotation(&mut self, index: u32, degrees: i32) -> Result<(), PdfEngineError>;
    fn remove_page(&mut self, index: u32) -> Result<(), PdfEngineError>;
    fn save(&mut self) -> Result<Vec<u8>, PdfEngineError>;
}

/// [`DocumentMutator`] over an in-memory `lopdf` document.
///
/// Each draw call appends one content stream to the page. The first call on a
/// page wraps the existing content in `q`/`Q` so a transform left open by the
/// original content cannot shift the new marks.
#[derive(Debug)]
pub struct LopdfDocument {
    doc: Document,
    page_ids: Vec<ObjectId>,
    fonts: HashMap<StandardFont, ObjectId>,
    opacity_states: HashMap<u32, ObjectId>,
    isolated_pages: HashSet<ObjectId>,
}

impl LopdfDocument {
    fn page_id(&self, index: u32) -> Result<ObjectId, PdfEngineError> {
        self.page_ids.get(index as usize).copied().ok_or(PdfEngineError::PageOutOfRange {
            page: index,
            page_count: self.page_ids.len() as u32,
        })
    }

    fn refresh_page_ids(&mut self) {
        self.page_ids = self.doc.get_pages().into_values().collect();
    }

    /// Owned copy of the resources in effect for a page, inherited ones included.
    fn page_resources(&self, page_id: ObjectId) -> Result<Dictionary, PdfEngineError> {
        let mut current = Some(page_id);
        while let Some(id) = current {
            let dict = self.doc.get_dictionary(id)?;
            match dict.get(b"Resources") {
                Ok(Object::Dictionary(resources)) => return Ok(resources.clone()),
                Ok(Object::Reference(resources_id)) => {
                    return Ok(self.doc.get_dictionary(*resources_id)?.clone())
                }
                _ => {}
            }
            current = dict.get(b"Parent").and_then(Object::as_reference).ok();
        }
        Ok(Dictionary::new())
    }

    /// Makes `target` available to the page under `category` and returns its name.
    fn bind_resource(
        &mut self,
        page_id: ObjectId,
        category: &[u8],
        prefix: &str,
        target: ObjectId,
    ) -> Result<Vec<u8>, PdfEngineError> {
        let mut resources = self.page_resources(page_id)?;
        let mut entries = match resources.get(category) {
            Ok(Object::Dictionary(dict)) => dict.clone(),
            Ok(Object::Reference(id)) => self.doc.get_dictionary(*id).cloned().unwrap_or_default(),
            _ => Dictionary::new(),
        };

        let existing = entries.iter().find_map(|(name, value)| match value {
            Object::Reference(id) if *id == target => Some(name.clone()),
            _ => None,
        });
        if let Some(name) = existing {
            return Ok(name);
        }

        let mut n = 0u32;
        let name = loop {
            let candidate = format!("{prefix}{n}").into_bytes();
            if !entries.has(&candidate) {
                break candidate;
            }
            n += 1;
        };

        entries.set(name.clone(), target);
        resources.set(category.to_vec(), Object::Dictionary(entries));
        self.doc.get_dictionary_mut(page_id)?.set("Resources", resources);
        Ok(name)
    }

    fn opacity_state(&mut self, opacity: f32) -> ObjectId {
        let opacity = opacity.clamp(0.0, 1.0);
        let key = (opacity * 1000.0).round() as u32;
        if let Some(id) = self.opacity_states.get(&key) {
            return *id;
        }
        let id = self.doc.add_object(dictionary! {
            "Type" => "ExtGState",
            "CA" => opacity,
            "ca" => opacity,
        });
        self.opacity_states.insert(key, id);
        id
    }

    /// `q` plus the graphics-state operator for `opacity` when it is translucent.
    fn begin_marks(
        &mut self,
        page_id: ObjectId,
        opacity: f32,
    ) -> Result<Vec<Operation>, PdfEngineError> {
        let mut operations = vec![Operation::new("q", vec![])];
        if opacity < 1.0 {
            let state = self.opacity_state(opacity);
            let name = self.bind_resource(page_id, b"ExtGState", "GSM", state)?;
            operations.push(Operation::new("gs", vec![Object::Name(name)]));
        }
        Ok(operations)
    }

    fn page_contents(&self, page_id: ObjectId) -> Result<Vec<Object>, PdfEngineError> {
        let dict = self.doc.get_dictionary(page_id)?;
        let contents = match dict.get(b"Contents") {
            Ok(Object::Reference(id)) => match self.doc.get_object(*id)? {
                Object::Array(items) => items.clone(),
                _ => vec![Object::Reference(*id)],
            },
            Ok(Object::Array(items)) => items.clone(),
            _ => Vec::new(),
        };
        Ok(contents)
    }

    fn append_content(
        &mut self,
        page_id: ObjectId,
        mut operations: Vec<Operation>,
    ) -> Result<(), PdfEngineError> {
        operations.push(Operation::new("Q", vec![]));
        let mut contents = self.page_contents(page_id)?;

        if self.isolated_pages.insert(page_id) && !contents.is_empty() {
            let save = self.doc.add_object(Stream::new(dictionary! {}, b"q\n".to_vec()));
            let restore = self.doc.add_object(Stream::new(dictionary! {}, b"\nQ\n".to_vec()));
            contents.insert(0, save.into());
            contents.push(restore.into());
        }

        let encoded = Content { operations }.encode()?;
        let stream = self.doc.add_object(Stream::new(dictionary! {}, encoded));
        contents.push(stream.into());

        self.doc.get_dictionary_mut(page_id)?.set("Contents", Object::Array(contents));
        Ok(())
    }

    fn paint_operator(fill: Option<RgbColor>, border: Option<RgbColor>) -> &'static str {
        match (fill, border) {
            (Some(_), Some(_)) => "B",
            (Some(_), None) => "f",
            (None, Some(_)) => "S",
            (None, None) => "n",
        }
    }

    fn push_paint_state(
        operations: &mut Vec<Operation>,
        fill: Option<RgbColor>,
        border: Option<RgbColor>,
        border_width: f32,
    ) {
        if let Some(fill) = fill {
            operations.push(Operation::new("rg", fill.operands()));
        }
        if let Some(border) = border {
            operations.push(Operation::new("RG", border.operands()));
            operations.push(Operation::new("w", vec![border_width.into()]));
        }
    }

    fn image_object(
        &mut self,
        width: u32,
        height: u32,
        mut dict: Dictionary,
        data: Vec<u8>,
    ) -> ImageRef {
        dict.set("Type", "XObject");
        dict.set("Subtype", "Image");
        dict.set("Width", width as i64);
        dict.set("Height", height as i64);
        dict.set("BitsPerComponent", 8i64);
        let id = self.doc.add_object(Stream::new(dict, data));
        ImageRef { id, width_px: width, height_px: height }
    }
}

/// Encodes text for a WinAnsi font; unmappable characters become `?`.
pub(crate) fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\u{20}'..='\u{7e}' | '\u{a0}'..='\u{ff}' => c as u8,
            '\u{20ac}' => 0x80,
            '\u{2026}' => 0x85,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201c}' => 0x93,
            '\u{201d}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\t' => b' ',
            _ => b'?',
        })
        .collect()
}

impl DocumentMutator for LopdfDocument {
    fn load(bytes: &[u8]) -> Result<Self, PdfEngineError> {
        let doc = load_document(bytes)?;
        let mut document = Self {
            doc,
            page_ids: Vec::new(),
            fonts: HashMap::new(),
            opacity_states: HashMap::new(),
            isolated_pages: HashSet::new(),
        };
        document.refresh_page_ids();
        if document.page_ids.is_empty() {
            return Err(PdfEngineError::Backend("document has no pages".to_owned()));
        }
        Ok(document)
    }

    fn page_count(&self) -> u32 {
        self.page_ids.len() as u32
    }

    fn page(&self, index: u32) -> Result<PageInfo, PdfEngineError> {
        let page_id = self.page_id(index)?;
        let size = page_size(&self.doc, page_id)?;

        let mut rotation = 0;
        let mut current = Some(page_id);
        while let Some(id) = current {
            let dict = self.doc.get_dictionary(id)?;
            if let Ok(value) = dict.get(b"Rotate").and_then(Object::as_i64) {
                rotation = value as i32;
                break;
            }
            current = dict.get(b"Parent").and_then(Object::as_reference).ok();
        }

        Ok(PageInfo { width: size.width_pt, height: size.height_pt, rotation })
    }

    fn embed_font(&mut self, font: StandardFont) -> Result<FontRef, PdfEngineError> {
        if let Some(id) = self.fonts.get(&font) {
            return Ok(FontRef(*id));
        }
        let id = self.doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => font.base_font_name(),
            "Encoding" => "WinAnsiEncoding",
        });
        self.fonts.insert(font, id);
        Ok(FontRef(id))
    }

    fn embed_png(&mut self, bytes: &[u8]) -> Result<ImageRef, PdfEngineError> {
        let decoded = image::load_from_memory_with_format(bytes, ImageFormat::Png)?.to_rgba8();
        let (width, height) = decoded.dimensions();

        let mut rgb = Vec::with_capacity((width * height * 3) as usize);
        let mut alpha = Vec::with_capacity((width * height) as usize);
        for pixel in decoded.pixels() {
            rgb.extend_from_slice(&pixel.0[..3]);
            alpha.push(pixel.0[3]);
        }

        let mut dict = dictionary! { "ColorSpace" => "DeviceRGB" };
        if alpha.iter().any(|a| *a < u8::MAX) {
            let mask = self.image_object(
                width,
                height,
                dictionary! { "ColorSpace" => "DeviceGray" },
                alpha,
            );
            dict.set("SMask", mask.id);
        }

        Ok(self.image_object(width, height, dict, rgb))
    }

    fn embed_jpg(&mut self, bytes: &[u8]) -> Result<ImageRef, PdfEngineError> {
        let decoder = JpegDecoder::new(Cursor::new(bytes))?;
        let (width, height) = decoder.dimensions();
        let color_space = match decoder.color_type() {
            ColorType::L8 | ColorType::L16 => "DeviceGray",
            _ => "DeviceRGB",
        };

        let dict = dictionary! {
            "ColorSpace" => color_space,
            "Filter" => "DCTDecode",
        };
        Ok(self.image_object(width, height, dict, bytes.to_vec()))
    }

    fn draw_text(
        &mut self,
        index: u32,
        text: &str,
        options: &TextOptions,
    ) -> Result<(), PdfEngineError> {
        let page_id = self.page_id(index)?;
        let font = self.bind_resource(page_id, b"Font", "FM", options.font.0)?;
        let leading = options.size * 1.2;

        let mut operations = self.begin_marks(page_id, options.opacity)?;
        operations.push(Operation::new("BT", vec![]));
        operations.push(Operation::new("Tf", vec![Object::Name(font), options.size.into()]));
        operations.push(Operation::new("rg", options.color.operands()));
        operations.push(Operation::new("TL", vec![leading.into()]));
        operations.push(Operation::new("Td", vec![options.x.into(), options.y.into()]));
        for (i, line) in text.lines().enumerate() {
            if i > 0 {
                operations.push(Operation::new("T*", vec![]));
            }
            operations.push(Operation::new(
                "Tj",
                vec![Object::String(encode_win_ansi(line), StringFormat::Literal)],
            ));
        }
        operations.push(Operation::new("ET", vec![]));

        self.append_content(page_id, operations)
    }

    fn draw_rectangle(
        &mut self,
        index: u32,
        options: &RectangleOptions,
    ) -> Result<(), PdfEngineError> {
        let page_id = self.page_id(index)?;
        let mut operations = self.begin_marks(page_id, options.opacity)?;
        Self::push_paint_state(&mut operations, options.fill, options.border, options.border_width);
        operations.push(Operation::new(
            "re",
            vec![
                options.x.into(),
                options.y.into(),
                options.width.into(),
                options.height.into(),
            ],
        ));
        operations.push(Operation::new(Self::paint_operator(options.fill, options.border), vec![]));

        self.append_content(page_id, operations)
    }

    fn draw_ellipse(&mut self, index: u32, options: &EllipseOptions) -> Result<(), PdfEngineError> {
        let page_id = self.page_id(index)?;
        let mut operations = self.begin_marks(page_id, options.opacity)?;
        Self::push_paint_state(&mut operations, options.fill, options.border, options.border_width);

        let (cx, cy) = (options.x, options.y);
        let (rx, ry) = (options.x_scale, options.y_scale);
        let (ox, oy) = (rx * KAPPA, ry * KAPPA);
        let curve = |points: [f32; 6]| {
            Operation::new("c", points.iter().map(|v| Object::from(*v)).collect())
        };

        operations.push(Operation::new("m", vec![(cx + rx).into(), cy.into()]));
        operations.push(curve([cx + rx, cy + oy, cx + ox, cy + ry, cx, cy + ry]));
        operations.push(curve([cx - ox, cy + ry, cx - rx, cy + oy, cx - rx, cy]));
        operations.push(curve([cx - rx, cy - oy, cx - ox, cy - ry, cx, cy - ry]));
        operations.push(curve([cx + ox, cy - ry, cx + rx, cy - oy, cx + rx, cy]));
        operations.push(Operation::new("h", vec![]));
        operations.push(Operation::new(Self::paint_operator(options.fill, options.border), vec![]));

        self.append_content(page_id, operations)
    }

    fn draw_image(
        &mut self,
        index: u32,
        image: ImageRef,
        placement: &ImagePlacement,
    ) -> Result<(), PdfEngineError> {
        let page_id = self.page_id(index)?;
        let name = self.bind_resource(page_id, b"XObject", "ImM", image.id)?;

        let mut operations = self.begin_marks(page_id, placement.opacity)?;
        operations.push(Operation::new(
            "cm",
            vec![
                placement.width.into(),
                0i64.into(),
                0i64.into(),
                placement.height.into(),
                placement.x.into(),
                placement.y.into(),
            ],
        ));
        operations.push(Operation::new("Do", vec![Object::Name(name)]));

        self.append_content(page_id, operations)
    }

    fn draw_line(&mut self, index: u32, options: &LineOptions) -> Result<(), PdfEngineError> {
        let page_id = self.page_id(index)?;
        let mut operations = self.begin_marks(page_id, options.opacity)?;
        operations.push(Operation::new("RG", options.color.operands()));
        operations.push(Operation::new("w", vec![options.thickness.into()]));
        operations.push(Operation::new("m", vec![options.start.0.into(), options.start.1.into()]));
        operations.push(Operation::new("l", vec![options.end.0.into(), options.end.1.into()]));
        operations.push(Operation::new("S", vec![]));

        self.append_content(page_id, operations)
    }

    fn draw_polyline(
        &mut self,
        index: u32,
        points: &[(f32, f32)],
        options: &StrokeOptions,
    ) -> Result<(), PdfEngineError> {
        let page_id = self.page_id(index)?;
        let Some(((first_x, first_y), rest)) = points.split_first() else {
            return Ok(());
        };

        let mut operations = self.begin_marks(page_id, options.opacity)?;
        operations.push(Operation::new("RG", options.color.operands()));
        operations.push(Operation::new("w", vec![options.thickness.into()]));
        operations.push(Operation::new("J", vec![1i64.into()]));
        operations.push(Operation::new("j", vec![1i64.into()]));
        operations.push(Operation::new("m", vec![(*first_x).into(), (*first_y).into()]));
        if rest.is_empty() {
            operations.push(Operation::new("l", vec![(*first_x).into(), (*first_y).into()]));
        }
        for (x, y) in rest {
            operations.push(Operation::new("l", vec![(*x).into(), (*y).into()]));
        }
        operations.push(Operation::new("S", vec![]));

        self.append_content(page_id, operations)
    }

    fn set_rotation(&mut self, index: u32, degrees: i32) -> Result<(), PdfEngineError> {
        let page_id = self.page_id(index)?;
        let normalized = degrees.rem_euclid(360);
        self.doc.get_dictionary_mut(page_id)?.set("Rotate", normalized as i64);
        Ok(())
    }

    fn remove_page(&mut self, index: u32) -> Result<(), PdfEngineError> {
        self.page_id(index)?;
        self.doc.delete_pages(&[index + 1]);
        self.refresh_page_ids();
        Ok(())
    }

    fn save(&mut self) -> Result<Vec<u8>, PdfEngineError> {
        let mut bytes = Vec::new();
        self.doc.save_to(&mut bytes)?;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_pdf_bytes;
    use image::{DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};

    fn letter(pages: usize) -> LopdfDocument {
        let sizes = vec![(612.0, 792.0); pages];
        LopdfDocument::load(&sample_pdf_bytes(&sizes, "Original")).expect("fixture should load")
    }

    fn page_operations(document: &LopdfDocument, index: u32) -> Vec<Operation> {
        let page_id = document.page_id(index).expect("page exists");
        let bytes = document.doc.get_page_content(page_id).expect("content");
        Content::decode(&bytes).expect("decodes").operations
    }

    fn encode(image: DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut bytes = Vec::new();
        image.write_to(&mut Cursor::new(&mut bytes), format).expect("encode fixture");
        bytes
    }

    fn rect(opacity: f32) -> RectangleOptions {
        RectangleOptions {
            x: 100.0,
            y: 672.0,
            width: 200.0,
            height: 20.0,
            fill: Some(RgbColor::new(1.0, 1.0, 0.0)),
            border: None,
            border_width: 0.0,
            opacity,
        }
    }

    #[test]
    fn reads_page_info() {
        let document = letter(2);
        assert_eq!(document.page_count(), 2);
        assert_eq!(
            document.page(1).expect("page"),
            PageInfo { width: 612.0, height: 792.0, rotation: 0 }
        );
    }

    #[test]
    fn first_draw_isolates_existing_content() {
        let mut document = letter(1);
        document.draw_rectangle(0, &rect(1.0)).expect("draw");

        let operators: Vec<_> =
            page_operations(&document, 0).into_iter().map(|op| op.operator).collect();
        assert_eq!(operators.first().map(String::as_str), Some("q"));
        assert!(operators.contains(&"re".to_owned()));
        assert!(operators.contains(&"f".to_owned()));
        assert_eq!(operators.last().map(String::as_str), Some("Q"));
    }

    #[test]
    fn translucent_fill_binds_opacity_state() {
        let mut document = letter(1);
        document.draw_rectangle(0, &rect(0.3)).expect("draw");
        document.draw_rectangle(0, &rect(0.3)).expect("draw");

        let page_id = document.page_id(0).expect("page");
        let resources = document.page_resources(page_id).expect("resources");
        let states = resources.get(b"ExtGState").and_then(Object::as_dict).expect("states");
        assert_eq!(states.len(), 1);
        assert!(states.has(b"GSM0"));
    }

    #[test]
    fn text_font_is_bound_once_beside_existing_fonts() {
        let mut document = letter(1);
        let font = document.embed_font(StandardFont::Helvetica).expect("font");
        let options = TextOptions {
            x: 10.0,
            y: 700.0,
            size: 16.0,
            font,
            color: RgbColor::BLACK,
            opacity: 1.0,
        };
        document.draw_text(0, "one", &options).expect("draw");
        document.draw_text(0, "two", &options).expect("draw");

        let page_id = document.page_id(0).expect("page");
        let resources = document.page_resources(page_id).expect("resources");
        let fonts = resources.get(b"Font").and_then(Object::as_dict).expect("fonts");
        assert!(fonts.has(b"F1"));
        assert!(fonts.has(b"FM0"));
        assert_eq!(fonts.len(), 2);
    }

    #[test]
    fn multi_line_text_advances_with_leading() {
        let mut document = letter(1);
        let font = document.embed_font(StandardFont::Courier).expect("font");
        let options =
            TextOptions { x: 0.0, y: 0.0, size: 10.0, font, color: RgbColor::BLACK, opacity: 1.0 };
        document.draw_text(0, "a\nb", &options).expect("draw");

        let operators: Vec<_> =
            page_operations(&document, 0).into_iter().map(|op| op.operator).collect();
        assert_eq!(operators.iter().filter(|op| *op == "Tj").count(), 3);
        assert_eq!(operators.iter().filter(|op| *op == "T*").count(), 1);
    }

    #[test]
    fn png_with_alpha_gets_soft_mask() {
        let mut image = RgbaImage::from_pixel(4, 2, Rgba([255, 0, 0, 255]));
        image.put_pixel(0, 0, Rgba([0, 0, 0, 0]));
        let bytes = encode(DynamicImage::ImageRgba8(image), ImageFormat::Png);

        let mut document = letter(1);
        let image = document.embed_png(&bytes).expect("embed");
        assert_eq!((image.width_px, image.height_px), (4, 2));

        let stream = document.doc.get_object(image.id).and_then(Object::as_stream).expect("stream");
        assert!(stream.dict.has(b"SMask"));
    }

    #[test]
    fn jpeg_is_embedded_without_recompression() {
        let image = RgbImage::from_pixel(8, 8, Rgb([10, 20, 30]));
        let bytes = encode(DynamicImage::ImageRgb8(image), ImageFormat::Jpeg);

        let mut document = letter(1);
        let image = document.embed_jpg(&bytes).expect("embed");
        let stream = document.doc.get_object(image.id).and_then(Object::as_stream).expect("stream");

        assert_eq!(stream.content, bytes);
        assert_eq!(
            stream.dict.get(b"Filter").and_then(Object::as_name).expect("filter"),
            b"DCTDecode"
        );
    }

    #[test]
    fn invalid_png_is_an_error() {
        let mut document = letter(1);
        assert!(matches!(document.embed_png(b"not a png"), Err(PdfEngineError::Image(_))));
    }

    #[test]
    fn rotation_is_normalized() {
        let mut document = letter(1);
        document.set_rotation(0, -90).expect("rotate");
        assert_eq!(document.page(0).expect("page").rotation, 270);
        document.set_rotation(0, 450).expect("rotate");
        assert_eq!(document.page(0).expect("page").rotation, 90);
    }

    #[test]
    fn remove_page_renumbers() {
        let mut document = letter(3);
        document.remove_page(2).expect("remove");
        document.remove_page(0).expect("remove");
        assert_eq!(document.page_count(), 1);
        assert!(document.remove_page(1).is_err());
    }

    #[test]
    fn same_mutations_produce_identical_bytes() {
        let bytes = sample_pdf_bytes(&[(612.0, 792.0), (612.0, 792.0)], "Original");
        let run = || {
            let mut document = LopdfDocument::load(&bytes).expect("load");
            document.draw_rectangle(0, &rect(0.3)).expect("draw");
            document.set_rotation(1, 90).expect("rotate");
            document.save().expect("save")
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn win_ansi_encoding_maps_typographic_quotes() {
        assert_eq!(encode_win_ansi("\u{201c}hi\u{201d}"), vec![0x93, b'h', b'i', 0x94]);
        assert_eq!(encode_win_ansi("\u{4e2d}"), b"?".to_vec());
    }
}
