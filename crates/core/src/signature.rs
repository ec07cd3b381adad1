//! Signature capture: typed, drawn or uploaded, always ending as one PNG or
//! JPEG data URL that [`crate::Editor::add_image`] can place.

use crate::asset::{self, DecodedImage};
use crate::error::SignatureError;
use ab_glyph::{point, Font, FontRef, GlyphId, PxScale, ScaleFont};
use doc_model::Color;
use image::{Rgba, RgbaImage};
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureMode {
    Drawn,
    Typed,
    Uploaded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureAsset {
    pub data_url: String,
    pub mode: SignatureMode,
    pub width: u32,
    pub height: u32,
}

impl SignatureAsset {
    fn from_decoded(decoded: DecodedImage, mode: SignatureMode) -> Self {
        Self { data_url: decoded.data_url, mode, width: decoded.width, height: decoded.height }
    }
}

/// Canvas used for typed signatures.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TypedSignatureOptions {
    pub width: u32,
    pub height: u32,
    pub font_size: f32,
    pub color: Color,
    /// Left edge of the first glyph.
    pub inset_x: f32,
}

impl Default for TypedSignatureOptions {
    fn default() -> Self {
        Self { width: 300, height: 100, font_size: 36.0, color: Color::INK, inset_x: 10.0 }
    }
}

/// Rasterizes `text` onto a transparent canvas, vertically centered.
pub fn render_text(
    text: &str,
    font_bytes: &[u8],
    options: &TypedSignatureOptions,
) -> Result<RgbaImage, SignatureError> {
    if text.trim().is_empty() {
        return Err(SignatureError::Empty);
    }
    let font = FontRef::try_from_slice(font_bytes).map_err(|_| SignatureError::InvalidFont)?;
    let scale = PxScale::from(options.font_size);
    let scaled = font.as_scaled(scale);

    let (width, height) = (options.width, options.height);
    let mut canvas = RgbaImage::new(width, height);
    let baseline = height as f32 / 2.0 + (scaled.ascent() + scaled.descent()) / 2.0;
    let Color { r, g, b } = options.color;

    let mut caret = options.inset_x;
    let mut previous: Option<GlyphId> = None;
    for ch in text.chars() {
        let id = font.glyph_id(ch);
        if let Some(prev) = previous {
            caret += scaled.kern(prev, id);
        }
        let glyph = id.with_scale_and_position(scale, point(caret, baseline));
        caret += scaled.h_advance(id);
        previous = Some(id);

        let Some(outlined) = font.outline_glyph(glyph) else {
            continue;
        };
        let bounds = outlined.px_bounds();
        outlined.draw(|gx, gy, coverage| {
            let px = bounds.min.x as i64 + gx as i64;
            let py = bounds.min.y as i64 + gy as i64;
            if px < 0 || py < 0 || px >= width as i64 || py >= height as i64 {
                return;
            }
            let alpha = (coverage.clamp(0.0, 1.0) * 255.0).round() as u8;
            let pixel = canvas.get_pixel_mut(px as u32, py as u32);
            if alpha > pixel[3] {
                *pixel = Rgba([r, g, b, alpha]);
            }
        });
    }

    Ok(canvas)
}

/// Holds the most recently captured signature.
#[derive(Debug, Clone, Default)]
pub struct SignaturePad {
    current: Option<SignatureAsset>,
}

impl SignaturePad {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&SignatureAsset> {
        self.current.as_ref()
    }

    pub fn mode(&self) -> Option<SignatureMode> {
        self.current.as_ref().map(|asset| asset.mode)
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_none()
    }

    pub fn clear(&mut self) {
        self.current = None;
    }

    pub fn capture_text(&mut self, text: &str, font_bytes: &[u8]) -> Result<&SignatureAsset, SignatureError> {
        self.capture_text_with(text, font_bytes, &TypedSignatureOptions::default())
    }

    pub fn capture_text_with(
        &mut self,
        text: &str,
        font_bytes: &[u8],
        options: &TypedSignatureOptions,
    ) -> Result<&SignatureAsset, SignatureError> {
        let canvas = render_text(text, font_bytes, options)?;
        let asset = SignatureAsset {
            data_url: asset::png_data_url(&canvas)?,
            mode: SignatureMode::Typed,
            width: canvas.width(),
            height: canvas.height(),
        };
        Ok(self.current.insert(asset))
    }

    /// Captures a freehand drawing. A fully transparent raster is rejected.
    pub fn capture_drawing(&mut self, raster: &RgbaImage) -> Result<&SignatureAsset, SignatureError> {
        if raster.pixels().all(|pixel| pixel[3] == 0) {
            return Err(SignatureError::Empty);
        }
        let asset = SignatureAsset {
            data_url: asset::png_data_url(raster)?,
            mode: SignatureMode::Drawn,
            width: raster.width(),
            height: raster.height(),
        };
        Ok(self.current.insert(asset))
    }

    /// Accepts uploaded bytes once they decode as an image.
    pub fn capture_upload(&mut self, bytes: &[u8]) -> Result<&SignatureAsset, SignatureError> {
        let decoded = asset::normalize_image(bytes)?;
        Ok(self.current.insert(SignatureAsset::from_decoded(decoded, SignatureMode::Uploaded)))
    }

    pub async fn capture_file<P: AsRef<Path>>(&mut self, path: P) -> Result<&SignatureAsset, SignatureError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "reading signature upload");
        let bytes = std::fs::read(path).map_err(crate::error::AssetError::from)?;
        futures_lite::future::yield_now().await;
        self.capture_upload(&bytes)
    }
}
