//! Raster assets carried inside annotations as base64 data URLs.

use crate::error::AssetError;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::{ImageFormat, RgbaImage};
use std::io::Cursor;

/// Formats the document can embed directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Jpeg,
}

impl ImageKind {
    pub fn mime(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }
}

/// Embeddable bytes pulled out of a data URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetBytes {
    pub kind: ImageKind,
    pub bytes: Vec<u8>,
}

/// A decoded image ready to become an `image` annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub data_url: String,
    pub width: u32,
    pub height: u32,
}

fn split_data_url(url: &str) -> Result<(&str, &str), AssetError> {
    let rest = url.strip_prefix("data:").ok_or(AssetError::NotDataUrl)?;
    let (header, payload) = rest.split_once(',').ok_or(AssetError::NotDataUrl)?;
    let mime = header.strip_suffix(";base64").ok_or(AssetError::NotDataUrl)?;
    Ok((mime, payload))
}

/// Decodes a data URL and classifies its image type.
///
/// A `data:image/png` prefix means PNG and `image/jpeg` (or `image/jpg`)
/// means JPEG. Other prefixes fall back to sniffing the bytes.
pub fn decode_data_url(url: &str) -> Result<AssetBytes, AssetError> {
    let (mime, payload) = split_data_url(url)?;
    let bytes = BASE64.decode(payload.trim())?;

    let kind = match mime.to_ascii_lowercase().as_str() {
        "image/png" => ImageKind::Png,
        "image/jpeg" | "image/jpg" => ImageKind::Jpeg,
        other => match image::guess_format(&bytes) {
            Ok(ImageFormat::Png) => ImageKind::Png,
            Ok(ImageFormat::Jpeg) => ImageKind::Jpeg,
            _ => return Err(AssetError::UnsupportedType(other.to_owned())),
        },
    };

    Ok(AssetBytes { kind, bytes })
}

pub fn to_data_url(kind: ImageKind, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", kind.mime(), BASE64.encode(bytes))
}

pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, image::ImageError> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

pub fn png_data_url(image: &RgbaImage) -> Result<String, image::ImageError> {
    Ok(to_data_url(ImageKind::Png, &encode_png(image)?))
}

/// Decodes raw image bytes of any supported format.
///
/// PNG and JPEG keep their original bytes; other formats are re-encoded as
/// PNG so the result can always be embedded.
pub fn normalize_image(bytes: &[u8]) -> Result<DecodedImage, AssetError> {
    let format = image::guess_format(bytes)?;
    let decoded = image::load_from_memory_with_format(bytes, format)?;
    let (width, height) = (decoded.width(), decoded.height());

    let data_url = match format {
        ImageFormat::Png => to_data_url(ImageKind::Png, bytes),
        ImageFormat::Jpeg => to_data_url(ImageKind::Jpeg, bytes),
        _ => png_data_url(&decoded.to_rgba8())?,
    };

    Ok(DecodedImage { data_url, width, height })
}

/// Validates a data URL by decoding it fully.
pub fn decode_image_data_url(url: &str) -> Result<DecodedImage, AssetError> {
    let (_, payload) = split_data_url(url)?;
    let bytes = BASE64.decode(payload.trim())?;
    normalize_image(&bytes)
}
