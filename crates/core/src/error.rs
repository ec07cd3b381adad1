use doc_model::{AnnotationId, ModelError};
use pdf_engine::PdfEngineError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("page numbers start at 1")]
    InvalidPage,
    #[error("annotation id {0} is already in use")]
    DuplicateId(AnnotationId),
}

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("not a base64 data URL")]
    NotDataUrl,
    #[error("unsupported image type {0:?}")]
    UnsupportedType(String),
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("image decode failed: {0}")]
    Decode(#[from] image::ImageError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    #[error("no document is loaded")]
    NoDocument,
    #[error("page {0} has no mounted surface")]
    SurfaceNotMounted(u32),
    #[error("page {page} does not exist (page_count={page_count})")]
    PageOutOfRange { page: u32, page_count: u32 },
    #[error("annotation {id} not found on page {page}")]
    AnnotationNotFound { page: u32, id: AnnotationId },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Asset(#[from] AssetError),
    #[error(transparent)]
    Engine(#[from] PdfEngineError),
    #[error(transparent)]
    Export(#[from] ExportError),
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("every page would be deleted")]
    NoPagesLeft,
    #[error(transparent)]
    Engine(#[from] PdfEngineError),
    #[error("failed to write export: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    #[error("nothing to capture")]
    Empty,
    #[error("font data could not be parsed")]
    InvalidFont,
    #[error("image encode failed: {0}")]
    Encode(#[from] image::ImageError),
    #[error(transparent)]
    Asset(#[from] AssetError),
}
