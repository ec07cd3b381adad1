//! Annotation editing core.
//!
//! Tracks annotations drawn over the pages of a loaded document, runs every
//! change through an undoable command history and bakes the result into a
//! new document on export.

pub mod asset;
pub mod commands;
pub mod config;
pub mod editor;
pub mod error;
pub mod export;
pub mod history;
pub mod overlay;
pub mod pages;
pub mod signature;
pub mod store;


pub use config::{BrushSettings, ConfigError, EditorConfig, HighlightDefaults, TextDefaults};
pub use editor::{DecodedPendingImage, Editor, GestureOutcome, LoadedDocument, PendingImage};
pub use error::{AssetError, EditorError, ExportError, SignatureError, StoreError};
pub use export::{export_document, ExportJob, ExportReport, ExportedDocument, SkipReason, SkippedItem};
pub use history::{Command, CommandHistory};
pub use overlay::{ActiveObject, Cursor, OverlayManager, ShapeKind, SurfaceId, SurfaceTarget, Tool};
pub use pages::{extract_texts, mount_pages, MountReport, MountedPage};
pub use signature::{SignatureAsset, SignatureMode, SignaturePad, TypedSignatureOptions};
pub use store::AnnotationStore;
