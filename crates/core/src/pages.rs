//! Rendering pages under the overlay, one page at a time.
//!
//! A page that fails to render or extract is logged and left out; the rest
//! of the batch carries on.

use crate::editor::Editor;
use crate::error::EditorError;
use crate::overlay::{SurfaceId, SurfaceTarget};
use futures_lite::future::yield_now;
use pdf_engine::{DocumentHandle, DocumentRenderer, RgbaImage, Viewport};
use std::collections::BTreeMap;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct MountedPage {
    pub page: u32,
    pub surface: SurfaceId,
    pub viewport: Viewport,
    pub raster: RgbaImage,
}

#[derive(Debug, Default)]
pub struct MountReport {
    pub mounted: Vec<MountedPage>,
    /// 1-based page number and the reason it was not mounted.
    pub failed: Vec<(u32, String)>,
}

/// Renders each page in `pages` (1-based) at `scale` and mounts an overlay
/// surface sized to the rendered viewport.
pub async fn mount_pages<R: DocumentRenderer>(
    editor: &mut Editor,
    renderer: &R,
    handle: DocumentHandle,
    pages: &[u32],
    scale: f32,
) -> MountReport {
    let mut report = MountReport::default();

    for &page in pages {
        yield_now().await;
        match render_page(renderer, handle, page, scale) {
            Ok((viewport, raster)) => {
                let target = SurfaceTarget(format!("page-{page}"));
                match editor.init_surface(page, target, viewport.width, viewport.height) {
                    Ok(surface) => report.mounted.push(MountedPage { page, surface, viewport, raster }),
                    Err(err) => {
                        warn!(page, error = %err, "page rendered but could not be mounted");
                        report.failed.push((page, err.to_string()));
                    }
                }
            }
            Err(err) => {
                warn!(page, error = %err, "page render failed");
                report.failed.push((page, err.to_string()));
            }
        }
    }

    report
}

fn render_page<R: DocumentRenderer>(
    renderer: &R,
    handle: DocumentHandle,
    page: u32,
    scale: f32,
) -> Result<(Viewport, RgbaImage), EditorError> {
    let index = page.checked_sub(1).ok_or(EditorError::PageOutOfRange { page, page_count: 0 })?;
    let viewport = renderer.viewport(handle, index, scale)?;
    let raster = renderer.render(handle, &viewport)?;
    Ok((viewport, raster))
}

/// Text of each requested page (1-based); pages that fail are omitted.
pub async fn extract_texts<R: DocumentRenderer>(
    renderer: &R,
    handle: DocumentHandle,
    pages: &[u32],
) -> BTreeMap<u32, String> {
    let mut texts = BTreeMap::new();
    for &page in pages {
        yield_now().await;
        let Some(index) = page.checked_sub(1) else {
            warn!(page, "page numbers start at 1");
            continue;
        };
        match renderer.text_content(handle, index) {
            Ok(text) => {
                texts.insert(page, text);
            }
            Err(err) => warn!(page, error = %err, "text extraction failed"),
        }
    }
    texts
}
