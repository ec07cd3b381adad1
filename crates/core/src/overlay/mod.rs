//! Interactive surfaces, one per visible page, and the tool state they share.

pub mod builders;
mod surface;
mod tool;

pub use surface::{SelectionEvent, Surface, SurfaceId, SurfaceTarget};
pub use tool::{Cursor, ShapeKind, Tool};

use crate::config::BrushSettings;
use doc_model::{AnnotationId, AnnotationRecord, PageAnnotations, Point};
use std::collections::BTreeMap;
use tracing::debug;

/// Hit-test slack around thin geometry, in overlay units.
pub const HIT_TOLERANCE: f32 = 4.0;

/// The object currently selected, across all surfaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveObject {
    pub page: u32,
    pub id: AnnotationId,
}

/// Owns the mounted surfaces, the global tool and the cross-surface selection.
///
/// Object mutations on pages without a surface are ignored; the annotation
/// store keeps those records until the page is mounted.
#[derive(Debug, Default)]
pub struct OverlayManager {
    surfaces: BTreeMap<u32, Surface>,
    tool: Tool,
    brush: BrushSettings,
    active: Option<ActiveObject>,
    next_surface: u64,
}

impl OverlayManager {
    pub fn new(brush: BrushSettings) -> Self {
        Self { brush, ..Self::default() }
    }

    /// Mounts a surface for `page`, replacing any previous one.
    pub fn init(
        &mut self,
        page: u32,
        target: SurfaceTarget,
        width: f32,
        height: f32,
    ) -> SurfaceId {
        self.destroy(page);
        self.next_surface += 1;
        let id = SurfaceId(self.next_surface);
        self.surfaces.insert(page, Surface::new(id, page, target, width, height, self.tool));
        debug!(page, surface = id.0, "overlay surface mounted");
        id
    }

    pub fn destroy(&mut self, page: u32) -> bool {
        let Some(surface) = self.surfaces.remove(&page) else {
            return false;
        };
        if self.active.as_ref().is_some_and(|active| active.page == page) {
            self.active = None;
        }
        debug!(page, surface = surface.id().0, "overlay surface destroyed");
        true
    }

    pub fn destroy_all(&mut self) {
        self.surfaces.clear();
        self.active = None;
    }

    pub fn surface(&self, page: u32) -> Option<&Surface> {
        self.surfaces.get(&page)
    }

    pub fn surface_id(&self, page: u32) -> Option<SurfaceId> {
        self.surfaces.get(&page).map(Surface::id)
    }

    pub fn is_mounted(&self, page: u32) -> bool {
        self.surfaces.contains_key(&page)
    }

    pub fn mounted_pages(&self) -> impl Iterator<Item = u32> + '_ {
        self.surfaces.keys().copied()
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    /// Switches the global tool; every surface updates its mode and cursor.
    pub fn set_tool(&mut self, tool: Tool) {
        self.tool = tool;
        for surface in self.surfaces.values_mut() {
            surface.apply_tool(tool);
        }
    }

    pub fn brush(&self) -> BrushSettings {
        self.brush
    }

    pub fn set_brush(&mut self, brush: BrushSettings) {
        self.brush = brush;
    }

    pub fn active(&self) -> Option<&ActiveObject> {
        self.active.as_ref()
    }

    /// Applies a selection change reported by the surface on `page`.
    ///
    /// A new selection clears the selection of every other surface.
    pub fn handle_selection_event(&mut self, page: u32, event: SelectionEvent) {
        match event {
            SelectionEvent::Created(id) | SelectionEvent::Updated(id) => {
                for (other_page, surface) in self.surfaces.iter_mut() {
                    if *other_page != page {
                        surface.discard_active();
                    }
                }
                self.active = Some(ActiveObject { page, id });
            }
            SelectionEvent::Cleared => {
                if self.active.as_ref().is_some_and(|active| active.page == page) {
                    self.active = None;
                }
            }
        }
    }

    /// Selects an object on a mounted page; `false` if it is not there.
    pub fn select(&mut self, page: u32, id: &AnnotationId) -> bool {
        let Some(surface) = self.surfaces.get_mut(&page) else {
            return false;
        };
        if surface.object(id).is_none() {
            return false;
        }
        if let Some(event) = surface.select(id) {
            self.handle_selection_event(page, event);
        }
        true
    }

    pub fn clear_selection(&mut self) {
        let Some(active) = self.active.clone() else {
            return;
        };
        if let Some(event) = self.surfaces.get_mut(&active.page).and_then(Surface::discard_active) {
            self.handle_selection_event(active.page, event);
        }
        self.active = None;
    }

    pub(crate) fn insert_object(
        &mut self,
        page: u32,
        position: Option<usize>,
        object: AnnotationRecord,
    ) {
        if let Some(surface) = self.surfaces.get_mut(&page) {
            surface.insert(position, object);
        }
    }

    pub(crate) fn remove_object(&mut self, page: u32, id: &AnnotationId) {
        let event = self
            .surfaces
            .get_mut(&page)
            .and_then(|surface| surface.remove(id))
            .and_then(|(_, event)| event);
        if let Some(event) = event {
            self.handle_selection_event(page, event);
        }
    }

    pub(crate) fn replace_object(&mut self, page: u32, object: AnnotationRecord) {
        if let Some(surface) = self.surfaces.get_mut(&page) {
            surface.replace(object);
        }
    }

    /// Replaces a surface's objects wholesale.
    pub(crate) fn reset_page(&mut self, page: u32, objects: Vec<AnnotationRecord>) {
        let event = self.surfaces.get_mut(&page).and_then(|surface| surface.reset_objects(objects));
        if let Some(event) = event {
            self.handle_selection_event(page, event);
        }
    }

    /// Snapshot of every mounted surface; pages without objects are omitted.
    pub fn get_all_annotations(&self) -> PageAnnotations {
        let mut snapshot = PageAnnotations::new();
        for (page, surface) in &self.surfaces {
            snapshot.insert(*page, surface.objects().to_vec());
        }
        snapshot
    }

    /// Rebuilds every mounted surface from `snapshot`.
    ///
    /// Mounted pages missing from the snapshot are emptied. Returns the pages
    /// that were skipped because they have no surface.
    pub fn load_annotations(&mut self, snapshot: &PageAnnotations) -> Vec<u32> {
        let mounted: Vec<u32> = self.surfaces.keys().copied().collect();
        for page in mounted {
            let objects = snapshot.get(page).map(<[_]>::to_vec).unwrap_or_default();
            self.reset_page(page, objects);
        }

        let skipped: Vec<u32> = snapshot.pages().filter(|page| !self.is_mounted(*page)).collect();
        if !skipped.is_empty() {
            debug!(?skipped, "annotations for unmounted pages not loaded into overlay");
        }
        skipped
    }

    /// Topmost object under `point` on a mounted page.
    pub fn hit_test(&self, page: u32, point: &Point) -> Option<&AnnotationRecord> {
        self.surfaces.get(&page)?.hit_test(point, HIT_TOLERANCE)
    }

    pub(crate) fn begin_stroke(&mut self, page: u32, point: Point) -> bool {
        match self.surfaces.get_mut(&page) {
            Some(surface) if surface.drawing_mode() => {
                surface.begin_stroke(point);
                true
            }
            _ => false,
        }
    }

    pub(crate) fn extend_stroke(&mut self, page: u32, point: Point) -> bool {
        self.surfaces.get_mut(&page).is_some_and(|surface| surface.extend_stroke(point))
    }

    pub(crate) fn finish_stroke(&mut self, page: u32) -> Option<Vec<Point>> {
        self.surfaces.get_mut(&page)?.finish_stroke()
    }
}
