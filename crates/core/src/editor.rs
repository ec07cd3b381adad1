//! The editing session.
//!
//! An [`Editor`] owns one loaded document together with its annotation store,
//! overlay surfaces, structural edits and undo history. Every change to
//! annotations or page structure is a command run through the history, so
//! the session can always be undone back to the state after the last load.

use crate::asset::{self, DecodedImage};
use crate::commands::{
    AddAnnotation, AddStructuralEdit, RemoveAnnotation, UpdateAnnotation, Workspace,
};
use crate::config::{BrushSettings, EditorConfig};
use crate::error::EditorError;
use crate::export::{export_document, ExportJob, ExportedDocument};
use crate::history::{Command, CommandHistory};
use crate::overlay::{builders, ActiveObject, OverlayManager, ShapeKind, SurfaceId, SurfaceTarget, Tool};
use crate::store::AnnotationStore;
use chrono::{DateTime, Utc};
use doc_model::{
    defaults, AnnotationId, AnnotationPatch, AnnotationRecord, FlatAnnotation, PageAnnotations,
    PersistedSession, Point, StructuralEdit,
};
use futures_lite::future::yield_now;
use pdf_engine::{DocumentMutator, LopdfDocument};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The document a session edits. The bytes are never modified.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    file_url: String,
    bytes: Arc<[u8]>,
    page_count: u32,
}

impl LoadedDocument {
    pub fn file_url(&self) -> &str {
        &self.file_url
    }

    pub fn bytes(&self) -> &Arc<[u8]> {
        &self.bytes
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }
}

/// An image insertion waiting for its asset to decode.
///
/// Remembers the surface it was started on; if that surface is gone by the
/// time decoding finishes the insertion is dropped.
#[derive(Debug, Clone)]
pub struct PendingImage {
    page: u32,
    surface: SurfaceId,
    at: Point,
    data_url: String,
}

impl PendingImage {
    pub fn page(&self) -> u32 {
        self.page
    }

    pub async fn decode(self) -> Result<DecodedPendingImage, EditorError> {
        yield_now().await;
        let image = asset::decode_image_data_url(&self.data_url)?;
        Ok(DecodedPendingImage { page: self.page, surface: self.surface, at: self.at, image })
    }
}

#[derive(Debug, Clone)]
pub struct DecodedPendingImage {
    page: u32,
    surface: SurfaceId,
    at: Point,
    image: DecodedImage,
}

/// What a pointer event did.
#[derive(Debug, Clone, PartialEq)]
pub enum GestureOutcome {
    Ignored,
    Selected(ActiveObject),
    SelectionCleared,
    Dragging,
    Moved(AnnotationRecord),
    Created(AnnotationRecord),
    Erased(AnnotationId),
    StrokeStarted,
    StrokeExtended,
    StrokeCommitted(AnnotationRecord),
}

/// A select-tool drag between pointer down and pointer up.
#[derive(Debug, Clone)]
struct Drag {
    page: u32,
    origin: Point,
    before: AnnotationRecord,
}

pub struct Editor {
    config: EditorConfig,
    document: Option<LoadedDocument>,
    workspace: Workspace,
    history: CommandHistory<Workspace, EditorError>,
    drag: Option<Drag>,
    session_name: Option<String>,
    dirty: bool,
    last_saved: Option<DateTime<Utc>>,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl std::fmt::Debug for Editor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Editor")
            .field("document", &self.document.as_ref().map(LoadedDocument::file_url))
            .field("annotations", &self.workspace.store.count())
            .field("edits", &self.workspace.edits.len())
            .field("history", &self.history)
            .field("dirty", &self.dirty)
            .finish()
    }
}

impl Editor {
    pub fn new(config: EditorConfig) -> Self {
        let history = CommandHistory::with_capacity(config.history_capacity);
        let workspace = Workspace::new(OverlayManager::new(config.brush));
        Self {
            config,
            document: None,
            workspace,
            history,
            drag: None,
            session_name: None,
            dirty: false,
            last_saved: None,
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn document(&self) -> Option<&LoadedDocument> {
        self.document.as_ref()
    }

    pub fn page_count(&self) -> Option<u32> {
        self.document.as_ref().map(LoadedDocument::page_count)
    }

    pub fn store(&self) -> &AnnotationStore {
        &self.workspace.store
    }

    pub fn overlay(&self) -> &OverlayManager {
        &self.workspace.overlay
    }

    pub fn structural_edits(&self) -> &[StructuralEdit] {
        &self.workspace.edits
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn session_name(&self) -> Option<&str> {
        self.session_name.as_deref()
    }

    pub fn last_saved(&self) -> Option<DateTime<Utc>> {
        self.last_saved
    }

    /// Opens a document, discarding the previous session entirely.
    ///
    /// The bytes are parsed once to validate them and count pages; a failure
    /// leaves the current session untouched.
    pub fn load_document(
        &mut self,
        file_url: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Result<u32, EditorError> {
        let file_url = file_url.into();
        let bytes = bytes.into();
        let page_count = LopdfDocument::load(&bytes)?.page_count();

        self.reset();
        info!(%file_url, page_count, bytes = bytes.len(), "document loaded");
        self.document = Some(LoadedDocument { file_url, bytes, page_count });
        Ok(page_count)
    }

    /// Ends the session.
    pub fn close_document(&mut self) {
        if let Some(document) = self.document.take() {
            info!(file_url = %document.file_url, "document closed");
        }
        self.reset();
    }

    fn reset(&mut self) {
        self.workspace = Workspace::new(OverlayManager::new(self.workspace.overlay.brush()));
        self.history.clear();
        self.drag = None;
        self.session_name = None;
        self.dirty = false;
        self.last_saved = None;
    }

    fn require_page(&self, page: u32) -> Result<(), EditorError> {
        let page_count = self.page_count().ok_or(EditorError::NoDocument)?;
        if page == 0 || page > page_count {
            return Err(EditorError::PageOutOfRange { page, page_count });
        }
        Ok(())
    }

    fn require_surface(&self, page: u32) -> Result<SurfaceId, EditorError> {
        self.workspace.overlay.surface_id(page).ok_or(EditorError::SurfaceNotMounted(page))
    }

    fn run<C>(&mut self, command: C) -> Result<(), EditorError>
    where
        C: Command<Workspace, Error = EditorError> + 'static,
    {
        self.cancel_drag();
        let description = command.description();
        self.history.execute(command, &mut self.workspace)?;
        debug!(%description, "command executed");
        self.dirty = true;
        Ok(())
    }

    // Surfaces

    /// Mounts the overlay for `page` and fills it from the store.
    pub fn init_surface(
        &mut self,
        page: u32,
        target: impl Into<SurfaceTarget>,
        width: f32,
        height: f32,
    ) -> Result<SurfaceId, EditorError> {
        self.require_page(page)?;
        if self.drag.as_ref().is_some_and(|drag| drag.page == page) {
            self.drag = None;
        }
        let overlay = &mut self.workspace.overlay;
        let id = overlay.init(page, target.into(), width, height);
        overlay.reset_page(page, self.workspace.store.page(page).to_vec());
        Ok(id)
    }

    pub fn destroy_surface(&mut self, page: u32) -> bool {
        if self.drag.as_ref().is_some_and(|drag| drag.page == page) {
            self.drag = None;
        }
        self.workspace.overlay.destroy(page)
    }

    pub fn destroy_all_surfaces(&mut self) {
        self.drag = None;
        self.workspace.overlay.destroy_all();
    }

    pub fn tool(&self) -> Tool {
        self.workspace.overlay.tool()
    }

    pub fn set_tool(&mut self, tool: Tool) {
        self.cancel_drag();
        self.workspace.overlay.set_tool(tool);
    }

    pub fn set_brush(&mut self, brush: BrushSettings) {
        self.workspace.overlay.set_brush(brush);
    }

    pub fn select(&mut self, page: u32, id: &AnnotationId) -> bool {
        self.workspace.overlay.select(page, id)
    }

    pub fn clear_selection(&mut self) {
        self.workspace.overlay.clear_selection();
    }

    // Creation

    fn create(&mut self, page: u32, record: AnnotationRecord, select: bool) -> Result<AnnotationRecord, EditorError> {
        self.require_surface(page)?;
        let command = AddAnnotation::new(page, record);
        let stored = command.record().clone();
        self.run(command)?;
        if select {
            self.workspace.overlay.select(page, &stored.id);
        }
        Ok(stored)
    }

    /// Adds a text box; `at` defaults to the standard origin.
    pub fn add_text(
        &mut self,
        page: u32,
        at: Option<Point>,
        text: Option<&str>,
    ) -> Result<AnnotationRecord, EditorError> {
        let record = builders::text(at.unwrap_or_else(builders::default_origin), text, &self.config);
        self.create(page, record, true)
    }

    pub fn add_highlight(&mut self, page: u32, at: Option<Point>) -> Result<AnnotationRecord, EditorError> {
        let record = builders::highlight(at.unwrap_or_else(builders::default_origin), &self.config);
        self.create(page, record, true)
    }

    pub fn add_whiteout(&mut self, page: u32, at: Option<Point>) -> Result<AnnotationRecord, EditorError> {
        let record = builders::whiteout(at.unwrap_or_else(builders::default_origin));
        self.create(page, record, true)
    }

    pub fn add_shape(
        &mut self,
        page: u32,
        kind: ShapeKind,
        at: Option<Point>,
    ) -> Result<AnnotationRecord, EditorError> {
        let record = builders::shape(kind, at.unwrap_or_else(builders::default_origin));
        self.create(page, record, true)
    }

    /// Starts an image insertion; finish it with [`Self::finish_image`] once
    /// [`PendingImage::decode`] resolves.
    pub fn begin_image(
        &self,
        page: u32,
        at: Option<Point>,
        data_url: impl Into<String>,
    ) -> Result<PendingImage, EditorError> {
        let surface = self.require_surface(page)?;
        Ok(PendingImage {
            page,
            surface,
            at: at.unwrap_or_else(builders::default_origin),
            data_url: data_url.into(),
        })
    }

    /// Places a decoded image. Returns `Ok(None)` if the surface it was
    /// started on has been destroyed or replaced meanwhile.
    pub fn finish_image(
        &mut self,
        decoded: DecodedPendingImage,
    ) -> Result<Option<AnnotationRecord>, EditorError> {
        let DecodedPendingImage { page, surface, at, image } = decoded;
        if self.workspace.overlay.surface_id(page) != Some(surface) {
            debug!(page, "surface gone before image decoded; insertion discarded");
            return Ok(None);
        }
        let record =
            builders::image(at, image.data_url, (image.width, image.height), self.config.image_scale);
        self.create(page, record, true).map(Some)
    }

    pub async fn add_image(
        &mut self,
        page: u32,
        at: Option<Point>,
        data_url: impl Into<String>,
    ) -> Result<Option<AnnotationRecord>, EditorError> {
        let pending = self.begin_image(page, at, data_url)?;
        let decoded = pending.decode().await?;
        self.finish_image(decoded)
    }

    // Editing

    /// Deletes the active object if it lives on `page`.
    pub fn delete_selected(&mut self, page: u32) -> Result<Option<AnnotationId>, EditorError> {
        let Some(active) = self.workspace.overlay.active().filter(|active| active.page == page).cloned()
        else {
            return Ok(None);
        };
        self.delete_annotation(page, &active.id).map(|()| Some(active.id))
    }

    pub fn delete_annotation(&mut self, page: u32, id: &AnnotationId) -> Result<(), EditorError> {
        let command = RemoveAnnotation::capture(&self.workspace, page, id)?;
        self.run(command)
    }

    pub fn move_annotation(
        &mut self,
        page: u32,
        id: &AnnotationId,
        dx: f32,
        dy: f32,
    ) -> Result<AnnotationRecord, EditorError> {
        let command = UpdateAnnotation::moved(&self.workspace, page, id, dx, dy)?;
        self.run_update(command)
    }

    pub fn resize_annotation(
        &mut self,
        page: u32,
        id: &AnnotationId,
        width: f32,
        height: f32,
    ) -> Result<AnnotationRecord, EditorError> {
        let command = UpdateAnnotation::resized(&self.workspace, page, id, width, height)?;
        self.run_update(command)
    }

    /// Applies a partial update (restyle, edit text, reposition).
    pub fn update_annotation(
        &mut self,
        page: u32,
        id: &AnnotationId,
        patch: &AnnotationPatch,
    ) -> Result<AnnotationRecord, EditorError> {
        let command = UpdateAnnotation::patch(&self.workspace, page, id, patch)?;
        self.run_update(command)
    }

    fn run_update(&mut self, command: UpdateAnnotation) -> Result<AnnotationRecord, EditorError> {
        let after = command.after().clone();
        if !command.is_noop() {
            self.run(command)?;
        }
        Ok(after)
    }

    /// Queues a rotation of the original page `page_index` (0-based).
    /// `angle` defaults to a quarter turn.
    pub fn rotate_page(&mut self, page_index: u32, angle: Option<i32>) -> Result<(), EditorError> {
        self.require_page(page_index.saturating_add(1))?;
        let edit = StructuralEdit::rotate(page_index, angle.unwrap_or(defaults::ROTATION_DELTA))?;
        self.run(AddStructuralEdit::new(edit))
    }

    /// Queues deletion of the original page `page_index` (0-based).
    /// Annotation page numbers are not renumbered.
    pub fn delete_page(&mut self, page_index: u32) -> Result<(), EditorError> {
        self.require_page(page_index.saturating_add(1))?;
        self.run(AddStructuralEdit::new(StructuralEdit::delete(page_index)))
    }

    pub fn undo(&mut self) -> Result<bool, EditorError> {
        self.cancel_drag();
        let undone = self.history.undo(&mut self.workspace)?;
        if undone {
            self.dirty = true;
        }
        Ok(undone)
    }

    pub fn redo(&mut self) -> Result<bool, EditorError> {
        self.cancel_drag();
        let redone = self.history.redo(&mut self.workspace)?;
        if redone {
            self.dirty = true;
        }
        Ok(redone)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo_description(&self) -> Option<String> {
        self.history.next_undo()
    }

    pub fn redo_description(&self) -> Option<String> {
        self.history.next_redo()
    }

    // Snapshots

    /// Annotations on the mounted surfaces, keyed by page.
    pub fn get_all_annotations(&self) -> PageAnnotations {
        self.workspace.overlay.get_all_annotations()
    }

    /// Every stored annotation, mounted or not.
    pub fn annotations(&self) -> PageAnnotations {
        self.workspace.store.snapshot()
    }

    pub fn flat_list(&self) -> Vec<FlatAnnotation> {
        self.workspace.store.flat_list()
    }

    /// Replaces all annotations with `snapshot` and clears the history.
    ///
    /// Pages without a surface keep their records in the store and show
    /// them once mounted. Returns those pages.
    pub fn load_annotations(&mut self, snapshot: &PageAnnotations) -> Result<Vec<u32>, EditorError> {
        let store = AnnotationStore::from_snapshot(snapshot)?;
        self.drag = None;
        self.workspace.store = store;
        let unmounted = self.workspace.overlay.load_annotations(&self.workspace.store.snapshot());
        self.history.clear();
        self.dirty = true;
        Ok(unmounted)
    }

    pub fn to_persisted(&self) -> Result<PersistedSession, EditorError> {
        let document = self.document.as_ref().ok_or(EditorError::NoDocument)?;
        Ok(PersistedSession {
            file_url: document.file_url.clone(),
            annotations: self.workspace.store.snapshot(),
            page_modifications: self.workspace.edits.clone(),
            session_name: self.session_name.clone(),
        })
    }

    /// Restores annotations and structural edits saved for the loaded document.
    pub fn restore_session(&mut self, session: &PersistedSession) -> Result<Vec<u32>, EditorError> {
        let document = self.document.as_ref().ok_or(EditorError::NoDocument)?;
        if document.file_url != session.file_url {
            warn!(
                loaded = %document.file_url,
                saved = %session.file_url,
                "restoring a session saved for another document"
            );
        }
        for edit in &session.page_modifications {
            if let StructuralEdit::Rotate { page_index, angle } = *edit {
                StructuralEdit::rotate(page_index, angle)?;
            }
        }
        let unmounted = self.load_annotations(&session.annotations)?;
        self.workspace.edits = session.page_modifications.clone();
        self.session_name = session.session_name.clone();
        self.dirty = false;
        info!(
            annotations = session.annotations.count(),
            edits = session.page_modifications.len(),
            "session restored"
        );
        Ok(unmounted)
    }

    pub fn mark_saved(&mut self, name: impl Into<String>) {
        self.session_name = Some(name.into());
        self.last_saved = Some(Utc::now());
        self.dirty = false;
    }

    // Export

    pub fn export_job(&self) -> Result<ExportJob, EditorError> {
        let document = self.document.as_ref().ok_or(EditorError::NoDocument)?;
        Ok(ExportJob {
            source: Arc::clone(&document.bytes),
            annotations: self.workspace.store.flat_list(),
            edits: self.workspace.edits.clone(),
            file_name: self.config.export_file_name.clone(),
        })
    }

    /// Exports through the `lopdf` mutator. Session state is not touched.
    pub async fn export(&self) -> Result<ExportedDocument, EditorError> {
        self.export_with::<LopdfDocument>().await
    }

    pub async fn export_with<M: DocumentMutator>(&self) -> Result<ExportedDocument, EditorError> {
        let job = self.export_job()?;
        Ok(export_document::<M>(&job).await?)
    }

    // Gestures

    pub fn pointer_down(&mut self, page: u32, point: Point) -> Result<GestureOutcome, EditorError> {
        self.require_surface(page)?;
        self.cancel_drag();

        let tool = self.tool();
        match tool {
            Tool::Select => {
                let Some(hit) = self.workspace.overlay.hit_test(page, &point).cloned() else {
                    self.workspace.overlay.clear_selection();
                    return Ok(GestureOutcome::SelectionCleared);
                };
                self.workspace.overlay.select(page, &hit.id);
                let active = ActiveObject { page, id: hit.id.clone() };
                self.drag = Some(Drag { page, origin: point, before: hit });
                Ok(GestureOutcome::Selected(active))
            }
            Tool::Eraser => {
                let Some(id) = self.workspace.overlay.hit_test(page, &point).map(|hit| hit.id.clone())
                else {
                    return Ok(GestureOutcome::Ignored);
                };
                self.delete_annotation(page, &id)?;
                Ok(GestureOutcome::Erased(id))
            }
            Tool::Draw => {
                if self.workspace.overlay.begin_stroke(page, point) {
                    Ok(GestureOutcome::StrokeStarted)
                } else {
                    Ok(GestureOutcome::Ignored)
                }
            }
            Tool::Text => self.add_text(page, Some(point), None).map(GestureOutcome::Created),
            Tool::Highlight => self.add_highlight(page, Some(point)).map(GestureOutcome::Created),
            Tool::Whiteout => self.add_whiteout(page, Some(point)).map(GestureOutcome::Created),
            Tool::Shape(kind) => self.add_shape(page, kind, Some(point)).map(GestureOutcome::Created),
            Tool::Image => Ok(GestureOutcome::Ignored),
        }
    }

    pub fn pointer_move(&mut self, page: u32, point: Point) -> Result<GestureOutcome, EditorError> {
        self.require_surface(page)?;

        if let Some(drag) = self.drag.as_ref().filter(|drag| drag.page == page) {
            let live = drag.before.translated(point.x - drag.origin.x, point.y - drag.origin.y);
            self.workspace.overlay.replace_object(page, live);
            return Ok(GestureOutcome::Dragging);
        }
        if self.workspace.overlay.extend_stroke(page, point) {
            return Ok(GestureOutcome::StrokeExtended);
        }
        Ok(GestureOutcome::Ignored)
    }

    /// Commits a drag as one move command, or a stroke as one path.
    pub fn pointer_up(&mut self, page: u32, point: Point) -> Result<GestureOutcome, EditorError> {
        self.require_surface(page)?;

        let drag = match self.drag.take() {
            Some(drag) if drag.page == page => Some(drag),
            other => {
                self.drag = other;
                None
            }
        };
        if let Some(drag) = drag {
            let (dx, dy) = (point.x - drag.origin.x, point.y - drag.origin.y);
            if dx == 0.0 && dy == 0.0 {
                self.workspace.overlay.replace_object(page, drag.before);
                return Ok(GestureOutcome::Ignored);
            }
            let after = drag.before.translated(dx, dy);
            let command = UpdateAnnotation::between(page, drag.before, after.clone(), "Move");
            self.run(command)?;
            return Ok(GestureOutcome::Moved(after));
        }

        if self.tool() == Tool::Draw {
            self.workspace.overlay.extend_stroke(page, point);
            let Some(points) = self.workspace.overlay.finish_stroke(page) else {
                return Ok(GestureOutcome::Ignored);
            };
            if points.len() < 2 {
                debug!(page, "single-point stroke discarded");
                return Ok(GestureOutcome::Ignored);
            }
            let record = builders::path(points, &self.workspace.overlay.brush());
            return self.create(page, record, false).map(GestureOutcome::StrokeCommitted);
        }
        Ok(GestureOutcome::Ignored)
    }

    /// Puts a dragged object back where the store has it.
    fn cancel_drag(&mut self) {
        if let Some(drag) = self.drag.take() {
            self.workspace.overlay.replace_object(drag.page, drag.before);
        }
    }
}
