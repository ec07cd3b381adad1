use super::tool::{Cursor, Tool};
use doc_model::{AnnotationId, AnnotationRecord, Point};

/// Identity of one mounted surface; a re-mounted page gets a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(pub(crate) u64);

/// Opaque handle of the host element a surface is attached to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SurfaceTarget(pub String);

impl From<&str> for SurfaceTarget {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// Selection change reported by a surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionEvent {
    Created(AnnotationId),
    Updated(AnnotationId),
    Cleared,
}

/// Interactive layer over one rendered page.
///
/// Holds the page's objects in z-order plus interaction state. Content is
/// only changed through [`super::OverlayManager`].
#[derive(Debug, Clone)]
pub struct Surface {
    id: SurfaceId,
    page: u32,
    target: SurfaceTarget,
    width: f32,
    height: f32,
    objects: Vec<AnnotationRecord>,
    active: Option<AnnotationId>,
    drawing_mode: bool,
    selection_enabled: bool,
    cursor: Cursor,
    stroke: Option<Vec<Point>>,
}

impl Surface {
    pub(crate) fn new(
        id: SurfaceId,
        page: u32,
        target: SurfaceTarget,
        width: f32,
        height: f32,
        tool: Tool,
    ) -> Self {
        let mut surface = Self {
            id,
            page,
            target,
            width,
            height,
            objects: Vec::new(),
            active: None,
            drawing_mode: false,
            selection_enabled: true,
            cursor: Cursor::Default,
            stroke: None,
        };
        surface.apply_tool(tool);
        surface
    }

    pub fn id(&self) -> SurfaceId {
        self.id
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn target(&self) -> &SurfaceTarget {
        &self.target
    }

    pub fn size(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    pub fn objects(&self) -> &[AnnotationRecord] {
        &self.objects
    }

    pub fn object(&self, id: &AnnotationId) -> Option<&AnnotationRecord> {
        self.objects.iter().find(|object| &object.id == id)
    }

    pub fn active(&self) -> Option<&AnnotationId> {
        self.active.as_ref()
    }

    pub fn drawing_mode(&self) -> bool {
        self.drawing_mode
    }

    pub fn selection_enabled(&self) -> bool {
        self.selection_enabled
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub(crate) fn apply_tool(&mut self, tool: Tool) {
        self.drawing_mode = tool.is_drawing();
        self.selection_enabled = tool.allows_selection();
        self.cursor = tool.cursor();
        if !self.drawing_mode {
            self.stroke = None;
        }
    }

    pub(crate) fn insert(&mut self, position: Option<usize>, object: AnnotationRecord) {
        let position = position.unwrap_or(self.objects.len()).min(self.objects.len());
        self.objects.insert(position, object);
    }

    /// Removes an object; the selection is cleared if it pointed at it.
    pub(crate) fn remove(
        &mut self,
        id: &AnnotationId,
    ) -> Option<(AnnotationRecord, Option<SelectionEvent>)> {
        let position = self.objects.iter().position(|object| &object.id == id)?;
        let object = self.objects.remove(position);
        let event = if self.active.as_ref() == Some(id) { self.discard_active() } else { None };
        Some((object, event))
    }

    pub(crate) fn replace(&mut self, object: AnnotationRecord) -> bool {
        match self.objects.iter_mut().find(|existing| existing.id == object.id) {
            Some(slot) => {
                *slot = object;
                true
            }
            None => false,
        }
    }

    pub(crate) fn reset_objects(&mut self, objects: Vec<AnnotationRecord>) -> Option<SelectionEvent> {
        self.objects = objects;
        self.discard_active()
    }

    /// Marks an object active and reports the change.
    pub(crate) fn select(&mut self, id: &AnnotationId) -> Option<SelectionEvent> {
        self.object(id)?;
        let event = match &self.active {
            Some(current) if current == id => return None,
            Some(_) => SelectionEvent::Updated(id.clone()),
            None => SelectionEvent::Created(id.clone()),
        };
        self.active = Some(id.clone());
        Some(event)
    }

    pub(crate) fn discard_active(&mut self) -> Option<SelectionEvent> {
        self.active.take().map(|_| SelectionEvent::Cleared)
    }

    /// Topmost object under `point`.
    pub fn hit_test(&self, point: &Point, tolerance: f32) -> Option<&AnnotationRecord> {
        self.objects.iter().rev().find(|object| object.shape.contains_point(point, tolerance))
    }

    pub(crate) fn begin_stroke(&mut self, point: Point) {
        self.stroke = Some(vec![point]);
    }

    pub(crate) fn extend_stroke(&mut self, point: Point) -> bool {
        match &mut self.stroke {
            Some(points) => {
                points.push(point);
                true
            }
            None => false,
        }
    }

    pub(crate) fn finish_stroke(&mut self) -> Option<Vec<Point>> {
        self.stroke.take()
    }

    pub fn stroke_in_progress(&self) -> bool {
        self.stroke.is_some()
    }
}
