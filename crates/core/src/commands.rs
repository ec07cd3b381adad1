//! Editor commands: every change to annotations or page structure.
//!
//! Each command captures the records it needs by value when it is built, so
//! undo restores exactly what was there regardless of what ran in between.

use crate::error::EditorError;
use crate::history::Command;
use crate::overlay::OverlayManager;
use crate::store::AnnotationStore;
use doc_model::{AnnotationId, AnnotationPatch, AnnotationRecord, StructuralEdit};

/// Everything a command may touch.
#[derive(Debug, Default)]
pub struct Workspace {
    pub store: AnnotationStore,
    pub overlay: OverlayManager,
    pub edits: Vec<StructuralEdit>,
}

impl Workspace {
    pub fn new(overlay: OverlayManager) -> Self {
        Self { store: AnnotationStore::new(), overlay, edits: Vec::new() }
    }

    fn record(&self, page: u32, id: &AnnotationId) -> Result<AnnotationRecord, EditorError> {
        self.store
            .get(page, id)
            .cloned()
            .ok_or_else(|| EditorError::AnnotationNotFound { page, id: id.clone() })
    }
}

/// Adds a record on top of a page and mirrors it onto the page's surface.
#[derive(Debug, Clone)]
pub struct AddAnnotation {
    page: u32,
    record: AnnotationRecord,
}

impl AddAnnotation {
    /// Assigns the id up front so redo recreates the same record.
    pub fn new(page: u32, mut record: AnnotationRecord) -> Self {
        if record.id.is_empty() {
            record.id = AnnotationId::generate();
        }
        Self { page, record }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn record(&self) -> &AnnotationRecord {
        &self.record
    }
}

impl Command<Workspace> for AddAnnotation {
    type Error = EditorError;

    fn execute(&mut self, target: &mut Workspace) -> Result<(), EditorError> {
        let stored = target.store.add(self.page, self.record.clone())?;
        target.overlay.insert_object(self.page, None, stored);
        Ok(())
    }

    fn undo(&mut self, target: &mut Workspace) -> Result<(), EditorError> {
        target.store.remove(self.page, &self.record.id).ok_or_else(|| {
            EditorError::AnnotationNotFound { page: self.page, id: self.record.id.clone() }
        })?;
        target.overlay.remove_object(self.page, &self.record.id);
        Ok(())
    }

    fn description(&self) -> String {
        format!("Add {} on page {}", self.record.kind().as_str(), self.page)
    }
}

/// Deletes a record; undo puts it back at its original z-order position.
#[derive(Debug, Clone)]
pub struct RemoveAnnotation {
    page: u32,
    position: usize,
    record: AnnotationRecord,
}

impl RemoveAnnotation {
    pub fn capture(
        workspace: &Workspace,
        page: u32,
        id: &AnnotationId,
    ) -> Result<Self, EditorError> {
        let record = workspace.record(page, id)?;
        let position = workspace.store.position(page, id).unwrap_or_default();
        Ok(Self { page, position, record })
    }

    pub fn id(&self) -> &AnnotationId {
        &self.record.id
    }
}

impl Command<Workspace> for RemoveAnnotation {
    type Error = EditorError;

    fn execute(&mut self, target: &mut Workspace) -> Result<(), EditorError> {
        let (position, _) = target.store.remove(self.page, &self.record.id).ok_or_else(|| {
            EditorError::AnnotationNotFound { page: self.page, id: self.record.id.clone() }
        })?;
        self.position = position;
        target.overlay.remove_object(self.page, &self.record.id);
        Ok(())
    }

    fn undo(&mut self, target: &mut Workspace) -> Result<(), EditorError> {
        let restored = target.store.insert_at(self.page, self.position, self.record.clone())?;
        target.overlay.insert_object(self.page, Some(self.position), restored);
        Ok(())
    }

    fn description(&self) -> String {
        format!("Delete {} on page {}", self.record.kind().as_str(), self.page)
    }
}

/// Swaps a record between two full versions: move, resize, restyle, edit text.
#[derive(Debug, Clone)]
pub struct UpdateAnnotation {
    page: u32,
    before: AnnotationRecord,
    after: AnnotationRecord,
    label: &'static str,
}

impl UpdateAnnotation {
    pub fn patch(
        workspace: &Workspace,
        page: u32,
        id: &AnnotationId,
        patch: &AnnotationPatch,
    ) -> Result<Self, EditorError> {
        let before = workspace.record(page, id)?;
        let after = before.patched(patch);
        let label = if patch.text.is_some() { "Edit" } else { "Update" };
        Ok(Self { page, before, after, label })
    }

    pub fn moved(
        workspace: &Workspace,
        page: u32,
        id: &AnnotationId,
        dx: f32,
        dy: f32,
    ) -> Result<Self, EditorError> {
        let before = workspace.record(page, id)?;
        Ok(Self::between(page, before.clone(), before.translated(dx, dy), "Move"))
    }

    pub fn resized(
        workspace: &Workspace,
        page: u32,
        id: &AnnotationId,
        width: f32,
        height: f32,
    ) -> Result<Self, EditorError> {
        let patch =
            AnnotationPatch { width: Some(width), height: Some(height), ..AnnotationPatch::default() };
        let before = workspace.record(page, id)?;
        let after = before.patched(&patch);
        Ok(Self::between(page, before, after, "Resize"))
    }

    /// Update from an already-known prior version, as after a live drag.
    pub fn between(
        page: u32,
        before: AnnotationRecord,
        after: AnnotationRecord,
        label: &'static str,
    ) -> Self {
        Self { page, before, after, label }
    }

    pub fn is_noop(&self) -> bool {
        self.before == self.after
    }

    pub fn after(&self) -> &AnnotationRecord {
        &self.after
    }

    fn apply(
        &self,
        target: &mut Workspace,
        record: &AnnotationRecord,
    ) -> Result<(), EditorError> {
        target.store.replace(self.page, record.clone()).ok_or_else(|| {
            EditorError::AnnotationNotFound { page: self.page, id: record.id.clone() }
        })?;
        target.overlay.replace_object(self.page, record.clone());
        Ok(())
    }
}

impl Command<Workspace> for UpdateAnnotation {
    type Error = EditorError;

    fn execute(&mut self, target: &mut Workspace) -> Result<(), EditorError> {
        self.apply(target, &self.after)
    }

    fn undo(&mut self, target: &mut Workspace) -> Result<(), EditorError> {
        self.apply(target, &self.before)
    }

    fn description(&self) -> String {
        format!("{} {} on page {}", self.label, self.after.kind().as_str(), self.page)
    }
}

/// Appends a rotate or delete to the structural edit list.
#[derive(Debug, Clone)]
pub struct AddStructuralEdit {
    edit: StructuralEdit,
}

impl AddStructuralEdit {
    pub fn new(edit: StructuralEdit) -> Self {
        Self { edit }
    }
}

impl Command<Workspace> for AddStructuralEdit {
    type Error = EditorError;

    fn execute(&mut self, target: &mut Workspace) -> Result<(), EditorError> {
        target.edits.push(self.edit);
        Ok(())
    }

    fn undo(&mut self, target: &mut Workspace) -> Result<(), EditorError> {
        if let Some(position) = target.edits.iter().rposition(|edit| *edit == self.edit) {
            target.edits.remove(position);
        }
        Ok(())
    }

    fn description(&self) -> String {
        match self.edit {
            StructuralEdit::Rotate { page_index, angle } => {
                format!("Rotate page {} by {angle}°", page_index + 1)
            }
            StructuralEdit::Delete { page_index } => format!("Delete page {}", page_index + 1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::CommandHistory;
    use crate::overlay::SurfaceTarget;
    use doc_model::{AnnotationShape, AnnotationStyle, Color};
    use proptest::prelude::*;

    fn rect(x: f32) -> AnnotationRecord {
        AnnotationRecord::new(
            AnnotationShape::Rectangle { x, y: 10.0, width: Some(20.0), height: Some(20.0) },
            AnnotationStyle::default(),
        )
    }

    fn workspace() -> Workspace {
        let mut overlay = OverlayManager::default();
        overlay.init(1, SurfaceTarget::from("p1"), 612.0, 792.0);
        Workspace::new(overlay)
    }

    #[test]
    fn add_then_undo_then_redo_keeps_id() {
        let mut ws = workspace();
        let mut history = CommandHistory::new();
        let command = AddAnnotation::new(1, rect(0.0));
        let id = command.record().id.clone();

        history.execute(command, &mut ws).unwrap();
        assert_eq!(ws.overlay.surface(1).unwrap().objects().len(), 1);

        history.undo(&mut ws).unwrap();
        assert!(ws.store.is_empty());
        assert!(ws.overlay.surface(1).unwrap().objects().is_empty());

        history.redo(&mut ws).unwrap();
        assert_eq!(ws.store.page(1)[0].id, id);
    }

    #[test]
    fn remove_undo_restores_z_order() {
        let mut ws = workspace();
        let mut history = CommandHistory::new();
        for x in [0.0, 1.0, 2.0] {
            history.execute(AddAnnotation::new(1, rect(x)), &mut ws).unwrap();
        }
        let before = ws.store.snapshot();
        let middle = ws.store.page(1)[1].id.clone();

        let remove = RemoveAnnotation::capture(&ws, 1, &middle).unwrap();
        history.execute(remove, &mut ws).unwrap();
        assert_eq!(ws.store.count(), 2);

        history.undo(&mut ws).unwrap();
        assert_eq!(ws.store.snapshot(), before);
        assert_eq!(ws.overlay.get_all_annotations(), before);
    }

    #[test]
    fn update_swaps_full_records() {
        let mut ws = workspace();
        let mut history = CommandHistory::new();
        history.execute(AddAnnotation::new(1, rect(0.0)), &mut ws).unwrap();
        let id = ws.store.page(1)[0].id.clone();
        let original = ws.store.page(1)[0].clone();

        let patch = AnnotationPatch {
            color: Some(Color::RED),
            opacity: Some(0.5),
            ..AnnotationPatch::default()
        };
        history.execute(UpdateAnnotation::patch(&ws, 1, &id, &patch).unwrap(), &mut ws).unwrap();
        history.execute(UpdateAnnotation::moved(&ws, 1, &id, 5.0, 5.0).unwrap(), &mut ws).unwrap();
        assert_eq!(ws.store.page(1)[0].style.color, Some(Color::RED));
        assert_eq!(ws.store.page(1)[0].shape.origin().x, 5.0);

        history.undo(&mut ws).unwrap();
        history.undo(&mut ws).unwrap();
        assert_eq!(ws.store.page(1)[0], original);
    }

    #[test]
    fn capture_of_missing_record_fails() {
        let ws = workspace();
        let err = RemoveAnnotation::capture(&ws, 1, &AnnotationId::from("missing")).unwrap_err();
        assert!(matches!(err, EditorError::AnnotationNotFound { page: 1, .. }));
    }

    #[test]
    fn structural_edits_undo_in_reverse() {
        let mut ws = workspace();
        let mut history = CommandHistory::new();
        history
            .execute(AddStructuralEdit::new(StructuralEdit::Rotate { page_index: 0, angle: 90 }), &mut ws)
            .unwrap();
        history.execute(AddStructuralEdit::new(StructuralEdit::delete(1)), &mut ws).unwrap();

        history.undo(&mut ws).unwrap();
        assert_eq!(ws.edits, vec![StructuralEdit::Rotate { page_index: 0, angle: 90 }]);
        assert_eq!(history.next_undo().as_deref(), Some("Rotate page 1 by 90°"));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Add(u32),
        Remove(usize),
        Move(usize),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (1u32..4).prop_map(Op::Add),
            any::<usize>().prop_map(Op::Remove),
            any::<usize>().prop_map(Op::Move),
        ]
    }

    proptest! {
        #[test]
        fn undoing_everything_restores_the_store(ops in proptest::collection::vec(op(), 1..25)) {
            let mut ws = workspace();
            let mut history: CommandHistory<Workspace, EditorError> =
                CommandHistory::with_capacity(100);
            history.execute(AddAnnotation::new(1, rect(0.0)), &mut ws).unwrap();
            let initial = ws.store.snapshot();
            let mut executed = 0;

            for op in ops {
                let flat = ws.store.flat_list();
                match op {
                    Op::Add(page) => {
                        history.execute(AddAnnotation::new(page, rect(1.0)), &mut ws).unwrap();
                    }
                    Op::Remove(_) | Op::Move(_) if flat.is_empty() => continue,
                    Op::Remove(pick) => {
                        let target = &flat[pick % flat.len()];
                        let command = RemoveAnnotation::capture(&ws, target.page, &target.record.id).unwrap();
                        history.execute(command, &mut ws).unwrap();
                    }
                    Op::Move(pick) => {
                        let target = &flat[pick % flat.len()];
                        let command = UpdateAnnotation::moved(&ws, target.page, &target.record.id, 3.0, -2.0).unwrap();
                        history.execute(command, &mut ws).unwrap();
                    }
                }
                executed += 1;
            }

            for _ in 0..executed {
                prop_assert!(history.undo(&mut ws).unwrap());
            }
            prop_assert_eq!(ws.store.snapshot(), initial);
        }
    }
}
