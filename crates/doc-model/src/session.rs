//! Persisted session shape and structural page edits.

use crate::annotation::{AnnotationRecord, FlatAnnotation};
use crate::{defaults, ModelError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Page number (1-based) to z-ordered annotation records.
///
/// Serializes as a JSON object keyed by page number.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageAnnotations(pub BTreeMap<u32, Vec<AnnotationRecord>>);

impl PageAnnotations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(Vec::is_empty)
    }

    pub fn pages(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.keys().copied()
    }

    pub fn get(&self, page: u32) -> Option<&[AnnotationRecord]> {
        self.0.get(&page).map(Vec::as_slice)
    }

    pub fn insert(&mut self, page: u32, records: Vec<AnnotationRecord>) {
        if records.is_empty() {
            self.0.remove(&page);
        } else {
            self.0.insert(page, records);
        }
    }

    pub fn count(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    /// Ascending page, then z-order within each page.
    pub fn flatten(&self) -> Vec<FlatAnnotation> {
        self.0
            .iter()
            .flat_map(|(page, records)| {
                records
                    .iter()
                    .map(move |record| FlatAnnotation { page: *page, record: record.clone() })
            })
            .collect()
    }
}

impl FromIterator<FlatAnnotation> for PageAnnotations {
    fn from_iter<I: IntoIterator<Item = FlatAnnotation>>(iter: I) -> Self {
        let mut pages: BTreeMap<u32, Vec<AnnotationRecord>> = BTreeMap::new();
        for flat in iter {
            pages.entry(flat.page).or_default().push(flat.record);
        }
        Self(pages)
    }
}

/// Page-level edit referring to an original (0-based) page index.
///
/// Deserialized rotations go through [`StructuralEdit::rotate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
#[serde(try_from = "RawStructuralEdit")]
pub enum StructuralEdit {
    Rotate {
        page_index: u32,
        angle: i32,
    },
    Delete {
        page_index: u32,
    },
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
enum RawStructuralEdit {
    Rotate {
        page_index: u32,
        #[serde(default = "default_rotation")]
        angle: i32,
    },
    Delete {
        page_index: u32,
    },
}

impl TryFrom<RawStructuralEdit> for StructuralEdit {
    type Error = ModelError;

    fn try_from(raw: RawStructuralEdit) -> Result<Self, Self::Error> {
        match raw {
            RawStructuralEdit::Rotate { page_index, angle } => Self::rotate(page_index, angle),
            RawStructuralEdit::Delete { page_index } => Ok(Self::delete(page_index)),
        }
    }
}

fn default_rotation() -> i32 {
    defaults::ROTATION_DELTA
}

impl StructuralEdit {
    /// Rotation by `angle` degrees; only quarter turns are representable in a document.
    pub fn rotate(page_index: u32, angle: i32) -> Result<Self, ModelError> {
        if angle % 90 != 0 {
            return Err(ModelError::InvalidRotation(angle));
        }
        Ok(Self::Rotate { page_index, angle })
    }

    pub fn delete(page_index: u32) -> Self {
        Self::Delete { page_index }
    }

    pub fn page_index(&self) -> u32 {
        match self {
            Self::Rotate { page_index, .. } | Self::Delete { page_index } => *page_index,
        }
    }
}

/// Session exchanged with external persistence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSession {
    pub file_url: String,
    #[serde(default)]
    pub annotations: PageAnnotations,
    #[serde(default)]
    pub page_modifications: Vec<StructuralEdit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_name: Option<String>,
}
