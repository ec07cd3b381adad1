use directories::ProjectDirs;
use doc_model::PersistedSession;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const SESSION_SCHEMA_VERSION: u32 = 1;
const SESSION_DIR: &str = "sessions";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("unable to resolve local data directory")]
    NoDataDirectory,
    #[error("session name must not be empty")]
    EmptyName,
    #[error("unsupported session schema version {0}")]
    UnsupportedVersion(u32),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Named editing sessions saved as JSON files under one root directory.
#[derive(Debug, Clone)]
pub struct SessionStore {
    root: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionEnvelope {
    version: u32,
    name: String,
    session: PersistedSession,
}

/// Maps a session name to a file stem; bytes outside `[A-Za-z0-9_-]` are
/// percent-encoded so distinct names never share a file.
fn file_stem(name: &str) -> String {
    let mut stem = String::with_capacity(name.len());
    for byte in name.bytes() {
        match byte {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_' => stem.push(byte as char),
            _ => stem.push_str(&format!("%{byte:02X}")),
        }
    }
    stem
}

impl SessionStore {
    pub fn from_default_project() -> Result<Self, StorageError> {
        let dirs = ProjectDirs::from("dev", "PdfMarkup", "PdfMarkup")
            .ok_or(StorageError::NoDataDirectory)?;

        Ok(Self { root: dirs.data_local_dir().to_path_buf() })
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the editor configuration file lives.
    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    /// Saves `session` under `name`, replacing any session of that name.
    ///
    /// The file is written next to its destination and renamed into place.
    pub fn save_session(&self, name: &str, session: &PersistedSession) -> Result<PathBuf, StorageError> {
        let path = self.session_path(name)?;
        fs::create_dir_all(self.sessions_dir())?;

        let envelope = SessionEnvelope {
            version: SESSION_SCHEMA_VERSION,
            name: name.to_owned(),
            session: session.clone(),
        };
        let bytes = serde_json::to_vec_pretty(&envelope)?;

        let temp = path.with_extension("json.tmp");
        fs::write(&temp, bytes)?;
        fs::rename(&temp, &path)?;
        debug!(name, path = %path.display(), "session saved");
        Ok(path)
    }

    /// Loads the session saved under `name`; `Ok(None)` if there is none.
    pub fn load_session(&self, name: &str) -> Result<Option<PersistedSession>, StorageError> {
        let path = self.session_path(name)?;
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(Self::read_envelope(&path)?.session))
    }

    /// Names of all readable saved sessions, sorted.
    pub fn list_sessions(&self) -> Result<Vec<String>, StorageError> {
        let dir = self.sessions_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            match Self::read_envelope(&path) {
                Ok(envelope) => names.push(envelope.name),
                Err(err) => warn!(path = %path.display(), error = %err, "skipping unreadable session"),
            }
        }
        names.sort();
        Ok(names)
    }

    /// Returns `false` if no session of that name existed.
    pub fn delete_session(&self, name: &str) -> Result<bool, StorageError> {
        let path = self.session_path(name)?;
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(path)?;
        Ok(true)
    }

    fn read_envelope(path: &Path) -> Result<SessionEnvelope, StorageError> {
        let bytes = fs::read(path)?;
        let envelope: SessionEnvelope = serde_json::from_slice(&bytes)?;
        if envelope.version != SESSION_SCHEMA_VERSION {
            return Err(StorageError::UnsupportedVersion(envelope.version));
        }
        Ok(envelope)
    }

    fn sessions_dir(&self) -> PathBuf {
        self.root.join(SESSION_DIR)
    }

    fn session_path(&self, name: &str) -> Result<PathBuf, StorageError> {
        if name.trim().is_empty() {
            return Err(StorageError::EmptyName);
        }
        Ok(self.sessions_dir().join(format!("{}.json", file_stem(name))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_model::{
        AnnotationId, AnnotationRecord, AnnotationShape, AnnotationStyle, PageAnnotations,
        StructuralEdit,
    };

    fn session() -> PersistedSession {
        let mut annotations = PageAnnotations::new();
        annotations.insert(
            2,
            vec![AnnotationRecord::new(
                AnnotationShape::Whiteout { x: 1.0, y: 2.0, width: Some(3.0), height: Some(4.0) },
                AnnotationStyle::default(),
            )
            .with_id(AnnotationId::from("annot_1"))],
        );
        PersistedSession {
            file_url: "file:///contract.pdf".into(),
            annotations,
            page_modifications: vec![StructuralEdit::delete(0)],
            session_name: Some("review".into()),
        }
    }

    #[test]
    fn session_round_trip() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let store = SessionStore::with_root(temp.path());

        store.save_session("review", &session()).expect("save should succeed");
        let loaded = store.load_session("review").expect("load should succeed");

        assert_eq!(loaded, Some(session()));
    }

    #[test]
    fn missing_session_loads_as_none() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let store = SessionStore::with_root(temp.path());

        assert_eq!(store.load_session("nothing").expect("load should succeed"), None);
        assert!(store.list_sessions().expect("list should succeed").is_empty());
    }

    #[test]
    fn save_replaces_and_leaves_no_temp_file() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let store = SessionStore::with_root(temp.path());

        store.save_session("draft", &PersistedSession::default()).expect("first save");
        let path = store.save_session("draft", &session()).expect("second save");

        assert_eq!(store.load_session("draft").expect("load"), Some(session()));
        let files: Vec<_> = fs::read_dir(path.parent().expect("parent")).expect("read dir").collect();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn names_with_separators_stay_distinct() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let store = SessionStore::with_root(temp.path());

        store.save_session("a/b", &session()).expect("save");
        store.save_session("a_b", &PersistedSession::default()).expect("save");
        store.save_session("Q3 review", &PersistedSession::default()).expect("save");

        assert_eq!(
            store.list_sessions().expect("list"),
            vec!["Q3 review".to_owned(), "a/b".to_owned(), "a_b".to_owned()]
        );
        assert_eq!(store.load_session("a/b").expect("load"), Some(session()));
    }

    #[test]
    fn delete_reports_whether_anything_was_removed() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let store = SessionStore::with_root(temp.path());
        store.save_session("old", &session()).expect("save");

        assert!(store.delete_session("old").expect("delete"));
        assert!(!store.delete_session("old").expect("delete again"));
        assert_eq!(store.load_session("old").expect("load"), None);
    }

    #[test]
    fn rejects_empty_names_and_unknown_versions() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let store = SessionStore::with_root(temp.path());
        assert!(matches!(store.save_session("  ", &session()), Err(StorageError::EmptyName)));

        let path = store.save_session("future", &session()).expect("save");
        let raw = fs::read_to_string(&path).expect("read");
        fs::write(&path, raw.replacen("\"version\": 1", "\"version\": 9", 1)).expect("write");

        assert!(matches!(store.load_session("future"), Err(StorageError::UnsupportedVersion(9))));
        assert!(store.list_sessions().expect("list").is_empty());
    }

    #[test]
    fn config_lives_under_root() {
        let store = SessionStore::with_root("/tmp/pdf-markup");
        assert_eq!(store.config_path(), PathBuf::from("/tmp/pdf-markup/config.toml"));
    }
}
