//! Document and folder storage.
//!
//! Entities live in a flat arena referenced by id strings; a Folder never
//! contains Documents structurally, each Document holds the back-reference.
//! The "active document" is an explicit pointer here, and every read/mutate
//! operation is parameterized by id, never ambient state.

use crate::config::Config;
use crate::metadata::detect_title;
use crate::types::{Document, Folder, HistoryRecord};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::PathBuf;
use thiserror::Error;
use tracing::warn;

const WORKSPACE_FILE: &str = "workspace.json";

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("Folder not found: {0}")]
    FolderNotFound(String),
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Workspace {
    folders: Vec<Folder>,
    documents: Vec<Document>,
    active_id: Option<String>,
}

pub struct DocumentRepository {
    path: Option<PathBuf>,
    folders: Vec<Folder>,
    documents: Vec<Document>,
    active_id: Option<String>,
}

impl DocumentRepository {
    /// Open the workspace under the application data directory
    pub fn new() -> Result<Self, RepositoryError> {
        let config = Config::default();
        let data_dir = config.data_dir();
        fs::create_dir_all(&data_dir)?;
        Ok(Self::open(data_dir.join(WORKSPACE_FILE)))
    }

    /// Open a workspace backed by an explicit file path
    pub fn open(path: PathBuf) -> Self {
        let workspace = Self::load(&path);
        Self {
            path: Some(path),
            folders: workspace.folders,
            documents: workspace.documents,
            active_id: workspace.active_id,
        }
    }

    /// Unpersisted workspace, used by tests and embedding callers
    pub fn in_memory() -> Self {
        Self {
            path: None,
            folders: Vec::new(),
            documents: Vec::new(),
            active_id: None,
        }
    }

    fn load(path: &PathBuf) -> Workspace {
        if !path.exists() {
            return Workspace::default();
        }
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                warn!("Failed to read workspace {:?}: {}", path, e);
                return Workspace::default();
            }
        };
        match serde_json::from_str(&content) {
            Ok(workspace) => workspace,
            Err(e) => {
                warn!("Workspace {:?} is corrupt, starting empty: {}", path, e);
                Workspace::default()
            }
        }
    }

    /// Best-effort persistence after every mutation
    fn persist(&self) {
        let Some(path) = &self.path else { return };
        let workspace = Workspace {
            folders: self.folders.clone(),
            documents: self.documents.clone(),
            active_id: self.active_id.clone(),
        };
        let result = serde_json::to_string_pretty(&workspace)
            .map_err(RepositoryError::from)
            .and_then(|content| fs::write(path, content).map_err(RepositoryError::from));
        if let Err(e) = result {
            warn!("Failed to persist workspace: {}", e);
        }
    }

    // --- Folders ---

    pub fn create_folder(&mut self, name: impl Into<String>) -> String {
        let folder = Folder::new(name);
        let id = folder.id.clone();
        self.folders.push(folder);
        self.persist();
        id
    }

    pub fn rename_folder(&mut self, id: &str, name: &str) -> Result<(), RepositoryError> {
        let folder = self
            .folders
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or_else(|| RepositoryError::FolderNotFound(id.to_string()))?;
        folder.name = name.to_string();
        self.persist();
        Ok(())
    }

    /// Deleting a folder cascades to every document referencing it
    pub fn delete_folder(&mut self, id: &str) -> Result<(), RepositoryError> {
        if !self.folders.iter().any(|f| f.id == id) {
            return Err(RepositoryError::FolderNotFound(id.to_string()));
        }
        self.folders.retain(|f| f.id != id);

        let active_goes = self
            .active_id
            .as_ref()
            .and_then(|aid| self.get(aid))
            .is_some_and(|d| d.folder_id.as_deref() == Some(id));
        self.documents.retain(|d| d.folder_id.as_deref() != Some(id));
        if active_goes {
            self.active_id = None;
        }
        self.persist();
        Ok(())
    }

    pub fn folders(&self) -> &[Folder] {
        &self.folders
    }

    // --- Documents ---

    pub fn create_document(
        &mut self,
        folder_id: Option<&str>,
        title: impl Into<String>,
    ) -> String {
        let doc = Document::new(folder_id.map(str::to_string), title);
        let id = doc.id.clone();
        self.documents.push(doc);
        self.active_id = Some(id.clone());
        self.persist();
        id
    }

    pub fn rename_document(&mut self, id: &str, title: &str) -> Result<(), RepositoryError> {
        self.update(id, |doc| doc.title = title.to_string())
    }

    pub fn delete_document(&mut self, id: &str) -> Result<(), RepositoryError> {
        if !self.documents.iter().any(|d| d.id == id) {
            return Err(RepositoryError::DocumentNotFound(id.to_string()));
        }
        self.documents.retain(|d| d.id != id);
        if self.active_id.as_deref() == Some(id) {
            self.active_id = None;
        }
        self.persist();
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Document> {
        self.documents.iter().find(|d| d.id == id)
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// Apply a mutation to one document; bumps `updated_at`
    pub fn update(
        &mut self,
        id: &str,
        f: impl FnOnce(&mut Document),
    ) -> Result<(), RepositoryError> {
        let doc = self
            .documents
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| RepositoryError::DocumentNotFound(id.to_string()))?;
        f(doc);
        doc.updated_at = chrono::Utc::now();
        self.persist();
        Ok(())
    }

    /// Fill in an empty/default title from the document's own content
    pub fn refresh_title(&mut self, id: &str) -> Result<(), RepositoryError> {
        let doc = self
            .get(id)
            .ok_or_else(|| RepositoryError::DocumentNotFound(id.to_string()))?;
        let source = if doc.v2.is_empty() { &doc.v1 } else { &doc.v2 };
        let detected = detect_title(source);
        if !detected.is_empty() && detected != doc.title {
            self.update(id, |doc| doc.title = detected)?;
        }
        Ok(())
    }

    /// Load a history snapshot back into the document's V1 slot
    pub fn restore_snapshot(
        &mut self,
        id: &str,
        record: &HistoryRecord,
    ) -> Result<(), RepositoryError> {
        let title = record.doc_title.clone();
        let content = record.full_content.clone();
        self.update(id, |doc| {
            doc.v1 = content;
            doc.v2 = String::new();
            doc.patch_text = String::new();
            doc.title = title;
        })
    }

    // --- Active selection ---

    pub fn set_active(&mut self, id: &str) -> Result<(), RepositoryError> {
        if !self.documents.iter().any(|d| d.id == id) {
            return Err(RepositoryError::DocumentNotFound(id.to_string()));
        }
        self.active_id = Some(id.to_string());
        self.persist();
        Ok(())
    }

    pub fn clear_active(&mut self) {
        self.active_id = None;
        self.persist();
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active_id.as_deref()
    }

    pub fn active(&self) -> Option<&Document> {
        self.active_id.as_deref().and_then(|id| self.get(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn create_document_becomes_active() {
        let mut repo = DocumentRepository::in_memory();
        let id = repo.create_document(None, "Untitled Doc");
        assert_eq!(repo.active_id(), Some(id.as_str()));
        assert_eq!(repo.active().unwrap().title, "Untitled Doc");
    }

    #[test]
    fn folder_delete_cascades_to_documents() {
        let mut repo = DocumentRepository::in_memory();
        let folder = repo.create_folder("Project");
        let inside = repo.create_document(Some(&folder), "In folder");
        let outside = repo.create_document(None, "At root");

        repo.set_active(&inside).unwrap();
        repo.delete_folder(&folder).unwrap();

        assert!(repo.get(&inside).is_none());
        assert!(repo.get(&outside).is_some());
        assert!(repo.active_id().is_none());
        assert!(repo.folders().is_empty());
    }

    #[test]
    fn update_bumps_updated_at() {
        let mut repo = DocumentRepository::in_memory();
        let id = repo.create_document(None, "Doc");
        let before = repo.get(&id).unwrap().updated_at;

        repo.update(&id, |doc| doc.v1 = "# Hello".to_string()).unwrap();
        let doc = repo.get(&id).unwrap();
        assert_eq!(doc.v1, "# Hello");
        assert!(doc.updated_at >= before);
    }

    #[test]
    fn unknown_ids_are_errors() {
        let mut repo = DocumentRepository::in_memory();
        assert!(matches!(
            repo.update("nope", |_| {}),
            Err(RepositoryError::DocumentNotFound(_))
        ));
        assert!(matches!(
            repo.delete_folder("nope"),
            Err(RepositoryError::FolderNotFound(_))
        ));
        assert!(repo.set_active("nope").is_err());
    }

    #[test]
    fn refresh_title_detects_from_content() {
        let mut repo = DocumentRepository::in_memory();
        let id = repo.create_document(None, "Untitled Doc");
        repo.update(&id, |doc| doc.v2 = "# Billing Spec\n\nBody".to_string())
            .unwrap();

        repo.refresh_title(&id).unwrap();
        assert_eq!(repo.get(&id).unwrap().title, "Billing Spec");
    }

    #[test]
    fn workspace_persists_across_reopen() {
        let test_dir = std::env::temp_dir().join(format!("test_workspace_{}", Uuid::new_v4()));
        fs::create_dir_all(&test_dir).unwrap();
        let path = test_dir.join(WORKSPACE_FILE);

        let mut repo = DocumentRepository::open(path.clone());
        let folder = repo.create_folder("Project");
        let id = repo.create_document(Some(&folder), "Doc");

        let reopened = DocumentRepository::open(path);
        assert_eq!(reopened.documents().len(), 1);
        assert_eq!(reopened.folders().len(), 1);
        assert_eq!(reopened.active_id(), Some(id.as_str()));

        let _ = fs::remove_dir_all(&test_dir);
    }

    #[test]
    fn corrupt_workspace_degrades_to_empty() {
        let test_dir = std::env::temp_dir().join(format!("test_workspace_{}", Uuid::new_v4()));
        fs::create_dir_all(&test_dir).unwrap();
        let path = test_dir.join(WORKSPACE_FILE);
        fs::write(&path, "not json at all").unwrap();

        let repo = DocumentRepository::open(path);
        assert!(repo.documents().is_empty());
        assert!(repo.active_id().is_none());

        let _ = fs::remove_dir_all(&test_dir);
    }
}
