use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::db::Database;
use crate::error::{AppError, Result};
use crate::models::{Document, DocumentStatus, Settings, StoreSnapshot, Upload};
use crate::services::composer::compose_outcome;
use crate::utils::{now_rfc3339, sha256_hex};

pub const FETCH_FAILED: &str = "Failed to load your documents. Please try again later.";
pub const UPLOAD_FAILED: &str = "Failed to upload your document. Please try again later.";

const MAX_PAGES: u32 = 10;

/// The document collection plus the loading/error view the UI binds to.
///
/// Fetch and upload wait a configured delay before touching the collection.
/// Locks are never held across those waits.
pub struct DocumentStore {
    db: Arc<Mutex<Database>>,
    settings: Arc<Mutex<Settings>>,
    view: Mutex<StoreSnapshot>,
    rng: Mutex<StdRng>,
}

impl DocumentStore {
    pub fn new(db: Arc<Mutex<Database>>, settings: Arc<Mutex<Settings>>) -> Self {
        Self::with_rng(db, settings, StdRng::from_entropy())
    }

    pub fn with_rng(db: Arc<Mutex<Database>>, settings: Arc<Mutex<Settings>>, rng: StdRng) -> Self {
        DocumentStore {
            db,
            settings,
            view: Mutex::new(StoreSnapshot::default()),
            rng: Mutex::new(rng),
        }
    }

    pub fn snapshot(&self) -> Result<StoreSnapshot> {
        Ok(self.view.lock().map_err(|_| AppError::Lock("Store view"))?.clone())
    }

    pub async fn fetch_user_documents(&self, user_id: &str) -> Result<Vec<Document>> {
        self.begin_loading()?;
        let delay = self.settings()?.fetch_delay_ms;
        tokio::time::sleep(Duration::from_millis(delay)).await;

        let loaded = self.with_db(|db| Ok(db.get_documents_for_user(user_id)?));
        match loaded {
            Ok(documents) => {
                let mut view = self.view.lock().map_err(|_| AppError::Lock("Store view"))?;
                view.documents = documents.clone();
                view.is_loading = false;
                tracing::debug!("Loaded {} documents for user {}", documents.len(), user_id);
                Ok(documents)
            }
            Err(err) => {
                tracing::error!("Failed to fetch documents for {}: {}", user_id, err);
                self.fail_loading(FETCH_FAILED)?;
                Err(err)
            }
        }
    }

    pub async fn upload_document(&self, user_id: &str, upload: &Upload) -> Result<Document> {
        self.begin_loading()?;
        let delay = self.settings()?.upload_delay_ms;
        tokio::time::sleep(Duration::from_millis(delay)).await;

        match self.insert_upload(user_id, upload) {
            Ok(document) => {
                let mut view = self.view.lock().map_err(|_| AppError::Lock("Store view"))?;
                view.documents.push(document.clone());
                view.is_loading = false;
                tracing::info!(
                    "Uploaded {} ({}, {} bytes) as {}",
                    document.name,
                    document.doc_type,
                    document.file_size,
                    document.id
                );
                Ok(document)
            }
            Err(err) => {
                tracing::error!("Failed to upload {}: {}", upload.file_name, err);
                self.fail_loading(UPLOAD_FAILED)?;
                Err(err)
            }
        }
    }

    pub fn get_document(&self, id: &str) -> Result<Option<Document>> {
        self.with_db(|db| Ok(db.get_document_by_id(id)?))
    }

    /// Moves a document along its lifecycle. Entering a terminal status attaches
    /// an analysis payload matching that status; leaving one is impossible.
    pub fn update_document_status(&self, id: &str, status: DocumentStatus) -> Result<Document> {
        let mut document = self
            .get_document(id)?
            .ok_or_else(|| AppError::NotFound(format!("Document {}", id)))?;

        let previous = document.status;
        if !previous.can_transition_to(status) {
            return Err(AppError::InvalidTransition { from: previous, to: status });
        }

        let now = now_rfc3339();
        document.status = status;
        if status == DocumentStatus::Processing {
            document.processing_date = Some(now.clone());
        }

        if status.is_terminal() {
            let outcome = {
                let mut rng = self.rng.lock().map_err(|_| AppError::Lock("Store rng"))?;
                compose_outcome(document.doc_type, status, &mut *rng)
            };
            document.completion_date = Some(now);
            document.eligible = Some(outcome.eligible);
            document.credit_amount = outcome.credit_amount;
            document.sponsorship_amount = outcome.sponsorship_amount;
            document.analysis_results = Some(outcome.result);
        } else {
            document.completion_date = None;
            document.clear_analysis();
        }

        self.with_db(|db| {
            db.update_document(&document)?;
            db.log_status_change(&document.id, Some(previous.as_str()), status.as_str(), None)?;
            Ok(())
        })?;

        let mut view = self.view.lock().map_err(|_| AppError::Lock("Store view"))?;
        if let Some(entry) = view.documents.iter_mut().find(|doc| doc.id == document.id) {
            *entry = document.clone();
        }

        tracing::info!("Document {} moved {} -> {}", document.id, previous, status);
        Ok(document)
    }

    fn insert_upload(&self, user_id: &str, upload: &Upload) -> Result<Document> {
        let name = upload.file_name.trim();
        if name.is_empty() {
            return Err(AppError::validation("file", "File name is required"));
        }

        let pages = {
            let mut rng = self.rng.lock().map_err(|_| AppError::Lock("Store rng"))?;
            rng.gen_range(1..=MAX_PAGES)
        };

        let document = Document {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            name: name.to_string(),
            doc_type: upload.doc_type,
            status: DocumentStatus::Pending,
            upload_date: now_rfc3339(),
            processing_date: None,
            completion_date: None,
            pages,
            file_size: upload.content.len() as u64,
            checksum: Some(sha256_hex(&upload.content)),
            eligible: None,
            credit_amount: None,
            sponsorship_amount: None,
            analysis_results: None,
        };

        self.with_db(|db| {
            if db.get_user_by_id(user_id)?.is_none() {
                return Err(AppError::NotFound(format!("User {}", user_id)));
            }
            db.insert_document(&document)?;
            db.log_status_change(&document.id, None, document.status.as_str(), Some("uploaded"))?;
            Ok(())
        })?;

        Ok(document)
    }

    fn begin_loading(&self) -> Result<()> {
        let mut view = self.view.lock().map_err(|_| AppError::Lock("Store view"))?;
        view.is_loading = true;
        view.error = None;
        Ok(())
    }

    fn fail_loading(&self, message: &str) -> Result<()> {
        let mut view = self.view.lock().map_err(|_| AppError::Lock("Store view"))?;
        view.is_loading = false;
        view.error = Some(message.to_string());
        Ok(())
    }

    fn settings(&self) -> Result<Settings> {
        Ok(self.settings.lock().map_err(|_| AppError::Lock("Settings"))?.clone())
    }

    fn with_db<T>(&self, f: impl FnOnce(&Database) -> Result<T>) -> Result<T> {
        let db = self.db.lock().map_err(|_| AppError::Lock("DB"))?;
        f(&db)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocumentType;
    use crate::services::seed::{seed_demo_data, DEMO_USER_ID};

    fn store() -> DocumentStore {
        let db = Database::in_memory().unwrap();
        seed_demo_data(&db).unwrap();
        let settings = Settings {
            fetch_delay_ms: 0,
            upload_delay_ms: 0,
            ..Settings::default()
        };
        DocumentStore::with_rng(
            Arc::new(Mutex::new(db)),
            Arc::new(Mutex::new(settings)),
            StdRng::seed_from_u64(42),
        )
    }

    fn upload(name: &str) -> Upload {
        Upload {
            file_name: name.to_string(),
            doc_type: DocumentType::UtilityBill,
            content: vec![7u8; 2048],
        }
    }

    #[tokio::test]
    async fn fetch_replaces_view_with_owned_documents() {
        let store = store();
        let docs = store.fetch_user_documents(DEMO_USER_ID).await.unwrap();
        assert_eq!(docs.len(), 4);

        let snapshot = store.snapshot().unwrap();
        assert!(!snapshot.is_loading);
        assert!(snapshot.error.is_none());
        assert_eq!(snapshot.documents.len(), 4);

        let none = store.fetch_user_documents("nobody").await.unwrap();
        assert!(none.is_empty());
        assert!(store.snapshot().unwrap().documents.is_empty());
    }

    #[tokio::test]
    async fn upload_creates_pending_document() {
        let store = store();
        store.fetch_user_documents(DEMO_USER_ID).await.unwrap();
        let doc = store.upload_document(DEMO_USER_ID, &upload("june.pdf")).await.unwrap();

        assert_eq!(doc.status, DocumentStatus::Pending);
        assert_eq!(doc.file_size, 2048);
        assert!((1..=MAX_PAGES).contains(&doc.pages));
        assert_eq!(doc.checksum.as_deref().map(str::len), Some(64));
        assert!(!doc.has_analysis());
        assert_eq!(store.snapshot().unwrap().documents.len(), 5);
        assert_eq!(store.get_document(&doc.id).unwrap(), Some(doc));
    }

    #[tokio::test]
    async fn failed_fetch_sets_opaque_error_and_keeps_documents() {
        let store = store();
        store.fetch_user_documents(DEMO_USER_ID).await.unwrap();

        let db = store.db.clone();
        let _ = std::thread::spawn(move || {
            let _guard = db.lock().unwrap();
            panic!("poison the connection lock");
        })
        .join();

        let err = store.fetch_user_documents(DEMO_USER_ID).await.unwrap_err();
        assert!(matches!(err, AppError::Lock(_)));
        let snapshot = store.snapshot().unwrap();
        assert!(!snapshot.is_loading);
        assert_eq!(snapshot.error.as_deref(), Some(FETCH_FAILED));
        assert_eq!(snapshot.documents.len(), 4);
    }

    #[tokio::test]
    async fn upload_for_unknown_user_sets_opaque_error() {
        let store = store();
        let err = store.upload_document("ghost", &upload("june.pdf")).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let snapshot = store.snapshot().unwrap();
        assert!(!snapshot.is_loading);
        assert_eq!(snapshot.error.as_deref(), Some(UPLOAD_FAILED));
    }

    #[test]
    fn status_updates_follow_the_lifecycle() {
        let store = store();
        let err = store
            .update_document_status("doc789", DocumentStatus::Approved)
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { .. }));

        let processing = store
            .update_document_status("doc789", DocumentStatus::Processing)
            .unwrap();
        assert!(processing.processing_date.is_some());
        assert!(!processing.has_analysis());

        let done = store
            .update_document_status("doc789", DocumentStatus::Rejected)
            .unwrap();
        assert!(done.completion_date.is_some());
        assert_eq!(done.eligible, Some(false));
        assert!(done.analysis_results.is_some());

        assert!(store
            .update_document_status("doc789", DocumentStatus::Processing)
            .is_err());
    }

    #[test]
    fn unknown_document_is_not_found() {
        let store = store();
        assert!(store.get_document("missing").unwrap().is_none());
        let err = store
            .update_document_status("missing", DocumentStatus::Processing)
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
