use std::sync::{Arc, Mutex};

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::mpsc::{self, UnboundedReceiver};

use crate::config;
use crate::db::Database;
use crate::error::{AppError, Result};
use crate::models::{Document, Settings, User};
use crate::services::accounts::Accounts;
use crate::services::analysis::{AnalysisEvent, AnalysisRunner};
use crate::services::seed::seed_demo_data;
use crate::services::store::DocumentStore;

pub struct AppState {
    pub db: Arc<Mutex<Database>>,
    pub settings: Arc<Mutex<Settings>>,
    pub store: Arc<DocumentStore>,
    pub accounts: Accounts,
    pub analysis: AnalysisRunner,
}

impl AppState {
    /// Returns the state plus the receiving end of analysis events.
    pub fn new(db: Database, settings: Settings) -> (Self, UnboundedReceiver<AnalysisEvent>) {
        Self::build(db, settings, StdRng::from_entropy(), StdRng::from_entropy())
    }

    /// Deterministic randomness for page counts, progress steps and outcomes.
    pub fn seeded(db: Database, settings: Settings, seed: u64) -> (Self, UnboundedReceiver<AnalysisEvent>) {
        Self::build(
            db,
            settings,
            StdRng::seed_from_u64(seed),
            StdRng::seed_from_u64(seed.wrapping_add(1)),
        )
    }

    fn build(
        db: Database,
        settings: Settings,
        store_rng: StdRng,
        analysis_rng: StdRng,
    ) -> (Self, UnboundedReceiver<AnalysisEvent>) {
        let db = Arc::new(Mutex::new(db));
        let settings = Arc::new(Mutex::new(settings));
        let store = Arc::new(DocumentStore::with_rng(db.clone(), settings.clone(), store_rng));
        let (tx, rx) = mpsc::unbounded_channel();
        let analysis = AnalysisRunner::with_rng(store.clone(), settings.clone(), tx, analysis_rng);
        let state = AppState {
            accounts: Accounts::new(db.clone()),
            db,
            settings,
            store,
            analysis,
        };
        (state, rx)
    }

    /// Fresh in-memory database with the demo account, settings from the
    /// table overlaid with `SOLARDOC_*` environment variables.
    pub fn bootstrap() -> Result<(Self, UnboundedReceiver<AnalysisEvent>)> {
        let db = Database::in_memory()?;
        seed_demo_data(&db)?;
        let stored = config::load_settings(&db)?;
        let settings = config::apply_env_overrides(stored, |key| std::env::var(key).ok())?;
        config::save_settings(&db, &settings)?;
        tracing::info!("{} v{} state ready", config::APP_NAME, config::APP_VERSION);
        Ok(Self::new(db, settings))
    }

    pub fn current_settings(&self) -> Result<Settings> {
        Ok(self.settings.lock().map_err(|_| AppError::Lock("Settings"))?.clone())
    }

    /// Persists to the settings table first; live runs keep the settings they
    /// started with.
    pub fn update_settings(&self, settings: Settings) -> Result<()> {
        {
            let db = self.db.lock().map_err(|_| AppError::Lock("DB"))?;
            config::save_settings(&db, &settings)?;
        }
        let mut locked = self.settings.lock().map_err(|_| AppError::Lock("Settings"))?;
        *locked = settings;
        Ok(())
    }

    pub fn session_user(&self, token: &str) -> Result<User> {
        self.accounts.current_user(token)
    }

    /// A document visible to the session's user. Other users' documents are
    /// reported as missing.
    pub fn owned_document(&self, token: &str, document_id: &str) -> Result<Document> {
        let user = self.session_user(token)?;
        self.store
            .get_document(document_id)?
            .filter(|doc| doc.user_id == user.id)
            .ok_or_else(|| AppError::NotFound(format!("Document {}", document_id)))
    }
}
