use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

use crate::error::{AppError, Result};
use crate::models::{AnalysisProgress, AnalysisView, Document, DocumentStatus, Settings};
use crate::services::store::DocumentStore;

pub const INITIAL_STAGE: &str = "Initializing analysis";
pub const COMPLETE_PROGRESS: u8 = 100;

pub fn stage_for(progress: u32) -> &'static str {
    match progress {
        0..=20 => "Extracting document information",
        21..=40 => "Analyzing financial data",
        41..=60 => "Verifying property details",
        61..=80 => "Calculating eligibility scores",
        _ => "Generating final recommendation",
    }
}

/// Approved with probability `approval_rate`, rejected otherwise.
pub fn draw_outcome<R: Rng>(rng: &mut R, approval_rate: f64) -> DocumentStatus {
    if rng.gen::<f64>() < approval_rate.clamp(0.0, 1.0) {
        DocumentStatus::Approved
    } else {
        DocumentStatus::Rejected
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub progress: u8,
    pub stage: &'static str,
    pub complete: bool,
}

/// Progress counter advanced by a random step on every tick.
pub struct AnalysisSimulator<R: Rng> {
    progress: u32,
    min_step: u32,
    max_step: u32,
    rng: R,
}

impl<R: Rng> AnalysisSimulator<R> {
    pub fn new(settings: &Settings, rng: R) -> Self {
        let min_step = settings.min_step.max(1) as u32;
        let max_step = (settings.max_step as u32).max(min_step);
        AnalysisSimulator {
            progress: 0,
            min_step,
            max_step,
            rng,
        }
    }

    pub fn progress(&self) -> u8 {
        self.progress.min(COMPLETE_PROGRESS as u32) as u8
    }

    pub fn advance(&mut self) -> Tick {
        self.progress += self.rng.gen_range(self.min_step..=self.max_step);
        Tick {
            progress: self.progress(),
            stage: stage_for(self.progress),
            complete: self.progress >= COMPLETE_PROGRESS as u32,
        }
    }

    pub fn draw_outcome(&mut self, approval_rate: f64) -> DocumentStatus {
        draw_outcome(&mut self.rng, approval_rate)
    }
}

#[derive(Debug, Clone)]
pub enum AnalysisEvent {
    Progress(AnalysisProgress),
    /// Progress reached 100; the outcome follows after the completion delay.
    Complete(AnalysisProgress),
    Resolved(Document),
    Failed { document_id: String, message: String },
}

struct RunSlot {
    generation: u64,
    handle: Option<JoinHandle<()>>,
    latest: AnalysisProgress,
}

type Runs = Arc<Mutex<HashMap<String, RunSlot>>>;

/// Owns the live analysis runs, one spawned task per document.
pub struct AnalysisRunner {
    store: Arc<DocumentStore>,
    settings: Arc<Mutex<Settings>>,
    runs: Runs,
    generations: AtomicU64,
    rng: Mutex<StdRng>,
    events: UnboundedSender<AnalysisEvent>,
}

impl AnalysisRunner {
    pub fn new(
        store: Arc<DocumentStore>,
        settings: Arc<Mutex<Settings>>,
        events: UnboundedSender<AnalysisEvent>,
    ) -> Self {
        Self::with_rng(store, settings, events, StdRng::from_entropy())
    }

    pub fn with_rng(
        store: Arc<DocumentStore>,
        settings: Arc<Mutex<Settings>>,
        events: UnboundedSender<AnalysisEvent>,
        rng: StdRng,
    ) -> Self {
        AnalysisRunner {
            store,
            settings,
            runs: Arc::new(Mutex::new(HashMap::new())),
            generations: AtomicU64::new(0),
            rng: Mutex::new(rng),
            events,
        }
    }

    /// First view of a document: pending documents move to processing and start
    /// a run, processing documents without a live run resume one, terminal
    /// documents are reported as completed.
    pub fn begin_analysis(&self, document_id: &str) -> Result<AnalysisView> {
        let mut runs = self.runs.lock().map_err(|_| AppError::Lock("Analysis runs"))?;

        let document = self
            .store
            .get_document(document_id)?
            .ok_or_else(|| AppError::NotFound(format!("Document {}", document_id)))?;

        if document.status.is_terminal() {
            return Ok(AnalysisView::Completed { document });
        }

        if let Some(slot) = runs.get(document_id) {
            let live = slot.handle.as_ref().map(|h| !h.is_finished()).unwrap_or(false);
            if live {
                return Ok(AnalysisView::Running {
                    document,
                    progress: slot.latest.clone(),
                });
            }
        }

        let document = match document.status {
            DocumentStatus::Pending => self
                .store
                .update_document_status(document_id, DocumentStatus::Processing)?,
            _ => {
                tracing::info!("Resuming analysis for {}", document_id);
                document
            }
        };

        let initial = AnalysisProgress {
            document_id: document_id.to_string(),
            progress: 0,
            stage: INITIAL_STAGE.to_string(),
            complete: false,
        };
        let generation = self.generations.fetch_add(1, Ordering::Relaxed) + 1;
        runs.insert(
            document_id.to_string(),
            RunSlot {
                generation,
                handle: None,
                latest: initial.clone(),
            },
        );

        let settings = self.settings.lock().map_err(|_| AppError::Lock("Settings"))?.clone();
        let seed = self.rng.lock().map_err(|_| AppError::Lock("Analysis rng"))?.gen::<u64>();
        let handle = tokio::spawn(drive(
            document_id.to_string(),
            generation,
            self.store.clone(),
            settings,
            StdRng::seed_from_u64(seed),
            self.runs.clone(),
            self.events.clone(),
        ));
        if let Some(slot) = runs.get_mut(document_id) {
            slot.handle = Some(handle);
        }

        tracing::info!("Started analysis for {}", document_id);
        Ok(AnalysisView::Running {
            document,
            progress: initial,
        })
    }

    pub fn progress_of(&self, document_id: &str) -> Result<Option<AnalysisProgress>> {
        let runs = self.runs.lock().map_err(|_| AppError::Lock("Analysis runs"))?;
        Ok(runs.get(document_id).map(|slot| slot.latest.clone()))
    }

    pub fn is_running(&self, document_id: &str) -> Result<bool> {
        let runs = self.runs.lock().map_err(|_| AppError::Lock("Analysis runs"))?;
        Ok(runs.contains_key(document_id))
    }

    /// Stops a run; the document stays in processing and can be resumed.
    pub fn cancel_analysis(&self, document_id: &str) -> Result<bool> {
        let slot = self
            .runs
            .lock()
            .map_err(|_| AppError::Lock("Analysis runs"))?
            .remove(document_id);
        match slot {
            Some(slot) => {
                if let Some(handle) = slot.handle {
                    handle.abort();
                }
                tracing::info!("Cancelled analysis for {}", document_id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn shutdown(&self) {
        if let Ok(mut runs) = self.runs.lock() {
            for (_, slot) in runs.drain() {
                if let Some(handle) = slot.handle {
                    handle.abort();
                }
            }
        }
    }
}

impl Drop for AnalysisRunner {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// A run only touches its slot while the slot still carries its generation;
/// a cancelled or superseded run never resolves the document.
async fn drive(
    document_id: String,
    generation: u64,
    store: Arc<DocumentStore>,
    settings: Settings,
    rng: StdRng,
    runs: Runs,
    events: UnboundedSender<AnalysisEvent>,
) {
    let mut simulator = AnalysisSimulator::new(&settings, rng);
    let mut ticker = tokio::time::interval(Duration::from_millis(settings.tick_interval_ms.max(1)));
    // interval yields immediately once; the first step lands one period later
    ticker.tick().await;

    let last = loop {
        ticker.tick().await;
        let tick = simulator.advance();
        let progress = AnalysisProgress {
            document_id: document_id.clone(),
            progress: tick.progress,
            stage: tick.stage.to_string(),
            complete: tick.complete,
        };
        if let Ok(mut runs) = runs.lock() {
            match runs.get_mut(&document_id) {
                Some(slot) if slot.generation == generation => slot.latest = progress.clone(),
                _ => return,
            }
        }
        if tick.complete {
            break progress;
        }
        let _ = events.send(AnalysisEvent::Progress(progress));
    };

    tracing::debug!("Analysis for {} reached {}%", document_id, last.progress);
    let _ = events.send(AnalysisEvent::Complete(last));
    tokio::time::sleep(Duration::from_millis(settings.completion_delay_ms)).await;

    let status = simulator.draw_outcome(settings.approval_rate);
    let event = {
        let mut runs = match runs.lock() {
            Ok(runs) => runs,
            Err(_) => {
                tracing::error!("Analysis runs lock poisoned; dropping run for {}", document_id);
                return;
            }
        };
        match runs.get(&document_id) {
            Some(slot) if slot.generation == generation => {}
            _ => {
                tracing::debug!("Analysis for {} was cancelled before resolving", document_id);
                return;
            }
        }
        let event = match store.update_document_status(&document_id, status) {
            Ok(document) => AnalysisEvent::Resolved(document),
            Err(err) => {
                tracing::error!("Failed to resolve analysis for {}: {}", document_id, err);
                AnalysisEvent::Failed {
                    document_id: document_id.clone(),
                    message: err.to_string(),
                }
            }
        };
        runs.remove(&document_id);
        event
    };
    let _ = events.send(event);
}
