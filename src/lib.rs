//! SolarDoc backend: accounts, the in-memory document store, the simulated
//! eligibility analysis and the dashboard/results views the desktop shell serves.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use error::{AppError, Result};
pub use services::state::AppState;
