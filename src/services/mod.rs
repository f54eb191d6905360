pub mod accounts;
pub mod analysis;
pub mod composer;
pub mod crypto;
pub mod dashboard;
pub mod intake;
pub mod results;
pub mod seed;
pub mod state;
pub mod store;
