//! Infrastructure layer: the Ledger Store, application services and configuration.

pub mod config;
pub mod error;
pub mod services;
pub mod store;


pub use config::AppConfig;
pub use error::ServiceError;
pub use store::{InMemoryLedgerStore, LedgerStore, StoreError, UpsertOutcome};
