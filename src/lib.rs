pub mod calendar; // Per-doctor calendar index
pub mod catalog; // Read-only doctor/patient/service lookups
pub mod config;
pub mod db;
pub mod models;
pub mod reporting; // Date-range reporting aggregator
pub mod scheduling; // Conflict checker + appointment ledger

use tracing_subscriber::EnvFilter;

/// Initialize tracing for binaries embedding the engine.
///
/// Library consumers that install their own subscriber should skip this.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("Dental Plus engine v{}", config::APP_VERSION);
}
