//! Repository layer — entity-scoped database operations.
//!
//! Straight single-table persistence for the catalog entities plus the raw
//! row access the scheduling engine builds on. All public functions are
//! re-exported here.

mod appointment;
mod doctor;
mod patient;
mod service;

pub use appointment::*;
pub use doctor::*;
pub use patient::*;
pub use service::*;
