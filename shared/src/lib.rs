//! Shared types and domain logic for the sales tracker
//!
//! This crate holds the I/O-free core: the consignment stock ledger, sales
//! aggregation, consignment reconstruction, the attendance geofence and
//! notification payloads. The backend feeds it plain rows from the database.

pub mod aggregation;
pub mod consignment;
pub mod geofence;
pub mod ledger;
pub mod models;
pub mod notification;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
