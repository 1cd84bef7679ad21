//! Shared domain types for the care-call service: configuration, the error
//! taxonomy, the care data model and the pure rules (slot resolution, phone
//! normalization) that the runtime crates build on.

pub mod care;
pub mod chat;
pub mod config;
pub mod error;
pub mod phone;
pub mod record;
pub mod signals;
pub mod slot;
pub mod stats;
