//! Storage abstractions for the service layer
//!
//! The collection lives in a single JSON document that is read and written
//! as one unit.

pub mod json_snapshot_store;
