// Rust guideline compliant 2026-10-17

//! Adapters shared by both eligibility binaries.
//!
//! Binary-specific adapters (`SQLite` repository, HTTP region lookup,
//! in-memory repository, demo region table) are loaded with `#[path]` from
//! the entry point that uses them.

pub mod json_model_store;
