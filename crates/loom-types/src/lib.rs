//! Types shared across the loom crates: wire DTOs, JWT claims and domain models.

pub mod api;
pub mod models;
