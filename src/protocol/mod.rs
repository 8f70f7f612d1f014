//! Endpoint contract models.

pub mod models;
