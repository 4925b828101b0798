//! Shared types and models for the Halal Marketplace
//!
//! This crate contains the domain types shared by the backend and any
//! other component that needs to speak the marketplace's data model.

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
