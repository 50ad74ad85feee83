//! Core domain types and logic.

pub mod error;
pub mod trade;
pub mod window;
pub mod slot;
pub mod normalize;
pub mod aggregate;
pub mod selector;
pub mod walk_forward;
pub mod summary;
pub mod config_validation;
pub mod settings;
