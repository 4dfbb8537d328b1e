//! API endpoint handlers.

pub mod documents;
pub mod health;
pub mod questions;
