//! Consulta — question answering over periodic medical-activity
//! spreadsheets.
//!
//! One workbook per clinic-month is ingested into an in-memory fact
//! graph (Document → Record → Clinic/Pathology). Questions in Spanish
//! are answered asynchronously: entity extraction, aggregate lookup or
//! document-excerpt fallback, then a local Ollama model phrases the
//! final answer.

pub mod api;
pub mod config;
pub mod llm;
pub mod models;
pub mod pipeline;
pub mod store;
pub mod tasks;
