//! The question-answering pipeline: extract entities, select evidence,
//! assemble the prompt, call the model.

pub mod aggregate;
pub mod context;
pub mod entities;
pub mod ingest;
pub mod relevance;

use std::path::Path;

use thiserror::Error;

use crate::llm::{LlmChat, LlmError};
use crate::pipeline::context::{DocumentExcerpt, Evidence, SYSTEM_PROMPT};
use crate::store::{FactStore, StoreError};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("model error: {0}")]
    Llm(#[from] LlmError),
}

/// Knobs the pipeline needs per question.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub model: String,
    pub top_k: usize,
}

/// Synchronous question pipeline.
///
/// Coordinates: extract → aggregate (or document fallback) → assemble
/// → chat. One instance serves all tasks; per-question state stays on
/// the stack.
pub struct QuestionPipeline<'a> {
    store: &'a dyn FactStore,
    llm: &'a dyn LlmChat,
    config: PipelineConfig,
}

impl<'a> QuestionPipeline<'a> {
    pub fn new(store: &'a dyn FactStore, llm: &'a dyn LlmChat, config: PipelineConfig) -> Self {
        Self { store, llm, config }
    }

    /// Answer one question. Errors here settle the owning task as
    /// `failed`; the orchestrator catches them at the worker boundary.
    pub fn answer(&self, question: &str) -> Result<String, PipelineError> {
        let entities = entities::extract(question);
        tracing::debug!(?entities, "Entities extracted");

        let evidence = self.select_evidence(&entities)?;
        let prompt = context::assemble(question, &evidence);
        tracing::debug!(prompt_chars = prompt.len(), "Prompt assembled");

        let answer = self.llm.chat(&self.config.model, SYSTEM_PROMPT, &prompt)?;
        Ok(answer)
    }

    /// Aggregate rows when the graph has matching facts; otherwise fall
    /// back to ranked raw-sheet excerpts.
    fn select_evidence(&self, entities: &crate::models::QueryEntities) -> Result<Evidence, PipelineError> {
        let filter = aggregate::build_filter(entities);
        let rows = self.store.aggregate_records(&filter)?;
        if !rows.is_empty() {
            tracing::debug!(rows = rows.len(), "Using aggregate evidence");
            return Ok(Evidence::Aggregates(rows));
        }

        let documents = self.store.list_documents()?;
        let ranked = relevance::score_and_rank(entities, &documents, self.config.top_k);
        tracing::debug!(
            candidates = documents.len(),
            selected = ranked.len(),
            "Falling back to document excerpts"
        );

        let excerpts = ranked
            .into_iter()
            .map(|doc| {
                let content = match doc.raw_text {
                    Some(text) if !text.trim().is_empty() => text,
                    _ => ingest::extract_sheet_text(
                        Path::new(&doc.storage_path),
                        ingest::SHEET_TEXT_CAP,
                    ),
                };
                DocumentExcerpt {
                    name: doc.name,
                    content,
                }
            })
            .collect();
        Ok(Evidence::Excerpts(excerpts))
    }
}
