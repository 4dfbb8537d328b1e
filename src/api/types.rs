//! Shared state for the API layer.

use std::sync::Arc;

use crate::config::Settings;
use crate::llm::LlmChat;
use crate::store::files::DocumentStore;
use crate::store::FactStore;
use crate::tasks::TaskOrchestrator;

/// Shared context for all API routes.
#[derive(Clone)]
pub struct ApiContext {
    pub facts: Arc<dyn FactStore>,
    pub documents: Arc<DocumentStore>,
    pub orchestrator: Arc<TaskOrchestrator>,
}

impl ApiContext {
    /// Wire the context from its collaborators. The orchestrator gets
    /// its own handles to the fact store and LLM client.
    pub fn new(
        facts: Arc<dyn FactStore>,
        documents: Arc<DocumentStore>,
        llm: Arc<dyn LlmChat>,
        settings: &Settings,
    ) -> Self {
        let orchestrator = Arc::new(TaskOrchestrator::new(
            Arc::clone(&facts),
            llm,
            settings,
        ));
        Self {
            facts,
            documents,
            orchestrator,
        }
    }
}
