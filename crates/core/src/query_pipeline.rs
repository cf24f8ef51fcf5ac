use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::history::{local_timestamp, EntryStatus, HistoryLog, SubmissionId};
use crate::table::TableData;

pub const GENERATE_PATH: &str = "/api/generate";
pub const API_PREFIX: &str = "/api";
pub const FALLBACK_EXECUTION_PATH: &str = "/api/query";

pub const DEFAULT_EDITOR_TEXT: &str = "// Example:
const query = await db.collection('users')
  .find({ age: { $gt: 21 }})
  .limit(10);";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct QueryBackendError {
    status: Option<u16>,
    message: String,
}

impl QueryBackendError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn status(&self) -> Option<u16> {
        self.status
    }
}

/// JSON-over-HTTP POST to a path under the configured origin. Implementations
/// must report any non-2xx status as an error.
#[async_trait]
pub trait QueryBackend: Send + Sync {
    async fn post_json(&self, path: &str, body: &Value) -> Result<Value, QueryBackendError>;
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("query generation failed: {0}")]
    Generation(#[source] QueryBackendError),
    #[error("query generation returned an unusable body: {0}")]
    MalformedGeneration(String),
    #[error("query execution failed: {0}")]
    Execution(#[source] QueryBackendError),
}

#[derive(Debug, Deserialize)]
struct GenerationEnvelope {
    json: GeneratedQuery,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GeneratedQuery {
    pub query: Value,
    #[serde(default)]
    pub endpoint: Option<String>,
}

impl GeneratedQuery {
    pub fn from_response(body: Value) -> Result<Self, PipelineError> {
        let envelope: GenerationEnvelope = serde_json::from_value(body)
            .map_err(|error| PipelineError::MalformedGeneration(error.to_string()))?;
        if envelope.json.query.is_null() {
            return Err(PipelineError::MalformedGeneration(
                "`json.query` is null".to_string(),
            ));
        }
        Ok(envelope.json)
    }

    #[must_use]
    pub fn execution_path(&self) -> String {
        resolve_execution_path(self.endpoint.as_deref())
    }
}

#[must_use]
pub fn resolve_execution_path(endpoint: Option<&str>) -> String {
    match endpoint.filter(|endpoint| !endpoint.is_empty()) {
        None => FALLBACK_EXECUTION_PATH.to_string(),
        Some(endpoint) if endpoint.starts_with('/') => format!("{API_PREFIX}{endpoint}"),
        Some(endpoint) => format!("{API_PREFIX}/{endpoint}"),
    }
}

#[derive(Debug, Clone)]
pub struct ConsoleState {
    pub history: HistoryLog,
    pub table: Option<TableData>,
    in_flight: usize,
    scroll_requested: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSubmission {
    pub id: SubmissionId,
    pub prompt: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionOutcome {
    pub id: SubmissionId,
    pub status: EntryStatus,
    pub table_updated: bool,
    pub recorded: bool,
}

impl ConsoleState {
    #[must_use]
    pub fn new(history_capacity: usize) -> Self {
        Self {
            history: HistoryLog::new(history_capacity),
            table: None,
            in_flight: 0,
            scroll_requested: false,
        }
    }

    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.in_flight > 0
    }

    pub fn take_scroll_request(&mut self) -> bool {
        std::mem::take(&mut self.scroll_requested)
    }

    pub fn begin_submission(&mut self, text: impl Into<String>) -> PendingSubmission {
        let prompt = text.into();
        let id = self.history.begin(prompt.clone(), local_timestamp());
        self.in_flight += 1;
        tracing::info!(submission = %id, in_flight = self.in_flight, "query submitted");
        PendingSubmission { id, prompt }
    }

    pub fn complete_submission(
        &mut self,
        id: SubmissionId,
        result: &Result<Value, PipelineError>,
    ) -> SubmissionOutcome {
        self.in_flight = self.in_flight.saturating_sub(1);
        self.scroll_requested = true;

        let (status, text, table_updated) = match result {
            Ok(value) => {
                let table_updated = if let Some(table) = TableData::from_records(value) {
                    self.table = Some(table);
                    true
                } else {
                    false
                };
                let text =
                    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
                (EntryStatus::Success, text, table_updated)
            }
            Err(error) => {
                tracing::warn!(submission = %id, %error, "query submission failed");
                (EntryStatus::Error, format!("Error: {error}"), false)
            }
        };

        let recorded = self.history.resolve(id, status, text);
        if !recorded {
            tracing::debug!(submission = %id, "history entry evicted before completion");
        }

        SubmissionOutcome {
            id,
            status,
            table_updated,
            recorded,
        }
    }
}

pub struct QueryPipeline<B: ?Sized> {
    backend: Arc<B>,
}

impl<B: ?Sized> fmt::Debug for QueryPipeline<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryPipeline").finish_non_exhaustive()
    }
}

impl<B: ?Sized> Clone for QueryPipeline<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
        }
    }
}

impl<B: QueryBackend> QueryPipeline<B> {
    #[must_use]
    pub fn new(backend: B) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }
}

impl<B: QueryBackend + ?Sized> QueryPipeline<B> {
    #[must_use]
    pub fn from_shared(backend: Arc<B>) -> Self {
        Self { backend }
    }

    /// Network half of a submission: generate, then execute. Touches no
    /// console state, so it can run on another task.
    pub async fn execute(&self, prompt: &str) -> Result<Value, PipelineError> {
        let generated = self
            .backend
            .post_json(GENERATE_PATH, &json!({ "prompt": prompt }))
            .await
            .map_err(PipelineError::Generation)?;
        let generated = GeneratedQuery::from_response(generated)?;

        let path = generated.execution_path();
        tracing::debug!(%path, "executing generated query");
        self.backend
            .post_json(&path, &generated.query)
            .await
            .map_err(PipelineError::Execution)
    }

    pub async fn run(&self, state: &mut ConsoleState, text: &str) -> SubmissionOutcome {
        let pending = state.begin_submission(text);
        let result = self.execute(&pending.prompt).await;
        state.complete_submission(pending.id, &result)
    }
}
