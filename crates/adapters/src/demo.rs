use std::time::Duration;

use async_trait::async_trait;
use querydeck_core::query_pipeline::{QueryBackend, QueryBackendError, GENERATE_PATH};
use serde_json::{json, Value};

const DEMO_LATENCY: Duration = Duration::from_millis(1_000);

#[derive(Debug, Clone)]
pub struct DemoQueryBackend {
    latency: Duration,
}

impl Default for DemoQueryBackend {
    fn default() -> Self {
        Self {
            latency: DEMO_LATENCY,
        }
    }
}

impl DemoQueryBackend {
    #[must_use]
    pub fn with_latency(latency: Duration) -> Self {
        Self { latency }
    }

    fn generate(body: &Value) -> Result<Value, QueryBackendError> {
        let prompt = body
            .get("prompt")
            .and_then(Value::as_str)
            .map(str::trim)
            .unwrap_or_default();
        if prompt.is_empty() {
            return Err(QueryBackendError::with_status(400, "HTTP 400: prompt is empty"));
        }

        let endpoint = if prompt.to_ascii_lowercase().contains("count") {
            "/users/count"
        } else {
            "/users"
        };
        Ok(json!({
            "json": {
                "query": { "collection": "users", "prompt": prompt },
                "endpoint": endpoint,
            }
        }))
    }

    fn execute(path: &str) -> Result<Value, QueryBackendError> {
        match path {
            "/api/users" => Ok(demo_rows()),
            "/api/users/count" => Ok(json!({ "count": 2, "executionTime": "0.041s" })),
            other => Err(QueryBackendError::with_status(
                404,
                format!("HTTP 404: no demo endpoint at {other}"),
            )),
        }
    }
}

fn demo_rows() -> Value {
    json!([
        { "id": 1, "name": "John Doe", "age": 25 },
        { "id": 2, "name": "Jane Smith", "age": 28 }
    ])
}

#[async_trait]
impl QueryBackend for DemoQueryBackend {
    async fn post_json(&self, path: &str, body: &Value) -> Result<Value, QueryBackendError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        if path == GENERATE_PATH {
            Self::generate(body)
        } else {
            Self::execute(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use querydeck_core::history::EntryStatus;
    use querydeck_core::query_pipeline::{ConsoleState, QueryPipeline};

    use super::DemoQueryBackend;

    fn instant_pipeline() -> QueryPipeline<DemoQueryBackend> {
        QueryPipeline::new(DemoQueryBackend::with_latency(Duration::ZERO))
    }

    #[tokio::test]
    async fn demo_backend_answers_with_fixed_rows() {
        let mut state = ConsoleState::new(8);
        let outcome = instant_pipeline().run(&mut state, "find users over 21").await;

        assert_eq!(outcome.status, EntryStatus::Success);
        let table = state.table.expect("demo rows should tabulate");
        assert_eq!(table.columns, vec!["id", "name", "age"]);
        assert_eq!(table.row_count(), 2);
    }

    #[tokio::test]
    async fn count_prompts_return_a_scalar_document() {
        let mut state = ConsoleState::new(8);
        let outcome = instant_pipeline().run(&mut state, "count users").await;

        assert_eq!(outcome.status, EntryStatus::Success);
        assert!(!outcome.table_updated);
        assert!(state
            .history
            .last()
            .is_some_and(|entry| entry.result.contains("\"count\": 2")));
    }

    #[tokio::test]
    async fn blank_prompt_fails_generation() {
        let mut state = ConsoleState::new(8);
        let outcome = instant_pipeline().run(&mut state, "   ").await;

        assert_eq!(outcome.status, EntryStatus::Error);
        assert!(state.table.is_none());
    }
}
