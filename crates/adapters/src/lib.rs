pub mod demo;
pub mod export;
pub mod http;

use std::sync::Arc;

use querydeck_core::config::AppConfig;
use querydeck_core::query_pipeline::{QueryBackend, QueryPipeline};

pub fn pipeline_from_config(
    config: &AppConfig,
) -> Result<QueryPipeline<dyn QueryBackend>, http::HttpBackendError> {
    let backend: Arc<dyn QueryBackend> = if config.demo_mode {
        Arc::new(demo::DemoQueryBackend::default())
    } else {
        Arc::new(http::HttpQueryBackend::from_config(config)?)
    };
    Ok(QueryPipeline::from_shared(backend))
}

#[cfg(test)]
mod tests {
    use querydeck_core::config::AppConfig;

    use super::pipeline_from_config;

    #[test]
    fn both_backend_kinds_build_from_config() {
        let mut config = AppConfig::default();
        assert!(pipeline_from_config(&config).is_ok());

        config.demo_mode = true;
        assert!(pipeline_from_config(&config).is_ok());
    }
}
