pub mod config;
pub mod connection_registry;
pub mod history;
pub mod journal;
pub mod query_pipeline;
pub mod schema_draft;
pub mod table;
pub mod workflow;
