//! Completion-service access for enrichment.

pub mod client;
pub mod prompts;
pub mod schema;

pub use client::{
    ChatMessage, CompletionClient, CompletionRequest, ContentPart, EnrichmentConfig,
    EnrichmentProvider, LlmError, OpenAiClient, ResponseFormat,
};
pub use schema::{validate_structured, SchemaError, OUTPUT_SCHEMA};
