// Log template extraction, normalization and embedding.
// All model calls go through llm_client traits; nothing here talks HTTP to
// the provider directly.

pub mod embedding;
pub mod extractor;
pub mod handlers;
pub mod models;
pub mod normalizer;
pub mod parser;
pub mod pipeline;
pub mod prompts;
pub mod validation;
