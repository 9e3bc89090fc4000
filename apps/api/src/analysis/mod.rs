// Resume Analysis Engine
// Implements: document extraction, prompt building, response parsing, the end-to-end pipeline.
// All generation calls go through llm_client; no direct Gemini HTTP calls here.
// Document decoding is CPU-bound and must run inside tokio::task::spawn_blocking.

pub mod extractor;
pub mod handlers;
pub mod parser;
pub mod pipeline;
pub mod prompts;

pub use pipeline::AnalysisError;
