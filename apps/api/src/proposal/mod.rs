// Proposal generation: request building, generation clients, payload
// validation, and the single-flight session exposed over HTTP.
// All LLM calls go through llm_client; no direct endpoint calls here.

pub mod client;
pub mod clipboard;
pub mod error;
pub mod handlers;
pub mod prompts;
pub mod request;
pub mod schema;
pub mod session;
