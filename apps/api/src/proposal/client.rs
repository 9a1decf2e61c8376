//! Generation Client — pluggable, trait-based producer of `ProposalResult`s.
//!
//! Default: `LiveGenerationClient` (HTTP via `llm_client`).
//! `StubGenerationClient` returns canned data for demos and local runs.
//!
//! `ProposalService` holds an `Arc<dyn GenerationClient>`, chosen at startup via
//! `GENERATION_BACKEND`. Each `generate` call is a single attempt.

use async_trait::async_trait;

use crate::llm_client::{LlmClient, StructuredPrompt};
use crate::proposal::error::GenerationError;
use crate::proposal::request::ProposalRequest;
use crate::proposal::schema::{decode_payload, ProposalResult};

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait GenerationClient: Send + Sync {
    async fn generate(&self, request: &ProposalRequest) -> Result<ProposalResult, GenerationError>;

    /// Short backend name for logs and health output.
    fn backend(&self) -> &'static str;
}

// ────────────────────────────────────────────────────────────────────────────
// LiveGenerationClient
// ────────────────────────────────────────────────────────────────────────────

/// Validation order: transport → empty text → embedded error → schema.
pub struct LiveGenerationClient {
    llm: LlmClient,
}

impl LiveGenerationClient {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl GenerationClient for LiveGenerationClient {
    async fn generate(&self, request: &ProposalRequest) -> Result<ProposalResult, GenerationError> {
        let schema = request.output_schema();
        let response_schema = schema.response_schema();
        let user = request.user_content();

        let text = self
            .llm
            .generate_json(StructuredPrompt {
                system: request.instructions(),
                user: &user,
                response_schema: &response_schema,
            })
            .await?;

        decode_payload(&text, schema)
    }

    fn backend(&self) -> &'static str {
        "live"
    }
}

// ────────────────────────────────────────────────────────────────────────────
// StubGenerationClient
// ────────────────────────────────────────────────────────────────────────────

const STUB_PAYLOAD: &str = r#"{
  "clientSummary": [
    "Rebuild the customer dashboard in React with a Tailwind-based design system",
    "Connect the new UI to the existing REST API and add role-based views"
  ],
  "proposalDraft": "Hi there,\n\nYour post describes exactly the kind of project I enjoy most: taking a dashboard that has grown organically and turning it into a fast, consistent React application that your team can keep extending. Over the last six years I have rebuilt admin panels and analytics dashboards for SaaS companies ranging from early-stage startups to teams with thousands of daily users.\n\nFor your project I would start with a short audit of the current screens and API endpoints, then set up a component library in Tailwind so every table, chart, and form shares the same spacing, colors, and states. From there I would migrate the views in order of business value, wiring each one to your REST API with typed hooks, loading states, and clear error handling. Role-based access would be enforced both in routing and at the component level so users only ever see what they should.\n\nYou will get weekly demos, a staging link from the first week, and clean, documented code with tests for the critical flows. I am comfortable working in your existing repository and following your review process.\n\nWould you be open to a quick call this week to walk through the current dashboard and agree on the first milestone?\n\nBest regards",
  "suggestedSkills": ["React", "Tailwind CSS", "TypeScript", "REST API", "Dashboard Design", "Role-Based Access Control"]
}"#;

/// Returns a fixed payload, validated exactly like a live response.
pub struct StubGenerationClient {
    payload: String,
}

impl Default for StubGenerationClient {
    fn default() -> Self {
        Self {
            payload: STUB_PAYLOAD.to_string(),
        }
    }
}

impl StubGenerationClient {
    pub fn with_payload(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
        }
    }
}

#[async_trait]
impl GenerationClient for StubGenerationClient {
    async fn generate(&self, request: &ProposalRequest) -> Result<ProposalResult, GenerationError> {
        decode_payload(&self.payload, request.output_schema())
    }

    fn backend(&self) -> &'static str {
        "stub"
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
