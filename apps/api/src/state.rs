use std::sync::Arc;

use crate::proposal::session::ProposalService;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// The single proposal session. Enforces one in-flight generation.
    pub proposals: Arc<ProposalService>,
}
