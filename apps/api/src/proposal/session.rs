//! Proposal Session — the surface the presentation layer drives.
//!
//! Exposes `generate_proposal` and `cancel`, publishes lifecycle events, and
//! keeps a status snapshot. At most one generation is in flight; a second
//! submission is rejected with `Busy` until the first finishes or is cancelled.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{info, warn};
use uuid::Uuid;

use crate::backoff::{retry_with_backoff, BackoffPolicy, CancelToken};
use crate::proposal::client::GenerationClient;
use crate::proposal::error::GenerationError;
use crate::proposal::request::ProposalRequestBuilder;
use crate::proposal::schema::ProposalResult;

const EVENT_CHANNEL_CAPACITY: usize = 32;

// ────────────────────────────────────────────────────────────────────────────
// Lifecycle + status models
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LifecycleEvent {
    Started {
        request_id: Uuid,
    },
    Succeeded {
        request_id: Uuid,
        result: ProposalResult,
    },
    Failed {
        request_id: Uuid,
        code: &'static str,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Pending {
        request_id: Uuid,
    },
    Succeeded {
        request_id: Uuid,
        result: ProposalResult,
    },
    Failed {
        request_id: Uuid,
        code: &'static str,
        message: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    #[serde(flatten)]
    pub state: SessionState,
    pub updated_at: DateTime<Utc>,
}

impl SessionStatus {
    fn now(state: SessionState) -> Self {
        Self {
            state,
            updated_at: Utc::now(),
        }
    }
}

impl From<&LifecycleEvent> for SessionState {
    fn from(event: &LifecycleEvent) -> Self {
        match event.clone() {
            LifecycleEvent::Started { request_id } => SessionState::Pending { request_id },
            LifecycleEvent::Succeeded { request_id, result } => {
                SessionState::Succeeded { request_id, result }
            }
            LifecycleEvent::Failed {
                request_id,
                code,
                message,
            } => SessionState::Failed {
                request_id,
                code,
                message,
            },
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Service
// ────────────────────────────────────────────────────────────────────────────

struct InFlight {
    request_id: Uuid,
    cancel: CancelToken,
}

pub struct ProposalService {
    builder: ProposalRequestBuilder,
    client: Arc<dyn GenerationClient>,
    policy: BackoffPolicy,
    credential: Option<String>,
    events: broadcast::Sender<LifecycleEvent>,
    in_flight: Mutex<Option<InFlight>>,
    status: Mutex<SessionStatus>,
}

impl ProposalService {
    pub fn new(
        builder: ProposalRequestBuilder,
        client: Arc<dyn GenerationClient>,
        policy: BackoffPolicy,
        credential: Option<String>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            builder,
            client,
            policy,
            credential,
            events,
            in_flight: Mutex::new(None),
            status: Mutex::new(SessionStatus::now(SessionState::Idle)),
        }
    }

    pub fn backend(&self) -> &'static str {
        self.client.backend()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.events.subscribe()
    }

    pub fn status(&self) -> SessionStatus {
        lock(&self.status).clone()
    }

    /// The most recent successful result, if the session currently holds one.
    pub fn latest_result(&self) -> Option<ProposalResult> {
        match &lock(&self.status).state {
            SessionState::Succeeded { result, .. } => Some(result.clone()),
            _ => None,
        }
    }

    /// Builds, sends, and validates one proposal.
    ///
    /// Input and credential problems are returned before anything is published.
    /// A cancelled run returns `Cancelled` and publishes nothing further.
    pub async fn generate_proposal(
        &self,
        job_description: &str,
    ) -> Result<ProposalResult, GenerationError> {
        let request = self
            .builder
            .build(job_description, self.credential.as_deref())?;

        let (request_id, cancel) = self.begin()?;
        let _slot = InFlightSlot {
            service: self,
            request_id,
        };

        info!(
            "Generating proposal {} ({} chars, backend={})",
            request_id,
            request.job_description().len(),
            self.client.backend()
        );
        self.publish(LifecycleEvent::Started { request_id });

        let outcome =
            retry_with_backoff(&self.policy, &cancel, || self.client.generate(&request)).await;

        let event = match &outcome {
            Ok(result) => LifecycleEvent::Succeeded {
                request_id,
                result: result.clone(),
            },
            Err(GenerationError::Cancelled) => return Err(GenerationError::Cancelled),
            Err(e) => LifecycleEvent::Failed {
                request_id,
                code: e.code(),
                message: e.to_string(),
            },
        };

        // A result that raced a cancel must not be applied.
        if !self.publish_if_current(request_id, event) {
            info!("Proposal {} abandoned", request_id);
            return Err(GenerationError::Cancelled);
        }
        outcome
    }

    /// Abandons the in-flight generation, if any. Returns whether one was cancelled.
    pub fn cancel(&self) -> bool {
        let Some(in_flight) = lock(&self.in_flight).take() else {
            return false;
        };
        in_flight.cancel.cancel();

        let mut status = lock(&self.status);
        if status.state
            == (SessionState::Pending {
                request_id: in_flight.request_id,
            })
        {
            *status = SessionStatus::now(SessionState::Idle);
        }
        info!("Cancelled proposal {}", in_flight.request_id);
        true
    }

    fn begin(&self) -> Result<(Uuid, CancelToken), GenerationError> {
        let mut in_flight = lock(&self.in_flight);
        if let Some(current) = in_flight.as_ref() {
            warn!(
                "Rejecting submission: proposal {} still in flight",
                current.request_id
            );
            return Err(GenerationError::Busy);
        }

        let request_id = Uuid::new_v4();
        let cancel = CancelToken::new();
        *in_flight = Some(InFlight {
            request_id,
            cancel: cancel.clone(),
        });
        Ok((request_id, cancel))
    }

    fn publish_if_current(&self, request_id: Uuid, event: LifecycleEvent) -> bool {
        let mut in_flight = lock(&self.in_flight);
        if !in_flight
            .as_ref()
            .is_some_and(|f| f.request_id == request_id)
        {
            return false;
        }
        self.publish(event);
        // The run is finished once its outcome is out; a later cancel has nothing to stop.
        *in_flight = None;
        true
    }

    /// Clears the slot of a run that ended without publishing an outcome,
    /// e.g. because its caller went away.
    fn release(&self, request_id: Uuid) {
        let mut in_flight = lock(&self.in_flight);
        if !in_flight
            .as_ref()
            .is_some_and(|f| f.request_id == request_id)
        {
            return;
        }
        *in_flight = None;

        let mut status = lock(&self.status);
        if status.state == (SessionState::Pending { request_id }) {
            *status = SessionStatus::now(SessionState::Idle);
            info!("Proposal {} dropped before completion", request_id);
        }
    }

    fn publish(&self, event: LifecycleEvent) {
        *lock(&self.status) = SessionStatus::now(SessionState::from(&event));
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

/// Frees the in-flight slot when a generation ends or its future is dropped.
struct InFlightSlot<'a> {
    service: &'a ProposalService,
    request_id: Uuid,
}

impl Drop for InFlightSlot<'_> {
    fn drop(&mut self) {
        self.service.release(self.request_id);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Logs every lifecycle event until the service is dropped.
pub fn spawn_event_logger(mut events: broadcast::Receiver<LifecycleEvent>) {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(LifecycleEvent::Started { request_id }) => {
                    info!("proposal {request_id}: started");
                }
                Ok(LifecycleEvent::Succeeded { request_id, result }) => {
                    info!(
                        "proposal {request_id}: succeeded ({} summary points, {} skills)",
                        result.client_summary.len(),
                        result.suggested_skills.len()
                    );
                }
                Ok(LifecycleEvent::Failed {
                    request_id,
                    code,
                    message,
                }) => {
                    warn!("proposal {request_id}: failed [{code}] {message}");
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Lifecycle logger lagged, skipped {skipped} events");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
