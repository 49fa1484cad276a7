//! Command execution pipeline (application-level orchestration).
//!
//! ```text
//! Command
//!   ↓
//! 1. Load the current document (or start from an empty aggregate)
//!   ↓
//! 2. Handle command (pure decision logic, produces events)
//!   ↓
//! 3. Apply events to evolve state
//!   ↓
//! 4. Save with `ExpectedVersion::Exact(loaded version)`
//!   ↓
//! 5. Log committed events
//! ```
//!
//! A writer that loses the version race gets [`DispatchError::Concurrency`];
//! nothing is retried automatically.

use thiserror::Error;
use uuid::Uuid;

use storefront_core::{Aggregate, DomainError, DomainEvent, ExpectedVersion};

use crate::document_store::{Document, DocumentStore, StoreError};

#[derive(Debug, Error)]
pub enum DispatchError {
    /// Optimistic concurrency failure (e.g. stale document version).
    #[error("conflict: {0}")]
    Concurrency(String),
    /// Domain validation failure (deterministic).
    #[error("{0}")]
    Validation(String),
    /// Domain invariant failure (deterministic).
    #[error("{0}")]
    InvariantViolation(String),
    /// Domain authorization failure.
    #[error("unauthorized")]
    Unauthorized,
    /// Domain-level not found.
    #[error("not found")]
    NotFound,
    /// Loading or persisting the document failed.
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for DispatchError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Concurrency(msg) => DispatchError::Concurrency(msg),
            other => DispatchError::Store(other),
        }
    }
}

impl From<DomainError> for DispatchError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => DispatchError::Validation(msg),
            DomainError::InvariantViolation(msg) => DispatchError::InvariantViolation(msg),
            DomainError::Conflict(msg) => DispatchError::Concurrency(msg),
            DomainError::Unauthorized => DispatchError::Unauthorized,
            DomainError::NotFound => DispatchError::NotFound,
            DomainError::InvalidId(msg) => DispatchError::Validation(msg),
        }
    }
}

/// Reusable command execution engine for document-backed aggregates.
#[derive(Debug, Clone)]
pub struct CommandDispatcher<S> {
    store: S,
}

impl<S> CommandDispatcher<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

impl<S> CommandDispatcher<S> {
    /// Run `command` against the aggregate stored under `key` and persist the result.
    ///
    /// `make_aggregate` builds the empty instance used when no document exists yet.
    /// Returns the aggregate state after the new events are applied.
    pub async fn dispatch<A>(
        &self,
        key: Uuid,
        command: A::Command,
        make_aggregate: impl FnOnce() -> A,
    ) -> Result<A, DispatchError>
    where
        A: Aggregate<Error = DomainError> + Document,
        A::Event: DomainEvent,
        S: DocumentStore<A>,
    {
        // 1) Load
        let mut aggregate = match self.store.get(key).await? {
            Some(existing) => {
                if existing.key() != key {
                    return Err(DispatchError::Store(StoreError::Backend(format!(
                        "{} returned document {} for key {key}",
                        A::COLLECTION,
                        existing.key()
                    ))));
                }
                existing
            }
            None => make_aggregate(),
        };
        let expected = ExpectedVersion::Exact(aggregate.revision());

        // 2) Decide events (no mutation)
        let decided = aggregate.handle(&command)?;
        if decided.is_empty() {
            return Ok(aggregate);
        }

        // 3) Evolve
        for event in &decided {
            aggregate.apply(event);
        }

        // 4) Persist (optimistic)
        self.store.save(&aggregate, expected).await?;

        // 5) Log committed events
        for event in &decided {
            tracing::info!(
                collection = A::COLLECTION,
                key = %key,
                event_type = event.event_type(),
                occurred_at = %event.occurred_at(),
                revision = aggregate.revision(),
                "event committed"
            );
        }

        Ok(aggregate)
    }
}
