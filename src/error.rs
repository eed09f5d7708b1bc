//! # Error Types
//!
//! Structured error handling for handler resolution, the backing container and the
//! in-process dispatch harness, using thiserror instead of `Box<dyn Error>` patterns.
//!
//! Resolution never retries. A message with no matching handlers is not an error at
//! all: it resolves to an empty handler list and completes without doing any work.

use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Errors raised while resolving handlers for a message
#[derive(Error, Debug)]
pub enum ResolutionError {
    /// The root container was torn down before (or while) resolution ran.
    ///
    /// Callers should treat this as a cancellation, not as a processing failure.
    #[error("Handler resolution aborted, because the bus is shutting down")]
    ShuttingDown,

    /// A type or handler declaration can never be satisfied. This is a programming
    /// error in the declarations, not a problem with message data.
    #[error("Malformed handler declaration for {type_name}: {reason}")]
    MalformedDeclaration { type_name: String, reason: String },

    #[error("Unit of work {unit_of_work_id} has already completed")]
    UnitOfWorkCompleted { unit_of_work_id: Uuid },

    #[error("Container error: {0}")]
    Container(#[from] ContainerError),
}

impl ResolutionError {
    /// Create a malformed declaration error
    pub fn malformed(type_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedDeclaration {
            type_name: type_name.into(),
            reason: reason.into(),
        }
    }

    /// True when the error signals shutdown rather than a processing fault
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::ShuttingDown)
    }

    /// Fold container disposal into the shutdown signal, keeping every other
    /// container failure as-is
    pub(crate) fn from_container(error: ContainerError) -> Self {
        match error {
            ContainerError::Disposed => Self::ShuttingDown,
            other => Self::Container(other),
        }
    }
}

/// Errors raised by the handler container and its scopes.
///
/// Cloneable so that a failed scoped or singleton factory keeps reporting the same
/// failure for as long as its result is cached.
#[derive(Error, Debug, Clone)]
pub enum ContainerError {
    #[error("Container has been disposed")]
    Disposed,

    #[error("No service registered for {service}")]
    ServiceNotRegistered { service: &'static str },

    #[error("Factory for {service} failed: {source}")]
    Factory {
        service: &'static str,
        #[source]
        source: Arc<dyn std::error::Error + Send + Sync + 'static>,
    },
}

impl ContainerError {
    /// Create a factory failure error
    pub fn factory(service: &'static str, source: impl Into<anyhow::Error>) -> Self {
        let source: Box<dyn std::error::Error + Send + Sync + 'static> = source.into().into();
        Self::Factory {
            service,
            source: Arc::from(source),
        }
    }

    /// Keep container failures raised inside nested factories recognizable
    pub(crate) fn from_factory(service: &'static str, error: anyhow::Error) -> Self {
        match error.downcast::<ContainerError>() {
            Ok(ContainerError::Disposed) => ContainerError::Disposed,
            Ok(other) => ContainerError::factory(service, other),
            Err(error) => ContainerError::factory(service, error),
        }
    }
}

/// Errors surfaced by [`crate::dispatch::MessageDispatcher`]
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// A handler failed. `source` is the handler's own error, untouched.
    #[error("Handler {implementation} failed: {source}")]
    Handler {
        implementation: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

pub type Result<T> = std::result::Result<T, ResolutionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disposed_container_becomes_cancellation() {
        let error = ResolutionError::from_container(ContainerError::Disposed);
        assert!(error.is_cancellation());
        assert!(error.to_string().contains("shutting down"));
    }

    #[test]
    fn other_container_errors_are_not_cancellation() {
        let error = ResolutionError::from_container(ContainerError::ServiceNotRegistered {
            service: "Clock",
        });
        assert!(!error.is_cancellation());
        assert!(matches!(error, ResolutionError::Container(_)));
    }

    #[test]
    fn factory_errors_keep_their_cause_when_cloned() {
        let error = ContainerError::factory("Clock", anyhow::anyhow!("clock skew"));
        let replayed = error.clone();
        assert_eq!(replayed.to_string(), "Factory for Clock failed: clock skew");
        assert!(std::error::Error::source(&replayed).is_some());
    }

    #[test]
    fn malformed_declaration_names_the_type() {
        let error = ResolutionError::malformed("Child", "cycle in base chain");
        assert_eq!(
            error.to_string(),
            "Malformed handler declaration for Child: cycle in base chain"
        );
    }
}
