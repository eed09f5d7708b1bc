//! Container abstractions consumed by handler resolution.

use crate::error::ContainerError;
use crate::messaging::{HandlerInstance, HandlerInterface};
use std::sync::Arc;
use uuid::Uuid;

/// A service that holds resources needing deterministic release
pub use ferrous_di::Dispose;

/// Handle to a live service scope
pub type ContainerHandle = Arc<dyn ServiceScope>;

/// The root of a scope tree. Shared by every unit of work for the life of the process.
pub trait RootContainer: Send + Sync {
    /// Create a child scope. Fails with [`ContainerError::Disposed`] once the root
    /// has been shut down.
    fn create_scope(&self) -> Result<ContainerHandle, ContainerError>;

    fn is_disposed(&self) -> bool;
}

/// A resource boundary that owns every instance resolved through it
pub trait ServiceScope: Send + Sync {
    fn id(&self) -> Uuid;

    /// Every registered handler satisfying `interface`, in registration order
    fn resolve_all(&self, interface: &HandlerInterface)
        -> Result<Vec<HandlerInstance>, ContainerError>;

    /// Release scoped resources. Only the first call has any effect.
    fn dispose(&self);

    fn is_disposed(&self) -> bool;
}

impl std::fmt::Debug for dyn ServiceScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceScope")
            .field("id", &self.id())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
