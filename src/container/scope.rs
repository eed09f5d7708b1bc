//! Scoped resolution and disposal.
//!
//! Dependency services live in a `ferrous_di::Scope`, which caches scoped instances
//! and releases the disposables it tracked, newest first. Handlers are keyed by
//! message type rather than by Rust type, so their registrations and cached
//! instances stay here.

use super::builder::{ContainerInner, HandlerInstances, HandlerRegistration, Lifetime};
use super::traits::ServiceScope;
use crate::error::ContainerError;
use crate::messaging::{HandleMessages, HandlerInstance, HandlerInterface};
use ferrous_di::{DiError, Resolver, ResolverContext, Scope};
use parking_lot::Mutex;
use std::any::type_name;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// What a service factory produced, cached by ferrous-di under the registration's
/// lifetime. A failure is cached just like an instance.
pub(crate) struct Produced<T> {
    outcome: Result<Arc<T>, ContainerError>,
}

impl<T> Produced<T> {
    pub(crate) fn new(outcome: Result<Arc<T>, ContainerError>) -> Self {
        Self { outcome }
    }
}

enum Source<'a, 'r> {
    Scope(&'a Scope),
    Factory(&'a ResolverContext<'r>),
}

/// Resolution context handed to factories
pub struct ScopeContext<'a, 'r> {
    source: Source<'a, 'r>,
}

impl<'a, 'r> ScopeContext<'a, 'r> {
    pub(crate) fn for_scope(scope: &'a Scope) -> Self {
        Self {
            source: Source::Scope(scope),
        }
    }

    pub(crate) fn for_factory(resolver: &'a ResolverContext<'r>) -> Self {
        Self {
            source: Source::Factory(resolver),
        }
    }

    /// Resolve a dependency with its registered lifetime
    pub fn get<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, ContainerError> {
        let produced = match self.source {
            Source::Scope(scope) => scope.get::<Produced<T>>(),
            Source::Factory(resolver) => resolver.get::<Produced<T>>(),
        }
        .map_err(unresolved::<T>)?;
        produced.outcome.clone()
    }
}

fn unresolved<T>(error: DiError) -> ContainerError {
    match error {
        DiError::NotFound(_) => ContainerError::ServiceNotRegistered {
            service: type_name::<T>(),
        },
        other => ContainerError::factory(type_name::<T>(), anyhow::anyhow!("{other}")),
    }
}

/// A child scope of a [`super::Container`].
///
/// Dropping the last reference to a scope that was never disposed disposes it.
pub struct ContainerScope {
    id: Uuid,
    root: Arc<ContainerInner>,
    services: Scope,
    handlers: HandlerInstances,
    disposed: AtomicBool,
}

impl ContainerScope {
    pub(crate) fn new(root: Arc<ContainerInner>) -> Self {
        let id = Uuid::new_v4();
        debug!(scope_id = %id, "Service scope created");
        Self {
            id,
            services: root.provider.create_scope(),
            root,
            handlers: Mutex::new(HashMap::new()),
            disposed: AtomicBool::new(false),
        }
    }

    pub fn get<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, ContainerError> {
        self.ensure_live()?;
        self.context().get::<T>()
    }

    fn ensure_live(&self) -> Result<(), ContainerError> {
        if self.disposed.load(Ordering::Acquire) || self.root.is_disposed() {
            return Err(ContainerError::Disposed);
        }
        Ok(())
    }

    fn context(&self) -> ScopeContext<'_, '_> {
        ScopeContext::for_scope(&self.services)
    }

    fn resolve_handler(
        &self,
        registration: &HandlerRegistration,
    ) -> Result<Arc<dyn HandleMessages>, ContainerError> {
        let store = match registration.lifetime {
            Lifetime::Transient => return self.create_handler(registration),
            Lifetime::Scoped => &self.handlers,
            Lifetime::Singleton => &self.root.singleton_handlers,
        };

        if let Some(existing) = store.lock().get(&registration.id) {
            return Ok(existing.clone());
        }
        // Built outside the lock so the factory can resolve other handlers' services
        let created = self.create_handler(registration)?;
        Ok(store
            .lock()
            .entry(registration.id)
            .or_insert(created)
            .clone())
    }

    fn create_handler(
        &self,
        registration: &HandlerRegistration,
    ) -> Result<Arc<dyn HandleMessages>, ContainerError> {
        (registration.factory)(&self.context())
            .map_err(|e| ContainerError::from_factory(registration.implementation.type_name(), e))
    }

    fn dispose_inner(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.handlers.lock().clear();
        // Only synchronous disposers are ever registered, so this completes on first poll
        futures::executor::block_on(self.services.dispose_all());
        debug!(scope_id = %self.id, "Service scope disposed");
    }
}

impl ServiceScope for ContainerScope {
    fn id(&self) -> Uuid {
        self.id
    }

    fn resolve_all(
        &self,
        interface: &HandlerInterface,
    ) -> Result<Vec<HandlerInstance>, ContainerError> {
        self.ensure_live()?;
        let Some(registrations) = self.root.handlers.get(interface) else {
            return Ok(Vec::new());
        };

        registrations
            .iter()
            .map(|registration| {
                let handler = self.resolve_handler(registration)?;
                Ok(HandlerInstance::from_erased(registration.implementation, handler))
            })
            .collect()
    }

    fn dispose(&self) {
        self.dispose_inner();
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}

impl Drop for ContainerScope {
    fn drop(&mut self) {
        self.dispose_inner();
    }
}

impl std::fmt::Debug for ContainerScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerScope")
            .field("id", &self.id)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
