//! # Container Builder
//!
//! Explicitly populated registry of handler factories and their dependencies, built
//! once during startup. Handlers state the message types they handle when they are
//! registered; nothing is discovered by scanning.
//!
//! ```rust
//! use async_trait::async_trait;
//! use dispatch_core::container::{Container, Lifetime};
//! use dispatch_core::messaging::{HandleMessages, Message};
//! use dispatch_core::types::TypeRef;
//!
//! struct AuditLog;
//!
//! struct AuditHandler {
//!     log: std::sync::Arc<AuditLog>,
//! }
//!
//! #[async_trait]
//! impl HandleMessages for AuditHandler {
//!     async fn handle(&self, _message: &dyn Message) -> anyhow::Result<()> {
//!         Ok(())
//!     }
//! }
//!
//! let container = Container::builder()
//!     .add_scoped(|_| Ok(AuditLog))
//!     .add_handler(Lifetime::Transient, [TypeRef::named("Parent")], |ctx| {
//!         Ok(AuditHandler { log: ctx.get::<AuditLog>()? })
//!     })
//!     .build();
//! # drop(container);
//! ```

use super::scope::{ContainerScope, Produced, ScopeContext};
use super::traits::{ContainerHandle, Dispose, RootContainer};
use crate::error::ContainerError;
use crate::messaging::{HandleMessages, HandlerInterface, Implementation};
use crate::types::TypeRef;
use ferrous_di::{Resolver, ResolverContext, ServiceCollection, ServiceProvider};
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::any::type_name;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// How long a resolved instance lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Lifetime {
    /// One instance for the life of the root container
    Singleton,
    /// One instance per scope, i.e. per unit of work
    Scoped,
    /// A fresh instance on every resolution
    Transient,
}

pub(crate) type HandlerFactory = Arc<
    dyn Fn(&ScopeContext<'_, '_>) -> anyhow::Result<Arc<dyn HandleMessages>> + Send + Sync,
>;

pub(crate) struct HandlerRegistration {
    /// Shared by every interface the same `add_handler` call registered
    pub id: usize,
    pub implementation: Implementation,
    pub lifetime: Lifetime,
    pub factory: HandlerFactory,
}

/// Handler instances cached by a scope, or by the root for singletons
pub(crate) type HandlerInstances = Mutex<HashMap<usize, Arc<dyn HandleMessages>>>;

pub(crate) struct ContainerInner {
    pub provider: ServiceProvider,
    pub handlers: IndexMap<HandlerInterface, Vec<Arc<HandlerRegistration>>>,
    pub singleton_handlers: HandlerInstances,
    service_count: usize,
    disposed: AtomicBool,
}

impl ContainerInner {
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}

/// Wrap a user factory so ferrous-di caches its outcome, failures included
fn producer<T, F>(factory: F) -> impl Fn(&ResolverContext) -> Produced<T> + Send + Sync + 'static
where
    T: Send + Sync + 'static,
    F: Fn(&ScopeContext<'_, '_>) -> anyhow::Result<T> + Send + Sync + 'static,
{
    move |resolver| {
        let outcome = factory(&ScopeContext::for_factory(resolver))
            .map(Arc::new)
            .map_err(|e| ContainerError::from_factory(type_name::<T>(), e));
        Produced::new(outcome)
    }
}

/// Like [`producer`], and hands successful instances to the resolving scope (or the
/// root, for singletons) for disposal
fn disposable_producer<T, F>(
    factory: F,
) -> impl Fn(&ResolverContext) -> Produced<T> + Send + Sync + 'static
where
    T: Dispose + Send + Sync + 'static,
    F: Fn(&ScopeContext<'_, '_>) -> anyhow::Result<T> + Send + Sync + 'static,
{
    move |resolver| {
        let outcome = factory(&ScopeContext::for_factory(resolver))
            .map(|instance| {
                let instance = Arc::new(instance);
                resolver.register_disposer(instance.clone());
                instance
            })
            .map_err(|e| ContainerError::from_factory(type_name::<T>(), e));
        Produced::new(outcome)
    }
}

pub struct ContainerBuilder {
    services: ServiceCollection,
    service_count: usize,
    handlers: IndexMap<HandlerInterface, Vec<Arc<HandlerRegistration>>>,
    next_handler_id: usize,
}

impl Default for ContainerBuilder {
    fn default() -> Self {
        Self {
            services: ServiceCollection::new(),
            service_count: 0,
            handlers: IndexMap::new(),
            next_handler_id: 0,
        }
    }
}

impl ContainerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    // Last registration for a service type wins, as with any service collection

    pub fn add_singleton<T, F>(mut self, factory: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&ScopeContext<'_, '_>) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        self.services
            .add_singleton_factory::<Produced<T>, _>(producer(factory));
        self.registered::<T>(Lifetime::Singleton)
    }

    pub fn add_scoped<T, F>(mut self, factory: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&ScopeContext<'_, '_>) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        self.services
            .add_scoped_factory::<Produced<T>, _>(producer(factory));
        self.registered::<T>(Lifetime::Scoped)
    }

    pub fn add_transient<T, F>(mut self, factory: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&ScopeContext<'_, '_>) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        self.services
            .add_transient_factory::<Produced<T>, _>(producer(factory));
        self.registered::<T>(Lifetime::Transient)
    }

    /// Singleton released when the root container shuts down
    pub fn add_singleton_disposable<T, F>(mut self, factory: F) -> Self
    where
        T: Dispose + Send + Sync + 'static,
        F: Fn(&ScopeContext<'_, '_>) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        self.services
            .add_singleton_factory::<Produced<T>, _>(disposable_producer(factory));
        self.registered::<T>(Lifetime::Singleton)
    }

    /// Scoped service released when its scope is disposed
    pub fn add_scoped_disposable<T, F>(mut self, factory: F) -> Self
    where
        T: Dispose + Send + Sync + 'static,
        F: Fn(&ScopeContext<'_, '_>) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        self.services
            .add_scoped_factory::<Produced<T>, _>(disposable_producer(factory));
        self.registered::<T>(Lifetime::Scoped)
    }

    /// Transient service tracked by the scope that created it
    pub fn add_transient_disposable<T, F>(mut self, factory: F) -> Self
    where
        T: Dispose + Send + Sync + 'static,
        F: Fn(&ScopeContext<'_, '_>) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        self.services
            .add_transient_factory::<Produced<T>, _>(disposable_producer(factory));
        self.registered::<T>(Lifetime::Transient)
    }

    fn registered<T>(mut self, lifetime: Lifetime) -> Self {
        debug!(service = type_name::<T>(), lifetime = ?lifetime, "Registering service");
        self.service_count += 1;
        self
    }

    /// Register handler `H` under the handler interface of every type in `handled`
    pub fn add_handler<H, F>(
        mut self,
        lifetime: Lifetime,
        handled: impl IntoIterator<Item = TypeRef>,
        factory: F,
    ) -> Self
    where
        H: HandleMessages,
        F: Fn(&ScopeContext<'_, '_>) -> anyhow::Result<H> + Send + Sync + 'static,
    {
        let factory: HandlerFactory = Arc::new(
            move |ctx: &ScopeContext<'_, '_>| -> anyhow::Result<Arc<dyn HandleMessages>> {
                let handler: Arc<dyn HandleMessages> = Arc::new(factory(ctx)?);
                Ok(handler)
            },
        );
        self.insert_handler(Implementation::of::<H>(), lifetime, handled, factory);
        self
    }

    /// Register an already constructed handler. Every resolution yields this same object.
    pub fn add_handler_instance<H: HandleMessages>(
        mut self,
        handler: Arc<H>,
        handled: impl IntoIterator<Item = TypeRef>,
    ) -> Self {
        let factory: HandlerFactory = Arc::new(
            move |_: &ScopeContext<'_, '_>| -> anyhow::Result<Arc<dyn HandleMessages>> {
                let handler: Arc<dyn HandleMessages> = handler.clone();
                Ok(handler)
            },
        );
        self.insert_handler(Implementation::of::<H>(), Lifetime::Transient, handled, factory);
        self
    }

    fn insert_handler(
        &mut self,
        implementation: Implementation,
        lifetime: Lifetime,
        handled: impl IntoIterator<Item = TypeRef>,
        factory: HandlerFactory,
    ) {
        let registration = Arc::new(HandlerRegistration {
            id: self.next_handler_id,
            implementation,
            lifetime,
            factory,
        });
        self.next_handler_id += 1;

        for target in handled {
            debug!(
                implementation = implementation.type_name(),
                target = %target,
                lifetime = ?lifetime,
                "Registering handler"
            );
            self.handlers
                .entry(HandlerInterface::for_type(target))
                .or_default()
                .push(registration.clone());
        }
    }

    pub fn build(self) -> Container {
        info!(
            services = self.service_count,
            handler_interfaces = self.handlers.len(),
            handler_registrations = self.next_handler_id,
            "Container built"
        );
        Container {
            inner: Arc::new(ContainerInner {
                provider: self.services.build(),
                handlers: self.handlers,
                singleton_handlers: Mutex::new(HashMap::new()),
                service_count: self.service_count,
                disposed: AtomicBool::new(false),
            }),
        }
    }
}

impl std::fmt::Debug for ContainerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerBuilder")
            .field("services", &self.service_count)
            .field("handler_interfaces", &self.handlers.len())
            .finish()
    }
}

/// Root container. Cheap to clone; clones share registrations and singletons.
#[derive(Clone)]
pub struct Container {
    inner: Arc<ContainerInner>,
}

impl Container {
    pub fn builder() -> ContainerBuilder {
        ContainerBuilder::new()
    }

    /// Create a concrete scope; [`RootContainer::create_scope`] returns it type-erased
    pub fn create_child_scope(&self) -> Result<Arc<ContainerScope>, ContainerError> {
        if self.inner.is_disposed() {
            return Err(ContainerError::Disposed);
        }
        Ok(Arc::new(ContainerScope::new(self.inner.clone())))
    }

    /// Number of registrations for one handler interface
    pub fn registration_count(&self, interface: &HandlerInterface) -> usize {
        self.inner.handlers.get(interface).map_or(0, Vec::len)
    }

    /// Tear the root down: later scope creation and resolution fail with
    /// [`ContainerError::Disposed`], and singleton disposables are released.
    pub fn shutdown(&self) {
        if self.inner.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.inner.singleton_handlers.lock().clear();
        // Only synchronous disposers are ever registered, so this completes on first poll
        futures::executor::block_on(self.inner.provider.dispose_all());
        info!("Container shut down");
    }
}

impl RootContainer for Container {
    fn create_scope(&self) -> Result<ContainerHandle, ContainerError> {
        let scope: ContainerHandle = self.create_child_scope()?;
        Ok(scope)
    }

    fn is_disposed(&self) -> bool {
        self.inner.is_disposed()
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("services", &self.inner.service_count)
            .field("handler_interfaces", &self.inner.handlers.len())
            .field("disposed", &self.inner.is_disposed())
            .finish()
    }
}
