//! Message handlers and the values handler resolution produces.

use super::message::Message;
use crate::constants::HANDLER_INTERFACE_NAME;
use crate::container::ContainerHandle;
use crate::types::TypeRef;
use async_trait::async_trait;
use std::any::{type_name, TypeId};
use std::fmt;
use std::sync::Arc;

/// Processes messages of the types it was registered for
#[async_trait]
pub trait HandleMessages: Send + Sync + 'static {
    async fn handle(&self, message: &dyn Message) -> anyhow::Result<()>;
}

/// The "handles messages of type T" interface instantiated for one target type.
/// This is the key handlers are registered and looked up under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerInterface(TypeRef);

impl HandlerInterface {
    pub fn for_type(target: TypeRef) -> Self {
        Self(target)
    }

    pub fn target(&self) -> &TypeRef {
        &self.0
    }
}

impl fmt::Display for HandlerInterface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{HANDLER_INTERFACE_NAME}<{}>", self.0)
    }
}

impl From<TypeRef> for HandlerInterface {
    fn from(target: TypeRef) -> Self {
        Self(target)
    }
}

/// Identity of a concrete handler implementation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Implementation {
    type_id: TypeId,
    type_name: &'static str,
}

impl Implementation {
    pub fn of<H: 'static>() -> Self {
        Self {
            type_id: TypeId::of::<H>(),
            type_name: type_name::<H>(),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Display for Implementation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name)
    }
}

/// A resolved handler, ready to be invoked for the current message.
///
/// Two instances are considered duplicates when their concrete implementation type
/// matches, regardless of whether they are the same object.
#[derive(Clone)]
pub struct HandlerInstance {
    implementation: Implementation,
    handler: Arc<dyn HandleMessages>,
    scope: Option<ContainerHandle>,
}

impl HandlerInstance {
    pub fn new<H: HandleMessages>(handler: Arc<H>) -> Self {
        Self {
            implementation: Implementation::of::<H>(),
            handler,
            scope: None,
        }
    }

    /// Build from an already type-erased handler whose implementation is known
    pub fn from_erased(implementation: Implementation, handler: Arc<dyn HandleMessages>) -> Self {
        Self {
            implementation,
            handler,
            scope: None,
        }
    }

    /// Tie the instance to the scope it was resolved from. Holding the instance
    /// keeps that scope alive.
    pub fn with_scope(mut self, scope: ContainerHandle) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn implementation(&self) -> Implementation {
        self.implementation
    }

    pub fn handler(&self) -> &Arc<dyn HandleMessages> {
        &self.handler
    }

    pub fn scope(&self) -> Option<&ContainerHandle> {
        self.scope.as_ref()
    }

    pub fn is<H: 'static>(&self) -> bool {
        self.implementation.type_id == TypeId::of::<H>()
    }

    pub async fn handle(&self, message: &dyn Message) -> anyhow::Result<()> {
        self.handler.handle(message).await
    }
}

impl fmt::Debug for HandlerInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerInstance")
            .field("implementation", &self.implementation.type_name)
            .field("scoped", &self.scope.is_some())
            .finish()
    }
}
