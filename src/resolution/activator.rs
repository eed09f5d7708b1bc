//! # Handler Activator
//!
//! Entry point the message pipeline calls to obtain the handlers for one message.
//!
//! ```text
//! get_handlers(message, unit_of_work)
//!   ├── ScopeProvider::get_scope     (one scope per unit of work)
//!   ├── HandlerTargetCache::resolve  (message type -> handler interfaces)
//!   └── HandlerCollector::collect    (interfaces -> deduplicated instances)
//! ```

use super::cache::HandlerTargetCache;
use super::collector::HandlerCollector;
use super::scope_provider::{ScopeLease, ScopeProvider};
use crate::config::ActivationConfig;
use crate::container::RootContainer;
use crate::error::Result;
use crate::logging::log_resolution_operation;
use crate::messaging::{HandlerInstance, Message};
use crate::types::TypeCatalog;
use crate::unit_of_work::UnitOfWork;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Produces the handlers that must process a message within a unit of work
#[async_trait]
pub trait HandlerActivator: Send + Sync {
    /// Every handler compatible with the message's runtime type, duplicates removed.
    ///
    /// An empty list is a valid result: the message completes without work.
    async fn get_handlers(
        &self,
        message: &dyn Message,
        unit_of_work: &UnitOfWork,
    ) -> Result<Vec<HandlerInstance>>;
}

/// [`HandlerActivator`] backed by a [`RootContainer`] and a [`TypeCatalog`]
pub struct ContainerHandlerActivator {
    scopes: ScopeProvider,
    collector: HandlerCollector,
}

impl ContainerHandlerActivator {
    pub fn new(root: Arc<dyn RootContainer>, catalog: Arc<TypeCatalog>) -> Self {
        Self::with_scope_provider(ScopeProvider::new(root), catalog)
    }

    pub fn from_config(
        root: Arc<dyn RootContainer>,
        catalog: Arc<TypeCatalog>,
        config: &ActivationConfig,
    ) -> Self {
        Self::with_scope_provider(ScopeProvider::from_config(root, config), catalog)
    }

    pub fn with_scope_provider(scopes: ScopeProvider, catalog: Arc<TypeCatalog>) -> Self {
        let cache = Arc::new(HandlerTargetCache::new(catalog));
        Self {
            scopes,
            collector: HandlerCollector::new(cache),
        }
    }

    pub fn scope_provider(&self) -> &ScopeProvider {
        &self.scopes
    }

    pub fn target_cache(&self) -> &Arc<HandlerTargetCache> {
        self.collector.cache()
    }
}

#[async_trait]
impl HandlerActivator for ContainerHandlerActivator {
    async fn get_handlers(
        &self,
        message: &dyn Message,
        unit_of_work: &UnitOfWork,
    ) -> Result<Vec<HandlerInstance>> {
        let message_type = message.message_type();
        let lease = self.scopes.get_scope(unit_of_work)?;
        let handlers = self.collector.collect(&message_type, lease.handle().as_ref())?;

        // Untracked scopes live as long as the handlers resolved from them
        let handlers: Vec<HandlerInstance> = match lease {
            ScopeLease::Tracked(_) => handlers,
            ScopeLease::Untracked(scope) => handlers
                .into_iter()
                .map(|handler| handler.with_scope(scope.clone()))
                .collect(),
        };

        let unit_of_work_id = unit_of_work.id().to_string();
        if handlers.is_empty() {
            debug!(
                message_type = %message_type,
                unit_of_work_id = %unit_of_work_id,
                "No handlers; message completes without work"
            );
        } else {
            debug!(
                message_type = %message_type,
                unit_of_work_id = %unit_of_work_id,
                handlers = handlers.len(),
                "Resolved handlers"
            );
        }
        log_resolution_operation(
            &message_type.to_string(),
            Some(&unit_of_work_id),
            handlers.len(),
            "resolved",
            None,
        );

        Ok(handlers)
    }
}

impl std::fmt::Debug for ContainerHandlerActivator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerHandlerActivator")
            .field("scopes", &self.scopes)
            .field("cached_message_types", &self.target_cache().len())
            .finish()
    }
}
