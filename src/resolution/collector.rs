//! # Handler Collector
//!
//! Turns cached handler interfaces into live handler instances from one scope.

use super::cache::HandlerTargetCache;
use crate::container::ServiceScope;
use crate::error::{ResolutionError, Result};
use crate::messaging::HandlerInstance;
use crate::types::TypeRef;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::trace;

#[derive(Debug, Clone)]
pub struct HandlerCollector {
    cache: Arc<HandlerTargetCache>,
}

impl HandlerCollector {
    pub fn new(cache: Arc<HandlerTargetCache>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &Arc<HandlerTargetCache> {
        &self.cache
    }

    /// Resolve every handler registered for an interface compatible with
    /// `message_type`, in target order then registration order.
    ///
    /// An implementation reachable through several targets is kept once, at its
    /// first position.
    pub fn collect(
        &self,
        message_type: &TypeRef,
        scope: &dyn ServiceScope,
    ) -> Result<Vec<HandlerInstance>> {
        let interfaces = self.cache.resolve(message_type)?;
        let mut seen = HashSet::new();
        let mut handlers = Vec::new();

        for interface in interfaces.iter() {
            let resolved = scope
                .resolve_all(interface)
                .map_err(ResolutionError::from_container)?;
            for instance in resolved {
                if seen.insert(instance.implementation().type_id()) {
                    handlers.push(instance);
                } else {
                    trace!(
                        interface = %interface,
                        implementation = instance.implementation().type_name(),
                        "Skipping duplicate handler"
                    );
                }
            }
        }

        Ok(handlers)
    }
}
