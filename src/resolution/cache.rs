//! # Handler Target Cache
//!
//! Memoizes the expansion of each message type into handler interfaces for the life
//! of the process. Safe for concurrent readers and writers; two threads racing on the
//! same key may both compute, but only one result is kept and both see it.

use super::expander::expand;
use crate::error::Result;
use crate::messaging::HandlerInterface;
use crate::types::{TypeCatalog, TypeRef};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Cache statistics for monitoring
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetCacheStats {
    pub cached_message_types: usize,
    pub message_types: Vec<String>,
}

pub struct HandlerTargetCache {
    catalog: Arc<TypeCatalog>,
    entries: DashMap<TypeRef, Arc<[HandlerInterface]>>,
}

impl HandlerTargetCache {
    pub fn new(catalog: Arc<TypeCatalog>) -> Self {
        Self {
            catalog,
            entries: DashMap::new(),
        }
    }

    pub fn catalog(&self) -> &Arc<TypeCatalog> {
        &self.catalog
    }

    /// Handler interfaces compatible with `message_type`, computed once per type.
    /// Failed expansions are returned to the caller and never stored.
    pub fn resolve(&self, message_type: &TypeRef) -> Result<Arc<[HandlerInterface]>> {
        if let Some(entry) = self.entries.get(message_type) {
            return Ok(entry.value().clone());
        }

        let interfaces: Arc<[HandlerInterface]> = expand(&self.catalog, message_type)?
            .into_iter()
            .map(HandlerInterface::for_type)
            .collect();

        debug!(
            message_type = %message_type,
            targets = interfaces.len(),
            "Cached handler targets"
        );

        Ok(self
            .entries
            .entry(message_type.clone())
            .or_insert(interfaces)
            .value()
            .clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> TargetCacheStats {
        let mut message_types: Vec<String> =
            self.entries.iter().map(|entry| entry.key().to_string()).collect();
        message_types.sort();

        TargetCacheStats {
            cached_message_types: message_types.len(),
            message_types,
        }
    }
}

impl std::fmt::Debug for HandlerTargetCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerTargetCache")
            .field("catalog_definitions", &self.catalog.len())
            .field("entries", &self.entries.len())
            .finish()
    }
}
