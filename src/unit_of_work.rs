//! # Unit of Work
//!
//! The end-to-end processing of one inbound message. A unit of work carries a shared
//! key/value store that pipeline stages use to hand values to each other, and a
//! list of completion callbacks that fire exactly once when processing ends,
//! whatever the outcome.
//!
//! A unit of work is passed explicitly to every resolution call; there is no ambient
//! "current" unit of work. One worker processes a given unit of work at a time.

use crate::error::{ResolutionError, Result};
use parking_lot::Mutex;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// How processing of a unit of work ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Succeeded,
    Failed(String),
    /// Dropped without an explicit completion
    Abandoned,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

pub type CompletionCallback = Box<dyn FnOnce(&Outcome) + Send>;

type SharedValue = Arc<dyn Any + Send + Sync>;

#[derive(Default)]
struct Completion {
    callbacks: Vec<CompletionCallback>,
    outcome: Option<Outcome>,
}

pub struct UnitOfWork {
    id: Uuid,
    items: Option<Mutex<HashMap<String, SharedValue>>>,
    completion: Mutex<Completion>,
}

impl UnitOfWork {
    /// A unit of work with a shared store, as created by a processing pipeline
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            items: Some(Mutex::new(HashMap::new())),
            completion: Mutex::new(Completion::default()),
        }
    }

    /// A unit of work without a shared store, for use outside a full pipeline.
    /// Scopes created for it are not tracked.
    pub fn isolated() -> Self {
        Self {
            id: Uuid::new_v4(),
            items: None,
            completion: Mutex::new(Completion::default()),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn has_shared_store(&self) -> bool {
        self.items.is_some()
    }

    pub fn get_shared<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        let value = self.items.as_ref()?.lock().get(key).cloned()?;
        value.downcast::<T>().ok()
    }

    /// Store a value; returns false when this unit of work has no shared store
    pub fn set_shared<T: Any + Send + Sync>(&self, key: impl Into<String>, value: Arc<T>) -> bool {
        match &self.items {
            Some(items) => {
                items.lock().insert(key.into(), value);
                true
            }
            None => false,
        }
    }

    /// Register a callback to run once when the unit of work completes
    pub fn on_completed(&self, callback: impl FnOnce(&Outcome) + Send + 'static) -> Result<()> {
        let mut completion = self.completion.lock();
        if completion.outcome.is_some() {
            return Err(ResolutionError::UnitOfWorkCompleted {
                unit_of_work_id: self.id,
            });
        }
        completion.callbacks.push(Box::new(callback));
        Ok(())
    }

    /// Complete the unit of work and run the callbacks in registration order.
    /// Returns false if it had already completed; callbacks never run twice.
    pub fn complete(&self, outcome: Outcome) -> bool {
        let callbacks = {
            let mut completion = self.completion.lock();
            if completion.outcome.is_some() {
                return false;
            }
            completion.outcome = Some(outcome.clone());
            std::mem::take(&mut completion.callbacks)
        };

        debug!(
            unit_of_work_id = %self.id,
            outcome = ?outcome,
            callbacks = callbacks.len(),
            "Completing unit of work"
        );

        for callback in callbacks {
            callback(&outcome);
        }
        true
    }

    pub fn is_completed(&self) -> bool {
        self.completion.lock().outcome.is_some()
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.completion.lock().outcome.clone()
    }
}

impl Default for UnitOfWork {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for UnitOfWork {
    fn drop(&mut self) {
        if !self.is_completed() {
            warn!(unit_of_work_id = %self.id, "Unit of work dropped without completion");
            self.complete(Outcome::Abandoned);
        }
    }
}

impl fmt::Debug for UnitOfWork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitOfWork")
            .field("id", &self.id)
            .field("has_shared_store", &self.has_shared_store())
            .field("completed", &self.is_completed())
            .finish()
    }
}
