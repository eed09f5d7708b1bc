//! # Scope Provider
//!
//! Binds one container scope to each unit of work. The first resolution for a unit
//! of work creates the scope, stashes it in the unit of work's shared store and ties
//! its disposal to completion; later resolutions reuse it.
//!
//! A scope placed in the store by someone else (for example an earlier pipeline
//! stage that manages its own scope) is reused as-is and left for its owner to
//! dispose.

use crate::config::ActivationConfig;
use crate::constants::DEFAULT_SCOPE_ITEM_KEY;
use crate::container::{ContainerHandle, RootContainer};
use crate::error::{ResolutionError, Result};
use crate::logging::log_scope_operation;
use crate::unit_of_work::UnitOfWork;
use std::sync::Arc;
use tracing::debug;

/// A scope handed out for one resolution
#[derive(Clone)]
pub enum ScopeLease {
    /// Owned by the unit of work and disposed when it completes
    Tracked(ContainerHandle),
    /// Not tracked by anything; disposed when the last handle is dropped
    Untracked(ContainerHandle),
}

impl ScopeLease {
    pub fn handle(&self) -> &ContainerHandle {
        match self {
            Self::Tracked(handle) | Self::Untracked(handle) => handle,
        }
    }

    pub fn into_handle(self) -> ContainerHandle {
        match self {
            Self::Tracked(handle) | Self::Untracked(handle) => handle,
        }
    }

    pub fn is_tracked(&self) -> bool {
        matches!(self, Self::Tracked(_))
    }
}

impl std::fmt::Debug for ScopeLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopeLease")
            .field("scope_id", &self.handle().id())
            .field("tracked", &self.is_tracked())
            .finish()
    }
}

/// Shared-store entry holding a unit of work's scope
struct StoredScope(ContainerHandle);

pub struct ScopeProvider {
    root: Arc<dyn RootContainer>,
    item_key: String,
}

impl ScopeProvider {
    pub fn new(root: Arc<dyn RootContainer>) -> Self {
        Self {
            root,
            item_key: DEFAULT_SCOPE_ITEM_KEY.to_string(),
        }
    }

    pub fn from_config(root: Arc<dyn RootContainer>, config: &ActivationConfig) -> Self {
        Self::new(root).with_item_key(config.scope_item_key.clone())
    }

    pub fn with_item_key(mut self, item_key: impl Into<String>) -> Self {
        self.item_key = item_key.into();
        self
    }

    pub fn item_key(&self) -> &str {
        &self.item_key
    }

    /// The scope to resolve handlers from for `unit_of_work`.
    ///
    /// A unit of work without a shared store gets a fresh, untracked scope on every
    /// call. Otherwise the stored scope is reused, or created and stored on first use.
    pub fn get_scope(&self, unit_of_work: &UnitOfWork) -> Result<ScopeLease> {
        ensure_open(unit_of_work)?;
        if !unit_of_work.has_shared_store() {
            let scope = self.create_scope()?;
            log_scope_operation("created_untracked", Some(&unit_of_work.id().to_string()), false);
            return Ok(ScopeLease::Untracked(scope));
        }

        self.begin_scope(unit_of_work).map(ScopeLease::Tracked)
    }

    /// Create the unit of work's scope up front so that later stages and handler
    /// resolution share it. Returns the existing scope if one is already stored;
    /// a stored scope is never replaced.
    pub fn begin_scope(&self, unit_of_work: &UnitOfWork) -> Result<ContainerHandle> {
        ensure_open(unit_of_work)?;
        if let Some(existing) = self.current_scope(unit_of_work) {
            // Released along with a live root: the unit of work is over, the bus is not
            if existing.is_disposed() && !self.root.is_disposed() {
                return Err(completed(unit_of_work));
            }
            debug!(
                unit_of_work_id = %unit_of_work.id(),
                scope_id = %existing.id(),
                "Reusing unit of work scope"
            );
            return Ok(existing);
        }

        let scope = self.create_scope()?;

        // Register disposal before publishing the scope, so a unit of work that has
        // already completed never ends up holding a live scope
        let disposed = scope.clone();
        let unit_of_work_id = unit_of_work.id();
        unit_of_work.on_completed(move |outcome| {
            debug!(
                unit_of_work_id = %unit_of_work_id,
                scope_id = %disposed.id(),
                outcome = ?outcome,
                "Disposing unit of work scope"
            );
            disposed.dispose();
        })?;

        if !unit_of_work.set_shared(self.item_key.clone(), Arc::new(StoredScope(scope.clone()))) {
            scope.dispose();
            return Err(ResolutionError::malformed(
                self.item_key.clone(),
                "unit of work has no shared store to hold its scope",
            ));
        }

        log_scope_operation("created_tracked", Some(&unit_of_work_id.to_string()), true);
        Ok(scope)
    }

    /// Stash an externally owned scope for `unit_of_work`. The caller remains
    /// responsible for disposing it. Returns false when the unit of work has no
    /// shared store or already holds a scope.
    pub fn provide_scope(&self, unit_of_work: &UnitOfWork, scope: ContainerHandle) -> bool {
        if self.current_scope(unit_of_work).is_some() {
            return false;
        }
        unit_of_work.set_shared(self.item_key.clone(), Arc::new(StoredScope(scope)))
    }

    /// The scope currently bound to `unit_of_work`, if any. Never creates one.
    pub fn current_scope(&self, unit_of_work: &UnitOfWork) -> Option<ContainerHandle> {
        unit_of_work
            .get_shared::<StoredScope>(&self.item_key)
            .map(|stored| stored.0.clone())
    }

    fn create_scope(&self) -> Result<ContainerHandle> {
        self.root
            .create_scope()
            .map_err(ResolutionError::from_container)
    }
}

fn ensure_open(unit_of_work: &UnitOfWork) -> Result<()> {
    if unit_of_work.is_completed() {
        return Err(completed(unit_of_work));
    }
    Ok(())
}

fn completed(unit_of_work: &UnitOfWork) -> ResolutionError {
    ResolutionError::UnitOfWorkCompleted {
        unit_of_work_id: unit_of_work.id(),
    }
}

impl std::fmt::Debug for ScopeProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopeProvider")
            .field("item_key", &self.item_key)
            .field("root_disposed", &self.root.is_disposed())
            .finish()
    }
}
