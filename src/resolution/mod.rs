//! # Handler Resolution
//!
//! Polymorphic handler activation: given a message and the unit of work processing
//! it, produce every handler whose declared target type is compatible with the
//! message's runtime type.
//!
//! ## Compatibility
//!
//! A handler registered for target `T` is selected for a message of type `M` when
//! `T` is `M` itself, any base class or implemented interface of `M` (transitively),
//! or a covariant re-instantiation of one of those. Redelivered messages of type
//! `Failed<M>` select handlers for `Failed<T>` only.
//!
//! ## Components
//!
//! - [`expander`] - pure type expansion over the [`crate::types::TypeCatalog`]
//! - [`cache`] - process-wide memo from message type to handler interfaces
//! - [`collector`] - scope lookups plus implementation-level deduplication
//! - [`scope_provider`] - one container scope per unit of work
//! - [`activator`] - the [`HandlerActivator`] facade

pub mod activator;
pub mod cache;
pub mod collector;
pub mod expander;
pub mod scope_provider;

pub use activator::{ContainerHandlerActivator, HandlerActivator};
pub use cache::{HandlerTargetCache, TargetCacheStats};
pub use collector::HandlerCollector;
pub use expander::expand;
pub use scope_provider::{ScopeLease, ScopeProvider};
