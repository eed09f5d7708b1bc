//! # Handler Container
//!
//! Root container and child scopes that produce handler instances together with their
//! dependencies.
//!
//! ## Architecture
//!
//! ```text
//! Container (root: registrations + singletons)
//! ├── ContainerScope (unit of work A: scoped instances, disposables)
//! └── ContainerScope (unit of work B)
//! ```
//!
//! Dependency services (lifetimes, scoped caching, disposal) are handled by
//! `ferrous_di`. The container adds what a Rust type key cannot express: handler
//! registrations keyed by the message types they handle.
//!
//! Resolution only depends on the [`RootContainer`] and [`ServiceScope`] traits, so a
//! different container can be plugged in; [`Container`] is the built-in one.

pub mod builder;
pub mod scope;
pub mod traits;

pub use builder::{Container, ContainerBuilder, Lifetime};
pub use scope::{ContainerScope, ScopeContext};
pub use traits::{ContainerHandle, Dispose, RootContainer, ServiceScope};
