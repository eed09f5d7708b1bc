#![allow(clippy::doc_markdown)] // Allow technical terms like DashMap, TypeId in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Dispatch Core Rust
//!
//! Message handler resolution engine for an asynchronous message bus.
//!
//! ## Overview
//!
//! When a message arrives, the bus asks this crate for the handlers that must
//! process it. A handler declared for a base class, an implemented interface or a
//! covariant variant of the message's type is selected just like one declared for
//! the exact type. Every handler resolved while processing one message comes from
//! the same dependency scope, and that scope is released when the unit of work
//! completes.
//!
//! ## Architecture
//!
//! ```text
//! MessageDispatcher
//!   └── HandlerActivator (ContainerHandlerActivator)
//!         ├── ScopeProvider ──────▶ RootContainer ──▶ ServiceScope (per unit of work)
//!         ├── HandlerTargetCache ─▶ expand(TypeCatalog, message type)
//!         └── HandlerCollector ───▶ ServiceScope::resolve_all (deduplicated)
//! ```
//!
//! ## Module Organization
//!
//! - [`types`] - Runtime type descriptors and the validated type catalog
//! - [`resolution`] - Expansion, caching, collection and the activator facade
//! - [`container`] - Root container, scopes, lifetimes and disposal
//! - [`unit_of_work`] - Per-message shared store and completion callbacks
//! - [`messaging`] - Message and handler abstractions, redelivery envelope
//! - [`dispatch`] - In-process invoker honoring completion ordering
//! - [`config`] - Configuration management
//! - [`error`] - Structured error handling
//! - [`logging`] - Structured logging setup
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use dispatch_core::container::{Container, Lifetime};
//! use dispatch_core::messaging::{HandleMessages, Message};
//! use dispatch_core::resolution::{ContainerHandlerActivator, HandlerActivator};
//! use dispatch_core::types::{TypeCatalog, TypeRef};
//! use dispatch_core::unit_of_work::UnitOfWork;
//!
//! struct OrderPlaced;
//!
//! impl Message for OrderPlaced {
//!     fn message_type(&self) -> TypeRef {
//!         TypeRef::named("OrderPlaced")
//!     }
//!     fn as_any(&self) -> &dyn std::any::Any {
//!         self
//!     }
//! }
//!
//! struct AuditEverything;
//!
//! #[async_trait::async_trait]
//! impl HandleMessages for AuditEverything {
//!     async fn handle(&self, _message: &dyn Message) -> anyhow::Result<()> {
//!         Ok(())
//!     }
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let catalog = TypeCatalog::builder()
//!     .class("Event")
//!     .class_extending("OrderPlaced", "Event")
//!     .build()?;
//!
//! let container = Container::builder()
//!     .add_handler(Lifetime::Transient, [TypeRef::named("Event")], |_| Ok(AuditEverything))
//!     .build();
//!
//! let activator = ContainerHandlerActivator::new(Arc::new(container), Arc::new(catalog));
//! let unit_of_work = UnitOfWork::new();
//! let handlers = activator.get_handlers(&OrderPlaced, &unit_of_work).await?;
//! assert_eq!(handlers.len(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! ```bash
//! cargo test --lib                        # Unit tests
//! cargo test                              # Unit and integration tests
//! cargo bench --features benchmarks       # Resolution benchmarks
//! ```

pub mod config;
pub mod constants;
pub mod container;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod messaging;
pub mod resolution;
pub mod types;
pub mod unit_of_work;

pub use config::{ActivationConfig, ConfigurationError, LoggingConfig};
pub use container::{Container, ContainerBuilder, ContainerHandle, Lifetime, RootContainer};
pub use dispatch::{DispatchReport, MessageDispatcher};
pub use error::{ContainerError, DispatchError, ResolutionError, Result};
pub use messaging::{FailedMessage, HandleMessages, HandlerInstance, HandlerInterface, Message};
pub use resolution::{ContainerHandlerActivator, HandlerActivator, ScopeLease, ScopeProvider};
pub use types::{TypeCatalog, TypeCatalogBuilder, TypeRef};
pub use unit_of_work::{Outcome, UnitOfWork};
