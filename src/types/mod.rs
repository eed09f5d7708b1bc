//! # Type Model
//!
//! Explicit runtime type descriptors for messages and handler targets.
//!
//! ## Overview
//!
//! Handlers are declared against a [`TypeRef`]. A message reports its own concrete
//! [`TypeRef`], and the [`TypeCatalog`] knows how that type relates to every other
//! declared type: its base class chain, the interfaces it implements, and the variance
//! and constraints of generic parameters.
//!
//! ```text
//! TypeCatalogBuilder ──build()──▶ TypeCatalog
//!   ├── TypeDefinition (class | interface, generic parameters)
//!   │     ├── base: TypeExpr
//!   │     └── interfaces: [TypeExpr]
//!   └── redelivery wrapper (default `Failed<out T>`)
//! ```

pub mod catalog;
pub mod definition;
pub mod type_ref;

pub use catalog::{TypeCatalog, TypeCatalogBuilder};
pub use definition::{GenericParameter, TypeDefinition, TypeKind, Variance};
pub use type_ref::{TypeExpr, TypeRef};
