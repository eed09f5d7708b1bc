//! Type definitions as declared at startup.

use super::type_ref::TypeExpr;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeKind {
    Class,
    Interface,
}

/// Variance of a generic parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Variance {
    #[default]
    Invariant,
    /// `out T`: a handler for `G<Base>` also receives `G<Derived>`
    Covariant,
    Contravariant,
}

/// A generic parameter with its variance and constraints.
///
/// An argument satisfies the parameter only when it is assignable to *every*
/// constraint. Constraints may mention sibling parameters via [`TypeExpr::Parameter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericParameter {
    pub name: String,
    pub variance: Variance,
    pub constraints: Vec<TypeExpr>,
}

impl GenericParameter {
    pub fn invariant(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variance: Variance::Invariant,
            constraints: Vec::new(),
        }
    }

    pub fn covariant(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variance: Variance::Covariant,
            constraints: Vec::new(),
        }
    }

    pub fn contravariant(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variance: Variance::Contravariant,
            constraints: Vec::new(),
        }
    }

    /// Add a `where T : constraint` clause
    pub fn constrained_to(mut self, constraint: impl Into<TypeExpr>) -> Self {
        self.constraints.push(constraint.into());
        self
    }

    pub fn is_covariant(&self) -> bool {
        self.variance == Variance::Covariant
    }
}

/// A declared class or interface, possibly generic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDefinition {
    pub name: Arc<str>,
    pub kind: TypeKind,
    pub parameters: Vec<GenericParameter>,
    pub base: Option<TypeExpr>,
    pub interfaces: Vec<TypeExpr>,
}

impl TypeDefinition {
    pub fn class(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            kind: TypeKind::Class,
            parameters: Vec::new(),
            base: None,
            interfaces: Vec::new(),
        }
    }

    pub fn interface(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            kind: TypeKind::Interface,
            parameters: Vec::new(),
            base: None,
            interfaces: Vec::new(),
        }
    }

    pub fn with_parameters(mut self, parameters: impl IntoIterator<Item = GenericParameter>) -> Self {
        self.parameters = parameters.into_iter().collect();
        self
    }

    pub fn with_base(mut self, base: impl Into<TypeExpr>) -> Self {
        self.base = Some(base.into());
        self
    }

    pub fn implementing(mut self, interface: impl Into<TypeExpr>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    pub fn arity(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_interface(&self) -> bool {
        self.kind == TypeKind::Interface
    }

    pub fn has_covariant_parameters(&self) -> bool {
        self.parameters.iter().any(GenericParameter::is_covariant)
    }

    /// Every type expression this definition mentions directly
    pub(crate) fn referenced_expressions(&self) -> impl Iterator<Item = &TypeExpr> {
        self.base
            .iter()
            .chain(self.interfaces.iter())
            .chain(self.parameters.iter().flat_map(|p| p.constraints.iter()))
    }
}
