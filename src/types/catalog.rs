//! # Type Catalog
//!
//! Startup-built table of every message type the process knows about, with its base
//! class, implemented interfaces and generic parameters. The catalog replaces runtime
//! type introspection: handlers and messages name their types explicitly and the
//! catalog answers ancestry and assignability questions about them.
//!
//! ## Usage
//!
//! ```rust
//! use dispatch_core::types::{GenericParameter, TypeCatalog, TypeRef};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let catalog = TypeCatalog::builder()
//!     .class("Parent")
//!     .class_extending("Child", "Parent")
//!     .generic_interface("ICovariant", [GenericParameter::covariant("T")])
//!     .build()?;
//!
//! let child = TypeRef::named("Child");
//! assert!(catalog.is_assignable(&child, &TypeRef::named("Parent"))?);
//! # Ok(())
//! # }
//! ```

use super::definition::{GenericParameter, TypeDefinition, TypeKind, Variance};
use super::type_ref::{TypeExpr, TypeRef};
use crate::config::ActivationConfig;
use crate::constants::DEFAULT_REDELIVERY_WRAPPER;
use crate::error::{ResolutionError, Result};
use indexmap::{IndexMap, IndexSet};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::debug;

/// Validated, immutable set of type definitions
#[derive(Debug, Clone)]
pub struct TypeCatalog {
    definitions: IndexMap<Arc<str>, TypeDefinition>,
    redelivery_wrapper: Arc<str>,
}

impl TypeCatalog {
    pub fn builder() -> TypeCatalogBuilder {
        TypeCatalogBuilder::new()
    }

    pub fn definition(&self, name: &str) -> Option<&TypeDefinition> {
        self.definitions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Name of the generic definition that marks a redelivered (failed) message
    pub fn redelivery_wrapper(&self) -> &str {
        &self.redelivery_wrapper
    }

    /// Wrap `original` in the redelivery wrapper
    pub fn wrap_failed(&self, original: TypeRef) -> TypeRef {
        TypeRef::generic(self.redelivery_wrapper.clone(), [original])
    }

    /// Returns the wrapped original type when `type_ref` is a redelivery wrapper
    pub fn unwrap_failed<'a>(&self, type_ref: &'a TypeRef) -> Option<&'a TypeRef> {
        match type_ref {
            TypeRef::Generic {
                definition,
                arguments,
            } if **definition == *self.redelivery_wrapper && arguments.len() == 1 => {
                arguments.first()
            }
            _ => None,
        }
    }

    fn require(&self, type_ref: &TypeRef) -> Result<&TypeDefinition> {
        self.definitions
            .get(type_ref.definition_name())
            .ok_or_else(|| ResolutionError::malformed(type_ref.to_string(), "type was never declared"))
    }

    /// Check that a closed type names declared definitions with matching arity and
    /// that every generic argument satisfies all constraints of its parameter
    pub fn validate(&self, type_ref: &TypeRef) -> Result<()> {
        let definition = self.require(type_ref)?;
        let arguments = type_ref.arguments();

        if definition.arity() != arguments.len() {
            return Err(ResolutionError::malformed(
                type_ref.to_string(),
                format!(
                    "{} expects {} generic argument(s), got {}",
                    definition.name,
                    definition.arity(),
                    arguments.len()
                ),
            ));
        }

        for argument in arguments {
            self.validate(argument)?;
        }

        self.check_constraints(type_ref, &definition.parameters, arguments)
    }

    fn check_constraints(
        &self,
        type_ref: &TypeRef,
        parameters: &[GenericParameter],
        arguments: &[TypeRef],
    ) -> Result<()> {
        for (parameter, argument) in parameters.iter().zip(arguments) {
            if !self.satisfies(parameter, argument, arguments)? {
                return Err(ResolutionError::malformed(
                    type_ref.to_string(),
                    format!(
                        "argument {argument} does not satisfy the constraints on {}",
                        parameter.name
                    ),
                ));
            }
        }
        Ok(())
    }

    /// True when `candidate` is assignable to every constraint of `parameter`.
    /// Constraints that mention sibling parameters are closed over `arguments`.
    pub fn satisfies(
        &self,
        parameter: &GenericParameter,
        candidate: &TypeRef,
        arguments: &[TypeRef],
    ) -> Result<bool> {
        for constraint in &parameter.constraints {
            let constraint = constraint.substitute(arguments)?;
            if !self.is_assignable(candidate, &constraint)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Every ancestor of `type_ref`: base classes and implemented interfaces,
    /// transitively, breadth first with the base before the interfaces at each level.
    /// The type itself is not included.
    pub fn supertypes(&self, type_ref: &TypeRef) -> Result<IndexSet<TypeRef>> {
        let mut found = IndexSet::new();
        let mut queue = VecDeque::from([type_ref.clone()]);

        while let Some(current) = queue.pop_front() {
            let definition = self.require(&current)?;
            for expr in definition.base.iter().chain(definition.interfaces.iter()) {
                let parent = expr.substitute(current.arguments())?;
                if parent != *type_ref && found.insert(parent.clone()) {
                    queue.push_back(parent);
                }
            }
        }

        Ok(found)
    }

    /// Whether a value of type `from` can be used where `to` is expected, honoring
    /// declared variance of generic interface parameters
    pub fn is_assignable(&self, from: &TypeRef, to: &TypeRef) -> Result<bool> {
        if from == to {
            return Ok(true);
        }

        let ancestors = self.supertypes(from)?;
        if ancestors.contains(to) {
            return Ok(true);
        }

        let TypeRef::Generic { definition, .. } = to else {
            return Ok(false);
        };
        let Some(target) = self.definitions.get(definition) else {
            return Ok(false);
        };
        if target.parameters.iter().all(|p| p.variance == Variance::Invariant) {
            return Ok(false);
        }

        for candidate in std::iter::once(from).chain(ancestors.iter()) {
            if candidate.definition_name() == &**definition
                && self.variant_arguments_match(target, candidate.arguments(), to.arguments())?
            {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn variant_arguments_match(
        &self,
        definition: &TypeDefinition,
        from: &[TypeRef],
        to: &[TypeRef],
    ) -> Result<bool> {
        if from.len() != to.len() || from.len() != definition.arity() {
            return Ok(false);
        }
        for ((parameter, source), target) in definition.parameters.iter().zip(from).zip(to) {
            let matches = match parameter.variance {
                Variance::Invariant => source == target,
                Variance::Covariant => self.is_assignable(source, target)?,
                Variance::Contravariant => self.is_assignable(target, source)?,
            };
            if !matches {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Fluent builder for [`TypeCatalog`]. All validation happens in [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct TypeCatalogBuilder {
    definitions: Vec<TypeDefinition>,
    redelivery_wrapper: Arc<str>,
}

impl Default for TypeCatalogBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeCatalogBuilder {
    pub fn new() -> Self {
        Self {
            definitions: Vec::new(),
            redelivery_wrapper: Arc::from(DEFAULT_REDELIVERY_WRAPPER),
        }
    }

    pub fn from_config(config: &ActivationConfig) -> Self {
        Self::new().redelivery_wrapper(config.redelivery_wrapper.as_str())
    }

    /// Use a different generic definition as the redelivery wrapper
    pub fn redelivery_wrapper(mut self, name: impl Into<Arc<str>>) -> Self {
        self.redelivery_wrapper = name.into();
        self
    }

    pub fn define(mut self, definition: TypeDefinition) -> Self {
        self.definitions.push(definition);
        self
    }

    pub fn class(self, name: &str) -> Self {
        self.define(TypeDefinition::class(name))
    }

    pub fn class_extending(self, name: &str, base: impl Into<TypeExpr>) -> Self {
        self.define(TypeDefinition::class(name).with_base(base))
    }

    pub fn interface(self, name: &str) -> Self {
        self.define(TypeDefinition::interface(name))
    }

    pub fn generic_interface(
        self,
        name: &str,
        parameters: impl IntoIterator<Item = GenericParameter>,
    ) -> Self {
        self.define(TypeDefinition::interface(name).with_parameters(parameters))
    }

    pub fn generic_class(
        self,
        name: &str,
        parameters: impl IntoIterator<Item = GenericParameter>,
    ) -> Self {
        self.define(TypeDefinition::class(name).with_parameters(parameters))
    }

    pub fn build(self) -> Result<TypeCatalog> {
        let mut definitions: IndexMap<Arc<str>, TypeDefinition> = IndexMap::new();
        for definition in self.definitions {
            if definitions.contains_key(&definition.name) {
                return Err(ResolutionError::malformed(
                    definition.name.to_string(),
                    "declared more than once",
                ));
            }
            definitions.insert(definition.name.clone(), definition);
        }

        match definitions.get(&self.redelivery_wrapper) {
            Some(wrapper) if wrapper.arity() != 1 => {
                return Err(ResolutionError::malformed(
                    self.redelivery_wrapper.to_string(),
                    format!(
                        "redelivery wrapper must take exactly one generic argument, declares {}",
                        wrapper.arity()
                    ),
                ));
            }
            Some(_) => {}
            None => {
                definitions.insert(
                    self.redelivery_wrapper.clone(),
                    TypeDefinition::interface(self.redelivery_wrapper.clone())
                        .with_parameters([GenericParameter::covariant("TMessage")]),
                );
            }
        }

        let catalog = TypeCatalog {
            definitions,
            redelivery_wrapper: self.redelivery_wrapper,
        };

        for definition in catalog.definitions.values() {
            catalog.check_definition(definition)?;
        }
        catalog.check_acyclic()?;
        for definition in catalog.definitions.values() {
            catalog.check_closed_instantiations(definition)?;
        }

        debug!(
            definitions = catalog.len(),
            redelivery_wrapper = %catalog.redelivery_wrapper,
            "Type catalog built"
        );

        Ok(catalog)
    }
}

impl TypeCatalog {
    fn check_definition(&self, definition: &TypeDefinition) -> Result<()> {
        let owner = definition.name.to_string();

        if definition.kind == TypeKind::Class
            && definition
                .parameters
                .iter()
                .any(|p| p.variance != Variance::Invariant)
        {
            return Err(ResolutionError::malformed(
                owner,
                "variance is only allowed on interface parameters",
            ));
        }

        if let Some(base) = &definition.base {
            if definition.is_interface() {
                return Err(ResolutionError::malformed(owner, "an interface cannot have a base class"));
            }
            if self.kind_of(definition, base)? != TypeKind::Class {
                return Err(ResolutionError::malformed(owner, "base type must be a class"));
            }
        }

        for interface in &definition.interfaces {
            if self.kind_of(definition, interface)? != TypeKind::Interface {
                return Err(ResolutionError::malformed(
                    owner,
                    "implemented types must be interfaces",
                ));
            }
        }

        for parameter in &definition.parameters {
            for constraint in &parameter.constraints {
                self.check_expr(definition, constraint)?;
            }
        }

        Ok(())
    }

    /// Kind of the definition an ancestor expression points at
    fn kind_of(&self, owner: &TypeDefinition, expr: &TypeExpr) -> Result<TypeKind> {
        self.check_expr(owner, expr)?;
        match expr {
            TypeExpr::Parameter(_) => Err(ResolutionError::malformed(
                owner.name.to_string(),
                "cannot inherit from a bare generic parameter",
            )),
            TypeExpr::Named(name) | TypeExpr::Generic { definition: name, .. } => self
                .definitions
                .get(name)
                .map(|d| d.kind)
                .ok_or_else(|| ResolutionError::malformed(name.to_string(), "type was never declared")),
        }
    }

    fn check_expr(&self, owner: &TypeDefinition, expr: &TypeExpr) -> Result<()> {
        match expr {
            TypeExpr::Parameter(index) if *index >= owner.arity() => Err(ResolutionError::malformed(
                owner.name.to_string(),
                format!("refers to generic parameter {index} but declares {}", owner.arity()),
            )),
            TypeExpr::Parameter(_) => Ok(()),
            TypeExpr::Named(name) => self.check_reference(owner, name, 0),
            TypeExpr::Generic {
                definition,
                arguments,
            } => {
                self.check_reference(owner, definition, arguments.len())?;
                arguments.iter().try_for_each(|a| self.check_expr(owner, a))
            }
        }
    }

    fn check_reference(&self, owner: &TypeDefinition, name: &str, arity: usize) -> Result<()> {
        let referenced = self.definitions.get(name).ok_or_else(|| {
            ResolutionError::malformed(
                owner.name.to_string(),
                format!("refers to undeclared type {name}"),
            )
        })?;
        if referenced.arity() != arity {
            return Err(ResolutionError::malformed(
                owner.name.to_string(),
                format!(
                    "uses {name} with {arity} generic argument(s), it declares {}",
                    referenced.arity()
                ),
            ));
        }
        Ok(())
    }

    fn check_acyclic(&self) -> Result<()> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Visiting,
            Done,
        }

        fn visit(
            catalog: &TypeCatalog,
            name: &Arc<str>,
            marks: &mut HashMap<Arc<str>, Mark>,
        ) -> Result<()> {
            match marks.get(name) {
                Some(Mark::Done) => return Ok(()),
                Some(Mark::Visiting) => {
                    return Err(ResolutionError::malformed(
                        name.to_string(),
                        "inherits from itself",
                    ))
                }
                None => {}
            }
            marks.insert(name.clone(), Mark::Visiting);
            if let Some(definition) = catalog.definitions.get(name) {
                for expr in definition.base.iter().chain(definition.interfaces.iter()) {
                    if let TypeExpr::Named(parent) | TypeExpr::Generic { definition: parent, .. } = expr {
                        visit(catalog, parent, marks)?;
                    }
                }
            }
            marks.insert(name.clone(), Mark::Done);
            Ok(())
        }

        let mut marks = HashMap::new();
        for name in self.definitions.keys() {
            visit(self, name, &mut marks)?;
        }
        Ok(())
    }

    fn check_closed_instantiations(&self, definition: &TypeDefinition) -> Result<()> {
        fn closed_generics<'a>(expr: &'a TypeExpr, out: &mut Vec<&'a TypeExpr>) {
            if let TypeExpr::Generic { arguments, .. } = expr {
                if expr.is_closed() {
                    out.push(expr);
                }
                for argument in arguments {
                    closed_generics(argument, out);
                }
            }
        }

        let mut closed = Vec::new();
        for expr in definition.referenced_expressions() {
            closed_generics(expr, &mut closed);
        }
        for expr in closed {
            let type_ref = expr.substitute(&[])?;
            self.validate(&type_ref).map_err(|e| match e {
                ResolutionError::MalformedDeclaration { reason, .. } => ResolutionError::malformed(
                    definition.name.to_string(),
                    format!("declares {type_ref}: {reason}"),
                ),
                other => other,
            })?;
        }
        Ok(())
    }
}
