//! # Type Compatibility Expander
//!
//! Computes every handler target type that is compatible with a concrete message
//! type: the type itself, all of its ancestors, and covariant re-instantiations of
//! generic ancestors. Pure function of the catalog and the input type.
//!
//! ```text
//! ConcreteCovariant<Child>
//!   ├── seed:      ConcreteCovariant<Child>, ICovariant<Child>
//!   └── covariant: ICovariant<Parent>            (out T, Child: Parent)
//! ```
//!
//! Redelivered messages (`Failed<M>`) expand to `Failed<T>` for every `T` in the
//! expansion of `M`, and to nothing else.

use crate::error::{ResolutionError, Result};
use crate::types::{TypeCatalog, TypeRef};
use indexmap::IndexSet;

/// Expand `message_type` to its ordered, duplicate-free set of compatible targets.
///
/// The message type always comes first, followed by its supertypes in catalog
/// order, then the covariant variants of each seed. Undeclared or constraint
/// violating types fail with [`ResolutionError::MalformedDeclaration`].
pub fn expand(catalog: &TypeCatalog, message_type: &TypeRef) -> Result<IndexSet<TypeRef>> {
    catalog.validate(message_type)?;

    if let Some(original) = catalog.unwrap_failed(message_type) {
        let inner = expand(catalog, original)?;
        return Ok(inner
            .into_iter()
            .map(|target| catalog.wrap_failed(target))
            .collect());
    }

    let mut targets = IndexSet::new();
    targets.insert(message_type.clone());
    targets.extend(catalog.supertypes(message_type)?);

    let seeds: Vec<TypeRef> = targets.iter().cloned().collect();
    for seed in &seeds {
        catalog.validate(seed)?;
        targets.extend(covariant_variants(catalog, seed)?);
    }

    Ok(targets)
}

/// Re-instantiations of `seed` with each covariant argument replaced by itself or
/// any of its supertypes that still satisfies the parameter's constraints
fn covariant_variants(catalog: &TypeCatalog, seed: &TypeRef) -> Result<Vec<TypeRef>> {
    let TypeRef::Generic {
        definition,
        arguments,
    } = seed
    else {
        return Ok(Vec::new());
    };

    let declared = catalog.definition(definition).ok_or_else(|| {
        ResolutionError::malformed(seed.to_string(), "type was never declared")
    })?;
    if !declared.has_covariant_parameters() {
        return Ok(Vec::new());
    }

    let mut positions = Vec::with_capacity(arguments.len());
    for (parameter, argument) in declared.parameters.iter().zip(arguments.iter()) {
        let mut candidates = vec![argument.clone()];
        if parameter.is_covariant() {
            for ancestor in catalog.supertypes(argument)? {
                if catalog.satisfies(parameter, &ancestor, arguments)? {
                    candidates.push(ancestor);
                }
            }
        }
        positions.push(candidates);
    }

    Ok(cartesian_product(&positions)
        .into_iter()
        .map(|combination| TypeRef::generic(definition.clone(), combination))
        .collect())
}

/// Row-major product: the last position varies fastest
fn cartesian_product(positions: &[Vec<TypeRef>]) -> Vec<Vec<TypeRef>> {
    positions
        .iter()
        .fold(vec![Vec::new()], |combinations, candidates| {
            combinations
                .iter()
                .flat_map(|prefix| {
                    candidates.iter().map(move |candidate| {
                        let mut next = prefix.clone();
                        next.push(candidate.clone());
                        next
                    })
                })
                .collect()
        })
}
