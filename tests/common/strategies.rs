use super::fixtures::{generic, named, NAMED_TYPES};
use dispatch_core::types::{TypeCatalog, TypeRef};
use proptest::prelude::*;

/// Strategy for picking one plain type declared by the fixture catalog
pub fn named_type_strategy() -> impl Strategy<Value = TypeRef> {
    any_name().prop_map(named)
}

fn any_name() -> impl Strategy<Value = &'static str> {
    prop::sample::select(NAMED_TYPES)
}

/// Strategy for arguments that satisfy every fixture constraint
fn parent_family_strategy() -> impl Strategy<Value = &'static str> {
    prop::sample::select(&["Parent", "Child", "GrandChild"][..])
}

/// Strategy for any closed, valid message type from the fixture catalog,
/// including generic instantiations and redelivery wrappers
pub fn message_type_strategy() -> impl Strategy<Value = TypeRef> {
    let plain = prop_oneof![
        named_type_strategy(),
        any_name().prop_map(|a| generic("ICovariant", &[a])),
        any_name().prop_map(|a| generic("IGeneric", &[a])),
        any_name().prop_map(|a| generic("ConcreteCovariant", &[a])),
        (any_name(), any_name()).prop_map(|(a, b)| generic("IDoubleCovariant", &[a, b])),
        parent_family_strategy().prop_map(|a| generic("IConstrainedCovariant", &[a])),
        parent_family_strategy().prop_map(|a| generic("ConcreteConstrained", &[a])),
    ];

    (plain, any::<bool>()).prop_map(|(type_ref, redelivered)| {
        if redelivered {
            TypeRef::generic("Failed", [type_ref])
        } else {
            type_ref
        }
    })
}

/// Strategy for valid type identifiers
pub fn type_name_strategy() -> impl Strategy<Value = String> {
    "[A-Z][a-zA-Z0-9]{0,15}"
}

/// Strategy for a catalog of unrelated root classes plus the name of one of them
pub fn root_classes_strategy() -> impl Strategy<Value = (TypeCatalog, String)> {
    prop::collection::hash_set(type_name_strategy(), 1..8)
        .prop_filter("wrapper name is reserved", |names| !names.contains("Failed"))
        .prop_flat_map(|names| {
            let names: Vec<String> = names.into_iter().collect();
            let count = names.len();
            (Just(names), 0..count)
        })
        .prop_map(|(names, picked)| {
            let catalog = names
                .iter()
                .fold(TypeCatalog::builder(), |builder, name| builder.class(name))
                .build()
                .expect("root classes never conflict");
            (catalog, names[picked].clone())
        })
}

/// Strategy for a single inheritance chain `C0 <- C1 <- ... <- Cn`, returned
/// most-derived first
pub fn class_chain_strategy() -> impl Strategy<Value = (TypeCatalog, Vec<TypeRef>)> {
    (1usize..10).prop_map(|depth| {
        let mut builder = TypeCatalog::builder().class("C0");
        for level in 1..depth {
            builder = builder.class_extending(&format!("C{level}"), format!("C{}", level - 1).as_str());
        }
        let catalog = builder.build().expect("chains are acyclic");
        let chain = (0..depth).rev().map(|level| named(&format!("C{level}"))).collect();
        (catalog, chain)
    })
}
