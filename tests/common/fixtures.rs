//! Shared type catalog, messages and handlers for integration tests.

use async_trait::async_trait;
use dispatch_core::messaging::{HandleMessages, HandlerInstance, Message};
use dispatch_core::types::{GenericParameter, TypeCatalog, TypeDefinition, TypeExpr, TypeRef};
use std::any::Any;
use std::sync::Arc;

/// Catalog used across the integration tests:
///
/// ```text
/// class Parent
/// class Child : Parent, IAuditable
/// class GrandChild : Child
/// class Unrelated
/// interface IAuditable
/// interface IMessage1
/// class Message1 : IMessage1
/// interface ICovariant<out T>
/// interface IGeneric<T>
/// interface IDoubleCovariant<out T, out S>
/// interface IConstrainedCovariant<out T> where T : Parent
/// class ConcreteCovariant<T> : ICovariant<T>
/// class ConcreteConstrained<T> : IConstrainedCovariant<T> where T : Parent
/// interface Failed<out TMessage>            (declared implicitly)
/// ```
pub fn catalog() -> Arc<TypeCatalog> {
    let catalog = TypeCatalog::builder()
        .class("Parent")
        .interface("IAuditable")
        .define(
            TypeDefinition::class("Child")
                .with_base("Parent")
                .implementing("IAuditable"),
        )
        .class_extending("GrandChild", "Child")
        .class("Unrelated")
        .interface("IMessage1")
        .define(TypeDefinition::class("Message1").implementing("IMessage1"))
        .generic_interface("ICovariant", [GenericParameter::covariant("T")])
        .generic_interface("IGeneric", [GenericParameter::invariant("T")])
        .generic_interface(
            "IDoubleCovariant",
            [
                GenericParameter::covariant("T"),
                GenericParameter::covariant("S"),
            ],
        )
        .generic_interface(
            "IConstrainedCovariant",
            [GenericParameter::covariant("T").constrained_to("Parent")],
        )
        .define(
            TypeDefinition::class("ConcreteCovariant")
                .with_parameters([GenericParameter::invariant("T")])
                .implementing(TypeExpr::generic("ICovariant", [TypeExpr::param(0)])),
        )
        .define(
            TypeDefinition::class("ConcreteConstrained")
                .with_parameters([GenericParameter::invariant("T").constrained_to("Parent")])
                .implementing(TypeExpr::generic(
                    "IConstrainedCovariant",
                    [TypeExpr::param(0)],
                )),
        )
        .build()
        .expect("fixture catalog is well formed");
    Arc::new(catalog)
}

/// Names of every non-generic type in [`catalog`]
pub const NAMED_TYPES: &[&str] = &[
    "Parent",
    "Child",
    "GrandChild",
    "Unrelated",
    "IAuditable",
    "IMessage1",
    "Message1",
];

pub fn named(name: &str) -> TypeRef {
    TypeRef::named(name)
}

pub fn generic(definition: &str, arguments: &[&str]) -> TypeRef {
    TypeRef::generic(definition, arguments.iter().map(|a| TypeRef::named(*a)))
}

/// A message whose runtime type is given explicitly
#[derive(Debug, Clone)]
pub struct TestMessage {
    type_ref: TypeRef,
    pub body: String,
}

impl TestMessage {
    pub fn of(type_ref: TypeRef) -> Self {
        Self {
            type_ref,
            body: String::new(),
        }
    }

    pub fn named(name: &str) -> Self {
        Self::of(named(name))
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }
}

impl Message for TestMessage {
    fn message_type(&self) -> TypeRef {
        self.type_ref.clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

macro_rules! noop_handlers {
    ($($name:ident),* $(,)?) => {
        $(
            pub struct $name;

            #[async_trait]
            impl HandleMessages for $name {
                async fn handle(&self, _message: &dyn Message) -> anyhow::Result<()> {
                    Ok(())
                }
            }
        )*
    };
}

noop_handlers!(
    HandlerA,
    HandlerB,
    HandlerC,
    HandlerD,
    AuditHandler,
    UnrelatedHandler,
    FailedParentHandler,
    FailedChildHandler,
    ChildHandler,
);

/// Short implementation names, in resolution order
pub fn implementation_names(handlers: &[HandlerInstance]) -> Vec<&'static str> {
    handlers
        .iter()
        .map(|h| {
            let full = h.implementation().type_name();
            full.rsplit("::").next().unwrap_or(full)
        })
        .collect()
}
