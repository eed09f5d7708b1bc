//! Polymorphic Handler Activation Tests
//!
//! End-to-end resolution through the activator: hierarchy, interface, covariant and
//! redelivery matching, plus implementation-level deduplication.

mod common;

use common::*;
use dispatch_core::container::{Container, ContainerBuilder, Lifetime};
use dispatch_core::messaging::{FailedMessage, HandlerInstance, Message};
use dispatch_core::resolution::{expand, ContainerHandlerActivator, HandlerActivator};
use dispatch_core::types::{GenericParameter, TypeCatalog, TypeDefinition, TypeRef};
use dispatch_core::unit_of_work::UnitOfWork;
use dispatch_core::ResolutionError;
use std::sync::Arc;

fn activator(builder: ContainerBuilder) -> ContainerHandlerActivator {
    ContainerHandlerActivator::new(Arc::new(builder.build()), catalog())
}

async fn resolve(activator: &ContainerHandlerActivator, message: &dyn Message) -> Vec<HandlerInstance> {
    let unit_of_work = UnitOfWork::new();
    activator
        .get_handlers(message, &unit_of_work)
        .await
        .expect("resolution succeeds")
}

#[test]
fn type_without_ancestors_expands_to_itself() {
    let catalog = catalog();
    let targets = expand(&catalog, &named("Unrelated")).unwrap();
    assert_eq!(targets.into_iter().collect::<Vec<_>>(), vec![named("Unrelated")]);
}

#[test]
fn derived_type_expands_through_its_whole_ancestry() {
    let catalog = catalog();
    let targets = expand(&catalog, &named("GrandChild")).unwrap();
    assert_eq!(
        targets.into_iter().collect::<Vec<_>>(),
        vec![
            named("GrandChild"),
            named("Child"),
            named("Parent"),
            named("IAuditable"),
        ]
    );
}

#[tokio::test]
async fn handlers_for_base_types_are_selected() {
    // Scenario: A handles Parent, B handles Child
    let activator = activator(
        Container::builder()
            .add_handler(Lifetime::Transient, [named("Parent")], |_| Ok(HandlerA))
            .add_handler(Lifetime::Transient, [named("Child")], |_| Ok(HandlerB)),
    );

    let for_child = resolve(&activator, &TestMessage::named("Child")).await;
    assert_eq!(implementation_names(&for_child), vec!["HandlerB", "HandlerA"]);

    let for_parent = resolve(&activator, &TestMessage::named("Parent")).await;
    assert_eq!(implementation_names(&for_parent), vec!["HandlerA"]);
}

#[tokio::test]
async fn handlers_for_implemented_interfaces_are_selected() {
    let activator = activator(
        Container::builder()
            .add_handler(Lifetime::Transient, [named("IMessage1")], |_| Ok(HandlerA))
            .add_handler(Lifetime::Transient, [named("IAuditable")], |_| Ok(AuditHandler))
            .add_handler(Lifetime::Transient, [named("Unrelated")], |_| Ok(UnrelatedHandler)),
    );

    let handlers = resolve(&activator, &TestMessage::named("Message1")).await;
    assert_eq!(implementation_names(&handlers), vec!["HandlerA"]);

    let handlers = resolve(&activator, &TestMessage::named("GrandChild")).await;
    assert_eq!(implementation_names(&handlers), vec!["AuditHandler"]);
}

#[tokio::test]
async fn covariant_handler_for_base_argument_is_selected() {
    // Scenario: C handles ICovariant<Parent>
    let activator = activator(Container::builder().add_handler(
        Lifetime::Transient,
        [generic("ICovariant", &["Parent"])],
        |_| Ok(HandlerC),
    ));

    let derived = TestMessage::of(generic("ConcreteCovariant", &["Child"]));
    assert_eq!(implementation_names(&resolve(&activator, &derived).await), vec!["HandlerC"]);

    let exact = TestMessage::of(generic("ConcreteCovariant", &["Parent"]));
    assert_eq!(implementation_names(&resolve(&activator, &exact).await), vec!["HandlerC"]);
}

#[tokio::test]
async fn covariant_handler_for_derived_argument_is_not_selected_for_base() {
    // Scenario: D handles ICovariant<Child> only
    let activator = activator(Container::builder().add_handler(
        Lifetime::Transient,
        [generic("ICovariant", &["Child"])],
        |_| Ok(HandlerD),
    ));

    let base = TestMessage::of(generic("ConcreteCovariant", &["Parent"]));
    assert!(resolve(&activator, &base).await.is_empty());

    let derived = TestMessage::of(generic("ConcreteCovariant", &["GrandChild"]));
    assert_eq!(implementation_names(&resolve(&activator, &derived).await), vec!["HandlerD"]);
}

#[tokio::test]
async fn invariant_parameters_are_matched_exactly() {
    let activator = activator(Container::builder().add_handler(
        Lifetime::Transient,
        [generic("IGeneric", &["Parent"])],
        |_| Ok(HandlerA),
    ));

    let handlers = resolve(&activator, &TestMessage::of(generic("IGeneric", &["Child"]))).await;
    assert!(handlers.is_empty());
}

#[tokio::test]
async fn constrained_covariance_skips_ancestors_outside_the_constraint() {
    let activator = activator(
        Container::builder()
            .add_handler(
                Lifetime::Transient,
                [generic("IConstrainedCovariant", &["Parent"])],
                |_| Ok(HandlerA),
            )
            .add_handler(
                Lifetime::Transient,
                [generic("IConstrainedCovariant", &["IAuditable"])],
                |_| Ok(AuditHandler),
            ),
    );

    let message = TestMessage::of(generic("ConcreteConstrained", &["Child"]));
    assert_eq!(implementation_names(&resolve(&activator, &message).await), vec!["HandlerA"]);

    let targets = expand(&catalog(), &generic("ConcreteConstrained", &["Child"])).unwrap();
    assert!(targets.contains(&generic("IConstrainedCovariant", &["Parent"])));
    assert!(!targets.contains(&generic("IConstrainedCovariant", &["IAuditable"])));
}

#[tokio::test]
async fn candidates_must_satisfy_every_constraint_of_a_parameter() {
    let catalog = TypeCatalog::builder()
        .class("Root")
        .interface("IMark")
        .define(TypeDefinition::class("Mid").with_base("Root").implementing("IMark"))
        .class_extending("Parent", "Mid")
        .class_extending("Child", "Parent")
        .generic_interface(
            "IC",
            [GenericParameter::covariant("T")
                .constrained_to("Root")
                .constrained_to("IMark")],
        )
        .build()
        .unwrap();
    let container = Container::builder()
        .add_handler(Lifetime::Transient, [generic("IC", &["Mid"])], |_| Ok(HandlerA))
        .add_handler(Lifetime::Transient, [generic("IC", &["Root"])], |_| Ok(HandlerB))
        .add_handler(Lifetime::Transient, [generic("IC", &["IMark"])], |_| Ok(HandlerC))
        .build();
    let activator = ContainerHandlerActivator::new(Arc::new(container), Arc::new(catalog));

    let handlers = resolve(&activator, &TestMessage::of(generic("IC", &["Child"]))).await;
    assert_eq!(implementation_names(&handlers), vec!["HandlerA"]);
}

#[tokio::test]
async fn double_covariance_matches_every_widened_combination() {
    let activator = activator(
        Container::builder()
            .add_handler(
                Lifetime::Transient,
                [generic("IDoubleCovariant", &["Parent", "Child"])],
                |_| Ok(HandlerA),
            )
            .add_handler(
                Lifetime::Transient,
                [generic("IDoubleCovariant", &["Parent", "Parent"])],
                |_| Ok(HandlerB),
            )
            .add_handler(
                Lifetime::Transient,
                [generic("IDoubleCovariant", &["Child", "Parent"])],
                |_| Ok(HandlerC),
            ),
    );

    let message = TestMessage::of(generic("IDoubleCovariant", &["Child", "Child"]));
    assert_eq!(
        implementation_names(&resolve(&activator, &message).await),
        vec!["HandlerC", "HandlerA", "HandlerB"]
    );

    let narrow = TestMessage::of(generic("IDoubleCovariant", &["Parent", "Child"]));
    assert_eq!(implementation_names(&resolve(&activator, &narrow).await), vec!["HandlerA", "HandlerB"]);
}

#[tokio::test]
async fn one_implementation_under_two_interfaces_resolves_once() {
    let activator = activator(Container::builder().add_handler(
        Lifetime::Transient,
        [named("Parent"), named("Child"), named("IAuditable")],
        |_| Ok(HandlerA),
    ));

    let handlers = resolve(&activator, &TestMessage::named("Child")).await;
    assert_eq!(handlers.len(), 1);
    assert!(handlers[0].is::<HandlerA>());
}

#[tokio::test]
async fn distinct_registrations_of_one_implementation_collapse() {
    let activator = activator(
        Container::builder()
            .add_handler_instance(Arc::new(HandlerA), [named("Parent")])
            .add_handler_instance(Arc::new(HandlerA), [named("Child")]),
    );

    let handlers = resolve(&activator, &TestMessage::named("Child")).await;
    assert_eq!(handlers.len(), 1);
}

#[tokio::test]
async fn redelivered_messages_reach_wrapper_handlers_only() {
    let activator = activator(
        Container::builder()
            .add_handler(Lifetime::Transient, [named("Child")], |_| Ok(ChildHandler))
            .add_handler(
                Lifetime::Transient,
                [generic("Failed", &["Parent"])],
                |_| Ok(FailedParentHandler),
            )
            .add_handler(
                Lifetime::Transient,
                [generic("Failed", &["Child"])],
                |_| Ok(FailedChildHandler),
            )
            .add_handler(
                Lifetime::Transient,
                [generic("Failed", &["Unrelated"])],
                |_| Ok(UnrelatedHandler),
            ),
    );

    let original: Arc<dyn Message> = Arc::new(TestMessage::named("Child").with_body("order 42"));
    let failed = FailedMessage::new("Failed", original, "handler threw")
        .with_exception("timeout talking to the warehouse");

    assert_eq!(failed.message_type(), generic("Failed", &["Child"]));
    let handlers = resolve(&activator, &failed).await;
    assert_eq!(
        implementation_names(&handlers),
        vec!["FailedChildHandler", "FailedParentHandler"]
    );

    let bare = resolve(&activator, &TestMessage::named("Child")).await;
    assert_eq!(implementation_names(&bare), vec!["ChildHandler"]);
}

#[tokio::test]
async fn failed_message_keeps_the_original_payload() {
    let original: Arc<dyn Message> = Arc::new(TestMessage::named("Parent").with_body("payload"));
    let failed = FailedMessage::new("Failed", original, "boom");

    let inner = failed
        .original()
        .downcast_ref::<TestMessage>()
        .expect("original is a test message");
    assert_eq!(inner.body, "payload");
    assert_eq!(failed.error_description(), "boom");
}

#[tokio::test]
async fn message_without_handlers_resolves_to_nothing() {
    let activator = activator(
        Container::builder().add_handler(Lifetime::Transient, [named("Parent")], |_| Ok(HandlerA)),
    );

    let handlers = resolve(&activator, &TestMessage::named("Unrelated")).await;
    assert!(handlers.is_empty());
}

#[tokio::test]
async fn undeclared_message_type_is_a_malformed_declaration() {
    let activator = activator(Container::builder());
    let unit_of_work = UnitOfWork::new();

    let error = activator
        .get_handlers(&TestMessage::of(TypeRef::named("Ghost")), &unit_of_work)
        .await
        .unwrap_err();
    assert!(matches!(error, ResolutionError::MalformedDeclaration { .. }));
    assert!(!error.is_cancellation());
    assert!(activator.target_cache().is_empty());
}

#[tokio::test]
async fn resolution_results_are_cached_per_message_type() {
    let activator = activator(
        Container::builder().add_handler(Lifetime::Transient, [named("Parent")], |_| Ok(HandlerA)),
    );

    for _ in 0..3 {
        resolve(&activator, &TestMessage::named("Child")).await;
    }
    resolve(&activator, &TestMessage::named("Parent")).await;

    let stats = activator.target_cache().stats();
    assert_eq!(stats.cached_message_types, 2);
    assert_eq!(stats.message_types, vec!["Child", "Parent"]);
}
