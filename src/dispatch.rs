//! # In-Process Dispatch
//!
//! Minimal invoker that drives one message through handler resolution and handler
//! execution within a unit of work.
//!
//! Ordering guarantees:
//! 1. Handlers run one after another, in resolution order.
//! 2. The first handler failure stops the remaining handlers.
//! 3. The unit of work completes (disposing its scope) after every invoked handler
//!    has finished and before `dispatch` returns, on success and on failure alike.
//! 4. A handler's own error is returned to the caller unchanged.
//!
//! Retries, dead-lettering and transport concerns belong to the caller.

use crate::error::DispatchError;
use crate::messaging::{HandlerInstance, Message};
use crate::resolution::HandlerActivator;
use crate::unit_of_work::{Outcome, UnitOfWork};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, warn};
use uuid::Uuid;

/// What a successful dispatch did
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchReport {
    pub unit_of_work_id: Uuid,
    pub handlers_invoked: usize,
    pub implementations: Vec<String>,
}

impl DispatchReport {
    /// True when no handler matched the message
    pub fn is_noop(&self) -> bool {
        self.handlers_invoked == 0
    }
}

pub struct MessageDispatcher {
    activator: Arc<dyn HandlerActivator>,
}

impl MessageDispatcher {
    pub fn new(activator: Arc<dyn HandlerActivator>) -> Self {
        Self { activator }
    }

    pub fn activator(&self) -> &Arc<dyn HandlerActivator> {
        &self.activator
    }

    /// Resolve and invoke every handler for `message`, then complete `unit_of_work`
    pub async fn dispatch(
        &self,
        message: &dyn Message,
        unit_of_work: &UnitOfWork,
    ) -> Result<DispatchReport, DispatchError> {
        let handlers = match self.activator.get_handlers(message, unit_of_work).await {
            Ok(handlers) => handlers,
            Err(resolution_error) => {
                let outcome = if resolution_error.is_cancellation() {
                    warn!(unit_of_work_id = %unit_of_work.id(), "Dispatch cancelled by shutdown");
                    Outcome::Abandoned
                } else {
                    Outcome::Failed(resolution_error.to_string())
                };
                unit_of_work.complete(outcome);
                return Err(resolution_error.into());
            }
        };

        let result = invoke_in_order(message, &handlers).await;

        match &result {
            Ok(_) => {
                unit_of_work.complete(Outcome::Succeeded);
            }
            Err(failure) => {
                error!(
                    unit_of_work_id = %unit_of_work.id(),
                    message_type = %message.message_type(),
                    error = %failure,
                    "Message dispatch failed"
                );
                unit_of_work.complete(Outcome::Failed(failure.to_string()));
            }
        }

        let implementations = result?;
        Ok(DispatchReport {
            unit_of_work_id: unit_of_work.id(),
            handlers_invoked: implementations.len(),
            implementations,
        })
    }
}

async fn invoke_in_order(
    message: &dyn Message,
    handlers: &[HandlerInstance],
) -> Result<Vec<String>, DispatchError> {
    let mut invoked = Vec::with_capacity(handlers.len());
    for handler in handlers {
        let implementation = handler.implementation().type_name();
        debug!(implementation, "Invoking handler");
        handler
            .handle(message)
            .await
            .map_err(|source| DispatchError::Handler {
                implementation,
                source,
            })?;
        invoked.push(implementation.to_string());
    }
    Ok(invoked)
}

impl std::fmt::Debug for MessageDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageDispatcher").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{Container, Lifetime};
    use crate::messaging::HandleMessages;
    use crate::resolution::ContainerHandlerActivator;
    use crate::types::{TypeCatalog, TypeRef};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::any::Any;

    struct Ping;

    impl Message for Ping {
        fn message_type(&self) -> TypeRef {
            TypeRef::named("Ping")
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[derive(Debug, thiserror::Error)]
    #[error("pong refused")]
    struct Refused;

    struct Recorder {
        name: &'static str,
        fail: bool,
        calls: Arc<Mutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl HandleMessages for Recorder {
        async fn handle(&self, _message: &dyn Message) -> anyhow::Result<()> {
            self.calls.lock().push(self.name);
            if self.fail {
                return Err(Refused.into());
            }
            Ok(())
        }
    }

    struct Second(Recorder);

    #[async_trait]
    impl HandleMessages for Second {
        async fn handle(&self, message: &dyn Message) -> anyhow::Result<()> {
            self.0.handle(message).await
        }
    }

    fn dispatcher(first_fails: bool, calls: Arc<Mutex<Vec<&'static str>>>) -> MessageDispatcher {
        let catalog = TypeCatalog::builder().class("Ping").build().unwrap();
        let first_calls = calls.clone();
        let container = Container::builder()
            .add_handler(Lifetime::Transient, [TypeRef::named("Ping")], move |_| {
                Ok(Recorder {
                    name: "first",
                    fail: first_fails,
                    calls: first_calls.clone(),
                })
            })
            .add_handler(Lifetime::Transient, [TypeRef::named("Ping")], move |_| {
                Ok(Second(Recorder {
                    name: "second",
                    fail: false,
                    calls: calls.clone(),
                }))
            })
            .build();
        let activator = ContainerHandlerActivator::new(Arc::new(container), Arc::new(catalog));
        MessageDispatcher::new(Arc::new(activator))
    }

    #[tokio::test]
    async fn handlers_run_in_order_and_complete_the_unit_of_work() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let dispatcher = dispatcher(false, calls.clone());
        let unit_of_work = UnitOfWork::new();

        let report = dispatcher.dispatch(&Ping, &unit_of_work).await.unwrap();

        assert_eq!(report.handlers_invoked, 2);
        assert_eq!(report.unit_of_work_id, unit_of_work.id());
        assert_eq!(*calls.lock(), vec!["first", "second"]);
        assert_eq!(unit_of_work.outcome(), Some(Outcome::Succeeded));
    }

    #[tokio::test]
    async fn first_failure_stops_dispatch_and_keeps_the_error() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let dispatcher = dispatcher(true, calls.clone());
        let unit_of_work = UnitOfWork::new();

        let error = dispatcher.dispatch(&Ping, &unit_of_work).await.unwrap_err();

        let DispatchError::Handler { source, .. } = error else {
            panic!("expected a handler failure");
        };
        assert!(source.downcast_ref::<Refused>().is_some());
        assert_eq!(*calls.lock(), vec!["first"]);
        assert!(matches!(unit_of_work.outcome(), Some(Outcome::Failed(_))));
    }
}
