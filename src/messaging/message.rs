//! Inbound messages and the redelivery envelope.

use crate::types::TypeRef;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// An inbound message that knows its own concrete runtime type
pub trait Message: Send + Sync + 'static {
    /// The concrete type handlers are matched against
    fn message_type(&self) -> TypeRef;

    fn as_any(&self) -> &dyn Any;
}

impl dyn Message {
    pub fn downcast_ref<T: Message>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn is<T: Message>(&self) -> bool {
        self.as_any().is::<T>()
    }
}

impl fmt::Debug for dyn Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Message<{}>", self.message_type())
    }
}

/// A message whose delivery failed, handed back to the handlers that declared
/// themselves against the redelivery wrapper.
///
/// Its type is `Wrapper<original type>`, so it only matches handlers declared for
/// the wrapper, never bare handlers of the original message.
#[derive(Clone)]
pub struct FailedMessage {
    wrapper: Arc<str>,
    original: Arc<dyn Message>,
    error_description: String,
    headers: HashMap<String, String>,
    exceptions: Vec<String>,
}

impl FailedMessage {
    pub fn new(
        wrapper: impl Into<Arc<str>>,
        original: Arc<dyn Message>,
        error_description: impl Into<String>,
    ) -> Self {
        Self {
            wrapper: wrapper.into(),
            original,
            error_description: error_description.into(),
            headers: HashMap::new(),
            exceptions: Vec::new(),
        }
    }

    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_exception(mut self, description: impl Into<String>) -> Self {
        self.exceptions.push(description.into());
        self
    }

    pub fn original(&self) -> &Arc<dyn Message> {
        &self.original
    }

    pub fn error_description(&self) -> &str {
        &self.error_description
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    pub fn exceptions(&self) -> &[String] {
        &self.exceptions
    }
}

impl Message for FailedMessage {
    fn message_type(&self) -> TypeRef {
        TypeRef::generic(self.wrapper.clone(), [self.original.message_type()])
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Debug for FailedMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FailedMessage")
            .field("message_type", &self.message_type())
            .field("error_description", &self.error_description)
            .field("exceptions", &self.exceptions.len())
            .finish()
    }
}
