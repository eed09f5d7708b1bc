//! # Messaging
//!
//! Message and handler abstractions shared by resolution and dispatch.

pub mod handler;
pub mod message;

pub use handler::{HandleMessages, HandlerInstance, HandlerInterface, Implementation};
pub use message::{FailedMessage, Message};
