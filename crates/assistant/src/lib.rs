//! # PropDesk Assistant
//!
//! The prompt template registry and the per-surface dispatcher that turns a
//! task kind plus structured input into generated text.

pub mod dispatcher;
pub mod templates;

pub use dispatcher::{AssistantReply, Dispatcher, DispatcherSettings, RetryPolicy};
pub use templates::{PromptRegistry, PromptTemplate, StructuredInput};
