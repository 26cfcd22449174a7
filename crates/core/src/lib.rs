//! # PropDesk Core
//!
//! Domain types, traits, and error definitions shared by the admin and client
//! surfaces. This crate has **no framework dependencies**: it defines the
//! model that the security, assistant, and provider crates implement against.
//!
//! ## Boundaries
//!
//! Two external collaborators are modelled as traits here:
//! - [`IdentityProvider`] resolves the current [`Caller`] from credentials
//! - [`Provider`] turns one rendered prompt into generated text
//!
//! Everything else depends inward on these definitions, so tests can swap in
//! deterministic mocks for both.

pub mod caller;
pub mod context;
pub mod error;
pub mod identity;
pub mod provider;
pub mod task;

// Re-export key types at crate root for ergonomics
pub use caller::{Caller, RoleLabel, RoleSet, SessionId};
pub use context::OperatingContext;
pub use error::{AssistantError, DenyReason, Error, IdentityError, ProviderError};
pub use identity::{Credentials, IdentityProvider};
pub use provider::{GenerationRequest, GenerationResponse, Provider, Usage};
pub use task::TaskKind;
