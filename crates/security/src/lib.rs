//! Security module for PropDesk: role-based access gating, identity
//! resolution, and audit logging.
//!
//! Provides:
//! - **Gate**: Pure permit/deny decision over a caller and allowed roles
//! - **Policy**: The resource → allowed-roles table, validated at startup
//! - **Guard**: Identity resolution + gate + render, with timeout and cancellation
//! - **Identity**: A static bearer-token identity provider for development
//! - **Audit logging**: Structured security event logging

pub mod audit;
pub mod gate;
pub mod guard;
pub mod identity;
pub mod policy;

pub use audit::{AuditEntry, AuditEvent, AuditLogger, AuditOutcome, AuditSink, TracingSink};
pub use gate::{AccessGate, Decision};
pub use guard::{AccessGuard, Guarded};
pub use identity::StaticIdentityProvider;
pub use policy::{AccessPolicyError, AccessTable, AllowedRoles};
