//! The access gate: a pure decision over a caller and an allowed-role set.
//!
//! Rules:
//! - `Permit` iff the caller holds at least one allowed role
//! - no session at all → `Deny(NotAuthenticated)`
//! - a session without any overlapping role → `Deny(InsufficientRole)`
//!
//! An authenticated caller with an empty role set (e.g. a freshly registered
//! user) falls into the last rule.

use propdesk_core::{Caller, DenyReason};
use serde::{Deserialize, Serialize};

use crate::policy::AllowedRoles;

/// Outcome of one access evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", content = "reason", rename_all = "snake_case")]
pub enum Decision {
    Permit,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_permit(&self) -> bool {
        matches!(self, Decision::Permit)
    }
}

/// Stateless access gate.
pub struct AccessGate;

impl AccessGate {
    /// Decide whether `caller` may reach a resource guarded by `allowed`.
    ///
    /// Pure and idempotent: the same inputs always give the same decision.
    pub fn evaluate(caller: &Caller, allowed: &AllowedRoles) -> Decision {
        if caller.roles.intersects(allowed.roles()) {
            Decision::Permit
        } else if !caller.is_authenticated() {
            Decision::Deny(DenyReason::NotAuthenticated)
        } else {
            Decision::Deny(DenyReason::InsufficientRole)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use propdesk_core::{RoleSet, SessionId};

    fn staff() -> AllowedRoles {
        AllowedRoles::from_labels(["admin", "superadmin"]).unwrap()
    }

    fn caller_with(roles: &[&str]) -> Caller {
        Caller::authenticated(SessionId::new(), RoleSet::from_labels(roles))
    }

    #[test]
    fn client_denied_from_staff_resource() {
        let decision = AccessGate::evaluate(&caller_with(&["client"]), &staff());
        assert_eq!(decision, Decision::Deny(DenyReason::InsufficientRole));
    }

    #[test]
    fn admin_permitted_on_staff_resource() {
        let decision = AccessGate::evaluate(&caller_with(&["admin"]), &staff());
        assert_eq!(decision, Decision::Permit);
    }

    #[test]
    fn any_single_overlap_is_enough() {
        let decision = AccessGate::evaluate(&caller_with(&["client", "superadmin"]), &staff());
        assert!(decision.is_permit());
    }

    #[test]
    fn role_labels_match_case_insensitively() {
        let decision = AccessGate::evaluate(&caller_with(&[" Admin "]), &staff());
        assert_eq!(decision, Decision::Permit);
        let decision = AccessGate::evaluate(&caller_with(&["CLIENT"]), &staff());
        assert_eq!(decision, Decision::Deny(DenyReason::InsufficientRole));
    }

    #[test]
    fn anonymous_caller_not_authenticated() {
        let decision = AccessGate::evaluate(&Caller::anonymous(), &staff());
        assert_eq!(decision, Decision::Deny(DenyReason::NotAuthenticated));
    }

    #[test]
    fn authenticated_without_roles_is_insufficient() {
        let decision = AccessGate::evaluate(&caller_with(&[]), &staff());
        assert_eq!(decision, Decision::Deny(DenyReason::InsufficientRole));
    }

    #[test]
    fn empty_role_set_never_permitted() {
        let tables = [
            staff(),
            AllowedRoles::from_labels(["client"]).unwrap(),
            AllowedRoles::from_labels(["a", "b", "c", "client", "admin"]).unwrap(),
        ];
        for allowed in &tables {
            assert!(!AccessGate::evaluate(&Caller::anonymous(), allowed).is_permit());
            assert!(!AccessGate::evaluate(&caller_with(&[]), allowed).is_permit());
        }
    }

    #[test]
    fn permit_iff_intersection_over_combinations() {
        let universe = ["admin", "superadmin", "client", "agent"];
        // Every subset of the universe as the caller's roles, against every
        // non-empty subset as the allowed roles.
        for caller_mask in 0u8..16 {
            for allowed_mask in 1u8..16 {
                let pick = |mask: u8| -> Vec<&str> {
                    universe
                        .iter()
                        .enumerate()
                        .filter(|(i, _)| mask & (1 << i) != 0)
                        .map(|(_, r)| *r)
                        .collect()
                };
                let caller = caller_with(&pick(caller_mask));
                let allowed = AllowedRoles::from_labels(pick(allowed_mask)).unwrap();
                let expected = caller_mask & allowed_mask != 0;
                assert_eq!(AccessGate::evaluate(&caller, &allowed).is_permit(), expected);
            }
        }
    }

    #[test]
    fn evaluation_is_idempotent() {
        let caller = caller_with(&["client"]);
        let allowed = staff();
        let first = AccessGate::evaluate(&caller, &allowed);
        for _ in 0..3 {
            assert_eq!(AccessGate::evaluate(&caller, &allowed), first);
        }
    }

    #[test]
    fn decision_serializes_with_reason() {
        let json = serde_json::to_value(Decision::Deny(DenyReason::InsufficientRole)).unwrap();
        assert_eq!(json["decision"], "deny");
        assert_eq!(json["reason"], "insufficient_role");
        let json = serde_json::to_value(Decision::Permit).unwrap();
        assert_eq!(json["decision"], "permit");
    }
}
