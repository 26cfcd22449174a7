//! Caller and role domain types.
//!
//! A [`Caller`] is whoever is asking for a view or an assistant response:
//! an optional session plus a set of coarse-grained role labels. The identity
//! provider hands these out; the access gate only ever reads them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Opaque identifier for an authenticated session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A normalised role tag such as `admin` or `client`.
///
/// Labels are trimmed and lowercased so `" Admin "` and `"admin"` compare equal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoleLabel(String);

impl RoleLabel {
    /// Parse a label, returning `None` for blank input.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalised = raw.trim().to_lowercase();
        if normalised.is_empty() {
            None
        } else {
            Some(Self(normalised))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RoleLabel {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| "role label must not be blank".to_string())
    }
}

impl From<RoleLabel> for String {
    fn from(label: RoleLabel) -> Self {
        label.0
    }
}

impl std::fmt::Display for RoleLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A set of role labels. Order is irrelevant; only membership matters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleSet(BTreeSet<RoleLabel>);

impl RoleSet {
    pub fn new() -> Self {
        Self(BTreeSet::new())
    }

    /// Build a set from raw strings. Blank labels are dropped.
    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            labels
                .into_iter()
                .filter_map(|l| RoleLabel::parse(l.as_ref()))
                .collect(),
        )
    }

    pub fn insert(&mut self, label: RoleLabel) -> bool {
        self.0.insert(label)
    }

    pub fn contains(&self, label: &str) -> bool {
        RoleLabel::parse(label).is_some_and(|l| self.0.contains(&l))
    }

    /// True when at least one label is held by both sets.
    pub fn intersects(&self, other: &RoleSet) -> bool {
        self.0.iter().any(|l| other.0.contains(l))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RoleLabel> {
        self.0.iter()
    }
}

impl FromIterator<RoleLabel> for RoleSet {
    fn from_iter<T: IntoIterator<Item = RoleLabel>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl std::fmt::Display for RoleSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let labels: Vec<&str> = self.0.iter().map(RoleLabel::as_str).collect();
        write!(f, "{{{}}}", labels.join(", "))
    }
}

/// The entity requesting access or an assistant response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    /// Present only for authenticated callers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionId>,

    /// Stable subject identifier (user id, email) when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    /// Roles held by this caller
    #[serde(default)]
    pub roles: RoleSet,
}

impl Caller {
    /// A caller with no session and no roles.
    pub fn anonymous() -> Self {
        Self {
            session: None,
            subject: None,
            roles: RoleSet::new(),
        }
    }

    /// An authenticated caller holding the given roles.
    pub fn authenticated(session: SessionId, roles: RoleSet) -> Self {
        Self {
            session: Some(session),
            subject: None,
            roles,
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    /// Name used in logs and audit records.
    pub fn display_name(&self) -> &str {
        match (&self.subject, &self.session) {
            (Some(subject), _) => subject,
            (None, Some(session)) => &session.0,
            (None, None) => "anonymous",
        }
    }
}
