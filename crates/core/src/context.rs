//! Operating context: which surface a dispatcher or gateway serves.

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// The fixed deployment surface. Chosen at startup, never taken from caller input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatingContext {
    /// Staff back office
    Admin,
    /// Customer-facing app
    Client,
}

impl OperatingContext {
    pub const ALL: [OperatingContext; 2] = [OperatingContext::Admin, OperatingContext::Client];

    pub fn as_str(&self) -> &'static str {
        match self {
            OperatingContext::Admin => "admin",
            OperatingContext::Client => "client",
        }
    }

    /// Resource id of the assistant view on this surface, e.g. `admin.assistant`.
    pub fn assistant_resource(&self) -> String {
        format!("{}.assistant", self.as_str())
    }
}

impl std::fmt::Display for OperatingContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OperatingContext {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(OperatingContext::Admin),
            "client" => Ok(OperatingContext::Client),
            other => Err(Error::Config {
                message: format!("unknown operating context '{other}' (expected admin or client)"),
            }),
        }
    }
}
