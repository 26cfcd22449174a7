//! Task kinds: the closed set of things the assistant can be asked to do.
//!
//! Adding a kind means adding a variant here and a template in the registry.
//! Arbitrary strings are never accepted: parsing an unknown name fails with
//! [`AssistantError::UnknownTaskKind`].

use serde::{Deserialize, Serialize};

use crate::error::AssistantError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskKind {
    /// Marketing copy for a single property record
    GenerateListingDescription,
    /// Digest of a batch of customer inquiries
    SummarizeInquiries,
    /// Free-text developer request
    DevHelper,
    /// Threat review of a log excerpt
    DetectSecurityRisks,
    /// Product roadmap ideas; takes no input
    RoadmapSuggestion,
}

impl TaskKind {
    pub const ALL: [TaskKind; 5] = [
        TaskKind::GenerateListingDescription,
        TaskKind::SummarizeInquiries,
        TaskKind::DevHelper,
        TaskKind::DetectSecurityRisks,
        TaskKind::RoadmapSuggestion,
    ];

    /// Wire name, e.g. `generate-listing-description`.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::GenerateListingDescription => "generate-listing-description",
            TaskKind::SummarizeInquiries => "summarize-inquiries",
            TaskKind::DevHelper => "dev-helper",
            TaskKind::DetectSecurityRisks => "detect-security-risks",
            TaskKind::RoadmapSuggestion => "roadmap-suggestion",
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskKind {
    type Err = AssistantError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        TaskKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| AssistantError::UnknownTaskKind(s.to_string()))
    }
}
