//! Prompt template registry.
//!
//! Maps every [`TaskKind`] to a pure rendering function. The registry is
//! built once, never mutated afterwards, and shared between requests behind
//! an `Arc`. Input is interpolated verbatim.

use propdesk_core::{AssistantError, TaskKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Free-form input supplied with an assistant request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StructuredInput(pub Value);

impl StructuredInput {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// A bare string input.
    pub fn text(s: impl Into<String>) -> Self {
        Self(Value::String(s.into()))
    }

    /// Compact JSON with object keys in the order the caller supplied them,
    /// e.g. `{"address":"1 Main St"}`.
    pub fn to_json(&self) -> String {
        self.0.to_string()
    }

    /// Strings verbatim, `null` as empty, anything else as compact JSON.
    pub fn to_text(&self) -> String {
        match &self.0 {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }

    pub fn value(&self) -> &Value {
        &self.0
    }
}

impl From<Value> for StructuredInput {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// A pure prompt renderer.
pub type PromptTemplate = fn(&StructuredInput) -> String;

const ROADMAP_PROMPT: &str =
    "Suggest the next features to build for a real estate listing platform, ordered by impact.";

fn listing_description(input: &StructuredInput) -> String {
    format!("Write a beautiful listing description for: {}", input.to_json())
}

fn summarize_inquiries(input: &StructuredInput) -> String {
    format!(
        "Summarize these inquiries and suggest next steps: {}",
        input.to_json()
    )
}

fn dev_helper(input: &StructuredInput) -> String {
    format!(
        "You are an AI developer assistant. Task: \"{}\". Suggest files or code.",
        input.to_text()
    )
}

fn detect_security_risks(input: &StructuredInput) -> String {
    format!(
        "Analyze these logs and identify any security threats: {}",
        input.to_text()
    )
}

fn roadmap_suggestion(_input: &StructuredInput) -> String {
    ROADMAP_PROMPT.to_string()
}

/// Task kind → template.
#[derive(Debug, Clone, Default)]
pub struct PromptRegistry {
    templates: BTreeMap<TaskKind, PromptTemplate>,
}

impl PromptRegistry {
    /// A registry with no templates.
    pub fn empty() -> Self {
        Self::default()
    }

    /// One template for every task kind.
    pub fn standard() -> Self {
        Self::empty()
            .register(TaskKind::GenerateListingDescription, listing_description)
            .register(TaskKind::SummarizeInquiries, summarize_inquiries)
            .register(TaskKind::DevHelper, dev_helper)
            .register(TaskKind::DetectSecurityRisks, detect_security_risks)
            .register(TaskKind::RoadmapSuggestion, roadmap_suggestion)
    }

    /// Add or replace the template for `kind`.
    pub fn register(mut self, kind: TaskKind, template: PromptTemplate) -> Self {
        self.templates.insert(kind, template);
        self
    }

    pub fn contains(&self, kind: TaskKind) -> bool {
        self.templates.contains_key(&kind)
    }

    /// Registered kinds in wire-name order.
    pub fn kinds(&self) -> impl Iterator<Item = TaskKind> + '_ {
        self.templates.keys().copied()
    }

    pub fn render(&self, kind: TaskKind, input: &StructuredInput) -> Result<String, AssistantError> {
        let template = self
            .templates
            .get(&kind)
            .ok_or_else(|| AssistantError::UnknownTaskKind(kind.as_str().to_string()))?;
        Ok(template(input))
    }

    /// Parse the wire name, then render.
    pub fn render_named(&self, kind: &str, input: &StructuredInput) -> Result<String, AssistantError> {
        self.render(kind.parse()?, input)
    }
}
