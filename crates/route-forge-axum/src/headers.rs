//! Header rules applied to every generated route.

use std::collections::BTreeMap;

use axum::http::HeaderMap;
use route_forge_core::schema::{ObjectSchema, Schema};
use route_forge_core::types::TextConstraints;

/// Constraint on a single request header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderRule {
    pub required: bool,
    /// Accepted values; empty means any value.
    pub valid: Vec<String>,
    /// Value the flow runner sends when synthesizing requests.
    pub default: Option<String>,
    pub description: Option<String>,
}

impl HeaderRule {
    pub fn optional() -> Self {
        Self::default()
    }

    pub fn required() -> Self {
        Self {
            required: true,
            ..Self::default()
        }
    }

    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn with_valid<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.valid = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Registry of header name to rule. Names are matched case-insensitively;
/// the spelling first given is kept for display.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderValidator {
    rules: BTreeMap<String, (String, HeaderRule)>,
}

impl HeaderValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validator holding the `accept` and `content-type` rules every server
    /// starts with.
    pub fn with_defaults() -> Self {
        let mut headers = Self::new();
        headers.set(
            "accept",
            HeaderRule::optional()
                .with_default("application/json")
                .describe("Response content type"),
        );
        headers.set(
            "content-type",
            HeaderRule::optional()
                .with_default("application/json")
                .describe("Request payload content type"),
        );
        headers
    }

    /// Stores `rule`, silently replacing any rule with the same name.
    pub fn set(&mut self, name: &str, rule: HeaderRule) -> &mut Self {
        self.rules
            .insert(name.to_ascii_lowercase(), (name.to_string(), rule));
        self
    }

    pub fn get(&self, name: &str) -> Option<&HeaderRule> {
        self.rules
            .get(&name.to_ascii_lowercase())
            .map(|(_, rule)| rule)
    }

    /// Removes a rule; no-op when absent.
    pub fn delete(&mut self, name: &str) -> &mut Self {
        self.rules.remove(&name.to_ascii_lowercase());
        self
    }

    /// Every rule keyed by the name as originally given.
    pub fn all(&self) -> BTreeMap<String, HeaderRule> {
        self.rules
            .values()
            .map(|(display, rule)| (display.clone(), rule.clone()))
            .collect()
    }

    /// Lowercase header name to declared default value.
    pub fn defaults(&self) -> BTreeMap<String, String> {
        self.rules
            .iter()
            .filter_map(|(name, (_, rule))| rule.default.clone().map(|d| (name.clone(), d)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Checks `headers` against every rule. Headers without a rule are
    /// always permitted.
    pub fn check(&self, headers: &HeaderMap) -> Result<(), Vec<String>> {
        let mut violations = Vec::new();
        for (name, (display, rule)) in &self.rules {
            match headers.get(name.as_str()) {
                None if rule.required => {
                    violations.push(format!("header '{display}' is required"));
                }
                None => {}
                Some(value) if !rule.valid.is_empty() => {
                    let accepted = value
                        .to_str()
                        .map(|v| rule.valid.iter().any(|ok| ok.eq_ignore_ascii_case(v.trim())))
                        .unwrap_or(false);
                    if !accepted {
                        violations.push(format!(
                            "header '{display}' must be one of [{}]",
                            rule.valid.join(", ")
                        ));
                    }
                }
                Some(_) => {}
            }
        }
        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }

    /// The rules as an open object schema, for route documentation.
    pub fn to_schema(&self) -> Schema {
        let mut object = ObjectSchema::open();
        for (name, (_, rule)) in &self.rules {
            let schema = Schema::String {
                constraints: TextConstraints::unconstrained(),
                valid: rule.valid.clone(),
            };
            object = object.property(name.clone(), schema, rule.required);
            if let Some(desc) = &rule.description {
                object = object.describe(name, desc.clone());
            }
        }
        Schema::Object(object)
    }
}
