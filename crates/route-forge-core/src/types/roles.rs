use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

use super::verb::Verb;

/// Key that addresses the model-wide role set inside a role map.
pub const MODEL_WIDE_KEY: &str = "*";

/// Role sets declared on a model.
///
/// Written either as a flat list (`roles = ["admin"]`, model-wide) or as a
/// map keyed by verb (`roles = { get = ["admin"], "*" = ["user"] }`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRoles", into = "RawRoles")]
pub struct Roles {
    model_wide: Vec<String>,
    per_verb: BTreeMap<Verb, Vec<String>>,
}

impl Roles {
    pub fn model_wide(roles: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            model_wide: roles.into_iter().map(Into::into).collect(),
            per_verb: BTreeMap::new(),
        }
    }

    pub fn with_verb(mut self, verb: Verb, roles: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.per_verb
            .insert(verb, roles.into_iter().map(Into::into).collect());
        self
    }

    /// The model-wide set; empty when none was declared.
    pub fn model_wide_roles(&self) -> &[String] {
        &self.model_wide
    }

    /// The set declared for `verb`, if any. An explicitly empty list is
    /// returned as `Some(&[])` and lifts any restriction for that verb.
    pub fn for_verb(&self, verb: Verb) -> Option<&[String]> {
        self.per_verb.get(&verb).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.model_wide.is_empty() && self.per_verb.is_empty()
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawRoles {
    List(Vec<String>),
    Map(BTreeMap<String, Vec<String>>),
}

impl TryFrom<RawRoles> for Roles {
    type Error = SchemaError;

    fn try_from(raw: RawRoles) -> Result<Self, Self::Error> {
        match raw {
            RawRoles::List(list) => Ok(Self::model_wide(list)),
            RawRoles::Map(map) => {
                let mut roles = Roles::default();
                for (key, set) in map {
                    if key == MODEL_WIDE_KEY {
                        roles.model_wide = set;
                    } else {
                        roles.per_verb.insert(key.parse()?, set);
                    }
                }
                Ok(roles)
            }
        }
    }
}

impl From<Roles> for RawRoles {
    fn from(roles: Roles) -> Self {
        if roles.per_verb.is_empty() {
            return RawRoles::List(roles.model_wide);
        }
        let mut map: BTreeMap<String, Vec<String>> = roles
            .per_verb
            .into_iter()
            .map(|(verb, set)| (verb.as_str().to_string(), set))
            .collect();
        if !roles.model_wide.is_empty() {
            map.insert(MODEL_WIDE_KEY.to_string(), roles.model_wide);
        }
        RawRoles::Map(map)
    }
}
