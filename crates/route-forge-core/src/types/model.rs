use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::SchemaError;

use super::attribute::{AttributeDefinition, AttributeKind, RawAttribute};
use super::field_name::FieldName;
use super::model_name::ModelName;
use super::roles::Roles;
use super::verb::Verb;

/// Field key used when upload support is declared as `true`.
pub const DEFAULT_UPLOAD_FIELD: &str = "file";

/// Whether a model accepts file uploads, and which attribute records the
/// stored location.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum UploadSupport {
    #[default]
    Disabled,
    Field(FieldName),
}

impl UploadSupport {
    pub fn field(&self) -> Option<&FieldName> {
        match self {
            Self::Disabled => None,
            Self::Field(f) => Some(f),
        }
    }

    pub fn is_disabled(&self) -> bool {
        matches!(self, Self::Disabled)
    }
}

impl Serialize for UploadSupport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Disabled => serializer.serialize_bool(false),
            Self::Field(f) if f.as_str() == DEFAULT_UPLOAD_FIELD => serializer.serialize_bool(true),
            Self::Field(f) => serializer.serialize_str(f.as_str()),
        }
    }
}

impl<'de> Deserialize<'de> for UploadSupport {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Flag(bool),
            Field(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Flag(false) => Ok(Self::Disabled),
            Raw::Flag(true) => Ok(Self::Field(
                FieldName::new(DEFAULT_UPLOAD_FIELD).map_err(serde::de::Error::custom)?,
            )),
            Raw::Field(s) if s.is_empty() => {
                Err(serde::de::Error::custom(SchemaError::EmptyUploadField))
            }
            Raw::Field(s) => FieldName::new(s)
                .map(Self::Field)
                .map_err(serde::de::Error::custom),
        }
    }
}

/// Documentation overrides for one verb of one model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerbMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

/// Schema and routing metadata for one resource type.
///
/// Built once through [`ModelDescriptor::builder`] or deserialization and
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawModel", into = "RawModel")]
pub struct ModelDescriptor {
    name: ModelName,
    attributes: Vec<(FieldName, AttributeDefinition)>,
    roles: Roles,
    routable: bool,
    junction: bool,
    upload: UploadSupport,
    verbs: BTreeMap<Verb, bool>,
    metadata: BTreeMap<Verb, VerbMetadata>,
}

impl ModelDescriptor {
    pub fn builder(name: ModelName) -> ModelDescriptorBuilder {
        ModelDescriptorBuilder {
            name,
            attributes: Vec::new(),
            roles: Roles::default(),
            routable: true,
            junction: false,
            upload: UploadSupport::Disabled,
            verbs: BTreeMap::new(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &ModelName {
        &self.name
    }

    /// Attributes in declaration order.
    pub fn attributes(&self) -> impl Iterator<Item = (&FieldName, &AttributeDefinition)> {
        self.attributes.iter().map(|(n, a)| (n, a))
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeDefinition> {
        self.attributes
            .iter()
            .find(|(n, _)| n.as_str() == name)
            .map(|(_, a)| a)
    }

    pub fn roles(&self) -> &Roles {
        &self.roles
    }

    /// False for models that must never get generated routes, including
    /// junction tables.
    pub fn is_routable(&self) -> bool {
        self.routable && !self.junction
    }

    pub fn is_junction(&self) -> bool {
        self.junction
    }

    pub fn upload(&self) -> &UploadSupport {
        &self.upload
    }

    /// Whether routes for `verb` should be generated. `Upload` additionally
    /// requires upload support.
    pub fn verb_enabled(&self, verb: Verb) -> bool {
        if verb == Verb::Upload && self.upload.is_disabled() {
            return false;
        }
        self.verbs.get(&verb).copied().unwrap_or(true)
    }

    pub fn enabled_verbs(&self) -> impl Iterator<Item = Verb> + '_ {
        Verb::ALL.into_iter().filter(|v| self.verb_enabled(*v))
    }

    pub fn metadata(&self, verb: Verb) -> Option<&VerbMetadata> {
        self.metadata.get(&verb)
    }
}

impl fmt::Display for ModelDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "model {} {{", self.name)?;
        for (name, attr) in &self.attributes {
            let required = if attr.required { " required" } else { "" };
            match &attr.kind {
                AttributeKind::Scalar(ft) => writeln!(f, "  {name}: {ft}{required}")?,
                AttributeKind::Relation(r) => writeln!(f, "  {name}: {r}{required}")?,
            }
        }
        write!(f, "}}")
    }
}

/// Accumulates a model definition; validation happens in [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct ModelDescriptorBuilder {
    name: ModelName,
    attributes: Vec<(String, AttributeDefinition)>,
    roles: Roles,
    routable: bool,
    junction: bool,
    upload: UploadSupport,
    verbs: BTreeMap<Verb, bool>,
    metadata: BTreeMap<Verb, VerbMetadata>,
}

impl ModelDescriptorBuilder {
    pub fn attribute(mut self, name: impl Into<String>, attr: AttributeDefinition) -> Self {
        self.attributes.push((name.into(), attr));
        self
    }

    pub fn roles(mut self, roles: Roles) -> Self {
        self.roles = roles;
        self
    }

    pub fn routable(mut self, routable: bool) -> Self {
        self.routable = routable;
        self
    }

    pub fn junction(mut self, junction: bool) -> Self {
        self.junction = junction;
        self
    }

    pub fn upload(mut self, upload: UploadSupport) -> Self {
        self.upload = upload;
        self
    }

    /// Enables upload support storing the location under `"file"`.
    pub fn with_upload(self) -> Self {
        match FieldName::new(DEFAULT_UPLOAD_FIELD) {
            Ok(field) => self.upload(UploadSupport::Field(field)),
            Err(_) => self,
        }
    }

    pub fn verb(mut self, verb: Verb, enabled: bool) -> Self {
        self.verbs.insert(verb, enabled);
        self
    }

    pub fn describe(mut self, verb: Verb, metadata: VerbMetadata) -> Self {
        self.metadata.insert(verb, metadata);
        self
    }

    pub fn build(self) -> Result<ModelDescriptor, SchemaError> {
        let mut seen = HashSet::with_capacity(self.attributes.len());
        let mut attributes = Vec::with_capacity(self.attributes.len());
        for (name, attr) in self.attributes {
            if !seen.insert(name.clone()) {
                return Err(SchemaError::DuplicateFieldName(name));
            }
            attributes.push((FieldName::new(name)?, attr));
        }
        tracing::trace!(
            model = %self.name,
            attributes = attributes.len(),
            "model descriptor built"
        );
        Ok(ModelDescriptor {
            name: self.name,
            attributes,
            roles: self.roles,
            routable: self.routable,
            junction: self.junction,
            upload: self.upload,
            verbs: self.verbs,
            metadata: self.metadata,
        })
    }
}

fn default_true() -> bool {
    true
}

fn is_true(b: &bool) -> bool {
    *b
}

fn is_false(b: &bool) -> bool {
    !*b
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawModel {
    name: ModelName,
    #[serde(default)]
    attributes: RawAttributes,
    #[serde(default, skip_serializing_if = "Roles::is_empty")]
    roles: Roles,
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    routable: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    junction: bool,
    #[serde(default, skip_serializing_if = "UploadSupport::is_disabled")]
    upload: UploadSupport,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    verbs: BTreeMap<Verb, bool>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    metadata: BTreeMap<Verb, VerbMetadata>,
}

impl TryFrom<RawModel> for ModelDescriptor {
    type Error = SchemaError;

    fn try_from(raw: RawModel) -> Result<Self, Self::Error> {
        let mut builder = ModelDescriptor::builder(raw.name)
            .roles(raw.roles)
            .routable(raw.routable)
            .junction(raw.junction)
            .upload(raw.upload);
        for (verb, enabled) in raw.verbs {
            builder = builder.verb(verb, enabled);
        }
        for (verb, meta) in raw.metadata {
            builder = builder.describe(verb, meta);
        }
        for (name, raw_attr) in raw.attributes.0 {
            let attr = AttributeDefinition::from_raw(&name, raw_attr)?;
            builder = builder.attribute(name, attr);
        }
        builder.build()
    }
}

impl From<ModelDescriptor> for RawModel {
    fn from(model: ModelDescriptor) -> Self {
        RawModel {
            attributes: RawAttributes(
                model
                    .attributes
                    .iter()
                    .map(|(n, a)| (n.as_str().to_string(), a.to_raw()))
                    .collect(),
            ),
            name: model.name,
            roles: model.roles,
            routable: model.routable,
            junction: model.junction,
            upload: model.upload,
            verbs: model.verbs,
            metadata: model.metadata,
        }
    }
}

/// Attribute table that keeps document order.
#[derive(Clone, Default)]
struct RawAttributes(Vec<(String, RawAttribute)>);

impl Serialize for RawAttributes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, attr) in &self.0 {
            map.serialize_entry(name, attr)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for RawAttributes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedVisitor;

        impl<'de> Visitor<'de> for OrderedVisitor {
            type Value = RawAttributes;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a table of attribute definitions")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, attr)) = access.next_entry::<String, RawAttribute>()? {
                    entries.push((name, attr));
                }
                Ok(RawAttributes(entries))
            }
        }

        deserializer.deserialize_map(OrderedVisitor)
    }
}
