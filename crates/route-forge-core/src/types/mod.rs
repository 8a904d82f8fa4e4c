pub mod attribute;
pub mod field_name;
pub mod field_type;
pub mod integer_constraints;
pub mod model;
pub mod model_name;
pub mod relation;
pub mod roles;
pub mod text_constraints;
pub mod verb;

pub use attribute::{AttributeDefinition, AttributeKind};
pub use field_name::FieldName;
pub use field_type::FieldType;
pub use integer_constraints::IntegerConstraints;
pub use model::{
    ModelDescriptor, ModelDescriptorBuilder, UploadSupport, VerbMetadata, DEFAULT_UPLOAD_FIELD,
};
pub use model_name::ModelName;
pub use relation::Relation;
pub use roles::Roles;
pub use text_constraints::TextConstraints;
pub use verb::Verb;
