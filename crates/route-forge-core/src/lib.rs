pub mod error;
pub mod schema;
pub mod types;

pub use error::SchemaError;
pub use schema::{ObjectSchema, Property, Schema, Violation};
pub use types::{ModelDescriptor, ModelName, Verb};
