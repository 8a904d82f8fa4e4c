pub mod auth;
pub mod error;
pub mod memory;
pub mod record;
pub mod storage;
pub mod traits;

pub use auth::{AuthContext, AuthError};
pub use error::BackendError;
pub use memory::MemoryStore;
pub use record::{Criteria, QueryResult, Record, UpdateMode};
pub use storage::DirectoryStorage;
pub use traits::{FileStorage, ModelStore};
