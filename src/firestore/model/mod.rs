mod document_key;
mod field_path;
mod resource_path;
mod timestamp;

pub use document_key::DocumentKey;
pub use field_path::{FieldPath, IntoFieldPath};
pub use resource_path::ResourcePath;
pub use timestamp::Timestamp;
