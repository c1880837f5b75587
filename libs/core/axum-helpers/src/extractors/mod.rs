//! Custom Axum extractors.
//!
//! - [`ValidatedJson`]: JSON body extraction with automatic validation
//! - [`UuidPath`]: UUID path parameter with a structured 400 on parse failure

pub mod uuid_path;
pub mod validated_json;

pub use uuid_path::UuidPath;
pub use validated_json::ValidatedJson;
