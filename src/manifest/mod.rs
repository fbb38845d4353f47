//! Manifest layer: typed SparkApplication document, its schema, and the
//! builder that mutates it.
//!
//! Kept separate from cluster access. It owns:
//! - the fixed wire constants
//! - the typed document and the built-in template
//! - loading documents from disk
//! - validation
//! - `AppManifest`, the builder

pub mod builder;
pub mod constants;
pub mod document;
pub mod schema;
pub mod source;

pub use builder::AppManifest;
pub use document::{ConfigDocument, Cores, EnvEntry, RoleSpec, SecretKeyRef};
pub use schema::{SchemaViolation, ViolationKind};
