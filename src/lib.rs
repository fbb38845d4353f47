//! Build, validate and submit SparkApplication manifests for the Spark
//! operator, and follow the logs of the pods they start.

pub mod cli;
pub mod error;
pub mod k8s;
pub mod manifest;

pub use error::{ClusterError, ManifestError};
pub use manifest::{AppManifest, ConfigDocument};

pub type Result<T> = anyhow::Result<T>;
