use crate::manifest::schema::SchemaViolation;
use std::path::PathBuf;
use thiserror::Error;

/// Failures of the manifest layer.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest {}: {source}", .path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse manifest{}: {source}", display_origin(.origin))]
    Parse {
        origin: Option<PathBuf>,
        #[source]
        source: serde_yaml::Error,
    },

    /// A mutator needed a section the document does not have.
    #[error("manifest corrupted: no {section} section")]
    CorruptedState { section: &'static str },

    #[error("manifest failed schema validation: {0}")]
    SchemaValidation(#[from] SchemaViolation),

    #[error("{0} is not implemented")]
    NotImplemented(&'static str),
}

impl ManifestError {
    /// True for both file-read and parse failures.
    pub fn is_load_error(&self) -> bool {
        matches!(self, ManifestError::Load { .. } | ManifestError::Parse { .. })
    }
}

fn display_origin(origin: &Option<PathBuf>) -> String {
    origin
        .as_ref()
        .map(|path| format!(" {}", path.display()))
        .unwrap_or_default()
}

/// Failures talking to the cluster.
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error(transparent)]
    Api(#[from] kube::Error),

    #[error("failed to encode manifest for submission: {0}")]
    Encode(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::schema::ViolationKind;

    #[test]
    fn messages_name_the_problem() {
        let err = ManifestError::CorruptedState {
            section: "spec.executor",
        };
        assert_eq!(err.to_string(), "manifest corrupted: no spec.executor section");

        let err = ManifestError::from(SchemaViolation {
            path: "spec.mainApplicationFile".to_string(),
            kind: ViolationKind::Missing,
        });
        assert_eq!(
            err.to_string(),
            "manifest failed schema validation: spec.mainApplicationFile: missing required field"
        );

        let err = ManifestError::NotImplemented("set_application_args");
        assert_eq!(err.to_string(), "set_application_args is not implemented");
        assert!(!err.is_load_error());
    }
}
