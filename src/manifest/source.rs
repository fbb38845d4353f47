//! Loading a baseline document from disk.
//!
//! Files are parsed as YAML, which also covers JSON manifests.

use crate::error::ManifestError;
use crate::manifest::document::ConfigDocument;
use std::fs;
use std::path::Path;

/// Read and parse a manifest file as-is. No template merging happens here.
pub fn load_document(path: impl AsRef<Path>) -> Result<ConfigDocument, ManifestError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| ManifestError::Load {
        path: path.to_path_buf(),
        source,
    })?;

    let doc = serde_yaml::from_str(&text).map_err(|source| ManifestError::Parse {
        origin: Some(path.to_path_buf()),
        source,
    })?;
    tracing::debug!(path = %path.display(), "loaded manifest document");
    Ok(doc)
}

/// Parse an in-memory manifest.
pub fn parse_document(text: &str) -> Result<ConfigDocument, ManifestError> {
    serde_yaml::from_str(text).map_err(|source| ManifestError::Parse {
        origin: None,
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_document(dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(err, ManifestError::Load { .. }));
        assert!(err.is_load_error());
    }

    #[test]
    fn malformed_yaml_is_a_load_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "spec: [unterminated").unwrap();

        let err = load_document(file.path()).unwrap_err();
        assert!(matches!(err, ManifestError::Parse { origin: Some(_), .. }));
        assert!(err.is_load_error());
    }

    #[test]
    fn json_is_accepted() {
        let doc = parse_document(r#"{"kind": "SparkApplication", "metadata": {"name": "j"}}"#)
            .unwrap();
        assert_eq!(doc.kind.as_deref(), Some("SparkApplication"));
        assert_eq!(doc.name(), Some("j"));
    }

    #[test]
    fn wrong_shape_is_a_parse_error() {
        let err = parse_document("spec:\n  driver: [1, 2]\n").unwrap_err();
        assert!(matches!(err, ManifestError::Parse { origin: None, .. }));
    }

    #[test]
    fn nameless_env_entry_still_loads() {
        let doc = parse_document("spec:\n  driver:\n    env:\n      - value: '1'\n").unwrap();
        let env = doc.spec.unwrap().driver.unwrap().env.unwrap();
        assert_eq!(env.len(), 1);
        assert_eq!(env[0].name, None);
        assert_eq!(env[0].value.as_deref(), Some("1"));
    }
}
