//! `AppManifest`: owns one SparkApplication document and mutates it.
//!
//! Every mutator checks that the section it writes into exists before
//! touching anything, so a failed call leaves the document as it was.

use crate::error::ManifestError;
use crate::manifest::document::{AppSpec, ConfigDocument, Cores, EnvEntry, RoleSpec, SecretKeyRef};
use crate::manifest::{schema, source};
use std::path::Path;

#[derive(Debug, Clone)]
pub struct AppManifest {
    name: String,
    manifest: ConfigDocument,
}

impl AppManifest {
    /// Start from the built-in template.
    pub fn from_default(name: impl Into<String>) -> Self {
        let name = name.into();
        let manifest = ConfigDocument::spark_default(name.clone());
        Self { name, manifest }
    }

    /// Start from a manifest file, taken as-is apart from `metadata.name`,
    /// which is always overwritten with `name`.
    pub fn from_file(
        name: impl Into<String>,
        path: impl AsRef<Path>,
    ) -> Result<Self, ManifestError> {
        let doc = source::load_document(path)?;
        Ok(Self::from_document(name, doc))
    }

    /// Wrap an already parsed document. `metadata` is created if the
    /// document has none, then its name is forced to `name`.
    pub fn from_document(name: impl Into<String>, mut manifest: ConfigDocument) -> Self {
        let name = name.into();
        manifest.metadata.get_or_insert_with(Default::default).name = Some(name.clone());
        Self { name, manifest }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The document as it stands, without validation.
    pub fn document(&self) -> &ConfigDocument {
        &self.manifest
    }

    pub fn validate(&self) -> Result<(), ManifestError> {
        schema::validate(&self.manifest)?;
        Ok(())
    }

    /// Validate and hand out a copy of the document.
    pub fn get_manifest(&self) -> Result<ConfigDocument, ManifestError> {
        self.validate()?;
        Ok(self.manifest.clone())
    }

    /// Application arguments are not supported yet.
    pub fn set_application_args<I, S>(&mut self, _args: I) -> Result<(), ManifestError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Err(ManifestError::NotImplemented("set_application_args"))
    }

    pub fn set_application_file(&mut self, path: impl Into<String>) -> Result<(), ManifestError> {
        let path = path.into();
        tracing::debug!(app = %self.name, file = %path, "setting main application file");
        self.spec_mut()?.main_application_file = Some(path);
        Ok(())
    }

    pub fn set_application_name(&mut self, name: impl Into<String>) -> Result<(), ManifestError> {
        let name = name.into();
        let metadata = self
            .manifest
            .metadata
            .as_mut()
            .ok_or(ManifestError::CorruptedState { section: "metadata" })?;
        metadata.name = Some(name.clone());
        tracing::debug!(from = %self.name, to = %name, "renaming application");
        self.name = name;
        Ok(())
    }

    /// Merge driver resources into `spec.driver`; other driver fields stay.
    pub fn set_driver_spec(
        &mut self,
        cores: impl Into<Cores>,
        core_limit: impl Into<String>,
        memory_gib: impl Into<f64>,
    ) -> Result<(), ManifestError> {
        let driver = self.driver_mut()?;
        apply_resources(driver, cores.into(), core_limit.into(), memory_gib.into());
        tracing::debug!(
            cores = ?driver.cores,
            core_limit = ?driver.core_limit,
            memory = ?driver.memory,
            "driver spec set"
        );
        Ok(())
    }

    /// Merge executor resources and instance count into `spec.executor`.
    pub fn set_executor_spec(
        &mut self,
        cores: impl Into<Cores>,
        core_limit: impl Into<String>,
        memory_gib: impl Into<f64>,
        instances: u32,
    ) -> Result<(), ManifestError> {
        let executor = self.executor_mut()?;
        apply_resources(executor, cores.into(), core_limit.into(), memory_gib.into());
        executor.instances = Some(instances.into());
        tracing::debug!(
            cores = ?executor.cores,
            core_limit = ?executor.core_limit,
            memory = ?executor.memory,
            instances,
            "executor spec set"
        );
        Ok(())
    }

    /// Append plain variables to the driver env, in iteration order.
    /// Existing entries are kept and names are not deduplicated.
    pub fn add_env_variables<I, K, V>(&mut self, variables: I) -> Result<(), ManifestError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let entries = variables
            .into_iter()
            .map(|(name, value)| EnvEntry::plain(name, value));
        self.append_driver_env(entries)
    }

    /// Append secret references to the driver env, in iteration order.
    pub fn add_kube_secrets<I, K>(&mut self, secrets: I) -> Result<(), ManifestError>
    where
        I: IntoIterator<Item = (K, SecretKeyRef)>,
        K: Into<String>,
    {
        let entries = secrets
            .into_iter()
            .map(|(name, secret_ref)| EnvEntry::secret(name, secret_ref));
        self.append_driver_env(entries)
    }

    fn append_driver_env(
        &mut self,
        entries: impl Iterator<Item = EnvEntry>,
    ) -> Result<(), ManifestError> {
        let driver = self.driver_mut()?;
        let env = driver.env.get_or_insert_with(Vec::new);
        let before = env.len();
        env.extend(entries);
        tracing::debug!(added = env.len() - before, total = env.len(), "driver env extended");
        Ok(())
    }

    fn spec_mut(&mut self) -> Result<&mut AppSpec, ManifestError> {
        self.manifest
            .spec
            .as_mut()
            .ok_or(ManifestError::CorruptedState { section: "spec" })
    }

    fn driver_mut(&mut self) -> Result<&mut RoleSpec, ManifestError> {
        self.spec_mut()
            .map_err(|_| ManifestError::CorruptedState { section: "spec.driver" })?
            .driver
            .as_mut()
            .ok_or(ManifestError::CorruptedState { section: "spec.driver" })
    }

    fn executor_mut(&mut self) -> Result<&mut RoleSpec, ManifestError> {
        self.spec_mut()
            .map_err(|_| ManifestError::CorruptedState { section: "spec.executor" })?
            .executor
            .as_mut()
            .ok_or(ManifestError::CorruptedState { section: "spec.executor" })
    }
}

fn apply_resources(role: &mut RoleSpec, cores: Cores, core_limit: String, memory_gib: f64) {
    role.cores = Some(cores);
    role.core_limit = Some(core_limit);
    role.memory = Some(format!("{}g", memory_gib));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::schema::ViolationKind;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn ready(name: &str) -> AppManifest {
        let mut app = AppManifest::from_default(name);
        app.set_application_file("/app/main.py").unwrap();
        app.set_driver_spec(1, "1000m", 2).unwrap();
        app.set_executor_spec(2, "2000m", 4, 3).unwrap();
        app
    }

    fn yaml_file(text: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(text.as_bytes()).unwrap();
        file
    }

    fn driver_env(app: &AppManifest) -> Vec<EnvEntry> {
        app.document()
            .spec
            .as_ref()
            .and_then(|s| s.driver.as_ref())
            .and_then(|d| d.env.clone())
            .unwrap_or_default()
    }

    #[test]
    fn complete_job_passes_validation() {
        let manifest = ready("job1").get_manifest().unwrap();

        let spec = manifest.spec.unwrap();
        assert_eq!(manifest.metadata.unwrap().name.as_deref(), Some("job1"));
        assert_eq!(spec.main_application_file.as_deref(), Some("/app/main.py"));
        let driver = spec.driver.unwrap();
        assert_eq!(driver.memory.as_deref(), Some("2g"));
        assert_eq!(driver.cores, Some(Cores::Whole(1)));
        let executor = spec.executor.unwrap();
        assert_eq!(executor.instances, Some(3));
        assert_eq!(executor.memory.as_deref(), Some("4g"));
        assert_eq!(executor.core_limit.as_deref(), Some("2000m"));
    }

    #[test]
    fn default_without_application_file_is_rejected() {
        let mut app = AppManifest::from_default("job1");
        app.set_driver_spec(1, "1000m", 2).unwrap();
        app.set_executor_spec(1, "1000m", 2, 1).unwrap();

        match app.get_manifest() {
            Err(ManifestError::SchemaValidation(violation)) => {
                assert_eq!(violation.path, "spec.mainApplicationFile");
                assert_eq!(violation.kind, ViolationKind::Missing);
            }
            other => panic!("expected a schema violation, got {:?}", other),
        }
    }

    #[test]
    fn valid_resource_inputs_pass() {
        let cases: [(Cores, &str, f64, u32); 5] = [
            (Cores::Whole(1), "100m", 1.0, 1),
            (Cores::Whole(4), "4000m", 16.0, 10),
            (Cores::Fractional(0.5), "500m", 0.5, 2),
            (Cores::Fractional(2.5), "999999m", 999.0, 100),
            (Cores::Whole(64), "64000m", 12.5, 1),
        ];

        for (cores, limit, memory, instances) in cases {
            let mut app = AppManifest::from_default("job1");
            app.set_application_file("/app/main.py").unwrap();
            app.set_driver_spec(cores, limit, memory).unwrap();
            app.set_executor_spec(cores, limit, memory, instances).unwrap();
            assert!(
                app.get_manifest().is_ok(),
                "rejected cores={} limit={} memory={} instances={}",
                cores,
                limit,
                memory,
                instances
            );
        }
    }

    #[test]
    fn resource_setters_merge_into_role() {
        let app = ready("job1");
        let spec = app.document().spec.as_ref().unwrap();

        let driver = spec.driver.as_ref().unwrap();
        assert_eq!(driver.service_account.as_deref(), Some("spark-driver"));
        assert_eq!(driver.labels.as_ref().unwrap().version.as_deref(), Some("3.5.0"));
        assert_eq!(driver.volume_mounts.as_ref().map(Vec::len), Some(1));

        let executor = spec.executor.as_ref().unwrap();
        assert_eq!(executor.labels.as_ref().unwrap().version.as_deref(), Some("3.5.0"));
    }

    #[test]
    fn env_variables_append_in_order_without_dedup() {
        let mut app = ready("job1");
        app.add_env_variables([("A", "1")]).unwrap();
        app.add_env_variables([("B", "2")]).unwrap();
        app.add_env_variables([("A", "3")]).unwrap();

        assert_eq!(
            driver_env(&app),
            vec![
                EnvEntry::plain("A", "1"),
                EnvEntry::plain("B", "2"),
                EnvEntry::plain("A", "3"),
            ]
        );
        assert!(app.get_manifest().is_ok());
    }

    #[test]
    fn secrets_append_after_plain_variables() {
        let mut app = ready("job1");
        app.add_env_variables(vec![("MODE".to_string(), "batch".to_string())])
            .unwrap();
        app.add_kube_secrets([("TOKEN", SecretKeyRef::new("creds", "token"))])
            .unwrap();

        let env = driver_env(&app);
        assert_eq!(
            env,
            vec![
                EnvEntry::plain("MODE", "batch"),
                EnvEntry::secret("TOKEN", SecretKeyRef::new("creds", "token")),
            ]
        );
        assert!(app.get_manifest().is_ok());
    }

    #[test]
    fn renaming_touches_only_the_name() {
        let mut app = ready("job1");
        let before = app.document().clone();

        app.set_application_name("x").unwrap();

        let mut expected = before;
        expected.metadata.as_mut().unwrap().name = Some("x".to_string());
        assert_eq!(app.document(), &expected);
        assert_eq!(app.name(), "x");
    }

    #[test]
    fn loaded_file_name_is_forced() {
        let file = yaml_file(
            "apiVersion: sparkoperator.k8s.io/v1beta2\n\
             metadata:\n  name: from-file\n  namespace: spark\n",
        );
        let app = AppManifest::from_file("job1", file.path()).unwrap();
        assert_eq!(app.document().name(), Some("job1"));
        assert_eq!(app.name(), "job1");
    }

    #[test]
    fn loaded_file_without_metadata_gets_one() {
        let file = yaml_file("kind: SparkApplication\n");
        let app = AppManifest::from_file("job1", file.path()).unwrap();
        let metadata = app.document().metadata.as_ref().unwrap();
        assert_eq!(metadata.name.as_deref(), Some("job1"));
        assert_eq!(metadata.namespace, None);
    }

    #[test]
    fn loaded_file_is_not_merged_with_template() {
        let file = yaml_file("spec:\n  driver:\n    serviceAccount: spark-driver\n");
        let app = AppManifest::from_file("job1", file.path()).unwrap();
        let doc = app.document();
        assert_eq!(doc.api_version, None);
        assert_eq!(doc.spec.as_ref().unwrap().executor, None);
    }

    #[test]
    fn missing_executor_section_is_corrupted_state() {
        let file = yaml_file("spec:\n  driver:\n    cores: 1\n");
        let mut app = AppManifest::from_file("job1", file.path()).unwrap();
        let before = app.document().clone();

        let err = app.set_executor_spec(2, "2000m", 4, 3).unwrap_err();
        assert!(matches!(
            err,
            ManifestError::CorruptedState { section: "spec.executor" }
        ));
        assert_eq!(app.document(), &before);

        app.set_driver_spec(1, "1000m", 2).unwrap();
    }

    #[test]
    fn missing_driver_section_blocks_env_changes() {
        let file = yaml_file("spec:\n  mode: cluster\n");
        let mut app = AppManifest::from_file("job1", file.path()).unwrap();
        let before = app.document().clone();

        for err in [
            app.add_env_variables([("A", "1")]).unwrap_err(),
            app.add_kube_secrets([("T", SecretKeyRef::new("s", "k"))]).unwrap_err(),
            app.set_driver_spec(1, "1000m", 2).unwrap_err(),
        ] {
            assert!(matches!(
                err,
                ManifestError::CorruptedState { section: "spec.driver" }
            ));
        }
        assert_eq!(app.document(), &before);
    }

    #[test]
    fn missing_spec_blocks_application_file() {
        let mut app = AppManifest::from_document("job1", ConfigDocument::default());
        let err = app.set_application_file("/app/main.py").unwrap_err();
        assert!(matches!(err, ManifestError::CorruptedState { section: "spec" }));
    }

    #[test]
    fn unreadable_file_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = AppManifest::from_file("job1", dir.path().join("nope.yaml")).unwrap_err();
        assert!(err.is_load_error());
    }

    #[test]
    fn application_args_are_unsupported() {
        let mut app = ready("job1");
        assert!(matches!(
            app.set_application_args(["--date", "2024-01-01"]),
            Err(ManifestError::NotImplemented("set_application_args"))
        ));

        let mut empty = AppManifest::from_document("job1", ConfigDocument::default());
        assert!(matches!(
            empty.set_application_args(Vec::<String>::new()),
            Err(ManifestError::NotImplemented(_))
        ));
    }

    #[test]
    fn returned_manifest_is_a_snapshot() {
        let app = ready("job1");
        let mut manifest = app.get_manifest().unwrap();
        manifest.kind = Some("Pod".to_string());

        assert_eq!(app.document().kind.as_deref(), Some("SparkApplication"));
        assert!(app.get_manifest().is_ok());
    }

    #[test]
    fn failed_validation_keeps_document() {
        let mut app = AppManifest::from_default("job1");
        app.set_driver_spec(1, "1000m", 2).unwrap();
        assert!(app.get_manifest().is_err());
        assert!(app.get_manifest().is_err());

        let driver = app.document().spec.as_ref().unwrap().driver.as_ref().unwrap();
        assert_eq!(driver.memory.as_deref(), Some("2g"));
    }
}
