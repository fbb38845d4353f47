//! Schema for the SparkApplication document.
//!
//! One check per field, composed top-down in document order. The first
//! violation found is returned together with the dotted path of the field.
//!
//! Version patterns are unanchored searches, the coreLimit and memory
//! patterns are anchored. `sparkVersion` allows a middle digit of 0-6,
//! `labels.version` allows 0-9.

use crate::manifest::constants;
use crate::manifest::document::{ConfigDocument, Extra, RoleSpec, Volume, VolumeMount};
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

pub const SPARK_VERSION_PATTERN: &str = r"3.[0-6].[0-9]";
pub const LABEL_VERSION_PATTERN: &str = r"3.[0-9].[0-9]";
pub const CORE_LIMIT_PATTERN: &str = r"^\d{3,6}m$";
pub const MEMORY_PATTERN: &str = r"^\d{1,3}g$";
pub const MEMORY_FRACTION_PATTERN: &str = r"^\d{1,3}.\dg$";

static SPARK_VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(SPARK_VERSION_PATTERN).expect("valid sparkVersion pattern"));
static LABEL_VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(LABEL_VERSION_PATTERN).expect("valid labels.version pattern"));
static CORE_LIMIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(CORE_LIMIT_PATTERN).expect("valid coreLimit pattern"));
static MEMORY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(MEMORY_PATTERN).expect("valid memory pattern"));
static MEMORY_FRACTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(MEMORY_FRACTION_PATTERN).expect("valid memory pattern"));

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{path}: {kind}")]
pub struct SchemaViolation {
    pub path: String,
    pub kind: ViolationKind,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ViolationKind {
    #[error("missing required field")]
    Missing,

    #[error("unexpected field")]
    Unexpected,

    #[error("expected {expected:?}, found {found:?}")]
    Mismatch { expected: String, found: String },

    #[error("{found:?} does not match {pattern}")]
    Pattern { pattern: String, found: String },

    #[error("{found} must be greater than zero")]
    NotPositive { found: String },

    #[error("must not be empty")]
    Empty,

    #[error("must be a string, found {found}")]
    NotString { found: String },
}

impl SchemaViolation {
    fn new(path: impl Into<String>, kind: ViolationKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

type Check = Result<(), SchemaViolation>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Driver,
    Executor,
}

/// Validate a whole document.
pub fn validate(doc: &ConfigDocument) -> Check {
    no_extra("", &doc.extra)?;
    constant("apiVersion", doc.api_version.as_deref(), constants::API_VERSION)?;
    constant("kind", doc.kind.as_deref(), constants::KIND)?;

    let metadata = required("metadata", doc.metadata.as_ref())?;
    no_extra("metadata", &metadata.extra)?;
    required("metadata.name", metadata.name.as_ref())?;
    constant(
        "metadata.namespace",
        metadata.namespace.as_deref(),
        constants::NAMESPACE,
    )?;

    let spec = required("spec", doc.spec.as_ref())?;
    no_extra("spec", &spec.extra)?;
    constant("spec.type", spec.app_type.as_deref(), constants::APP_TYPE)?;
    constant(
        "spec.pythonVersion",
        spec.python_version.as_deref(),
        constants::PYTHON_VERSION,
    )?;
    constant("spec.mode", spec.mode.as_deref(), constants::MODE)?;
    constant("spec.image", spec.image.as_deref(), constants::IMAGE)?;
    constant(
        "spec.imagePullPolicy",
        spec.image_pull_policy.as_deref(),
        constants::IMAGE_PULL_POLICY,
    )?;
    non_empty(
        "spec.mainApplicationFile",
        spec.main_application_file.as_deref(),
    )?;
    pattern(
        "spec.sparkVersion",
        spec.spark_version.as_deref(),
        &SPARK_VERSION_RE,
        SPARK_VERSION_PATTERN,
    )?;

    let restart = required("spec.restartPolicy", spec.restart_policy.as_ref())?;
    no_extra("spec.restartPolicy", &restart.extra)?;
    constant(
        "spec.restartPolicy.type",
        restart.policy.as_deref(),
        constants::RESTART_POLICY,
    )?;

    if let Some(conf) = &spec.spark_conf {
        validate_spark_conf(conf)?;
    }

    let volumes = required("spec.volumes", spec.volumes.as_ref())?;
    single("spec.volumes", volumes, validate_volume)?;

    let driver = required("spec.driver", spec.driver.as_ref())?;
    validate_role("spec.driver", driver, Role::Driver)?;

    let executor = required("spec.executor", spec.executor.as_ref())?;
    validate_role("spec.executor", executor, Role::Executor)
}

fn validate_spark_conf(conf: &serde_yaml::Mapping) -> Check {
    for (key, value) in conf {
        let Some(key) = key.as_str() else {
            return Err(SchemaViolation::new(
                "spec.sparkConf",
                ViolationKind::NotString {
                    found: describe(key),
                },
            ));
        };
        if !value.is_string() {
            return Err(SchemaViolation::new(
                format!("spec.sparkConf.{}", key),
                ViolationKind::NotString {
                    found: describe(value),
                },
            ));
        }
    }
    Ok(())
}

fn validate_volume(path: &str, volume: &Volume) -> Check {
    no_extra(path, &volume.extra)?;
    constant(
        &join(path, "name"),
        volume.name.as_deref(),
        constants::VOLUME_NAME,
    )?;
    let claim_path = join(path, "persistentVolumeClaim");
    let claim = required(&claim_path, volume.persistent_volume_claim.as_ref())?;
    no_extra(&claim_path, &claim.extra)?;
    constant(
        &join(&claim_path, "claimName"),
        claim.claim_name.as_deref(),
        constants::VOLUME_CLAIM_NAME,
    )
}

fn validate_volume_mount(path: &str, mount: &VolumeMount) -> Check {
    no_extra(path, &mount.extra)?;
    constant(
        &join(path, "name"),
        mount.name.as_deref(),
        constants::VOLUME_NAME,
    )?;
    constant(
        &join(path, "mountPath"),
        mount.mount_path.as_deref(),
        constants::VOLUME_MOUNT_PATH,
    )
}

fn validate_role(path: &str, role_spec: &RoleSpec, role: Role) -> Check {
    no_extra(path, &role_spec.extra)?;

    let cores_path = join(path, "cores");
    let cores = required(&cores_path, role_spec.cores.as_ref())?;
    if !cores.is_positive() {
        return Err(SchemaViolation::new(
            cores_path,
            ViolationKind::NotPositive {
                found: cores.to_string(),
            },
        ));
    }

    pattern(
        &join(path, "coreLimit"),
        role_spec.core_limit.as_deref(),
        &CORE_LIMIT_RE,
        CORE_LIMIT_PATTERN,
    )?;

    let memory_path = join(path, "memory");
    let memory = required(&memory_path, role_spec.memory.as_ref())?;
    if !MEMORY_RE.is_match(memory) && !MEMORY_FRACTION_RE.is_match(memory) {
        return Err(SchemaViolation::new(
            memory_path,
            ViolationKind::Pattern {
                pattern: format!("{} or {}", MEMORY_PATTERN, MEMORY_FRACTION_PATTERN),
                found: memory.clone(),
            },
        ));
    }

    let instances_path = join(path, "instances");
    match role {
        Role::Executor => {
            let instances = *required(&instances_path, role_spec.instances.as_ref())?;
            if instances <= 0 {
                return Err(SchemaViolation::new(
                    instances_path,
                    ViolationKind::NotPositive {
                        found: instances.to_string(),
                    },
                ));
            }
        }
        Role::Driver => absent(&instances_path, role_spec.instances.as_ref())?,
    }

    let labels_path = join(path, "labels");
    let labels = required(&labels_path, role_spec.labels.as_ref())?;
    no_extra(&labels_path, &labels.extra)?;
    pattern(
        &join(&labels_path, "version"),
        labels.version.as_deref(),
        &LABEL_VERSION_RE,
        LABEL_VERSION_PATTERN,
    )?;

    let account_path = join(path, "serviceAccount");
    match role {
        Role::Driver => constant(
            &account_path,
            role_spec.service_account.as_deref(),
            constants::DRIVER_SERVICE_ACCOUNT,
        )?,
        Role::Executor => absent(&account_path, role_spec.service_account.as_ref())?,
    }

    let mounts_path = join(path, "volumeMounts");
    let mounts = required(&mounts_path, role_spec.volume_mounts.as_ref())?;
    single(&mounts_path, mounts, validate_volume_mount)?;

    let env_path = join(path, "env");
    match role {
        Role::Driver => {
            for (idx, entry) in role_spec.env.iter().flatten().enumerate() {
                let entry_path = format!("{}[{}]", env_path, idx);
                no_extra(&entry_path, &entry.extra)?;
                required(&join(&entry_path, "name"), entry.name.as_ref())?;
                if let Some(source) = &entry.value_from {
                    let source_path = join(&entry_path, "valueFrom");
                    no_extra(&source_path, &source.extra)?;
                    let ref_path = join(&source_path, "secretKeyRef");
                    let secret = required(&ref_path, source.secret_key_ref.as_ref())?;
                    no_extra(&ref_path, &secret.extra)?;
                }
            }
            Ok(())
        }
        Role::Executor => absent(&env_path, role_spec.env.as_ref()),
    }
}

/// Lists pinned to exactly one allowed entry (the working volume and its mount).
fn single<T>(path: &str, items: &[T], check: impl Fn(&str, &T) -> Check) -> Check {
    match items {
        [only] => check(&format!("{}[0]", path), only),
        _ => Err(SchemaViolation::new(
            path,
            ViolationKind::Mismatch {
                expected: "exactly one entry".to_string(),
                found: format!("{} entries", items.len()),
            },
        )),
    }
}

fn required<'a, T: ?Sized>(path: &str, value: Option<&'a T>) -> Result<&'a T, SchemaViolation> {
    value.ok_or_else(|| SchemaViolation::new(path, ViolationKind::Missing))
}

fn absent<T: ?Sized>(path: &str, value: Option<&T>) -> Check {
    match value {
        Some(_) => Err(SchemaViolation::new(path, ViolationKind::Unexpected)),
        None => Ok(()),
    }
}

fn constant(path: &str, value: Option<&str>, expected: &str) -> Check {
    let value = required(path, value)?;
    if value != expected {
        return Err(SchemaViolation::new(
            path,
            ViolationKind::Mismatch {
                expected: expected.to_string(),
                found: value.to_string(),
            },
        ));
    }
    Ok(())
}

fn non_empty(path: &str, value: Option<&str>) -> Check {
    if required(path, value)?.is_empty() {
        return Err(SchemaViolation::new(path, ViolationKind::Empty));
    }
    Ok(())
}

fn pattern(path: &str, value: Option<&str>, re: &Regex, source: &str) -> Check {
    let value = required(path, value)?;
    if !re.is_match(value) {
        return Err(SchemaViolation::new(
            path,
            ViolationKind::Pattern {
                pattern: source.to_string(),
                found: value.to_string(),
            },
        ));
    }
    Ok(())
}

fn no_extra(path: &str, extra: &Extra) -> Check {
    match extra.keys().next() {
        Some(key) => Err(SchemaViolation::new(join(path, key), ViolationKind::Unexpected)),
        None => Ok(()),
    }
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}

fn describe(value: &serde_yaml::Value) -> String {
    match value {
        serde_yaml::Value::Null => "null".to_string(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::String(s) => format!("{:?}", s),
        serde_yaml::Value::Sequence(_) => "a sequence".to_string(),
        serde_yaml::Value::Mapping(_) => "a mapping".to_string(),
        serde_yaml::Value::Tagged(_) => "a tagged value".to_string(),
    }
}
