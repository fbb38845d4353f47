//! Typed SparkApplication document.
//!
//! Every section is optional so that a document loaded from disk can be
//! represented as-is, whatever shape it has. Missing sections are caught by
//! the builder (before mutation) or by `schema::validate` (before emission).
//!
//! Each record keeps a flattened `extra` map: keys outside the schema are
//! preserved through loading and reported by validation instead of being
//! silently dropped.

use crate::manifest::constants;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Keys a record does not know about.
pub type Extra = BTreeMap<String, serde_yaml::Value>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<AppSpec>,

    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSpec {
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub app_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub python_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_pull_policy: Option<String>,

    /// Entry point of the job. Has no default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_application_file: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spark_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restart_policy: Option<RestartPolicy>,

    /// Free-form tunables. Kept as a raw mapping; validation requires
    /// string keys and string values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spark_conf: Option<serde_yaml::Mapping>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volumes: Option<Vec<Volume>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver: Option<RoleSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executor: Option<RoleSpec>,

    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RestartPolicy {
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub policy: Option<String>,

    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persistent_volume_claim: Option<ClaimRef>,

    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claim_name: Option<String>,

    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeMount {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mount_path: Option<String>,

    #[serde(flatten)]
    pub extra: Extra,
}

/// Resource spec shared by the driver and executor roles.
///
/// The two roles differ only in which fields the schema allows:
/// `instances` is executor-only, `serviceAccount` and `env` are driver-only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cores: Option<Cores>,

    /// Millicores, e.g. `1000m`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub core_limit: Option<String>,

    /// GiB with a `g` suffix, e.g. `2g` or `1.5g`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instances: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Labels>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_mounts: Option<Vec<VolumeMount>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<Vec<EnvEntry>>,

    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Labels {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(flatten)]
    pub extra: Extra,
}

/// CPU request. The orchestrator accepts whole and fractional cores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cores {
    Whole(i64),
    Fractional(f64),
}

impl Cores {
    pub fn is_positive(&self) -> bool {
        match *self {
            Cores::Whole(n) => n > 0,
            Cores::Fractional(x) => x > 0.0,
        }
    }
}

impl fmt::Display for Cores {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cores::Whole(n) => write!(f, "{}", n),
            Cores::Fractional(x) => write!(f, "{}", x),
        }
    }
}

impl From<i32> for Cores {
    fn from(n: i32) -> Self {
        Cores::Whole(n.into())
    }
}

impl From<u32> for Cores {
    fn from(n: u32) -> Self {
        Cores::Whole(n.into())
    }
}

impl From<i64> for Cores {
    fn from(n: i64) -> Self {
        Cores::Whole(n)
    }
}

impl From<f64> for Cores {
    fn from(x: f64) -> Self {
        Cores::Fractional(x)
    }
}

/// One entry of the driver's `env` list.
///
/// Either a plain `{name, value}` pair or `{name, valueFrom: {secretKeyRef}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_from: Option<EnvSource>,

    #[serde(flatten)]
    pub extra: Extra,
}

impl EnvEntry {
    pub fn plain(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            value: Some(value.into()),
            value_from: None,
            extra: Extra::new(),
        }
    }

    pub fn secret(name: impl Into<String>, secret_ref: SecretKeyRef) -> Self {
        Self {
            name: Some(name.into()),
            value: None,
            value_from: Some(EnvSource {
                secret_key_ref: Some(secret_ref),
                extra: Extra::new(),
            }),
            extra: Extra::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_key_ref: Option<SecretKeyRef>,

    #[serde(flatten)]
    pub extra: Extra,
}

/// Reference to one key of a Kubernetes secret.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecretKeyRef {
    pub name: String,
    pub key: String,

    #[serde(flatten)]
    pub extra: Extra,
}

impl SecretKeyRef {
    pub fn new(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key: key.into(),
            extra: Extra::new(),
        }
    }
}

impl ConfigDocument {
    /// The built-in template: every schema constant filled in, baseline
    /// tunables, one working volume. `mainApplicationFile` and the role
    /// resources are left for the caller.
    pub fn spark_default(name: impl Into<String>) -> Self {
        let mut spark_conf = serde_yaml::Mapping::new();
        for (key, value) in constants::DEFAULT_SPARK_CONF {
            spark_conf.insert((*key).into(), (*value).into());
        }

        let labels = || Labels {
            version: Some(constants::DEFAULT_SPARK_VERSION.to_string()),
            extra: Extra::new(),
        };

        Self {
            api_version: Some(constants::API_VERSION.to_string()),
            kind: Some(constants::KIND.to_string()),
            metadata: Some(Metadata {
                name: Some(name.into()),
                namespace: Some(constants::NAMESPACE.to_string()),
                extra: Extra::new(),
            }),
            spec: Some(AppSpec {
                app_type: Some(constants::APP_TYPE.to_string()),
                python_version: Some(constants::PYTHON_VERSION.to_string()),
                mode: Some(constants::MODE.to_string()),
                image: Some(constants::IMAGE.to_string()),
                image_pull_policy: Some(constants::IMAGE_PULL_POLICY.to_string()),
                main_application_file: None,
                spark_version: Some(constants::DEFAULT_SPARK_VERSION.to_string()),
                restart_policy: Some(RestartPolicy {
                    policy: Some(constants::RESTART_POLICY.to_string()),
                    extra: Extra::new(),
                }),
                spark_conf: Some(spark_conf),
                volumes: Some(vec![default_volume()]),
                driver: Some(RoleSpec {
                    labels: Some(labels()),
                    service_account: Some(constants::DRIVER_SERVICE_ACCOUNT.to_string()),
                    volume_mounts: Some(vec![default_volume_mount()]),
                    ..RoleSpec::default()
                }),
                executor: Some(RoleSpec {
                    labels: Some(labels()),
                    volume_mounts: Some(vec![default_volume_mount()]),
                    ..RoleSpec::default()
                }),
                extra: Extra::new(),
            }),
            extra: Extra::new(),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.metadata.as_ref()?.name.as_deref()
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    pub fn to_json_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

pub(crate) fn default_volume() -> Volume {
    Volume {
        name: Some(constants::VOLUME_NAME.to_string()),
        persistent_volume_claim: Some(ClaimRef {
            claim_name: Some(constants::VOLUME_CLAIM_NAME.to_string()),
            extra: Extra::new(),
        }),
        extra: Extra::new(),
    }
}

pub(crate) fn default_volume_mount() -> VolumeMount {
    VolumeMount {
        name: Some(constants::VOLUME_NAME.to_string()),
        mount_path: Some(constants::VOLUME_MOUNT_PATH.to_string()),
        extra: Extra::new(),
    }
}
