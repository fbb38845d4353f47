//! Fixed values of the SparkApplication wire contract.
//!
//! Anything listed here is a constant in the manifest schema: the default
//! template writes it and validation insists on it.

pub const API_GROUP: &str = "sparkoperator.k8s.io";
pub const API_VERSION_SUFFIX: &str = "v1beta2";
pub const API_VERSION: &str = "sparkoperator.k8s.io/v1beta2";
pub const KIND: &str = "SparkApplication";
pub const PLURAL: &str = "sparkapplications";
pub const NAMESPACE: &str = "spark";

pub const APP_TYPE: &str = "Python";
pub const PYTHON_VERSION: &str = "3";
pub const MODE: &str = "cluster";
pub const IMAGE: &str = "";
pub const IMAGE_PULL_POLICY: &str = "Always";
pub const RESTART_POLICY: &str = "Never";

pub const DEFAULT_SPARK_VERSION: &str = "3.5.0";

pub const DRIVER_SERVICE_ACCOUNT: &str = "spark-driver";

pub const VOLUME_NAME: &str = "spark-data";
pub const VOLUME_CLAIM_NAME: &str = "spark-data";
pub const VOLUME_MOUNT_PATH: &str = "/mnt/spark";

/// Baseline `sparkConf` entries, in emission order.
pub const DEFAULT_SPARK_CONF: &[(&str, &str)] = &[
    ("spark.local.dir", "/mnt/spark/tmp"),
    ("spark.shuffle.compress", "true"),
    ("spark.shuffle.spill.compress", "true"),
    ("spark.sql.shuffle.partitions", "10"),
];
