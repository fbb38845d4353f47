//! Command-line configuration.
//!
//! Every job option maps onto one builder call. Resource options come in
//! groups (cores, core limit, memory, and instances for executors); a group
//! is either given in full or left out, in which case the document keeps
//! whatever the template had.

use crate::error::ManifestError;
use crate::manifest::constants;
use crate::manifest::{AppManifest, Cores, SecretKeyRef};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "spark8s")]
#[command(about = "Build, validate and submit SparkApplication manifests", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build a manifest and print it as YAML (validates while building).
    Render {
        #[command(flatten)]
        job: JobArgs,
    },

    /// Build a manifest and create it on the cluster.
    Submit {
        #[command(flatten)]
        job: JobArgs,
    },

    /// Delete a SparkApplication by name.
    Delete {
        #[arg(long)]
        name: String,
    },

    /// Follow the log of a running pod.
    Logs {
        #[arg(long)]
        pod: String,

        #[arg(long, default_value = constants::NAMESPACE)]
        namespace: String,
    },
}

#[derive(Args, Debug, Clone)]
pub struct JobArgs {
    /// Application name (metadata.name).
    #[arg(long, env = "SPARK8S_NAME")]
    pub name: String,

    /// Main application file, e.g. local:///app/main.py.
    #[arg(long, env = "SPARK8S_APP_FILE")]
    pub app_file: String,

    /// Start from this manifest instead of the built-in template.
    #[arg(long, env = "SPARK8S_TEMPLATE")]
    pub template: Option<PathBuf>,

    #[arg(long, value_parser = parse_cores, requires_all = ["driver_core_limit", "driver_memory"])]
    pub driver_cores: Option<Cores>,

    #[arg(long, requires_all = ["driver_cores", "driver_memory"])]
    pub driver_core_limit: Option<String>,

    /// Driver memory in GiB.
    #[arg(long, requires_all = ["driver_cores", "driver_core_limit"])]
    pub driver_memory: Option<f64>,

    #[arg(
        long,
        value_parser = parse_cores,
        requires_all = ["executor_core_limit", "executor_memory", "executor_instances"]
    )]
    pub executor_cores: Option<Cores>,

    #[arg(long, requires_all = ["executor_cores", "executor_memory", "executor_instances"])]
    pub executor_core_limit: Option<String>,

    /// Executor memory in GiB.
    #[arg(long, requires_all = ["executor_cores", "executor_core_limit", "executor_instances"])]
    pub executor_memory: Option<f64>,

    #[arg(long, requires_all = ["executor_cores", "executor_core_limit", "executor_memory"])]
    pub executor_instances: Option<u32>,

    /// Driver environment variable, NAME=VALUE. Repeatable.
    #[arg(long = "env", value_parser = parse_env_pair)]
    pub env: Vec<(String, String)>,

    /// Driver secret reference, NAME=SECRET:KEY. Repeatable.
    #[arg(long = "secret", value_parser = parse_secret)]
    pub secrets: Vec<(String, SecretKeyRef)>,
}

impl JobArgs {
    /// Apply the options to a fresh builder, in a fixed order: application
    /// file, driver, executor, env, secrets.
    pub fn build(&self) -> Result<AppManifest, ManifestError> {
        let mut app = match &self.template {
            Some(path) => AppManifest::from_file(&self.name, path)?,
            None => AppManifest::from_default(&self.name),
        };

        app.set_application_file(&self.app_file)?;

        if let (Some(cores), Some(limit), Some(memory)) =
            (self.driver_cores, &self.driver_core_limit, self.driver_memory)
        {
            app.set_driver_spec(cores, limit, memory)?;
        }

        if let (Some(cores), Some(limit), Some(memory), Some(instances)) = (
            self.executor_cores,
            &self.executor_core_limit,
            self.executor_memory,
            self.executor_instances,
        ) {
            app.set_executor_spec(cores, limit, memory, instances)?;
        }

        if !self.env.is_empty() {
            app.add_env_variables(self.env.iter().cloned())?;
        }
        if !self.secrets.is_empty() {
            app.add_kube_secrets(self.secrets.iter().cloned())?;
        }

        Ok(app)
    }
}

/// Whole numbers stay integers in the emitted manifest.
fn parse_cores(s: &str) -> Result<Cores, String> {
    if let Ok(n) = s.parse::<i64>() {
        return Ok(Cores::Whole(n));
    }
    s.parse::<f64>()
        .map(Cores::Fractional)
        .map_err(|_| format!("invalid core count: {}", s))
}

fn parse_env_pair(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
        _ => Err(format!("expected NAME=VALUE, got {:?}", s)),
    }
}

fn parse_secret(s: &str) -> Result<(String, SecretKeyRef), String> {
    let (name, reference) = parse_env_pair(s)
        .map_err(|_| format!("expected NAME=SECRET:KEY, got {:?}", s))?;
    match reference.split_once(':') {
        Some((secret, key)) if !secret.is_empty() && !key.is_empty() => {
            Ok((name, SecretKeyRef::new(secret, key)))
        }
        _ => Err(format!("expected NAME=SECRET:KEY, got {:?}", s)),
    }
}
