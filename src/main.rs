use anyhow::Context;
use clap::Parser;
use futures::TryStreamExt;
use spark8s::Result;
use spark8s::cli::{Cli, Commands};
use spark8s::k8s::SparkClient;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Diagnostics go to stderr so rendered manifests can be piped.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Render { job } => {
            let manifest = job
                .build()?
                .get_manifest()
                .with_context(|| format!("validate manifest {}", job.name))?;
            print!("{}", manifest.to_yaml()?);
        }
        Commands::Submit { job } => {
            let manifest = job
                .build()?
                .get_manifest()
                .with_context(|| format!("validate manifest {}", job.name))?;
            let client = SparkClient::try_default()
                .await
                .context("connect to cluster")?;
            let created = client
                .submit(manifest)
                .await
                .with_context(|| format!("submit {}", job.name))?;
            println!(
                "Submitted {}",
                created.metadata.name.as_deref().unwrap_or(job.name.as_str())
            );
        }
        Commands::Delete { name } => {
            let client = SparkClient::try_default()
                .await
                .context("connect to cluster")?;
            client
                .delete(&name)
                .await
                .with_context(|| format!("delete {}", name))?;
            println!("Deleted {}", name);
        }
        Commands::Logs { pod, namespace } => {
            let client = SparkClient::try_default()
                .await
                .context("connect to cluster")?;
            let lines = client
                .stream_logs(&pod, &namespace)
                .await
                .with_context(|| format!("open log stream for {}/{}", namespace, pod))?;
            let mut lines = std::pin::pin!(lines);
            while let Some(line) = lines.try_next().await? {
                println!("{}", line);
            }
        }
    }

    Ok(())
}
