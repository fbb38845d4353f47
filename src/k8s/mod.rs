//! Cluster access: submit and delete SparkApplications, follow pod logs.
//!
//! Thin wrappers over `kube`. Errors from the API server are passed through
//! unchanged and nothing is retried here.

use crate::error::ClusterError;
use crate::manifest::ConfigDocument;
use crate::manifest::constants;
use futures::{AsyncBufReadExt, Stream};
use k8s_openapi::api::core::v1::Pod;
use kube::Client;
use kube::api::{
    Api, ApiResource, DeleteParams, DynamicObject, GroupVersionKind, LogParams, PostParams,
};

/// The SparkApplication custom resource served by the Spark operator.
pub fn spark_application_resource() -> ApiResource {
    let gvk = GroupVersionKind::gvk(
        constants::API_GROUP,
        constants::API_VERSION_SUFFIX,
        constants::KIND,
    );
    ApiResource::from_gvk_with_plural(&gvk, constants::PLURAL)
}

/// Re-shape a manifest as a dynamic object for the custom-resource API.
pub fn to_dynamic_object(doc: &ConfigDocument) -> Result<DynamicObject, serde_json::Error> {
    serde_json::from_value(doc.to_json_value()?)
}

#[derive(Clone)]
pub struct SparkClient {
    client: Client,
}

impl SparkClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Connect using the local kubeconfig or the in-cluster service account.
    pub async fn try_default() -> Result<Self, ClusterError> {
        Ok(Self::new(Client::try_default().await?))
    }

    fn applications(&self) -> Api<DynamicObject> {
        Api::namespaced_with(
            self.client.clone(),
            constants::NAMESPACE,
            &spark_application_resource(),
        )
    }

    /// Create the application. The document is consumed; there is no update path.
    pub async fn submit(&self, doc: ConfigDocument) -> Result<DynamicObject, ClusterError> {
        let object = to_dynamic_object(&doc)?;
        let created = self
            .applications()
            .create(&PostParams::default(), &object)
            .await?;
        tracing::info!(
            name = created.metadata.name.as_deref().unwrap_or_default(),
            namespace = constants::NAMESPACE,
            "spark application created"
        );
        Ok(created)
    }

    pub async fn delete(&self, name: &str) -> Result<(), ClusterError> {
        self.applications()
            .delete(name, &DeleteParams::default())
            .await?;
        tracing::info!(name, namespace = constants::NAMESPACE, "spark application deleted");
        Ok(())
    }

    /// Follow a pod's log. Yields one decoded line at a time until the
    /// server closes the stream or the connection fails.
    pub async fn stream_logs(
        &self,
        pod: &str,
        namespace: &str,
    ) -> Result<impl Stream<Item = std::io::Result<String>>, ClusterError> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let params = LogParams {
            follow: true,
            ..LogParams::default()
        };
        let reader = pods.log_stream(pod, &params).await?;
        tracing::debug!(pod, namespace, "following pod log");
        Ok(reader.lines())
    }
}
