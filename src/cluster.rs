use async_trait::async_trait;
use k8s_openapi::api::apps::v1 as appsv1;
use k8s_openapi::api::core::v1 as corev1;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::api::{Api, DeleteParams, ListParams, PostParams};
use kube::Client;
use serde_json::Value;
use thiserror::Error;

use crate::manifest::ResourceKind;

/// Classified failure from the cluster API. `NotFound` and `Conflict` carry
/// meaning for the reconciler; everything else is reported as-is.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("resource not found")]
    NotFound,

    #[error("resource already exists: {0}")]
    Conflict(String),

    #[error("not authorized: {0}")]
    Unauthorized(String),

    #[error("cluster api unavailable: {0}")]
    Unavailable(String),

    #[error("cluster api request failed: {0}")]
    Other(String),
}

fn classify(err: kube::Error) -> ApiError {
    match err {
        kube::Error::Api(resp) => match resp.code {
            404 => ApiError::NotFound,
            409 => ApiError::Conflict(resp.message),
            401 | 403 => ApiError::Unauthorized(resp.message),
            503 => ApiError::Unavailable(resp.message),
            _ => ApiError::Other(resp.message),
        },
        other => ApiError::Other(other.to_string()),
    }
}

/// Snapshot of a live deployment's reported status.
#[derive(Debug, Clone)]
pub struct DeploymentState {
    pub name: String,
    pub desired_replicas: i32,
    pub available_replicas: i32,
}

#[derive(Debug, Clone)]
pub struct ServicePortState {
    pub port: i32,
    pub target_port: Option<String>,
    pub node_port: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct ServiceState {
    pub name: String,
    pub service_type: String,
    pub cluster_ip: Option<String>,
    pub ports: Vec<ServicePortState>,
}

#[derive(Debug, Clone)]
pub struct NodeAddress {
    pub address_type: String,
    pub address: String,
}

#[derive(Debug, Clone)]
pub struct NodeState {
    pub name: String,
    pub addresses: Vec<NodeAddress>,
}

#[derive(Debug, Clone)]
pub struct PodState {
    pub name: String,
    pub phase: String,
}

/// The cluster client facade. Create, delete, get and list per supported
/// kind; every operation returns a classified failure instead of raising.
/// `create` on an already existing resource surfaces `Conflict` so the
/// caller stays in charge of replace semantics.
#[async_trait]
pub trait ClusterOps: Send + Sync {
    async fn create(
        &self,
        kind: ResourceKind,
        namespace: &str,
        manifest: &Value,
    ) -> Result<(), ApiError>;

    async fn delete(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
    ) -> Result<(), ApiError>;

    async fn get_deployment(&self, namespace: &str, name: &str)
        -> Result<DeploymentState, ApiError>;

    async fn get_service(&self, namespace: &str, name: &str) -> Result<ServiceState, ApiError>;

    async fn list_deployments(&self, namespace: &str) -> Result<Vec<DeploymentState>, ApiError>;

    async fn list_services(&self, namespace: &str) -> Result<Vec<ServiceState>, ApiError>;

    async fn list_nodes(&self) -> Result<Vec<NodeState>, ApiError>;

    async fn list_pods(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<PodState>, ApiError>;
}

/// Facade implementation backed by a real `kube::Client`.
pub struct KubeCluster {
    client: Client,
}

impl KubeCluster {
    pub fn new(client: Client) -> Self {
        KubeCluster { client }
    }

    fn deployments(&self, namespace: &str) -> Api<appsv1::Deployment> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn services(&self, namespace: &str) -> Api<corev1::Service> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl ClusterOps for KubeCluster {
    async fn create(
        &self,
        kind: ResourceKind,
        namespace: &str,
        manifest: &Value,
    ) -> Result<(), ApiError> {
        let params = PostParams::default();
        match kind {
            ResourceKind::Deployment => {
                let body: appsv1::Deployment = serde_json::from_value(manifest.clone())
                    .map_err(|e| ApiError::Other(format!("invalid Deployment manifest: {e}")))?;
                self.deployments(namespace)
                    .create(&params, &body)
                    .await
                    .map_err(classify)?;
            }
            ResourceKind::Service => {
                let body: corev1::Service = serde_json::from_value(manifest.clone())
                    .map_err(|e| ApiError::Other(format!("invalid Service manifest: {e}")))?;
                self.services(namespace)
                    .create(&params, &body)
                    .await
                    .map_err(classify)?;
            }
        }
        Ok(())
    }

    async fn delete(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
    ) -> Result<(), ApiError> {
        let params = DeleteParams::default();
        match kind {
            ResourceKind::Deployment => {
                self.deployments(namespace)
                    .delete(name, &params)
                    .await
                    .map_err(classify)?;
            }
            ResourceKind::Service => {
                self.services(namespace)
                    .delete(name, &params)
                    .await
                    .map_err(classify)?;
            }
        }
        Ok(())
    }

    async fn get_deployment(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<DeploymentState, ApiError> {
        let deployment = self
            .deployments(namespace)
            .get(name)
            .await
            .map_err(classify)?;
        Ok(deployment_state(deployment))
    }

    async fn get_service(&self, namespace: &str, name: &str) -> Result<ServiceState, ApiError> {
        let service = self.services(namespace).get(name).await.map_err(classify)?;
        Ok(service_state(service))
    }

    async fn list_deployments(&self, namespace: &str) -> Result<Vec<DeploymentState>, ApiError> {
        let list = self
            .deployments(namespace)
            .list(&ListParams::default())
            .await
            .map_err(classify)?;
        Ok(list.items.into_iter().map(deployment_state).collect())
    }

    async fn list_services(&self, namespace: &str) -> Result<Vec<ServiceState>, ApiError> {
        let list = self
            .services(namespace)
            .list(&ListParams::default())
            .await
            .map_err(classify)?;
        Ok(list.items.into_iter().map(service_state).collect())
    }

    async fn list_nodes(&self) -> Result<Vec<NodeState>, ApiError> {
        let api = Api::<corev1::Node>::all(self.client.clone());
        let list = api.list(&ListParams::default()).await.map_err(classify)?;
        Ok(list.items.into_iter().map(node_state).collect())
    }

    async fn list_pods(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<PodState>, ApiError> {
        let api = Api::<corev1::Pod>::namespaced(self.client.clone(), namespace);
        let params = ListParams::default().labels(label_selector);
        let list = api.list(&params).await.map_err(classify)?;
        Ok(list.items.into_iter().map(pod_state).collect())
    }
}

fn deployment_state(deployment: appsv1::Deployment) -> DeploymentState {
    DeploymentState {
        name: deployment.metadata.name.unwrap_or_default(),
        // The apiserver defaults replicas to 1 when the spec omits it.
        desired_replicas: deployment
            .spec
            .as_ref()
            .and_then(|spec| spec.replicas)
            .unwrap_or(1),
        available_replicas: deployment
            .status
            .as_ref()
            .and_then(|status| status.available_replicas)
            .unwrap_or(0),
    }
}

fn service_state(service: corev1::Service) -> ServiceState {
    let spec = service.spec.unwrap_or_default();
    ServiceState {
        name: service.metadata.name.unwrap_or_default(),
        service_type: spec.type_.unwrap_or_else(|| "ClusterIP".to_string()),
        cluster_ip: spec.cluster_ip,
        ports: spec
            .ports
            .unwrap_or_default()
            .into_iter()
            .map(|port| ServicePortState {
                port: port.port,
                target_port: port.target_port.map(|target| match target {
                    IntOrString::Int(n) => n.to_string(),
                    IntOrString::String(s) => s,
                }),
                node_port: port.node_port,
            })
            .collect(),
    }
}

fn node_state(node: corev1::Node) -> NodeState {
    NodeState {
        name: node.metadata.name.unwrap_or_default(),
        addresses: node
            .status
            .and_then(|status| status.addresses)
            .unwrap_or_default()
            .into_iter()
            .map(|address| NodeAddress {
                address_type: address.type_,
                address: address.address,
            })
            .collect(),
    }
}

fn pod_state(pod: corev1::Pod) -> PodState {
    PodState {
        name: pod.metadata.name.unwrap_or_default(),
        phase: pod
            .status
            .and_then(|status| status.phase)
            .unwrap_or_else(|| "Unknown".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::core::ErrorResponse;

    fn api_error(code: u16, reason: &str) -> kube::Error {
        kube::Error::Api(ErrorResponse {
            status: "Failure".to_string(),
            message: format!("{reason} happened"),
            reason: reason.to_string(),
            code,
        })
    }

    #[test]
    fn classifies_status_codes() {
        assert!(matches!(classify(api_error(404, "NotFound")), ApiError::NotFound));
        assert!(matches!(
            classify(api_error(409, "AlreadyExists")),
            ApiError::Conflict(_)
        ));
        assert!(matches!(
            classify(api_error(401, "Unauthorized")),
            ApiError::Unauthorized(_)
        ));
        assert!(matches!(
            classify(api_error(403, "Forbidden")),
            ApiError::Unauthorized(_)
        ));
        assert!(matches!(
            classify(api_error(503, "ServiceUnavailable")),
            ApiError::Unavailable(_)
        ));
        assert!(matches!(
            classify(api_error(500, "InternalError")),
            ApiError::Other(_)
        ));
    }

    #[test]
    fn deployment_state_defaults() {
        let deployment = appsv1::Deployment::default();
        let state = deployment_state(deployment);
        assert_eq!(state.desired_replicas, 1);
        assert_eq!(state.available_replicas, 0);
    }

    #[test]
    fn service_state_converts_ports() {
        let service: corev1::Service = serde_json::from_value(serde_json::json!({
            "metadata": { "name": "web" },
            "spec": {
                "type": "NodePort",
                "ports": [
                    { "port": 80, "targetPort": 8000, "nodePort": 30080 }
                ]
            }
        }))
        .unwrap();
        let state = service_state(service);
        assert_eq!(state.service_type, "NodePort");
        assert_eq!(state.ports.len(), 1);
        assert_eq!(state.ports[0].port, 80);
        assert_eq!(state.ports[0].target_port.as_deref(), Some("8000"));
        assert_eq!(state.ports[0].node_port, Some(30080));
    }
}
