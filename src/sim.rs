//! In-memory cluster used by the tests: implements the facade over plain
//! maps so reconciliation, readiness and status paths can run against a
//! scripted cluster with no network.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::cluster::{
    ApiError, ClusterOps, DeploymentState, NodeState, PodState, ServicePortState, ServiceState,
};
use crate::manifest::ResourceKind;

type Key = (String, String);

#[derive(Default)]
struct Inner {
    deployments: HashMap<Key, Value>,
    services: HashMap<Key, Value>,
    nodes: Vec<NodeState>,
    pods: Vec<PodState>,
    // Number of deployment gets after which available == desired.
    ready_after: u32,
    deployment_gets: u32,
    delete_calls: u32,
    create_error: Option<ApiError>,
    delete_error: Option<ApiError>,
    get_error: Option<ApiError>,
    list_error: Option<ApiError>,
    list_pods_error: Option<ApiError>,
}

pub struct FakeCluster {
    inner: Mutex<Inner>,
}

impl FakeCluster {
    pub fn new() -> Self {
        FakeCluster {
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn put_deployment(&self, namespace: &str, name: &str, manifest: Value) {
        self.inner
            .lock()
            .unwrap()
            .deployments
            .insert(key(namespace, name), manifest);
    }

    pub fn put_service(&self, namespace: &str, name: &str, manifest: Value) {
        self.inner
            .lock()
            .unwrap()
            .services
            .insert(key(namespace, name), manifest);
    }

    pub fn set_nodes(&self, nodes: Vec<NodeState>) {
        self.inner.lock().unwrap().nodes = nodes;
    }

    pub fn set_pods(&self, pods: Vec<PodState>) {
        self.inner.lock().unwrap().pods = pods;
    }

    pub fn ready_after(&self, gets: u32) {
        self.inner.lock().unwrap().ready_after = gets;
    }

    pub fn fail_create(&self, err: ApiError) {
        self.inner.lock().unwrap().create_error = Some(err);
    }

    pub fn fail_delete(&self, err: ApiError) {
        self.inner.lock().unwrap().delete_error = Some(err);
    }

    pub fn fail_get(&self, err: ApiError) {
        self.inner.lock().unwrap().get_error = Some(err);
    }

    pub fn fail_list(&self, err: ApiError) {
        self.inner.lock().unwrap().list_error = Some(err);
    }

    pub fn fail_list_pods(&self, err: ApiError) {
        self.inner.lock().unwrap().list_pods_error = Some(err);
    }

    pub fn deployment_count(&self) -> usize {
        self.inner.lock().unwrap().deployments.len()
    }

    pub fn service_count(&self) -> usize {
        self.inner.lock().unwrap().services.len()
    }

    pub fn deployment_gets(&self) -> u32 {
        self.inner.lock().unwrap().deployment_gets
    }

    pub fn delete_calls(&self) -> u32 {
        self.inner.lock().unwrap().delete_calls
    }
}

fn key(namespace: &str, name: &str) -> Key {
    (namespace.to_string(), name.to_string())
}

fn declared_replicas(manifest: &Value) -> i32 {
    manifest
        .get("spec")
        .and_then(|spec| spec.get("replicas"))
        .and_then(Value::as_i64)
        .unwrap_or(1) as i32
}

fn deployment_state(name: &str, manifest: &Value, ready: bool) -> DeploymentState {
    let desired = declared_replicas(manifest);
    DeploymentState {
        name: name.to_string(),
        desired_replicas: desired,
        available_replicas: if ready { desired } else { 0 },
    }
}

fn service_state(name: &str, manifest: &Value) -> ServiceState {
    let spec = manifest.get("spec");
    ServiceState {
        name: name.to_string(),
        service_type: spec
            .and_then(|s| s.get("type"))
            .and_then(Value::as_str)
            .unwrap_or("ClusterIP")
            .to_string(),
        cluster_ip: spec
            .and_then(|s| s.get("clusterIP"))
            .and_then(Value::as_str)
            .map(str::to_string),
        ports: spec
            .and_then(|s| s.get("ports"))
            .and_then(Value::as_array)
            .map(|ports| {
                ports
                    .iter()
                    .map(|port| ServicePortState {
                        port: port.get("port").and_then(Value::as_i64).unwrap_or(0) as i32,
                        target_port: port
                            .get("targetPort")
                            .map(|target| target.to_string().trim_matches('"').to_string()),
                        node_port: port
                            .get("nodePort")
                            .and_then(Value::as_i64)
                            .map(|n| n as i32),
                    })
                    .collect()
            })
            .unwrap_or_default(),
    }
}

#[async_trait]
impl ClusterOps for FakeCluster {
    async fn create(
        &self,
        kind: ResourceKind,
        namespace: &str,
        manifest: &Value,
    ) -> Result<(), ApiError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(err) = inner.create_error.clone() {
            return Err(err);
        }
        let name = manifest
            .get("metadata")
            .and_then(|m| m.get("name"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let store = match kind {
            ResourceKind::Deployment => &mut inner.deployments,
            ResourceKind::Service => &mut inner.services,
        };
        let k = key(namespace, &name);
        if store.contains_key(&k) {
            return Err(ApiError::Conflict(format!("{kind} {name} already exists")));
        }
        store.insert(k, manifest.clone());
        Ok(())
    }

    async fn delete(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
    ) -> Result<(), ApiError> {
        let mut inner = self.inner.lock().unwrap();
        inner.delete_calls += 1;
        if let Some(err) = inner.delete_error.clone() {
            return Err(err);
        }
        let store = match kind {
            ResourceKind::Deployment => &mut inner.deployments,
            ResourceKind::Service => &mut inner.services,
        };
        match store.remove(&key(namespace, name)) {
            Some(_) => Ok(()),
            None => Err(ApiError::NotFound),
        }
    }

    async fn get_deployment(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<DeploymentState, ApiError> {
        let mut inner = self.inner.lock().unwrap();
        inner.deployment_gets += 1;
        if let Some(err) = inner.get_error.clone() {
            return Err(err);
        }
        let ready = inner.deployment_gets >= inner.ready_after;
        match inner.deployments.get(&key(namespace, name)) {
            Some(manifest) => Ok(deployment_state(name, manifest, ready)),
            None => Err(ApiError::NotFound),
        }
    }

    async fn get_service(&self, namespace: &str, name: &str) -> Result<ServiceState, ApiError> {
        let inner = self.inner.lock().unwrap();
        if let Some(err) = inner.get_error.clone() {
            return Err(err);
        }
        match inner.services.get(&key(namespace, name)) {
            Some(manifest) => Ok(service_state(name, manifest)),
            None => Err(ApiError::NotFound),
        }
    }

    async fn list_deployments(&self, namespace: &str) -> Result<Vec<DeploymentState>, ApiError> {
        let inner = self.inner.lock().unwrap();
        if let Some(err) = inner.list_error.clone() {
            return Err(err);
        }
        let ready = inner.deployment_gets >= inner.ready_after;
        Ok(inner
            .deployments
            .iter()
            .filter(|((ns, _), _)| ns == namespace)
            .map(|((_, name), manifest)| deployment_state(name, manifest, ready))
            .collect())
    }

    async fn list_services(&self, namespace: &str) -> Result<Vec<ServiceState>, ApiError> {
        let inner = self.inner.lock().unwrap();
        if let Some(err) = inner.list_error.clone() {
            return Err(err);
        }
        Ok(inner
            .services
            .iter()
            .filter(|((ns, _), _)| ns == namespace)
            .map(|((_, name), manifest)| service_state(name, manifest))
            .collect())
    }

    async fn list_nodes(&self) -> Result<Vec<NodeState>, ApiError> {
        let inner = self.inner.lock().unwrap();
        if let Some(err) = inner.list_error.clone() {
            return Err(err);
        }
        Ok(inner.nodes.clone())
    }

    async fn list_pods(
        &self,
        _namespace: &str,
        _label_selector: &str,
    ) -> Result<Vec<PodState>, ApiError> {
        let inner = self.inner.lock().unwrap();
        if let Some(err) = inner.list_pods_error.clone() {
            return Err(err);
        }
        Ok(inner.pods.clone())
    }
}
