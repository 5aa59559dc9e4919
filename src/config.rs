use std::time::Duration;

use crate::manifest::ResourceKind;

/// Run-wide configuration, built once at startup and passed by reference.
/// Nothing in here is mutated after construction.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Namespace used for documents that do not declare one.
    pub namespace: String,
    pub deployment_name: String,
    pub service_name: String,
    /// Value of the `app` label shared by the application's pods.
    pub app_label: String,
    /// Fallback desired replica count when a manifest does not state one.
    pub replicas: i32,
    pub container_port: i32,
    pub service_port: i32,
    pub service_target_port: i32,
    /// Delay between readiness polls.
    pub poll_interval: Duration,
    /// Overall readiness deadline, measured as elapsed wall clock.
    pub readiness_timeout: Duration,
    /// Optional deadline over a whole apply run. The per-deployment
    /// readiness deadline is capped by this when set.
    pub run_timeout: Option<Duration>,
    /// Pause after deleting a deployment before recreating it, so pod
    /// teardown can finish.
    pub deployment_settle: Duration,
    /// Same as above for services; endpoint teardown is faster.
    pub service_settle: Duration,
    /// Deployments owned by this manager, eligible for cleanup.
    pub managed_deployments: Vec<String>,
    /// Services owned by this manager, eligible for cleanup.
    pub managed_services: Vec<String>,
    /// Node names probed during diagnosis.
    pub diagnostic_nodes: Vec<String>,
    /// Substring identifying the application image in node image listings.
    pub image_filter: String,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        ManagerConfig {
            namespace: "default".to_string(),
            deployment_name: "python-flask-app".to_string(),
            service_name: "python-flask-service".to_string(),
            app_label: "python-flask".to_string(),
            replicas: 3,
            container_port: 8000,
            service_port: 80,
            service_target_port: 8000,
            poll_interval: Duration::from_secs(5),
            readiness_timeout: Duration::from_secs(300),
            run_timeout: None,
            deployment_settle: Duration::from_secs(5),
            service_settle: Duration::from_secs(2),
            managed_deployments: vec![
                "python-flask-app".to_string(),
                "python-deployment".to_string(),
            ],
            managed_services: vec!["python-flask-service".to_string()],
            diagnostic_nodes: vec![
                "cluster-custom-control-plane".to_string(),
                "cluster-custom-worker".to_string(),
                "cluster-custom-worker2".to_string(),
            ],
            image_filter: "python-flask".to_string(),
        }
    }
}

impl ManagerConfig {
    pub fn label_selector(&self) -> String {
        format!("app={}", self.app_label)
    }

    pub fn settle_for(&self, kind: ResourceKind) -> Duration {
        match kind {
            ResourceKind::Deployment => self.deployment_settle,
            ResourceKind::Service => self.service_settle,
        }
    }

    pub fn print_summary(&self) {
        println!("Current configuration:");
        println!("  Deployment name: {}", self.deployment_name);
        println!("  Service name: {}", self.service_name);
        println!("  App label: {}", self.app_label);
        println!("  Namespace: {}", self.namespace);
        println!("  Replicas: {}", self.replicas);
        println!("  Container port: {}", self.container_port);
        println!(
            "  Service port: {} -> {}",
            self.service_port, self.service_target_port
        );
    }
}
