use tracing::warn;

use crate::cluster::{ClusterOps, DeploymentState, NodeState, ServiceState};

/// Read-only snapshot of the namespace, assembled for reporting. Collection
/// never fails the workflow; read errors are captured alongside whatever was
/// observed.
#[derive(Debug, Default)]
pub struct ClusterStatus {
    pub deployments: Vec<DeploymentState>,
    pub services: Vec<ServiceState>,
    pub nodes: Vec<NodeState>,
    pub errors: Vec<String>,
}

pub async fn collect<C: ClusterOps>(cluster: &C, namespace: &str) -> ClusterStatus {
    let mut status = ClusterStatus::default();

    match cluster.list_deployments(namespace).await {
        Ok(deployments) => status.deployments = deployments,
        Err(err) => {
            warn!("could not list deployments: {err}");
            status.errors.push(format!("deployments: {err}"));
        }
    }
    match cluster.list_services(namespace).await {
        Ok(services) => status.services = services,
        Err(err) => {
            warn!("could not list services: {err}");
            status.errors.push(format!("services: {err}"));
        }
    }
    match cluster.list_nodes().await {
        Ok(nodes) => status.nodes = nodes,
        Err(err) => {
            warn!("could not list nodes: {err}");
            status.errors.push(format!("nodes: {err}"));
        }
    }

    status
}

pub fn render(status: &ClusterStatus) {
    println!("\nCurrent deployments:");
    if status.deployments.is_empty() {
        println!("  No deployments found.");
    }
    for deployment in &status.deployments {
        println!(
            "  {} - replicas: {}/{}",
            deployment.name, deployment.available_replicas, deployment.desired_replicas
        );
    }

    println!("\nCurrent services:");
    if status.services.is_empty() {
        println!("  No services found.");
    }
    for service in &status.services {
        let port = service
            .ports
            .first()
            .map(|p| p.port.to_string())
            .unwrap_or_else(|| "N/A".to_string());
        println!(
            "  {} - type: {} - port: {}",
            service.name, service.service_type, port
        );
    }

    println!("\nAvailable nodes:");
    if status.nodes.is_empty() {
        println!("  No nodes found.");
    }
    for node in &status.nodes {
        println!("  {}", node.name);
        for address in &node.addresses {
            println!("    {}: {}", address.address_type, address.address);
        }
    }

    for error in &status.errors {
        println!("  (could not read {error})");
    }
}

/// Preferred display address for a node: ExternalIP when present, otherwise
/// InternalIP.
pub fn display_address(node: &NodeState) -> Option<&str> {
    let mut internal = None;
    for address in &node.addresses {
        match address.address_type.as_str() {
            "ExternalIP" => return Some(&address.address),
            "InternalIP" => internal = Some(address.address.as_str()),
            _ => {}
        }
    }
    internal
}

/// Externally reachable URL for a NodePort service, built from the first
/// node's preferred address. Anything other than a NodePort service with a
/// node port and a reachable node yields `None`.
pub fn service_url(service: &ServiceState, nodes: &[NodeState]) -> Option<String> {
    if service.service_type != "NodePort" {
        return None;
    }
    let node_port = service.ports.first().and_then(|port| port.node_port)?;
    let address = nodes.first().and_then(display_address)?;
    Some(format!("http://{address}:{node_port}"))
}

/// Looks up the service and the cluster nodes, then derives the URL.
/// Failures are reported as "no URL", never raised.
pub async fn application_url<C: ClusterOps>(
    cluster: &C,
    namespace: &str,
    service_name: &str,
) -> Option<String> {
    let service = match cluster.get_service(namespace, service_name).await {
        Ok(service) => service,
        Err(err) => {
            warn!("could not read service {service_name}: {err}");
            return None;
        }
    };
    let nodes = match cluster.list_nodes().await {
        Ok(nodes) => nodes,
        Err(err) => {
            warn!("could not list nodes: {err}");
            return None;
        }
    };
    service_url(&service, &nodes)
}

/// Prints service details plus every node's address pairs.
pub async fn describe_service<C: ClusterOps>(cluster: &C, namespace: &str, service_name: &str) {
    println!("\nDetailed service information:");
    match cluster.get_service(namespace, service_name).await {
        Ok(service) => {
            println!("  Name: {}", service.name);
            println!("  Type: {}", service.service_type);
            println!(
                "  Cluster IP: {}",
                service.cluster_ip.as_deref().unwrap_or("None")
            );
            for port in &service.ports {
                println!(
                    "  Port: {} -> {}",
                    port.port,
                    port.target_port.as_deref().unwrap_or("N/A")
                );
                if let Some(node_port) = port.node_port {
                    println!("  Node port: {node_port}");
                }
            }
        }
        Err(err) => println!("  Could not read service {service_name}: {err}"),
    }

    match cluster.list_nodes().await {
        Ok(nodes) => {
            println!("\nAvailable nodes:");
            for node in &nodes {
                println!("  {}", node.name);
                for address in &node.addresses {
                    println!("    {}: {}", address.address_type, address.address);
                }
            }
        }
        Err(err) => println!("  Could not list nodes: {err}"),
    }
}
