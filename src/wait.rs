use tokio::time::{sleep, Duration, Instant};
use tracing::{info, warn};

use crate::cluster::{ApiError, ClusterOps, PodState};
use crate::config::ManagerConfig;

/// Result of waiting for a deployment to converge.
#[derive(Debug)]
pub enum WaitOutcome {
    /// Observed available replicas reached the desired count. `pods` is the
    /// matching pod set at that moment, listed purely for reporting.
    Ready { pods: Vec<PodState> },
    /// The deadline elapsed before convergence. A deployment that never
    /// became visible also ends up here.
    TimedOut { elapsed: Duration },
}

/// Polls a deployment's observed status until it matches the desired replica
/// count or the deadline elapses. The deadline is elapsed wall clock, not a
/// poll count, so slow API round trips do not stretch the effective timeout.
pub struct ReadinessWaiter<'a, C> {
    cluster: &'a C,
    poll_interval: Duration,
    timeout: Duration,
}

impl<'a, C: ClusterOps> ReadinessWaiter<'a, C> {
    pub fn new(cluster: &'a C, config: &ManagerConfig) -> Self {
        ReadinessWaiter {
            cluster,
            poll_interval: config.poll_interval,
            timeout: config.readiness_timeout,
        }
    }

    pub async fn wait_ready(
        &self,
        namespace: &str,
        name: &str,
        desired_replicas: i32,
        label_selector: &str,
    ) -> Result<WaitOutcome, ApiError> {
        info!(
            "waiting for deployment {namespace}/{name} to reach {desired_replicas} available replicas"
        );
        let start = Instant::now();
        loop {
            match self.cluster.get_deployment(namespace, name).await {
                Ok(observed) => {
                    if observed.available_replicas == desired_replicas {
                        info!("all {desired_replicas} replicas of {name} are available");
                        let pods = self.report_pods(namespace, label_selector).await;
                        return Ok(WaitOutcome::Ready { pods });
                    }
                    info!(
                        "{}/{desired_replicas} replicas available...",
                        observed.available_replicas
                    );
                }
                // The deployment may not have propagated yet; keep polling
                // until the deadline.
                Err(ApiError::NotFound) => {
                    info!("deployment {namespace}/{name} not found yet, waiting...");
                }
                Err(err) => return Err(err),
            }

            if start.elapsed() >= self.timeout {
                warn!("timed out waiting for deployment {namespace}/{name}");
                return Ok(WaitOutcome::TimedOut {
                    elapsed: start.elapsed(),
                });
            }
            sleep(self.poll_interval).await;
        }
    }

    // Observability side effect only; a failure here never flips readiness.
    async fn report_pods(&self, namespace: &str, label_selector: &str) -> Vec<PodState> {
        match self.cluster.list_pods(namespace, label_selector).await {
            Ok(pods) => {
                for pod in &pods {
                    info!("pod {} - status: {}", pod.name, pod.phase);
                }
                pods
            }
            Err(err) => {
                warn!("could not list pods for report: {err}");
                Vec::new()
            }
        }
    }
}
