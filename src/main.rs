pub mod cluster;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod manifest;
pub mod reconcile;
pub mod status;
pub mod wait;

#[cfg(test)]
mod sim;

use std::env;

use anyhow::Result;
use kube::Client;
use tracing::warn;

use crate::cluster::{ClusterOps, KubeCluster};
use crate::config::ManagerConfig;
use crate::manifest::{parse_manifest, DocEntry, ResourceKind};
use crate::reconcile::Reconciler;
use crate::wait::{ReadinessWaiter, WaitOutcome};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let config = ManagerConfig::default();
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        println!("usage: cluster-manager <apply|status|url|cleanup|diagnose> [manifest]");
        return Ok(());
    }

    // Diagnosis shells out to the cluster CLI and needs no client.
    if args[1] == "diagnose" {
        diagnostics::comprehensive_diagnosis(&config);
        return Ok(());
    }

    // A client that cannot be established is fatal; nothing below makes
    // sense without one.
    let client = Client::try_default().await?;
    let cluster = KubeCluster::new(client);

    match args[1].as_str() {
        "apply" => {
            let path = args.get(2).map(String::as_str).unwrap_or("deployment.yaml");
            // The run-wide deadline is cooperative: it fires at the next
            // suspension point of whatever step is in flight.
            match config.run_timeout {
                Some(limit) => {
                    tokio::time::timeout(limit, apply_workflow(&cluster, &config, path))
                        .await
                        .map_err(|_| error::Error::Timeout("the apply run".to_string()))??;
                }
                None => apply_workflow(&cluster, &config, path).await?,
            }
        }
        "status" => {
            let report = status::collect(&cluster, &config.namespace).await;
            status::render(&report);
        }
        "url" => {
            match status::application_url(&cluster, &config.namespace, &config.service_name).await {
                Some(url) => println!("Application URL: {url}"),
                None => println!("Application URL: unavailable"),
            }
        }
        "cleanup" => {
            let removed = Reconciler::new(&cluster, &config).cleanup().await;
            println!("Removed {removed} managed resource(s).");
        }
        other => {
            warn!("unknown command {other}; use apply, status, url, cleanup or diagnose");
        }
    }
    Ok(())
}

/// The full run: clean up prior managed resources, reconcile the manifest,
/// wait for the deployments it declared, then report how to reach the
/// application. One document's failure never aborts the rest of the batch.
async fn apply_workflow<C: ClusterOps>(cluster: &C, config: &ManagerConfig, path: &str) -> Result<()> {
    config.print_summary();

    println!("\nCleaning up existing managed resources...");
    let reconciler = Reconciler::new(cluster, config);
    reconciler.cleanup().await;

    let before = status::collect(cluster, &config.namespace).await;
    status::render(&before);

    println!("\nApplying manifest {path}...");
    let input = std::fs::read_to_string(path)?;
    let desired = parse_manifest(&input, &config.namespace);
    let report = reconciler.apply(&desired).await;
    for document in &report.documents {
        println!("  {}", document.describe());
    }

    // Wait for every deployment the batch actually applied to converge.
    let waiter = ReadinessWaiter::new(cluster, config);
    let selector = config.label_selector();
    for (entry, document) in desired.docs.iter().zip(&report.documents) {
        let DocEntry::Resource(doc) = entry else {
            continue;
        };
        if doc.kind() != ResourceKind::Deployment || !document.outcome.is_applied() {
            continue;
        }
        let desired_replicas = doc.replicas().unwrap_or(config.replicas);
        match waiter
            .wait_ready(doc.namespace(), doc.name(), desired_replicas, &selector)
            .await
        {
            Ok(WaitOutcome::Ready { pods }) => {
                println!("Deployment {} is ready with {} pods.", doc.name(), pods.len());
            }
            Ok(WaitOutcome::TimedOut { elapsed }) => {
                println!(
                    "Timed out after {}s waiting for deployment {}.",
                    elapsed.as_secs(),
                    doc.name()
                );
                diagnostics::comprehensive_diagnosis(config);
            }
            Err(err) => warn!("readiness check for {} failed: {err}", doc.name()),
        }
    }

    println!("\nGetting application access information...");
    status::describe_service(cluster, &config.namespace, &config.service_name).await;

    match status::application_url(cluster, &config.namespace, &config.service_name).await {
        Some(url) => {
            println!("\nYour application should be accessible at:");
            println!("  {url}");
            println!("  Try {url}/ or {url}/health");
        }
        None => println!("\nApplication URL: unavailable"),
    }

    let after = status::collect(cluster, &config.namespace).await;
    status::render(&after);

    println!("\nAll operations completed.");
    if !report.all_succeeded() {
        println!(
            "{} document(s) failed; see the lines above.",
            report.failed_count()
        );
    }
    Ok(())
}
