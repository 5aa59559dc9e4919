use std::fmt;

use tokio::time::sleep;
use tracing::{info, warn};

use crate::cluster::{ApiError, ClusterOps};
use crate::config::ManagerConfig;
use crate::error::Error;
use crate::manifest::{DesiredState, DocEntry, ResourceDocument, ResourceKind};

/// Per-document reconciliation outcome.
#[derive(Debug)]
pub enum Outcome {
    Created,
    Replaced,
    Skipped(String),
    Failed(Error),
}

impl Outcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Created | Outcome::Replaced)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Created => write!(f, "created"),
            Outcome::Replaced => write!(f, "replaced"),
            Outcome::Skipped(reason) => write!(f, "skipped ({reason})"),
            Outcome::Failed(err) => write!(f, "failed: {err}"),
        }
    }
}

#[derive(Debug)]
pub struct DocumentReport {
    pub index: usize,
    pub kind: Option<ResourceKind>,
    pub name: Option<String>,
    pub outcome: Outcome,
}

impl DocumentReport {
    pub fn describe(&self) -> String {
        match (&self.kind, &self.name) {
            (Some(kind), Some(name)) => {
                format!("document {} ({} {}): {}", self.index, kind, name, self.outcome)
            }
            _ => format!("document {}: {}", self.index, self.outcome),
        }
    }
}

/// Aggregate result for one batch. One document's failure never aborts the
/// batch; the caller decides what to make of the failed entries.
#[derive(Debug)]
pub struct BatchReport {
    pub documents: Vec<DocumentReport>,
}

impl BatchReport {
    pub fn failed_count(&self) -> usize {
        self.documents
            .iter()
            .filter(|doc| doc.outcome.is_failed())
            .count()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed_count() == 0
    }
}

/// Drives declared resources to existence, replacing any prior instance by
/// deleting it first.
pub struct Reconciler<'a, C> {
    cluster: &'a C,
    config: &'a ManagerConfig,
}

impl<'a, C: ClusterOps> Reconciler<'a, C> {
    pub fn new(cluster: &'a C, config: &'a ManagerConfig) -> Self {
        Reconciler { cluster, config }
    }

    /// Processes every document in manifest order. Documents are independent:
    /// a failure is recorded and the remaining documents are still attempted.
    pub async fn apply(&self, desired: &DesiredState) -> BatchReport {
        let mut documents = Vec::with_capacity(desired.docs.len());
        for (index, entry) in desired.docs.iter().enumerate() {
            let report = match entry {
                DocEntry::Empty => {
                    info!("document {index} is empty, skipping");
                    DocumentReport {
                        index,
                        kind: None,
                        name: None,
                        outcome: Outcome::Skipped("empty document".to_string()),
                    }
                }
                DocEntry::Rejected(err) => {
                    warn!("document {index} rejected: {err}");
                    DocumentReport {
                        index,
                        kind: None,
                        name: None,
                        outcome: Outcome::Failed(Error::Parse(err.clone())),
                    }
                }
                DocEntry::Resource(doc) => {
                    info!("processing document {index}: {} {}", doc.kind(), doc.name());
                    DocumentReport {
                        index,
                        kind: Some(doc.kind()),
                        name: Some(doc.name().to_string()),
                        outcome: self.apply_one(doc).await,
                    }
                }
            };
            documents.push(report);
        }
        BatchReport { documents }
    }

    /// Replace-by-delete-then-create for one declared resource.
    async fn apply_one(&self, doc: &ResourceDocument) -> Outcome {
        let existed = match self
            .cluster
            .delete(doc.kind(), doc.namespace(), doc.name())
            .await
        {
            Ok(()) => {
                info!(
                    "deleted existing {} {}/{}",
                    doc.kind(),
                    doc.namespace(),
                    doc.name()
                );
                // Give the cluster time to tear down dependent objects
                // before recreating under the same name.
                sleep(self.config.settle_for(doc.kind())).await;
                true
            }
            // Already absent; nothing to replace.
            Err(ApiError::NotFound) => false,
            // Best effort: a failed delete is logged and creation is still
            // attempted.
            Err(err) => {
                warn!(
                    "could not delete {} {}/{}: {err}",
                    doc.kind(),
                    doc.namespace(),
                    doc.name()
                );
                false
            }
        };

        match self
            .cluster
            .create(doc.kind(), doc.namespace(), doc.manifest())
            .await
        {
            Ok(()) => {
                info!(
                    "{} {}/{} created",
                    doc.kind(),
                    doc.namespace(),
                    doc.name()
                );
                if existed {
                    Outcome::Replaced
                } else {
                    Outcome::Created
                }
            }
            Err(err) => {
                warn!(
                    "failed to create {} {}/{}: {err}",
                    doc.kind(),
                    doc.namespace(),
                    doc.name()
                );
                Outcome::Failed(Error::Api(err))
            }
        }
    }

    /// Deletes the configured managed resources. Absent resources are not an
    /// error; returns how many were actually removed.
    pub async fn cleanup(&self) -> usize {
        let mut removed = 0;
        let deployments = self
            .config
            .managed_deployments
            .iter()
            .map(|name| (ResourceKind::Deployment, name));
        let services = self
            .config
            .managed_services
            .iter()
            .map(|name| (ResourceKind::Service, name));

        for (kind, name) in deployments.chain(services) {
            match self.cluster.delete(kind, &self.config.namespace, name).await {
                Ok(()) => {
                    info!("deleted {kind} {name}");
                    removed += 1;
                }
                Err(ApiError::NotFound) => {}
                Err(err) => warn!("could not delete {kind} {name}: {err}"),
            }
        }
        removed
    }
}
