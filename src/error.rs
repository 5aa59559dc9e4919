use thiserror::Error;

use crate::cluster::ApiError;
use crate::manifest::ParseError;

/// Failure taxonomy for one reconciliation run. Timeouts from the readiness
/// waiter are kept distinct from API failures so callers can tell a slow
/// rollout apart from a broken one.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to parse document: {0}")]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("timed out waiting for {0} to become ready")]
    Timeout(String),
}
