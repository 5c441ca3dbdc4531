use crate::error::MapMakerError;

use serde::Serialize;

/// Trait for dataset operations.
///
/// This forms the contract between the API layer and operations. An operation owns everything it
/// needs to run, so that it can be moved onto a worker thread while the request handler waits
/// for its result.
pub trait Operation: Send + 'static {
    /// Record returned to the client
    type Output: Serialize + Send + 'static;

    /// Execute the operation.
    ///
    /// This performs blocking I/O and is called with the dataset lock held.
    fn execute(self) -> Result<Self::Output, MapMakerError>;
}
