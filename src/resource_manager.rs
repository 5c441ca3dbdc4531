//! Resource management

use crate::error::MapMakerError;
use crate::metrics::DATASET_LOCK_WAIT;

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// [crate::resource_manager::ResourceManager] guards access to datasets.
///
/// A single-permit Tokio Semaphore serialises every dataset read across all endpoints. The permit
/// is owned so that it can be moved onto the worker thread running the read, and it is released
/// when dropped on any exit path.
#[derive(Debug)]
pub struct ResourceManager {
    /// Semaphore for dataset access.
    datasets: Arc<Semaphore>,
}

impl ResourceManager {
    /// Returns a new ResourceManager object.
    pub fn new() -> Self {
        Self {
            datasets: Arc::new(Semaphore::new(1)),
        }
    }

    /// Acquire the dataset lock, waiting for any operation in progress to finish.
    pub async fn dataset(&self) -> Result<OwnedSemaphorePermit, MapMakerError> {
        let timer = DATASET_LOCK_WAIT.start_timer();
        let permit = self.datasets.clone().acquire_owned().await?;
        timer.observe_duration();
        Ok(permit)
    }
}

impl Default for ResourceManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use tokio::sync::TryAcquireError;

    #[tokio::test]
    async fn single_permit() {
        let rm = ResourceManager::new();
        let permit = rm.dataset().await.unwrap();
        // Check that there are no more resources (without blocking).
        assert_eq!(
            rm.datasets.try_acquire().err(),
            Some(TryAcquireError::NoPermits)
        );
        drop(permit);
        assert_eq!(1, rm.datasets.available_permits());
    }

    #[tokio::test]
    async fn waits_for_holder() {
        let rm = ResourceManager::new();
        let _permit = rm.dataset().await.unwrap();
        let waiting = tokio::time::timeout(Duration::from_millis(50), rm.dataset()).await;
        assert!(waiting.is_err());
    }

    #[tokio::test]
    async fn released_on_error() {
        let rm = ResourceManager::new();
        let permit = rm.dataset().await.unwrap();
        let result = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            Err::<(), _>(MapMakerError::InvalidSelection)
        })
        .await
        .unwrap();
        assert!(result.is_err());
        assert_eq!(1, rm.datasets.available_permits());
    }

    #[tokio::test]
    async fn released_on_panic() {
        let rm = ResourceManager::new();
        let permit = rm.dataset().await.unwrap();
        let result = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            panic!("read failed")
        })
        .await;
        assert!(result.is_err());
        assert_eq!(1, rm.datasets.available_permits());
    }
}
