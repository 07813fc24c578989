use crate::error::{DiscoveryError, Result};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error};

/// Fixed-size pool of async workers.
///
/// Every submitted job becomes a task that waits for one of `size` permits, so at
/// most `size` jobs make progress at once. `stop_wait` is the join barrier: it
/// returns once every job submitted so far has finished.
pub struct WorkerPool {
    name: &'static str,
    size: usize,
    permits: Arc<Semaphore>,
    tasks: Mutex<JoinSet<()>>,
}

impl WorkerPool {
    pub fn new(name: &'static str, size: usize) -> Result<Self> {
        if size == 0 {
            return Err(DiscoveryError::Config(format!(
                "{} pool needs at least one worker",
                name
            )));
        }

        Ok(Self {
            name,
            size,
            permits: Arc::new(Semaphore::new(size)),
            tasks: Mutex::new(JoinSet::new()),
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub async fn submit<F>(&self, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let permits = self.permits.clone();
        let name = self.name;

        self.tasks.lock().await.spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                debug!("{} pool closed before job started", name);
                return;
            };
            job.await;
        });
    }

    /// Wait for every submitted job. A panicked job is reported after the rest finish.
    pub async fn stop_wait(&self) -> Result<()> {
        let mut tasks = std::mem::take(&mut *self.tasks.lock().await);
        debug!("Draining {} pool ({} jobs)", self.name, tasks.len());

        let mut first_failure = None;
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!("{} pool job failed: {}", self.name, e);
                first_failure.get_or_insert(e);
            }
        }

        match first_failure {
            Some(e) => Err(DiscoveryError::Join(e)),
            None => Ok(()),
        }
    }
}
