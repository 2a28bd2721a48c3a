//! Job runner
//!
//! Owns the API client, the wallet credential and every job task spawned
//! against one siad. All tasks share a single cancellation token; `stop`
//! fires it and waits until each task has returned.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span};

use crate::client::{SiadClient, SiadError};
use crate::config::JobConfig;
use crate::jobs::{Job, JobContext, registry};

/// Errors raised by the job runner
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("Client error: {0}")]
    Client(#[from] SiadError),

    #[error("Failed to initialize wallet: {0}")]
    WalletInit(#[source] SiadError),

    #[error("Unknown job: {0}")]
    UnknownJob(String),

    #[error("Job runner has been stopped")]
    Stopped,
}

/// Runs jobs against one siad
#[derive(Debug)]
pub struct JobRunner {
    client: Arc<SiadClient>,
    wallet_password: Arc<str>,
    label: Arc<str>,
    settings: HashMap<String, JobConfig>,
    cancel: CancellationToken,
    tasks: Mutex<JoinSet<()>>,
    active: Arc<Mutex<Vec<&'static str>>>,
    /// Serializes concurrent `stop` calls so each one waits for the drain
    stopping: tokio::sync::Mutex<()>,
}

impl JobRunner {
    /// Connect to siad at `api_addr` and initialize a fresh wallet
    ///
    /// The API is expected to belong to a newly created node. `label`
    /// (normally the data directory) only identifies the runner in logs.
    pub async fn new(
        api_addr: &str,
        auth_password: Option<&str>,
        label: &str,
    ) -> Result<Self, RunnerError> {
        let client = SiadClient::new(api_addr, auth_password)?;
        let wallet = client.wallet_init().await.map_err(RunnerError::WalletInit)?;
        info!(label, api_addr, "Wallet initialized");

        Ok(Self {
            client: Arc::new(client),
            wallet_password: Arc::from(wallet.primaryseed),
            label: Arc::from(label),
            settings: HashMap::new(),
            cancel: CancellationToken::new(),
            tasks: Mutex::new(JoinSet::new()),
            active: Arc::new(Mutex::new(Vec::new())),
            stopping: tokio::sync::Mutex::new(()),
        })
    }

    /// Override job pacing (job_name -> config)
    pub fn with_settings(mut self, settings: HashMap<String, JobConfig>) -> Self {
        self.settings = settings;
        self
    }

    pub fn client(&self) -> &Arc<SiadClient> {
        &self.client
    }

    /// Primary seed of the wallet created at construction
    pub fn wallet_password(&self) -> &str {
        &self.wallet_password
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Names of launched jobs that have not returned yet
    pub fn active_jobs(&self) -> Vec<&'static str> {
        self.active.lock().clone()
    }

    /// Launch a registered job by name
    pub fn launch(&self, name: &str) -> Result<(), RunnerError> {
        let job = registry::get_job(name).ok_or_else(|| RunnerError::UnknownJob(name.to_string()))?;
        self.spawn_job(job)
    }

    /// Launch any job as a new task
    pub fn spawn_job(&self, job: Arc<dyn Job>) -> Result<(), RunnerError> {
        let name = job.name();
        let defaults = job.default_options();
        let opts = self
            .settings
            .get(name)
            .map(|c| c.to_job_options(&defaults))
            .unwrap_or(defaults);

        let mut tasks = self.tasks.lock();
        if self.cancel.is_cancelled() {
            return Err(RunnerError::Stopped);
        }

        let ctx = JobContext::new(
            self.client.clone(),
            self.wallet_password.clone(),
            self.label.clone(),
            self.cancel.child_token(),
            opts,
        );
        let active = ActiveJob::register(&self.active, name);
        let span = info_span!("job", job = name, label = %self.label);

        tasks.spawn(
            async move {
                let _active = active;
                info!("Job started");
                job.run(ctx).await;
                info!("Job finished");
            }
            .instrument(span),
        );
        Ok(())
    }

    /// Cancel every job and wait for all of them to return
    ///
    /// Safe to call repeatedly and concurrently; every call returns only
    /// after the last task has exited.
    pub async fn stop(&self) {
        let _stopping = self.stopping.lock().await;

        let mut tasks = {
            let mut tasks = self.tasks.lock();
            self.cancel.cancel();
            std::mem::take(&mut *tasks)
        };

        if tasks.is_empty() {
            return;
        }
        debug!(label = %self.label, jobs = tasks.len(), "Stopping jobs");

        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                error!(label = %self.label, error = %e, "Job task panicked");
            }
        }
        info!(label = %self.label, "All jobs stopped");
    }
}

impl Drop for JobRunner {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Keeps a job listed in `active_jobs` until its task ends, panics included
struct ActiveJob {
    active: Arc<Mutex<Vec<&'static str>>>,
    name: &'static str,
}

impl ActiveJob {
    fn register(active: &Arc<Mutex<Vec<&'static str>>>, name: &'static str) -> Self {
        active.lock().push(name);
        Self {
            active: active.clone(),
            name,
        }
    }
}

impl Drop for ActiveJob {
    fn drop(&mut self) {
        let mut active = self.active.lock();
        if let Some(pos) = active.iter().position(|n| *n == self.name) {
            active.remove(pos);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sia_ant_testkit::mock::MockSiad;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Counts iterations until cancelled
    struct CountingJob {
        runs: Arc<AtomicUsize>,
        iterations: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Job for CountingJob {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn description(&self) -> &'static str {
            "Counts loop iterations"
        }

        async fn run(&self, ctx: JobContext) {
            self.runs.fetch_add(1, Ordering::SeqCst);
            while ctx.sleep(Duration::from_millis(5)).await {
                self.iterations.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    struct PanickingJob;

    #[async_trait]
    impl Job for PanickingJob {
        fn name(&self) -> &'static str {
            "panicking"
        }

        fn description(&self) -> &'static str {
            "Panics immediately"
        }

        async fn run(&self, _ctx: JobContext) {
            panic!("job exploded");
        }
    }

    fn counting_job() -> (Arc<CountingJob>, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let runs = Arc::new(AtomicUsize::new(0));
        let iterations = Arc::new(AtomicUsize::new(0));
        let job = Arc::new(CountingJob {
            runs: runs.clone(),
            iterations: iterations.clone(),
        });
        (job, runs, iterations)
    }

    #[tokio::test]
    async fn test_new_initializes_wallet() {
        let siad = MockSiad::start().await;
        let runner = JobRunner::new(&siad.api_addr(), None, "/tmp/ant").await.unwrap();

        assert_eq!(runner.wallet_password(), siad.state().primary_seed());
        assert_eq!(runner.label(), "/tmp/ant");
        assert_eq!(siad.state().request_count("/wallet/init"), 1);
        assert!(!runner.is_stopped());
    }

    #[tokio::test]
    async fn test_new_fails_when_wallet_init_fails() {
        let siad = MockSiad::start().await;
        siad.state().fail_wallet_init(true);

        let err = JobRunner::new(&siad.api_addr(), None, "ant").await.unwrap_err();
        assert!(matches!(err, RunnerError::WalletInit(_)));
    }

    #[tokio::test]
    async fn test_launch_unknown_job() {
        let siad = MockSiad::start().await;
        let runner = JobRunner::new(&siad.api_addr(), None, "ant").await.unwrap();

        let err = runner.launch("teleporter").unwrap_err();
        assert!(matches!(err, RunnerError::UnknownJob(name) if name == "teleporter"));
        assert!(runner.active_jobs().is_empty());
    }

    #[tokio::test]
    async fn test_stop_drains_jobs() {
        let siad = MockSiad::start().await;
        let runner = JobRunner::new(&siad.api_addr(), None, "ant").await.unwrap();
        let (job, runs, iterations) = counting_job();

        runner.spawn_job(job.clone()).unwrap();
        runner.spawn_job(job).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(runner.active_jobs(), vec!["counting", "counting"]);

        runner.stop().await;
        assert!(runner.is_stopped());
        assert!(runner.active_jobs().is_empty());
        assert_eq!(runs.load(Ordering::SeqCst), 2);

        // Nothing keeps running after stop returns
        let after_stop = iterations.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(iterations.load(Ordering::SeqCst), after_stop);
    }

    #[tokio::test]
    async fn test_stop_twice() {
        let siad = MockSiad::start().await;
        let runner = JobRunner::new(&siad.api_addr(), None, "ant").await.unwrap();
        let (job, runs, _) = counting_job();
        runner.spawn_job(job).unwrap();

        runner.stop().await;
        runner.stop().await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_stops_both_wait() {
        let siad = MockSiad::start().await;
        let runner = Arc::new(JobRunner::new(&siad.api_addr(), None, "ant").await.unwrap());
        let (job, _, _) = counting_job();
        runner.spawn_job(job).unwrap();

        let a = runner.clone();
        let b = runner.clone();
        let (_, _) = tokio::join!(
            tokio::spawn(async move { a.stop().await }),
            tokio::spawn(async move { b.stop().await }),
        );
        assert!(runner.active_jobs().is_empty());
    }

    #[tokio::test]
    async fn test_launch_after_stop_is_rejected() {
        let siad = MockSiad::start().await;
        let runner = JobRunner::new(&siad.api_addr(), None, "ant").await.unwrap();
        runner.stop().await;

        let (job, runs, _) = counting_job();
        assert!(matches!(runner.spawn_job(job), Err(RunnerError::Stopped)));
        assert!(matches!(runner.launch("gateway"), Err(RunnerError::Stopped)));
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_panicking_job_does_not_break_stop() {
        let siad = MockSiad::start().await;
        let runner = JobRunner::new(&siad.api_addr(), None, "ant").await.unwrap();
        runner.spawn_job(Arc::new(PanickingJob)).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        runner.stop().await;
        assert!(runner.active_jobs().is_empty());
    }

    #[tokio::test]
    async fn test_settings_override_job_options() {
        let siad = MockSiad::start().await;
        let settings = HashMap::from([(
            "gateway".to_string(),
            JobConfig {
                interval: Some(Duration::from_millis(10)),
                ..JobConfig::default()
            },
        )]);
        let runner = JobRunner::new(&siad.api_addr(), None, "ant")
            .await
            .unwrap()
            .with_settings(settings);

        runner.launch("gateway").unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        runner.stop().await;

        // A 30s default interval would have allowed a single request
        assert!(siad.state().request_count("/gateway") > 2);
    }
}
