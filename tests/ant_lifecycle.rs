//! Full ant lifecycles against a stub siad executable and a mock API
//!
//! The stub is a shell script that ignores siad's flags and sleeps, so the
//! process side (spawn, stop, kill) is real while the API is served by
//! `MockSiad`.
#![cfg(unix)]

mod common;

use std::time::{Duration, Instant};

use tempfile::TempDir;

use common::{config, process_alive, stub_pid};
use sia_ant::ledger::LedgerError;
use sia_ant::process::SupervisorError;
use sia_ant::runner::RunnerError;
use sia_ant::{Ant, AntError};
use sia_ant_testkit::{MockSiad, PseudoGenerator};

#[tokio::test]
async fn test_ant_without_jobs() {
    let siad = MockSiad::start().await;
    let dir = TempDir::new().unwrap();

    let mut ant = Ant::new(config(&siad, &dir)).await.unwrap();
    assert_eq!(ant.api_addr(), siad.api_addr());
    assert_eq!(ant.block_height(), 0);
    assert!(ant.seen_blocks().is_empty());
    assert!(ant.runner().active_jobs().is_empty());
    assert_eq!(siad.state().request_count("/wallet/init"), 1);

    let pid = ant.pid().unwrap();
    assert!(process_alive(pid));

    ant.close().await.unwrap();
    assert!(!process_alive(pid));
    assert!(siad.state().request_count("/daemon/stop") >= 1);
}

#[tokio::test]
async fn test_ant_runs_jobs_and_balance_maintainer() {
    let siad = MockSiad::start().await;
    let dir = TempDir::new().unwrap();
    let mut config = config(&siad, &dir);
    config.jobs = vec!["gateway".to_string()];
    config.desired_currency = 1000;

    let mut ant = Ant::new(config).await.unwrap();
    assert_eq!(ant.runner().active_jobs(), vec!["gateway", "balance"]);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(siad.state().is_mining());
    assert!(siad.state().request_count("/gateway") >= 2);

    ant.close().await.unwrap();
    assert!(ant.runner().active_jobs().is_empty());
    assert!(ant.runner().is_stopped());
}

#[tokio::test]
async fn test_no_requests_after_close() {
    let siad = MockSiad::start().await;
    let dir = TempDir::new().unwrap();
    let mut config = config(&siad, &dir);
    config.jobs = vec!["gateway".to_string(), "miner".to_string()];

    let mut ant = Ant::new(config).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    ant.close().await.unwrap();

    let after_close = siad.state().total_requests();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(siad.state().total_requests(), after_close);
}

#[tokio::test]
async fn test_close_twice() {
    let siad = MockSiad::start().await;
    let dir = TempDir::new().unwrap();

    let mut ant = Ant::new(config(&siad, &dir)).await.unwrap();
    ant.close().await.unwrap();
    let stops = siad.state().request_count("/daemon/stop");

    ant.close().await.unwrap();
    assert_eq!(siad.state().request_count("/daemon/stop"), stops);
}

#[tokio::test]
async fn test_unknown_job_is_skipped() {
    let siad = MockSiad::start().await;
    let dir = TempDir::new().unwrap();
    let mut config = config(&siad, &dir);
    config.jobs = vec!["teleporter".to_string(), "gateway".to_string()];

    let mut ant = Ant::new(config).await.unwrap();
    assert_eq!(ant.runner().active_jobs(), vec!["gateway"]);
    ant.close().await.unwrap();
}

#[tokio::test]
async fn test_strict_unknown_job_tears_down_siad() {
    let siad = MockSiad::start().await;
    let dir = TempDir::new().unwrap();
    let mut config = config(&siad, &dir);
    config.jobs = vec!["gateway".to_string(), "teleporter".to_string()];
    config.strict_jobs = true;

    let err = Ant::new(config).await.unwrap_err();
    assert!(matches!(err, AntError::Runner(RunnerError::UnknownJob(name)) if name == "teleporter"));
    assert!(siad.state().request_count("/daemon/stop") >= 1);

    // The gateway job launched before the failure was stopped too
    let polls = siad.state().request_count("/gateway");
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(siad.state().request_count("/gateway"), polls);
}

#[tokio::test]
async fn test_wallet_init_failure_tears_down_siad() {
    let siad = MockSiad::start().await;
    siad.state().fail_wallet_init(true);
    let dir = TempDir::new().unwrap();

    let err = Ant::new(config(&siad, &dir)).await.unwrap_err();
    assert!(matches!(err, AntError::Runner(RunnerError::WalletInit(_))));
    assert_eq!(siad.state().request_count("/daemon/stop"), 1);
}

#[tokio::test]
async fn test_missing_binary() {
    let siad = MockSiad::start().await;
    let dir = TempDir::new().unwrap();
    let mut config = config(&siad, &dir);
    config.siad_path = dir.path().join("no-such-siad").to_string_lossy().into_owned();

    let err = Ant::new(config).await.unwrap_err();
    assert!(matches!(err, AntError::Supervisor(SupervisorError::SpawnFailed { .. })));
    assert_eq!(siad.state().total_requests(), 0);
}

#[tokio::test]
async fn test_api_never_ready() {
    let siad = MockSiad::start().await;
    siad.state().set_ready(false);
    let dir = TempDir::new().unwrap();
    let mut config = config(&siad, &dir);
    config.readiness_timeout = Duration::from_millis(300);

    let start = Instant::now();
    let err = Ant::new(config).await.unwrap_err();
    assert!(matches!(err, AntError::Supervisor(SupervisorError::ApiTimeout(_))));
    assert!(start.elapsed() >= Duration::from_millis(300));
    assert_eq!(siad.state().request_count("/wallet/init"), 0);
    assert!(siad.state().request_count("/daemon/stop") >= 1);

    // The mock acknowledged the stop but the stub ignores it; siad must
    // still be gone
    let pid = stub_pid(dir.path()).await;
    assert!(!process_alive(pid));
}

#[tokio::test]
async fn test_api_ready_after_delay() {
    let siad = MockSiad::start().await;
    siad.state().set_ready(false);
    let dir = TempDir::new().unwrap();

    let state = siad.state().clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        state.set_ready(true);
    });

    let mut ant = Ant::new(config(&siad, &dir)).await.unwrap();
    assert!(siad.state().request_count("/consensus") >= 2);
    ant.close().await.unwrap();
}

#[tokio::test]
async fn test_sync_block_records_and_detects_fork() {
    let siad = MockSiad::start().await;
    let dir = TempDir::new().unwrap();
    let mut rng = PseudoGenerator::new(11);

    let mut ant = Ant::new(config(&siad, &dir)).await.unwrap();
    for (height, id) in rng.random_chain(1, 3) {
        siad.state().set_tip(height, id.clone());
        assert_eq!(ant.sync_block().await.unwrap(), (height, id));
    }
    assert_eq!(ant.block_height(), 3);
    assert_eq!(ant.seen_blocks().len(), 3);

    // Same tip twice is not a fork
    ant.sync_block().await.unwrap();

    let recorded = ant.seen_blocks().get(3).unwrap();
    let other = rng.random_block_id();
    siad.state().set_tip(3, other.clone());
    let err = ant.sync_block().await.unwrap_err();
    assert!(matches!(
        err,
        AntError::Ledger(LedgerError::Fork { height: 3, recorded: r, observed: o })
            if r == recorded && o == other
    ));
    assert_eq!(ant.seen_blocks().get(3), Some(recorded));

    ant.close().await.unwrap();
}

#[tokio::test]
async fn test_close_interrupts_siad_when_api_stop_fails() {
    let siad = MockSiad::start().await;
    siad.state().fail_daemon_stop(true);
    let dir = TempDir::new().unwrap();
    let mut config = config(&siad, &dir);
    config.shutdown_grace = Duration::from_secs(10);

    let mut ant = Ant::new(config).await.unwrap();
    let start = Instant::now();
    ant.close().await.unwrap();

    // SIGINT ends the stub long before the grace period would force a kill
    assert!(start.elapsed() < Duration::from_secs(5));
    let status = ant.wait().await.unwrap();
    assert!(!status.success());
}

#[tokio::test]
async fn test_close_after_siad_exited() {
    let siad = MockSiad::start().await;
    let dir = TempDir::new().unwrap();

    let mut ant = Ant::new(config(&siad, &dir)).await.unwrap();
    let pid = ant.pid().unwrap();
    unsafe {
        libc::kill(pid as libc::pid_t, libc::SIGKILL);
    }
    ant.wait().await.unwrap();

    ant.close().await.unwrap();
    assert_eq!(siad.state().request_count("/daemon/stop"), 0);
}
