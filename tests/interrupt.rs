//! Interrupt handling once the ant is running
//!
//! Raising SIGINT reaches every signal listener in the process, so this lives
//! in its own test binary, away from ants that are still starting up.
#![cfg(unix)]

mod common;

use std::time::Duration;

use tempfile::TempDir;
use tokio::signal::unix::{SignalKind, signal};

use common::{config, process_alive};
use sia_ant::Ant;
use sia_ant_testkit::MockSiad;

#[tokio::test]
async fn test_interrupt_after_start_leaves_shutdown_to_close() {
    let siad = MockSiad::start().await;
    let dir = TempDir::new().unwrap();
    let mut config = config(&siad, &dir);
    config.jobs = vec!["gateway".to_string()];

    let mut ant = Ant::new(config).await.unwrap();
    let pid = ant.pid().unwrap();

    // Stands in for the CLI's Ctrl-C handler
    let mut interrupt = signal(SignalKind::interrupt()).unwrap();
    unsafe {
        libc::raise(libc::SIGINT);
    }
    tokio::time::timeout(Duration::from_secs(5), interrupt.recv())
        .await
        .unwrap();

    // siad keeps running and the jobs keep talking to it
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(siad.state().request_count("/daemon/stop"), 0);
    assert!(process_alive(pid));
    let before = siad.state().request_count("/gateway");
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(siad.state().request_count("/gateway") > before);
    assert_eq!(ant.runner().active_jobs(), vec!["gateway"]);

    ant.close().await.unwrap();
    assert!(ant.runner().active_jobs().is_empty());
    assert!(siad.state().request_count("/daemon/stop") >= 1);
    assert!(!process_alive(pid));
}
