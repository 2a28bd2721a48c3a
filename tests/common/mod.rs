//! Helpers shared by the integration tests
#![allow(dead_code)]

use std::collections::HashMap;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

use tempfile::TempDir;

use sia_ant::AntConfig;
use sia_ant::config::JobConfig;
use sia_ant_testkit::MockSiad;

/// Stand-in siad: records its pid in the data directory, then sleeps
///
/// siad is started as `siad --no-bootstrap --sia-directory <dir> ...`, so the
/// data directory is the third argument. Written once, before any test
/// spawns a child, so no forked process holds the script open for writing
/// when it is executed.
pub fn stub_siad() -> String {
    static STUB: OnceLock<TempDir> = OnceLock::new();
    let dir = STUB.get_or_init(|| {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("siad");
        std::fs::write(&path, "#!/bin/sh\necho $$ > \"$3/siad.pid\"\nexec sleep 600\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        dir
    });
    dir.path().join("siad").to_string_lossy().into_owned()
}

pub fn fast_job() -> JobConfig {
    JobConfig {
        interval: Some(Duration::from_millis(20)),
        retry_delay: Some(Duration::from_millis(10)),
        max_backoff: Some(Duration::from_millis(50)),
    }
}

pub fn config(siad: &MockSiad, data_dir: &TempDir) -> AntConfig {
    AntConfig {
        siad_path: stub_siad(),
        api_addr: siad.api_addr(),
        sia_directory: data_dir.path().to_string_lossy().into_owned(),
        readiness_timeout: Duration::from_secs(5),
        readiness_interval: Duration::from_millis(20),
        shutdown_grace: Duration::from_millis(300),
        job_settings: HashMap::from(
            ["gateway", "miner", "balance"].map(|name| (name.to_string(), fast_job())),
        ),
        ..AntConfig::default()
    }
}

/// Pid the stub wrote on startup
pub async fn stub_pid(data_dir: &Path) -> u32 {
    let path = data_dir.join("siad.pid");
    for _ in 0..200 {
        if let Ok(pid) = std::fs::read_to_string(&path) {
            if let Ok(pid) = pid.trim().parse() {
                return pid;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("stub siad never wrote {}", path.display());
}

pub fn process_alive(pid: u32) -> bool {
    unsafe { libc::kill(pid as libc::pid_t, 0) == 0 }
}
