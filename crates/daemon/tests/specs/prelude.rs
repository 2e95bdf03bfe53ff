//! Test helpers for behavioral specifications.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

// Spec polling timeouts
pub const SPEC_POLL_INTERVAL_MS: u64 = 10;
pub const SPEC_WAIT_MAX_MS: u64 = 5000;

pub const ADMIN_NAMESPACE: &str = "keepsake-system";

/// Returns a Command for the ksd binary with no inherited keepsake env.
pub fn ksd() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_ksd"));
    for var in [
        "KS_STATE_DIR",
        "KS_ADMIN_NAMESPACE",
        "KS_TICK_MS",
        "KS_RESYNC_SECS",
        "KS_DECLARATIONS",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

/// Poll `condition` until it holds or `timeout_ms` elapses.
pub fn wait_for<F>(timeout_ms: u64, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let start = std::time::Instant::now();
    let timeout = std::time::Duration::from_millis(timeout_ms);
    let poll_interval = std::time::Duration::from_millis(SPEC_POLL_INTERVAL_MS);

    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        std::thread::sleep(poll_interval);
    }
    false
}

/// Isolated daemon state directory. Kills any daemon it started on drop.
pub struct StateDir {
    dir: tempfile::TempDir,
    daemons: Vec<Child>,
}

impl StateDir {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
            daemons: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn join(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Write a file relative to the state directory.
    pub fn file(&self, name: &str, content: &str) {
        let path = self.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    pub fn read(&self, name: &str) -> String {
        std::fs::read_to_string(self.join(name)).unwrap_or_default()
    }

    /// ksd configured for this directory
    pub fn ksd(&self) -> Command {
        let mut cmd = ksd();
        cmd.env("KS_STATE_DIR", self.path())
            .env("KS_ADMIN_NAMESPACE", ADMIN_NAMESPACE)
            .env("KS_RESYNC_SECS", "1")
            .env("KS_TICK_MS", "50");
        cmd
    }

    /// Start a daemon in the background; returns its pid.
    pub fn start(&mut self) -> u32 {
        let child = self
            .ksd()
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .unwrap();
        let pid = child.id();
        self.daemons.push(child);
        assert!(
            wait_for(SPEC_WAIT_MAX_MS, || self.read("daemon.pid").trim()
                == pid.to_string()),
            "daemon did not write its pid"
        );
        pid
    }

    /// Send SIGTERM to the daemon with `pid` and wait for it to exit.
    pub fn stop(&mut self, pid: u32) -> std::process::ExitStatus {
        let status = Command::new("kill")
            .args(["-TERM", &pid.to_string()])
            .status()
            .unwrap();
        assert!(status.success(), "kill failed");

        let index = self
            .daemons
            .iter()
            .position(|child| child.id() == pid)
            .unwrap();
        let mut child = self.daemons.remove(index);
        let mut exit = None;
        let exited = wait_for(SPEC_WAIT_MAX_MS, || {
            exit = child.try_wait().unwrap();
            exit.is_some()
        });
        assert!(exited, "daemon did not stop on SIGTERM");
        exit.unwrap()
    }
}

impl Drop for StateDir {
    fn drop(&mut self) {
        for child in &mut self.daemons {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}
