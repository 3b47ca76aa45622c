//! Shared test utilities: a sandbox standing in for the device and fake
//! backends that record what they were asked to do.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fs;
use std::io::{self, Cursor};
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use cros_policy_tool::acquire::Fetcher;
use cros_policy_tool::config::Config;
use cros_policy_tool::error::AcquisitionError;
use cros_policy_tool::overlay::Mounter;
use cros_policy_tool::prompt::TerminalPrompter;
use cros_policy_tool::verity::VerificationTool;
use tempfile::TempDir;

pub const POLICY: &[u8] = br#"{"HomepageLocation":"https://example.com","ShowHomeButton":true}"#;
pub const POLICY_URL: &str = "https://policies.example.com/Policies.json";

/// Sandbox with a fake `/etc`, a policy document and room for an overlay.
pub struct TestEnv {
    /// Temporary directory (kept alive for lifetime of TestEnv)
    pub _temp_dir: TempDir,
    pub root: PathBuf,
    /// Stand-in for the live `/etc`
    pub live: PathBuf,
    pub policy: PathBuf,
    pub overlay_root: PathBuf,
    pub fallback: PathBuf,
    pub vboot_tool: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let root = temp_dir.path().to_path_buf();
        let live = root.join("etc");
        fs::create_dir_all(live.join("init")).expect("Failed to create live dir");
        fs::write(live.join("hostname"), "localhost\n").unwrap();
        fs::write(live.join("init/ui.conf"), "start on started boot-services\n").unwrap();
        std::os::unix::fs::symlink("hostname", live.join("HOSTNAME")).unwrap();

        let fallback = root.join("tmp");
        fs::create_dir_all(&fallback).unwrap();

        Self {
            policy: root.join("Policies.json"),
            overlay_root: root.join("overlay"),
            vboot_tool: root.join("make_dev_ssd.sh"),
            _temp_dir: temp_dir,
            root,
            live,
            fallback,
        }
    }

    pub fn with_policy() -> Self {
        let env = Self::new();
        fs::write(&env.policy, POLICY).unwrap();
        env
    }

    pub fn config(&self) -> Config {
        Config {
            policy_path: self.policy.clone(),
            policy_url: Some(POLICY_URL.to_string()),
            live_config_dir: self.live.clone(),
            overlay_root: self.overlay_root.clone(),
            fallback_dir: self.fallback.clone(),
            vboot_tool: self.vboot_tool.clone(),
            ..Config::default()
        }
    }

    pub fn overlay_policy(&self) -> PathBuf {
        self.overlay_root
            .join("etc/opt/chrome/policies/managed/policy.json")
    }

    pub fn install_vboot_tool(&self) {
        fs::write(&self.vboot_tool, "#!/bin/sh\nexit 0\n").unwrap();
        make_executable(&self.vboot_tool);
    }
}

pub fn make_executable(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}

/// True when the tests run as root, where permission bits don't stop reads.
pub fn running_as_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}

/// Prompter fed from a script of input lines, talking to a terminal.
pub fn scripted(input: &str) -> TerminalPrompter<Cursor<Vec<u8>>, Vec<u8>> {
    TerminalPrompter::new(Cursor::new(input.as_bytes().to_vec()), Vec::new(), true)
}

/// Fetcher serving a fixed body, or failing after writing part of it.
pub struct FakeFetcher {
    pub body: Vec<u8>,
    pub fail: bool,
    pub calls: Cell<usize>,
}

impl FakeFetcher {
    pub fn serving(body: &[u8]) -> Self {
        Self {
            body: body.to_vec(),
            fail: false,
            calls: Cell::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            body: POLICY.to_vec(),
            fail: true,
            calls: Cell::new(0),
        }
    }
}

impl Fetcher for FakeFetcher {
    fn fetch(&self, url: &str, dest: &Path) -> Result<(), AcquisitionError> {
        self.calls.set(self.calls.get() + 1);
        if self.fail {
            // Simulate a connection dropped mid-transfer.
            fs::write(dest, &self.body[..self.body.len() / 2]).unwrap();
            return Err(AcquisitionError::FetchFailed {
                url: url.to_string(),
                reason: "connection reset by peer".to_string(),
            });
        }
        fs::write(dest, &self.body).unwrap();
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeMounter {
    pub calls: RefCell<Vec<(PathBuf, PathBuf)>>,
    pub fail: bool,
}

impl Mounter for FakeMounter {
    fn bind_mount(&self, source: &Path, target: &Path) -> io::Result<()> {
        self.calls
            .borrow_mut()
            .push((source.to_path_buf(), target.to_path_buf()));
        if self.fail {
            return Err(io::Error::from_raw_os_error(libc::EPERM));
        }
        Ok(())
    }
}

/// Verified-boot tool returning queued exit codes (0 once the queue is empty).
#[derive(Default)]
pub struct FakeVboot {
    pub exit_codes: RefCell<VecDeque<i32>>,
    pub calls: RefCell<Vec<(PathBuf, String, u32)>>,
}

impl FakeVboot {
    pub fn with_exit_codes(codes: &[i32]) -> Self {
        Self {
            exit_codes: RefCell::new(codes.iter().copied().collect()),
            calls: RefCell::default(),
        }
    }

    pub fn partitions(&self) -> Vec<u32> {
        self.calls.borrow().iter().map(|c| c.2).collect()
    }
}

impl VerificationTool for FakeVboot {
    fn remove_verification(
        &self,
        tool: &Path,
        device: &str,
        partition: u32,
    ) -> anyhow::Result<ExitStatus> {
        self.calls
            .borrow_mut()
            .push((tool.to_path_buf(), device.to_string(), partition));
        let code = self.exit_codes.borrow_mut().pop_front().unwrap_or(0);
        Ok(ExitStatus::from_raw(code << 8))
    }
}

/// Every path under `dir`, for before/after comparisons.
pub fn snapshot(dir: &Path) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.path().to_path_buf())
        .collect();
    paths.sort();
    paths
}
