//! Individual environment checks.

use std::fs;
use std::path::Path;

use crate::acquire::TransferTool;
use crate::config::Config;
use crate::files::{dir_is_writable, is_executable, parent_dir};

use super::types::CheckResult;

pub const ROOT: &str = "Running as root";
pub const POLICY_FILE: &str = "Policy file";
pub const POLICY_URL: &str = "Policy URL";
pub const TRANSFER_TOOL: &str = "Download tool";
pub const LIVE_CONFIG: &str = "Configuration directory";
pub const MANAGED_DIR: &str = "Managed policy directory";
pub const OVERLAY_ROOT: &str = "Overlay location";
pub const VBOOT_TOOL: &str = "Verified boot tool";

pub fn check_root(euid: u32) -> CheckResult {
    if euid == 0 {
        CheckResult::pass(ROOT)
    } else {
        CheckResult::fail(ROOT, format!("effective uid is {euid}; rerun with sudo"))
    }
}

/// Policy file and the means to download it.
pub fn check_policy(config: &Config, tool: Option<&TransferTool>) -> Vec<CheckResult> {
    let path = &config.policy_path;
    let present = path.is_file();

    let file = match fs::metadata(path) {
        Ok(meta) if meta.is_file() => {
            CheckResult::pass_with(POLICY_FILE, format!("{} ({} bytes)", path.display(), meta.len()))
        }
        _ => CheckResult::warn(
            POLICY_FILE,
            format!("{} missing, it will be downloaded", path.display()),
        ),
    };

    let url = match (&config.policy_url, present) {
        (Some(url), _) => CheckResult::pass_with(POLICY_URL, url.clone()),
        (None, true) => CheckResult::skip(POLICY_URL, "not set, local file is used"),
        (None, false) => CheckResult::fail(POLICY_URL, "not set and no local policy file"),
    };

    let transfer = match (tool, present) {
        (Some(tool), _) => CheckResult::pass_with(TRANSFER_TOOL, tool.name()),
        (None, true) => CheckResult::skip(TRANSFER_TOOL, "neither curl nor wget, not needed"),
        (None, false) => CheckResult::fail(TRANSFER_TOOL, "install curl or wget"),
    };

    vec![file, url, transfer]
}

/// Live configuration root and whether each apply mode can write where it needs to.
pub fn check_targets(config: &Config) -> Vec<CheckResult> {
    let mut results = Vec::new();

    let live = &config.live_config_dir;
    if live.is_dir() {
        results.push(CheckResult::pass_with(LIVE_CONFIG, live.display().to_string()));
    } else {
        results.push(CheckResult::fail(
            LIVE_CONFIG,
            format!("{} does not exist", live.display()),
        ));
    }

    let managed = config.managed_policy_dir();
    if dir_is_writable(nearest_existing(&managed)) {
        results.push(CheckResult::pass_with(
            MANAGED_DIR,
            "writable, permanent install available",
        ));
    } else {
        results.push(CheckResult::warn(
            MANAGED_DIR,
            "read-only (rootfs verification enabled?), only temporary install works",
        ));
    }

    let overlay_parent = parent_dir(&config.overlay_root);
    if dir_is_writable(nearest_existing(&overlay_parent)) {
        results.push(CheckResult::pass_with(
            OVERLAY_ROOT,
            config.overlay_root.display().to_string(),
        ));
    } else {
        results.push(CheckResult::fail(
            OVERLAY_ROOT,
            format!("{} is not writable", overlay_parent.display()),
        ));
    }

    results
}

pub fn check_vboot_tool(config: &Config) -> CheckResult {
    let tool = &config.vboot_tool;
    if is_executable(tool) {
        CheckResult::pass_with(VBOOT_TOOL, tool.display().to_string())
    } else {
        CheckResult::warn(
            VBOOT_TOOL,
            format!("{} not found, cannot disable verification", tool.display()),
        )
    }
}

/// Closest ancestor of `path` that exists, since that is where creation starts.
fn nearest_existing(path: &Path) -> &Path {
    path.ancestors()
        .find(|p| p.exists())
        .unwrap_or_else(|| Path::new("/"))
}
