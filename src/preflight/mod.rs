//! Preflight checks.
//!
//! Read-only look at whether each action can work on this device. Run with
//! `cros-policy-tool --check`; root is not required.

pub mod checks;
mod types;

use nix::unistd::geteuid;

use crate::acquire::TransferTool;
use crate::config::Config;

pub use types::{CheckResult, CheckStatus, PreflightReport};

/// Run all checks against `config`.
pub fn run_preflight(config: &Config, transfer: Option<&TransferTool>) -> PreflightReport {
    run_preflight_as(config, transfer, geteuid().as_raw())
}

/// Same as [`run_preflight`] with the effective uid supplied by the caller.
pub fn run_preflight_as(
    config: &Config,
    transfer: Option<&TransferTool>,
    euid: u32,
) -> PreflightReport {
    let mut checks = vec![checks::check_root(euid)];
    checks.extend(checks::check_policy(config, transfer));
    checks.extend(checks::check_targets(config));
    checks.push(checks::check_vboot_tool(config));
    PreflightReport { checks }
}
