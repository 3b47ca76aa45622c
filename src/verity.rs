//! Removing rootfs verification with the platform's verified-boot tool.
//!
//! All of the real work happens in the external tool. This module checks the
//! tool is there, asks for a strong confirmation and makes sure every partition
//! succeeded before reporting success.

use std::path::Path;
use std::process::ExitStatus;

use anyhow::Result;

use crate::error::ToolError;
use crate::files::is_executable;
use crate::process::Cmd;
use crate::prompt::{Outcome, Prompter};

/// Word the user must type before verification is removed.
pub const CONFIRM_PHRASE: &str = "DISABLE";

/// Runs the verified-boot tool for one partition.
pub trait VerificationTool {
    fn remove_verification(&self, tool: &Path, device: &str, partition: u32)
        -> Result<ExitStatus>;
}

/// `make_dev_ssd.sh -i <device> --remove_rootfs_verification --partitions <n>`,
/// with the tool's own output shown to the user.
pub struct MakeDevSsd;

impl VerificationTool for MakeDevSsd {
    fn remove_verification(
        &self,
        tool: &Path,
        device: &str,
        partition: u32,
    ) -> Result<ExitStatus> {
        Cmd::new(tool)
            .args(["-i", device, "--remove_rootfs_verification", "--partitions"])
            .arg(partition.to_string())
            .allow_fail()
            .run_interactive()
    }
}

/// Remove verification from each of `partitions` on `device`.
///
/// Stops at the first failure; nothing already changed is rolled back.
pub fn disable_verification(
    tool_path: &Path,
    device: &str,
    partitions: &[u32],
    prompter: &mut dyn Prompter,
    tool: &dyn VerificationTool,
) -> Result<Outcome, ToolError> {
    if !is_executable(tool_path) {
        return Err(ToolError::ToolNotFound(tool_path.to_path_buf()));
    }

    prompter.show(&format!(
        "Removing rootfs verification on {device} is permanent and leaves the \
         device unable to boot with OS verification on."
    ))?;
    if !prompter.confirm_phrase("Disable rootfs verification?", CONFIRM_PHRASE)? {
        log::info!("Verification left enabled");
        return Ok(Outcome::Declined);
    }

    for &partition in partitions {
        log::info!("Removing rootfs verification on partition {partition}...");
        let status = tool
            .remove_verification(tool_path, device, partition)
            .map_err(|e| ToolError::ToolFailed {
                partition,
                reason: format!("{e:#}"),
            })?;
        if !status.success() {
            let reason = match status.code() {
                Some(code) => format!("exit code {code}"),
                None => "terminated by a signal".to_string(),
            };
            return Err(ToolError::ToolFailed { partition, reason });
        }
    }

    log::info!("Rootfs verification removed. Reboot for it to take effect.");
    Ok(Outcome::Completed)
}
