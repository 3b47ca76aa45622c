//! Verity command - removes rootfs verification.

use anyhow::{Context, Result};

use super::Session;
use crate::config::VERIFIED_PARTITIONS;
use crate::verity::disable_verification;

pub fn cmd_disable_verification(session: &mut Session<'_>) -> Result<()> {
    let config = session.config;
    disable_verification(
        &config.vboot_tool,
        &config.device,
        &VERIFIED_PARTITIONS,
        &mut *session.prompter,
        session.vboot,
    )
    .context("Could not disable rootfs verification")?;
    Ok(())
}
