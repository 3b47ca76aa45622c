//! Apply commands - install the policy temporarily or permanently.

use anyhow::{Context, Result};

use super::fetch::resolve_policy;
use super::Session;
use crate::apply::{apply_permanent, apply_temporary};
use crate::prompt::Outcome;

/// Install the policy through an overlay mounted over the live config dir.
pub fn cmd_apply_temporary(session: &mut Session<'_>, update: bool) -> Result<()> {
    resolve_policy(session, update)?;
    let config = session.config;

    let report = apply_temporary(
        &session.policy,
        &config.live_config_dir,
        &config.overlay_root,
        session.mounter,
    )
    .context("Temporary policy install failed")?;

    log::info!(
        "Copied {} entries in {:.1}s",
        report.copy.copied(),
        report.elapsed.as_secs_f64()
    );
    log::info!(
        "{} now shows {}. The policy is active until the next reboot.",
        config.live_config_dir.display(),
        report.overlay_dir.display()
    );
    log::info!("Restart Chrome (or open chrome://policy and reload) to pick it up.");
    Ok(())
}

/// Install the policy directly into the managed policy directory.
pub fn cmd_apply_permanent(session: &mut Session<'_>, update: bool) -> Result<()> {
    resolve_policy(session, update)?;
    let dest = session.config.managed_policy_dir();

    let outcome = apply_permanent(&session.policy, &dest, &mut *session.prompter)
        .context("Permanent policy install failed (is rootfs verification disabled?)")?;
    if outcome == Outcome::Completed {
        log::info!("The policy survives reboots. Restart Chrome to pick it up.");
    }
    Ok(())
}
