//! Fetch command - downloads the policy document.

use anyhow::{Context, Result};

use super::Session;
use crate::acquire::{ensure_policy_present, fetch_policy};

/// Download the policy, replacing the local copy.
pub fn cmd_fetch(session: &mut Session<'_>) -> Result<()> {
    let path = fetch_policy(session.config, &session.policy, session.fetcher)
        .context("Could not update the policy file")?;
    session.policy = path;
    Ok(())
}

/// Resolve the policy for an apply action: download when `update` is set,
/// otherwise only when it is missing.
pub(super) fn resolve_policy(session: &mut Session<'_>, update: bool) -> Result<()> {
    if update {
        return cmd_fetch(session);
    }
    let path = ensure_policy_present(
        session.config,
        &session.policy,
        &mut *session.prompter,
        session.fetcher,
    )
    .context("No policy file to install")?;
    session.policy = path;
    Ok(())
}
