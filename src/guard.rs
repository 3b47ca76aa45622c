//! Privilege and terminal preconditions checked before any action runs.

use nix::unistd::geteuid;

use crate::error::{GuardError, PromptError};

/// Fail unless running with effective uid 0.
pub fn require_root() -> Result<(), GuardError> {
    check_uid(geteuid().as_raw())
}

fn check_uid(euid: u32) -> Result<(), GuardError> {
    if euid == 0 {
        Ok(())
    } else {
        Err(GuardError::NotRoot(euid))
    }
}

/// Fail fast when an action will ask for confirmation but nobody can answer.
pub fn require_terminal(
    needs_confirmation: bool,
    assume_yes: bool,
    attached: bool,
) -> Result<(), PromptError> {
    if needs_confirmation && !assume_yes && !attached {
        return Err(PromptError::NoInteractiveTerminal);
    }
    Ok(())
}
