//! Action handlers.
//!
//! Each submodule handles one user-selectable action:
//! - `fetch` - download the policy document
//! - `apply` - temporary (overlay) and permanent install
//! - `verity` - remove rootfs verification
//! - `preflight` - report on the environment
//! - `show` - print the effective configuration
//!
//! Handlers take a [`Session`] carrying the configuration and the injectable
//! backends, and return `anyhow::Result` for `main` and the menu to report.

mod apply;
mod fetch;
mod preflight;
mod show;
mod verity;

use std::path::PathBuf;

use crate::acquire::Fetcher;
use crate::config::Config;
use crate::overlay::Mounter;
use crate::prompt::Prompter;
use crate::verity::VerificationTool;

pub use apply::{cmd_apply_permanent, cmd_apply_temporary};
pub use fetch::cmd_fetch;
pub use preflight::cmd_preflight;
pub use show::cmd_show_config;
pub use verity::cmd_disable_verification;

/// Everything an action needs for one run.
pub struct Session<'a> {
    pub config: &'a Config,
    pub prompter: &'a mut dyn Prompter,
    pub fetcher: &'a dyn Fetcher,
    pub mounter: &'a dyn Mounter,
    pub vboot: &'a dyn VerificationTool,
    /// Policy path as resolved so far; moves to the fallback directory after a
    /// download that could not be written next to the configured path.
    pub policy: PathBuf,
}

impl<'a> Session<'a> {
    pub fn new(
        config: &'a Config,
        prompter: &'a mut dyn Prompter,
        fetcher: &'a dyn Fetcher,
        mounter: &'a dyn Mounter,
        vboot: &'a dyn VerificationTool,
    ) -> Self {
        Self {
            policy: config.policy_path.clone(),
            config,
            prompter,
            fetcher,
            mounter,
            vboot,
        }
    }
}
