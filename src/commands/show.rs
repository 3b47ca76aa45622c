//! Show command - prints the effective configuration.

use anyhow::Result;

use crate::config::Config;

pub fn cmd_show_config(config: &Config) -> Result<()> {
    config.print()
}
