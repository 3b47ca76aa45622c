//! Preflight command - checks the device is ready.

use anyhow::{bail, Result};

use crate::acquire::TransferTool;
use crate::config::Config;
use crate::preflight;

pub fn cmd_preflight(config: &Config) -> Result<()> {
    let transfer = TransferTool::detect();
    let report = preflight::run_preflight(config, transfer.as_ref());
    report.print();

    if !report.all_passed() {
        bail!(
            "Preflight failed: {} check(s) failed. Fix the issues above first.",
            report.fail_count()
        );
    }
    println!("All required checks passed.");
    Ok(())
}
