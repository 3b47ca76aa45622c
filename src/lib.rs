//! Install Chrome managed policy on ChromeOS devices.
//!
//! The policy document can be applied two ways: through a copy of `/etc` that
//! is bind mounted over the real one until reboot, or written straight into
//! `/etc` once rootfs verification has been removed (which this crate can also
//! do, through the verified-boot developer script).

pub mod acquire;
pub mod apply;
pub mod commands;
pub mod config;
pub mod error;
pub mod files;
pub mod guard;
pub mod logger;
pub mod menu;
pub mod overlay;
pub mod preflight;
pub mod process;
pub mod prompt;
pub mod verity;
