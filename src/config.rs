//! Configuration management for cros-policy-tool.
//!
//! Reads configuration from environment variables (a `.env` file is loaded into
//! the environment by `main` first). Command-line flags are applied last with
//! [`Config::apply_overrides`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// Default location of the policy document, relative to the working directory.
pub const DEFAULT_POLICY_PATH: &str = "Policies.json";

/// Live configuration root that temporary apply overlays.
pub const DEFAULT_LIVE_CONFIG_DIR: &str = "/etc";

/// Staging area for the overlay tree. tmpfs, so it is gone after reboot.
pub const DEFAULT_OVERLAY_ROOT: &str = "/tmp/policy-overlay";

/// Writable directory used when the policy's own directory is read-only.
pub const DEFAULT_FALLBACK_DIR: &str = "/tmp";

/// Internal disk of most ChromeOS devices.
pub const DEFAULT_DEVICE: &str = "/dev/mmcblk0";

/// Verified-boot developer script shipped in test and dev images.
pub const DEFAULT_VBOOT_TOOL: &str = "/usr/share/vboot/bin/make_dev_ssd.sh";

/// Where Chrome looks for administrator-supplied policy, relative to `/etc`.
pub const MANAGED_POLICY_SUBDIR: &str = "opt/chrome/policies/managed";

/// File name the policy is installed under.
pub const POLICY_FILE_NAME: &str = "policy.json";

/// Kernel/root partition pairs that carry dm-verity on ChromeOS.
pub const VERIFIED_PARTITIONS: [u32; 2] = [2, 4];

/// Effective settings for one run.
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Policy document to install.
    pub policy_path: PathBuf,
    /// Where to download the policy from when it is missing.
    pub policy_url: Option<String>,
    /// Live configuration root (normally `/etc`).
    pub live_config_dir: PathBuf,
    /// Directory holding the overlay copy of the live configuration root.
    pub overlay_root: PathBuf,
    /// Writable fallback directory for downloads.
    pub fallback_dir: PathBuf,
    /// Block device passed to the verified-boot tool.
    pub device: String,
    /// Path of the verified-boot tool.
    pub vboot_tool: PathBuf,
    /// Answer yes to every confirmation.
    pub assume_yes: bool,
    /// Log tolerated errors and other detail.
    pub verbose: bool,
}

/// Values given on the command line; `None` keeps the configured value.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub policy_path: Option<PathBuf>,
    pub policy_url: Option<String>,
    pub device: Option<String>,
    pub vboot_tool: Option<PathBuf>,
    pub overlay_root: Option<PathBuf>,
    pub assume_yes: bool,
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_vars(&HashMap::new())
    }
}

impl Config {
    /// Load configuration from the process environment.
    pub fn load() -> Self {
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::from_vars(&vars)
    }

    /// Build configuration from a map of variables, falling back to defaults.
    pub fn from_vars(vars: &HashMap<String, String>) -> Self {
        let path = |key: &str, default: &str| {
            vars.get(key)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(default))
        };

        Self {
            policy_path: path("POLICY_PATH", DEFAULT_POLICY_PATH),
            policy_url: vars.get("POLICY_URL").filter(|v| !v.is_empty()).cloned(),
            live_config_dir: path("LIVE_CONFIG_DIR", DEFAULT_LIVE_CONFIG_DIR),
            overlay_root: path("OVERLAY_ROOT", DEFAULT_OVERLAY_ROOT),
            fallback_dir: path("POLICY_FALLBACK_DIR", DEFAULT_FALLBACK_DIR),
            device: vars
                .get("POLICY_DEVICE")
                .filter(|v| !v.is_empty())
                .cloned()
                .unwrap_or_else(|| DEFAULT_DEVICE.to_string()),
            vboot_tool: path("VBOOT_TOOL", DEFAULT_VBOOT_TOOL),
            assume_yes: false,
            verbose: false,
        }
    }

    /// Apply command-line overrides on top of the loaded configuration.
    pub fn apply_overrides(mut self, overrides: Overrides) -> Self {
        if let Some(path) = overrides.policy_path {
            self.policy_path = path;
        }
        if let Some(url) = overrides.policy_url {
            self.policy_url = Some(url);
        }
        if let Some(device) = overrides.device {
            self.device = device;
        }
        if let Some(tool) = overrides.vboot_tool {
            self.vboot_tool = tool;
        }
        if let Some(overlay) = overrides.overlay_root {
            self.overlay_root = overlay;
        }
        self.assume_yes |= overrides.assume_yes;
        self.verbose |= overrides.verbose;
        self
    }

    /// Managed policy directory under the live configuration root.
    pub fn managed_policy_dir(&self) -> PathBuf {
        self.live_config_dir.join(MANAGED_POLICY_SUBDIR)
    }

    /// Root of the copied configuration tree inside the overlay.
    pub fn overlay_config_dir(&self) -> PathBuf {
        overlay_config_dir(&self.overlay_root, &self.live_config_dir)
    }

    /// Print configuration as JSON.
    pub fn print(&self) -> anyhow::Result<()> {
        println!("{}", serde_json::to_string_pretty(self)?);
        Ok(())
    }
}

/// `<overlay_root>/<name of live dir>`, i.e. `/tmp/policy-overlay/etc`.
pub fn overlay_config_dir(overlay_root: &Path, live_dir: &Path) -> PathBuf {
    let name = live_dir
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "etc".into());
    overlay_root.join(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.policy_path, PathBuf::from("Policies.json"));
        assert_eq!(config.live_config_dir, PathBuf::from("/etc"));
        assert!(config.policy_url.is_none());
        assert_eq!(
            config.managed_policy_dir(),
            PathBuf::from("/etc/opt/chrome/policies/managed")
        );
        assert_eq!(
            config.overlay_config_dir(),
            PathBuf::from("/tmp/policy-overlay/etc")
        );
    }

    #[test]
    fn test_vars_override_defaults() {
        let vars = HashMap::from([
            ("POLICY_PATH".to_string(), "/home/chronos/p.json".to_string()),
            ("POLICY_URL".to_string(), "https://example.com/p.json".to_string()),
            ("POLICY_DEVICE".to_string(), "/dev/nvme0n1".to_string()),
            ("OVERLAY_ROOT".to_string(), String::new()),
        ]);
        let config = Config::from_vars(&vars);
        assert_eq!(config.policy_path, PathBuf::from("/home/chronos/p.json"));
        assert_eq!(config.policy_url.as_deref(), Some("https://example.com/p.json"));
        assert_eq!(config.device, "/dev/nvme0n1");
        // Empty values keep the default.
        assert_eq!(config.overlay_root, PathBuf::from(DEFAULT_OVERLAY_ROOT));
    }

    #[test]
    fn test_cli_overrides_win() {
        let vars = HashMap::from([("POLICY_PATH".to_string(), "/a.json".to_string())]);
        let config = Config::from_vars(&vars).apply_overrides(Overrides {
            policy_path: Some(PathBuf::from("/b.json")),
            assume_yes: true,
            ..Default::default()
        });
        assert_eq!(config.policy_path, PathBuf::from("/b.json"));
        assert!(config.assume_yes);
        assert!(!config.verbose);
    }

    #[test]
    fn test_overlay_dir_for_relative_live_dir() {
        let dir = overlay_config_dir(Path::new("/o"), Path::new("sandbox/etc"));
        assert_eq!(dir, PathBuf::from("/o/etc"));
    }

    #[test]
    #[serial]
    fn test_load_reads_process_env() {
        std::env::set_var("VBOOT_TOOL", "/opt/bin/make_dev_ssd.sh");
        let config = Config::load();
        std::env::remove_var("VBOOT_TOOL");
        assert_eq!(config.vboot_tool, PathBuf::from("/opt/bin/make_dev_ssd.sh"));
    }

    #[test]
    fn test_serializes_to_json() {
        let json = serde_json::to_value(Config::default()).unwrap();
        assert_eq!(json["policy_path"], "Policies.json");
        assert_eq!(json["assume_yes"], false);
    }
}
