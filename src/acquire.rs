//! Making sure a policy document is available locally.
//!
//! Downloads are staged in a temporary file next to the destination and only
//! renamed into place once the transfer finished, so a failed or interrupted
//! fetch never leaves a truncated policy behind.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::config::Config;
use crate::error::AcquisitionError;
use crate::files::{dir_is_writable, parent_dir};
use crate::process::Cmd;
use crate::prompt::Prompter;

/// Something that can copy the body of a URL into a local file.
pub trait Fetcher {
    /// Write the resource at `url` to `dest`, which already exists and is empty.
    fn fetch(&self, url: &str, dest: &Path) -> Result<(), AcquisitionError>;
}

/// Command-line transfer programs we know how to drive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferTool {
    Curl(PathBuf),
    Wget(PathBuf),
}

impl TransferTool {
    /// Find curl, then wget, in PATH.
    pub fn detect() -> Option<Self> {
        if let Ok(path) = which::which("curl") {
            return Some(TransferTool::Curl(path));
        }
        which::which("wget").ok().map(TransferTool::Wget)
    }

    pub fn name(&self) -> &'static str {
        match self {
            TransferTool::Curl(_) => "curl",
            TransferTool::Wget(_) => "wget",
        }
    }

    fn command(&self, url: &str, dest: &Path) -> Cmd {
        match self {
            TransferTool::Curl(path) => Cmd::new(path)
                .args(["-fsSL", "-o"])
                .arg(dest)
                .arg(url),
            TransferTool::Wget(path) => Cmd::new(path).args(["-q", "-O"]).arg(dest).arg(url),
        }
    }
}

/// [`Fetcher`] backed by curl or wget.
pub struct ToolFetcher {
    tool: Option<TransferTool>,
}

impl ToolFetcher {
    /// Use whichever transfer tool is installed.
    pub fn detect() -> Self {
        Self {
            tool: TransferTool::detect(),
        }
    }

    pub fn with_tool(tool: Option<TransferTool>) -> Self {
        Self { tool }
    }

    pub fn tool(&self) -> Option<&TransferTool> {
        self.tool.as_ref()
    }
}

impl Fetcher for ToolFetcher {
    fn fetch(&self, url: &str, dest: &Path) -> Result<(), AcquisitionError> {
        let tool = self.tool.as_ref().ok_or(AcquisitionError::NoTransferTool)?;
        log::debug!("Downloading with {}", tool.name());
        tool.command(url, dest)
            .error_msg(format!("{} failed", tool.name()))
            .run()
            .map_err(|e| AcquisitionError::FetchFailed {
                url: url.to_string(),
                reason: format!("{e:#}"),
            })?;
        Ok(())
    }
}

/// Return the policy path, downloading the document first if it is missing.
///
/// An existing file is used as is. A missing one is only downloaded after the
/// user agrees. The returned path differs from `path` when the download had to
/// go to the fallback directory.
pub fn ensure_policy_present(
    config: &Config,
    path: &Path,
    prompter: &mut dyn Prompter,
    fetcher: &dyn Fetcher,
) -> Result<PathBuf, AcquisitionError> {
    if path.is_file() {
        log::debug!("Using policy at {}", path.display());
        return Ok(path.to_path_buf());
    }

    if let Some(previous) = fallback_path(config, path).filter(|p| p.is_file()) {
        log::info!(
            "Policy not found at {}, using earlier download at {}",
            path.display(),
            previous.display()
        );
        return Ok(previous);
    }

    let question = format!("Policy file {} not found. Download it?", path.display());
    if !prompter.confirm(&question)? {
        return Err(AcquisitionError::NotFound(path.to_path_buf()));
    }
    fetch_policy(config, path, fetcher)
}

/// Download the policy to `path` (or the fallback directory), replacing any
/// existing copy only once the new one is complete.
pub fn fetch_policy(
    config: &Config,
    path: &Path,
    fetcher: &dyn Fetcher,
) -> Result<PathBuf, AcquisitionError> {
    let url = config
        .policy_url
        .as_deref()
        .ok_or(AcquisitionError::UrlNotConfigured)?;
    let dest = writable_destination(config, path)?;
    let dir = parent_dir(&dest);

    log::info!("Downloading policy from {url}...");
    let staged = NamedTempFile::new_in(&dir).map_err(|source| AcquisitionError::Store {
        path: dest.clone(),
        source,
    })?;

    // `staged` deletes itself on every early return below.
    fetcher.fetch(url, staged.path())?;

    let size = fs::metadata(staged.path())
        .map_err(|source| AcquisitionError::Store {
            path: dest.clone(),
            source,
        })?
        .len();
    if size == 0 {
        return Err(AcquisitionError::FetchFailed {
            url: url.to_string(),
            reason: "server returned an empty document".to_string(),
        });
    }

    staged
        .persist(&dest)
        .map_err(|e| AcquisitionError::Store {
            path: dest.clone(),
            source: e.error,
        })?;
    fs::set_permissions(&dest, fs::Permissions::from_mode(0o644)).map_err(|source| {
        AcquisitionError::Store {
            path: dest.clone(),
            source,
        }
    })?;

    log::info!("Saved policy to {} ({} bytes)", dest.display(), size);
    Ok(dest)
}

/// Pick where a download may be written: next to `path` if that directory is
/// writable, otherwise the configured fallback directory.
fn writable_destination(config: &Config, path: &Path) -> Result<PathBuf, AcquisitionError> {
    let dir = parent_dir(path);
    if !dir.exists() {
        // Best effort, a read-only parent falls through to the fallback below.
        let _ = fs::create_dir_all(&dir);
    }
    if dir_is_writable(&dir) {
        return Ok(path.to_path_buf());
    }

    let fallback = fallback_path(config, path).ok_or_else(|| AcquisitionError::ReadOnlyTarget {
        tried: dir.clone(),
        fallback: config.fallback_dir.clone(),
    })?;
    if !dir_is_writable(&config.fallback_dir) {
        return Err(AcquisitionError::ReadOnlyTarget {
            tried: dir,
            fallback: config.fallback_dir.clone(),
        });
    }
    log::warn!(
        "{} is not writable, saving the policy to {} instead",
        dir.display(),
        fallback.display()
    );
    Ok(fallback)
}

fn fallback_path(config: &Config, path: &Path) -> Option<PathBuf> {
    let candidate = config.fallback_dir.join(path.file_name()?);
    (candidate.as_path() != path).then_some(candidate)
}
