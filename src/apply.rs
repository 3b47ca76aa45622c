//! Installing the policy, either through a throwaway overlay of the live
//! configuration tree or directly into it.

use std::ffi::OsString;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::{Duration, Instant};

use crate::config::{overlay_config_dir, MANAGED_POLICY_SUBDIR};
use crate::error::ApplyError;
use crate::files::install_policy;
use crate::overlay::{copy_tree, CopyReport, Mounter};
use crate::prompt::{Outcome, Prompter};

/// What a successful temporary apply did.
#[derive(Debug)]
pub struct ApplyReport {
    /// Copy of the configuration tree that is now mounted over the live one.
    pub overlay_dir: PathBuf,
    /// Policy file inside the overlay.
    pub policy: PathBuf,
    /// SHA-256 of the installed policy.
    pub digest: String,
    pub copy: CopyReport,
    pub elapsed: Duration,
}

/// Copy `live_dir` into `overlay_root`, drop the policy into the copy and bind
/// mount the copy over `live_dir`. Lasts until reboot.
pub fn apply_temporary(
    policy: &Path,
    live_dir: &Path,
    overlay_root: &Path,
    mounter: &dyn Mounter,
) -> Result<ApplyReport, ApplyError> {
    let start = Instant::now();
    if !live_dir.is_dir() {
        return Err(ApplyError::SourceMissing(live_dir.to_path_buf()));
    }
    let overlay_dir = overlay_config_dir(overlay_root, live_dir);
    if is_within(&overlay_dir, live_dir) {
        return Err(ApplyError::OverlayInsideSource {
            overlay: overlay_dir,
            source_dir: live_dir.to_path_buf(),
        });
    }

    fs::create_dir_all(&overlay_dir).map_err(|source| ApplyError::CopyFailed {
        path: overlay_dir.clone(),
        source,
    })?;

    log::info!(
        "Copying {} to {}...",
        live_dir.display(),
        overlay_dir.display()
    );
    let copy = copy_tree(live_dir, &overlay_dir).map_err(|source| ApplyError::CopyFailed {
        path: live_dir.to_path_buf(),
        source,
    })?;
    if !copy.skipped.is_empty() {
        log::warn!(
            "Skipped {} entries that could not be copied (run with --verbose to list them)",
            copy.skipped.len()
        );
    }

    let managed_dir = overlay_dir.join(MANAGED_POLICY_SUBDIR);
    let (installed, digest) =
        install_policy(policy, &managed_dir).map_err(|source| ApplyError::CopyFailed {
            path: policy.to_path_buf(),
            source,
        })?;
    log::info!("Policy staged at {} (sha256 {})", installed.display(), digest);

    mounter
        .bind_mount(&overlay_dir, live_dir)
        .map_err(|source| ApplyError::MountFailed {
            source_dir: overlay_dir.clone(),
            target: live_dir.to_path_buf(),
            source,
        })?;

    Ok(ApplyReport {
        overlay_dir,
        policy: installed,
        digest,
        copy,
        elapsed: start.elapsed(),
    })
}

/// Copy the policy straight into `dest_dir` after the user confirms.
///
/// Writability of the root filesystem is deliberately not probed: if
/// verification is still enabled the copy fails and that error is returned.
pub fn apply_permanent(
    policy: &Path,
    dest_dir: &Path,
    prompter: &mut dyn Prompter,
) -> Result<Outcome, ApplyError> {
    prompter.show(&format!(
        "This writes {} permanently. It only works once rootfs verification \
         has been disabled and the device rebooted.",
        dest_dir.display()
    ))?;
    if !prompter.confirm("Install the policy permanently?")? {
        log::info!("Permanent install cancelled");
        return Ok(Outcome::Declined);
    }

    let (installed, digest) =
        install_policy(policy, dest_dir).map_err(|source| ApplyError::WriteFailed {
            path: dest_dir.to_path_buf(),
            source,
        })?;
    log::info!("Installed {} (sha256 {})", installed.display(), digest);
    Ok(Outcome::Completed)
}

/// Whether `path` lies under `dir` once symlinks and `..` are resolved.
fn is_within(path: &Path, dir: &Path) -> bool {
    resolve(path).starts_with(resolve(dir))
}

/// Canonical form of a path that may not exist yet: the deepest existing
/// ancestor is canonicalized and the remaining components are applied to it.
fn resolve(path: &Path) -> PathBuf {
    let mut existing = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };
    // Components below the deepest existing ancestor, innermost first.
    let mut rest: Vec<Option<OsString>> = Vec::new();

    let mut resolved = loop {
        if let Ok(canonical) = fs::canonicalize(&existing) {
            break canonical;
        }
        match existing.components().next_back() {
            Some(Component::Normal(name)) => rest.push(Some(name.to_os_string())),
            Some(Component::ParentDir) => rest.push(None),
            Some(Component::CurDir) => {}
            _ => break existing,
        }
        existing.pop();
    };

    // Nothing below the existing ancestor exists, so `..` is purely lexical.
    for component in rest.into_iter().rev() {
        match component {
            Some(name) => resolved.push(name),
            None => {
                resolved.pop();
            }
        }
    }
    resolved
}
