//! Error types for each operation.
//!
//! The command layer wraps these in `anyhow` with context; library callers can
//! match on them directly.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// The process is not running with the privilege the operations need.
#[derive(Error, Debug)]
pub enum GuardError {
    #[error("must be run as root (effective uid is {0})")]
    NotRoot(u32),
}

/// Failures while asking the user something.
#[derive(Error, Debug)]
pub enum PromptError {
    #[error("confirmation required but stdin is not a terminal (pass --yes to assume yes)")]
    NoInteractiveTerminal,
    #[error("failed to talk to the terminal")]
    Io(#[from] io::Error),
}

/// Failures while making sure a policy file is available locally.
#[derive(Error, Debug)]
pub enum AcquisitionError {
    #[error("policy file {} not found and download was declined", .0.display())]
    NotFound(PathBuf),
    #[error("neither curl nor wget is installed, cannot download the policy")]
    NoTransferTool,
    #[error("no policy URL configured (set POLICY_URL or pass --url)")]
    UrlNotConfigured,
    #[error("failed to fetch {url}: {reason}")]
    FetchFailed { url: String, reason: String },
    #[error(
        "no writable location for the policy file (tried {} and {})",
        .tried.display(),
        .fallback.display()
    )]
    ReadOnlyTarget { tried: PathBuf, fallback: PathBuf },
    #[error("failed to store the downloaded policy at {}", .path.display())]
    Store {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Prompt(#[from] PromptError),
}

/// Failures while installing the policy into a configuration tree.
#[derive(Error, Debug)]
pub enum ApplyError {
    #[error("configuration directory {} does not exist", .0.display())]
    SourceMissing(PathBuf),
    #[error(
        "overlay {} is inside {}, the copy would recurse into itself",
        .overlay.display(),
        .source_dir.display()
    )]
    OverlayInsideSource {
        overlay: PathBuf,
        source_dir: PathBuf,
    },
    #[error("failed to copy {}", .path.display())]
    CopyFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to bind mount {} onto {}", .source_dir.display(), .target.display())]
    MountFailed {
        source_dir: PathBuf,
        target: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write {}", .path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Prompt(#[from] PromptError),
}

/// Failures while driving the verified-boot tool.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("verified boot tool {} is missing or not executable", .0.display())]
    ToolNotFound(PathBuf),
    #[error("removing verification on partition {partition} failed: {reason}")]
    ToolFailed { partition: u32, reason: String },
    #[error(transparent)]
    Prompt(#[from] PromptError),
}
