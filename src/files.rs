//! Small filesystem helpers shared by the operations.

use std::fs::{self, File};
use std::io;
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::{Path, PathBuf};

use nix::unistd::{access, AccessFlags};
use sha2::{Digest, Sha256};

use crate::config::POLICY_FILE_NAME;

/// SHA-256 of a file as lowercase hex.
pub fn sha256_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}

/// True if `path` is a regular file with an executable bit set.
pub fn is_executable(path: &Path) -> bool {
    match fs::metadata(path) {
        Ok(meta) => meta.is_file() && meta.permissions().mode() & 0o111 != 0,
        Err(_) => false,
    }
}

/// True if the calling process may create files in `dir`.
///
/// Uses access(2), which also reports EROFS for read-only mounts.
pub fn dir_is_writable(dir: &Path) -> bool {
    dir.is_dir() && access(dir, AccessFlags::W_OK).is_ok()
}

/// Directory a file lives in; `.` for bare file names.
pub fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Copy `policy` into `dest_dir` as `policy.json`, creating the directory and
/// replacing any earlier copy. Returns the installed path and its digest.
///
/// The installed bytes are hashed and compared against the source so a short
/// write never passes as success. When `policy` already is the installed file
/// (same inode) nothing is copied.
pub fn install_policy(policy: &Path, dest_dir: &Path) -> io::Result<(PathBuf, String)> {
    let source = fs::metadata(policy)?;
    let expected = sha256_file(policy)?;
    fs::create_dir_all(dest_dir)?;
    let dest = dest_dir.join(POLICY_FILE_NAME);

    // Copying a file onto itself truncates it before reading.
    let same_file = fs::metadata(&dest)
        .map(|existing| existing.dev() == source.dev() && existing.ino() == source.ino())
        .unwrap_or(false);
    if same_file {
        log::debug!("{} is already installed", policy.display());
    } else {
        fs::copy(policy, &dest)?;
    }
    fs::set_permissions(&dest, fs::Permissions::from_mode(0o644))?;

    let actual = sha256_file(&dest)?;
    if expected != actual {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("installed copy differs from source (sha256 {actual}, expected {expected})"),
        ));
    }
    Ok((dest, actual))
}
