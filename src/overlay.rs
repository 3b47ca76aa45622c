//! Overlay tree preparation and the bind mount that activates it.
//!
//! The live configuration tree is copied entry by entry. Symlinks are
//! recreated rather than followed, and entries that cannot be copied (sockets,
//! unreadable files, directories that vanish mid-walk) are recorded and
//! skipped: a live `/etc` routinely contains such things and one bad entry must
//! not prevent the policy from being applied.

use std::fs::{self, File, FileTimes, Metadata};
use std::io;
use std::os::unix::fs::{lchown, symlink, FileTypeExt, MetadataExt};
use std::path::{Path, PathBuf};

use nix::mount::{mount, MsFlags};
use walkdir::WalkDir;

/// An entry left out of the overlay and why.
#[derive(Debug)]
pub struct SkippedEntry {
    pub path: PathBuf,
    pub reason: String,
}

/// Summary of a tree copy.
#[derive(Debug, Default)]
pub struct CopyReport {
    pub files: usize,
    pub dirs: usize,
    pub symlinks: usize,
    pub skipped: Vec<SkippedEntry>,
}

impl CopyReport {
    fn skip(&mut self, path: &Path, reason: impl ToString) {
        let entry = SkippedEntry {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        };
        log::debug!("Skipped {}: {}", entry.path.display(), entry.reason);
        self.skipped.push(entry);
    }

    pub fn copied(&self) -> usize {
        self.files + self.dirs + self.symlinks
    }
}

/// Something that can make one directory appear at another path.
pub trait Mounter {
    fn bind_mount(&self, source: &Path, target: &Path) -> io::Result<()>;
}

/// [`Mounter`] using mount(2) with `MS_BIND`.
pub struct BindMounter;

impl Mounter for BindMounter {
    fn bind_mount(&self, source: &Path, target: &Path) -> io::Result<()> {
        log::debug!("Bind mounting {} on {}", source.display(), target.display());
        mount(
            Some(source),
            target,
            None::<&str>,
            MsFlags::MS_BIND,
            None::<&str>,
        )
        .map_err(io::Error::from)
    }
}

/// Recursively copy `src` into `dst`, best effort.
///
/// Only a missing or unreadable `src` root is an error; everything below it
/// that fails is listed in the returned report.
pub fn copy_tree(src: &Path, dst: &Path) -> io::Result<CopyReport> {
    let root_meta = fs::metadata(src)?;
    if !root_meta.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} is not a directory", src.display()),
        ));
    }

    let mut report = CopyReport::default();
    // Directory metadata is applied after their contents are written, both so
    // read-only directories can still be filled and so mtimes stick.
    let mut dirs: Vec<(PathBuf, Metadata)> = Vec::new();

    for entry in WalkDir::new(src).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let path = err.path().unwrap_or(src).to_path_buf();
                report.skip(&path, err);
                continue;
            }
        };
        // WalkDir only yields paths under `src`.
        let Ok(rel) = entry.path().strip_prefix(src) else {
            continue;
        };
        let target = dst.join(rel);
        let meta = match entry.metadata() {
            Ok(meta) => meta,
            Err(err) => {
                report.skip(entry.path(), err);
                continue;
            }
        };

        let file_type = meta.file_type();
        let result = if file_type.is_dir() {
            copy_dir(&target).map(|()| {
                report.dirs += 1;
                dirs.push((target.clone(), meta.clone()));
            })
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target, &meta).map(|()| report.symlinks += 1)
        } else if file_type.is_file() {
            copy_file(entry.path(), &target, &meta).map(|()| report.files += 1)
        } else {
            let kind = if file_type.is_socket() {
                "socket"
            } else if file_type.is_fifo() {
                "fifo"
            } else {
                "device node"
            };
            report.skip(entry.path(), format!("{kind} not copied"));
            continue;
        };

        if let Err(err) = result {
            report.skip(entry.path(), err);
        }
    }

    for (path, meta) in dirs.iter().rev() {
        if let Err(err) = apply_metadata(path, meta) {
            log::debug!("Could not restore metadata on {}: {}", path.display(), err);
        }
    }

    Ok(report)
}

fn copy_dir(target: &Path) -> io::Result<()> {
    match fs::symlink_metadata(target) {
        Ok(existing) if existing.is_dir() => Ok(()),
        Ok(_) => {
            fs::remove_file(target)?;
            fs::create_dir(target)
        }
        Err(_) => fs::create_dir_all(target),
    }
}

fn copy_symlink(src: &Path, target: &Path, meta: &Metadata) -> io::Result<()> {
    let link = fs::read_link(src)?;
    remove_non_dir(target)?;
    symlink(&link, target)?;
    // Ownership of the link itself; only root can do this.
    let _ = lchown(target, Some(meta.uid()), Some(meta.gid()));
    Ok(())
}

fn copy_file(src: &Path, target: &Path, meta: &Metadata) -> io::Result<()> {
    if let Ok(existing) = fs::symlink_metadata(target) {
        // Once the overlay is mounted, the source and the target are the same
        // inode; copying would truncate the file onto itself.
        if existing.dev() == meta.dev() && existing.ino() == meta.ino() {
            return Ok(());
        }
        // fs::copy would write through a symlink.
        if existing.file_type().is_symlink() {
            fs::remove_file(target)?;
        }
    }
    fs::copy(src, target)?;
    if let Err(err) = apply_metadata(target, meta) {
        log::debug!("Could not restore metadata on {}: {}", target.display(), err);
    }
    Ok(())
}

fn remove_non_dir(target: &Path) -> io::Result<()> {
    match fs::symlink_metadata(target) {
        Ok(existing) if existing.is_dir() => fs::remove_dir_all(target),
        Ok(_) => fs::remove_file(target),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}

/// Restore permissions, owner and timestamps of a copied file or directory.
fn apply_metadata(path: &Path, meta: &Metadata) -> io::Result<()> {
    // Ownership first: chown clears setuid/setgid bits.
    let _ = lchown(path, Some(meta.uid()), Some(meta.gid()));
    fs::set_permissions(path, meta.permissions())?;
    let times = FileTimes::new()
        .set_accessed(meta.accessed()?)
        .set_modified(meta.modified()?);
    File::open(path)?.set_times(times)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::os::unix::net::UnixListener;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    fn tree() -> (TempDir, PathBuf, PathBuf) {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("etc");
        let dst = dir.path().join("overlay/etc");
        fs::create_dir_all(src.join("ssh")).unwrap();
        fs::write(src.join("hostname"), "chromebook\n").unwrap();
        fs::write(src.join("ssh/sshd_config"), "PermitRootLogin no\n").unwrap();
        (dir, src, dst)
    }

    #[test]
    fn test_copies_files_and_dirs() {
        let (_dir, src, dst) = tree();
        let report = copy_tree(&src, &dst).unwrap();
        assert_eq!(
            fs::read_to_string(dst.join("ssh/sshd_config")).unwrap(),
            "PermitRootLogin no\n"
        );
        assert_eq!(report.files, 2);
        assert_eq!(report.dirs, 2);
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn test_symlinks_are_not_followed() {
        let (_dir, src, dst) = tree();
        symlink("hostname", src.join("hostname.link")).unwrap();
        symlink("/nonexistent/target", src.join("dangling")).unwrap();

        let report = copy_tree(&src, &dst).unwrap();

        assert_eq!(
            fs::read_link(dst.join("hostname.link")).unwrap(),
            PathBuf::from("hostname")
        );
        assert_eq!(
            fs::read_link(dst.join("dangling")).unwrap(),
            PathBuf::from("/nonexistent/target")
        );
        assert_eq!(report.symlinks, 2);
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn test_socket_is_skipped() {
        let (_dir, src, dst) = tree();
        let _listener = UnixListener::bind(src.join("daemon.sock")).unwrap();

        let report = copy_tree(&src, &dst).unwrap();

        assert!(!dst.join("daemon.sock").exists());
        assert_eq!(report.skipped.len(), 1);
        assert!(report.skipped[0].reason.contains("socket"));
        assert!(dst.join("hostname").is_file());
    }

    #[test]
    fn test_preserves_mode_and_mtime() {
        let (_dir, src, dst) = tree();
        let file = src.join("hostname");
        fs::set_permissions(&file, fs::Permissions::from_mode(0o600)).unwrap();
        let old = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000_000);
        File::open(&file)
            .unwrap()
            .set_times(FileTimes::new().set_modified(old).set_accessed(old))
            .unwrap();

        copy_tree(&src, &dst).unwrap();

        let meta = fs::metadata(dst.join("hostname")).unwrap();
        assert_eq!(meta.permissions().mode() & 0o777, 0o600);
        assert_eq!(meta.modified().unwrap(), old);
    }

    #[test]
    fn test_recopy_replaces_existing_entries() {
        let (_dir, src, dst) = tree();
        copy_tree(&src, &dst).unwrap();
        fs::write(src.join("hostname"), "renamed\n").unwrap();

        let report = copy_tree(&src, &dst).unwrap();

        assert_eq!(fs::read_to_string(dst.join("hostname")).unwrap(), "renamed\n");
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn test_same_inode_is_left_alone() {
        let (_dir, src, _dst) = tree();
        // Copying a tree onto itself models re-running after the mount.
        let report = copy_tree(&src, &src).unwrap();
        assert_eq!(
            fs::read_to_string(src.join("hostname")).unwrap(),
            "chromebook\n"
        );
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn test_missing_source() {
        let dir = TempDir::new().unwrap();
        let err = copy_tree(&dir.path().join("nope"), &dir.path().join("out")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
