//! Lock file management for live-run exclusivity

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Exclusive lock held while a run issues destroy calls
pub struct RunLock {
    path: PathBuf,
    #[allow(dead_code)]
    file: File,
}

/// Lock file content
#[derive(Serialize, Deserialize)]
struct LockContent {
    pid: u32,
    started_at: i64,
}

impl RunLock {
    /// Acquire the run lock at `lock_path`
    ///
    /// A file left behind by a dead run is reused: the kernel drops its
    /// `flock` with the process, whatever pid the file still names.
    ///
    /// Returns error if:
    /// - The `flock` is held by another open file description
    /// - Permission denied
    pub fn acquire(lock_path: &Path) -> Result<Self> {
        if let Some(parent) = lock_path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create lock directory")?;
        }

        // The previous holder unlinks the file on release; a lock taken on
        // an unlinked inode excludes nobody, so reopen until the path matches.
        let mut file = loop {
            let file = OpenOptions::new()
                .create(true)
                .truncate(false)
                .read(true)
                .write(true)
                .open(lock_path)
                .with_context(|| format!("Failed to open lock file {}", lock_path.display()))?;

            if !try_flock_exclusive(&file)? {
                anyhow::bail!(
                    "Another rollup run is in progress (lock file {} held by active process)",
                    lock_path.display()
                );
            }

            if is_linked_at(&file, lock_path)? {
                break file;
            }
            tracing::debug!(path = %lock_path.display(), "Lock file replaced, retrying");
        };

        Self::write_lock_content(&mut file)?;

        Ok(Self {
            path: lock_path.to_path_buf(),
            file,
        })
    }

    /// Release the lock and remove the lock file
    pub fn release(self) -> Result<()> {
        std::fs::remove_file(&self.path)
            .context("Failed to remove lock file")?;
        Ok(())
    }

    fn write_lock_content(file: &mut File) -> Result<()> {
        let content = LockContent {
            pid: std::process::id(),
            started_at: chrono::Utc::now().timestamp_millis(),
        };

        let serialized = serde_json::to_string(&content)
            .context("Failed to serialize lock content")?;

        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(serialized.as_bytes())?;
        file.sync_all()?;
        Ok(())
    }

    #[cfg(test)]
    fn read_lock_content(file: &mut File) -> Result<LockContent> {
        use std::io::Read;

        file.seek(SeekFrom::Start(0))?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        let content: LockContent = serde_json::from_str(&contents)
            .context("Failed to deserialize lock content")?;
        Ok(content)
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Try to acquire exclusive file lock (non-blocking)
#[cfg(unix)]
fn try_flock_exclusive(file: &File) -> Result<bool> {
    use nix::fcntl::{flock, FlockArg};
    use std::os::unix::io::AsRawFd;

    match flock(file.as_raw_fd(), FlockArg::LockExclusiveNonblock) {
        Ok(_) => Ok(true),
        Err(nix::errno::Errno::EWOULDBLOCK) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

#[cfg(not(unix))]
fn try_flock_exclusive(_file: &File) -> Result<bool> {
    Ok(true)
}

/// Whether `path` still names the inode `file` has open
#[cfg(unix)]
fn is_linked_at(file: &File, path: &Path) -> Result<bool> {
    use std::os::unix::fs::MetadataExt;

    let open = file.metadata()?;
    match std::fs::metadata(path) {
        Ok(current) => Ok(open.dev() == current.dev() && open.ino() == current.ino()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

#[cfg(not(unix))]
fn is_linked_at(_file: &File, _path: &Path) -> Result<bool> {
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_lock_acquisition() {
        let temp_dir = TempDir::new().unwrap();
        let lock_path = temp_dir.path().join("rollup.lock");

        let lock1 = RunLock::acquire(&lock_path);
        assert!(lock1.is_ok());

        // Held by this (live) process
        let lock2 = RunLock::acquire(&lock_path);
        assert!(lock2.is_err());

        drop(lock1);

        let lock3 = RunLock::acquire(&lock_path);
        assert!(lock3.is_ok());
    }

    #[test]
    fn test_lock_release() {
        let temp_dir = TempDir::new().unwrap();
        let lock_path = temp_dir.path().join("locks/rollup.lock");

        let lock = RunLock::acquire(&lock_path).unwrap();
        assert!(lock_path.exists());

        lock.release().unwrap();
        assert!(!lock_path.exists());
    }

    #[test]
    fn test_lock_content() {
        let temp_dir = TempDir::new().unwrap();
        let lock_file = temp_dir.path().join("test.lock");

        let mut file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&lock_file)
            .unwrap();

        RunLock::write_lock_content(&mut file).unwrap();
        let content = RunLock::read_lock_content(&mut file).unwrap();

        assert_eq!(content.pid, std::process::id());
        assert!(content.started_at > 0);
    }

    #[test]
    fn test_leftover_file_without_flock_is_reused() {
        let temp_dir = TempDir::new().unwrap();
        let lock_path = temp_dir.path().join("rollup.lock");
        std::fs::write(&lock_path, r#"{"pid":999999,"started_at":0}"#).unwrap();

        let lock = RunLock::acquire(&lock_path).unwrap();
        let mut file = File::open(&lock_path).unwrap();
        let content = RunLock::read_lock_content(&mut file).unwrap();
        assert_eq!(content.pid, std::process::id());
        drop(lock);
    }

    /// Holds the `flock` through a second open file description
    #[cfg(unix)]
    fn hold_flock(lock_path: &Path, content: &str) -> File {
        use nix::fcntl::{flock, FlockArg};
        use std::os::unix::io::AsRawFd;

        std::fs::write(lock_path, content).unwrap();
        let holder = OpenOptions::new().read(true).write(true).open(lock_path).unwrap();
        flock(holder.as_raw_fd(), FlockArg::LockExclusiveNonblock).unwrap();
        holder
    }

    #[cfg(unix)]
    #[test]
    fn test_held_flock_with_empty_content_is_not_taken() {
        let temp_dir = TempDir::new().unwrap();
        let lock_path = temp_dir.path().join("rollup.lock");

        // A holder caught between truncating and writing its pid
        let holder = hold_flock(&lock_path, "");
        assert!(RunLock::acquire(&lock_path).is_err());
        assert!(lock_path.exists());

        drop(holder);
        assert!(RunLock::acquire(&lock_path).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_held_flock_with_foreign_pid_is_not_taken() {
        let temp_dir = TempDir::new().unwrap();
        let lock_path = temp_dir.path().join("rollup.lock");

        // A holder whose pid is not visible here, e.g. another pid namespace
        let _holder = hold_flock(&lock_path, r#"{"pid":999999,"started_at":0}"#);
        assert!(RunLock::acquire(&lock_path).is_err());

        let content = std::fs::read_to_string(&lock_path).unwrap();
        assert!(content.contains("999999"));
    }

    #[cfg(unix)]
    #[test]
    fn test_unlinked_lock_file_is_detected() {
        let temp_dir = TempDir::new().unwrap();
        let lock_path = temp_dir.path().join("rollup.lock");

        let stale = File::create(&lock_path).unwrap();
        assert!(is_linked_at(&stale, &lock_path).unwrap());

        std::fs::remove_file(&lock_path).unwrap();
        assert!(!is_linked_at(&stale, &lock_path).unwrap());

        File::create(&lock_path).unwrap();
        assert!(!is_linked_at(&stale, &lock_path).unwrap());
    }
}
