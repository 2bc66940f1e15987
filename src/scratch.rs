//! Scratch directory and temporary audio file tracking
//!
//! Network synthesis renders to a file before it can be played. Those
//! files live in one scratch directory under the OS temp root and are
//! tracked here from allocation until they are confirmed deleted.
//!
//! Deletion is retried with a growing backoff because players on some
//! platforms keep the file locked for a moment after they return. A
//! file that still can't be removed is left on disk and reported with a
//! warning; nothing here ever fails the caller.

use crate::Result;
use log::{debug, info, warn};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Directory name under the OS temp root shared by all sessions
pub const DEFAULT_DIR_NAME: &str = "unitts_audio";

/// File name prefix for allocated files
pub const DEFAULT_PREFIX: &str = "unitts_audio";

/// Number of deletion attempts before giving up on a file
pub const DELETE_ATTEMPTS: u32 = 3;

/// Base delay between deletion attempts, multiplied by the attempt number
pub const DELETE_BACKOFF: Duration = Duration::from_millis(500);

/// Last millisecond stamp handed out in this process
static LAST_STAMP: AtomicU64 = AtomicU64::new(0);

/// Next strictly increasing millisecond timestamp
///
/// Falls back to `last + 1` when the clock hasn't moved (or went back),
/// so two allocations in the same millisecond still get distinct names.
fn next_stamp() -> u64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);

    let mut last = LAST_STAMP.load(Ordering::Relaxed);
    loop {
        let next = now.max(last + 1);
        match LAST_STAMP.compare_exchange_weak(last, next, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return next,
            Err(actual) => last = actual,
        }
    }
}

/// Removes a single file from disk
///
/// The manager goes through this seam for every deletion so callers can
/// substitute their own (for example to simulate a locked file).
pub trait FileRemover {
    fn remove(&self, path: &Path) -> io::Result<()>;
}

/// Plain `std::fs::remove_file`
#[derive(Debug, Default, Clone, Copy)]
pub struct FsRemover;

impl FileRemover for FsRemover {
    fn remove(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }
}

/// A file allocated in the scratch directory
#[derive(Debug, Clone)]
pub struct TempFile {
    path: PathBuf,
    created: SystemTime,
    preserved: bool,
}

impl TempFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn created(&self) -> SystemTime {
        self.created
    }

    /// Kept back from per-call sweeps (playback failed, left for inspection)
    pub fn is_preserved(&self) -> bool {
        self.preserved
    }
}

/// Allocates, tracks and removes temporary audio files
pub struct TempFileManager {
    /// Scratch directory (created lazily on first allocation)
    dir: PathBuf,

    /// File name prefix
    prefix: String,

    /// Files created but not yet confirmed deleted, in allocation order
    tracked: Vec<TempFile>,

    /// Deletion attempts per file
    attempts: u32,

    /// Backoff unit between attempts
    backoff: Duration,

    remover: Box<dyn FileRemover>,
}

impl TempFileManager {
    /// Manager for the shared scratch directory under the OS temp root
    pub fn new() -> Self {
        Self::with_dir(std::env::temp_dir().join(DEFAULT_DIR_NAME))
    }

    /// Manager for a specific scratch directory
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            prefix: DEFAULT_PREFIX.to_string(),
            tracked: Vec::new(),
            attempts: DELETE_ATTEMPTS,
            backoff: DELETE_BACKOFF,
            remover: Box::new(FsRemover),
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Override the backoff unit (attempt `n` waits `n * backoff`)
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_remover(mut self, remover: Box<dyn FileRemover>) -> Self {
        self.remover = remover;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Outstanding files, oldest first
    pub fn tracked(&self) -> &[TempFile] {
        &self.tracked
    }

    pub fn is_tracked(&self, path: &Path) -> bool {
        self.tracked.iter().any(|f| f.path == path)
    }

    /// Reserve a unique path in the scratch directory
    ///
    /// The name is `<prefix>_<millis><suffix>`. Only the directory is
    /// created here; the caller creates the file itself.
    pub fn allocate(&mut self, suffix: &str) -> Result<PathBuf> {
        if !self.dir.exists() {
            debug!("Creating scratch directory {:?}", self.dir);
            fs::create_dir_all(&self.dir)?;
        }

        let name = format!("{}_{}{}", self.prefix, next_stamp(), suffix);
        let path = self.dir.join(name);
        debug!("Allocated temporary file {:?}", path);

        self.tracked.push(TempFile {
            path: path.clone(),
            created: SystemTime::now(),
            preserved: false,
        });
        Ok(path)
    }

    /// Exclude a tracked file from per-call sweeps
    ///
    /// It stays tracked, so `release_all` and `teardown` still remove it.
    pub fn preserve(&mut self, path: &Path) -> bool {
        match self.tracked.iter_mut().find(|f| f.path == path) {
            Some(file) => {
                file.preserved = true;
                true
            }
            None => false,
        }
    }

    /// Delete a file, retrying with backoff
    ///
    /// Returns `true` once the file is gone (an already missing file
    /// counts). The handle is dropped from the tracked set only then.
    pub fn release(&mut self, path: &Path) -> bool {
        let name = display_name(path);

        for attempt in 1..=self.attempts {
            match self.remover.remove(path) {
                Ok(()) => {
                    info!("Deleted temporary file: {}", name);
                    self.untrack(path);
                    return true;
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    debug!("Temporary file already gone: {}", name);
                    self.untrack(path);
                    return true;
                }
                Err(e) => {
                    if attempt < self.attempts {
                        debug!(
                            "Could not delete {} on attempt {}: {}. Will retry.",
                            name, attempt, e
                        );
                        thread::sleep(self.backoff * attempt);
                    } else {
                        debug!("Final delete attempt for {} failed: {}", name, e);
                    }
                }
            }
        }

        warn!(
            "Could not delete temporary file {}; it is left for the OS temp cleanup",
            path.display()
        );
        false
    }

    /// Release every tracked file that isn't preserved
    ///
    /// Returns how many files could not be removed.
    pub fn release_transient(&mut self) -> usize {
        let snapshot: Vec<PathBuf> = self
            .tracked
            .iter()
            .filter(|f| !f.preserved)
            .map(|f| f.path.clone())
            .collect();

        snapshot.iter().filter(|path| !self.release(path)).count()
    }

    /// Release every tracked file, then sweep the scratch directory
    ///
    /// The sweep removes every regular file in the directory whether or
    /// not this manager allocated it.
    pub fn release_all(&mut self) {
        let snapshot: Vec<PathBuf> = self.tracked.iter().map(|f| f.path.clone()).collect();
        for path in &snapshot {
            self.release(path);
        }

        self.sweep_dir();

        // The sweep may have taken files that exhausted their retries
        self.tracked.retain(|f| f.path.exists());
    }

    /// Final cleanup, safe to call any number of times
    pub fn teardown(&mut self) {
        debug!("Tearing down scratch directory {:?}", self.dir);
        self.release_all();
    }

    fn untrack(&mut self, path: &Path) {
        self.tracked.retain(|f| f.path != path);
    }

    fn sweep_dir(&self) {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return,
            Err(e) => {
                warn!("Error cleaning temp folder {:?}: {}", self.dir, e);
                return;
            }
        };

        for entry in entries.flatten() {
            let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
            if !is_file {
                continue;
            }

            let path = entry.path();
            match self.remover.remove(&path) {
                Ok(()) => info!("Deleted file from temp folder: {}", display_name(&path)),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to delete file {}: {}", path.display(), e),
            }
        }
    }
}

impl Default for TempFileManager {
    fn default() -> Self {
        Self::new()
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
