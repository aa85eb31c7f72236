//! Shared directory cursor handing out one regular file per claim

use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{BoxScaleError, Result};

/// One regular file claimed from the input directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    file_name: OsString,
}

impl WorkItem {
    pub fn new<S: Into<OsString>>(file_name: S) -> Self {
        Self {
            file_name: file_name.into(),
        }
    }

    /// Entry name, identical in the input and output directories
    pub fn file_name(&self) -> &OsStr {
        &self.file_name
    }
}

/// Result of [`DirectoryQueue::claim_next`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Claim {
    Item(WorkItem),
    Exhausted,
}

/// Mutex-guarded cursor over a single directory's entries.
///
/// Every regular file is handed to exactly one caller. Directories,
/// symlinks and special files are skipped inside the claim, and entries the
/// listing fails to read are counted separately. Once the
/// underlying listing runs out the cursor is dropped and every later claim
/// returns [`Claim::Exhausted`].
pub struct DirectoryQueue {
    root: PathBuf,
    cursor: Mutex<Option<walkdir::IntoIter>>,
    claimed: AtomicU64,
    skipped: AtomicU64,
    unreadable: AtomicU64,
}

impl DirectoryQueue {
    /// Open `root` for draining. Fails if the directory cannot be read.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref();

        // walkdir opens lazily; probe now so the failure surfaces before any worker starts
        fs::read_dir(root).map_err(|e| BoxScaleError::input_directory(root, e))?;

        let entries = WalkDir::new(root)
            .min_depth(1)
            .max_depth(1)
            .follow_links(false)
            .into_iter();

        debug!("Opened directory queue on {:?}", root);

        Ok(Self {
            root: root.to_path_buf(),
            cursor: Mutex::new(Some(entries)),
            claimed: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
            unreadable: AtomicU64::new(0),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Hand out the next regular file, or `Exhausted` once the listing is done
    pub fn claim_next(&self) -> Claim {
        // the cursor is only advanced under the lock, so a poisoned guard is still usable
        let mut cursor = self.cursor.lock().unwrap_or_else(PoisonError::into_inner);

        loop {
            let Some(entries) = cursor.as_mut() else {
                return Claim::Exhausted;
            };

            match entries.next() {
                None => {
                    *cursor = None;
                    return Claim::Exhausted;
                }
                Some(Ok(entry)) if entry.file_type().is_file() => {
                    self.claimed.fetch_add(1, Ordering::Relaxed);
                    return Claim::Item(WorkItem::new(entry.file_name()));
                }
                Some(Ok(entry)) => {
                    self.skipped.fetch_add(1, Ordering::Relaxed);
                    debug!("Skipping non-regular entry {:?}", entry.path());
                }
                Some(Err(err)) => {
                    self.unreadable.fetch_add(1, Ordering::Relaxed);
                    warn!("Unreadable entry in {:?}: {}", self.root, err);
                }
            }
        }
    }

    /// Number of work items handed out so far
    pub fn claimed(&self) -> u64 {
        self.claimed.load(Ordering::Relaxed)
    }

    /// Number of entries skipped because they are not regular files
    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }

    /// Number of listing errors
    pub fn unreadable(&self) -> u64 {
        self.unreadable.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for DirectoryQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryQueue")
            .field("root", &self.root)
            .field("claimed", &self.claimed())
            .field("skipped", &self.skipped())
            .field("unreadable", &self.unreadable())
            .finish()
    }
}
