//! The open-folder sequence shared by both front ends.
//!
//! [`FolderView::begin_open`] disables the open control and records the
//! folder. The tree is then rebuilt either in one pass with a yield callback
//! ([`FolderView::finish_open`]) or a time slice at a time from the host's
//! event loop ([`FolderView::step_open`]).

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{info, warn};

use crate::error::{Result, ViewerError};
use crate::path_codec::{file_name_text, path_to_display_text};
use crate::populate::{PopulateJob, PopulateStats};
use crate::tree::{DisplayTree, NodeHandle, NodeKind, TreeWidget};

/// Outcome of one [`FolderView::step_open`] slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenProgress {
    Idle,
    Scanning { entries: u64 },
    Finished(PopulateStats),
}

#[derive(Default)]
pub struct FolderView {
    tree: DisplayTree,
    pending: Option<PathBuf>,
    job: Option<PopulateJob<NodeHandle>>,
    root_path: Option<PathBuf>,
    last_stats: Option<PopulateStats>,
    /// Bumped on every completed open.
    generation: u64,
}

impl FolderView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tree(&self) -> &DisplayTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut DisplayTree {
        &mut self.tree
    }

    /// Whether the "Open Folder" control should accept input.
    pub fn is_open_enabled(&self) -> bool {
        self.pending.is_none()
    }

    pub fn pending_path(&self) -> Option<&Path> {
        self.pending.as_deref()
    }

    pub fn root_path(&self) -> Option<&Path> {
        self.root_path.as_deref()
    }

    pub fn last_stats(&self) -> Option<&PopulateStats> {
        self.last_stats.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn begin_open(&mut self, path: impl Into<PathBuf>) -> Result<()> {
        if self.pending.is_some() {
            return Err(ViewerError::OpenInProgress);
        }
        let path = path.into();
        info!(path = %path.display(), "opening folder");
        self.pending = Some(path);
        Ok(())
    }

    /// Entries handled so far by a running stepped open.
    pub fn scanned_entries(&self) -> Option<u64> {
        self.job.as_ref().map(|job| job.processed())
    }

    /// Clear the tree and insert the root of the pending folder.
    fn start_job(&mut self) -> Option<&mut PopulateJob<NodeHandle>> {
        if self.job.is_none() {
            let root_path = self.pending.clone()?;
            self.tree.delete_all();
            self.root_path = Some(root_path.clone());

            let root = self.tree.add_root(file_name_text(&root_path), NodeKind::Folder);
            self.job = Some(PopulateJob::new(&root_path, root));
        }
        self.job.as_mut()
    }

    fn complete(&mut self, job: PopulateJob<NodeHandle>) -> PopulateStats {
        let stats = job.finish();
        if let Some(root) = self.tree.root() {
            self.tree.expand(root);
        }

        self.pending = None;
        self.generation = self.generation.wrapping_add(1);
        self.last_stats = Some(stats);

        info!(
            path = %self.root_path.as_deref().map(path_to_display_text).unwrap_or_default(),
            folders = stats.folders,
            files = stats.files,
            skipped = stats.skipped,
            unreadable = stats.unreadable_dirs,
            duration_ms = stats.duration_ms as u64,
            "folder opened"
        );
        stats
    }

    /// Replace the tree with the contents of the pending folder in one pass.
    ///
    /// `on_yield` runs before every entry. Returns `None` when no open was
    /// requested.
    pub fn finish_open<Y>(&mut self, on_yield: &mut Y) -> Option<PopulateStats>
    where
        Y: FnMut(&DisplayTree),
    {
        self.start_job()?;
        let mut job = self.job.take()?;
        while job.has_pending() {
            on_yield(&self.tree);
            job.advance(&mut self.tree);
        }
        Some(self.complete(job))
    }

    /// Work on the pending open for about `budget`, then hand control back.
    ///
    /// The open control stays disabled until this reports `Finished`.
    pub fn step_open(&mut self, budget: Duration) -> OpenProgress {
        if self.start_job().is_none() {
            return OpenProgress::Idle;
        }
        let Some(mut job) = self.job.take() else {
            return OpenProgress::Idle;
        };

        if job.step(&mut self.tree, budget) {
            OpenProgress::Finished(self.complete(job))
        } else {
            let entries = job.processed();
            self.job = Some(job);
            OpenProgress::Scanning { entries }
        }
    }

    pub fn open_folder<Y>(&mut self, path: impl Into<PathBuf>, on_yield: &mut Y) -> Result<PopulateStats>
    where
        Y: FnMut(&DisplayTree),
    {
        self.begin_open(path)?;
        Ok(self.finish_open(on_yield).unwrap_or_default())
    }

    /// Request the startup folder: `start` if given, else the working directory.
    ///
    /// Leaves the tree empty when the working directory cannot be resolved.
    pub fn begin_startup(&mut self, start: Option<PathBuf>) -> Result<()> {
        let path = match start {
            Some(path) => path,
            None => match std::env::current_dir() {
                Ok(cwd) => cwd,
                Err(err) => {
                    warn!(%err, "could not resolve the working directory, starting empty");
                    return Ok(());
                }
            },
        };
        self.begin_open(path)
    }
}

/// One-line summary of a finished scan for status bars.
pub fn status_line(view: &FolderView) -> String {
    let Some(root) = view.root_path() else {
        return "No folder open".to_string();
    };
    let Some(stats) = view.last_stats() else {
        return path_to_display_text(root);
    };

    let mut line = format!(
        "{}  |  {} folders, {} files",
        path_to_display_text(root),
        stats.folders,
        stats.files
    );
    if stats.unreadable_dirs > 0 {
        line.push_str(&format!(", {} unreadable", stats.unreadable_dirs));
    }
    if stats.skipped > 0 {
        line.push_str(&format!(", {} skipped", stats.skipped));
    }
    line
}
