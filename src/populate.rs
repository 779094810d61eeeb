use std::cmp::Ordering;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::path_codec::os_str_to_display_text;
use crate::tree::{NodeKind, TreeWidget};

const PROGRESS_EMIT_INTERVAL_MS: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryClass {
    Folder { is_symlink: bool },
    File,
    /// The directory check failed; the entry is not inserted.
    Unclassified,
}

impl EntryClass {
    pub fn is_dir(self) -> bool {
        matches!(self, EntryClass::Folder { .. })
    }
}

/// One item of a directory listing, classified once.
#[derive(Debug, Clone)]
pub struct DirEntryInfo {
    pub path: PathBuf,
    pub file_name: OsString,
    pub class: EntryClass,
}

impl DirEntryInfo {
    fn from_entry(entry: &fs::DirEntry) -> Self {
        let path = entry.path();

        // Directory-ness follows links; the link check looks at the entry itself.
        let class = match fs::metadata(&path) {
            Ok(meta) if meta.is_dir() => {
                let is_symlink = entry
                    .file_type()
                    .map(|ft| ft.is_symlink())
                    .unwrap_or(false);
                EntryClass::Folder { is_symlink }
            }
            Ok(_) => EntryClass::File,
            Err(err) => {
                debug!(path = %path.display(), %err, "could not classify entry");
                EntryClass::Unclassified
            }
        };

        Self {
            path,
            file_name: entry.file_name(),
            class,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PopulateStats {
    pub folders: u64,
    pub files: u64,
    /// Symlinked folders that were listed but not descended into.
    pub symlinks_not_followed: u64,
    pub skipped: u64,
    pub unreadable_dirs: u64,
    pub duration_ms: u128,
}

impl PopulateStats {
    pub fn inserted(&self) -> u64 {
        self.folders + self.files
    }
}

/// Folders first, then file names in ascending order.
pub fn compare_entries(a: &DirEntryInfo, b: &DirEntryInfo) -> Ordering {
    b.class
        .is_dir()
        .cmp(&a.class.is_dir())
        .then_with(|| a.file_name.cmp(&b.file_name))
}

/// List the immediate entries of `path` in display order.
///
/// A directory that cannot be read yields no entries.
pub fn list_sorted_entries(path: &Path, stats: &mut PopulateStats) -> Vec<DirEntryInfo> {
    let read_dir = match fs::read_dir(path) {
        Ok(read_dir) => read_dir,
        Err(err) => {
            debug!(path = %path.display(), %err, "could not list directory");
            stats.unreadable_dirs += 1;
            return Vec::new();
        }
    };

    let mut entries = Vec::new();
    for entry_result in read_dir {
        match entry_result {
            Ok(entry) => entries.push(DirEntryInfo::from_entry(&entry)),
            Err(err) => {
                debug!(path = %path.display(), %err, "dropping unreadable listing item");
                stats.skipped += 1;
            }
        }
    }

    entries.sort_by(compare_entries);
    entries
}

/// Insert the contents of `path` below `parent`, recursing into folders.
///
/// `on_yield` runs before each entry is inserted and sees the tree as built
/// so far. Filesystem errors are never returned.
pub fn populate_tree<W, Y>(tree: &mut W, path: &Path, parent: W::Handle, on_yield: &mut Y) -> PopulateStats
where
    W: TreeWidget,
    Y: FnMut(&W),
{
    let mut job = PopulateJob::new(path, parent);
    while job.has_pending() {
        on_yield(tree);
        job.advance(tree);
    }
    job.finish()
}

/// Sorted entries of one directory still waiting to be inserted.
struct Frame<H> {
    /// Reversed so the next entry is popped off the end.
    remaining: Vec<DirEntryInfo>,
    parent: H,
}

/// A depth-first populate pass that can be suspended between entries.
///
/// Inserts nodes in exactly the order of a recursive walk: a folder's
/// contents go in right after the folder itself, before its next sibling.
pub struct PopulateJob<H> {
    stack: Vec<Frame<H>>,
    stats: PopulateStats,
    processed: u64,
    started: Instant,
    last_emit: Instant,
}

impl<H: Copy> PopulateJob<H> {
    pub fn new(path: &Path, parent: H) -> Self {
        let mut job = Self {
            stack: Vec::new(),
            stats: PopulateStats::default(),
            processed: 0,
            started: Instant::now(),
            last_emit: Instant::now(),
        };
        job.push_listing(path, parent);
        job
    }

    fn push_listing(&mut self, path: &Path, parent: H) {
        let mut remaining = list_sorted_entries(path, &mut self.stats);
        if remaining.is_empty() {
            return;
        }
        remaining.reverse();
        self.stack.push(Frame { remaining, parent });
    }

    /// Whether any entry is left to insert.
    pub fn has_pending(&mut self) -> bool {
        while let Some(frame) = self.stack.last() {
            if !frame.remaining.is_empty() {
                return true;
            }
            self.stack.pop();
        }
        false
    }

    /// Entries handled so far, skipped ones included.
    pub fn processed(&self) -> u64 {
        self.processed
    }

    pub fn stats(&self) -> &PopulateStats {
        &self.stats
    }

    /// Insert the next entry. Returns `false` once nothing is left.
    pub fn advance<W>(&mut self, tree: &mut W) -> bool
    where
        W: TreeWidget<Handle = H>,
    {
        if !self.has_pending() {
            return false;
        }
        let Some(frame) = self.stack.last_mut() else {
            return false;
        };
        let parent = frame.parent;
        let Some(entry) = frame.remaining.pop() else {
            return false;
        };
        self.processed += 1;

        let label = os_str_to_display_text(&entry.file_name);
        match entry.class {
            EntryClass::Folder { is_symlink } => {
                let node = tree.append_child(parent, label, NodeKind::Folder);
                self.stats.folders += 1;
                if is_symlink {
                    self.stats.symlinks_not_followed += 1;
                } else {
                    self.push_listing(&entry.path, node);
                }
            }
            EntryClass::File => {
                tree.append_child(parent, label, NodeKind::File);
                self.stats.files += 1;
            }
            EntryClass::Unclassified => {
                self.stats.skipped += 1;
            }
        }
        true
    }

    /// Insert entries until `budget` has elapsed. Always inserts at least one
    /// entry when any is pending. Returns `true` when the pass is complete.
    pub fn step<W>(&mut self, tree: &mut W, budget: Duration) -> bool
    where
        W: TreeWidget<Handle = H>,
    {
        let deadline = Instant::now() + budget;
        while self.advance(tree) {
            if Instant::now() >= deadline {
                break;
            }
        }

        if self.last_emit.elapsed() >= Duration::from_millis(PROGRESS_EMIT_INTERVAL_MS) {
            self.last_emit = Instant::now();
            debug!(entries = self.processed, "scanning");
        }
        !self.has_pending()
    }

    pub fn finish(mut self) -> PopulateStats {
        self.stats.duration_ms = self.started.elapsed().as_millis();
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::DisplayTree;
    use std::fs::File;
    use tempfile::TempDir;

    fn populate(path: &Path) -> (DisplayTree, indextree::NodeId, PopulateStats) {
        let mut tree = DisplayTree::new();
        let root = tree.add_root("root".to_string(), NodeKind::Folder);
        let stats = populate_tree(&mut tree, path, root, &mut |_: &DisplayTree| {});
        (tree, root, stats)
    }

    /// (depth, label, kind) for every node below `node`, in tree order.
    fn shape(tree: &DisplayTree, node: indextree::NodeId) -> Vec<(usize, String, NodeKind)> {
        fn walk(tree: &DisplayTree, node: indextree::NodeId, depth: usize, out: &mut Vec<(usize, String, NodeKind)>) {
            for child in tree.children(node) {
                let data = tree.get(child).unwrap();
                out.push((depth, data.label.clone(), data.kind));
                walk(tree, child, depth + 1, out);
            }
        }
        let mut out = Vec::new();
        walk(tree, node, 0, &mut out);
        out
    }

    fn child_named(tree: &DisplayTree, parent: indextree::NodeId, name: &str) -> indextree::NodeId {
        tree.children(parent)
            .find(|&id| tree.get(id).map(|n| n.label == name).unwrap_or(false))
            .unwrap_or_else(|| panic!("no child named {}", name))
    }

    #[test]
    fn test_folders_before_files() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("b")).unwrap();
        File::create(dir.path().join("a.txt")).unwrap();
        File::create(dir.path().join("c.txt")).unwrap();

        let (tree, root, stats) = populate(dir.path());

        assert_eq!(tree.child_labels(root), vec!["b", "a.txt", "c.txt"]);
        let b = child_named(&tree, root, "b");
        assert_eq!(tree.get(b).unwrap().kind, NodeKind::Folder);
        assert_eq!(stats.folders, 1);
        assert_eq!(stats.files, 2);
    }

    #[test]
    fn test_ordering_invariant_with_mixed_names() {
        let dir = TempDir::new().unwrap();
        for name in ["zeta", "Alpha", "mid", "_under"] {
            fs::create_dir(dir.path().join(name)).unwrap();
        }
        for name in ["b.rs", "A.md", "apple.md", "Z", "ü.txt"] {
            File::create(dir.path().join(name)).unwrap();
        }

        let (tree, root, _) = populate(dir.path());
        let children: Vec<_> = tree.children(root).filter_map(|id| tree.get(id)).collect();
        assert_eq!(children.len(), 9);

        for pair in children.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            match (a.kind, b.kind) {
                (NodeKind::File, NodeKind::Folder) => panic!("file {} before folder {}", a.label, b.label),
                (x, y) if x == y => assert!(a.label < b.label, "{} !< {}", a.label, b.label),
                _ => {}
            }
        }
        assert_eq!(
            tree.child_labels(root),
            vec!["Alpha", "_under", "mid", "zeta", "A.md", "Z", "apple.md", "b.rs", "ü.txt"]
        );
    }

    #[test]
    fn test_recurses_into_subfolders() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("src").join("bin")).unwrap();
        File::create(dir.path().join("src").join("lib.rs")).unwrap();
        File::create(dir.path().join("src").join("bin").join("main.rs")).unwrap();

        let (tree, root, stats) = populate(dir.path());

        let src = child_named(&tree, root, "src");
        assert_eq!(tree.child_labels(src), vec!["bin", "lib.rs"]);
        let bin = child_named(&tree, src, "bin");
        assert_eq!(tree.child_labels(bin), vec!["main.rs"]);
        assert_eq!(stats.inserted(), 4);
    }

    #[test]
    fn test_child_count_matches_entry_count() {
        let dir = TempDir::new().unwrap();
        for i in 0..25 {
            File::create(dir.path().join(format!("f{:02}", i))).unwrap();
        }
        for i in 0..5 {
            fs::create_dir(dir.path().join(format!("d{}", i))).unwrap();
        }

        let (tree, root, _) = populate(dir.path());
        assert_eq!(tree.child_count(root), 30);
    }

    #[test]
    fn test_unreadable_directory_yields_no_children() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("does-not-exist");

        let (tree, root, stats) = populate(&missing);

        assert_eq!(tree.child_count(root), 0);
        assert_eq!(stats.unreadable_dirs, 1);
        assert_eq!(stats.inserted(), 0);
    }

    #[test]
    fn test_listing_a_file_yields_no_children() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("plain.txt");
        File::create(&file).unwrap();

        let (tree, root, _) = populate(&file);
        assert_eq!(tree.child_count(root), 0);
    }

    #[test]
    fn test_yield_runs_once_per_entry() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        File::create(dir.path().join("sub").join("inner")).unwrap();
        File::create(dir.path().join("outer")).unwrap();

        let mut tree = DisplayTree::new();
        let root = tree.add_root("root".to_string(), NodeKind::Folder);
        let mut seen_sizes = Vec::new();
        populate_tree(&mut tree, dir.path(), root, &mut |t: &DisplayTree| seen_sizes.push(t.len()));

        // Each yield sees the nodes inserted before it.
        assert_eq!(seen_sizes, vec![1, 2, 3]);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_folder_is_listed_but_not_followed() {
        use std::os::unix::fs::symlink;

        let dir = TempDir::new().unwrap();
        let target = dir.path().join("target");
        fs::create_dir(&target).unwrap();
        File::create(target.join("inside.txt")).unwrap();
        symlink(&target, dir.path().join("link")).unwrap();
        // A link back to the root would loop forever if followed.
        symlink(dir.path(), target.join("loop")).unwrap();

        let (tree, root, stats) = populate(dir.path());

        assert_eq!(tree.child_labels(root), vec!["link", "target"]);
        let link = child_named(&tree, root, "link");
        assert_eq!(tree.get(link).unwrap().kind, NodeKind::Folder);
        assert_eq!(tree.child_count(link), 0);

        let target_node = child_named(&tree, root, "target");
        assert_eq!(tree.child_labels(target_node), vec!["loop", "inside.txt"]);
        assert_eq!(stats.symlinks_not_followed, 2);
    }

    #[cfg(unix)]
    #[test]
    fn test_broken_symlink_is_skipped() {
        use std::os::unix::fs::symlink;

        let dir = TempDir::new().unwrap();
        symlink(dir.path().join("nowhere"), dir.path().join("dangling")).unwrap();
        File::create(dir.path().join("real.txt")).unwrap();

        let (tree, root, stats) = populate(dir.path());

        assert_eq!(tree.child_labels(root), vec!["real.txt"]);
        assert_eq!(stats.skipped, 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_to_file_is_a_leaf() {
        use std::os::unix::fs::symlink;

        let dir = TempDir::new().unwrap();
        File::create(dir.path().join("real.txt")).unwrap();
        symlink(dir.path().join("real.txt"), dir.path().join("alias.txt")).unwrap();

        let (tree, root, _) = populate(dir.path());
        let alias = child_named(&tree, root, "alias.txt");
        assert_eq!(tree.get(alias).unwrap().kind, NodeKind::File);
    }

    #[test]
    fn test_stepped_job_matches_full_pass() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("src").join("bin")).unwrap();
        fs::create_dir(dir.path().join("docs")).unwrap();
        File::create(dir.path().join("src").join("lib.rs")).unwrap();
        File::create(dir.path().join("src").join("bin").join("main.rs")).unwrap();
        File::create(dir.path().join("docs").join("guide.md")).unwrap();
        File::create(dir.path().join("Cargo.toml")).unwrap();

        let (full, full_root, full_stats) = populate(dir.path());

        let mut stepped = DisplayTree::new();
        let root = stepped.add_root("root".to_string(), NodeKind::Folder);
        let mut job = PopulateJob::new(dir.path(), root);
        let mut steps = 0;
        while !job.step(&mut stepped, Duration::ZERO) {
            steps += 1;
        }
        steps += 1;
        let stepped_stats = job.finish();

        // A zero budget inserts one entry per step.
        assert_eq!(steps, 7);
        assert_eq!(shape(&stepped, root), shape(&full, full_root));
        assert_eq!(stepped_stats.folders, full_stats.folders);
        assert_eq!(stepped_stats.files, full_stats.files);
    }

    #[test]
    fn test_job_on_empty_folder_is_done_at_once() {
        let dir = TempDir::new().unwrap();
        let mut tree = DisplayTree::new();
        let root = tree.add_root("root".to_string(), NodeKind::Folder);

        let mut job = PopulateJob::new(dir.path(), root);
        assert!(!job.has_pending());
        assert!(job.step(&mut tree, Duration::ZERO));
        assert_eq!(job.processed(), 0);
        assert_eq!(tree.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_subfolder_is_empty_and_siblings_continue() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("a_dir")).unwrap();
        File::create(dir.path().join("a_dir").join("kept.txt")).unwrap();
        let locked = dir.path().join("locked");
        fs::create_dir(&locked).unwrap();
        File::create(locked.join("secret")).unwrap();
        fs::create_dir(dir.path().join("z_dir")).unwrap();
        File::create(dir.path().join("file.txt")).unwrap();

        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        // Privileged users can still list it; nothing to check then.
        let privileged = fs::read_dir(&locked).is_ok();
        let result = (!privileged).then(|| populate(dir.path()));
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        let Some((tree, root, stats)) = result else {
            return;
        };

        assert_eq!(tree.child_labels(root), vec!["a_dir", "locked", "z_dir", "file.txt"]);
        let locked_node = child_named(&tree, root, "locked");
        assert_eq!(tree.get(locked_node).unwrap().kind, NodeKind::Folder);
        assert_eq!(tree.child_count(locked_node), 0);
        let a_dir = child_named(&tree, root, "a_dir");
        assert_eq!(tree.child_labels(a_dir), vec!["kept.txt"]);
        assert_eq!(stats.unreadable_dirs, 1);
        assert_eq!(stats.folders, 3);
        assert_eq!(stats.files, 2);
    }
}
