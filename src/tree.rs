use indextree::{Arena, NodeId};

/// Opaque handle to a node in a [`DisplayTree`].
pub type NodeHandle = NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Folder,
    File,
}

impl NodeKind {
    pub fn icon(self) -> &'static str {
        match self {
            NodeKind::Folder => "📁",
            NodeKind::File => "📄",
        }
    }
}

/// Represents a node in the display tree
#[derive(Debug, Clone)]
pub struct TreeNode {
    pub label: String,
    pub kind: NodeKind,
    pub expanded: bool,
}

/// Operations the populator needs from a tree widget.
pub trait TreeWidget {
    type Handle: Copy;

    fn add_root(&mut self, label: String, kind: NodeKind) -> Self::Handle;
    fn append_child(&mut self, parent: Self::Handle, label: String, kind: NodeKind) -> Self::Handle;
    fn delete_all(&mut self);
    fn expand(&mut self, node: Self::Handle);
}

/// A single row of the tree as a list renderer sees it.
#[derive(Debug, Clone)]
pub struct VisibleRow {
    pub handle: NodeHandle,
    pub depth: usize,
    pub label: String,
    pub kind: NodeKind,
    pub expanded: bool,
    pub has_children: bool,
}

/// Hierarchical display model backed by an arena allocator
pub struct DisplayTree {
    arena: Arena<TreeNode>,
    root: Option<NodeId>,
}

impl Default for DisplayTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplayTree {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
            root: None,
        }
    }

    pub fn root(&self) -> Option<NodeHandle> {
        self.root
    }

    pub fn get(&self, node: NodeHandle) -> Option<&TreeNode> {
        self.arena.get(node).map(|n| n.get())
    }

    pub fn children(&self, node: NodeHandle) -> impl Iterator<Item = NodeHandle> + '_ {
        node.children(&self.arena)
    }

    pub fn child_count(&self, node: NodeHandle) -> usize {
        self.children(node).count()
    }

    /// Labels of the direct children, in insertion order.
    pub fn child_labels(&self, node: NodeHandle) -> Vec<&str> {
        self.children(node)
            .filter_map(|id| self.get(id))
            .map(|n| n.label.as_str())
            .collect()
    }

    /// Number of live nodes, root included.
    pub fn len(&self) -> usize {
        match self.root {
            Some(root) => root.descendants(&self.arena).count(),
            None => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn is_expanded(&self, node: NodeHandle) -> bool {
        self.get(node).map(|n| n.expanded).unwrap_or(false)
    }

    pub fn set_expanded(&mut self, node: NodeHandle, expanded: bool) {
        if let Some(n) = self.arena.get_mut(node) {
            n.get_mut().expanded = expanded;
        }
    }

    pub fn toggle(&mut self, node: NodeHandle) {
        let expanded = self.is_expanded(node);
        self.set_expanded(node, !expanded);
    }

    pub fn parent(&self, node: NodeHandle) -> Option<NodeHandle> {
        self.arena.get(node).and_then(|n| n.parent())
    }

    /// Flatten the tree into rows, descending only into expanded folders.
    pub fn visible_rows(&self) -> Vec<VisibleRow> {
        let mut rows = Vec::new();
        if let Some(root) = self.root {
            self.collect_rows(root, 0, &mut rows);
        }
        rows
    }

    fn collect_rows(&self, node_id: NodeId, depth: usize, out: &mut Vec<VisibleRow>) {
        let Some(node) = self.get(node_id) else {
            return;
        };

        let has_children = node_id.children(&self.arena).next().is_some();
        out.push(VisibleRow {
            handle: node_id,
            depth,
            label: node.label.clone(),
            kind: node.kind,
            expanded: node.expanded,
            has_children,
        });

        if node.expanded {
            for child in node_id.children(&self.arena) {
                self.collect_rows(child, depth + 1, out);
            }
        }
    }
}

impl TreeWidget for DisplayTree {
    type Handle = NodeHandle;

    fn add_root(&mut self, label: String, kind: NodeKind) -> NodeHandle {
        let root = self.arena.new_node(TreeNode {
            label,
            kind,
            expanded: false,
        });
        self.root = Some(root);
        root
    }

    fn append_child(&mut self, parent: NodeHandle, label: String, kind: NodeKind) -> NodeHandle {
        let node_id = self.arena.new_node(TreeNode {
            label,
            kind,
            expanded: false,
        });
        parent.append(node_id, &mut self.arena);
        node_id
    }

    fn delete_all(&mut self) {
        self.arena = Arena::new();
        self.root = None;
    }

    fn expand(&mut self, node: NodeHandle) {
        self.set_expanded(node, true);
    }
}
