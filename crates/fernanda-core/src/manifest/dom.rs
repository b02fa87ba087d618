//! Arena-backed XML DOM for the manifest.
//!
//! Nodes carry a stable integer handle; children are vectors of handles.
//! Detached subtrees stay in the arena (unreachable from the root) so
//! handles never dangle within a session. Attributes keep document order,
//! which lets unknown attributes round-trip intact.

use std::fmt;

pub const DOCUMENT_TAG: &str = "fnx";
pub const NOTEBOOK_TAG: &str = "notebook";
pub const TRASH_TAG: &str = "trash";
pub const VFOLDER_TAG: &str = "vfolder";
pub const FILE_TAG: &str = "file";

pub const VERSION_ATTR: &str = "version";
pub const FNX_VERSION: &str = "1.0";
pub const NAME_ATTR: &str = "name";
pub const UUID_ATTR: &str = "uuid";
pub const EXT_ATTR: &str = "extension";
pub const EDITED_ATTR: &str = "edited";
pub const RESTORE_PARENT_UUID_ATTR: &str = "parent_on_restore_uuid";

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) u32);

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

#[derive(Debug, Clone)]
struct Node {
    tag: String,
    attrs: Vec<(String, String)>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct Dom {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Dom {
    pub fn with_root(tag: &str) -> Self {
        let root = Node {
            tag: tag.to_string(),
            attrs: Vec::new(),
            parent: None,
            children: Vec::new(),
        };

        Self {
            nodes: vec![root],
            root: NodeId(0),
        }
    }

    /// `<fnx version="1.0"><notebook/><trash/></fnx>`
    pub fn new_minimal() -> Self {
        let mut dom = Self::with_root(DOCUMENT_TAG);
        dom.set_attr(dom.root(), VERSION_ATTR, FNX_VERSION);

        let notebook = dom.create_element(NOTEBOOK_TAG);
        dom.append_child(dom.root(), notebook);
        let trash = dom.create_element(TRASH_TAG);
        dom.append_child(dom.root(), trash);

        dom
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            tag: tag.to_string(),
            attrs: Vec::new(),
            parent: None,
            children: Vec::new(),
        });
        id
    }

    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0 as usize]
    }

    pub fn tag(&self, id: NodeId) -> &str {
        &self.node(id).tag
    }

    pub fn attr(&self, id: NodeId, key: &str) -> Option<&str> {
        self.node(id)
            .attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_attr(&self, id: NodeId, key: &str) -> bool {
        self.attr(id, key).is_some()
    }

    pub fn attrs(&self, id: NodeId) -> &[(String, String)] {
        &self.node(id).attrs
    }

    pub fn set_attr(&mut self, id: NodeId, key: &str, value: &str) {
        let node = self.node_mut(id);
        match node.attrs.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value.to_string(),
            None => node.attrs.push((key.to_string(), value.to_string())),
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, key: &str) {
        self.node_mut(id).attrs.retain(|(k, _)| k != key);
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn child_count(&self, id: NodeId) -> usize {
        self.node(id).children.len()
    }

    pub fn nth_child(&self, id: NodeId, n: usize) -> Option<NodeId> {
        self.node(id).children.get(n).copied()
    }

    /// Row of `id` within its parent's children; 0 for the root.
    pub fn row_of(&self, id: NodeId) -> usize {
        let Some(parent) = self.parent(id) else {
            return 0;
        };

        self.node(parent)
            .children
            .iter()
            .position(|&c| c == id)
            .unwrap_or(0)
    }

    /// Detach `id` from its parent; the subtree stays intact.
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.node(id).parent else {
            return;
        };

        self.node_mut(parent).children.retain(|&c| c != id);
        self.node_mut(id).parent = None;
    }

    /// Append `child` under `parent`, detaching it from any previous parent.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if parent == child || self.is_ancestor(child, parent) {
            return;
        }

        self.detach(child);
        self.node_mut(parent).children.push(child);
        self.node_mut(child).parent = Some(parent);
    }

    /// True if `ancestor` is a strict ancestor of `id`.
    pub fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = self.parent(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// Preorder walk of the subtree rooted at `id`, including `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack = vec![id];

        while let Some(node) = stack.pop() {
            result.push(node);
            for &child in self.node(node).children.iter().rev() {
                stack.push(child);
            }
        }

        result
    }

    pub fn find_child_by_tag(&self, parent: NodeId, tag: &str) -> Option<NodeId> {
        self.node(parent)
            .children
            .iter()
            .copied()
            .find(|&c| self.tag(c) == tag)
    }

    /// First node under the root (inclusive walk) with `attr(key) == value`.
    pub fn find_by_attr(&self, key: &str, value: &str) -> Option<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .find(|&id| self.attr(id, key) == Some(value))
    }
}
