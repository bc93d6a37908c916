use crate::scene::NodeHandle;
use crate::scene::transform::Transform;

/// A transform node of the imported scene graph.
///
/// # Hierarchy
///
/// Nodes form a tree structure through parent-child relationships:
/// - `parent`: Optional handle to parent node (None for root nodes)
/// - `children`: Ordered list of child node handles
///
/// Identity is structural: two nodes with equal names and transforms are
/// still distinct nodes. Bone construction never stores anything on the node
/// itself; per-build data lives in a side table keyed by [`NodeHandle`].
#[derive(Debug, Clone)]
pub struct Node {
    /// Name as it appears in the source file; skins reference bones by it.
    pub name: String,

    // === Core Hierarchy ===
    /// Parent node handle (None for root nodes)
    pub(crate) parent: Option<NodeHandle>,
    /// Child node handles
    pub(crate) children: Vec<NodeHandle>,

    // === Core Spatial Data ===
    /// Local transform relative to the parent
    pub transform: Transform,
}

impl Node {
    /// Creates a new node with identity transform.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            parent: None,
            children: Vec::new(),
            transform: Transform::new(),
        }
    }

    /// Creates a new node with the given local transform.
    #[must_use]
    pub fn with_transform(name: &str, transform: Transform) -> Self {
        Self {
            transform,
            ..Self::new(name)
        }
    }

    /// Returns the parent node handle, if any.
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<NodeHandle> {
        self.parent
    }

    /// Returns a read-only slice of child node handles.
    #[inline]
    #[must_use]
    pub fn children(&self) -> &[NodeHandle] {
        &self.children
    }
}
