use std::sync::Arc;

use glam::Affine3A;
use smallvec::SmallVec;

use crate::resources::{Material, Mesh};

/// A node in a prefab's hierarchy.
///
/// Nodes with both a mesh and a material are renderable; any node may carry
/// children. Local transforms compose parent-to-child during traversal, so a
/// node's world matrix is `prefab_model * local_0 * ... * local_n`.
#[derive(Debug, Clone)]
pub struct Node {
    pub visible: bool,
    pub transform: Affine3A,
    pub mesh: Option<Arc<Mesh>>,
    pub material: Option<Arc<Material>>,
    pub children: SmallVec<[Box<Node>; 4]>,
}

impl Node {
    #[must_use]
    pub fn new() -> Self {
        Self {
            visible: true,
            transform: Affine3A::IDENTITY,
            mesh: None,
            material: None,
            children: SmallVec::new(),
        }
    }

    /// Creates a renderable leaf node.
    #[must_use]
    pub fn with_mesh(mesh: Arc<Mesh>, material: Arc<Material>) -> Self {
        Self {
            visible: true,
            transform: Affine3A::IDENTITY,
            mesh: Some(mesh),
            material: Some(material),
            children: SmallVec::new(),
        }
    }

    pub fn add_child(&mut self, child: Node) {
        self.children.push(Box::new(child));
    }

    /// True when this node has no children.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::new()
    }
}

/// A reusable hierarchy of nodes; instantiated in a scene through
/// [`crate::scene::EntityKind::Prefab`].
#[derive(Debug, Clone)]
pub struct Prefab {
    pub root: Node,
}

impl Default for Prefab {
    fn default() -> Self {
        Self { root: Node::new() }
    }
}

impl Prefab {
    #[must_use]
    pub fn new(root: Node) -> Self {
        Self { root }
    }
}
