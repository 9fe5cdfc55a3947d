use std::sync::Arc;

use glam::Affine3A;

use crate::scene::node::Prefab;

/// Stable, insertion-ordered entity identifier.
pub type EntityId = u32;

/// What an entity contributes to the frame.
#[derive(Debug, Clone)]
pub enum EntityKind {
    /// A transform-only entity. Carries no geometry.
    Base,
    /// An instanced prefab; the only entity kind with renderable geometry.
    Prefab(Arc<Prefab>),
}

/// A scene entity: an id, a world transform and a kind.
///
/// Ids are unique and increase with insertion order; the renderer iterates
/// entities in list order and never reorders them.
#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub visible: bool,
    pub transform: Affine3A,
    pub kind: EntityKind,
}

impl Entity {
    /// Creates a prefab entity with the given model transform. The id is
    /// assigned by [`crate::scene::Scene::add_entity`].
    #[must_use]
    pub fn prefab(prefab: Arc<Prefab>, transform: Affine3A) -> Self {
        Self {
            id: 0,
            visible: true,
            transform,
            kind: EntityKind::Prefab(prefab),
        }
    }

    /// Creates a transform-only entity.
    #[must_use]
    pub fn base(transform: Affine3A) -> Self {
        Self {
            id: 0,
            visible: true,
            transform,
            kind: EntityKind::Base,
        }
    }
}
