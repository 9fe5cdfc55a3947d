//! Scene extraction.
//!
//! Walks the entity list once per frame and flattens the prefab node graphs
//! into draw lists: frustum-culled items for the geometry/forward pass and
//! the opaque shadow-caster list shared by every shadow-casting light.
//!
//! Traversal uses an explicit work list rather than recursion, so prefab
//! depth is bounded only by memory.

use std::sync::Arc;

use glam::{Affine3A, Mat4};

use crate::resources::{AlphaMode, Material, Mesh};
use crate::scene::{Camera, EntityKind, Node, Scene};

/// One culled, ready-to-draw node.
#[derive(Clone)]
pub struct RenderItem {
    pub model: Mat4,
    pub mesh: Arc<Mesh>,
    pub material: Arc<Material>,
}

/// Flattened per-frame scene data.
#[derive(Default)]
pub struct ExtractedScene {
    /// Renderable nodes that survived frustum culling, in traversal order.
    pub items: Vec<RenderItem>,
    /// Opaque leaf nodes, drawn into every shadow map. Not camera-culled:
    /// casters behind the viewer still throw visible shadows.
    pub shadow_casters: Vec<RenderItem>,
}

impl ExtractedScene {
    pub fn clear(&mut self) {
        self.items.clear();
        self.shadow_casters.clear();
    }

    /// Extracts draw lists from `scene` as seen by `camera`.
    pub fn extract(&mut self, scene: &Scene, camera: &Camera) {
        self.walk(scene, Some(camera));
    }

    /// Extracts every renderable node without frustum culling, as used by
    /// the probe-capture path where each face has its own camera and bake
    /// time is dominated by readback anyway.
    pub fn extract_unculled(&mut self, scene: &Scene) {
        self.walk(scene, None);
    }

    fn walk(&mut self, scene: &Scene, cull: Option<&Camera>) {
        self.clear();

        for entity in &scene.entities {
            if !entity.visible {
                continue;
            }
            let EntityKind::Prefab(prefab) = &entity.kind else {
                continue;
            };

            let mut work: Vec<(&Node, Affine3A)> = vec![(&prefab.root, entity.transform)];
            while let Some((node, parent_world)) = work.pop() {
                // An invisible node prunes its whole subtree.
                if !node.visible {
                    continue;
                }
                let world = parent_world * node.transform;

                if let (Some(mesh), Some(material)) = (&node.mesh, &node.material) {
                    // Conservative test: nodes straddling the frustum
                    // boundary are kept.
                    let visible = match cull {
                        Some(camera) => {
                            let world_bounds = mesh.bounds.transform(&world);
                            camera.test_box_in_frustum(
                                world_bounds.center(),
                                world_bounds.half_size(),
                            )
                        }
                        None => true,
                    };
                    if visible {
                        self.items.push(RenderItem {
                            model: Mat4::from(world),
                            mesh: mesh.clone(),
                            material: material.clone(),
                        });
                    }

                    // Shadow casting follows the original contract: opaque
                    // leaves only, never culled against the view frustum.
                    if node.is_leaf() && material.alpha_mode == AlphaMode::Opaque {
                        self.shadow_casters.push(RenderItem {
                            model: Mat4::from(world),
                            mesh: mesh.clone(),
                            material: material.clone(),
                        });
                    }
                }

                // Children are visited regardless of this node's cull result;
                // their bounds are independent.
                for child in &node.children {
                    work.push((child, world));
                }
            }
        }
    }
}
