//! Scene Extraction Tests
//!
//! Tests for:
//! - Frustum culling of prefab nodes (outside culled, straddling kept)
//! - Invisible nodes pruning their subtree
//! - Children surviving a culled parent
//! - Shadow-caster collection (opaque leaves only, never camera-culled)

use std::sync::Arc;

use glam::{Affine3A, Vec3};

use candela::renderer::extract::ExtractedScene;
use candela::{AlphaMode, Camera, Entity, Material, Mesh, Node, Prefab, Scene};

fn opaque_material() -> Arc<Material> {
    Arc::new(Material::default())
}

fn blend_material() -> Arc<Material> {
    let mut material = Material::default();
    material.alpha_mode = AlphaMode::Blend;
    Arc::new(material)
}

fn unit_cube() -> Arc<Mesh> {
    Arc::new(Mesh::cube(1.0))
}

fn camera() -> Camera {
    let mut cam = Camera::perspective(60.0, 1.0, 0.1, 1000.0);
    cam.look_at(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y);
    cam
}

fn scene_with_node(node: Node) -> Scene {
    let mut scene = Scene::new();
    scene.add_entity(Entity::prefab(
        Arc::new(Prefab::new(node)),
        Affine3A::IDENTITY,
    ));
    scene
}

#[test]
fn node_in_front_is_drawn() {
    let mut node = Node::with_mesh(unit_cube(), opaque_material());
    node.transform = Affine3A::from_translation(Vec3::new(0.0, 0.0, -20.0));

    let mut extracted = ExtractedScene::default();
    extracted.extract(&scene_with_node(node), &camera());
    assert_eq!(extracted.items.len(), 1);
}

#[test]
fn node_outside_frustum_issues_no_draw() {
    let mut node = Node::with_mesh(unit_cube(), opaque_material());
    node.transform = Affine3A::from_translation(Vec3::new(0.0, 0.0, 500.0));

    let mut extracted = ExtractedScene::default();
    extracted.extract(&scene_with_node(node), &camera());
    assert!(extracted.items.is_empty());
}

#[test]
fn node_straddling_the_boundary_is_drawn() {
    // A large cube whose center is outside but whose bounds cross the
    // frustum edge; the conservative test must keep it.
    let mut node = Node::with_mesh(Arc::new(Mesh::cube(30.0)), opaque_material());
    node.transform = Affine3A::from_translation(Vec3::new(-45.0, 0.0, -30.0));

    let mut extracted = ExtractedScene::default();
    extracted.extract(&scene_with_node(node), &camera());
    assert_eq!(extracted.items.len(), 1);
}

#[test]
fn invisible_node_prunes_its_subtree() {
    let mut child = Node::with_mesh(unit_cube(), opaque_material());
    child.transform = Affine3A::from_translation(Vec3::new(0.0, 0.0, -10.0));

    let mut parent = Node::new();
    parent.visible = false;
    parent.add_child(child);

    let mut extracted = ExtractedScene::default();
    extracted.extract(&scene_with_node(parent), &camera());
    assert!(extracted.items.is_empty());
    assert!(extracted.shadow_casters.is_empty());
}

#[test]
fn children_survive_a_culled_parent() {
    // Parent geometry sits behind the camera; its child is translated back
    // in front. Culling the parent must not cull the child.
    let mut child = Node::with_mesh(unit_cube(), opaque_material());
    child.transform = Affine3A::from_translation(Vec3::new(0.0, 0.0, -60.0));

    let mut parent = Node::with_mesh(unit_cube(), opaque_material());
    parent.transform = Affine3A::from_translation(Vec3::new(0.0, 0.0, 30.0));
    parent.add_child(child);

    let mut extracted = ExtractedScene::default();
    extracted.extract(&scene_with_node(parent), &camera());
    // Child at 30 - 60 = -30: visible. Parent at +30: culled.
    assert_eq!(extracted.items.len(), 1);
}

#[test]
fn transforms_compose_parent_to_child() {
    let mut child = Node::with_mesh(unit_cube(), opaque_material());
    child.transform = Affine3A::from_translation(Vec3::new(0.0, 0.0, -5.0));

    let mut parent = Node::new();
    parent.transform = Affine3A::from_translation(Vec3::new(3.0, 0.0, -10.0));
    parent.add_child(child);

    let mut extracted = ExtractedScene::default();
    extracted.extract(&scene_with_node(parent), &camera());

    assert_eq!(extracted.items.len(), 1);
    let world = extracted.items[0].model.w_axis;
    assert!((world.x - 3.0).abs() < 1e-5);
    assert!((world.z - -15.0).abs() < 1e-5);
}

#[test]
fn shadow_casters_are_opaque_leaves_only() {
    let opaque_leaf = Node::with_mesh(unit_cube(), opaque_material());
    let blend_leaf = Node::with_mesh(unit_cube(), blend_material());

    // An interior node with a mesh: renders, but does not cast.
    let mut interior = Node::with_mesh(unit_cube(), opaque_material());
    interior.transform = Affine3A::from_translation(Vec3::new(0.0, 0.0, -10.0));
    interior.add_child(opaque_leaf);
    interior.add_child(blend_leaf);

    let mut extracted = ExtractedScene::default();
    extracted.extract(&scene_with_node(interior), &camera());

    assert_eq!(extracted.items.len(), 3);
    assert_eq!(
        extracted.shadow_casters.len(),
        1,
        "only the opaque leaf casts shadows"
    );
}

#[test]
fn shadow_casters_ignore_camera_culling() {
    // Behind the camera: culled from the draw list, still a shadow caster.
    let mut node = Node::with_mesh(unit_cube(), opaque_material());
    node.transform = Affine3A::from_translation(Vec3::new(0.0, 0.0, 100.0));

    let mut extracted = ExtractedScene::default();
    extracted.extract(&scene_with_node(node), &camera());
    assert!(extracted.items.is_empty());
    assert_eq!(extracted.shadow_casters.len(), 1);
}

#[test]
fn base_entities_contribute_nothing() {
    let mut scene = Scene::new();
    scene.add_entity(Entity::base(Affine3A::IDENTITY));

    let mut extracted = ExtractedScene::default();
    extracted.extract(&scene, &camera());
    assert!(extracted.items.is_empty());
    assert!(extracted.shadow_casters.is_empty());
}

#[test]
fn invisible_entity_is_skipped() {
    let node = Node::with_mesh(unit_cube(), opaque_material());
    let mut scene = Scene::new();
    let mut entity = Entity::prefab(
        Arc::new(Prefab::new(node)),
        Affine3A::from_translation(Vec3::new(0.0, 0.0, -10.0)),
    );
    entity.visible = false;
    scene.add_entity(entity);

    let mut extracted = ExtractedScene::default();
    extracted.extract(&scene, &camera());
    assert!(extracted.items.is_empty());
}

#[test]
fn unculled_extraction_collects_everything() {
    let mut behind = Node::with_mesh(unit_cube(), opaque_material());
    behind.transform = Affine3A::from_translation(Vec3::new(0.0, 0.0, 100.0));

    let mut extracted = ExtractedScene::default();
    extracted.extract_unculled(&scene_with_node(behind));
    assert_eq!(extracted.items.len(), 1);
}
