//! Camera and Frustum Tests
//!
//! Tests for:
//! - Perspective/orthographic projection construction
//! - View matrix orientation
//! - Frustum plane extraction (Gribb-Hartmann, [0,1] clip range)
//! - Conservative box and sphere intersection

use glam::{Mat4, Vec3, Vec4};

use candela::{Camera, Frustum};

const EPSILON: f32 = 1e-4;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn looking_down_neg_z() -> Camera {
    let mut cam = Camera::perspective(60.0, 1.0, 0.1, 1000.0);
    cam.look_at(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y);
    cam
}

// ============================================================================
// Projection Tests
// ============================================================================

#[test]
fn perspective_near_maps_to_zero_depth() {
    let cam = looking_down_neg_z();
    let clip = cam.view_projection() * Vec4::new(0.0, 0.0, -0.1, 1.0);
    let ndc_z = clip.z / clip.w;
    assert!(
        approx(ndc_z, 0.0),
        "near plane should map to NDC z=0, got {ndc_z}"
    );
}

#[test]
fn perspective_far_maps_to_one_depth() {
    let cam = looking_down_neg_z();
    let clip = cam.view_projection() * Vec4::new(0.0, 0.0, -1000.0, 1.0);
    let ndc_z = clip.z / clip.w;
    assert!(
        approx(ndc_z, 1.0),
        "far plane should map to NDC z=1, got {ndc_z}"
    );
}

#[test]
fn orthographic_preserves_parallel_lines() {
    let mut cam = Camera::orthographic(10.0, 0.1, 100.0);
    cam.look_at(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y);

    let a = cam.view_projection() * Vec4::new(5.0, 0.0, -10.0, 1.0);
    let b = cam.view_projection() * Vec4::new(5.0, 0.0, -90.0, 1.0);
    // Same X in NDC regardless of depth.
    assert!(approx(a.x / a.w, b.x / b.w));
}

#[test]
fn view_matrix_moves_world_opposite_to_eye() {
    let mut cam = Camera::perspective(60.0, 1.0, 0.1, 500.0);
    cam.look_at(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO, Vec3::Y);

    let origin_in_view = cam.view_matrix() * Vec4::new(0.0, 0.0, 0.0, 1.0);
    assert!(approx(origin_in_view.z, -10.0));
}

// ============================================================================
// Frustum Intersection Tests
// ============================================================================

#[test]
fn box_in_front_is_visible() {
    let cam = looking_down_neg_z();
    assert!(cam.test_box_in_frustum(Vec3::new(0.0, 0.0, -50.0), Vec3::splat(1.0)));
}

#[test]
fn box_far_to_the_side_is_culled() {
    let cam = looking_down_neg_z();
    assert!(!cam.test_box_in_frustum(Vec3::new(-1000.0, 0.0, -50.0), Vec3::splat(1.0)));
}

#[test]
fn box_behind_camera_is_culled() {
    let cam = looking_down_neg_z();
    assert!(!cam.test_box_in_frustum(Vec3::new(0.0, 0.0, 50.0), Vec3::splat(1.0)));
}

#[test]
fn box_straddling_boundary_is_kept() {
    let cam = looking_down_neg_z();
    // Center outside the left plane, but halfsize reaches back inside: the
    // conservative test must keep it.
    let center = Vec3::new(-40.0, 0.0, -50.0);
    let halfsize = Vec3::new(30.0, 1.0, 1.0);
    assert!(cam.test_box_in_frustum(center, halfsize));
    // The same center with a small box is culled.
    assert!(!cam.test_box_in_frustum(center, Vec3::splat(0.5)));
}

#[test]
fn huge_box_enclosing_camera_is_kept() {
    let cam = looking_down_neg_z();
    assert!(cam.test_box_in_frustum(Vec3::ZERO, Vec3::splat(10_000.0)));
}

#[test]
fn sphere_tests_match_box_behaviour() {
    let cam = looking_down_neg_z();
    let frustum = cam.frustum();
    assert!(frustum.intersects_sphere(Vec3::new(0.0, 0.0, -5.0), 1.0));
    assert!(!frustum.intersects_sphere(Vec3::new(0.0, 0.0, 10.0), 1.0));
    assert!(frustum.intersects_sphere(Vec3::new(0.0, 0.0, -5.0), 100.0));
}

#[test]
fn frustum_from_raw_matrix() {
    let proj = Mat4::perspective_rh(60.0_f32.to_radians(), 1.0, 0.1, 100.0);
    let view = Mat4::look_at_rh(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y);
    let frustum = Frustum::from_matrix(proj * view);

    assert!(frustum.intersects_box(Vec3::new(0.0, 0.0, -50.0), Vec3::ONE));
    // Beyond the far plane.
    assert!(!frustum.intersects_box(Vec3::new(0.0, 0.0, -200.0), Vec3::ONE));
}
