//! SSAO Kernel Generation Tests
//!
//! Tests for the randomized sphere-sample generator feeding the ambient
//! occlusion pass.

use candela::renderer::passes::ssao::generate_sphere_points;

#[test]
fn generates_the_requested_count() {
    assert_eq!(generate_sphere_points(64, 1.0, false).len(), 64);
    assert_eq!(generate_sphere_points(16, 2.0, true).len(), 16);
}

#[test]
fn points_stay_within_the_radius() {
    for &radius in &[0.5, 1.0, 4.0] {
        for p in generate_sphere_points(256, radius, false) {
            assert!(
                p.length() <= radius + 1e-4,
                "point {p:?} escapes radius {radius}"
            );
        }
    }
}

#[test]
fn points_avoid_the_center() {
    // The cube-root falloff keeps samples off the origin, where they would
    // contribute nothing but self-occlusion.
    for p in generate_sphere_points(256, 1.0, false) {
        assert!(p.length() > 0.05, "point {p:?} collapses to the center");
    }
}

#[test]
fn hemisphere_restriction_folds_z_upward() {
    for p in generate_sphere_points(512, 1.0, true) {
        assert!(p.z >= 0.0, "hemisphere point {p:?} has negative z");
    }
}

#[test]
fn full_sphere_covers_both_hemispheres() {
    let points = generate_sphere_points(512, 1.0, false);
    let below = points.iter().filter(|p| p.z < 0.0).count();
    let above = points.iter().filter(|p| p.z > 0.0).count();
    assert!(below > 100, "expected a substantial lower hemisphere share");
    assert!(above > 100, "expected a substantial upper hemisphere share");
}
