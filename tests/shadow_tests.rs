//! Shadow Projection Tests
//!
//! Tests for:
//! - Directional orthographic shadow matrix construction
//! - Spot perspective shadow matrix (cone angle + margin)
//! - Per-kind shadow eligibility

use glam::{Vec3, Vec4};

use candela::renderer::passes::shadow::{
    DIRECTIONAL_EYE_DISTANCE, directional_shadow_matrix, shadow_matrix, spot_shadow_matrix,
};
use candela::{Light, LightKind};

const EPSILON: f32 = 1e-4;

fn sun() -> Light {
    let mut light = Light::new(
        LightKind::Directional,
        Vec3::ONE,
        1.0,
        Vec3::new(0.0, 300.0, 0.0),
    );
    light.set_direction(Vec3::ZERO, Vec3::Z);
    light
}

fn spot_light(cos_cutoff: f32) -> Light {
    let mut light = Light::new(
        LightKind::Spot {
            cos_cutoff,
            exponent: 3.0,
        },
        Vec3::ONE,
        1.0,
        Vec3::new(0.0, 50.0, 0.0),
    );
    light.set_direction(Vec3::ZERO, Vec3::Z);
    light.max_distance = 200.0;
    light
}

#[test]
fn directional_matrix_is_invertible() {
    let vp = directional_shadow_matrix(&sun());
    assert!(vp.determinant().abs() > 1e-10);
    for i in 0..4 {
        for j in 0..4 {
            assert!(vp.col(i)[j].is_finite());
        }
    }
}

#[test]
fn directional_eye_sits_back_along_the_light() {
    let light = sun();
    let vp = directional_shadow_matrix(&light);
    // The point the camera was aimed at (origin offset by the eye
    // distance along the direction) projects to the NDC center.
    let eye = -light.direction() * DIRECTIONAL_EYE_DISTANCE;
    let clip = vp * Vec4::from((eye + light.direction(), 1.0));
    let ndc = clip / clip.w;
    assert!(ndc.x.abs() < EPSILON && ndc.y.abs() < EPSILON);
}

#[test]
fn directional_extent_honors_configuration() {
    let mut narrow = sun();
    narrow.shadow.ortho_half_extent = 10.0;
    let mut wide = sun();
    wide.shadow.ortho_half_extent = 1000.0;

    // A point 500 units sideways fits the wide frustum but not the narrow
    // one. The light's screen axes depend on its basis, so test the larger
    // of the two NDC extents.
    let probe = Vec4::new(500.0, 0.0, 0.0, 1.0);
    let narrow_clip = directional_shadow_matrix(&narrow) * probe;
    let wide_clip = directional_shadow_matrix(&wide) * probe;
    let narrow_extent = (narrow_clip.x / narrow_clip.w)
        .abs()
        .max((narrow_clip.y / narrow_clip.w).abs());
    let wide_extent = (wide_clip.x / wide_clip.w)
        .abs()
        .max((wide_clip.y / wide_clip.w).abs());
    assert!(narrow_extent > 1.0);
    assert!(wide_extent <= 1.0);
}

#[test]
fn spot_matrix_is_invertible() {
    let light = spot_light(0.9);
    let vp = spot_shadow_matrix(&light, 0.9);
    assert!(vp.determinant().abs() > 1e-10);
}

#[test]
fn spot_fov_widens_with_the_cone() {
    let wide_cone = spot_light(0.5);
    let tight_cone = spot_light(0.99);

    // A point well off-axis in front of the light; compare the larger NDC
    // extent since the light basis picks the screen axes.
    let probe = Vec4::new(30.0, 0.0, 0.0, 1.0);
    let wide = spot_shadow_matrix(&wide_cone, 0.5) * probe;
    let tight = spot_shadow_matrix(&tight_cone, 0.99) * probe;

    let wide_extent = (wide.x / wide.w).abs().max((wide.y / wide.w).abs());
    let tight_extent = (tight.x / tight.w).abs().max((tight.y / tight.w).abs());
    assert!(
        wide_extent < tight_extent,
        "the wider cone projects the same point closer to center ({wide_extent} vs {tight_extent})"
    );
}

#[test]
fn spot_point_under_light_projects_to_center() {
    let light = spot_light(0.9);
    let vp = spot_shadow_matrix(&light, 0.9);
    let clip = vp * Vec4::new(0.0, 0.0, 0.0, 1.0);
    let ndc = clip / clip.w;
    assert!(ndc.x.abs() < EPSILON && ndc.y.abs() < EPSILON);
    assert!(ndc.z > 0.0 && ndc.z < 1.0, "origin inside depth range");
}

#[test]
fn only_spot_and_directional_get_shadow_matrices() {
    assert!(shadow_matrix(&sun()).is_some());
    assert!(shadow_matrix(&spot_light(0.8)).is_some());

    let omni = Light::new(LightKind::Omni, Vec3::ONE, 1.0, Vec3::ZERO);
    assert!(shadow_matrix(&omni).is_none());
}

#[test]
fn vertical_light_direction_keeps_a_valid_basis() {
    // Straight-down light: the fallback up vector must avoid collinearity.
    let mut light = Light::new(
        LightKind::Directional,
        Vec3::ONE,
        1.0,
        Vec3::new(0.0, 100.0, 0.0),
    );
    light.set_direction(Vec3::ZERO, Vec3::Z);

    let vp = directional_shadow_matrix(&light);
    assert!(vp.determinant().abs() > 1e-10);
}
