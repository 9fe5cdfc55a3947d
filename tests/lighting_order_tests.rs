//! Lighting Resolve Ordering Tests
//!
//! Tests for:
//! - Spot/directional-before-omni processing order, list order within
//!   each group
//! - The ambient term being injected exactly once per frame
//! - Per-light uniform construction (kind tags, attenuation range, shadow
//!   flags)

use glam::{Mat4, Vec3};

use candela::renderer::passes::lighting::{build_light_uniforms, resolve_light_order};
use candela::{Light, LightKind, Scene};

fn spot() -> Light {
    Light::new(
        LightKind::Spot {
            cos_cutoff: 0.9,
            exponent: 3.0,
        },
        Vec3::ONE,
        1.0,
        Vec3::new(0.0, 10.0, 0.0),
    )
}

fn omni() -> Light {
    Light::new(LightKind::Omni, Vec3::ONE, 1.0, Vec3::ZERO)
}

fn directional() -> Light {
    Light::new(LightKind::Directional, Vec3::ONE, 1.0, Vec3::new(0.0, 100.0, 0.0))
}

#[test]
fn spot_and_directional_precede_omni() {
    let mut scene = Scene::new();
    scene.add_light(omni());
    scene.add_light(spot());
    scene.add_light(omni());
    scene.add_light(directional());

    let order = resolve_light_order(&scene.lights);
    assert_eq!(order, vec![1, 3, 0, 2]);
}

#[test]
fn invisible_lights_are_excluded() {
    let mut scene = Scene::new();
    scene.add_light(spot());
    let mut hidden = directional();
    hidden.visible = false;
    scene.add_light(hidden);

    let order = resolve_light_order(&scene.lights);
    assert_eq!(order, vec![0]);
}

/// Walks the order the resolve pass uses and mirrors its ambient hand-off,
/// counting how many lights end up carrying a non-zero ambient term.
fn ambient_injections(lights: &[Light], ambient_light: f32) -> usize {
    let order = resolve_light_order(lights);
    let mut ambient = ambient_light;
    let mut injected = 0;
    for index in order {
        let light = &lights[index];
        let light_ambient = if matches!(light.kind, LightKind::Omni) {
            0.0
        } else {
            std::mem::take(&mut ambient)
        };
        let uniforms = build_light_uniforms(light, light_ambient, injected == 0, None);
        if uniforms.ambient > 0.0 {
            injected += 1;
        }
    }
    injected
}

#[test]
fn ambient_is_injected_exactly_once() {
    let mut scene = Scene::new();
    scene.add_light(directional());
    scene.add_light(spot());
    scene.add_light(omni());
    assert_eq!(ambient_injections(&scene.lights, 0.3), 1);
}

#[test]
fn ambient_is_injected_once_with_zero_omni_lights() {
    let mut scene = Scene::new();
    scene.add_light(spot());
    scene.add_light(directional());
    scene.add_light(spot());
    assert_eq!(ambient_injections(&scene.lights, 0.25), 1);
}

#[test]
fn omni_group_never_receives_ambient() {
    let mut scene = Scene::new();
    scene.add_light(omni());
    scene.add_light(omni());
    assert_eq!(ambient_injections(&scene.lights, 0.5), 0);
}

#[test]
fn uniform_kind_tags_match_shader_switch() {
    assert_eq!(build_light_uniforms(&directional(), 0.0, false, None).kind, 0);
    assert_eq!(build_light_uniforms(&omni(), 0.0, false, None).kind, 1);
    assert_eq!(build_light_uniforms(&spot(), 0.0, false, None).kind, 2);
}

#[test]
fn spot_uniforms_carry_cone_parameters() {
    let uniforms = build_light_uniforms(&spot(), 0.0, false, None);
    assert!((uniforms.direction_cos_cutoff.w - 0.9).abs() < 1e-6);
    assert!((uniforms.spot_exponent - 3.0).abs() < 1e-6);
}

#[test]
fn shadow_flags_follow_shadow_matrix() {
    let light = directional();
    let without = build_light_uniforms(&light, 0.0, false, None);
    assert_eq!(without.has_shadow_map, 0);

    let with = build_light_uniforms(&light, 0.0, false, Some(Mat4::IDENTITY));
    assert_eq!(with.has_shadow_map, 1);
}

#[test]
fn max_distance_feeds_attenuation_range() {
    let mut light = omni();
    light.max_distance = 42.0;
    let uniforms = build_light_uniforms(&light, 0.0, false, None);
    assert!((uniforms.position_range.w - 42.0).abs() < 1e-6);
}
