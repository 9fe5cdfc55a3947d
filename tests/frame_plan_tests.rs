//! Frame Planning Tests
//!
//! Tests for:
//! - Pass ordering invariants (shadow first, geometry before resolve,
//!   post stages after lighting, bloom before tone mapping)
//! - Post-effect toggles adding/removing exactly their stage
//! - The volumetric stage's dependence on a shadow-casting directional
//!   light

use candela::renderer::plan::{FrameFacts, PassKind, plan_frame};
use candela::{PipelineMode, PostEffects};

fn position(plan: &[PassKind], pass: PassKind) -> usize {
    plan.iter()
        .position(|p| *p == pass)
        .unwrap_or_else(|| panic!("{pass:?} missing from {plan:?}"))
}

fn all_effects() -> PostEffects {
    PostEffects {
        ssao: true,
        ssao_hemisphere: true,
        decal: true,
        reflections: true,
        volumetric: true,
        bloom: true,
        tone_mapping: true,
        sh_interpolation: false,
    }
}

fn full_facts() -> FrameFacts {
    FrameFacts {
        has_shadow_lights: true,
        has_primary_directional_shadow: true,
    }
}

#[test]
fn deferred_plan_has_strict_stage_order() {
    let plan = plan_frame(PipelineMode::Deferred, &all_effects(), &full_facts());

    let shadow = position(&plan, PassKind::Shadow);
    let geometry = position(&plan, PassKind::Geometry);
    let ssao = position(&plan, PassKind::Ssao);
    let decal = position(&plan, PassKind::Decal);
    let resolve = position(&plan, PassKind::LightingResolve);
    let reflections = position(&plan, PassKind::Reflections);
    let volumetric = position(&plan, PassKind::Volumetric);
    let bloom = position(&plan, PassKind::Bloom);
    let tone_map = position(&plan, PassKind::ToneMap);

    assert!(shadow < geometry, "shadow pass precedes the geometry pass");
    assert!(geometry < resolve, "geometry pass precedes the resolve");
    assert!(ssao < resolve, "occlusion feeds the resolve");
    assert!(decal < resolve, "decal writes the G-buffer the resolve reads");
    assert!(resolve < reflections);
    assert!(resolve < volumetric);
    assert!(resolve < bloom);
    assert!(bloom < tone_map, "bloom composites before tone mapping");
    assert_eq!(tone_map, plan.len() - 1, "tone map always presents last");
}

#[test]
fn tone_map_runs_even_when_disabled() {
    let effects = PostEffects {
        tone_mapping: false,
        ..PostEffects::default()
    };
    let plan = plan_frame(PipelineMode::Deferred, &effects, &FrameFacts::default());
    // Disabled tone mapping still presents via the blit path.
    assert_eq!(*plan.last().unwrap(), PassKind::ToneMap);
}

#[test]
fn volumetric_requires_toggle_and_sun_shadow() {
    let mut effects = all_effects();

    // Toggle off: never planned, whatever the scene looks like.
    effects.volumetric = false;
    let plan = plan_frame(PipelineMode::Deferred, &effects, &full_facts());
    assert!(!plan.contains(&PassKind::Volumetric));

    // Toggle on but no shadow-casting directional light: still not planned.
    effects.volumetric = true;
    let facts = FrameFacts {
        has_shadow_lights: true,
        has_primary_directional_shadow: false,
    };
    let plan = plan_frame(PipelineMode::Deferred, &effects, &facts);
    assert!(!plan.contains(&PassKind::Volumetric));

    // Both conditions met: planned.
    let plan = plan_frame(PipelineMode::Deferred, &effects, &full_facts());
    assert!(plan.contains(&PassKind::Volumetric));
}

#[test]
fn shadow_pass_skipped_without_shadow_lights() {
    let facts = FrameFacts {
        has_shadow_lights: false,
        has_primary_directional_shadow: false,
    };
    let plan = plan_frame(PipelineMode::Deferred, &all_effects(), &facts);
    assert!(!plan.contains(&PassKind::Shadow));
}

#[test]
fn forward_mode_replaces_deferred_stages() {
    let plan = plan_frame(PipelineMode::Forward, &all_effects(), &full_facts());

    assert!(plan.contains(&PassKind::Forward));
    assert!(!plan.contains(&PassKind::Geometry));
    assert!(!plan.contains(&PassKind::LightingResolve));
    assert!(!plan.contains(&PassKind::Ssao), "SSAO needs the G-buffer");
    assert!(!plan.contains(&PassKind::Volumetric));

    // The skybox draws before forward shading so depth-tested geometry
    // covers it.
    assert!(position(&plan, PassKind::Skybox) < position(&plan, PassKind::Forward));

    // Bloom and tone mapping still apply.
    assert!(plan.contains(&PassKind::Bloom));
    assert_eq!(*plan.last().unwrap(), PassKind::ToneMap);
}

#[test]
fn toggles_remove_exactly_their_stage() {
    let base = plan_frame(PipelineMode::Deferred, &all_effects(), &full_facts());

    for (flip, removed) in [
        (
            PostEffects {
                ssao: false,
                ..all_effects()
            },
            PassKind::Ssao,
        ),
        (
            PostEffects {
                decal: false,
                ..all_effects()
            },
            PassKind::Decal,
        ),
        (
            PostEffects {
                reflections: false,
                ..all_effects()
            },
            PassKind::Reflections,
        ),
        (
            PostEffects {
                bloom: false,
                ..all_effects()
            },
            PassKind::Bloom,
        ),
    ] {
        let plan = plan_frame(PipelineMode::Deferred, &flip, &full_facts());
        assert!(!plan.contains(&removed));
        let expected: Vec<PassKind> =
            base.iter().copied().filter(|p| *p != removed).collect();
        assert_eq!(plan, expected, "only {removed:?} should disappear");
    }
}
