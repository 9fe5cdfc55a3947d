//! Frame planning.
//!
//! [`plan_frame`] decides, from the pipeline mode, the post-effect toggles
//! and a handful of scene facts, exactly which passes run this frame and in
//! what order. `Renderer::render` executes the plan verbatim, so the
//! ordering guarantees of the pipeline live here as data rather than as
//! control flow scattered across the frame.

use crate::renderer::settings::{PipelineMode, PostEffects};

/// One schedulable pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    /// Per-light depth rendering (spot + directional lights only).
    Shadow,
    /// Deferred G-buffer fill.
    Geometry,
    /// Projected decal overlay onto the G-buffer.
    Decal,
    /// Screen-space ambient occlusion estimate.
    Ssao,
    /// Background cubemap into the lit buffer.
    Skybox,
    /// Deferred per-light lighting resolve.
    LightingResolve,
    /// Forward shading (forward mode's replacement for Geometry + Resolve).
    Forward,
    /// Reflection probe / skybox specular compositing.
    Reflections,
    /// Volumetric scattering along the primary directional light.
    Volumetric,
    /// Separable-blur bloom over the bright buffer.
    Bloom,
    /// Tone mapping (or plain blit when disabled) into the output view.
    ToneMap,
}

/// Scene-derived facts the planner needs.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameFacts {
    /// At least one visible spot or directional light exists.
    pub has_shadow_lights: bool,
    /// A visible directional light exists and casts shadows, so its shadow
    /// map will be available for the volumetric ray march.
    pub has_primary_directional_shadow: bool,
}

/// Computes the ordered pass list for one frame.
///
/// Invariants (verified by `tests/frame_plan_tests.rs`):
/// - `Shadow` precedes any shading pass.
/// - Deferred: `Geometry` precedes `LightingResolve`; `Ssao` and `Decal`
///   precede `LightingResolve` (both feed it).
/// - Every post stage (`Reflections`, `Volumetric`, `Bloom`) follows
///   `LightingResolve`/`Forward`; `Bloom` precedes `ToneMap`.
/// - `ToneMap` is always last: with tone mapping disabled it degrades to a
///   plain blit but still presents the frame.
/// - `Volumetric` requires the toggle *and* a shadow-casting primary
///   directional light.
#[must_use]
pub fn plan_frame(mode: PipelineMode, effects: &PostEffects, facts: &FrameFacts) -> Vec<PassKind> {
    let mut plan = Vec::with_capacity(11);

    if facts.has_shadow_lights {
        plan.push(PassKind::Shadow);
    }

    match mode {
        PipelineMode::Deferred => {
            plan.push(PassKind::Geometry);
            if effects.ssao {
                plan.push(PassKind::Ssao);
            }
            if effects.decal {
                plan.push(PassKind::Decal);
            }
            plan.push(PassKind::Skybox);
            plan.push(PassKind::LightingResolve);
            if effects.reflections {
                plan.push(PassKind::Reflections);
            }
            if effects.volumetric && facts.has_primary_directional_shadow {
                plan.push(PassKind::Volumetric);
            }
        }
        PipelineMode::Forward => {
            plan.push(PassKind::Skybox);
            plan.push(PassKind::Forward);
        }
    }

    if effects.bloom {
        plan.push(PassKind::Bloom);
    }
    plan.push(PassKind::ToneMap);

    plan
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_on() -> PostEffects {
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

    #[test]
    fn deferred_plan_orders_geometry_before_resolve() {
        let facts = FrameFacts {
            has_shadow_lights: true,
            has_primary_directional_shadow: true,
        };
        let plan = plan_frame(PipelineMode::Deferred, &all_on(), &facts);
        let geom = plan.iter().position(|p| *p == PassKind::Geometry).unwrap();
        let resolve = plan
            .iter()
            .position(|p| *p == PassKind::LightingResolve)
            .unwrap();
        assert!(geom < resolve);
    }

    #[test]
    fn volumetric_needs_directional_shadow() {
        let effects = all_on();
        let without = FrameFacts {
            has_shadow_lights: true,
            has_primary_directional_shadow: false,
        };
        assert!(
            !plan_frame(PipelineMode::Deferred, &effects, &without)
                .contains(&PassKind::Volumetric)
        );
    }
}
