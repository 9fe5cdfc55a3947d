use glam::{Affine3A, Vec3};

/// Shadow projection parameters for a shadow-casting light.
#[derive(Debug, Clone)]
pub struct ShadowSettings {
    /// Depth offset applied in the lighting shaders to avoid self-shadowing.
    pub bias: f32,
    /// Near plane of the light's shadow projection.
    pub near: f32,
    /// Far plane of the light's shadow projection (directional only; spot
    /// lights use `max_distance`).
    pub far: f32,
    /// Half extent of the orthographic frustum for directional lights.
    pub ortho_half_extent: f32,
    /// Shadow map resolution (square).
    pub map_size: u32,
}

impl Default for ShadowSettings {
    fn default() -> Self {
        Self {
            bias: 0.02,
            near: 5.0,
            far: 1000.0,
            ortho_half_extent: 1000.0,
            map_size: 1024,
        }
    }
}

/// Per-kind light parameters.
///
/// Each pass dispatches on this variant instead of comparing integer type
/// tags, so adding a light kind extends the enum rather than every pass.
#[derive(Debug, Clone)]
pub enum LightKind {
    /// Point light radiating in all directions. Never casts shadows.
    Omni,
    /// Cone light. `cos_cutoff` is the cosine of the half angle; `exponent`
    /// shapes the falloff towards the cone edge.
    Spot { cos_cutoff: f32, exponent: f32 },
    /// Infinitely distant light defined by its direction alone.
    Directional,
}

impl LightKind {
    /// Whether this light kind renders a shadow map.
    ///
    /// Omni lights are excluded from shadowing; no shadow target is ever
    /// created for them.
    #[must_use]
    pub fn casts_shadows(&self) -> bool {
        matches!(self, Self::Spot { .. } | Self::Directional)
    }
}

/// A scene light.
///
/// Position and orientation come from `transform`; the light's forward
/// vector is the rotated `-Z` axis. Lights keep insertion order in
/// [`crate::scene::Scene::lights`], and that order fixes the accumulation
/// order of the lighting resolve pass.
#[derive(Debug, Clone)]
pub struct Light {
    pub id: u32,
    pub visible: bool,
    pub transform: Affine3A,
    pub color: Vec3,
    pub intensity: f32,
    /// Attenuation range for omni and spot lights.
    pub max_distance: f32,
    pub kind: LightKind,
    pub shadow: ShadowSettings,
}

impl Light {
    /// Creates a light at `position`. The id is assigned by
    /// [`crate::scene::Scene::add_light`].
    #[must_use]
    pub fn new(kind: LightKind, color: Vec3, intensity: f32, position: Vec3) -> Self {
        Self {
            id: 0,
            visible: true,
            transform: Affine3A::from_translation(position),
            color,
            intensity,
            max_distance: 1000.0,
            kind,
            shadow: ShadowSettings::default(),
        }
    }

    /// World-space position.
    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.transform.translation.into()
    }

    /// World-space forward vector (the rotated `-Z` axis), normalized.
    #[must_use]
    pub fn direction(&self) -> Vec3 {
        let dir = self.transform.transform_vector3(Vec3::NEG_Z);
        if dir.length_squared() > 1e-12 {
            dir.normalize()
        } else {
            Vec3::NEG_Z
        }
    }

    /// Orients the light to look from its current position towards `center`.
    pub fn set_direction(&mut self, center: Vec3, up: Vec3) {
        let pos = self.position();
        self.transform = Affine3A::look_at_rh(pos, center, up).inverse();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn omni_lights_never_cast_shadows() {
        assert!(!LightKind::Omni.casts_shadows());
        assert!(LightKind::Directional.casts_shadows());
        assert!(
            LightKind::Spot {
                cos_cutoff: 0.8,
                exponent: 3.0
            }
            .casts_shadows()
        );
    }

    #[test]
    fn set_direction_points_at_target() {
        let mut light = Light::new(
            LightKind::Directional,
            Vec3::ONE,
            1.0,
            Vec3::new(0.0, 10.0, 0.0),
        );
        light.set_direction(Vec3::ZERO, Vec3::Z);
        let dir = light.direction();
        assert!((dir - Vec3::NEG_Y).length() < 1e-4, "direction was {dir}");
    }
}
