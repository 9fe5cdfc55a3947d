use glam::Vec4;

use crate::scene::entity::{Entity, EntityId};
use crate::scene::light::{Light, LightKind};

/// The scene: ordered entity and light lists plus global lighting values.
///
/// Both lists are insertion-order stable with unique incrementing ids. The
/// renderer reads them and never reorders; list order determines light
/// accumulation order in the lighting resolve pass.
#[derive(Debug, Default)]
pub struct Scene {
    pub entities: Vec<Entity>,
    pub lights: Vec<Light>,
    /// Flat ambient term, injected exactly once per frame by the lighting
    /// resolve pass.
    pub ambient_light: f32,
    /// Clear color for the frame's primary color target.
    pub background: Vec4,

    next_entity_id: EntityId,
    next_light_id: u32,
}

impl Scene {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entities: Vec::new(),
            lights: Vec::new(),
            ambient_light: 0.2,
            background: Vec4::new(0.0, 0.0, 0.0, 1.0),
            next_entity_id: 0,
            next_light_id: 0,
        }
    }

    /// Appends an entity, assigning the next id. Returns the assigned id.
    pub fn add_entity(&mut self, mut entity: Entity) -> EntityId {
        entity.id = self.next_entity_id;
        self.next_entity_id += 1;
        let id = entity.id;
        self.entities.push(entity);
        id
    }

    /// Appends a light, assigning the next id. Returns the assigned id.
    pub fn add_light(&mut self, mut light: Light) -> u32 {
        light.id = self.next_light_id;
        self.next_light_id += 1;
        let id = light.id;
        self.lights.push(light);
        id
    }

    /// The light driving volumetric scattering: the first visible
    /// directional light in list order.
    ///
    /// The original convention assumed `lights[0]` was the sun; scanning in
    /// list order preserves that behavior for well-formed scenes while
    /// degrading to "no volumetrics" instead of garbage when the first light
    /// is not directional.
    #[must_use]
    pub fn primary_directional(&self) -> Option<&Light> {
        self.lights
            .iter()
            .find(|l| l.visible && matches!(l.kind, LightKind::Directional))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn ids_increase_with_insertion_order() {
        let mut scene = Scene::new();
        let a = scene.add_light(Light::new(LightKind::Omni, Vec3::ONE, 1.0, Vec3::ZERO));
        let b = scene.add_light(Light::new(LightKind::Directional, Vec3::ONE, 1.0, Vec3::ZERO));
        assert_eq!(a, 0);
        assert_eq!(b, 1);
        assert_eq!(scene.lights[0].id, 0);
        assert_eq!(scene.lights[1].id, 1);
    }

    #[test]
    fn primary_directional_skips_non_directional_heads() {
        let mut scene = Scene::new();
        scene.add_light(Light::new(LightKind::Omni, Vec3::ONE, 1.0, Vec3::ZERO));
        let sun = scene.add_light(Light::new(LightKind::Directional, Vec3::ONE, 1.0, Vec3::ZERO));
        assert_eq!(scene.primary_directional().map(|l| l.id), Some(sun));
    }

    #[test]
    fn primary_directional_ignores_hidden_lights() {
        let mut scene = Scene::new();
        let mut sun = Light::new(LightKind::Directional, Vec3::ONE, 1.0, Vec3::ZERO);
        sun.visible = false;
        scene.add_light(sun);
        assert!(scene.primary_directional().is_none());
    }
}
