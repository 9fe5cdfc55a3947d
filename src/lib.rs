#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

pub mod errors;
pub mod renderer;
pub mod resources;
pub mod scene;

pub use errors::{CandelaError, Result};
pub use renderer::baking::irradiance::{IrradianceGrid, IrradianceProbe, IrradianceVolume};
pub use renderer::baking::reflection::ReflectionProbe;
pub use renderer::settings::{PipelineMode, PostEffects, RendererSettings, ToneMapping};
pub use renderer::{GpuContext, Renderer};
pub use resources::{AlphaMode, Material, Mesh, Texture};
pub use scene::{Camera, Entity, EntityKind, Frustum, Light, LightKind, Node, Prefab, Scene};
