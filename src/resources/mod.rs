//! CPU-side resource descriptions.
//!
//! Meshes, materials and textures are plain data shared by `Arc` across
//! scene nodes. GPU upload happens lazily inside the renderer's resource
//! manager the first time a resource is drawn, so these types stay usable
//! without a device (scene construction, traversal and culling tests).

pub mod material;
pub mod mesh;
pub mod texture;

pub use material::{AlphaMode, Material};
pub use mesh::{BoundingBox, Mesh, Vertex};
pub use texture::Texture;
