use std::sync::atomic::{AtomicU64, Ordering};

use glam::{Affine3A, Vec3};

static NEXT_MESH_ID: AtomicU64 = AtomicU64::new(1);

/// Interleaved vertex layout shared by every draw pass.
///
/// Attribute locations (the vertex half of the shading wire contract):
/// 0 = position, 1 = normal, 2 = uv, 3 = tangent (xyz + handedness in w).
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub tangent: [f32; 4],
}

impl Vertex {
    /// Vertex buffer layout matching the locations above.
    #[must_use]
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
            0 => Float32x3,
            1 => Float32x3,
            2 => Float32x2,
            3 => Float32x4,
        ];
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRIBUTES,
        }
    }
}

/// Axis-aligned bounding box in the mesh's local space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    #[must_use]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    #[must_use]
    pub fn half_size(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Transforms the box into world space, returning the enclosing AABB.
    ///
    /// Uses the absolute-matrix trick: the world half extent along each axis
    /// is `|M| * halfsize`, which is exact for the enclosing box of a
    /// transformed AABB.
    #[must_use]
    pub fn transform(&self, matrix: &Affine3A) -> Self {
        let center = matrix.transform_point3(self.center());
        let half = self.half_size();
        let m = matrix.matrix3;
        let abs_half = Vec3::new(
            m.x_axis.x.abs() * half.x + m.y_axis.x.abs() * half.y + m.z_axis.x.abs() * half.z,
            m.x_axis.y.abs() * half.x + m.y_axis.y.abs() * half.y + m.z_axis.y.abs() * half.z,
            m.x_axis.z.abs() * half.x + m.y_axis.z.abs() * half.y + m.z_axis.z.abs() * half.z,
        );
        Self {
            min: center - abs_half,
            max: center + abs_half,
        }
    }

    fn from_positions(positions: impl Iterator<Item = Vec3>) -> Self {
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);
        for p in positions {
            min = min.min(p);
            max = max.max(p);
        }
        Self { min, max }
    }
}

/// CPU-side triangle mesh with a precomputed local bounding box.
///
/// The renderer uploads vertex/index buffers on first draw, keyed by `id`.
#[derive(Debug)]
pub struct Mesh {
    pub(crate) id: u64,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub bounds: BoundingBox,
}

impl Mesh {
    #[must_use]
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        let bounds = BoundingBox::from_positions(vertices.iter().map(|v| Vec3::from(v.position)));
        Self {
            id: NEXT_MESH_ID.fetch_add(1, Ordering::Relaxed),
            vertices,
            indices,
            bounds,
        }
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    /// Axis-aligned unit-ish cube centered at the origin with the given half
    /// extent. Used by the decal projector and tests.
    #[must_use]
    pub fn cube(half_extent: f32) -> Self {
        let h = half_extent;
        // One quad per face, normals outward, tangent along +U.
        let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
            ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
            ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
            ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
            ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
        ];

        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);
        for (normal, right, up) in faces {
            let n = Vec3::from(normal);
            let r = Vec3::from(right);
            let u = Vec3::from(up);
            let base = vertices.len() as u32;
            for (sx, sy, uv) in [
                (-1.0, -1.0, [0.0, 1.0]),
                (1.0, -1.0, [1.0, 1.0]),
                (1.0, 1.0, [1.0, 0.0]),
                (-1.0, 1.0, [0.0, 0.0]),
            ] {
                let pos = (n + r * sx + u * sy) * h;
                vertices.push(Vertex {
                    position: pos.to_array(),
                    normal: n.to_array(),
                    uv,
                    tangent: [r.x, r.y, r.z, 1.0],
                });
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        Self::new(vertices, indices)
    }

    /// UV sphere centered at the origin. Used as the omni light volume and
    /// for probe visualization.
    #[must_use]
    pub fn uv_sphere(radius: f32, segments: u32, rings: u32) -> Self {
        let segments = segments.max(3);
        let rings = rings.max(2);

        let mut vertices = Vec::with_capacity(((rings + 1) * (segments + 1)) as usize);
        for ring in 0..=rings {
            let v = ring as f32 / rings as f32;
            let phi = v * std::f32::consts::PI;
            for seg in 0..=segments {
                let u = seg as f32 / segments as f32;
                let theta = u * std::f32::consts::TAU;
                let dir = Vec3::new(
                    phi.sin() * theta.cos(),
                    phi.cos(),
                    phi.sin() * theta.sin(),
                );
                let tangent = Vec3::new(-theta.sin(), 0.0, theta.cos());
                vertices.push(Vertex {
                    position: (dir * radius).to_array(),
                    normal: dir.to_array(),
                    uv: [u, v],
                    tangent: [tangent.x, tangent.y, tangent.z, 1.0],
                });
            }
        }

        // Counter-clockwise seen from outside, so outward faces are front.
        let mut indices = Vec::with_capacity((rings * segments * 6) as usize);
        for ring in 0..rings {
            for seg in 0..segments {
                let a = ring * (segments + 1) + seg;
                let b = a + segments + 1;
                indices.extend_from_slice(&[a, a + 1, b, a + 1, b + 1, b]);
            }
        }
        Self::new(vertices, indices)
    }

    /// Flat XZ plane centered at the origin, normal `+Y`. The original
    /// scene's floor helper.
    #[must_use]
    pub fn plane(half_extent: f32) -> Self {
        let h = half_extent;
        let vertices = vec![
            Vertex {
                position: [-h, 0.0, -h],
                normal: [0.0, 1.0, 0.0],
                uv: [0.0, 0.0],
                tangent: [1.0, 0.0, 0.0, 1.0],
            },
            Vertex {
                position: [h, 0.0, -h],
                normal: [0.0, 1.0, 0.0],
                uv: [1.0, 0.0],
                tangent: [1.0, 0.0, 0.0, 1.0],
            },
            Vertex {
                position: [h, 0.0, h],
                normal: [0.0, 1.0, 0.0],
                uv: [1.0, 1.0],
                tangent: [1.0, 0.0, 0.0, 1.0],
            },
            Vertex {
                position: [-h, 0.0, h],
                normal: [0.0, 1.0, 0.0],
                uv: [0.0, 1.0],
                tangent: [1.0, 0.0, 0.0, 1.0],
            },
        ];
        let indices = vec![0, 2, 1, 0, 3, 2];
        Self::new(vertices, indices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_cover_all_vertices() {
        let mesh = Mesh::cube(2.0);
        assert_eq!(mesh.bounds.min, Vec3::splat(-2.0));
        assert_eq!(mesh.bounds.max, Vec3::splat(2.0));
    }

    #[test]
    fn transformed_bounds_grow_with_rotation() {
        let mesh = Mesh::cube(1.0);
        let rotated = mesh.bounds.transform(&Affine3A::from_rotation_y(
            std::f32::consts::FRAC_PI_4,
        ));
        // A rotated unit cube's enclosing AABB is wider than the cube.
        assert!(rotated.max.x > 1.0 + 1e-4);
    }

    #[test]
    fn sphere_vertices_lie_on_radius() {
        let mesh = Mesh::uv_sphere(3.0, 16, 8);
        for v in &mesh.vertices {
            let len = Vec3::from(v.position).length();
            assert!((len - 3.0).abs() < 1e-3, "vertex at radius {len}");
        }
    }

    #[test]
    fn mesh_ids_are_unique() {
        let a = Mesh::plane(1.0);
        let b = Mesh::plane(1.0);
        assert_ne!(a.id(), b.id());
    }
}
