//! Spherical harmonics projection.
//!
//! Projects six cubemap faces of captured radiance onto the 9 L2 basis
//! coefficients (per color channel) used by the irradiance probes. The
//! shading stages evaluate these with the Ramamoorthi-Hanrahan constants,
//! so the projection here stores raw radiance coefficients.

use glam::Vec3;

/// Number of SH basis functions (L0..L2).
pub const SH_COEFF_COUNT: usize = 9;

/// One probe's worth of SH coefficients: 9 basis functions x RGB.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SphericalHarmonics9 {
    pub coefficients: [Vec3; SH_COEFF_COUNT],
}

impl SphericalHarmonics9 {
    /// Flattens to the persisted 27-float layout (RGB per coefficient).
    #[must_use]
    pub fn to_floats(&self) -> [f32; 27] {
        let mut out = [0.0; 27];
        for (i, c) in self.coefficients.iter().enumerate() {
            out[i * 3] = c.x;
            out[i * 3 + 1] = c.y;
            out[i * 3 + 2] = c.z;
        }
        out
    }

    #[must_use]
    pub fn from_floats(values: &[f32; 27]) -> Self {
        let mut coefficients = [Vec3::ZERO; SH_COEFF_COUNT];
        for (i, c) in coefficients.iter_mut().enumerate() {
            *c = Vec3::new(values[i * 3], values[i * 3 + 1], values[i * 3 + 2]);
        }
        Self { coefficients }
    }
}

/// Forward vectors of the six capture faces, in +X, -X, +Y, -Y, +Z, -Z
/// order.
pub const CUBE_FACE_FORWARD: [Vec3; 6] = [
    Vec3::X,
    Vec3::NEG_X,
    Vec3::Y,
    Vec3::NEG_Y,
    Vec3::Z,
    Vec3::NEG_Z,
];

/// Up vectors matching [`CUBE_FACE_FORWARD`].
pub const CUBE_FACE_UP: [Vec3; 6] = [
    Vec3::NEG_Y,
    Vec3::NEG_Y,
    Vec3::Z,
    Vec3::NEG_Z,
    Vec3::NEG_Y,
    Vec3::NEG_Y,
];

/// An RGB float image read back from a capture target.
#[derive(Debug, Clone)]
pub struct FloatImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<Vec3>,
}

impl FloatImage {
    #[must_use]
    pub fn new(width: u32, height: u32, pixels: Vec<Vec3>) -> Self {
        debug_assert_eq!(pixels.len(), (width * height) as usize);
        Self {
            width,
            height,
            pixels,
        }
    }
}

/// Evaluates the 9 real SH basis functions at a unit direction.
#[must_use]
pub fn sh_basis(dir: Vec3) -> [f32; SH_COEFF_COUNT] {
    let (x, y, z) = (dir.x, dir.y, dir.z);
    [
        0.282095,
        0.488603 * y,
        0.488603 * z,
        0.488603 * x,
        1.092548 * x * y,
        1.092548 * y * z,
        0.315392 * (3.0 * z * z - 1.0),
        1.092548 * x * z,
        0.546274 * (x * x - y * y),
    ]
}

/// World direction through a face pixel, for a 90-degree capture camera
/// looking along `CUBE_FACE_FORWARD[face]` with `CUBE_FACE_UP[face]`.
///
/// `u`/`v` are in [0, 1] with v = 0 at the top image row.
#[must_use]
pub fn face_direction(face: usize, u: f32, v: f32) -> Vec3 {
    let forward = CUBE_FACE_FORWARD[face];
    let up = CUBE_FACE_UP[face];
    let right = forward.cross(up).normalize();
    // 90-degree fov: the half extent of the image plane equals the focal
    // distance.
    (forward + right * (2.0 * u - 1.0) + up * (1.0 - 2.0 * v)).normalize()
}

/// Solid angle weight of a cube face texel at normalized coordinates.
fn texel_solid_angle(u: f32, v: f32, texel_size: f32) -> f32 {
    let su = 2.0 * u - 1.0;
    let sv = 2.0 * v - 1.0;
    let r2 = 1.0 + su * su + sv * sv;
    // dA / r^3: the projected area of the texel over the cube face.
    texel_size * texel_size / (r2 * r2.sqrt())
}

/// Projects six captured faces onto the SH basis.
///
/// Every texel contributes its radiance weighted by its solid angle; the
/// sum of all weights over a cube is 4*pi, so a uniform environment yields
/// `coefficients[0] = color * Y00 * 4*pi` and zero directional terms.
#[must_use]
pub fn project_sh(faces: &[FloatImage; 6]) -> SphericalHarmonics9 {
    let mut sh = SphericalHarmonics9::default();

    for (face_index, image) in faces.iter().enumerate() {
        let texel_size = 2.0 / image.width as f32;
        for y in 0..image.height {
            for x in 0..image.width {
                let u = (x as f32 + 0.5) / image.width as f32;
                let v = (y as f32 + 0.5) / image.height as f32;
                let dir = face_direction(face_index, u, v);
                let weight = texel_solid_angle(u, v, texel_size);
                let radiance = image.pixels[(y * image.width + x) as usize];

                let basis = sh_basis(dir);
                for (slot, b) in sh.coefficients.iter_mut().zip(basis) {
                    *slot += radiance * b * weight;
                }
            }
        }
    }

    sh
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform_faces(color: Vec3, size: u32) -> [FloatImage; 6] {
        std::array::from_fn(|_| {
            FloatImage::new(size, size, vec![color; (size * size) as usize])
        })
    }

    #[test]
    fn face_directions_are_unit_and_centered() {
        for face in 0..6 {
            let center = face_direction(face, 0.5, 0.5);
            assert!((center - CUBE_FACE_FORWARD[face]).length() < 1e-5);
            let corner = face_direction(face, 0.0, 0.0);
            assert!((corner.length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn uniform_environment_projects_to_dc_term() {
        let color = Vec3::new(0.25, 0.5, 1.0);
        let sh = project_sh(&uniform_faces(color, 16));

        // DC term: color * Y00 * 4pi.
        let expected = color * 0.282095 * 4.0 * std::f32::consts::PI;
        let dc = sh.coefficients[0];
        assert!(
            (dc - expected).length() < expected.length() * 0.02,
            "dc = {dc:?}, expected {expected:?}"
        );

        // Directional terms vanish for a uniform environment.
        for (i, c) in sh.coefficients.iter().enumerate().skip(1) {
            assert!(
                c.length() < expected.length() * 0.02,
                "coefficient {i} should be near zero, got {c:?}"
            );
        }
    }

    #[test]
    fn float_roundtrip_preserves_coefficients() {
        let mut sh = SphericalHarmonics9::default();
        for (i, c) in sh.coefficients.iter_mut().enumerate() {
            *c = Vec3::new(i as f32, i as f32 * 0.5, -(i as f32));
        }
        let restored = SphericalHarmonics9::from_floats(&sh.to_floats());
        assert_eq!(sh, restored);
    }
}
