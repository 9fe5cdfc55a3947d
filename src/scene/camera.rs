use glam::{Mat4, Vec3, Vec4};

/// Projection kind for a [`Camera`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    /// Perspective projection. `fov_y` is in radians.
    Perspective { fov_y: f32, aspect: f32 },
    /// Symmetric orthographic projection with the given half extents.
    Orthographic { half_width: f32, half_height: f32 },
}

/// A look-at camera with a cached view-projection matrix and frustum.
///
/// The renderer treats the camera as read-only during a frame, except when it
/// substitutes a synthetic camera for shadow or probe capture; callers keep
/// their camera untouched because each pass builds its own.
///
/// Matrices target WGPU clip space (depth range `[0, 1]`, right-handed).
#[derive(Debug, Clone)]
pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub near: f32,
    pub far: f32,
    pub projection: Projection,

    view_matrix: Mat4,
    projection_matrix: Mat4,
    view_projection: Mat4,
    frustum: Frustum,
}

impl Camera {
    /// Creates a perspective camera at the origin looking down `-Z`.
    ///
    /// `fov_y_deg` is in degrees, matching the usual authoring convention.
    #[must_use]
    pub fn perspective(fov_y_deg: f32, aspect: f32, near: f32, far: f32) -> Self {
        let mut cam = Self {
            eye: Vec3::ZERO,
            target: Vec3::NEG_Z,
            up: Vec3::Y,
            near,
            far,
            projection: Projection::Perspective {
                fov_y: fov_y_deg.to_radians(),
                aspect,
            },
            view_matrix: Mat4::IDENTITY,
            projection_matrix: Mat4::IDENTITY,
            view_projection: Mat4::IDENTITY,
            frustum: Frustum::default(),
        };
        cam.update_matrices();
        cam
    }

    /// Creates a symmetric orthographic camera, as used by directional
    /// shadow projections.
    #[must_use]
    pub fn orthographic(half_extent: f32, near: f32, far: f32) -> Self {
        let mut cam = Self {
            eye: Vec3::ZERO,
            target: Vec3::NEG_Z,
            up: Vec3::Y,
            near,
            far,
            projection: Projection::Orthographic {
                half_width: half_extent,
                half_height: half_extent,
            },
            view_matrix: Mat4::IDENTITY,
            projection_matrix: Mat4::IDENTITY,
            view_projection: Mat4::IDENTITY,
            frustum: Frustum::default(),
        };
        cam.update_matrices();
        cam
    }

    /// Repositions the camera and refreshes the cached matrices.
    pub fn look_at(&mut self, eye: Vec3, target: Vec3, up: Vec3) {
        self.eye = eye;
        self.target = target;
        self.up = up;
        self.update_matrices();
    }

    /// Recomputes view, projection, view-projection and the frustum.
    pub fn update_matrices(&mut self) {
        self.view_matrix = Mat4::look_at_rh(self.eye, self.target, self.up);
        self.projection_matrix = match self.projection {
            Projection::Perspective { fov_y, aspect } => {
                Mat4::perspective_rh(fov_y, aspect, self.near, self.far)
            }
            Projection::Orthographic {
                half_width,
                half_height,
            } => Mat4::orthographic_rh(
                -half_width,
                half_width,
                -half_height,
                half_height,
                self.near,
                self.far,
            ),
        };
        self.view_projection = self.projection_matrix * self.view_matrix;
        self.frustum = Frustum::from_matrix(self.view_projection);
    }

    #[must_use]
    pub fn view_matrix(&self) -> Mat4 {
        self.view_matrix
    }

    #[must_use]
    pub fn projection_matrix(&self) -> Mat4 {
        self.projection_matrix
    }

    #[must_use]
    pub fn view_projection(&self) -> Mat4 {
        self.view_projection
    }

    #[must_use]
    pub fn frustum(&self) -> &Frustum {
        &self.frustum
    }

    /// Conservative frustum test for an axis-aligned box given as center and
    /// half extents. Boxes straddling the boundary report visible.
    #[must_use]
    pub fn test_box_in_frustum(&self, center: Vec3, halfsize: Vec3) -> bool {
        self.frustum.intersects_box(center, halfsize)
    }
}

/// View frustum as six clip planes, extracted with the Gribb-Hartmann method.
///
/// Plane order: Left, Right, Bottom, Top, Near, Far. The near plane uses the
/// `[0, 1]` depth-range form (`row 3` alone), matching WGPU clip space.
#[derive(Debug, Clone, Copy, Default)]
pub struct Frustum {
    planes: [Vec4; 6],
}

impl Frustum {
    /// Extracts frustum planes from a view-projection matrix.
    #[must_use]
    pub fn from_matrix(m: Mat4) -> Self {
        let rows = [m.row(0), m.row(1), m.row(2), m.row(3)];

        let mut planes = [Vec4::ZERO; 6];
        planes[0] = rows[3] + rows[0]; // Left
        planes[1] = rows[3] - rows[0]; // Right
        planes[2] = rows[3] + rows[1]; // Bottom
        planes[3] = rows[3] - rows[1]; // Top
        planes[4] = rows[2]; // Near ([0,1] clip range)
        planes[5] = rows[3] - rows[2]; // Far

        for plane in &mut planes {
            let length = Vec3::new(plane.x, plane.y, plane.z).length();
            if length > 0.0 {
                *plane /= length;
            }
        }

        Self { planes }
    }

    /// Sphere-frustum intersection. Returns `true` when any part of the
    /// sphere may be inside the frustum.
    #[must_use]
    pub fn intersects_sphere(&self, center: Vec3, radius: f32) -> bool {
        for plane in &self.planes {
            let dist = plane.x * center.x + plane.y * center.y + plane.z * center.z + plane.w;
            if dist < -radius {
                return false;
            }
        }
        true
    }

    /// Conservative AABB-frustum intersection (center + half extents).
    ///
    /// Uses the projected-radius test: a box is rejected only when it lies
    /// entirely in the negative half-space of some plane, so partially
    /// visible boxes always pass.
    #[must_use]
    pub fn intersects_box(&self, center: Vec3, halfsize: Vec3) -> bool {
        for plane in &self.planes {
            let normal = Vec3::new(plane.x, plane.y, plane.z);
            let radius = normal.abs().dot(halfsize);
            let dist = normal.dot(center) + plane.w;
            if dist < -radius {
                return false;
            }
        }
        true
    }
}
