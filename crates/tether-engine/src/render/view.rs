use glam::{Mat4, Vec3};

/// Per-frame camera and lighting inputs for 3D renderers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneView {
    pub view: Mat4,
    pub projection: Mat4,
    /// Direction the light travels (from the light toward the scene), normalized.
    pub light_direction: Vec3,
    /// Constant term added to the diffuse factor.
    pub ambient: f32,
    pub clear_color: wgpu::Color,
}

impl SceneView {
    /// Right-handed look-at camera with a 0..1 depth perspective projection.
    pub fn look_at(
        eye: Vec3,
        target: Vec3,
        up: Vec3,
        fov_y_radians: f32,
        aspect: f32,
        z_near: f32,
        z_far: f32,
    ) -> Self {
        Self {
            view: Mat4::look_at_rh(eye, target, up),
            projection: Mat4::perspective_rh(fov_y_radians, aspect, z_near, z_far),
            ..Self::default()
        }
    }

    pub fn with_light(mut self, direction: Vec3, ambient: f32) -> Self {
        self.light_direction = direction.normalize_or_zero();
        self.ambient = ambient;
        self
    }

    pub fn with_clear_color(mut self, clear_color: wgpu::Color) -> Self {
        self.clear_color = clear_color;
        self
    }
}

impl Default for SceneView {
    fn default() -> Self {
        Self {
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            light_direction: Vec3::NEG_Y,
            ambient: 0.0,
            clear_color: wgpu::Color::BLACK,
        }
    }
}
