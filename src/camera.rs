use glam::{Mat4, Vec2, Vec3};

use crate::config::CameraConfig;
use crate::input::Viewport;

/// Perspective camera looking at a fixed target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerspectiveCamera {
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
    pub target: Vec3,
    /// Screen-up direction in world space.
    pub up: Vec3,
}

impl PerspectiveCamera {
    pub fn from_config(config: &CameraConfig, aspect: f32) -> Self {
        Self {
            fov: config.fov,
            aspect: aspect.max(0.01),
            near: config.near,
            far: config.far,
            position: config.position,
            target: config.target,
            up: default_up(config.target - config.position),
        }
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect.max(0.01);
    }

    pub fn forward(&self) -> Vec3 {
        (self.target - self.position).normalize_or_zero()
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    /// Projection with a `[0, 1]` depth range, as wgpu expects.
    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov.to_radians(), self.aspect, self.near, self.far)
    }

    pub fn view_proj(&self) -> Mat4 {
        self.projection() * self.view()
    }

    /// Unprojects a normalized device coordinate onto the near and far planes.
    pub fn unproject(&self, ndc: Vec2) -> (Vec3, Vec3) {
        let inverse = self.view_proj().inverse();
        let near = inverse.project_point3(ndc.extend(0.0));
        let far = inverse.project_point3(ndc.extend(1.0));
        (near, far)
    }
}

/// World up is +Y unless the camera looks straight along it; then the
/// screen's up follows the Z axis, as a nudged look-at would.
fn default_up(view_direction: Vec3) -> Vec3 {
    let forward = view_direction.normalize_or_zero();
    if forward.cross(Vec3::Y).length_squared() < 1e-8 {
        Vec3::Z * forward.y.signum()
    } else {
        Vec3::Y
    }
}

const MIN_POLAR: f32 = 1e-6;

/// Orbits the camera around its target: drag to rotate, wheel to zoom.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitControls {
    pub target: Vec3,
    pub rotate_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    distance: f32,
    /// Azimuth around +Y, measured from +Z towards +X.
    theta: f32,
    /// Polar angle from +Y.
    phi: f32,
    drag_origin: Option<Vec2>,
}

impl OrbitControls {
    pub fn new(camera: &PerspectiveCamera) -> Self {
        let offset = camera.position - camera.target;
        let distance = offset.length().max(f32::EPSILON);
        let theta = offset.x.atan2(offset.z);
        let phi = (offset.y / distance).clamp(-1.0, 1.0).acos();
        let mut controls = Self {
            target: camera.target,
            rotate_speed: 1.0,
            min_distance: 1.0,
            max_distance: camera.far * 0.5,
            distance,
            theta,
            phi,
            drag_origin: None,
        };
        controls.make_safe();
        controls
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }

    pub fn is_dragging(&self) -> bool {
        self.drag_origin.is_some()
    }

    pub fn begin_drag(&mut self, cursor: Vec2) {
        self.drag_origin = Some(cursor);
    }

    pub fn end_drag(&mut self) {
        self.drag_origin = None;
    }

    /// Rotates by the cursor movement since the last call while dragging.
    /// A full viewport height of travel turns the camera by a full circle.
    pub fn drag_to(&mut self, cursor: Vec2, viewport: Viewport) -> bool {
        let Some(origin) = self.drag_origin.replace(cursor) else {
            return false;
        };
        let delta = cursor - origin;
        let height = viewport.height as f32;
        self.theta -= std::f32::consts::TAU * delta.x / height * self.rotate_speed;
        self.phi -= std::f32::consts::TAU * delta.y / height * self.rotate_speed;
        self.make_safe();
        true
    }

    /// Positive steps zoom in.
    pub fn zoom(&mut self, steps: f32) {
        self.distance *= 0.95_f32.powf(steps);
        self.make_safe();
    }

    pub fn apply(&self, camera: &mut PerspectiveCamera) {
        let (sin_phi, cos_phi) = self.phi.sin_cos();
        let (sin_theta, cos_theta) = self.theta.sin_cos();
        let offset = Vec3::new(sin_phi * sin_theta, cos_phi, sin_phi * cos_theta) * self.distance;
        camera.position = self.target + offset;
        camera.target = self.target;
        // Towards decreasing polar angle; stays defined at the poles, where
        // it turns with the azimuth.
        camera.up = Vec3::new(-cos_phi * sin_theta, sin_phi, -cos_phi * cos_theta);
    }

    fn make_safe(&mut self) {
        self.phi = self
            .phi
            .clamp(MIN_POLAR, std::f32::consts::PI - MIN_POLAR);
        self.distance = self
            .distance
            .clamp(self.min_distance, self.max_distance.max(self.min_distance));
    }
}
