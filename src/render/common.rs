use glam::{Mat4, Vec3};

use crate::scene::PartId;

/// Camera parameters consumed by the renderer's uniform buffer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraParams {
    pub view_proj: Mat4,
    pub position: Vec3,
}

/// Lighting state consumed by the renderer's uniform buffer. Colors are linear.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LightParams {
    pub sky_color: Vec3,
    pub ground_color: Vec3,
    pub hemisphere_intensity: f32,
    /// Unit vector from the ground towards the sky color.
    pub hemisphere_up: Vec3,
    pub directional_color: Vec3,
    pub directional_intensity: f32,
    /// Unit vector from the lit surface towards the directional light.
    pub directional_direction: Vec3,
}

/// Geometry uploaded once when the renderer starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MeshKey {
    Ground,
    Part(PartId),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawItem {
    pub mesh: MeshKey,
    pub model: Mat4,
    /// Linear base color.
    pub color: Vec3,
}

/// Everything needed to draw one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    /// Linear clear color.
    pub clear_color: Vec3,
    pub exposure: f32,
    pub camera: CameraParams,
    pub light: LightParams,
    pub items: Vec<DrawItem>,
}

/// A backend able to present a [`Frame`].
pub trait Draw {
    type Error;

    fn draw(&mut self, frame: &Frame) -> Result<(), Self::Error>;
}

/// Converts one sRGB-encoded color into linear space.
pub fn srgb_to_linear(color: Vec3) -> Vec3 {
    let channel = |c: f32| {
        if c <= 0.04045 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    };
    Vec3::new(channel(color.x), channel(color.y), channel(color.z))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn srgb_endpoints_are_preserved() {
        assert_eq!(srgb_to_linear(Vec3::ZERO), Vec3::ZERO);
        assert!((srgb_to_linear(Vec3::ONE) - Vec3::ONE).length() < 1e-6);
        let mid = srgb_to_linear(Vec3::splat(0.5));
        assert!((mid.x - 0.214).abs() < 1e-3);
    }
}
