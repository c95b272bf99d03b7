mod common;
mod gpu;

pub use common::{srgb_to_linear, CameraParams, Draw, DrawItem, Frame, LightParams, MeshKey};
pub use gpu::Renderer;
