//! Interactive keycap viewer.
//!
//! Loads a glTF keycap model, lights it, and plays a short press/release
//! animation on one of its parts when the user hits `Enter` or clicks the
//! part. All viewer state lives in [`Viewer`], which stays free of any
//! windowing so it can be driven from tests; [`ViewerApp`] connects it to a
//! `winit` window and the `wgpu` [`Renderer`] on the desktop and in the
//! browser.

pub mod animation;
pub mod app;
pub mod asset;
pub mod camera;
pub mod config;
pub mod error;
pub mod host;
pub mod input;
pub mod interaction;
pub mod mesh;
pub mod raycast;
pub mod render;
pub mod scene;
pub mod time;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use animation::{ActionState, Clip, LoopMode, Mixer};
pub use app::Viewer;
pub use asset::{load_model, model_from_slice, AssetSource};
pub use camera::{OrbitControls, PerspectiveCamera};
pub use config::ViewerConfig;
pub use error::LoadError;
pub use host::ViewerApp;
pub use input::{KeyCode, MouseButton, NamedKey, Viewport};
pub use interaction::{InputHandler, Trigger};
pub use mesh::MeshData;
pub use render::{CameraParams, Draw, Frame, LightParams, Renderer};
pub use scene::{Model, Part, PartId, Transform};
