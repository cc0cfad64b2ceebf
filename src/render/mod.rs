pub mod common;
pub mod headless;

#[cfg(target_arch = "wasm32")]
pub mod canvas;
#[cfg(not(target_arch = "wasm32"))]
pub mod native;

use anyhow::Result;

use crate::camera::PerspectiveCamera;
use crate::scene::Scene;

pub use common::{project_scene, shade, MountExtent, ScreenTriangle};
pub use headless::{FrameLog, FrameRecord, HeadlessHost, HeadlessRenderer, MeshSnapshot};

#[cfg(target_arch = "wasm32")]
pub use canvas::CanvasRenderer;
#[cfg(not(target_arch = "wasm32"))]
pub use native::Renderer;

/// Draws a scene through a camera onto whatever surface the renderer owns.
pub trait SceneRenderer {
    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> Result<()>;
}
