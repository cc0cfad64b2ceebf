//! A viewer that shows one spinning primitive (box, sphere or cone) at a
//! time.
//!
//! The [`Viewer`] owns the scene, camera, renderer and frame loops. Hosts
//! decide where it draws: a DOM element on the web, a window natively, or a
//! recording renderer in tests and headless runs.

pub mod animation;
#[cfg(not(target_arch = "wasm32"))]
pub mod app;
pub mod camera;
pub mod color;
pub mod config;
pub mod error;
pub mod geometry;
pub mod intent;
pub mod render;
pub mod scene;
pub mod viewer;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use animation::{AnimationPolicy, FrameLoops, FrameOutcome, LoopToken};
#[cfg(not(target_arch = "wasm32"))]
pub use app::{LoadRequest, RunOptions};
pub use camera::PerspectiveCamera;
pub use color::{Color, ColorInput};
pub use config::ViewerConfig;
pub use error::{ColorError, ViewerError};
pub use geometry::{Geometry, Shape};
pub use intent::{interpret, Interpretation};
pub use render::{HeadlessHost, HeadlessRenderer, SceneRenderer};
pub use scene::{Light, Mesh, MeshId, Scene, StandardMaterial};
pub use viewer::{BuiltObject, Host, LoadOutcome, Viewer};
