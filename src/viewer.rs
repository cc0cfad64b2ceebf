use log::{debug, info, trace, warn};

use crate::animation::{FrameLoops, FrameOutcome, LoopToken};
use crate::camera::PerspectiveCamera;
use crate::color::{Color, ColorInput};
use crate::config::ViewerConfig;
use crate::error::ViewerError;
use crate::geometry::Shape;
use crate::render::SceneRenderer;
use crate::scene::{Mesh, MeshId, Scene, StandardMaterial};

/// Environment the viewer draws into: a DOM element, a window, or nothing.
pub trait Host {
    type Renderer: SceneRenderer;

    /// Clears the mount point named `mount_id` and attaches a fresh drawing
    /// surface to it.
    fn attach(&mut self, mount_id: &str) -> Result<Attachment<Self::Renderer>, ViewerError>;
}

/// A renderer bound to a mount point, with the mount's size at attach time.
pub struct Attachment<R> {
    pub renderer: R,
    pub viewport: (u32, u32),
}

/// The object a call to [`Viewer::build`] put on display.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BuiltObject {
    pub mesh: MeshId,
    pub shape: Shape,
    pub color: Color,
}

/// What a call to [`Viewer::load`] did.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadOutcome {
    pub mesh: MeshId,
    pub shape: Shape,
    pub color: Color,
    pub token: LoopToken,
    /// Loops stopped to make room for `token`; hosts drop their callbacks.
    pub cancelled: Vec<LoopToken>,
}

struct Stage<R> {
    scene: Scene,
    camera: PerspectiveCamera,
    renderer: R,
    displayed: Option<MeshId>,
}

/// Owns the scene, camera, renderer and frame loops of one viewport.
pub struct Viewer<H: Host> {
    config: ViewerConfig,
    host: H,
    stage: Option<Stage<H::Renderer>>,
    loops: FrameLoops,
    next_mesh: u64,
    frames: u64,
}

impl<H: Host> Viewer<H> {
    pub fn new(config: ViewerConfig, host: H) -> Self {
        let loops = FrameLoops::new(config.animation);
        Self {
            config,
            host,
            stage: None,
            loops,
            next_mesh: 0,
            frames: 0,
        }
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn is_initialized(&self) -> bool {
        self.stage.is_some()
    }

    /// Bootstraps the scene now instead of on the first load. Idempotent.
    pub fn init(&mut self) -> Result<(), ViewerError> {
        self.stage_mut().map(|_| ())
    }

    /// Replaces the displayed object with a freshly built, centred primitive.
    pub fn build(
        &mut self,
        shape: &str,
        color: impl Into<ColorInput>,
    ) -> Result<BuiltObject, ViewerError> {
        let shape = Shape::from_tag(shape);
        let color = resolve_color(&color.into());
        let material = StandardMaterial::new(
            color,
            self.config.material.roughness,
            self.config.material.metalness,
        );
        self.next_mesh += 1;
        let id = MeshId(self.next_mesh);
        let mut geometry = shape.build();
        geometry.center();
        let mesh = Mesh::new(id, shape, geometry, material);

        let stage = self.stage_mut()?;
        if let Some(previous) = stage.displayed.take() {
            if stage.scene.remove(previous).is_some() {
                debug!("detached {previous}");
            }
        }
        stage.scene.add(mesh);
        stage.displayed = Some(id);
        debug!("attached {id}: {shape} {color}");
        Ok(BuiltObject {
            mesh: id,
            shape,
            color,
        })
    }

    /// Builds the requested object and starts a frame loop for it.
    pub fn load(
        &mut self,
        shape: &str,
        color: impl Into<ColorInput>,
    ) -> Result<LoadOutcome, ViewerError> {
        let built = self.build(shape, color)?;
        let start = self.loops.start();
        for cancelled in &start.cancelled {
            debug!("cancelled {cancelled}");
        }
        let outcome = LoadOutcome {
            mesh: built.mesh,
            shape: built.shape,
            color: built.color,
            token: start.token,
            cancelled: start.cancelled,
        };
        info!(
            "displaying {} {} ({} live loop(s))",
            outcome.shape,
            outcome.color,
            self.loops.live_count()
        );
        Ok(outcome)
    }

    /// One callback of the loop identified by `token`: spin the displayed
    /// object, then draw. Cancelled loops do nothing and report `Stopped`.
    pub fn run_frame(&mut self, token: LoopToken) -> Result<FrameOutcome, ViewerError> {
        if !self.loops.is_live(token) {
            trace!("{token} is no longer live");
            return Ok(FrameOutcome::Stopped);
        }
        let (spin_x, spin_y) = (self.config.spin.x, self.config.spin.y);
        let Some(stage) = self.stage.as_mut() else {
            return Ok(FrameOutcome::Continue);
        };
        if let Some(mesh) = stage.displayed.and_then(|id| stage.scene.mesh_mut(id)) {
            mesh.rotation.x += spin_x;
            mesh.rotation.y += spin_y;
        }
        stage
            .renderer
            .render(&stage.scene, &stage.camera)
            .map_err(ViewerError::Backend)?;
        self.frames += 1;
        Ok(FrameOutcome::Continue)
    }

    /// One display refresh: every live loop runs once, oldest first.
    /// Returns how many callbacks ran.
    pub fn refresh(&mut self) -> Result<usize, ViewerError> {
        let tokens = self.loops.live().to_vec();
        for token in &tokens {
            self.run_frame(*token)?;
        }
        Ok(tokens.len())
    }

    /// Cancels every live loop and returns their tokens.
    pub fn stop(&mut self) -> Vec<LoopToken> {
        self.loops.cancel_all()
    }

    pub fn live_loops(&self) -> &[LoopToken] {
        self.loops.live()
    }

    /// Frames rendered since the viewer was created.
    pub fn frames_rendered(&self) -> u64 {
        self.frames
    }

    pub fn scene(&self) -> Option<&Scene> {
        self.stage.as_ref().map(|stage| &stage.scene)
    }

    pub fn camera(&self) -> Option<&PerspectiveCamera> {
        self.stage.as_ref().map(|stage| &stage.camera)
    }

    pub fn renderer_mut(&mut self) -> Option<&mut H::Renderer> {
        self.stage.as_mut().map(|stage| &mut stage.renderer)
    }

    pub fn displayed(&self) -> Option<&Mesh> {
        let stage = self.stage.as_ref()?;
        stage.scene.mesh(stage.displayed?)
    }

    fn stage_mut(&mut self) -> Result<&mut Stage<H::Renderer>, ViewerError> {
        let stage = match self.stage.take() {
            Some(stage) => stage,
            None => self.bootstrap()?,
        };
        Ok(self.stage.insert(stage))
    }

    fn bootstrap(&mut self) -> Result<Stage<H::Renderer>, ViewerError> {
        let mount_id = self.config.mount_id.clone();
        let attachment = self.host.attach(&mount_id)?;
        let mut scene = Scene::new(self.config.background_color());
        for light in self.config.lights() {
            scene.add_light(light);
        }
        let camera = PerspectiveCamera::new(&self.config.camera, attachment.viewport);
        info!(
            "viewer attached to `{mount_id}` at {}x{}",
            attachment.viewport.0, attachment.viewport.1
        );
        Ok(Stage {
            scene,
            camera,
            renderer: attachment.renderer,
            displayed: None,
        })
    }
}

fn resolve_color(input: &ColorInput) -> Color {
    match Color::from_input(input) {
        Ok(color) => color,
        Err(err) => {
            warn!("{err}; using white");
            Color::WHITE
        }
    }
}
