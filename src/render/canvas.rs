use anyhow::{anyhow, Result};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use crate::camera::PerspectiveCamera;
use crate::scene::Scene;

use super::common::{project_scene, MountExtent};
use super::SceneRenderer;

/// Renderer backed by a 2D canvas. Triangles are shaded and projected on
/// the CPU, then painted back to front.
pub struct CanvasRenderer {
    canvas: HtmlCanvasElement,
    context: CanvasRenderingContext2d,
    size: (u32, u32),
}

impl CanvasRenderer {
    /// Creates a renderer that draws into the provided HTML canvas element.
    pub fn new(canvas: HtmlCanvasElement) -> Result<Self> {
        let context = canvas
            .get_context("2d")
            .map_err(|err| anyhow!("failed to query canvas context: {err:?}"))?
            .ok_or_else(|| anyhow!("canvas does not support 2d context"))?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|_| anyhow!("failed to cast canvas context"))?;

        let size = (canvas.width(), canvas.height());
        Ok(Self {
            canvas,
            context,
            size,
        })
    }

    /// Resizes the backing store to the element the canvas is mounted in.
    /// The camera keeps its aspect ratio.
    pub fn fit_to_mount(&mut self) {
        let Some(mount) = self.canvas.parent_element() else {
            return;
        };
        let extent = MountExtent::from_client(mount.client_width(), mount.client_height());
        self.resize(extent.backing);
    }

    fn resize(&mut self, new_size: (u32, u32)) {
        if new_size == self.size {
            return;
        }
        self.size = new_size;
        self.canvas.set_width(new_size.0);
        self.canvas.set_height(new_size.1);
    }

    fn clear_background(&self, scene: &Scene) {
        self.context
            .set_fill_style(&JsValue::from_str(&scene.background.to_css()));
        self.context
            .fill_rect(0.0, 0.0, self.size.0 as f64, self.size.1 as f64);
    }
}

impl SceneRenderer for CanvasRenderer {
    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> Result<()> {
        self.clear_background(scene);

        for triangle in project_scene(scene, camera, self.size) {
            let style = JsValue::from_str(&triangle.color.to_css());
            self.context.set_fill_style(&style);
            self.context.set_stroke_style(&style);
            let [a, b, c] = triangle.points;
            self.context.begin_path();
            self.context.move_to(a.x as f64, a.y as f64);
            self.context.line_to(b.x as f64, b.y as f64);
            self.context.line_to(c.x as f64, c.y as f64);
            self.context.close_path();
            self.context.fill();
            self.context.stroke();
        }
        Ok(())
    }
}
