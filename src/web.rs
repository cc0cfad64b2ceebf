#![cfg(target_arch = "wasm32")]

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use log::{error, info, Level};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::HtmlCanvasElement;

use crate::animation::{FrameOutcome, LoopToken};
use crate::color::ColorInput;
use crate::config::ViewerConfig;
use crate::error::ViewerError;
use crate::intent::interpret;
use crate::render::{CanvasRenderer, MountExtent};
use crate::viewer::{Attachment, Host, Viewer};

#[wasm_bindgen(start)]
pub fn init_logging() {
    console_error_panic_hook::set_once();
    // A second module instance finds the logger already installed.
    console_log::init_with_level(Level::Info).ok();
}

/// Mounts a 2D canvas into a DOM element, replacing its children.
#[derive(Debug, Default)]
pub struct DocumentHost;

impl Host for DocumentHost {
    type Renderer = CanvasRenderer;

    fn attach(&mut self, mount_id: &str) -> Result<Attachment<CanvasRenderer>, ViewerError> {
        let window =
            web_sys::window().ok_or_else(|| ViewerError::Host("window not available".into()))?;
        let document = window
            .document()
            .ok_or_else(|| ViewerError::Host("document not available".into()))?;
        let mount = document
            .get_element_by_id(mount_id)
            .ok_or_else(|| ViewerError::MountNotFound(mount_id.to_string()))?;

        mount.set_inner_html("");
        let extent = MountExtent::from_client(mount.client_width(), mount.client_height());
        let (width, height) = extent.backing;

        let canvas = document
            .create_element("canvas")
            .map_err(js_error)?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| ViewerError::Host("created element is not a canvas".into()))?;
        canvas.set_width(width);
        canvas.set_height(height);
        mount.append_child(&canvas).map_err(js_error)?;

        let renderer = CanvasRenderer::new(canvas).map_err(ViewerError::Backend)?;
        Ok(Attachment {
            renderer,
            viewport: extent.viewport,
        })
    }
}

type FrameCallback = Rc<RefCell<Option<Closure<dyn FnMut()>>>>;

/// A loop's pending `requestAnimationFrame` and the callback it will run.
struct ScheduledFrame {
    request_id: i32,
    callback: FrameCallback,
}

struct WebState {
    viewer: Viewer<DocumentHost>,
    scheduled: HashMap<LoopToken, ScheduledFrame>,
    resize_listener: Option<Closure<dyn FnMut()>>,
}

impl WebState {
    fn request_next(&mut self, token: LoopToken) -> Result<(), JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("window not available"))?;
        let Some(frame) = self.scheduled.get_mut(&token) else {
            return Ok(());
        };
        let callback = frame.callback.borrow();
        let Some(closure) = callback.as_ref() else {
            return Ok(());
        };
        frame.request_id = window.request_animation_frame(closure.as_ref().unchecked_ref())?;
        Ok(())
    }

    /// Cancels the pending frame of `token` and drops its callback.
    fn release(&mut self, token: LoopToken) {
        let Some(frame) = self.scheduled.remove(&token) else {
            return;
        };
        if let Some(window) = web_sys::window() {
            if let Err(err) = window.cancel_animation_frame(frame.request_id) {
                error!("cancelAnimationFrame failed for {token}: {err:?}");
            }
        }
        frame.callback.borrow_mut().take();
    }
}

/// A viewer bound to one DOM element.
#[wasm_bindgen]
#[derive(Clone)]
pub struct ShapeViewer {
    inner: Rc<RefCell<WebState>>,
}

#[wasm_bindgen]
impl ShapeViewer {
    #[wasm_bindgen(constructor)]
    pub fn new(mount_id: Option<String>) -> ShapeViewer {
        let mut config = ViewerConfig::default();
        if let Some(mount_id) = mount_id {
            config.mount_id = mount_id;
        }
        Self {
            inner: Rc::new(RefCell::new(WebState {
                viewer: Viewer::new(config, DocumentHost),
                scheduled: HashMap::new(),
                resize_listener: None,
            })),
        }
    }

    /// Creates the scene and canvas without displaying anything yet.
    pub fn init(&self) -> Result<(), JsValue> {
        self.inner.borrow_mut().viewer.init().map_err(to_js)?;
        self.watch_resize()
    }

    /// Displays `shape` in `color` and starts spinning it.
    pub fn load(&self, shape: &str, color: JsValue) -> Result<(), JsValue> {
        let token = {
            let mut state = self.inner.borrow_mut();
            let outcome = state
                .viewer
                .load(shape, color_from_js(&color))
                .map_err(to_js)?;
            for cancelled in outcome.cancelled {
                state.release(cancelled);
            }
            outcome.token
        };
        self.watch_resize()?;
        self.schedule(token)
    }

    /// Stops every running loop. The last frame stays on the canvas.
    pub fn stop(&self) {
        let mut state = self.inner.borrow_mut();
        for token in state.viewer.stop() {
            state.release(token);
        }
    }

    #[wasm_bindgen(getter, js_name = liveLoops)]
    pub fn live_loops(&self) -> usize {
        self.inner.borrow().viewer.live_loops().len()
    }

    /// Loops with a `requestAnimationFrame` callback still pending.
    #[wasm_bindgen(getter, js_name = pendingFrames)]
    pub fn pending_frames(&self) -> usize {
        self.inner.borrow().scheduled.len()
    }
}

impl ShapeViewer {
    /// Keeps the canvas backing store in step with the window size. Installed
    /// once, after the scene exists.
    fn watch_resize(&self) -> Result<(), JsValue> {
        let mut state = self.inner.borrow_mut();
        if state.resize_listener.is_some() || !state.viewer.is_initialized() {
            return Ok(());
        }
        let weak: Weak<RefCell<WebState>> = Rc::downgrade(&self.inner);
        let listener = Closure::wrap(Box::new(move || {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let Ok(mut state) = inner.try_borrow_mut() else {
                return;
            };
            if let Some(renderer) = state.viewer.renderer_mut() {
                renderer.fit_to_mount();
            }
        }) as Box<dyn FnMut()>);
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("window not available"))?;
        window.add_event_listener_with_callback("resize", listener.as_ref().unchecked_ref())?;
        state.resize_listener = Some(listener);
        Ok(())
    }

    fn schedule(&self, token: LoopToken) -> Result<(), JsValue> {
        let callback: FrameCallback = Rc::new(RefCell::new(None));
        let state = Rc::clone(&self.inner);
        *callback.borrow_mut() = Some(Closure::wrap(Box::new(move || {
            tick(&state, token);
        }) as Box<dyn FnMut()>));

        let mut state = self.inner.borrow_mut();
        state.scheduled.insert(
            token,
            ScheduledFrame {
                request_id: 0,
                callback,
            },
        );
        if let Err(err) = state.request_next(token) {
            state.release(token);
            return Err(err);
        }
        Ok(())
    }
}

fn tick(inner: &Rc<RefCell<WebState>>, token: LoopToken) {
    let mut state = inner.borrow_mut();
    if !state.viewer.live_loops().contains(&token) {
        state.release(token);
        return;
    }
    if let Err(err) = state.request_next(token) {
        error!("could not reschedule {token}: {err:?}");
        state.release(token);
        return;
    }
    match state.viewer.run_frame(token) {
        Ok(FrameOutcome::Continue) => {}
        Ok(FrameOutcome::Stopped) => state.release(token),
        Err(err) => error!("{token}: {err}"),
    }
}

thread_local! {
    static DEFAULT_VIEWER: RefCell<Option<ShapeViewer>> = RefCell::new(None);
}

fn default_viewer() -> ShapeViewer {
    DEFAULT_VIEWER.with(|cell| {
        cell.borrow_mut()
            .get_or_insert_with(|| ShapeViewer::new(None))
            .clone()
    })
}

/// Page-level entry point: shows `shape` in `color` in the `#viewer` element.
#[wasm_bindgen(js_name = loadObjectFromAI)]
pub fn load_object_from_ai(shape: &str, color: JsValue) -> Result<(), JsValue> {
    default_viewer().load(shape, color)
}

/// Picks a shape and colour from free text and shows it. Returns a hint when
/// the text was empty.
#[wasm_bindgen(js_name = loadFromDescription)]
pub fn load_from_description(text: &str) -> Result<Option<String>, JsValue> {
    let interpretation = interpret(text);
    info!(
        "`{text}` -> {} 0x{:06x}",
        interpretation.shape, interpretation.color
    );
    default_viewer().load(
        interpretation.shape.tag(),
        JsValue::from_f64(interpretation.color as f64),
    )?;
    Ok(interpretation.hint)
}

fn color_from_js(value: &JsValue) -> ColorInput {
    if let Some(number) = value.as_f64() {
        return ColorInput::from_number(number);
    }
    if let Some(text) = value.as_string() {
        return ColorInput::Style(text);
    }
    let described = js_sys::JSON::stringify(value)
        .ok()
        .and_then(|text| text.as_string())
        .unwrap_or_else(|| format!("{value:?}"));
    ColorInput::Style(described)
}

fn js_error(err: JsValue) -> ViewerError {
    ViewerError::Host(format!("{err:?}"))
}

fn to_js(err: ViewerError) -> JsValue {
    JsValue::from_str(&err.to_string())
}
