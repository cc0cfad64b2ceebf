use std::any::Any;
use std::fmt;
use std::io::{BufRead, Write};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use log::{debug, info, warn};
use pollster::block_on;
use winit::dpi::LogicalSize;
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop, EventLoopBuilder, EventLoopWindowTarget};
use winit::window::{Window, WindowBuilder};

use crate::color::ColorInput;
use crate::config::ViewerConfig;
use crate::error::ViewerError;
use crate::intent::interpret;
use crate::render::{HeadlessHost, Renderer};
use crate::viewer::{Attachment, Host, Viewer};

/// Refreshes run after each load in headless mode unless `--frames` says
/// otherwise.
pub const DEFAULT_HEADLESS_FRAMES: u64 = 60;

const HEADLESS_VIEWPORT: (u32, u32) = (800, 600);
const WINDOW_TITLE: &str = "Shape Viewer";

/// One object to display, as requested on the command line or stdin.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadRequest {
    pub shape: String,
    pub color: ColorInput,
    /// Feedback for the user when the request came from an empty description.
    pub hint: Option<String>,
}

impl LoadRequest {
    pub fn new(shape: impl Into<String>, color: impl Into<ColorInput>) -> Self {
        Self {
            shape: shape.into(),
            color: color.into(),
            hint: None,
        }
    }

    pub fn from_description(text: &str) -> Self {
        let interpretation = interpret(text);
        Self {
            shape: interpretation.shape.tag().to_string(),
            color: ColorInput::Hex(interpretation.color),
            hint: interpretation.hint,
        }
    }

    /// Combines a description with explicit overrides. Explicit values win;
    /// a missing description only produces a hint when nothing else was
    /// given.
    pub fn resolve(description: Option<&str>, shape: Option<&str>, color: Option<&str>) -> Self {
        let mut request = Self::from_description(description.unwrap_or_default());
        if description.is_none() && (shape.is_some() || color.is_some()) {
            request.hint = None;
        }
        if let Some(shape) = shape {
            request.shape = shape.to_string();
        }
        if let Some(color) = color {
            request.color = ColorInput::Style(color.to_string());
        }
        request
    }
}

/// What the native front end should do.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub config: ViewerConfig,
    pub requests: Vec<LoadRequest>,
    /// Display refreshes: per load when headless, in total when windowed.
    pub frames: Option<u64>,
    pub headless: bool,
    /// Read further descriptions from standard input, one per line.
    pub stdin: bool,
}

/// Runs the viewer in a window, or headless when asked to or when no window
/// can be opened.
pub fn run(options: RunOptions) -> Result<()> {
    let stdout = std::io::stdout();
    if options.headless {
        return run_headless(&options, std::io::stdin().lock(), stdout.lock());
    }
    match run_interactive(&options) {
        Ok(()) => Ok(()),
        Err(err) => {
            if err.downcast_ref::<WindowInitError>().is_some() {
                eprintln!("{err}. Falling back to --headless mode.");
                run_headless(&options, std::io::stdin().lock(), stdout.lock())
            } else {
                Err(err)
            }
        }
    }
}

/// Drives the viewer without a display and writes the final state to `out`.
pub fn run_headless(options: &RunOptions, input: impl BufRead, mut out: impl Write) -> Result<()> {
    let frames = options.frames.unwrap_or(DEFAULT_HEADLESS_FRAMES);
    let host = HeadlessHost::new(HEADLESS_VIEWPORT);
    let mut viewer = Viewer::new(options.config.clone(), host);

    for request in &options.requests {
        load_and_refresh(&mut viewer, request, frames, &mut out)?;
    }
    if options.stdin {
        for line in input.lines() {
            let line = line.context("failed to read standard input")?;
            if line.trim().is_empty() {
                continue;
            }
            let request = LoadRequest::from_description(&line);
            load_and_refresh(&mut viewer, &request, frames, &mut out)?;
        }
    }

    print_final_state(&viewer, &mut out)
}

fn load_and_refresh<H: Host>(
    viewer: &mut Viewer<H>,
    request: &LoadRequest,
    frames: u64,
    out: &mut impl Write,
) -> Result<()> {
    if let Some(hint) = &request.hint {
        writeln!(out, "hint: {hint}")?;
    }
    let outcome = viewer.load(&request.shape, request.color.clone())?;
    writeln!(out, "Loaded {} {} ({})", outcome.shape, outcome.color, outcome.token)?;
    for _ in 0..frames {
        viewer.refresh()?;
    }
    Ok(())
}

/// Writes the displayed object, its transform and the loop bookkeeping.
pub fn print_final_state<H: Host>(viewer: &Viewer<H>, out: &mut impl Write) -> Result<()> {
    writeln!(out, "Final state:")?;
    match viewer.displayed() {
        Some(mesh) => {
            let center = mesh
                .geometry
                .bounding_box()
                .map(|bounds| bounds.center())
                .unwrap_or_default();
            writeln!(
                out,
                " - {} {} center=({:.2}, {:.2}, {:.2}) rotation=(x={:.4}, y={:.4})",
                mesh.shape,
                mesh.material.color,
                center.x,
                center.y,
                center.z,
                mesh.rotation.x,
                mesh.rotation.y
            )?;
        }
        None => writeln!(out, " - nothing displayed")?,
    }
    writeln!(
        out,
        "frames={} live_loops={}",
        viewer.frames_rendered(),
        viewer.live_loops().len()
    )?;
    Ok(())
}

/// Attaches a wgpu renderer to an already created window.
pub struct WindowHost {
    window: Arc<Window>,
}

impl WindowHost {
    pub fn new(window: Arc<Window>) -> Self {
        Self { window }
    }
}

impl Host for WindowHost {
    type Renderer = Renderer;

    fn attach(&mut self, mount_id: &str) -> Result<Attachment<Renderer>, ViewerError> {
        debug!("attaching renderer to window for `{mount_id}`");
        let size = self.window.inner_size();
        let renderer =
            block_on(Renderer::new(Arc::clone(&self.window))).map_err(ViewerError::Backend)?;
        Ok(Attachment {
            renderer,
            viewport: (size.width, size.height),
        })
    }
}

#[derive(Debug)]
enum UserEvent {
    Load(LoadRequest),
    InputClosed,
}

fn run_interactive(options: &RunOptions) -> Result<()> {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(|_| {}));
    let event_loop = panic::catch_unwind(AssertUnwindSafe(|| {
        EventLoopBuilder::<UserEvent>::with_user_event().build()
    }));
    panic::set_hook(default_hook);
    let event_loop: EventLoop<UserEvent> = event_loop
        .map_err(|panic| WindowInitError::from_panic("event loop", panic))?
        .map_err(|err| WindowInitError::from_error("event loop", err))?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(WINDOW_TITLE)
            .with_inner_size(LogicalSize::new(800.0, 600.0))
            .build(&event_loop)
            .map_err(|err| WindowInitError::from_error("window", err))?,
    );

    let mut viewer = Viewer::new(options.config.clone(), WindowHost::new(Arc::clone(&window)));
    viewer.init()?;
    for request in &options.requests {
        if let Some(hint) = &request.hint {
            println!("hint: {hint}");
        }
        viewer.load(&request.shape, request.color.clone())?;
    }

    if options.stdin {
        let proxy = event_loop.create_proxy();
        thread::spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                let request = LoadRequest::from_description(&line);
                if proxy.send_event(UserEvent::Load(request)).is_err() {
                    return;
                }
            }
            proxy.send_event(UserEvent::InputClosed).ok();
        });
    }

    let mut app = AppState {
        window,
        viewer,
        frame_limit: options.frames,
        refreshes: 0,
        last_error: None,
    };

    event_loop
        .run(|event, elwt| {
            elwt.set_control_flow(ControlFlow::Poll);
            if let Err(err) = app.process_event(event, elwt) {
                app.last_error = Some(err);
                elwt.exit();
            }
        })
        .context("event loop terminated abnormally")?;

    print_final_state(&app.viewer, &mut std::io::stdout().lock())?;

    if let Some(err) = app.last_error {
        return Err(err);
    }
    Ok(())
}

struct AppState {
    window: Arc<Window>,
    viewer: Viewer<WindowHost>,
    frame_limit: Option<u64>,
    refreshes: u64,
    last_error: Option<anyhow::Error>,
}

impl AppState {
    fn process_event(
        &mut self,
        event: Event<UserEvent>,
        elwt: &EventLoopWindowTarget<UserEvent>,
    ) -> Result<()> {
        match event {
            Event::WindowEvent { event, window_id } if window_id == self.window.id() => {
                match event {
                    WindowEvent::CloseRequested => elwt.exit(),
                    WindowEvent::Resized(size) => {
                        if let Some(renderer) = self.viewer.renderer_mut() {
                            renderer.resize(size);
                        }
                    }
                    WindowEvent::RedrawRequested => {
                        self.viewer.refresh()?;
                        self.refreshes += 1;
                        if self
                            .frame_limit
                            .is_some_and(|limit| self.refreshes >= limit)
                        {
                            info!("rendered {} refresh(es); exiting", self.refreshes);
                            elwt.exit();
                        }
                    }
                    _ => {}
                }
            }
            Event::UserEvent(UserEvent::Load(request)) => {
                if let Some(hint) = &request.hint {
                    warn!("{hint}");
                }
                self.viewer.load(&request.shape, request.color)?;
            }
            Event::UserEvent(UserEvent::InputClosed) => {
                debug!("standard input closed");
            }
            Event::AboutToWait => {
                self.window.request_redraw();
            }
            _ => {}
        }
        Ok(())
    }
}

#[derive(Debug)]
struct WindowInitError {
    message: String,
}

impl WindowInitError {
    fn from_panic(stage: &str, panic: Box<dyn Any + Send>) -> Self {
        Self {
            message: format!("failed to initialize {stage}: {}", panic_message(panic)),
        }
    }

    fn from_error(stage: &str, err: impl fmt::Display) -> Self {
        Self {
            message: format!("failed to initialize {stage}: {err}"),
        }
    }
}

impl fmt::Display for WindowInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for WindowInitError {}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    match panic.downcast::<String>() {
        Ok(msg) => *msg,
        Err(panic) => match panic.downcast::<&'static str>() {
            Ok(msg) => (*msg).to_string(),
            Err(_) => "unknown panic".into(),
        },
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::animation::AnimationPolicy;

    fn options(requests: Vec<LoadRequest>, frames: u64) -> RunOptions {
        RunOptions {
            config: ViewerConfig::default(),
            requests,
            frames: Some(frames),
            headless: true,
            stdin: false,
        }
    }

    fn run_to_string(options: &RunOptions, input: &str) -> String {
        let mut out = Vec::new();
        run_headless(options, Cursor::new(input.to_string()), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn explicit_flags_override_description() {
        let request = LoadRequest::resolve(Some("a red ball"), Some("cone"), None);
        assert_eq!(request.shape, "cone");
        assert_eq!(request.color, ColorInput::Hex(0xff0000));
        assert!(request.hint.is_none());

        let request = LoadRequest::resolve(None, None, Some("#0000ff"));
        assert_eq!(request.shape, "box");
        assert_eq!(request.color, ColorInput::Style("#0000ff".into()));
        assert!(request.hint.is_none());
    }

    #[test]
    fn nothing_requested_yields_hint() {
        let request = LoadRequest::resolve(None, None, None);
        assert_eq!(request.shape, "box");
        assert_eq!(request.color, ColorInput::Hex(0x00ff00));
        assert!(request.hint.is_some());
    }

    #[test]
    fn headless_run_reports_final_rotation() {
        let output = run_to_string(
            &options(vec![LoadRequest::new("sphere", 0xff0000)], 10),
            "",
        );
        assert!(output.contains("Loaded sphere #ff0000"));
        assert!(output.contains(
            " - sphere #ff0000 center=(0.00, 0.00, 0.00) rotation=(x=0.0500, y=0.1000)"
        ));
        assert!(output.contains("frames=10 live_loops=1"));
    }

    #[test]
    fn stdin_lines_replace_the_object() {
        let mut options = options(vec![], 4);
        options.stdin = true;
        let output = run_to_string(&options, "a blue cone\n\na yellow ball\n");
        assert!(output.contains("Loaded cone #0000ff"));
        assert!(output.contains(" - sphere #ffff00"));
        assert!(output.contains("frames=8 live_loops=1"));
    }

    #[test]
    fn stacked_loops_spin_faster() {
        let mut options = options(
            vec![
                LoadRequest::new("box", "blue"),
                LoadRequest::new("cone", "green"),
            ],
            2,
        );
        options.config.animation = AnimationPolicy::Stack;
        let output = run_to_string(&options, "");
        // The cone sees two refreshes, each running both live loops.
        assert!(output.contains(" - cone #008000"));
        assert!(output.contains("rotation=(x=0.0200, y=0.0400)"));
        assert!(output.contains("live_loops=2"));
    }
}
