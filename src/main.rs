#[cfg(not(target_arch = "wasm32"))]
use std::path::PathBuf;

#[cfg(not(target_arch = "wasm32"))]
use anyhow::{Context, Result};
#[cfg(not(target_arch = "wasm32"))]
use clap::Parser;

#[cfg(not(target_arch = "wasm32"))]
use shape_viewer::{app, AnimationPolicy, LoadRequest, RunOptions, ViewerConfig};

/// Spins a box, sphere or cone in a window.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Parser)]
#[command(name = "shape-viewer", version, about)]
struct CliOptions {
    /// Free-text description such as "a red ball".
    description: Option<String>,

    /// Shape tag: box, sphere or cone. Overrides the description.
    #[arg(long)]
    shape: Option<String>,

    /// Colour: 0xRRGGBB, #rgb, #rrggbb, rgb(), hsl() or a CSS name.
    #[arg(long)]
    color: Option<String>,

    /// Refreshes per load when headless, total refreshes when windowed.
    #[arg(long)]
    frames: Option<u64>,

    /// Run without a window and print the final state.
    #[arg(long)]
    headless: bool,

    /// Read one description per line from standard input.
    #[arg(long)]
    stdin: bool,

    /// What a new load does to running loops: restart or stack.
    #[arg(long)]
    policy: Option<AnimationPolicy>,

    /// JSON viewer configuration.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[cfg(not(target_arch = "wasm32"))]
impl CliOptions {
    fn into_run_options(self) -> Result<RunOptions> {
        let mut config = match &self.config {
            Some(path) => ViewerConfig::from_path(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => ViewerConfig::default(),
        };
        if let Some(policy) = self.policy {
            config.animation = policy;
        }

        let explicit =
            self.description.is_some() || self.shape.is_some() || self.color.is_some();
        let requests = if explicit || !self.stdin {
            vec![LoadRequest::resolve(
                self.description.as_deref(),
                self.shape.as_deref(),
                self.color.as_deref(),
            )]
        } else {
            Vec::new()
        };

        Ok(RunOptions {
            config,
            requests,
            frames: self.frames,
            headless: self.headless,
            stdin: self.stdin,
        })
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {}

#[cfg(not(target_arch = "wasm32"))]
fn run() -> Result<()> {
    let options = CliOptions::parse().into_run_options()?;
    app::run(options)
}
