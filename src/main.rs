use std::any::Any;
use std::env;
use std::fmt;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use log::info;
use pollster::block_on;
use winit::dpi::LogicalSize;
use winit::event_loop::EventLoop;
use winit::window::Window;

use keycap_viewer::{
    load_model, AssetSource, Model, Renderer, Viewer, ViewerApp, ViewerConfig, Viewport,
};

const USAGE: &str = "Usage: keycap-viewer [model.glb] [--config <viewer.xml>] [--summary-only]";

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

fn run() -> Result<()> {
    let options = CliOptions::parse(env::args().skip(1))?;
    let config = match &options.config {
        Some(path) => {
            let xml = fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            ViewerConfig::from_xml(&xml)
                .with_context(|| format!("failed to parse config {}", path.display()))?
        }
        None => ViewerConfig::default(),
    };

    let path = options
        .model
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.model.path));
    let model = block_on(load_model(&AssetSource::Path(path.clone())))
        .with_context(|| format!("failed to load model {}", path.display()))?;

    if options.summary_only {
        return print_summary(config, model);
    }

    let fallback = (config.clone(), model.clone());
    match run_interactive(config, model) {
        Ok(()) => Ok(()),
        Err(err) if err.downcast_ref::<WindowInitError>().is_some() => {
            eprintln!(
                "{err}. Falling back to --summary-only mode (set DISPLAY or install X11 libs to enable rendering)."
            );
            let (config, model) = fallback;
            print_summary(config, model)
        }
        Err(err) => Err(err),
    }
}

fn print_summary(config: ViewerConfig, model: Model) -> Result<()> {
    let viewer = Viewer::new(config, model, Viewport::new(1280, 720));
    for line in viewer.summary() {
        println!("{line}");
    }
    Ok(())
}

fn run_interactive(config: ViewerConfig, model: Model) -> Result<()> {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(|_| {}));
    let event_loop = panic::catch_unwind(AssertUnwindSafe(EventLoop::new));
    panic::set_hook(default_hook);
    let event_loop = event_loop
        .map_err(|panic| WindowInitError::from_panic("event loop", panic))?
        .map_err(|err| WindowInitError::from_error("event loop", err))?;

    #[allow(deprecated)]
    let window = Arc::new(
        event_loop
            .create_window(
                Window::default_attributes()
                    .with_title("Keycap Viewer")
                    .with_inner_size(LogicalSize::new(1280.0, 720.0)),
            )
            .map_err(|err| WindowInitError::from_error("window", err))?,
    );

    let size = window.inner_size();
    let viewer = Viewer::new(config, model, Viewport::new(size.width, size.height));
    let renderer = block_on(Renderer::new(Arc::clone(&window), viewer.meshes()))?;
    for line in viewer.summary() {
        info!("{line}");
    }

    let mut app = ViewerApp::new(renderer, viewer);
    let started = Instant::now();

    #[allow(deprecated)]
    event_loop
        .run(|event, elwt| {
            let now = started.elapsed().as_secs_f64();
            if let Err(err) = app.process_event(&event, elwt, now) {
                app.last_error = Some(err);
                elwt.exit();
            }
        })
        .context("event loop terminated abnormally")?;

    match app.last_error {
        Some(err) => Err(err),
        None => Ok(()),
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

#[derive(Debug, Default, PartialEq)]
struct CliOptions {
    model: Option<PathBuf>,
    config: Option<PathBuf>,
    summary_only: bool,
}

impl CliOptions {
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut options = Self::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--summary-only" => options.summary_only = true,
                "--config" => {
                    let path = args
                        .next()
                        .ok_or_else(|| anyhow!("--config needs a file. {USAGE}"))?;
                    options.config = Some(PathBuf::from(path));
                }
                "-h" | "--help" => return Err(anyhow!(USAGE)),
                other if other.starts_with('-') => {
                    return Err(anyhow!(
                        "Unknown argument: {other}. Expected --config or --summary-only"
                    ));
                }
                other => {
                    if options.model.is_some() {
                        return Err(anyhow!("Only one model can be viewed at a time. {USAGE}"));
                    }
                    options.model = Some(PathBuf::from(other));
                }
            }
        }
        Ok(options)
    }
}
