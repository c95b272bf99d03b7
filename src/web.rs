#![cfg(target_arch = "wasm32")]

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{HtmlCanvasElement, Request, RequestInit, RequestMode, Response};
use winit::dpi::PhysicalSize;
use winit::event_loop::EventLoop;
use winit::platform::web::{EventLoopExtWebSys, WindowAttributesExtWebSys};
use winit::window::Window;

use crate::asset::{load_model, AssetSource};
use crate::error::LoadError;
use crate::{Renderer, Viewer, ViewerApp, ViewerConfig, Viewport};

#[wasm_bindgen(start)]
pub fn bootstrap() {
    console_error_panic_hook::set_once();
    let _ = wasm_logger::init(wasm_logger::Config::default());
}

/// Loads the model at `asset_url` and starts rendering into the canvas.
/// Failures are written into the page as well as returned.
#[wasm_bindgen]
pub async fn run(canvas_id: String, asset_url: String) -> Result<(), JsValue> {
    match start(&canvas_id, &asset_url).await {
        Ok(()) => Ok(()),
        Err(err) => {
            let message = format!("{err:#}");
            log::error!("{message}");
            show_error(&message);
            Err(JsValue::from_str(&message))
        }
    }
}

async fn start(canvas_id: &str, asset_url: &str) -> Result<()> {
    let model = load_model(&AssetSource::Url(asset_url.to_string()))
        .await
        .with_context(|| format!("failed to load model {asset_url}"))?;

    let window = web_sys::window().ok_or_else(|| anyhow!("missing window"))?;
    let document = window
        .document()
        .ok_or_else(|| anyhow!("missing document"))?;
    let performance = window
        .performance()
        .ok_or_else(|| anyhow!("performance timer unavailable"))?;
    let canvas: HtmlCanvasElement = document
        .get_element_by_id(canvas_id)
        .ok_or_else(|| anyhow!("canvas element {canvas_id:?} not found"))?
        .dyn_into()
        .map_err(|_| anyhow!("element {canvas_id:?} is not a canvas"))?;

    let size = PhysicalSize::new(
        canvas.client_width().max(1) as u32,
        canvas.client_height().max(1) as u32,
    );
    let event_loop = EventLoop::new().context("failed to create event loop")?;
    #[allow(deprecated)]
    let window = Arc::new(
        event_loop
            .create_window(
                Window::default_attributes()
                    .with_canvas(Some(canvas))
                    .with_title("Keycap Viewer")
                    .with_inner_size(size),
            )
            .context("failed to create window")?,
    );

    let size = window.inner_size();
    let viewer = Viewer::new(
        ViewerConfig::default(),
        model,
        Viewport::new(size.width, size.height),
    );
    let renderer = Renderer::new(Arc::clone(&window), viewer.meshes())
        .await
        .context("failed to initialize renderer")?;
    for line in viewer.summary() {
        log::info!("{line}");
    }

    let mut app = ViewerApp::new(renderer, viewer);
    #[allow(deprecated)]
    event_loop.spawn(move |event, elwt| {
        let now = performance.now() / 1000.0;
        if let Err(err) = app.process_event(&event, elwt, now) {
            log::error!("{err:#}");
            show_error(&format!("{err:#}"));
            elwt.exit();
        }
    });

    Ok(())
}

/// Downloads `url` into memory.
pub(crate) async fn fetch_bytes(url: &str) -> Result<Vec<u8>, LoadError> {
    let fail = |reason: String| LoadError::Fetch {
        url: url.to_string(),
        reason,
    };
    let window = web_sys::window().ok_or_else(|| fail("missing window".to_string()))?;

    let init = RequestInit::new();
    init.set_method("GET");
    init.set_mode(RequestMode::Cors);
    let request =
        Request::new_with_str_and_init(url, &init).map_err(|err| fail(format!("{err:?}")))?;

    let response = JsFuture::from(window.fetch_with_request(&request))
        .await
        .map_err(|err| fail(format!("{err:?}")))?;
    let response: Response = response
        .dyn_into()
        .map_err(|_| fail("unexpected fetch result".to_string()))?;
    if !response.ok() {
        return Err(fail(format!(
            "HTTP {} {}",
            response.status(),
            response.status_text()
        )));
    }

    let buffer = response
        .array_buffer()
        .map_err(|err| fail(format!("{err:?}")))?;
    let buffer = JsFuture::from(buffer)
        .await
        .map_err(|err| fail(format!("{err:?}")))?;
    Ok(js_sys::Uint8Array::new(&buffer).to_vec())
}

/// Appends a visible error box to the page body.
fn show_error(message: &str) {
    let Some(document) = web_sys::window().and_then(|window| window.document()) else {
        return;
    };
    let (Some(body), Ok(element)) = (document.body(), document.create_element("pre")) else {
        return;
    };
    element.set_class_name("keycap-viewer-error");
    element.set_text_content(Some(&format!("Keycap viewer failed to start:\n{message}")));
    let _ = body.append_child(&element);
}
