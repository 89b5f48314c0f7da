//! Preview for processed uploads: a flat image, or an orbitable 3D mesh framed to fit.
//!
//! A [`loader::Loader`] fetches the payload for the order id in the page address, a
//! [`presenter::Presenter`] turns it into the viewport's active renderable, and
//! [`app::PreviewApp`] draws it every frame.

pub mod app;
pub mod camera;
pub mod config;
pub mod error;
pub mod geometry;
pub mod loader;
pub mod palette;
pub mod payload;
pub mod presenter;
pub mod redraw;
pub mod renderer;
pub mod source;
pub mod viewport;

pub use app::PreviewApp;
pub use config::ViewerConfig;
pub use error::PreviewError;
pub use payload::{MeshPayload, PreviewPayload};

// ── Web entry‑point ──
#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn start() -> Result<(), JsValue> {
    use std::sync::Arc;
    use wasm_bindgen::JsCast as _;

    // Redirect `log` macros & panic messages to the browser console
    eframe::WebLogger::init(log::LevelFilter::Debug).ok();
    console_error_panic_hook::set_once();

    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let location = window.location();

    let mut config = ViewerConfig::load();
    if config.asset_base.is_empty() {
        config.asset_base = location.origin()?;
    }
    let href = location.href()?;
    let model_id = loader::model_id_from_location(&href);
    log::debug!("current URL: {href}, model id: {model_id:?}");

    let canvas = window
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?
        .get_element_by_id(&config.canvas_id)
        .ok_or_else(|| JsValue::from_str(&format!("canvas #{} not found", config.canvas_id)))?
        .dyn_into::<web_sys::HtmlCanvasElement>()?;

    let source = Arc::new(source::HttpSource::new(config.asset_base.clone()));
    let web_options = eframe::WebOptions { depth_buffer: 24, ..Default::default() };

    eframe::WebRunner::new()
        .start(
            canvas,
            web_options,
            Box::new(move |cc| Ok(Box::new(PreviewApp::new(cc, config, source, model_id)))),
        )
        .await?;

    Ok(())
}
