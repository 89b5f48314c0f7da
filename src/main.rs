// ── Native entry‑point ──
// Serves payloads from a directory laid out like the server: `<dir>/get_model_data/<id>` (or
// `<dir>/<id>.json`) and images under `<dir>/static/uploads/`.
#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    use std::sync::Arc;

    use anyhow::Context as _;
    use cad_preview::source::DirectorySource;
    use cad_preview::{PreviewApp, ViewerConfig};

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let dir = args.next().context("usage: cad-preview <data-dir> [model-id]")?;
    let model_id = args.next();

    let source = DirectorySource::new(&dir);
    let mut config = ViewerConfig::load();
    if config.asset_base.is_empty() {
        config.asset_base = source.asset_base();
    }
    log::info!("serving previews from {dir}");

    let options = eframe::NativeOptions { depth_buffer: 24, ..Default::default() };
    eframe::run_native(
        "Model preview",
        options,
        Box::new(move |cc| Ok(Box::new(PreviewApp::new(cc, config, Arc::new(source), model_id)))),
    )
    .map_err(|e| anyhow::anyhow!("viewer exited with an error: {e}"))
}

// The web build starts from `cad_preview::start`.
#[cfg(target_arch = "wasm32")]
fn main() {}
