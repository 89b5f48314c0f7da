use std::sync::Arc;

use cad_preview::loader::Loader;
use cad_preview::presenter::Presenter;
use cad_preview::source::StaticSource;
use cad_preview::viewport::{Renderable, ViewportState};
use cad_preview::{MeshPayload, PreviewError, ViewerConfig};
use futures::executor::block_on;

const TRIANGLE: &str = r#"{
    "vertices": [[0,0,0],[1,0,0],[0,1,0]],
    "faces": [[0,1,2]],
    "surface_types": ["planar"],
    "center": [0.33, 0.33, 0],
    "size": [1, 1, 0]
}"#;

struct Harness {
    loader: Loader,
    presenter: Presenter,
    viewport: ViewportState,
}

impl Harness {
    fn new(source: StaticSource) -> Self {
        let config = ViewerConfig::default();
        Self {
            loader: Loader::new(Arc::new(source)),
            viewport: ViewportState::new(&config),
            presenter: Presenter::new(config),
        }
    }

    /// Run one load to completion and hand its outcome to the presenter.
    fn load(&mut self, id: &str) {
        block_on(self.loader.task(id));
        let outcome = self.loader.slot().take().expect("load finished");
        match outcome.result {
            Ok(payload) => self.presenter.present(&mut self.viewport, payload),
            Err(e) => self.presenter.show_load_failure(&mut self.viewport, &outcome.id, &e),
        }
    }
}

#[test]
fn image_payload_shows_image_without_mesh() {
    let mut h = Harness::new(StaticSource::new().with_body("5", r#"{"type": "image", "filename": "part.png"}"#));
    h.load("5");

    assert!(!h.loader.is_loading());
    let image = h.viewport.image().expect("image shown");
    assert_eq!(image.filename, "part.png");
    assert!(image.uri.ends_with("/static/uploads/part.png"));
    assert!(h.viewport.mesh().is_none());
    assert!(h.viewport.fallback.is_none());
}

#[test]
fn triangle_payload_is_centred_scaled_and_framed() {
    let mut h = Harness::new(StaticSource::new().with_body("7", TRIANGLE));
    h.load("7");

    let mesh = h.viewport.mesh().expect("mesh shown");
    assert_eq!(mesh.geometry.groups.len(), 1);
    assert_eq!(mesh.geometry.groups[0].label, "planar");
    assert_eq!(mesh.transform.scale, 5.0);
    assert!((mesh.transform.translation.x + 0.33).abs() < 1e-6);
    assert!((mesh.transform.translation.y + 0.33).abs() < 1e-6);
    assert_eq!(mesh.transform.translation.z, 0.0);
    assert!(mesh.camera_distance > 0.0);
    assert!(mesh.redraw.is_running());
}

#[test]
fn server_error_hides_indicator_and_reports_status() {
    let mut h = Harness::new(
        StaticSource::new()
            .with_body("1", r#"{"filename": "before.png"}"#)
            .with_error("2", PreviewError::http_status(500, "")),
    );
    h.load("1");
    h.load("2");

    assert!(!h.loader.is_loading());
    let message = h.viewport.fallback.as_deref().expect("fallback shown");
    assert!(message.contains("500"), "{message}");
    // No swap happened: the earlier image is still the active renderable.
    assert_eq!(h.viewport.image().map(|i| i.filename.as_str()), Some("before.png"));
}

#[test]
fn malformed_body_becomes_fallback() {
    let mut h = Harness::new(StaticSource::new().with_body("3", r#"{"status": "processing"}"#));
    h.load("3");

    assert!(matches!(h.viewport.active, Renderable::Empty));
    let message = h.viewport.fallback.as_deref().expect("fallback shown");
    assert!(message.contains("invalid model data"));
    assert!(message.contains("File name: 3"));
}

#[test]
fn mesh_replaces_image_and_image_replaces_mesh() {
    let mut h = Harness::new(
        StaticSource::new()
            .with_body("img", r#"{"filename": "a.png"}"#)
            .with_body("mesh", TRIANGLE),
    );
    h.load("img");
    h.load("mesh");
    assert!(h.viewport.image().is_none());
    let token = h.viewport.mesh().expect("mesh shown").redraw.token();

    h.load("img");
    assert!(h.viewport.mesh().is_none());
    assert!(token.is_cancelled());
}

#[test]
fn any_positive_size_frames_successfully() {
    let sizes = [[1.0, 1.0, 1.0], [0.001, 0.002, 0.0], [250.0, 10.0, 3.0], [1e4, 1e4, 1e4]];
    let config = ViewerConfig::default();
    let presenter = Presenter::new(config.clone());
    for size in sizes {
        let mut viewport = ViewportState::new(&config);
        let [w, h, d] = size;
        let mesh = MeshPayload {
            vertices: vec![[0.0, 0.0, 0.0], [w, 0.0, 0.0], [0.0, h, 0.0], [0.0, 0.0, d]],
            faces: vec![[0, 1, 2], [0, 2, 3], [0, 3, 1], [1, 3, 2]],
            surface_types: vec!["planar".into(), "conical".into()],
            center: [w / 2.0, h / 2.0, d / 2.0],
            size,
        };
        let preview = presenter.build_mesh(&mut viewport, &mesh).expect("mesh builds");
        assert!(preview.camera_distance > 0.0, "{size:?}");
        assert!((preview.bounds.max_dim() - config.reference_length).abs() < 1e-3, "{size:?}");
    }
}

#[test]
fn resize_twice_is_stable() {
    let config = ViewerConfig::default();
    let mut viewport = ViewportState::new(&config);
    viewport.resize(1280.0, 720.0);
    let (aspect, surface) = (viewport.camera.aspect, viewport.surface);
    viewport.resize(1280.0, 720.0);
    assert_eq!(viewport.camera.aspect, aspect);
    assert_eq!(viewport.surface, surface);
}
