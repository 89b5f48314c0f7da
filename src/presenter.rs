//! Turns a classified payload into what the viewport shows.

use crate::camera::{self, OrbitControl};
use crate::config::ViewerConfig;
use crate::error::PreviewError;
use crate::geometry::{MeshGeometry, ModelTransform};
use crate::payload::{MeshPayload, PreviewPayload};
use crate::redraw::RedrawLoop;
use crate::viewport::{ImagePreview, MeshPreview, Renderable, ViewportState};

pub struct Presenter {
    config: ViewerConfig,
}

impl Presenter {
    pub fn new(config: ViewerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn present(&self, viewport: &mut ViewportState, payload: PreviewPayload) {
        match payload {
            PreviewPayload::Image { filename } => {
                log::debug!("displaying 2D image {filename}");
                self.show_image(viewport, &filename);
            }
            PreviewPayload::Mesh(mesh) => {
                log::debug!(
                    "displaying 3D model: {} vertices, {} faces",
                    mesh.vertices.len(),
                    mesh.faces.len()
                );
                self.show_mesh(viewport, &mesh);
            }
        }
    }

    /// Hide the mesh surface and show the uploaded image. Sizing waits for the image
    /// dimensions, see [`ImagePreview::on_size_known`].
    pub fn show_image(&self, viewport: &mut ViewportState, filename: &str) {
        viewport.fallback = None;
        viewport.replace(Renderable::Image(ImagePreview {
            filename: filename.to_owned(),
            uri: upload_uri(&self.config.asset_base, filename),
            fit: None,
            error: None,
        }));
    }

    /// Build, centre, scale and frame `mesh`. Failures become the fallback message and leave
    /// the viewport empty.
    pub fn show_mesh(&self, viewport: &mut ViewportState, mesh: &MeshPayload) {
        match self.build_mesh(viewport, mesh) {
            Ok(preview) => {
                log::info!(
                    "model framed: scale {:.4}, camera distance {:.3}",
                    preview.transform.scale,
                    preview.camera_distance
                );
                viewport.fallback = None;
                viewport.replace(Renderable::Mesh(preview));
            }
            Err(e) => self.show_render_failure(viewport, &e),
        }
    }

    /// Drop whatever is shown, which stops a mesh's redraw loop, and explain why.
    pub fn show_render_failure(&self, viewport: &mut ViewportState, error: &PreviewError) {
        log::error!("{error}");
        viewport.replace(Renderable::Empty);
        viewport.fallback = Some(format!("Error displaying 3D model: {error}"));
    }

    /// Apply a renderer failure to a freshly presented mesh.
    ///
    /// The GL program is built once per app, so after it fails every later mesh must be turned
    /// away too. Returns `true` when a mesh was removed.
    pub fn reject_mesh(
        &self,
        viewport: &mut ViewportState,
        renderer_error: Option<&PreviewError>,
    ) -> bool {
        match renderer_error {
            Some(error) if viewport.mesh().is_some() => {
                self.show_render_failure(viewport, error);
                true
            }
            _ => false,
        }
    }

    pub fn build_mesh(
        &self,
        viewport: &mut ViewportState,
        mesh: &MeshPayload,
    ) -> Result<MeshPreview, PreviewError> {
        let geometry = MeshGeometry::build(mesh)?;
        let transform = ModelTransform::fit(mesh.center, mesh.size, self.config.reference_length)?;

        let bounds = geometry
            .bounds_after(&transform)
            .ok_or_else(|| PreviewError::render("mesh has no vertices"))?;
        let max_dim = bounds.max_dim();
        if !max_dim.is_finite() || max_dim <= 0.0 {
            return Err(PreviewError::render("rendered bounding box has zero size"));
        }

        let camera_distance =
            camera::frame_bounds(&mut viewport.camera, &bounds, self.config.framing_padding);
        let control = OrbitControl::from_camera(&viewport.camera, &self.config);

        Ok(MeshPreview {
            geometry,
            transform,
            bounds,
            camera_distance,
            control,
            redraw: RedrawLoop::start(),
            needs_upload: true,
        })
    }

    /// Surface a failed load. The current renderable is left alone.
    pub fn show_load_failure(&self, viewport: &mut ViewportState, id: &str, error: &PreviewError) {
        log::error!("error loading model {id}: {error}");
        viewport.fallback = Some(format!("Error loading model: {error}. File name: {id}"));
    }
}

/// `{base}/static/uploads/{filename}`, with `filename` percent-encoded as one path segment.
pub fn upload_uri(base: &str, filename: &str) -> String {
    format!(
        "{}/static/uploads/{}",
        base.trim_end_matches('/'),
        encode_segment(filename.trim_start_matches('/'))
    )
}

fn encode_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}
