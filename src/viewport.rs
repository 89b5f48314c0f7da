//! Per-viewport state: the drawing surface, its camera, and whatever is currently shown.

use egui::Vec2;

use crate::camera::{Camera, OrbitControl};
use crate::config::ViewerConfig;
use crate::geometry::{Aabb, MeshGeometry, ModelTransform};
use crate::redraw::RedrawLoop;

/// How an image is stretched into its container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFit {
    /// width 100%, height auto: the image is wider than the container.
    FillWidth,
    /// width auto, height 100%.
    FillHeight,
}

impl ImageFit {
    pub fn choose(natural: Vec2, container: Vec2) -> Self {
        let image_aspect = natural.x / natural.y;
        let container_aspect = container.x / container.y;
        if image_aspect > container_aspect {
            Self::FillWidth
        } else {
            Self::FillHeight
        }
    }

    /// On-screen size of an image of `natural` size inside `container`.
    pub fn displayed_size(self, natural: Vec2, container: Vec2) -> Vec2 {
        if natural.x <= 0.0 || natural.y <= 0.0 {
            return Vec2::ZERO;
        }
        match self {
            Self::FillWidth => Vec2::new(container.x, container.x * natural.y / natural.x),
            Self::FillHeight => Vec2::new(container.y * natural.x / natural.y, container.y),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImagePreview {
    pub filename: String,
    /// URI handed to the egui image loaders.
    pub uri: String,
    /// Known once the image size has been reported.
    pub fit: Option<ImageFit>,
    /// Set once the image failed to load; it is not requested again.
    pub error: Option<String>,
}

impl ImagePreview {
    /// Record the image's intrinsic size and pick the fitting axis for `container`.
    pub fn on_size_known(&mut self, natural: Vec2, container: Vec2) -> ImageFit {
        let fit = ImageFit::choose(natural, container);
        self.fit = Some(fit);
        fit
    }

    /// Record a load failure. Returns `false` if one was already recorded.
    pub fn on_load_failed(&mut self, error: impl std::fmt::Display) -> bool {
        if self.error.is_some() {
            return false;
        }
        self.error = Some(error.to_string());
        true
    }
}

#[derive(Debug)]
pub struct MeshPreview {
    pub geometry: MeshGeometry,
    pub transform: ModelTransform,
    /// Bounds after `transform`, measured from the geometry.
    pub bounds: Aabb,
    pub camera_distance: f32,
    pub control: OrbitControl,
    pub redraw: RedrawLoop,
    /// Set until the renderer has taken the buffers.
    pub needs_upload: bool,
}

#[derive(Debug, Default)]
pub enum Renderable {
    #[default]
    Empty,
    Image(ImagePreview),
    Mesh(MeshPreview),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceSize {
    pub width: f32,
    pub height: f32,
}

#[derive(Debug)]
pub struct ViewportState {
    pub surface: SurfaceSize,
    pub camera: Camera,
    pub active: Renderable,
    /// User-facing message shown instead of a preview.
    pub fallback: Option<String>,
}

impl ViewportState {
    pub fn new(config: &ViewerConfig) -> Self {
        Self {
            surface: SurfaceSize { width: 1.0, height: 1.0 },
            camera: Camera::new(config),
            active: Renderable::Empty,
            fallback: None,
        }
    }

    /// Resize the surface and the camera aspect together. Returns `false` when nothing changed.
    pub fn resize(&mut self, width: f32, height: f32) -> bool {
        if width <= 0.0 || height <= 0.0 {
            return false;
        }
        let size = SurfaceSize { width, height };
        if size == self.surface {
            return false;
        }
        self.surface = size;
        self.camera.set_aspect(width, height);
        true
    }

    /// Swap in a new renderable. A mesh being replaced stops its redraw loop on drop.
    pub fn replace(&mut self, next: Renderable) {
        self.active = next;
    }

    pub fn mesh(&self) -> Option<&MeshPreview> {
        match &self.active {
            Renderable::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    pub fn image(&self) -> Option<&ImagePreview> {
        match &self.active {
            Renderable::Image(image) => Some(image),
            _ => None,
        }
    }

    /// Stop drawing. Called on teardown.
    pub fn stop(&mut self) {
        if let Some(mesh) = self.mesh() {
            mesh.redraw.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fits(displayed: Vec2, container: Vec2) -> bool {
        displayed.x <= container.x + 1e-3 && displayed.y <= container.y + 1e-3
    }

    #[test]
    fn wide_image_fills_width() {
        let container = Vec2::new(400.0, 300.0);
        let natural = Vec2::new(1600.0, 400.0);
        let fit = ImageFit::choose(natural, container);
        assert_eq!(fit, ImageFit::FillWidth);
        let shown = fit.displayed_size(natural, container);
        assert_eq!(shown.x, 400.0);
        assert!(fits(shown, container));
    }

    #[test]
    fn tall_image_fills_height() {
        let container = Vec2::new(400.0, 300.0);
        let natural = Vec2::new(200.0, 900.0);
        let fit = ImageFit::choose(natural, container);
        assert_eq!(fit, ImageFit::FillHeight);
        let shown = fit.displayed_size(natural, container);
        assert_eq!(shown.y, 300.0);
        assert!(fits(shown, container));
    }

    #[test]
    fn image_never_overflows() {
        let containers = [Vec2::new(640.0, 480.0), Vec2::new(300.0, 900.0), Vec2::new(500.0, 500.0)];
        for container in containers {
            for w in [1.0, 10.0, 333.0, 640.0, 4000.0] {
                for h in [1.0, 7.0, 480.0, 999.0, 3000.0] {
                    let natural = Vec2::new(w, h);
                    let shown = ImageFit::choose(natural, container).displayed_size(natural, container);
                    assert!(fits(shown, container), "{natural:?} in {container:?} -> {shown:?}");
                    let fills_one = (shown.x - container.x).abs() < 1e-3
                        || (shown.y - container.y).abs() < 1e-3;
                    assert!(fills_one);
                }
            }
        }
    }

    #[test]
    fn equal_aspect_fills_height() {
        let fit = ImageFit::choose(Vec2::new(800.0, 600.0), Vec2::new(400.0, 300.0));
        assert_eq!(fit, ImageFit::FillHeight);
    }

    #[test]
    fn image_failure_is_recorded_once() {
        let mut image = ImagePreview {
            filename: "gone.png".into(),
            uri: "/static/uploads/gone.png".into(),
            fit: None,
            error: None,
        };
        assert!(image.on_load_failed("404"));
        assert!(!image.on_load_failed("404"));
        assert_eq!(image.error.as_deref(), Some("404"));
    }

    #[test]
    fn resize_is_idempotent() {
        let mut viewport = ViewportState::new(&ViewerConfig::default());
        assert!(viewport.resize(1024.0, 512.0));
        let aspect = viewport.camera.aspect;
        let surface = viewport.surface;

        assert!(!viewport.resize(1024.0, 512.0));
        assert_eq!(viewport.camera.aspect, aspect);
        assert_eq!(viewport.surface, surface);
        assert_eq!(aspect, 2.0);
    }

    #[test]
    fn degenerate_resize_is_ignored() {
        let mut viewport = ViewportState::new(&ViewerConfig::default());
        viewport.resize(640.0, 480.0);
        assert!(!viewport.resize(640.0, 0.0));
        assert_eq!(viewport.surface, SurfaceSize { width: 640.0, height: 480.0 });
    }
}
