use std::sync::Arc;
use std::time::Duration;

use eframe::egui;

use crate::camera::{self, OrbitControl};
use crate::config::ViewerConfig;
use crate::error::PreviewError;
use crate::loader::Loader;
use crate::presenter::Presenter;
use crate::renderer::GpuMesh;
use crate::source::PayloadSource;
use crate::viewport::{Renderable, ViewportState};

pub struct PreviewApp {
    presenter: Presenter,
    loader: Loader,
    viewport: ViewportState,
    model_id: Option<String>,
    gpu: Option<Arc<GpuMesh>>,
    /// GL program creation failed; not retried, and every mesh shown afterwards is turned away.
    gpu_error: Option<PreviewError>,
    show_info: bool,
}

impl PreviewApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        config: ViewerConfig,
        source: Arc<dyn PayloadSource>,
        model_id: Option<String>,
    ) -> Self {
        egui_extras::install_image_loaders(&cc.egui_ctx);

        let mut app = Self {
            viewport: ViewportState::new(&config),
            presenter: Presenter::new(config),
            loader: Loader::new(source),
            model_id,
            gpu: None,
            gpu_error: None,
            show_info: true,
        };
        app.reload();
        app
    }

    fn reload(&mut self) {
        self.viewport.fallback = None;
        match &self.model_id {
            Some(id) => self.loader.load(id),
            None => {
                log::error!("no model id in the page address");
                self.viewport.fallback = Some("No model selected.".to_owned());
            }
        }
    }

    /// Hand a finished load to the presenter.
    fn poll_loader(&mut self) {
        let Some(outcome) = self.loader.slot().take() else {
            return;
        };
        match outcome.result {
            Ok(payload) => self.presenter.present(&mut self.viewport, payload),
            Err(e) => self.presenter.show_load_failure(&mut self.viewport, &outcome.id, &e),
        }
    }

    /// Put the camera back where the model was first framed.
    fn fit_view(&mut self) {
        let config = self.presenter.config();
        let Renderable::Mesh(mesh) = &mut self.viewport.active else {
            return;
        };
        mesh.camera_distance =
            camera::frame_bounds(&mut self.viewport.camera, &mesh.bounds, config.framing_padding);
        mesh.control = OrbitControl::from_camera(&self.viewport.camera, config);
    }

    /// Build the GL program the first time a mesh needs it. After a failure every mesh is
    /// rejected with the same error instead of leaving a blank canvas.
    fn prepare_gpu(&mut self, frame: &eframe::Frame) {
        if self.viewport.mesh().is_none() {
            return;
        }
        if self.gpu.is_none() && self.gpu_error.is_none() {
            if let Some(gl) = frame.gl() {
                match unsafe { GpuMesh::new(gl) } {
                    Ok(gpu) => self.gpu = Some(Arc::new(gpu)),
                    Err(e) => self.gpu_error = Some(e),
                }
            }
        }
        self.presenter.reject_mesh(&mut self.viewport, self.gpu_error.as_ref());
    }

    fn top_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("Model preview");
                if let Some(id) = &self.model_id {
                    ui.label(format!("#{id}"));
                }
                ui.separator();
                if ui
                    .add_enabled(!self.loader.is_loading(), egui::Button::new("Reload"))
                    .clicked()
                {
                    self.reload();
                }
                if self.viewport.mesh().is_some() {
                    if ui.button("Fit view").clicked() {
                        self.fit_view();
                    }
                    ui.toggle_value(&mut self.show_info, "Info");
                }
            });
        });
    }

    fn info_panel(&self, ctx: &egui::Context) {
        let Some(mesh) = self.viewport.mesh() else {
            return;
        };
        if !self.show_info {
            return;
        }
        egui::SidePanel::right("model_info")
            .resizable(false)
            .min_width(160.0)
            .show(ctx, |ui| {
                ui.heading("Model");
                ui.label(format!("Vertices: {}", mesh.geometry.vertex_count()));
                ui.label(format!("Triangles: {}", mesh.geometry.triangle_count()));
                ui.label(format!("Scale: {:.4}", mesh.transform.scale));
                ui.separator();
                ui.label("Surfaces");
                for group in &mesh.geometry.groups {
                    ui.horizontal(|ui| {
                        let (swatch, _) =
                            ui.allocate_exact_size(egui::vec2(12.0, 12.0), egui::Sense::hover());
                        ui.painter().rect_filled(swatch, 2.0, to_color32(group.color));
                        ui.label(format!("{} ({})", group.label, group.count / 3));
                    });
                }
            });
    }

    fn central(&mut self, ctx: &egui::Context, frame: &mut eframe::Frame) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.set_min_size(ui.available_size());
            let (rect, response) = ui.allocate_exact_size(ui.available_size(), egui::Sense::drag());
            self.viewport.resize(rect.width(), rect.height());
            self.prepare_gpu(frame);

            match &mut self.viewport.active {
                Renderable::Empty => {}
                Renderable::Image(image) if image.error.is_some() => {}
                Renderable::Image(image) => {
                    let widget = egui::Image::new(image.uri.clone());
                    match widget.load_for_size(ctx, rect.size()) {
                        Ok(egui::load::TexturePoll::Ready { texture }) => {
                            // Re-decided every frame so a resized container stays fitted.
                            let fit = image.on_size_known(texture.size, rect.size());
                            let shown = fit.displayed_size(texture.size, rect.size());
                            widget.paint_at(ui, egui::Rect::from_center_size(rect.center(), shown));
                        }
                        Ok(egui::load::TexturePoll::Pending { .. }) => {
                            spinner(ui, rect);
                        }
                        Err(e) => {
                            if image.on_load_failed(&e) {
                                log::error!("could not load {}: {e}", image.uri);
                                self.viewport.fallback =
                                    Some(format!("Error loading image {}: {e}", image.filename));
                            }
                        }
                    }
                }
                Renderable::Mesh(mesh) => {
                    let config = self.presenter.config();
                    if response.dragged() {
                        let delta = response.drag_delta();
                        let input = ui.input(|i| i.clone());
                        if input.pointer.primary_down() {
                            // left-drag → orbit
                            mesh.control
                                .rotate(-delta.x * config.rotate_speed, -delta.y * config.rotate_speed);
                        } else if input.pointer.secondary_down() {
                            // right-drag → pan
                            let h = rect.height().max(1.0);
                            mesh.control.pan(delta.x / h, delta.y / h);
                        }
                    }
                    if response.hovered() {
                        let scroll = ui.input(|i| i.raw_scroll_delta.y);
                        if scroll.abs() > 0.0 {
                            mesh.control.zoom((-scroll * config.zoom_speed).exp());
                        }
                    }
                    mesh.control.update(&mut self.viewport.camera);
                    mesh.redraw.tick(ctx);

                    if let Some(gl) = frame.gl() {
                        if let Some(gpu_arc) = &mut self.gpu {
                            if mesh.needs_upload {
                                // Only possible while no paint callback still holds a clone.
                                if let Some(gpu) = Arc::get_mut(gpu_arc) {
                                    unsafe { gpu.upload(gl, &mesh.geometry) };
                                    mesh.needs_upload = false;
                                }
                            }
                            if !mesh.needs_upload {
                                let gpu_for_cb = gpu_arc.clone();
                                let mvp = self.viewport.camera.view_projection() * mesh.transform.matrix();
                                let callback = egui_glow::CallbackFn::new(move |_info, painter| unsafe {
                                    gpu_for_cb.paint(painter.gl(), mvp);
                                });
                                ui.painter().add(egui::PaintCallback {
                                    rect,
                                    callback: Arc::new(callback),
                                });
                            }
                        }
                    }
                }
            }

            if self.loader.is_loading() {
                spinner(ui, rect);
                ctx.request_repaint_after(Duration::from_millis(100));
            }

            if let Some(message) = &self.viewport.fallback {
                ui.put(
                    egui::Rect::from_center_size(rect.center(), egui::vec2(rect.width() * 0.8, 60.0)),
                    egui::Label::new(egui::RichText::new(message).color(ui.visuals().error_fg_color))
                        .wrap(),
                );
            }
        });
    }
}

impl eframe::App for PreviewApp {
    fn update(&mut self, ctx: &egui::Context, frame: &mut eframe::Frame) {
        self.poll_loader();
        self.top_bar(ctx);
        self.info_panel(ctx);
        self.central(ctx, frame);
    }

    fn on_exit(&mut self, gl: Option<&glow::Context>) {
        self.viewport.stop();
        if let (Some(gl), Some(gpu)) = (gl, self.gpu.take()) {
            unsafe { gpu.destroy(gl) };
        }
    }
}

fn spinner(ui: &mut egui::Ui, rect: egui::Rect) {
    ui.put(
        egui::Rect::from_center_size(rect.center(), egui::vec2(32.0, 32.0)),
        egui::Spinner::new().size(32.0),
    );
}

fn to_color32([r, g, b]: [f32; 3]) -> egui::Color32 {
    let channel = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
    egui::Color32::from_rgb(channel(r), channel(g), channel(b))
}
