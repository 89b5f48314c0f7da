//! Perspective camera, auto-framing and a damped orbit control.

use std::f32::consts::PI;

use nalgebra::{Matrix4, Point3, Vector3};

use crate::config::ViewerConfig;
use crate::geometry::Aabb;

/// Keeps the orbit away from the poles so `look_at` never sees a parallel up vector.
const POLE_MARGIN: f32 = 1e-3;
/// Pending motion below this is dropped instead of decaying forever.
const SETTLE_EPSILON: f32 = 1e-5;
/// Smallest near plane, as a fraction of the framing distance.
const NEAR_FRACTION: f32 = 1e-3;

#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// Vertical field of view, radians.
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub eye: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
}

impl Camera {
    pub fn new(config: &ViewerConfig) -> Self {
        Self {
            fov_y: config.fov_radians(),
            aspect: 1.0,
            near: config.near,
            far: config.far,
            eye: Point3::new(0.0, 0.0, 5.0),
            target: Point3::origin(),
            up: Vector3::y(),
        }
    }

    pub fn set_aspect(&mut self, width: f32, height: f32) {
        if width > 0.0 && height > 0.0 {
            self.aspect = width / height;
        }
    }

    pub fn view(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(&self.eye, &self.target, &self.up)
    }

    pub fn projection(&self) -> Matrix4<f32> {
        Matrix4::new_perspective(self.aspect, self.fov_y, self.near, self.far)
    }

    pub fn view_projection(&self) -> Matrix4<f32> {
        self.projection() * self.view()
    }
}

/// Distance at which an object `max_dim` across fills a `fov_y` frustum, times `padding`.
pub fn framing_distance(max_dim: f32, fov_y: f32, padding: f32) -> f32 {
    (max_dim / 2.0 / (fov_y / 2.0).tan()).abs() * padding
}

/// Point `camera` at the middle of `bounds` from far enough away to see all of it.
///
/// The clip planes follow the frame: the near plane sits in front of anything the bounds can
/// reach from any orbit angle, so bounds smaller than the configured near distance still draw.
/// Returns the chosen distance.
pub fn frame_bounds(camera: &mut Camera, bounds: &Aabb, padding: f32) -> f32 {
    let max_dim = bounds.max_dim();
    let distance = framing_distance(max_dim, camera.fov_y, padding);
    camera.target = bounds.center();
    camera.eye = camera.target + Vector3::new(0.0, 0.0, distance);
    camera.up = Vector3::y();
    camera.near = (distance - max_dim).max(distance * NEAR_FRACTION);
    let needed = distance + max_dim;
    if camera.far < needed {
        camera.far = needed * 2.0;
    }
    distance
}

/// Orbit around a target with motion that eases in instead of snapping.
///
/// Input only queues motion; [`OrbitControl::update`] applies `damping` of what is queued each
/// tick and keeps the rest for later ticks.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitControl {
    pub target: Point3<f32>,
    pub radius: f32,
    /// Azimuth around +Y, zero looking down -Z.
    pub theta: f32,
    /// Polar angle from +Y.
    pub phi: f32,
    damping: f32,
    min_distance: f32,
    max_distance: f32,
    pending_theta: f32,
    pending_phi: f32,
    pending_pan: Vector3<f32>,
}

impl OrbitControl {
    /// A control sitting where [`frame_bounds`] put `camera`.
    ///
    /// The zoom floor drops to the current distance when the frame is closer than
    /// `config.min_distance`, so the first tick never moves the eye.
    pub fn from_camera(camera: &Camera, config: &ViewerConfig) -> Self {
        let offset = camera.eye - camera.target;
        let radius = match offset.norm() {
            r if r.is_finite() && r > 0.0 => r,
            _ => config.min_distance,
        };
        Self {
            target: camera.target,
            radius,
            theta: offset.x.atan2(offset.z),
            phi: (offset.y / radius).clamp(-1.0, 1.0).acos(),
            damping: config.damping_factor.clamp(f32::EPSILON, 1.0),
            min_distance: config.min_distance.min(radius),
            max_distance: config.max_distance.max(radius),
            pending_theta: 0.0,
            pending_phi: 0.0,
            pending_pan: Vector3::zeros(),
        }
    }

    /// Queue a rotation, radians.
    pub fn rotate(&mut self, d_theta: f32, d_phi: f32) {
        self.pending_theta += d_theta;
        self.pending_phi += d_phi;
    }

    /// Queue a pan in view space; `dx`/`dy` are fractions of the orbit radius.
    pub fn pan(&mut self, dx: f32, dy: f32) {
        let (right, up) = self.screen_axes();
        self.pending_pan += (right * -dx + up * dy) * self.radius;
    }

    /// Multiply the orbit radius; values below 1 move closer.
    pub fn zoom(&mut self, factor: f32) {
        if factor.is_finite() && factor > 0.0 {
            self.radius = (self.radius * factor).clamp(self.min_distance, self.max_distance);
        }
    }

    /// Advance one tick and write the result into `camera`. Returns `true` while motion is
    /// still queued.
    pub fn update(&mut self, camera: &mut Camera) -> bool {
        let d = self.damping;
        self.theta += self.pending_theta * d;
        self.phi = (self.phi + self.pending_phi * d).clamp(POLE_MARGIN, PI - POLE_MARGIN);
        self.target += self.pending_pan * d;

        self.pending_theta *= 1.0 - d;
        self.pending_phi *= 1.0 - d;
        self.pending_pan *= 1.0 - d;
        if self.pending_theta.abs() < SETTLE_EPSILON {
            self.pending_theta = 0.0;
        }
        if self.pending_phi.abs() < SETTLE_EPSILON {
            self.pending_phi = 0.0;
        }
        if self.pending_pan.norm() < SETTLE_EPSILON {
            self.pending_pan = Vector3::zeros();
        }

        camera.target = self.target;
        camera.eye = self.target + self.offset();
        camera.up = Vector3::y();
        self.is_moving()
    }

    pub fn is_moving(&self) -> bool {
        self.pending_theta != 0.0 || self.pending_phi != 0.0 || self.pending_pan != Vector3::zeros()
    }

    fn offset(&self) -> Vector3<f32> {
        let (sin_phi, cos_phi) = self.phi.sin_cos();
        let (sin_theta, cos_theta) = self.theta.sin_cos();
        Vector3::new(sin_phi * sin_theta, cos_phi, sin_phi * cos_theta) * self.radius
    }

    fn screen_axes(&self) -> (Vector3<f32>, Vector3<f32>) {
        let forward = -self.offset().normalize();
        let right = forward.cross(&Vector3::y()).normalize();
        let up = right.cross(&forward);
        (right, up)
    }
}
