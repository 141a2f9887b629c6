//! Orbit camera with cached view and projection matrices.
//!
//! The camera orbits a target point at a distance, oriented by yaw and pitch.
//! Both matrices are caches: [`Camera::update_vectors`] refreshes the view and the
//! basis after any orbit change, [`Camera::update_aspect_ratio`] refreshes the
//! projection when the viewport's pixel size changes. Nothing recomputes them on a
//! timer.

use glam::{Mat4, Vec2, Vec3};

const PITCH_LIMIT: f32 = std::f32::consts::FRAC_PI_2 - 0.01;

#[derive(Clone, Debug)]
pub struct Camera {
    /// Point the camera orbits around.
    pub target: Vec3,
    /// Distance from target.
    pub distance: f32,
    /// Horizontal angle in radians.
    pub yaw: f32,
    /// Vertical angle in radians, kept short of the poles.
    pub pitch: f32,
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    /// Closest the camera may get to its target.
    pub min_distance: f32,
    pub max_distance: f32,
    aspect: f32,
    position: Vec3,
    forward: Vec3,
    right: Vec3,
    up: Vec3,
    view: Mat4,
    projection: Mat4,
    projection_updates: u64,
}

impl Default for Camera {
    fn default() -> Self {
        let mut camera = Self {
            target: Vec3::ZERO,
            distance: 20.0,
            yaw: std::f32::consts::FRAC_PI_4,
            pitch: 0.45,
            fov: 45.0,
            near: 0.1,
            far: 1000.0,
            min_distance: 0.5,
            max_distance: 500.0,
            aspect: 16.0 / 9.0,
            position: Vec3::ZERO,
            forward: Vec3::NEG_Z,
            right: Vec3::X,
            up: Vec3::Y,
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            projection_updates: 0,
        };
        camera.update_vectors();
        camera.projection = camera.compute_projection();
        camera
    }
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slide the target (and the camera with it) in the view plane.
    ///
    /// Movement is proportional to distance so panning feels the same at any zoom.
    pub fn pan(&mut self, delta: Vec2) {
        let scale = self.distance * 0.0015;
        self.target += (-self.right * delta.x + self.up * delta.y) * scale;
    }

    /// Move toward (positive) or away from (negative) the target.
    ///
    /// Distance is clamped to `[min_distance, max_distance]`, so the camera never
    /// reaches or crosses its target.
    pub fn zoom(&mut self, delta: f32) {
        let step = delta * (self.distance * 0.02).max(0.05);
        self.distance = (self.distance - step).clamp(self.min_distance, self.max_distance);
    }

    /// Orbit around the target; `delta` is in pixels.
    pub fn rotate(&mut self, delta: Vec2) {
        self.yaw -= delta.x * 0.005;
        self.pitch = (self.pitch + delta.y * 0.005).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    /// Recompute position, basis vectors and view matrix from the orbit state.
    pub fn update_vectors(&mut self) {
        let offset = Vec3::new(
            self.distance * self.pitch.cos() * self.yaw.sin(),
            self.distance * self.pitch.sin(),
            self.distance * self.pitch.cos() * self.yaw.cos(),
        );
        self.position = self.target + offset;
        self.forward = (self.target - self.position).normalize_or(Vec3::NEG_Z);
        self.right = self.forward.cross(Vec3::Y).normalize_or(Vec3::X);
        self.up = self.right.cross(self.forward);
        self.view = Mat4::look_at_rh(self.position, self.target, Vec3::Y);
    }

    /// Set a new aspect ratio and recompute the projection matrix.
    ///
    /// Non-positive or non-finite ratios are ignored.
    pub fn update_aspect_ratio(&mut self, aspect: f32) {
        if !(aspect.is_finite() && aspect > 0.0) {
            return;
        }
        self.aspect = aspect;
        self.projection = self.compute_projection();
        self.projection_updates += 1;
    }

    fn compute_projection(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov.to_radians(), self.aspect, self.near, self.far)
    }

    pub fn view_matrix(&self) -> Mat4 {
        self.view
    }

    pub fn projection_matrix(&self) -> Mat4 {
        self.projection
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn forward(&self) -> Vec3 {
        self.forward
    }

    pub fn right(&self) -> Vec3 {
        self.right
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    /// How many times the projection has been recomputed after construction.
    pub fn projection_updates(&self) -> u64 {
        self.projection_updates
    }
}
