// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//! A fly camera that derives its view/projection matrices and view frustum
//! from yaw/pitch/position, with an optional frozen snapshot of the
//! frustum for debugging LOD and culling from outside the live view.

use geo_math::Frustum;
use log::trace;
use nalgebra::{Matrix4, Perspective3, Point3, Vector3};

const DEFAULT_YAW: f64 = -90.0;
const DEFAULT_PITCH: f64 = 0.0;
const DEFAULT_SPEED: f64 = 75.5;
const DEFAULT_SPEED_UP_MULT: f64 = 4.0;
const DEFAULT_ZOOM_DEG: f64 = 45.0;

/// Discrete nudges a caller applies once per input-poll tick; `apply` scales
/// movement by elapsed time, matching a keyboard-driven fly camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraAction {
    MoveForward,
    MoveBackward,
    MoveLeft,
    MoveRight,
    MoveUp,
    MoveDown,
    LookUp,
    LookDown,
    LookLeft,
    LookRight,
    SpeedUp,
}

/// A snapshot of the frustum and the position it was taken from, held while
/// `freeze_camera` is active so culling keeps using a fixed viewpoint even
/// as the live camera keeps moving.
struct FrozenState {
    frustum: Frustum,
    position: Point3<f64>,
}

pub struct Camera {
    position: Point3<f64>,
    front: Vector3<f64>,
    right: Vector3<f64>,
    up: Vector3<f64>,
    world_up: Vector3<f64>,
    yaw: f64,
    pitch: f64,
    movement_speed: f64,
    zoom_deg: f64,
    z_near: f64,
    z_far: f64,
    aspect_ratio: f64,

    frustum: Frustum,
    frozen: Option<FrozenState>,

    lerp_fly_origin: Point3<f64>,
    lerp_fly_target: Vector3<f64>,
    lerp_look_initial_yaw: f64,
}

impl Camera {
    pub fn new(position: Point3<f64>, world_up: Vector3<f64>, z_near: f64, z_far: f64, aspect_ratio: f64) -> Self {
        let mut camera = Self {
            position,
            front: Vector3::new(0.0, 0.0, -1.0),
            right: Vector3::zeros(),
            up: Vector3::zeros(),
            world_up,
            yaw: DEFAULT_YAW,
            pitch: DEFAULT_PITCH,
            movement_speed: DEFAULT_SPEED,
            zoom_deg: DEFAULT_ZOOM_DEG,
            z_near,
            z_far,
            aspect_ratio,
            frustum: Frustum::from_planes([geo_math::Plane::from_point_and_normal(
                &Point3::origin(),
                Vector3::new(0.0, 0.0, 1.0),
            ); 6]),
            frozen: None,
            lerp_fly_origin: position,
            lerp_fly_target: Vector3::zeros(),
            lerp_look_initial_yaw: DEFAULT_YAW,
        };
        camera.update_camera_vectors();
        camera.update_frustum();
        camera
    }

    pub fn position(&self) -> Point3<f64> {
        self.position
    }

    pub fn front(&self) -> Vector3<f64> {
        self.front
    }

    pub fn yaw(&self) -> f64 {
        self.yaw
    }

    pub fn pitch(&self) -> f64 {
        self.pitch
    }

    pub fn set_yaw(&mut self, yaw: f64) {
        self.yaw = yaw;
        self.update_camera_vectors();
    }

    pub fn set_pitch(&mut self, pitch: f64) {
        self.pitch = pitch.clamp(-89.0, 89.0);
        self.update_camera_vectors();
    }

    pub fn zoom_degrees(&self) -> f64 {
        self.zoom_deg
    }

    pub fn set_zoom_degrees(&mut self, zoom_deg: f64) {
        self.zoom_deg = zoom_deg;
    }

    pub fn set_aspect_ratio(&mut self, aspect_ratio: f64) {
        self.aspect_ratio = aspect_ratio;
    }

    /// Applies one discrete nudge, scaled by `delta_time_seconds`. Does not
    /// recompute the frustum; call [`Camera::update_frustum`] once per frame
    /// after all of a tick's actions have been applied.
    pub fn apply_action(&mut self, action: CameraAction, delta_time_seconds: f64) {
        let velocity = self.movement_speed * delta_time_seconds;
        match action {
            CameraAction::SpeedUp => self.movement_speed = DEFAULT_SPEED * DEFAULT_SPEED_UP_MULT,
            CameraAction::MoveForward => self.position += self.front * velocity,
            CameraAction::MoveBackward => self.position -= self.front * velocity,
            CameraAction::MoveLeft => self.position -= self.right * velocity,
            CameraAction::MoveRight => self.position += self.right * velocity,
            CameraAction::MoveUp => self.position += self.up * velocity,
            CameraAction::MoveDown => self.position -= self.up * velocity,
            CameraAction::LookUp => self.set_pitch(self.pitch + 1.0),
            CameraAction::LookDown => self.set_pitch(self.pitch - 1.0),
            CameraAction::LookLeft => self.set_yaw(self.yaw - 1.0),
            CameraAction::LookRight => self.set_yaw(self.yaw + 1.0),
        }
        if !matches!(action, CameraAction::SpeedUp) {
            self.movement_speed = DEFAULT_SPEED;
        }
    }

    /// Arms a linear fly-in from the camera's current position towards
    /// `target`; call [`Camera::lerp_fly`] with increasing factors in
    /// `[0, 1]` to animate it.
    pub fn begin_lerp_fly(&mut self, target: Point3<f64>) {
        self.lerp_fly_origin = self.position;
        self.lerp_fly_target = target - self.position;
    }

    pub fn lerp_fly(&mut self, lerp_factor: f64) {
        self.position = self.lerp_fly_origin + self.lerp_fly_target * lerp_factor;
    }

    /// Arms a full look-around sweep starting from the current yaw; call
    /// [`Camera::lerp_look`] with increasing factors in `[0, 1]` to rotate a
    /// full 360 degrees back to the start.
    pub fn begin_lerp_look(&mut self) {
        self.lerp_look_initial_yaw = self.yaw;
    }

    pub fn lerp_look(&mut self, lerp_factor: f64) {
        self.set_yaw(self.lerp_look_initial_yaw + 360.0 * lerp_factor);
    }

    fn update_camera_vectors(&mut self) {
        let yaw_rad = self.yaw.to_radians();
        let pitch_rad = self.pitch.to_radians();
        self.front = Vector3::new(
            yaw_rad.cos() * pitch_rad.cos(),
            pitch_rad.sin(),
            yaw_rad.sin() * pitch_rad.cos(),
        )
        .normalize();
        self.right = self.front.cross(&self.world_up).normalize();
        self.up = self.right.cross(&self.front).normalize();
    }

    /// Recomputes the live frustum from the current position/orientation.
    /// If frozen, the live frustum is still tracked internally (so
    /// unfreezing resumes smoothly) but callers see the frozen snapshot via
    /// [`Camera::frustum`].
    pub fn update_frustum(&mut self) {
        let half_v = self.zoom_deg.to_radians() * 0.5;
        let half_h = (half_v.tan() * self.aspect_ratio).atan();
        self.frustum = Frustum::from_perspective(
            &self.position,
            &self.front,
            &self.right,
            &self.up,
            self.z_near,
            self.z_far,
            half_v,
            half_h,
        );
        trace!("updated camera frustum at {:?}", self.position);
    }

    /// Snapshots the current frustum; until [`Camera::unfreeze`] is called,
    /// [`Camera::frustum`] returns this snapshot regardless of further
    /// movement.
    pub fn freeze(&mut self) {
        self.frozen = Some(FrozenState {
            frustum: self.frustum,
            position: self.position,
        });
    }

    pub fn unfreeze(&mut self) {
        self.frozen = None;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.is_some()
    }

    pub fn frustum(&self) -> &Frustum {
        match &self.frozen {
            Some(frozen) => &frozen.frustum,
            None => &self.frustum,
        }
    }

    /// The position culling/LOD selection should measure against: the live
    /// position, or the snapshot taken by [`Camera::freeze`] while frozen.
    pub fn effective_position(&self) -> Point3<f64> {
        match &self.frozen {
            Some(frozen) => frozen.position,
            None => self.position,
        }
    }

    /// Equivalent to `glm::lookAt(position, position + front, up)`: `right`
    /// and `up` are already kept orthonormal to `front` by
    /// [`Camera::update_camera_vectors`].
    pub fn view_matrix(&self) -> Matrix4<f32> {
        let eye = self.position.coords;
        #[rustfmt::skip]
        let view = Matrix4::new(
            self.right.x, self.right.y, self.right.z, -self.right.dot(&eye),
            self.up.x, self.up.y, self.up.z, -self.up.dot(&eye),
            -self.front.x, -self.front.y, -self.front.z, self.front.dot(&eye),
            0.0, 0.0, 0.0, 1.0,
        );
        nalgebra::convert(view)
    }

    pub fn projection_matrix(&self) -> Matrix4<f32> {
        let projection = Perspective3::new(self.aspect_ratio, self.zoom_deg.to_radians(), self.z_near, self.z_far);
        nalgebra::convert(*projection.as_matrix())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn default_front_points_along_negative_z_ish() {
        let camera = Camera::new(Point3::origin(), Vector3::new(0.0, 1.0, 0.0), 0.1, 1000.0, 1.0);
        assert_relative_eq!(camera.front().norm(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn apply_action_move_forward_moves_along_front() {
        let mut camera = Camera::new(Point3::origin(), Vector3::new(0.0, 1.0, 0.0), 0.1, 1000.0, 1.0);
        let front = camera.front();
        camera.apply_action(CameraAction::MoveForward, 1.0);
        let expected = Point3::origin() + front * DEFAULT_SPEED;
        assert_relative_eq!(camera.position(), expected, epsilon = 1e-6);
    }

    #[test]
    fn freeze_keeps_frustum_fixed_across_movement() {
        let mut camera = Camera::new(Point3::origin(), Vector3::new(0.0, 1.0, 0.0), 0.1, 1000.0, 1.0);
        camera.update_frustum();
        camera.freeze();
        let frozen_planes = camera.frustum().planes;

        camera.apply_action(CameraAction::MoveForward, 10.0);
        camera.update_frustum();

        assert_eq!(camera.frustum().planes, frozen_planes);

        camera.unfreeze();
        assert_ne!(camera.frustum().planes, frozen_planes);
    }

    #[test]
    fn freeze_keeps_effective_position_fixed_across_movement() {
        let mut camera = Camera::new(Point3::origin(), Vector3::new(0.0, 1.0, 0.0), 0.1, 1000.0, 1.0);
        camera.freeze();
        let frozen_position = camera.effective_position();

        camera.apply_action(CameraAction::MoveForward, 10.0);
        assert_relative_eq!(camera.effective_position(), frozen_position, epsilon = 1e-9);
        assert_ne!(camera.position(), frozen_position);

        camera.unfreeze();
        assert_relative_eq!(camera.effective_position(), camera.position(), epsilon = 1e-9);
    }

    #[test]
    fn pitch_is_clamped() {
        let mut camera = Camera::new(Point3::origin(), Vector3::new(0.0, 1.0, 0.0), 0.1, 1000.0, 1.0);
        camera.set_pitch(200.0);
        assert_relative_eq!(camera.pitch(), 89.0);
        camera.set_pitch(-200.0);
        assert_relative_eq!(camera.pitch(), -89.0);
    }
}
