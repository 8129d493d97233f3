//! Free-flying first-person camera
//!
//! Right-handed, y up. Yaw is measured from +x towards +z, so the default yaw of
//! -90° looks down -z.

use tessel_core::{KeyCode, Mat4, Vec2, Vec3};

use crate::config::CameraConfig;

const MAX_PITCH: f32 = 89.0;
const MIN_FOV: f32 = 1.0;
const MAX_FOV: f32 = 45.0;

/// Directions held down this frame
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CameraMovement {
    pub forward: bool,
    pub back: bool,
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
}

impl CameraMovement {
    /// WASD to walk, Space to rise, Shift to sink
    pub fn from_keys(held: impl IntoIterator<Item = KeyCode>) -> Self {
        let mut movement = Self::default();
        for key in held {
            match key {
                KeyCode::W => movement.forward = true,
                KeyCode::S => movement.back = true,
                KeyCode::A => movement.left = true,
                KeyCode::D => movement.right = true,
                KeyCode::SPACE => movement.up = true,
                KeyCode::SHIFT => movement.down = true,
                _ => {}
            }
        }
        movement
    }

    pub fn is_idle(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    position: Vec3,
    front: Vec3,
    up: Vec3,
    right: Vec3,
    /// Radians
    yaw: f32,
    /// Radians
    pitch: f32,
    /// Radians
    fov: f32,
    near: f32,
    far: f32,
    aspect: f32,
    pub speed: f32,
    pub sensitivity: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(&CameraConfig::default())
    }
}

impl Camera {
    pub fn new(config: &CameraConfig) -> Self {
        let mut camera = Self {
            position: Vec3::from_array(config.position),
            front: Vec3::NEG_Z,
            up: Vec3::Y,
            right: Vec3::X,
            yaw: config.yaw.to_radians(),
            pitch: config.pitch.clamp(-MAX_PITCH, MAX_PITCH).to_radians(),
            fov: config.fov.to_radians(),
            near: config.near,
            far: config.far,
            aspect: 1.0,
            speed: config.speed,
            sensitivity: config.sensitivity,
        };
        camera.update_vectors();
        camera
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    /// Unit view direction
    pub fn front(&self) -> Vec3 {
        self.front
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    pub fn right(&self) -> Vec3 {
        self.right
    }

    /// Degrees
    pub fn yaw(&self) -> f32 {
        self.yaw.to_degrees()
    }

    pub fn set_yaw(&mut self, degrees: f32) {
        self.yaw = degrees.to_radians();
        self.update_vectors();
    }

    /// Degrees
    pub fn pitch(&self) -> f32 {
        self.pitch.to_degrees()
    }

    /// Clamped to ±89° so the view never flips over the pole
    pub fn set_pitch(&mut self, degrees: f32) {
        self.pitch = degrees.clamp(-MAX_PITCH, MAX_PITCH).to_radians();
        self.update_vectors();
    }

    /// Vertical field of view in degrees
    pub fn fov(&self) -> f32 {
        self.fov.to_degrees()
    }

    /// Clamped to 1..=45°
    pub fn set_fov(&mut self, degrees: f32) {
        self.fov = degrees.clamp(MIN_FOV, MAX_FOV).to_radians();
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    /// Match the projection to a `width` x `height` target
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.aspect = width.max(1) as f32 / height.max(1) as f32;
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.front, self.up)
    }

    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov, self.aspect, self.near, self.far)
    }

    /// Turn by a pointer motion in pixels
    pub fn mouse_move(&mut self, delta: Vec2) {
        let yaw = self.yaw() + delta.x * self.sensitivity;
        let pitch = self.pitch() - delta.y * self.sensitivity;
        self.yaw = yaw.to_radians();
        self.set_pitch(pitch);
    }

    /// Move along the view axes for `dt` seconds
    ///
    /// Opposite directions held together cancel out.
    pub fn translate(&mut self, movement: CameraMovement, dt: f32) {
        if movement.is_idle() {
            return;
        }
        let step = self.speed * dt / 2.0;
        let side = self.front.cross(self.up).normalize();
        let axis = |positive: bool, negative: bool| (positive as i32 - negative as i32) as f32;

        self.position += self.front * axis(movement.forward, movement.back) * step;
        self.position += side * axis(movement.right, movement.left) * step;
        self.position += Vec3::Y * axis(movement.up, movement.down) * step;
    }

    fn update_vectors(&mut self) {
        self.front = Vec3::new(
            self.pitch.cos() * self.yaw.cos(),
            self.pitch.sin(),
            self.pitch.cos() * self.yaw.sin(),
        )
        .normalize();
        self.right = self.front.cross(Vec3::Y).normalize();
        self.up = self.right.cross(self.front).normalize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-5
    }

    #[test]
    fn test_movement_from_held_keys() {
        let movement = CameraMovement::from_keys([KeyCode::W, KeyCode::D, KeyCode::ESCAPE]);
        assert!(movement.forward && movement.right);
        assert!(!movement.back && !movement.up);
        assert!(CameraMovement::from_keys(Vec::<KeyCode>::new()).is_idle());
    }

    #[test]
    fn test_default_looks_down_negative_z() {
        let camera = Camera::default();
        assert_eq!(camera.position(), Vec3::new(0.0, 0.0, 10.0));
        assert!(close(camera.front(), Vec3::NEG_Z));
        assert!(close(camera.right(), Vec3::X));
        assert!(close(camera.up(), Vec3::Y));
        assert!((camera.fov() - 90.0).abs() < 1e-4);
    }

    #[test]
    fn test_pitch_and_fov_are_clamped() {
        let mut camera = Camera::default();
        camera.set_pitch(120.0);
        assert!((camera.pitch() - 89.0).abs() < 1e-4);
        camera.mouse_move(Vec2::new(0.0, 1000.0));
        assert!((camera.pitch() + 89.0).abs() < 1e-4);

        camera.set_fov(90.0);
        assert!((camera.fov() - 45.0).abs() < 1e-4);
        camera.set_fov(0.0);
        assert!((camera.fov() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_mouse_move_scales_by_sensitivity() {
        let mut camera = Camera::default();
        camera.mouse_move(Vec2::new(20.0, 10.0));
        assert!((camera.yaw() - -80.0).abs() < 1e-4);
        assert!((camera.pitch() - -5.0).abs() < 1e-4);
    }

    #[test]
    fn test_translate_moves_half_speed_per_second() {
        let mut camera = Camera::default();
        let forward = CameraMovement {
            forward: true,
            ..Default::default()
        };
        camera.translate(forward, 1.0);
        assert!(close(camera.position(), Vec3::new(0.0, 0.0, 5.0)));

        let right_and_up = CameraMovement {
            right: true,
            up: true,
            ..Default::default()
        };
        camera.translate(right_and_up, 0.2);
        assert!(close(camera.position(), Vec3::new(1.0, 1.0, 5.0)));

        let both = CameraMovement {
            left: true,
            right: true,
            ..Default::default()
        };
        camera.translate(both, 1.0);
        assert!(close(camera.position(), Vec3::new(1.0, 1.0, 5.0)));
    }

    #[test]
    fn test_view_maps_target_to_negative_z() {
        let camera = Camera::default();
        let target = camera.view().transform_point3(Vec3::ZERO);
        assert!(close(target, Vec3::new(0.0, 0.0, -10.0)));
    }
}
