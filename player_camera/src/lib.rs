//! First-person camera: look integration, flattened axes and crouch presentation offsets.
#![forbid(unsafe_code)]

use locomotion_math::move_towards;
use rapier3d::math::Vector;
use rapier3d::prelude::Real;
use serde::Deserialize;

/// Read-only camera surface consumed by the locomotion core.
pub trait CameraRig {
    /// Horizontal unit forward.
    fn forward_flat(&self) -> Vector<Real>;
    /// Horizontal unit right.
    fn right_flat(&self) -> Vector<Real>;
    /// Pitch in the 0..360 degree convention; looking down is a small positive angle.
    fn tilt_degrees(&self) -> Real;
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub eye_height: Real,
    pub mouse_sensitivity: Real,
    /// Pitch limits in degrees.
    pub min_pitch: Real,
    pub max_pitch: Real,
    pub crouch_forward_offset: Real,
    /// Offset change in units per second.
    pub crouch_transition_speed: Real,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            eye_height: 1.7,
            mouse_sensitivity: 1.0,
            min_pitch: -85.0,
            max_pitch: 85.0,
            crouch_forward_offset: 0.2,
            crouch_transition_speed: 0.8,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct CameraPose {
    pub eye: Vector<Real>,
    pub yaw: Real,
    pub pitch: Real,
}

#[derive(Clone, Copy, Debug)]
pub struct PlayerCamera {
    config: CameraConfig,
    yaw: Real,
    pitch: Real,
    eye: Vector<Real>,
    height_offset: Real,
    target_height_offset: Real,
    forward_offset: Real,
}

impl PlayerCamera {
    pub fn new(config: CameraConfig) -> Self {
        Self {
            config,
            yaw: 0.0,
            pitch: 0.0,
            eye: Vector::zeros(),
            height_offset: 0.0,
            target_height_offset: 0.0,
            forward_offset: 0.0,
        }
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    pub fn yaw(&self) -> Real {
        self.yaw
    }

    /// Radians; positive looks up.
    pub fn pitch(&self) -> Real {
        self.pitch
    }

    pub fn height_offset(&self) -> Real {
        self.height_offset
    }

    pub fn forward_offset(&self) -> Real {
        self.forward_offset
    }

    pub fn set_look(&mut self, yaw: Real, pitch: Real) {
        self.yaw = yaw;
        self.pitch = self.clamp_pitch(pitch);
    }

    /// `delta` is `[yaw, pitch]` in radians before sensitivity.
    pub fn apply_look_delta(&mut self, delta: [Real; 2]) {
        let sensitivity = self.config.mouse_sensitivity;
        self.yaw += delta[0] * sensitivity;
        self.pitch = self.clamp_pitch(self.pitch + delta[1] * sensitivity);
    }

    /// Follows a capsule height change (`new - previous` height).
    pub fn on_height_changed(&mut self, delta: Real) {
        self.target_height_offset += delta;
    }

    pub fn update_offsets(&mut self, dt: Real) {
        let step = self.config.crouch_transition_speed * dt;
        let target_forward = if self.target_height_offset < 0.0 {
            self.config.crouch_forward_offset
        } else {
            0.0
        };
        self.height_offset = move_towards(self.height_offset, self.target_height_offset, step);
        self.forward_offset = move_towards(self.forward_offset, target_forward, step);
    }

    pub fn update_from_origin(&mut self, origin: Vector<Real>) -> CameraPose {
        self.eye = origin
            + Vector::new(0.0, self.config.eye_height + self.height_offset, 0.0)
            + self.forward_flat() * self.forward_offset;
        self.pose()
    }

    pub fn pose(&self) -> CameraPose {
        CameraPose {
            eye: self.eye,
            yaw: self.yaw,
            pitch: self.pitch,
        }
    }

    fn clamp_pitch(&self, pitch: Real) -> Real {
        pitch.clamp(
            self.config.min_pitch.to_radians(),
            self.config.max_pitch.to_radians(),
        )
    }
}

impl Default for PlayerCamera {
    fn default() -> Self {
        Self::new(CameraConfig::default())
    }
}

impl CameraRig for PlayerCamera {
    fn forward_flat(&self) -> Vector<Real> {
        Vector::new(self.yaw.sin(), 0.0, -self.yaw.cos())
    }

    fn right_flat(&self) -> Vector<Real> {
        Vector::new(self.yaw.cos(), 0.0, self.yaw.sin())
    }

    fn tilt_degrees(&self) -> Real {
        (-self.pitch.to_degrees()).rem_euclid(360.0)
    }
}
