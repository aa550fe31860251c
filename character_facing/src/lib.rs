//! Body facing and strafing signals.
//!
//! While strafing the body tracks the camera and the move direction is expressed
//! relative to it; otherwise the body turns toward its own horizontal velocity.
#![forbid(unsafe_code)]

use locomotion_math::{
    direction_difference_deg, flat_normalized, flatten, lerp, look_rotation, rotated_forward,
    rotated_right, round3, slerp, smooth_step,
};
use rapier3d::math::{Rotation, Vector};
use rapier3d::prelude::Real;
use serde::Deserialize;

const MOVING_THRESHOLD: Real = 0.01;
const FORWARD_STRAFE_SNAP: Real = 0.001;

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct FacingConfig {
    /// Rate for body slerps and camera-offset decay.
    pub rotation_smoothing: Real,
    /// Forward-strafe cone lower bound in degrees (exclusive).
    pub forward_strafe_min: Real,
    /// Forward-strafe cone upper bound in degrees (exclusive).
    pub forward_strafe_max: Real,
    pub always_strafe: bool,
    /// Camera offset in degrees beyond which a stationary body turns in place.
    pub turn_in_place_threshold: Real,
    pub strafe_direction_damping: Real,
    pub forward_strafe_damping: Real,
    pub turn_offset_damping: Real,
}

impl Default for FacingConfig {
    fn default() -> Self {
        Self {
            rotation_smoothing: 10.0,
            forward_strafe_min: -55.0,
            forward_strafe_max: 125.0,
            always_strafe: true,
            turn_in_place_threshold: 10.0,
            strafe_direction_damping: 5.0,
            forward_strafe_damping: 20.0,
            turn_offset_damping: 20.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RotationSample {
    pub is_strafing: bool,
    pub is_turning_in_place: bool,
    pub strafe_direction_x: Real,
    pub strafe_direction_z: Real,
    pub forward_strafe: Real,
    /// Signed degrees between body forward and camera forward.
    pub camera_rotation_offset: Real,
    pub shuffle_direction_x: Real,
    pub shuffle_direction_z: Real,
}

impl Default for RotationSample {
    fn default() -> Self {
        Self {
            is_strafing: false,
            is_turning_in_place: false,
            strafe_direction_x: 0.0,
            strafe_direction_z: 0.0,
            forward_strafe: 1.0,
            camera_rotation_offset: 0.0,
            shuffle_direction_x: 0.0,
            shuffle_direction_z: 0.0,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct FacingInput {
    pub move_direction: Vector<Real>,
    pub velocity: Vector<Real>,
    /// Horizontal unit forward of the camera.
    pub camera_forward: Vector<Real>,
}

/// Frame-local axes shared by both rotation modes.
struct FacingFrame {
    character_forward: Vector<Real>,
    character_right: Vector<Real>,
    direction_forward: Vector<Real>,
    camera_forward: Vector<Real>,
}

pub struct FacingController {
    config: FacingConfig,
    sample: RotationSample,
    strafe_angle: Real,
}

impl FacingController {
    pub fn new(config: FacingConfig) -> Self {
        Self {
            config,
            sample: RotationSample {
                is_strafing: config.always_strafe,
                ..Default::default()
            },
            strafe_angle: 0.0,
        }
    }

    pub fn config(&self) -> &FacingConfig {
        &self.config
    }

    pub fn sample(&self) -> &RotationSample {
        &self.sample
    }

    pub fn is_strafing(&self) -> bool {
        self.sample.is_strafing
    }

    /// Signed degrees from body forward to the move direction, last tick.
    pub fn strafe_angle(&self) -> Real {
        self.strafe_angle
    }

    pub fn set_strafing(&mut self, strafing: bool) {
        self.sample.is_strafing = strafing;
    }

    /// Updates the strafing signals and turns `rotation` for this tick.
    pub fn update_facing(&mut self, rotation: &mut Rotation<Real>, input: FacingInput, dt: Real) {
        let frame = FacingFrame {
            character_forward: flat_normalized(rotated_forward(rotation)),
            character_right: flat_normalized(rotated_right(rotation)),
            direction_forward: flat_normalized(input.move_direction),
            camera_forward: input.camera_forward,
        };
        self.strafe_angle =
            direction_difference_deg(frame.character_forward, frame.direction_forward);
        self.sample.is_turning_in_place = false;

        if self.sample.is_strafing {
            self.strafing_rotation(rotation, &frame, input.move_direction, dt);
        } else {
            self.free_rotation(rotation, input.velocity, dt);
        }
    }

    fn strafing_rotation(
        &mut self,
        rotation: &mut Rotation<Real>,
        frame: &FacingFrame,
        move_direction: Vector<Real>,
        dt: Real,
    ) {
        if move_direction.norm() <= MOVING_THRESHOLD {
            self.update_strafe_direction(1.0, 0.0, dt);
            let offset = direction_difference_deg(frame.character_forward, frame.camera_forward);
            self.sample.camera_rotation_offset = lerp(
                self.sample.camera_rotation_offset,
                offset,
                self.config.turn_offset_damping * dt,
            );
            if self.sample.camera_rotation_offset.abs() > self.config.turn_in_place_threshold {
                self.sample.is_turning_in_place = true;
            }
            return;
        }

        if frame.camera_forward != Vector::zeros() {
            let along = frame.character_forward.dot(&frame.direction_forward);
            let across = frame.character_right.dot(&frame.direction_forward);
            self.sample.shuffle_direction_z = along;
            self.sample.shuffle_direction_x = across;
            self.update_strafe_direction(along, across, dt);

            self.sample.camera_rotation_offset = lerp(
                self.sample.camera_rotation_offset,
                0.0,
                self.config.rotation_smoothing * dt,
            );

            let in_forward_cone = self.strafe_angle > self.config.forward_strafe_min
                && self.strafe_angle < self.config.forward_strafe_max;
            let target = if in_forward_cone { 1.0 } else { 0.0 };
            if (self.sample.forward_strafe - target).abs() <= FORWARD_STRAFE_SNAP {
                self.sample.forward_strafe = target;
            } else {
                let t = (self.config.forward_strafe_damping * dt).clamp(0.0, 1.0);
                self.sample.forward_strafe = smooth_step(self.sample.forward_strafe, target, t);
            }
        }

        if let Some(target) = look_rotation(frame.camera_forward) {
            *rotation = slerp(rotation, &target, self.config.rotation_smoothing * dt);
        }
    }

    fn free_rotation(&mut self, rotation: &mut Rotation<Real>, velocity: Vector<Real>, dt: Real) {
        self.update_strafe_direction(1.0, 0.0, dt);
        self.sample.camera_rotation_offset = lerp(
            self.sample.camera_rotation_offset,
            0.0,
            self.config.rotation_smoothing * dt,
        );
        self.sample.shuffle_direction_z = 1.0;
        self.sample.shuffle_direction_x = 0.0;

        let face = flatten(velocity);
        if face == Vector::zeros() {
            return;
        }
        if let Some(target) = look_rotation(face) {
            *rotation = slerp(rotation, &target, self.config.rotation_smoothing * dt);
        }
    }

    fn update_strafe_direction(&mut self, target_z: Real, target_x: Real, dt: Real) {
        let t = self.config.strafe_direction_damping * dt;
        self.sample.strafe_direction_z = round3(lerp(self.sample.strafe_direction_z, target_z, t));
        self.sample.strafe_direction_x = round3(lerp(self.sample.strafe_direction_x, target_x, t));
    }
}
