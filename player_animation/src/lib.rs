//! Animator parameter synthesis: start/stop edges, lean and head/body look.
#![forbid(unsafe_code)]

mod curve;
mod sink;

pub use curve::{CurveError, ResponseCurve};
pub use sink::{AnimatorSink, Channel, ParamValue, ParameterMap};

use character_facing::RotationSample;
use character_motor_fps::MovementSample;
use locomotion_math::{approx_eq, lerp, signed_angle_deg, wrap_signed_deg};
use rapier3d::math::Vector;
use rapier3d::prelude::Real;
use serde::Deserialize;

const MOVING_THRESHOLD: Real = 0.01;
const STARTING_SPEED_LIMIT: Real = 1.0;
const STOPPED_SPEED_LIMIT: Real = 0.5;
const TURN_IN_PLACE_HEAD_SCALE: Real = 200.0;
const INCLINE_DAMPING: Real = 20.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LocomotionState {
    #[default]
    Base,
    Locomotion,
    Jump,
    Fall,
    Crouch,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    /// Lean multiplier, evaluated at `speed_2d / sprint_reference_speed`.
    pub lean_curve: ResponseCurve,
    pub head_look_x_curve: ResponseCurve,
    pub body_look_x_curve: ResponseCurve,
    pub sprint_reference_speed: Real,
    /// Rotation rate in degrees per second that maps to a full lean or look.
    pub max_rotation_rate: Real,
    /// Seconds lean and look stay suppressed after a locomotion start.
    pub override_delay: Real,
    pub smoothing: Real,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            lean_curve: ResponseCurve::linear(),
            head_look_x_curve: ResponseCurve::constant(1.0),
            body_look_x_curve: ResponseCurve::constant(1.0),
            sprint_reference_speed: 7.0,
            max_rotation_rate: 275.0,
            override_delay: 0.2,
            smoothing: 5.0,
        }
    }
}

/// Tap/press/hold classification of the movement input.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MovementInputFlags {
    pub tapped: bool,
    pub pressed: bool,
    pub held: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnimationSignals {
    pub lean_value: Real,
    pub head_look_x: Real,
    pub head_look_y: Real,
    pub body_look_x: Real,
    pub body_look_y: Real,
    pub head_look_delay: Real,
    pub body_look_delay: Real,
    pub lean_delay: Real,
    pub locomotion_start_timer: Real,
    pub is_starting: bool,
    pub is_stopped: bool,
    /// Degrees; latched on the rising edge of `is_starting`.
    pub locomotion_start_direction: Real,
    pub incline_angle: Real,
    /// Degrees per second, positive when turning right.
    pub rotation_rate: Real,
}

impl Default for AnimationSignals {
    fn default() -> Self {
        Self {
            lean_value: 0.0,
            head_look_x: 0.0,
            head_look_y: 0.0,
            body_look_x: 0.0,
            body_look_y: 0.0,
            head_look_delay: 0.0,
            body_look_delay: 0.0,
            lean_delay: 0.0,
            locomotion_start_timer: 0.0,
            is_starting: false,
            is_stopped: true,
            locomotion_start_direction: 0.0,
            incline_angle: 0.0,
            rotation_rate: 0.0,
        }
    }
}

/// Everything `update_animator` reads for one tick.
#[derive(Clone, Copy, Debug)]
pub struct AnimatorInputs {
    pub movement: MovementSample,
    pub rotation: RotationSample,
    pub body_forward: Vector<Real>,
    /// Camera pitch in the 0..360 degree convention.
    pub camera_tilt: Real,
    pub movement_input: MovementInputFlags,
    pub is_crouching: bool,
    pub is_grounded: bool,
    pub is_walking: bool,
    pub falling_duration: Real,
}

#[derive(Clone, Copy, Debug)]
struct Enables {
    head: bool,
    body: bool,
    lean: bool,
}

pub struct AnimationSynthesizer {
    config: AnimationConfig,
    state: LocomotionState,
    signals: AnimationSignals,
    current_forward: Vector<Real>,
    previous_forward: Vector<Real>,
}

impl AnimationSynthesizer {
    pub fn new(config: AnimationConfig, initial_forward: Vector<Real>) -> Self {
        Self {
            config,
            state: LocomotionState::Base,
            signals: AnimationSignals::default(),
            current_forward: Vector::zeros(),
            previous_forward: initial_forward,
        }
    }

    pub fn config(&self) -> &AnimationConfig {
        &self.config
    }

    pub fn signals(&self) -> &AnimationSignals {
        &self.signals
    }

    pub fn state(&self) -> LocomotionState {
        self.state
    }

    pub fn set_state(&mut self, state: LocomotionState) {
        self.state = state;
    }

    /// Re-seeds the rotation-rate history, e.g. after a teleport.
    pub fn reset_forward(&mut self, forward: Vector<Real>) {
        self.previous_forward = forward;
    }

    pub fn set_jumping<A>(&self, animator: &mut A, jumping: bool)
    where
        A: AnimatorSink + ?Sized,
    {
        animator.set_bool(Channel::IsJumping, jumping);
    }

    pub fn check_starting<A>(
        &mut self,
        move_direction: Vector<Real>,
        speed_2d: Real,
        direction_difference_angle: Real,
        is_strafing: bool,
        dt: Real,
        animator: &mut A,
    ) where
        A: AnimatorSink + ?Sized,
    {
        let signals = &mut self.signals;
        signals.locomotion_start_timer = override_delay_timer(signals.locomotion_start_timer, dt);

        let starting = if signals.locomotion_start_timer > 0.0 {
            true
        } else {
            let starting = move_direction.norm() > MOVING_THRESHOLD
                && speed_2d < STARTING_SPEED_LIMIT
                && !is_strafing;
            if starting {
                if !signals.is_starting {
                    signals.locomotion_start_direction = direction_difference_angle;
                    animator.set_float(
                        Channel::LocomotionStartDirection,
                        signals.locomotion_start_direction,
                    );
                }
                let delay = self.config.override_delay;
                signals.lean_delay = delay;
                signals.head_look_delay = delay;
                signals.body_look_delay = delay;
                signals.locomotion_start_timer = delay;
            }
            starting
        };
        signals.is_starting = starting;
    }

    pub fn check_stopped(&mut self, move_direction: Vector<Real>, speed_2d: Real) {
        self.signals.is_stopped =
            move_direction.norm() == 0.0 && speed_2d < STOPPED_SPEED_LIMIT;
    }

    /// Decays the incline channel toward zero whether or not the body is grounded.
    pub fn update_grounded_incline(&mut self, dt: Real) {
        self.signals.incline_angle = lerp(self.signals.incline_angle, 0.0, INCLINE_DAMPING * dt);
    }

    pub fn update_animator<A>(&mut self, inputs: &AnimatorInputs, dt: Real, animator: &mut A)
    where
        A: AnimatorSink + ?Sized,
    {
        let enables = self.update_enables(inputs.rotation.is_turning_in_place, dt);
        self.rotational_additives(enables, inputs, dt, animator);

        let s = &self.signals;
        let movement = &inputs.movement;
        let rotation = &inputs.rotation;
        animator.set_float(Channel::LeanValue, s.lean_value);
        animator.set_float(Channel::HeadLookX, s.head_look_x);
        animator.set_float(Channel::HeadLookY, s.head_look_y);
        animator.set_float(Channel::BodyLookX, s.body_look_x);
        animator.set_float(Channel::BodyLookY, s.body_look_y);

        animator.set_float(
            Channel::IsStrafing,
            if rotation.is_strafing { 1.0 } else { 0.0 },
        );
        animator.set_float(Channel::InclineAngle, s.incline_angle);

        animator.set_float(Channel::MoveSpeed, movement.speed_2d);
        animator.set_int(Channel::CurrentGait, movement.gait.ordinal());

        animator.set_float(Channel::StrafeDirectionX, rotation.strafe_direction_x);
        animator.set_float(Channel::StrafeDirectionZ, rotation.strafe_direction_z);
        animator.set_float(Channel::ForwardStrafe, rotation.forward_strafe);
        animator.set_float(Channel::CameraRotationOffset, rotation.camera_rotation_offset);

        animator.set_bool(Channel::MovementInputHeld, inputs.movement_input.held);
        animator.set_bool(Channel::MovementInputPressed, inputs.movement_input.pressed);
        animator.set_bool(Channel::MovementInputTapped, inputs.movement_input.tapped);
        animator.set_float(Channel::ShuffleDirectionX, rotation.shuffle_direction_x);
        animator.set_float(Channel::ShuffleDirectionZ, rotation.shuffle_direction_z);

        animator.set_bool(Channel::IsTurningInPlace, rotation.is_turning_in_place);
        animator.set_bool(Channel::IsCrouching, inputs.is_crouching);

        animator.set_float(Channel::FallingDuration, inputs.falling_duration);
        animator.set_bool(Channel::IsGrounded, inputs.is_grounded);

        animator.set_bool(Channel::IsWalking, inputs.is_walking);
        animator.set_bool(Channel::IsStopped, s.is_stopped);
        animator.set_bool(Channel::IsStarting, s.is_starting);

        animator.set_float(Channel::LocomotionStartDirection, s.locomotion_start_direction);
    }

    fn update_enables(&mut self, is_turning_in_place: bool, dt: Real) -> Enables {
        let s = &mut self.signals;
        s.head_look_delay = override_delay_timer(s.head_look_delay, dt);
        s.body_look_delay = override_delay_timer(s.body_look_delay, dt);
        s.lean_delay = override_delay_timer(s.lean_delay, dt);
        Enables {
            head: s.head_look_delay == 0.0 && !s.is_starting,
            body: s.body_look_delay == 0.0 && !(s.is_starting || is_turning_in_place),
            lean: s.lean_delay == 0.0 && !(s.is_starting || is_turning_in_place),
        }
    }

    fn rotational_additives<A>(
        &mut self,
        enables: Enables,
        inputs: &AnimatorInputs,
        dt: Real,
        animator: &A,
    ) where
        A: AnimatorSink + ?Sized,
    {
        if enables.head || enables.body || enables.lean {
            self.current_forward = inputs.body_forward;
            self.signals.rotation_rate =
                if dt > 0.0 && !approx_eq(self.current_forward, self.previous_forward) {
                    -signed_angle_deg(self.current_forward, self.previous_forward) / dt
                } else {
                    0.0
                };
        }
        let rate = self.signals.rotation_rate;
        let config = &self.config;

        let lean_target = if enables.lean { rate } else { 0.0 };
        let reference = if config.sprint_reference_speed > 0.0 {
            inputs.movement.speed_2d / config.sprint_reference_speed
        } else {
            0.0
        };
        let lean_multiplier = config.lean_curve.evaluate(reference);
        self.signals.lean_value =
            self.smoothed(self.signals.lean_value, lean_target, lean_multiplier, dt);

        if enables.head && animator.get_bool(Channel::IsTurningInPlace) {
            let offset = animator.get_float(Channel::CameraRotationOffset);
            self.signals.head_look_x = lerp(
                self.signals.head_look_x,
                offset / TURN_IN_PLACE_HEAD_SCALE,
                self.config.smoothing * dt,
            );
        } else {
            let target = if enables.head { rate } else { 0.0 };
            let current = self.signals.head_look_x;
            let multiplier = self.config.head_look_x_curve.evaluate(current);
            self.signals.head_look_x = self.smoothed(current, target, multiplier, dt);
        }

        let target = if enables.body { rate } else { 0.0 };
        let current = self.signals.body_look_x;
        let multiplier = self.config.body_look_x_curve.evaluate(current);
        self.signals.body_look_x = self.smoothed(current, target, multiplier, dt);

        let tilt = (wrap_signed_deg(inputs.camera_tilt) / -180.0).clamp(-0.1, 1.0);
        self.signals.head_look_y = tilt;
        self.signals.body_look_y = tilt;

        self.previous_forward = self.current_forward;
    }

    fn smoothed(&self, current: Real, rate: Real, multiplier: Real, dt: Real) -> Real {
        let target = (rate / self.config.max_rotation_rate).clamp(-1.0, 1.0) * multiplier;
        if target == current {
            target
        } else {
            lerp(current, target, self.config.smoothing * dt)
        }
    }
}

/// Counts an armed delay down to exactly zero.
fn override_delay_timer(time: Real, dt: Real) -> Real {
    if time > 0.0 {
        (time - dt).clamp(0.0, 1.0)
    } else {
        0.0
    }
}
