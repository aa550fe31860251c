//! Per-state tick pipelines, entry/exit actions and event reactions.

use character_capsule::CapsuleController;
use character_collision::CharacterBody;
use character_facing::{FacingController, FacingInput};
use character_motor_fps::{FpsMotor, MotorFlags, MotorInput};
use physics_rapier::PhysicsQuery;
use player_animation::{
    AnimationSynthesizer, AnimatorInputs, AnimatorSink, LocomotionState, MovementInputFlags,
};
use player_camera::CameraRig;
use rapier3d::math::Vector;
use rapier3d::prelude::Real;

use crate::config::LocomotionConfig;
use crate::input::InputReader;
use crate::state::{is_legal_transition, Reaction};

/// Component state shared by every locomotion state.
pub(crate) struct Core {
    pub config: LocomotionConfig,
    pub motor: FpsMotor,
    pub facing: FacingController,
    pub synth: AnimationSynthesizer,
    pub capsule: Option<CapsuleController>,
    pub input: InputReader,
    pub movement_input: MovementInputFlags,
    pub state: LocomotionState,
    pub crouch_key_pressed: bool,
    pub is_crouching: bool,
    pub is_grounded: bool,
    pub is_sliding: bool,
    pub is_sprinting: bool,
    pub is_walking: bool,
    pub elapsed: Real,
    pub fall_start: Real,
    pub falling_duration: Real,
}

impl Core {
    pub fn new(config: LocomotionConfig) -> Self {
        Self {
            motor: FpsMotor::new(config.motor),
            facing: FacingController::new(config.facing),
            synth: AnimationSynthesizer::new(config.animation.clone(), locomotion_math::forward()),
            capsule: None,
            input: InputReader::default(),
            movement_input: MovementInputFlags::default(),
            state: LocomotionState::Base,
            crouch_key_pressed: false,
            is_crouching: false,
            is_grounded: true,
            is_sliding: false,
            is_sprinting: false,
            is_walking: false,
            elapsed: 0.0,
            fall_start: 0.0,
            falling_duration: 0.0,
            config,
        }
    }

    /// Leaves `Base`; `Locomotion` has no entry action beyond its capability table.
    pub fn enter_initial_state(&mut self) {
        log::debug!("locomotion state {:?} -> Locomotion", self.state);
        self.state = LocomotionState::Locomotion;
        self.synth.set_state(LocomotionState::Locomotion);
    }
}

/// One tick's view of the controller and its collaborators.
pub(crate) struct Frame<'a, B, C, A>
where
    B: CharacterBody,
{
    pub core: &'a mut Core,
    pub body: &'a mut B,
    pub camera: &'a C,
    pub animator: &'a mut A,
    pub world: &'a B::World,
}

impl<B, C, A> Frame<'_, B, C, A>
where
    B: CharacterBody,
    C: CameraRig,
    A: AnimatorSink,
{
    pub fn tick(&mut self, dt: Real) {
        match self.core.state {
            LocomotionState::Base => {}
            LocomotionState::Locomotion => self.tick_locomotion(dt),
            LocomotionState::Jump => self.tick_jump(dt),
            LocomotionState::Fall => self.tick_fall(dt),
            LocomotionState::Crouch => self.tick_crouch(dt),
        }
    }

    pub fn react(&mut self, reaction: Reaction) {
        match reaction {
            Reaction::ToggleWalk => {
                let core = &mut *self.core;
                core.is_walking = !core.is_walking && core.is_grounded && !core.is_sprinting;
            }
            Reaction::ActivateSprint => {
                let core = &mut *self.core;
                if !core.is_crouching {
                    core.is_walking = false;
                    core.is_sprinting = true;
                    core.facing.set_strafing(false);
                }
            }
            Reaction::DeactivateSprint => self.deactivate_sprint(),
            Reaction::ActivateCrouch => self.activate_crouch(),
            Reaction::DeactivateCrouch => self.deactivate_crouch(),
            Reaction::EnterJump => self.switch_state(LocomotionState::Jump),
            Reaction::CrouchJump => {
                if self.can_stand_up() == Some(true) {
                    self.deactivate_crouch();
                    self.switch_state(LocomotionState::Jump);
                }
            }
        }
    }

    fn tick_locomotion(&mut self, dt: Real) {
        self.grounded_check();
        if !self.core.is_grounded {
            self.switch_state(LocomotionState::Fall);
            return;
        }
        if self.core.is_crouching {
            self.switch_state(LocomotionState::Crouch);
            return;
        }

        self.calculate_input(dt);
        self.tick_movement(dt);
        self.check_edges(dt);
        self.update_facing(dt);
        self.apply_movement(dt);
        self.core.synth.update_grounded_incline(dt);
        self.update_animator(dt);
    }

    fn tick_jump(&mut self, dt: Real) {
        self.core.motor.apply_gravity(dt);
        if self.core.motor.velocity().y <= 0.0 {
            self.core.synth.set_jumping(self.animator, false);
            self.switch_state(LocomotionState::Fall);
            return;
        }

        self.grounded_check();
        self.calculate_input(dt);
        self.tick_movement(dt);
        self.update_facing(dt);
        self.apply_movement(dt);
        self.update_animator(dt);
    }

    fn tick_fall(&mut self, dt: Real) {
        self.grounded_check();
        self.calculate_input(dt);
        self.tick_movement(dt);
        self.update_facing(dt);
        self.core.motor.apply_gravity(dt);
        self.apply_movement(dt);
        self.update_animator(dt);

        // The body's own contact flag, refreshed by the move above.
        if self.body.is_grounded() {
            self.switch_state(LocomotionState::Locomotion);
            return;
        }
        self.core.falling_duration = self.core.elapsed - self.core.fall_start;
    }

    fn tick_crouch(&mut self, dt: Real) {
        self.grounded_check();
        if !self.core.is_grounded {
            self.deactivate_crouch();
            if let Some(capsule) = self.core.capsule.as_mut() {
                capsule.set_crouching(self.body, false);
            }
            self.switch_state(LocomotionState::Fall);
            return;
        }
        if !self.core.crouch_key_pressed && self.can_stand_up() == Some(true) {
            self.deactivate_crouch();
            self.switch_state(LocomotionState::Locomotion);
            return;
        }
        if !self.core.is_crouching {
            if let Some(capsule) = self.core.capsule.as_mut() {
                capsule.set_crouching(self.body, false);
                self.switch_state(LocomotionState::Locomotion);
                return;
            }
        }

        self.calculate_input(dt);
        self.tick_movement(dt);
        self.check_edges(dt);
        self.update_facing(dt);
        self.apply_movement(dt);
        self.update_animator(dt);
    }

    fn switch_state(&mut self, next: LocomotionState) {
        let previous = self.core.state;
        debug_assert!(
            is_legal_transition(previous, next),
            "illegal locomotion transition {previous:?} -> {next:?}"
        );
        log::debug!("locomotion state {previous:?} -> {next:?}");
        self.exit_state();
        self.enter_state(next);
    }

    fn exit_state(&mut self) {
        if self.core.state == LocomotionState::Jump {
            self.core.synth.set_jumping(self.animator, false);
        }
    }

    fn enter_state(&mut self, next: LocomotionState) {
        self.core.synth.set_state(next);
        self.core.state = next;
        match next {
            LocomotionState::Jump => {
                self.core.synth.set_jumping(self.animator, true);
                self.core.is_sliding = false;
                let jump_force = self.core.config.controller.jump_force;
                self.core.motor.set_velocity_y(jump_force);
            }
            LocomotionState::Fall => {
                self.core.fall_start = self.core.elapsed;
                self.core.falling_duration = 0.0;
                self.core.motor.reset_y_velocity();
                self.deactivate_crouch();
                self.core.is_sliding = false;
            }
            LocomotionState::Base | LocomotionState::Locomotion | LocomotionState::Crouch => {}
        }
    }

    fn deactivate_sprint(&mut self) {
        let core = &mut *self.core;
        core.is_sprinting = false;
        let always_strafe = core.facing.config().always_strafe;
        core.facing.set_strafing(always_strafe);
    }

    fn activate_crouch(&mut self) {
        self.core.crouch_key_pressed = true;
        if !self.core.is_grounded {
            return;
        }
        let Some(capsule) = self.core.capsule.as_mut() else {
            return;
        };
        capsule.set_crouching(self.body, true);
        self.deactivate_sprint();
        self.core.is_crouching = true;
    }

    fn deactivate_crouch(&mut self) {
        self.core.crouch_key_pressed = false;
        if self.can_stand_up() != Some(true) || self.core.is_sliding {
            return;
        }
        if let Some(capsule) = self.core.capsule.as_mut() {
            capsule.set_crouching(self.body, false);
            self.core.is_crouching = false;
        }
    }

    /// `None` without a capsule controller.
    fn can_stand_up(&self) -> Option<bool> {
        let capsule = self.core.capsule.as_ref()?;
        Some(capsule.can_stand_up(&*self.body, self.world))
    }

    fn grounded_check(&mut self) {
        let feet = self.body.position();
        let controller = &self.core.config.controller;
        let center = Vector::new(feet.x, feet.y - controller.grounded_offset, feet.z);
        self.core.is_grounded = self
            .world
            .check_sphere(center, self.body.radius(), controller.ground_layers);
    }

    fn calculate_input(&mut self, dt: Real) {
        let core = &mut *self.core;
        core.movement_input = core.input.classify_movement(
            core.movement_input,
            core.config.controller.button_hold_threshold,
            dt,
        );
    }

    fn tick_movement(&mut self, dt: Real) {
        let core = &mut *self.core;
        let input = MotorInput {
            move_axis: core.input.move_composite,
            camera_forward: self.camera.forward_flat(),
            camera_right: self.camera.right_flat(),
            body_forward: self.body.forward(),
        };
        let flags = MotorFlags {
            grounded: core.is_grounded,
            crouching: core.is_crouching,
            sprinting: core.is_sprinting,
            walking: core.is_walking,
        };
        core.motor.tick(input, flags, dt);
    }

    fn check_edges(&mut self, dt: Real) {
        let core = &mut *self.core;
        let sample = *core.motor.sample();
        core.synth.check_starting(
            sample.move_direction,
            sample.speed_2d,
            sample.direction_difference_angle,
            core.facing.is_strafing(),
            dt,
            self.animator,
        );
        core.synth.check_stopped(sample.move_direction, sample.speed_2d);
    }

    fn update_facing(&mut self, dt: Real) {
        let core = &mut *self.core;
        let sample = core.motor.sample();
        let input = FacingInput {
            move_direction: sample.move_direction,
            velocity: sample.velocity,
            camera_forward: self.camera.forward_flat(),
        };
        let mut rotation = self.body.rotation();
        core.facing.update_facing(&mut rotation, input, dt);
        self.body.set_rotation(rotation);
    }

    fn apply_movement(&mut self, dt: Real) {
        let translation = self.core.motor.translation(dt);
        self.body.move_by(self.world, translation, dt);
    }

    fn update_animator(&mut self, dt: Real) {
        let core = &mut *self.core;
        let inputs = AnimatorInputs {
            movement: *core.motor.sample(),
            rotation: *core.facing.sample(),
            body_forward: self.body.forward(),
            camera_tilt: self.camera.tilt_degrees(),
            movement_input: core.movement_input,
            is_crouching: core.is_crouching,
            is_grounded: core.is_grounded,
            is_walking: core.is_walking,
            falling_duration: core.falling_duration,
        };
        core.synth.update_animator(&inputs, dt, self.animator);
    }
}
