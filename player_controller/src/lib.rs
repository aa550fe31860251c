//! First-person locomotion orchestrator.
//!
//! `LocomotionController` owns the movement, facing, capsule and animation components and
//! drives them through the Locomotion / Jump / Fall / Crouch state machine, one tick per frame.
#![forbid(unsafe_code)]

mod config;
mod input;
mod machine;
mod state;

pub use config::{ConfigError, ControllerConfig, LocomotionConfig};
pub use input::{InputEvent, InputReader};
pub use player_animation::{LocomotionState, MovementInputFlags};
pub use state::{capabilities, is_legal_transition, reaction, Reaction};

use character_capsule::{CapsuleController, CapsuleGeometry};
use character_collision::CharacterBody;
use character_facing::RotationSample;
use character_motor_fps::MovementSample;
use player_animation::{AnimationSignals, AnimatorSink};
use player_camera::CameraRig;
use rapier3d::prelude::Real;
use thiserror::Error;

use machine::{Core, Frame};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LocomotionError {
    #[error("locomotion controller is missing its {0}")]
    MissingDependency(&'static str),
    #[error("locomotion controller is disabled")]
    Disabled,
}

/// Collaborators supplied by the host; any of them may be absent.
pub struct LocomotionParts<B, C, A> {
    pub body: Option<B>,
    pub camera: Option<C>,
    pub animator: Option<A>,
}

impl<B, C, A> LocomotionParts<B, C, A> {
    pub fn new(body: B, camera: C, animator: A) -> Self {
        Self {
            body: Some(body),
            camera: Some(camera),
            animator: Some(animator),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Lifecycle {
    Uninitialized,
    Active,
    Disabled,
    ShutDown,
}

type HeightListener = Box<dyn FnMut(Real)>;

/// Misuse kinds, each warned about at most once.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Diagnostic {
    TickBeforeInitialize,
    InvalidDeltaTime,
    MissingCollaborators,
}

impl Diagnostic {
    fn bit(self) -> u8 {
        1 << self as u8
    }

    fn message(self) -> &'static str {
        match self {
            Diagnostic::TickBeforeInitialize => "tick called before initialize",
            Diagnostic::InvalidDeltaTime => "tick called with a non-positive delta time",
            Diagnostic::MissingCollaborators => "tick called without its collaborators",
        }
    }
}

pub struct LocomotionController<B, C, A>
where
    B: CharacterBody,
{
    body: Option<B>,
    camera: Option<C>,
    animator: Option<A>,
    core: Core,
    lifecycle: Lifecycle,
    pending_height_listeners: Vec<HeightListener>,
    logged_diagnostics: u8,
}

impl<B, C, A> LocomotionController<B, C, A>
where
    B: CharacterBody,
    C: CameraRig,
    A: AnimatorSink,
{
    pub fn new(config: LocomotionConfig, parts: LocomotionParts<B, C, A>) -> Self {
        Self {
            body: parts.body,
            camera: parts.camera,
            animator: parts.animator,
            core: Core::new(config),
            lifecycle: Lifecycle::Uninitialized,
            pending_height_listeners: Vec::new(),
            logged_diagnostics: 0,
        }
    }

    /// Validates collaborators, attaches the capsule controller and enters `Locomotion`.
    ///
    /// A missing body, camera or animator disables the controller for good. A body without
    /// capsule geometry only disables crouching.
    pub fn initialize(&mut self) -> Result<(), LocomotionError> {
        match self.lifecycle {
            Lifecycle::Uninitialized => {}
            Lifecycle::Active => return Ok(()),
            Lifecycle::Disabled | Lifecycle::ShutDown => return Err(LocomotionError::Disabled),
        }

        let missing = if self.body.is_none() {
            Some("character body")
        } else if self.camera.is_none() {
            Some("camera")
        } else if self.animator.is_none() {
            Some("animator")
        } else {
            None
        };
        if let Some(dependency) = missing {
            return Err(self.disable(dependency));
        }
        let Some(body) = self.body.as_ref() else {
            return Err(LocomotionError::MissingDependency("character body"));
        };

        match CapsuleController::attach(self.core.config.capsule, body) {
            Ok(mut capsule) => {
                for listener in self.pending_height_listeners.drain(..) {
                    capsule.on_height_changed(listener);
                }
                self.core.capsule = Some(capsule);
            }
            Err(err) => {
                log::error!("locomotion controller: {err}; crouch will not work");
            }
        }

        self.core.synth.reset_forward(body.forward());
        self.core.enter_initial_state();
        self.lifecycle = Lifecycle::Active;
        Ok(())
    }

    /// Runs the active state's pipeline once.
    pub fn tick(&mut self, world: &B::World, dt: Real) {
        if self.lifecycle != Lifecycle::Active {
            if self.lifecycle == Lifecycle::Uninitialized {
                self.log_invalid_state(Diagnostic::TickBeforeInitialize);
            }
            return;
        }
        if !(dt.is_finite() && dt > 0.0) {
            self.log_invalid_state(Diagnostic::InvalidDeltaTime);
            return;
        }
        let (Some(body), Some(camera), Some(animator)) = (
            self.body.as_mut(),
            self.camera.as_ref(),
            self.animator.as_mut(),
        ) else {
            self.log_invalid_state(Diagnostic::MissingCollaborators);
            return;
        };

        self.core.elapsed += dt;
        Frame {
            core: &mut self.core,
            body,
            camera,
            animator,
            world,
        }
        .tick(dt);
    }

    /// Dispatches an input event through the active state's capability table.
    pub fn handle_input(&mut self, world: &B::World, event: InputEvent) {
        if self.lifecycle != Lifecycle::Active {
            return;
        }
        let Some(reaction) = state::reaction(self.core.state, event) else {
            return;
        };
        let (Some(body), Some(camera), Some(animator)) = (
            self.body.as_mut(),
            self.camera.as_ref(),
            self.animator.as_mut(),
        ) else {
            return;
        };
        Frame {
            core: &mut self.core,
            body,
            camera,
            animator,
            world,
        }
        .react(reaction);
    }

    /// Stops reacting to ticks and events.
    pub fn shutdown(&mut self) {
        if self.lifecycle == Lifecycle::Active {
            log::debug!("locomotion controller shut down in {:?}", self.core.state);
        }
        self.lifecycle = Lifecycle::ShutDown;
    }

    pub fn is_active(&self) -> bool {
        self.lifecycle == Lifecycle::Active
    }

    /// Subscribes to capsule height changes (`new - previous` height).
    pub fn on_height_changed(&mut self, listener: impl FnMut(Real) + 'static) {
        match self.core.capsule.as_mut() {
            Some(capsule) => capsule.on_height_changed(listener),
            None => self.pending_height_listeners.push(Box::new(listener)),
        }
    }

    pub fn activate_sliding(&mut self) {
        self.core.is_sliding = true;
    }

    pub fn deactivate_sliding(&mut self) {
        self.core.is_sliding = false;
    }

    pub fn state(&self) -> LocomotionState {
        self.core.state
    }

    pub fn config(&self) -> &LocomotionConfig {
        &self.core.config
    }

    pub fn movement(&self) -> &MovementSample {
        self.core.motor.sample()
    }

    pub fn rotation(&self) -> &RotationSample {
        self.core.facing.sample()
    }

    pub fn signals(&self) -> &AnimationSignals {
        self.core.synth.signals()
    }

    pub fn movement_input(&self) -> MovementInputFlags {
        self.core.movement_input
    }

    pub fn input(&self) -> &InputReader {
        &self.core.input
    }

    pub fn input_mut(&mut self) -> &mut InputReader {
        &mut self.core.input
    }

    pub fn is_grounded(&self) -> bool {
        self.core.is_grounded
    }

    pub fn is_crouching(&self) -> bool {
        self.core.is_crouching
    }

    pub fn is_sprinting(&self) -> bool {
        self.core.is_sprinting
    }

    pub fn is_walking(&self) -> bool {
        self.core.is_walking
    }

    pub fn is_sliding(&self) -> bool {
        self.core.is_sliding
    }

    pub fn falling_duration(&self) -> Real {
        self.core.falling_duration
    }

    pub fn capsule(&self) -> Option<&CapsuleController> {
        self.core.capsule.as_ref()
    }

    pub fn capsule_geometry(&self) -> Option<CapsuleGeometry> {
        let capsule = self.core.capsule.as_ref()?;
        capsule.geometry(self.body.as_ref()?)
    }

    pub fn body(&self) -> Option<&B> {
        self.body.as_ref()
    }

    pub fn body_mut(&mut self) -> Option<&mut B> {
        self.body.as_mut()
    }

    pub fn camera(&self) -> Option<&C> {
        self.camera.as_ref()
    }

    pub fn camera_mut(&mut self) -> Option<&mut C> {
        self.camera.as_mut()
    }

    pub fn animator(&self) -> Option<&A> {
        self.animator.as_ref()
    }

    fn disable(&mut self, dependency: &'static str) -> LocomotionError {
        log::error!("locomotion controller: {dependency} is not assigned; disabling");
        self.lifecycle = Lifecycle::Disabled;
        LocomotionError::MissingDependency(dependency)
    }

    fn log_invalid_state(&mut self, diagnostic: Diagnostic) {
        if !self.diagnostic_logged(diagnostic) {
            self.logged_diagnostics |= diagnostic.bit();
            log::warn!("locomotion controller: {}", diagnostic.message());
        }
    }

    fn diagnostic_logged(&self, diagnostic: Diagnostic) -> bool {
        self.logged_diagnostics & diagnostic.bit() != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use character_collision::CapsuleShape;
    use locomotion_math::{forward, rotated_forward, rotated_right};
    use physics_rapier::{LayerMask, PhysicsQuery};
    use player_animation::{Channel, ParameterMap};
    use rapier3d::math::{Rotation, Vector};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    const DT: Real = 0.1;

    #[derive(Default)]
    struct ScriptedWorld {
        airborne: Cell<bool>,
        ceiling: Cell<bool>,
    }

    impl PhysicsQuery for ScriptedWorld {
        fn check_sphere(&self, _: Vector<Real>, _: Real, _: LayerMask) -> bool {
            !self.airborne.get()
        }

        fn check_capsule(&self, _: Vector<Real>, _: Vector<Real>, _: Real, _: LayerMask) -> bool {
            self.ceiling.get()
        }
    }

    /// Body that integrates translation directly and lands at `y <= 0`.
    struct FreeBody {
        position: Vector<Real>,
        rotation: Rotation<Real>,
        capsule: Option<CapsuleShape>,
        grounded: bool,
    }

    impl FreeBody {
        fn standing() -> Self {
            Self {
                position: Vector::zeros(),
                rotation: Rotation::identity(),
                capsule: Some(CapsuleShape {
                    height: 1.8,
                    center: 0.93,
                }),
                grounded: true,
            }
        }
    }

    impl CharacterBody for FreeBody {
        type World = ScriptedWorld;

        fn position(&self) -> Vector<Real> {
            self.position
        }

        fn rotation(&self) -> Rotation<Real> {
            self.rotation
        }

        fn set_rotation(&mut self, rotation: Rotation<Real>) {
            self.rotation = rotation;
        }

        fn radius(&self) -> Real {
            0.3
        }

        fn capsule(&self) -> Option<CapsuleShape> {
            self.capsule
        }

        fn set_capsule(&mut self, shape: CapsuleShape) {
            self.capsule = Some(shape);
        }

        fn is_grounded(&self) -> bool {
            self.grounded
        }

        fn move_by(&mut self, _: &ScriptedWorld, translation: Vector<Real>, _: Real) {
            self.position += translation;
            if self.position.y <= 0.0 {
                self.position.y = 0.0;
                self.grounded = true;
            } else {
                self.grounded = false;
            }
        }
    }

    struct FixedCamera {
        rotation: Rotation<Real>,
        tilt: Real,
    }

    impl Default for FixedCamera {
        fn default() -> Self {
            Self {
                rotation: Rotation::identity(),
                tilt: 0.0,
            }
        }
    }

    impl CameraRig for FixedCamera {
        fn forward_flat(&self) -> Vector<Real> {
            rotated_forward(&self.rotation)
        }

        fn right_flat(&self) -> Vector<Real> {
            rotated_right(&self.rotation)
        }

        fn tilt_degrees(&self) -> Real {
            self.tilt
        }
    }

    type TestController = LocomotionController<FreeBody, FixedCamera, ParameterMap>;

    fn controller() -> TestController {
        let parts = LocomotionParts::new(
            FreeBody::standing(),
            FixedCamera::default(),
            ParameterMap::new(),
        );
        let mut controller = LocomotionController::new(LocomotionConfig::default(), parts);
        controller.initialize().unwrap();
        controller
    }

    fn animator(controller: &TestController) -> &ParameterMap {
        controller.animator().unwrap()
    }

    #[test]
    fn missing_camera_disables_permanently() {
        let parts: LocomotionParts<FreeBody, FixedCamera, ParameterMap> = LocomotionParts {
            body: Some(FreeBody::standing()),
            camera: None,
            animator: Some(ParameterMap::new()),
        };
        let mut controller = LocomotionController::new(LocomotionConfig::default(), parts);
        assert_eq!(
            controller.initialize(),
            Err(LocomotionError::MissingDependency("camera"))
        );
        assert_eq!(controller.initialize(), Err(LocomotionError::Disabled));
        controller.tick(&ScriptedWorld::default(), DT);
        assert_eq!(controller.state(), LocomotionState::Base);
        assert!(!controller.is_active());
    }

    #[test]
    fn missing_capsule_only_disables_crouch() {
        let mut body = FreeBody::standing();
        body.capsule = None;
        let parts = LocomotionParts::new(body, FixedCamera::default(), ParameterMap::new());
        let mut controller = LocomotionController::new(LocomotionConfig::default(), parts);
        controller.initialize().unwrap();
        assert!(controller.capsule().is_none());

        let world = ScriptedWorld::default();
        controller.handle_input(&world, InputEvent::CrouchActivated);
        controller.tick(&world, DT);
        assert!(!controller.is_crouching());
        assert_eq!(controller.state(), LocomotionState::Locomotion);
    }

    #[test]
    fn tick_before_initialize_is_ignored() {
        let parts = LocomotionParts::new(
            FreeBody::standing(),
            FixedCamera::default(),
            ParameterMap::new(),
        );
        let mut controller: TestController =
            LocomotionController::new(LocomotionConfig::default(), parts);
        controller.tick(&ScriptedWorld::default(), DT);
        assert_eq!(controller.state(), LocomotionState::Base);
        assert!(animator(&controller).is_empty());
    }

    #[test]
    fn idle_tick_reports_stopped() {
        let mut controller = controller();
        controller.tick(&ScriptedWorld::default(), DT);

        assert_eq!(controller.state(), LocomotionState::Locomotion);
        assert_eq!(controller.movement().gait.ordinal(), 0);
        assert!(controller.signals().is_stopped);
        assert!(!controller.signals().is_starting);
        let animator = animator(&controller);
        assert_eq!(animator.int(Channel::CurrentGait), Some(0));
        assert_eq!(animator.bool(Channel::IsStopped), Some(true));
        assert_eq!(animator.bool(Channel::IsStarting), Some(false));
        assert_eq!(animator.bool(Channel::IsGrounded), Some(true));
    }

    #[test]
    fn jump_integrates_gravity_and_falls_at_apex() {
        let mut controller = controller();
        let world = ScriptedWorld::default();
        controller.handle_input(&world, InputEvent::Jump);
        assert_eq!(controller.state(), LocomotionState::Jump);
        assert_eq!(animator(&controller).bool(Channel::IsJumping), Some(true));

        world.airborne.set(true);
        controller.tick(&world, DT);
        assert!((controller.movement().velocity.y - 8.038).abs() < 1.0e-4);
        assert_eq!(controller.state(), LocomotionState::Jump);
        assert!(controller.body().unwrap().position().y > 0.0);

        for _ in 0..5 {
            controller.tick(&world, DT);
        }
        assert_eq!(controller.state(), LocomotionState::Fall);
        assert_eq!(controller.movement().velocity.y, 0.0);
        assert_eq!(animator(&controller).bool(Channel::IsJumping), Some(false));
    }

    #[test]
    fn fall_lands_on_body_contact() {
        let mut controller = controller();
        let world = ScriptedWorld::default();
        controller.handle_input(&world, InputEvent::Jump);
        world.airborne.set(true);

        let mut saw_fall = false;
        for _ in 0..60 {
            controller.tick(&world, DT);
            if controller.state() == LocomotionState::Fall {
                saw_fall = true;
                assert!(controller.movement().velocity.y <= 0.0);
            }
            if saw_fall && controller.state() == LocomotionState::Locomotion {
                break;
            }
        }
        assert!(saw_fall);
        assert_eq!(controller.state(), LocomotionState::Locomotion);
        assert_eq!(controller.body().unwrap().position().y, 0.0);
    }

    #[test]
    fn walking_off_a_ledge_falls_and_accumulates_duration() {
        let mut controller = controller();
        let world = ScriptedWorld::default();
        controller.body_mut().unwrap().position.y = 50.0;
        world.airborne.set(true);

        controller.tick(&world, DT);
        assert_eq!(controller.state(), LocomotionState::Fall);
        assert_eq!(controller.falling_duration(), 0.0);

        controller.tick(&world, DT);
        controller.tick(&world, DT);
        assert!((controller.falling_duration() - 0.2).abs() < 1.0e-4);
        assert!(controller.movement().velocity.y < 0.0);
    }

    #[test]
    fn crouch_under_ceiling_stays_crouched() {
        let mut controller = controller();
        let world = ScriptedWorld::default();
        let deltas = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&deltas);
        controller.on_height_changed(move |delta| sink.borrow_mut().push(delta));

        controller.handle_input(&world, InputEvent::CrouchActivated);
        assert!(controller.is_crouching());
        controller.tick(&world, DT);
        assert_eq!(controller.state(), LocomotionState::Crouch);
        assert_eq!(deltas.borrow().len(), 1);

        world.ceiling.set(true);
        controller.handle_input(&world, InputEvent::CrouchDeactivated);
        controller.tick(&world, DT);
        controller.tick(&world, DT);
        assert_eq!(controller.state(), LocomotionState::Crouch);
        assert!(controller.is_crouching());
        assert_eq!(controller.capsule_geometry().unwrap().current_height, 1.2);

        controller.handle_input(&world, InputEvent::Jump);
        assert_eq!(controller.state(), LocomotionState::Crouch);

        world.ceiling.set(false);
        controller.tick(&world, DT);
        assert_eq!(controller.state(), LocomotionState::Locomotion);
        assert!(!controller.is_crouching());
        assert_eq!(deltas.borrow().len(), 2);
    }

    #[test]
    fn crouch_jump_stands_up_first() {
        let mut controller = controller();
        let world = ScriptedWorld::default();
        controller.handle_input(&world, InputEvent::CrouchActivated);
        controller.tick(&world, DT);
        assert_eq!(controller.state(), LocomotionState::Crouch);

        controller.handle_input(&world, InputEvent::Jump);
        assert_eq!(controller.state(), LocomotionState::Jump);
        assert!(!controller.is_crouching());
        assert_eq!(controller.movement().velocity.y, 10.0);
        assert_eq!(controller.capsule_geometry().unwrap().current_height, 1.8);
    }

    #[test]
    fn sliding_keeps_the_crouch() {
        let mut controller = controller();
        let world = ScriptedWorld::default();
        controller.handle_input(&world, InputEvent::CrouchActivated);
        controller.activate_sliding();
        controller.handle_input(&world, InputEvent::CrouchDeactivated);
        assert!(controller.is_crouching());

        controller.deactivate_sliding();
        controller.handle_input(&world, InputEvent::CrouchDeactivated);
        assert!(!controller.is_crouching());
    }

    #[test]
    fn sprint_and_walk_rules() {
        let mut controller = controller();
        let world = ScriptedWorld::default();

        controller.handle_input(&world, InputEvent::WalkToggled);
        assert!(controller.is_walking());

        controller.handle_input(&world, InputEvent::SprintActivated);
        assert!(controller.is_sprinting());
        assert!(!controller.is_walking());
        assert!(!controller.rotation().is_strafing);

        controller.handle_input(&world, InputEvent::WalkToggled);
        assert!(!controller.is_walking());

        controller.handle_input(&world, InputEvent::SprintDeactivated);
        assert!(!controller.is_sprinting());
        assert!(controller.rotation().is_strafing);

        controller.handle_input(&world, InputEvent::CrouchActivated);
        controller.handle_input(&world, InputEvent::SprintActivated);
        assert!(!controller.is_sprinting());
    }

    #[test]
    fn moving_forward_runs_and_writes_channels() {
        let mut controller = controller();
        let world = ScriptedWorld::default();
        controller.input_mut().set_move([0.0, 1.0]);
        for _ in 0..60 {
            controller.tick(&world, DT);
        }

        let movement = controller.movement();
        assert!((movement.speed_2d - 2.5).abs() < 1.0e-2);
        assert_eq!(movement.gait.ordinal(), 2);
        assert!(controller.movement_input().held);
        let position = controller.body().unwrap().position();
        assert!(position.z < -5.0);
        let facing = rotated_forward(&controller.body().unwrap().rotation());
        assert!((facing - forward()).norm() < 1.0e-4);

        let animator = animator(&controller);
        assert_eq!(animator.float(Channel::IsStrafing), Some(1.0));
        assert_eq!(animator.bool(Channel::MovementInputHeld), Some(true));
        assert_eq!(animator.float(Channel::MoveSpeed), Some(movement.speed_2d));
    }

    #[test]
    fn shutdown_ignores_further_events() {
        let mut controller = controller();
        let world = ScriptedWorld::default();
        controller.shutdown();
        controller.handle_input(&world, InputEvent::Jump);
        controller.tick(&world, DT);
        assert_eq!(controller.state(), LocomotionState::Locomotion);
        assert!(animator(&controller).is_empty());
        assert_eq!(controller.initialize(), Err(LocomotionError::Disabled));
    }

    #[test]
    fn non_positive_delta_time_is_skipped() {
        let mut controller = controller();
        controller.tick(&ScriptedWorld::default(), 0.0);
        assert!(animator(&controller).is_empty());
    }

    #[test]
    fn each_misuse_kind_is_reported_independently() {
        let parts = LocomotionParts::new(
            FreeBody::standing(),
            FixedCamera::default(),
            ParameterMap::new(),
        );
        let mut controller: TestController =
            LocomotionController::new(LocomotionConfig::default(), parts);
        let world = ScriptedWorld::default();

        controller.tick(&world, DT);
        assert!(controller.diagnostic_logged(Diagnostic::TickBeforeInitialize));
        assert!(!controller.diagnostic_logged(Diagnostic::InvalidDeltaTime));

        controller.initialize().unwrap();
        controller.tick(&world, -1.0);
        assert!(controller.diagnostic_logged(Diagnostic::InvalidDeltaTime));
        assert!(!controller.diagnostic_logged(Diagnostic::MissingCollaborators));

        controller.camera = None;
        controller.tick(&world, DT);
        assert!(controller.diagnostic_logged(Diagnostic::MissingCollaborators));
        assert_eq!(controller.core.elapsed, 0.0);
    }

    #[test]
    fn crouch_falls_when_ground_disappears() {
        let mut controller = controller();
        let world = ScriptedWorld::default();
        controller.handle_input(&world, InputEvent::CrouchActivated);
        controller.tick(&world, DT);
        assert_eq!(controller.state(), LocomotionState::Crouch);
        assert_eq!(controller.capsule_geometry().unwrap().current_height, 1.2);

        world.airborne.set(true);
        controller.tick(&world, DT);
        assert_eq!(controller.state(), LocomotionState::Fall);
        assert!(!controller.is_crouching());
        assert_eq!(controller.capsule_geometry().unwrap().current_height, 1.8);
    }

    #[test]
    fn crouch_falls_and_stands_even_under_a_ceiling() {
        let mut controller = controller();
        let world = ScriptedWorld::default();
        controller.handle_input(&world, InputEvent::CrouchActivated);
        controller.tick(&world, DT);
        assert_eq!(controller.state(), LocomotionState::Crouch);

        world.ceiling.set(true);
        world.airborne.set(true);
        controller.tick(&world, DT);
        assert_eq!(controller.state(), LocomotionState::Fall);
        assert!(!controller.is_crouching());
        assert!(!controller.capsule().unwrap().is_crouching());
        assert_eq!(controller.capsule_geometry().unwrap().current_height, 1.8);
    }

    #[test]
    fn crouch_without_crouch_intent_returns_to_locomotion() {
        let mut controller = controller();
        let world = ScriptedWorld::default();
        controller.handle_input(&world, InputEvent::CrouchActivated);
        controller.tick(&world, DT);
        assert_eq!(controller.state(), LocomotionState::Crouch);

        // Key still held but the crouch flag was cleared behind the state's back.
        controller.core.is_crouching = false;
        assert!(controller.core.crouch_key_pressed);
        controller.tick(&world, DT);
        assert_eq!(controller.state(), LocomotionState::Locomotion);
        assert!(!controller.capsule().unwrap().is_crouching());
        assert_eq!(controller.capsule_geometry().unwrap().current_height, 1.8);
    }

    #[test]
    fn walk_toggle_is_ignored_while_airborne() {
        let mut controller = controller();
        let world = ScriptedWorld::default();
        controller.body_mut().unwrap().position.y = 50.0;
        world.airborne.set(true);
        controller.tick(&world, DT);
        assert_eq!(controller.state(), LocomotionState::Fall);
        assert!(!controller.is_grounded());

        controller.handle_input(&world, InputEvent::WalkToggled);
        assert!(!controller.is_walking());
    }

    #[test]
    fn airborne_crouch_only_records_the_key() {
        let mut controller = controller();
        let world = ScriptedWorld::default();
        controller.body_mut().unwrap().position.y = 50.0;
        world.airborne.set(true);
        controller.tick(&world, DT);
        assert_eq!(controller.state(), LocomotionState::Fall);

        controller.handle_input(&world, InputEvent::CrouchActivated);
        assert!(controller.core.crouch_key_pressed);
        assert!(!controller.is_crouching());
        assert!(!controller.capsule().unwrap().is_crouching());
        assert_eq!(controller.capsule_geometry().unwrap().current_height, 1.8);
    }
}
