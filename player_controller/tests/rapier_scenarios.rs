use std::sync::mpsc;

use character_collision::{CollisionProfile, KinematicCharacter};
use physics_rapier::{CollisionLayer, PhysicsWorld};
use player_animation::{Channel, ParameterMap};
use player_camera::PlayerCamera;
use player_controller::{
    InputEvent, LocomotionConfig, LocomotionController, LocomotionParts, LocomotionState,
};
use rapier3d::prelude::*;

type Controller = LocomotionController<KinematicCharacter, PlayerCamera, ParameterMap>;

fn world_with_ceiling(ceiling_y: Option<Real>) -> PhysicsWorld {
    let mut world = PhysicsWorld::new(vector![0.0, -9.81, 0.0]);
    let floor = ColliderBuilder::cuboid(20.0, 0.1, 20.0)
        .translation(vector![0.0, -0.1, 0.0])
        .build();
    world.insert_static_collider(floor, CollisionLayer::Ground);
    if let Some(y) = ceiling_y {
        let slab = ColliderBuilder::cuboid(3.0, 0.1, 3.0)
            .translation(vector![0.0, y, 0.0])
            .build();
        world.insert_static_collider(slab, CollisionLayer::Ceiling);
    }
    world.step(1.0 / 60.0);
    world
}

fn controller() -> Controller {
    let body = KinematicCharacter::new(
        CollisionProfile::fps_default(),
        Isometry::translation(0.0, 0.05, 0.0),
    );
    let parts = LocomotionParts::new(body, PlayerCamera::default(), ParameterMap::new());
    let mut controller = LocomotionController::new(LocomotionConfig::default(), parts);
    controller.initialize().expect("all collaborators present");
    controller
}

#[test]
fn idle_on_floor_is_stopped() {
    let world = world_with_ceiling(None);
    let mut controller = controller();
    controller.tick(&world, 1.0 / 60.0);

    assert_eq!(controller.state(), LocomotionState::Locomotion);
    assert!(controller.is_grounded());
    assert!(controller.signals().is_stopped);
    assert!(!controller.signals().is_starting);
    let animator = controller.animator().unwrap();
    assert_eq!(animator.int(Channel::CurrentGait), Some(0));
}

#[test]
fn running_forward_follows_camera() {
    let world = world_with_ceiling(None);
    let mut controller = controller();
    controller.input_mut().set_move([0.0, 1.0]);
    for _ in 0..60 {
        controller.tick(&world, 1.0 / 60.0);
    }

    assert_eq!(controller.state(), LocomotionState::Locomotion);
    assert_eq!(controller.movement().gait.ordinal(), 2);
    let position = controller.body().unwrap().pose().translation.vector;
    assert!(position.z < -1.0);
    assert!(position.y.abs() < 0.15);
}

#[test]
fn jump_impulse_integrates_one_tick() {
    let world = world_with_ceiling(None);
    let mut controller = controller();
    controller.handle_input(&world, InputEvent::Jump);
    controller.tick(&world, 0.1);

    assert_eq!(controller.state(), LocomotionState::Jump);
    assert!((controller.movement().velocity.y - 8.038).abs() < 1.0e-4);
    assert_eq!(
        controller.animator().unwrap().bool(Channel::IsJumping),
        Some(true)
    );
}

#[test]
fn jump_lands_back_in_locomotion() {
    let world = world_with_ceiling(None);
    let mut controller = controller();
    controller.handle_input(&world, InputEvent::Jump);

    let mut visited_fall = false;
    for _ in 0..240 {
        controller.tick(&world, 1.0 / 60.0);
        visited_fall |= controller.state() == LocomotionState::Fall;
        if visited_fall && controller.state() == LocomotionState::Locomotion {
            break;
        }
    }
    assert!(visited_fall);
    assert_eq!(controller.state(), LocomotionState::Locomotion);
}

#[test]
fn crouch_under_slab_stays_crouched() {
    let world = world_with_ceiling(Some(2.0));
    let mut controller = controller();
    let (sender, receiver) = mpsc::channel();
    controller.on_height_changed(move |delta| {
        let _ = sender.send(delta);
    });

    controller.handle_input(&world, InputEvent::CrouchActivated);
    controller.tick(&world, 1.0 / 60.0);
    assert_eq!(controller.state(), LocomotionState::Crouch);
    let delta = receiver.try_recv().expect("crouch emits a height delta");
    assert!((delta + 0.6).abs() < 1.0e-5);

    controller.handle_input(&world, InputEvent::CrouchDeactivated);
    for _ in 0..10 {
        controller.tick(&world, 1.0 / 60.0);
    }
    assert_eq!(controller.state(), LocomotionState::Crouch);
    assert!(controller.is_crouching());
    assert!(receiver.try_recv().is_err());
}
