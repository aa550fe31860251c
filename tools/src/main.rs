use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};

use character_collision::{CollisionProfile, KinematicCharacter};
use clap::{Parser, Subcommand, ValueEnum};
use physics_rapier::{CollisionLayer, PhysicsWorld};
use player_animation::{Channel, ParamValue, ParameterMap};
use player_camera::PlayerCamera;
use player_controller::{
    InputEvent, LocomotionConfig, LocomotionController, LocomotionParts, LocomotionState,
};
use rapier3d::prelude::*;

const EXIT_SUCCESS: i32 = 0;
const EXIT_USAGE: i32 = 2;
const EXIT_CONFIG: i32 = 10;
const EXIT_INIT: i32 = 11;
const EXIT_SCENARIO: i32 = 12;

const FLOOR_HALF_EXTENT: Real = 50.0;
const CROUCH_CEILING_Y: Real = 2.0;

type Controller = LocomotionController<KinematicCharacter, PlayerCamera, ParameterMap>;

#[derive(Parser)]
#[command(name = "locomotion", version, about = "First-person locomotion tools CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Smoke(SmokeArgs),
    Config(ConfigArgs),
}

#[derive(Parser)]
struct SmokeArgs {
    #[arg(long, value_enum)]
    scenario: Scenario,

    #[arg(long)]
    ticks: Option<u32>,

    #[arg(long, default_value_t = 60)]
    hz: u32,

    /// Height of a ceiling slab above the spawn point.
    #[arg(long)]
    ceiling: Option<Real>,

    /// Camera yaw rate in radians per second.
    #[arg(long, default_value_t = 0.0)]
    yaw_rate: Real,

    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Print every animator channel after the run.
    #[arg(long)]
    dump: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Scenario {
    Idle,
    Walk,
    Sprint,
    Jump,
    Crouch,
}

#[derive(Parser)]
struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand)]
enum ConfigCommand {
    Check {
        #[arg(long, value_name = "PATH")]
        path: PathBuf,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let exit_code = match cli.command {
        Commands::Smoke(args) => run_smoke(args),
        Commands::Config(args) => run_config(args),
    };
    std::process::exit(exit_code);
}

fn run_config(args: ConfigArgs) -> i32 {
    match args.command {
        ConfigCommand::Check { path } => config_check(&path),
    }
}

fn config_check(path: &Path) -> i32 {
    let config = match load_config(Some(path)) {
        Ok(config) => config,
        Err(code) => return code,
    };
    println!("config ok: {}", path.display());
    println!(
        "  motor: walk={} run={} sprint={}",
        config.motor.walk_speed, config.motor.run_speed, config.motor.sprint_speed
    );
    println!(
        "  capsule: stand={}/{} crouch={}/{}",
        config.capsule.standing_height,
        config.capsule.standing_center,
        config.capsule.crouching_height,
        config.capsule.crouching_center
    );
    println!(
        "  controller: jump_force={} hold_threshold={}",
        config.controller.jump_force, config.controller.button_hold_threshold
    );
    EXIT_SUCCESS
}

fn load_config(path: Option<&Path>) -> Result<LocomotionConfig, i32> {
    let Some(path) = path else {
        return Ok(LocomotionConfig::default());
    };
    LocomotionConfig::load(path).map_err(|err| {
        eprintln!("config load failed: {}", err);
        EXIT_CONFIG
    })
}

fn run_smoke(args: SmokeArgs) -> i32 {
    if args.hz == 0 {
        eprintln!("--hz must be positive");
        return EXIT_USAGE;
    }
    let config = match load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(code) => return code,
    };
    let ceiling = match (args.ceiling, args.scenario) {
        (Some(y), _) => Some(y),
        (None, Scenario::Crouch) => Some(CROUCH_CEILING_Y),
        (None, _) => None,
    };
    let world = build_world(ceiling);

    let body = KinematicCharacter::new(
        CollisionProfile::fps_default(),
        Isometry::translation(0.0, 0.05, 0.0),
    );
    let parts = LocomotionParts::new(body, PlayerCamera::default(), ParameterMap::new());
    let mut controller: Controller = LocomotionController::new(config, parts);
    let (sender, heights) = mpsc::channel();
    controller.on_height_changed(move |delta| {
        let _ = sender.send(delta);
    });
    if let Err(err) = controller.initialize() {
        eprintln!("controller init failed: {}", err);
        return EXIT_INIT;
    }

    let dt = 1.0 / args.hz as Real;
    let ticks = args.ticks.unwrap_or(default_ticks(args.scenario));
    let mut visited = Vec::new();
    for tick in 0..ticks {
        for event in scripted_events(args.scenario, tick) {
            controller.handle_input(&world, event);
        }
        if args.scenario != Scenario::Idle {
            controller.input_mut().set_move([0.0, 1.0]);
        }
        controller.tick(&world, dt);
        follow_camera(&mut controller, &heights, [args.yaw_rate * dt, 0.0], dt);

        let state = controller.state();
        if visited.last() != Some(&state) {
            log::info!("tick {}: {:?}", tick, state);
            visited.push(state);
        }
    }

    report(&controller, ticks);
    if args.dump {
        dump_channels(&controller);
    }

    match check_scenario(args.scenario, &controller, &visited) {
        Ok(()) => {
            println!("smoke {:?} ok", args.scenario);
            EXIT_SUCCESS
        }
        Err(reason) => {
            eprintln!("smoke {:?} failed: {}", args.scenario, reason);
            EXIT_SCENARIO
        }
    }
}

fn build_world(ceiling: Option<Real>) -> PhysicsWorld {
    let mut world = PhysicsWorld::new(vector![0.0, -9.81, 0.0]);
    let floor = ColliderBuilder::cuboid(FLOOR_HALF_EXTENT, 0.1, FLOOR_HALF_EXTENT)
        .translation(vector![0.0, -0.1, 0.0])
        .build();
    world.insert_static_collider(floor, CollisionLayer::Ground);
    if let Some(y) = ceiling {
        let slab = ColliderBuilder::cuboid(FLOOR_HALF_EXTENT, 0.1, FLOOR_HALF_EXTENT)
            .translation(vector![0.0, y, 0.0])
            .build();
        world.insert_static_collider(slab, CollisionLayer::Ceiling);
    }
    world.step(1.0 / 60.0);
    world
}

fn default_ticks(scenario: Scenario) -> u32 {
    match scenario {
        Scenario::Idle | Scenario::Walk | Scenario::Crouch => 60,
        Scenario::Sprint => 180,
        Scenario::Jump => 150,
    }
}

fn scripted_events(scenario: Scenario, tick: u32) -> Vec<InputEvent> {
    match (scenario, tick) {
        (Scenario::Walk, 0) => vec![InputEvent::WalkToggled],
        (Scenario::Sprint, 0) => vec![InputEvent::SprintActivated],
        (Scenario::Jump, 10) => vec![InputEvent::Jump],
        (Scenario::Crouch, 0) => vec![InputEvent::CrouchActivated],
        (Scenario::Crouch, 30) => vec![InputEvent::CrouchDeactivated],
        _ => Vec::new(),
    }
}

fn follow_camera(
    controller: &mut Controller,
    heights: &Receiver<Real>,
    look: [Real; 2],
    dt: Real,
) {
    let origin = controller
        .body()
        .map(|body| body.pose().translation.vector)
        .unwrap_or_else(Vector::zeros);
    let Some(camera) = controller.camera_mut() else {
        return;
    };
    for delta in heights.try_iter() {
        camera.on_height_changed(delta);
    }
    camera.apply_look_delta(look);
    camera.update_offsets(dt);
    camera.update_from_origin(origin);
}

fn report(controller: &Controller, ticks: u32) {
    let movement = controller.movement();
    println!("ticks: {}", ticks);
    println!("state: {:?}", controller.state());
    println!(
        "gait: {:?} speed_2d={:.3} velocity=({:.3}, {:.3}, {:.3})",
        movement.gait,
        movement.speed_2d,
        movement.velocity.x,
        movement.velocity.y,
        movement.velocity.z
    );
    if let Some(body) = controller.body() {
        let position = body.pose().translation.vector;
        println!(
            "position: ({:.3}, {:.3}, {:.3})",
            position.x, position.y, position.z
        );
    }
    if let Some(camera) = controller.camera() {
        println!(
            "camera: height_offset={:.3} forward_offset={:.3}",
            camera.height_offset(),
            camera.forward_offset()
        );
    }
    println!(
        "flags: grounded={} crouching={} sprinting={} walking={}",
        controller.is_grounded(),
        controller.is_crouching(),
        controller.is_sprinting(),
        controller.is_walking()
    );
}

fn dump_channels(controller: &Controller) {
    let Some(animator) = controller.animator() else {
        return;
    };
    for channel in Channel::ALL {
        match animator.get(channel) {
            Some(ParamValue::Float(value)) => println!("{:>28} {:.3}", channel.name(), value),
            Some(ParamValue::Bool(value)) => println!("{:>28} {}", channel.name(), value),
            Some(ParamValue::Int(value)) => println!("{:>28} {}", channel.name(), value),
            None => println!("{:>28} -", channel.name()),
        }
    }
}

fn check_scenario(
    scenario: Scenario,
    controller: &Controller,
    visited: &[LocomotionState],
) -> Result<(), String> {
    let state = controller.state();
    let gait = controller.movement().gait;
    match scenario {
        Scenario::Idle => {
            if !controller.signals().is_stopped {
                return Err("idle character is not stopped".to_string());
            }
        }
        Scenario::Walk => {
            if gait.ordinal() != 1 {
                return Err(format!("expected walk gait, got {:?}", gait));
            }
        }
        Scenario::Sprint => {
            if gait.ordinal() != 3 {
                return Err(format!("expected sprint gait, got {:?}", gait));
            }
        }
        Scenario::Jump => {
            let jumped = visited.contains(&LocomotionState::Jump);
            let fell = visited.contains(&LocomotionState::Fall);
            if !jumped || !fell || state != LocomotionState::Locomotion {
                return Err(format!("jump did not land: {:?}", visited));
            }
        }
        Scenario::Crouch => {
            if controller.capsule().is_some() && !visited.contains(&LocomotionState::Crouch) {
                return Err(format!("never crouched: {:?}", visited));
            }
        }
    }
    Ok(())
}
