//! First-person movement motor: camera-relative velocity, gait and jump arc.
#![forbid(unsafe_code)]

use locomotion_math::{direction_difference_deg, flatten, lerp, round3};
use rapier3d::math::Vector;
use rapier3d::prelude::Real;
use serde::Deserialize;

const IDLE_SPEED: Real = 0.01;

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct FpsMotorConfig {
    pub walk_speed: Real,
    pub run_speed: Real,
    pub sprint_speed: Real,
    /// Rate at which horizontal velocity chases its target.
    pub speed_change_damping: Real,
    /// Rate at which the max speed chases the gait's target speed.
    pub max_speed_damping: Real,
    /// World gravity along `y`; also the floor for the fall arc.
    pub gravity: Real,
    pub gravity_multiplier: Real,
}

impl Default for FpsMotorConfig {
    fn default() -> Self {
        Self {
            walk_speed: 1.4,
            run_speed: 2.5,
            sprint_speed: 7.0,
            speed_change_damping: 10.0,
            max_speed_damping: 5.0,
            gravity: -9.81,
            gravity_multiplier: 2.0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Gait {
    #[default]
    Idle,
    Walk,
    Run,
    Sprint,
}

impl Gait {
    /// Ordinal written to the animator.
    pub fn ordinal(self) -> i32 {
        match self {
            Gait::Idle => 0,
            Gait::Walk => 1,
            Gait::Run => 2,
            Gait::Sprint => 3,
        }
    }

    /// Classifies `speed_2d` against the midpoints between configured speeds.
    pub fn classify(speed_2d: Real, config: &FpsMotorConfig) -> Gait {
        let run_threshold = (config.walk_speed + config.run_speed) / 2.0;
        let sprint_threshold = (config.run_speed + config.sprint_speed) / 2.0;
        if speed_2d < IDLE_SPEED {
            Gait::Idle
        } else if speed_2d < run_threshold {
            Gait::Walk
        } else if speed_2d < sprint_threshold {
            Gait::Run
        } else {
            Gait::Sprint
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct MotorFlags {
    pub grounded: bool,
    pub crouching: bool,
    pub sprinting: bool,
    pub walking: bool,
}

#[derive(Clone, Copy, Debug)]
pub struct MotorInput {
    pub move_axis: [Real; 2],
    /// Horizontal unit forward of the camera.
    pub camera_forward: Vector<Real>,
    /// Horizontal unit right of the camera.
    pub camera_right: Vector<Real>,
    pub body_forward: Vector<Real>,
}

/// Per-tick movement record read by rotation, animation and the state machine.
#[derive(Clone, Copy, Debug)]
pub struct MovementSample {
    pub move_direction: Vector<Real>,
    pub velocity: Vector<Real>,
    pub speed_2d: Real,
    pub gait: Gait,
    /// Signed angle in degrees from body forward to the move direction.
    pub direction_difference_angle: Real,
}

impl Default for MovementSample {
    fn default() -> Self {
        Self {
            move_direction: Vector::zeros(),
            velocity: Vector::zeros(),
            speed_2d: 0.0,
            gait: Gait::Idle,
            direction_difference_angle: 0.0,
        }
    }
}

pub struct FpsMotor {
    config: FpsMotorConfig,
    sample: MovementSample,
    current_max_speed: Real,
    target_max_speed: Real,
}

impl FpsMotor {
    pub fn new(config: FpsMotorConfig) -> Self {
        Self {
            config,
            sample: MovementSample::default(),
            current_max_speed: 0.0,
            target_max_speed: 0.0,
        }
    }

    pub fn config(&self) -> &FpsMotorConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut FpsMotorConfig {
        &mut self.config
    }

    pub fn sample(&self) -> &MovementSample {
        &self.sample
    }

    pub fn velocity(&self) -> Vector<Real> {
        self.sample.velocity
    }

    pub fn current_max_speed(&self) -> Real {
        self.current_max_speed
    }

    pub fn target_max_speed(&self) -> Real {
        self.target_max_speed
    }

    pub fn tick(&mut self, input: MotorInput, flags: MotorFlags, dt: Real) {
        let move_direction =
            input.camera_forward * input.move_axis[1] + input.camera_right * input.move_axis[0];

        if flags.grounded {
            self.target_max_speed = if flags.crouching {
                self.config.walk_speed
            } else if flags.sprinting {
                self.config.sprint_speed
            } else if flags.walking {
                self.config.walk_speed
            } else {
                self.config.run_speed
            };
        } else {
            self.target_max_speed = self.current_max_speed;
        }
        self.current_max_speed = lerp(
            self.current_max_speed,
            self.target_max_speed,
            self.config.max_speed_damping * dt,
        );

        let target = move_direction * self.current_max_speed;
        let blend = self.config.speed_change_damping * dt;
        let velocity = &mut self.sample.velocity;
        velocity.x = lerp(velocity.x, target.x, blend);
        velocity.z = lerp(velocity.z, target.z, blend);

        let speed_2d = round3(flatten(*velocity).norm());
        self.sample.move_direction = move_direction;
        self.sample.speed_2d = speed_2d;
        self.sample.direction_difference_angle =
            direction_difference_deg(input.body_forward, move_direction);
        self.sample.gait = Gait::classify(speed_2d, &self.config);
    }

    /// Integrates the jump/fall arc until vertical velocity reaches the gravity floor.
    pub fn apply_gravity(&mut self, dt: Real) {
        let gravity = self.config.gravity;
        if self.sample.velocity.y > gravity {
            self.sample.velocity.y += gravity * self.config.gravity_multiplier * dt;
        }
    }

    /// Displacement for this tick.
    pub fn translation(&self, dt: Real) -> Vector<Real> {
        self.sample.velocity * dt
    }

    pub fn set_velocity_y(&mut self, velocity_y: Real) {
        self.sample.velocity.y = velocity_y;
    }

    pub fn reset_y_velocity(&mut self) {
        self.sample.velocity.y = 0.0;
    }
}
