use std::path::{Path, PathBuf};

use character_capsule::CapsuleConfig;
use character_facing::FacingConfig;
use character_motor_fps::FpsMotorConfig;
use physics_rapier::{CollisionLayer, LayerMask};
use player_animation::AnimationConfig;
use rapier3d::prelude::Real;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid locomotion toml: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid locomotion config: {0}")]
    Invalid(String),
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Seconds of held movement input before a press counts as a hold.
    pub button_hold_threshold: Real,
    /// Ground probe offset; the probe center sits at `feet.y - grounded_offset`.
    pub grounded_offset: Real,
    /// Vertical velocity set on jump entry.
    pub jump_force: Real,
    pub ground_layers: LayerMask,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            button_hold_threshold: 0.15,
            grounded_offset: -0.14,
            jump_force: 10.0,
            ground_layers: LayerMask::of(&[CollisionLayer::Ground]),
        }
    }
}

/// Every locomotion tunable, one TOML table per component.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct LocomotionConfig {
    pub capsule: CapsuleConfig,
    pub motor: FpsMotorConfig,
    pub facing: FacingConfig,
    pub animation: AnimationConfig,
    pub controller: ControllerConfig,
}

impl LocomotionConfig {
    pub fn parse_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse_toml(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();
        let motor = &self.motor;
        if !(motor.walk_speed > 0.0
            && motor.walk_speed <= motor.run_speed
            && motor.run_speed <= motor.sprint_speed)
        {
            errors.push(format!(
                "speeds must satisfy 0 < walk <= run <= sprint (got {}, {}, {})",
                motor.walk_speed, motor.run_speed, motor.sprint_speed
            ));
        }
        let capsule = &self.capsule;
        if capsule.standing_height <= 0.0 || capsule.crouching_height <= 0.0 {
            errors.push("capsule heights must be > 0".to_string());
        } else if capsule.crouching_height > capsule.standing_height {
            errors.push("crouching_height must not exceed standing_height".to_string());
        }
        if !(self.controller.button_hold_threshold >= 0.0) {
            errors.push("button_hold_threshold must be >= 0".to_string());
        }
        if !(self.animation.max_rotation_rate > 0.0) {
            errors.push("max_rotation_rate must be > 0".to_string());
        }
        if !(self.animation.sprint_reference_speed > 0.0) {
            errors.push("sprint_reference_speed must be > 0".to_string());
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(errors.join("; ")))
        }
    }
}
