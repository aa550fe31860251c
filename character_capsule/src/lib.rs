//! Crouch/stand capsule geometry with ceiling clearance checks.
#![forbid(unsafe_code)]

use std::cell::Cell;
use std::fmt;

use character_collision::{CapsuleShape, CharacterBody};
use physics_rapier::{CollisionLayer, LayerMask, PhysicsQuery};
use rapier3d::math::Vector;
use rapier3d::prelude::Real;
use serde::Deserialize;
use thiserror::Error;

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct CapsuleConfig {
    pub standing_height: Real,
    pub standing_center: Real,
    pub crouching_height: Real,
    pub crouching_center: Real,
    /// Extra headroom required above the standing capsule.
    pub ceiling_margin: Real,
    pub ceiling_layers: LayerMask,
}

impl Default for CapsuleConfig {
    fn default() -> Self {
        Self {
            standing_height: 1.8,
            standing_center: 0.93,
            crouching_height: 1.2,
            crouching_center: 0.6,
            ceiling_margin: 0.05,
            ceiling_layers: LayerMask::of(&[CollisionLayer::Ground, CollisionLayer::Ceiling]),
        }
    }
}

impl CapsuleConfig {
    fn standing(&self) -> CapsuleShape {
        CapsuleShape {
            height: self.standing_height,
            center: self.standing_center,
        }
    }

    fn crouching(&self) -> CapsuleShape {
        CapsuleShape {
            height: self.crouching_height,
            center: self.crouching_center,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CapsuleError {
    #[error("character body has no capsule geometry")]
    MissingGeometry,
}

/// Snapshot of the configured presets and the body's live capsule.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CapsuleGeometry {
    pub standing_height: Real,
    pub standing_center: Real,
    pub crouching_height: Real,
    pub crouching_center: Real,
    pub current_height: Real,
    pub current_center: Real,
    pub is_crouching: bool,
}

type HeightListener = Box<dyn FnMut(Real)>;

pub struct CapsuleController {
    config: CapsuleConfig,
    crouching: bool,
    listeners: Vec<HeightListener>,
    invalid_state_logged: Cell<bool>,
}

impl fmt::Debug for CapsuleController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapsuleController")
            .field("config", &self.config)
            .field("crouching", &self.crouching)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl CapsuleController {
    /// Binds to a body; fails when the body exposes no capsule.
    pub fn attach<B>(config: CapsuleConfig, body: &B) -> Result<Self, CapsuleError>
    where
        B: CharacterBody + ?Sized,
    {
        if body.capsule().is_none() {
            return Err(CapsuleError::MissingGeometry);
        }
        Ok(Self {
            config,
            crouching: false,
            listeners: Vec::new(),
            invalid_state_logged: Cell::new(false),
        })
    }

    pub fn config(&self) -> &CapsuleConfig {
        &self.config
    }

    pub fn is_crouching(&self) -> bool {
        self.crouching
    }

    /// Registers a listener receiving `new_height - previous_height` on every swap.
    pub fn on_height_changed(&mut self, listener: impl FnMut(Real) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn geometry<B>(&self, body: &B) -> Option<CapsuleGeometry>
    where
        B: CharacterBody + ?Sized,
    {
        let current = body.capsule()?;
        Some(CapsuleGeometry {
            standing_height: self.config.standing_height,
            standing_center: self.config.standing_center,
            crouching_height: self.config.crouching_height,
            crouching_center: self.config.crouching_center,
            current_height: current.height,
            current_center: current.center,
            is_crouching: self.crouching,
        })
    }

    pub fn set_crouching<B>(&mut self, body: &mut B, crouch: bool)
    where
        B: CharacterBody + ?Sized,
    {
        if crouch == self.crouching {
            return;
        }
        let Some(previous) = body.capsule() else {
            self.log_invalid_state("set_crouching");
            return;
        };
        let next = if crouch {
            self.config.crouching()
        } else {
            self.config.standing()
        };
        body.set_capsule(next);
        self.crouching = crouch;
        let delta = next.height - previous.height;
        for listener in &mut self.listeners {
            listener(delta);
        }
    }

    /// `false` when standing up would push the capsule into ceiling geometry.
    pub fn can_stand_up<B>(&self, body: &B, world: &B::World) -> bool
    where
        B: CharacterBody + ?Sized,
    {
        if !self.crouching {
            return true;
        }
        let Some(current) = body.capsule() else {
            self.log_invalid_state("can_stand_up");
            return true;
        };
        let target_height = self.config.standing_height;
        if target_height <= current.height + 1.0e-3 {
            return true;
        }

        let radius = (body.radius() * 0.95).max(0.01);
        let center = body.position() + Vector::y() * current.center;
        let bottom = center.y - current.height * 0.5 + radius;
        let top = bottom + (target_height - 2.0 * radius);
        let extra = (target_height - current.height) + self.config.ceiling_margin;

        let start = Vector::new(center.x, bottom, center.z);
        let end = Vector::new(center.x, top + extra, center.z);
        !world.check_capsule(start, end, radius, self.config.ceiling_layers)
    }

    fn log_invalid_state(&self, operation: &str) {
        if !self.invalid_state_logged.replace(true) {
            log::error!("capsule controller: {operation} called without capsule geometry");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use character_collision::{CollisionProfile, KinematicCharacter};
    use physics_rapier::PhysicsWorld;
    use rapier3d::math::Rotation;
    use rapier3d::prelude::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct ScriptedWorld {
        ceiling: bool,
        queries: Cell<u32>,
    }

    impl ScriptedWorld {
        fn new(ceiling: bool) -> Self {
            Self {
                ceiling,
                queries: Cell::new(0),
            }
        }
    }

    impl PhysicsQuery for ScriptedWorld {
        fn check_sphere(&self, _: Vector<Real>, _: Real, _: LayerMask) -> bool {
            self.queries.set(self.queries.get() + 1);
            true
        }

        fn check_capsule(&self, _: Vector<Real>, _: Vector<Real>, _: Real, _: LayerMask) -> bool {
            self.queries.set(self.queries.get() + 1);
            self.ceiling
        }
    }

    struct StubBody {
        capsule: Option<CapsuleShape>,
    }

    impl StubBody {
        fn standing() -> Self {
            Self {
                capsule: Some(CapsuleShape {
                    height: 1.8,
                    center: 0.93,
                }),
            }
        }
    }

    impl CharacterBody for StubBody {
        type World = ScriptedWorld;

        fn position(&self) -> Vector<Real> {
            Vector::zeros()
        }

        fn rotation(&self) -> Rotation<Real> {
            Rotation::identity()
        }

        fn set_rotation(&mut self, _: Rotation<Real>) {}

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
            true
        }

        fn move_by(&mut self, _: &ScriptedWorld, _: Vector<Real>, _: Real) {}
    }

    #[test]
    fn attach_requires_capsule_geometry() {
        let body = StubBody { capsule: None };
        let err = CapsuleController::attach(CapsuleConfig::default(), &body).unwrap_err();
        assert_eq!(err, CapsuleError::MissingGeometry);
    }

    #[test]
    fn crouching_twice_notifies_once() {
        let mut body = StubBody::standing();
        let mut capsule = CapsuleController::attach(CapsuleConfig::default(), &body).unwrap();
        let deltas = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&deltas);
        capsule.on_height_changed(move |delta| sink.borrow_mut().push(delta));

        capsule.set_crouching(&mut body, true);
        capsule.set_crouching(&mut body, true);

        assert_eq!(deltas.borrow().len(), 1);
        assert!((deltas.borrow()[0] + 0.6).abs() < 1.0e-5);
        let shape = body.capsule().unwrap();
        assert_eq!(shape.height, 1.2);
        assert_eq!(shape.center, 0.6);

        capsule.set_crouching(&mut body, false);
        assert_eq!(deltas.borrow().len(), 2);
        assert!((deltas.borrow()[1] - 0.6).abs() < 1.0e-5);
        assert_eq!(body.capsule().unwrap().height, 1.8);
    }

    #[test]
    fn standing_never_queries_physics() {
        let body = StubBody::standing();
        let capsule = CapsuleController::attach(CapsuleConfig::default(), &body).unwrap();
        let world = ScriptedWorld::new(true);

        assert!(capsule.can_stand_up(&body, &world));
        assert_eq!(world.queries.get(), 0);
    }

    #[test]
    fn ceiling_blocks_standing_up() {
        let mut body = StubBody::standing();
        let mut capsule = CapsuleController::attach(CapsuleConfig::default(), &body).unwrap();
        capsule.set_crouching(&mut body, true);

        assert!(!capsule.can_stand_up(&body, &ScriptedWorld::new(true)));
        assert!(capsule.can_stand_up(&body, &ScriptedWorld::new(false)));
    }

    #[test]
    fn geometry_reports_live_capsule() {
        let mut body = StubBody::standing();
        let mut capsule = CapsuleController::attach(CapsuleConfig::default(), &body).unwrap();
        capsule.set_crouching(&mut body, true);

        let geometry = capsule.geometry(&body).unwrap();
        assert!(geometry.is_crouching);
        assert_eq!(geometry.current_height, geometry.crouching_height);
        assert_eq!(geometry.current_center, geometry.crouching_center);
    }

    #[test]
    fn config_parses_layer_names() {
        let config: CapsuleConfig = toml::from_str(
            r#"
            crouching_height = 1.0
            ceiling_layers = ["ceiling"]
            "#,
        )
        .unwrap();
        assert_eq!(config.crouching_height, 1.0);
        assert_eq!(config.standing_height, 1.8);
        assert!(config.ceiling_layers.contains(CollisionLayer::Ceiling));
        assert!(!config.ceiling_layers.contains(CollisionLayer::Ground));
    }

    #[test]
    fn rapier_ceiling_slab_blocks_stand_up() {
        let mut world = PhysicsWorld::new(vector![0.0, -9.81, 0.0]);
        let floor = ColliderBuilder::cuboid(5.0, 0.1, 5.0)
            .translation(vector![0.0, -0.1, 0.0])
            .build();
        world.insert_static_collider(floor, CollisionLayer::Ground);
        let slab = ColliderBuilder::cuboid(2.0, 0.1, 2.0)
            .translation(vector![0.0, 1.5, 0.0])
            .build();
        world.insert_static_collider(slab, CollisionLayer::Ceiling);
        world.step(1.0 / 60.0);

        let mut body = KinematicCharacter::new(
            CollisionProfile::fps_default(),
            Isometry::translation(0.0, 0.05, 0.0),
        );
        let mut capsule = CapsuleController::attach(CapsuleConfig::default(), &body).unwrap();
        capsule.set_crouching(&mut body, true);
        assert!(!capsule.can_stand_up(&body, &world));

        body.set_position(vector![4.0, 0.05, 4.0]);
        assert!(capsule.can_stand_up(&body, &world));
    }
}
