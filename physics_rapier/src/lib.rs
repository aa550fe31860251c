//! Rapier world setup, collision layers and the overlap query surface.
#![forbid(unsafe_code)]

use rapier3d::parry::shape::Shape;
use rapier3d::prelude::*;
use serde::Deserialize;

/// Named collision classification applied to static geometry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionLayer {
    Default,
    Ground,
    Ceiling,
}

impl CollisionLayer {
    fn group(self) -> Group {
        match self {
            CollisionLayer::Default => Group::GROUP_1,
            CollisionLayer::Ground => Group::GROUP_2,
            CollisionLayer::Ceiling => Group::GROUP_3,
        }
    }
}

/// Set of layers a query is allowed to hit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(from = "Vec<CollisionLayer>")]
pub struct LayerMask(u32);

impl LayerMask {
    pub const NONE: LayerMask = LayerMask(0);

    pub fn of(layers: &[CollisionLayer]) -> Self {
        layers
            .iter()
            .fold(Self::NONE, |mask, layer| mask.with(*layer))
    }

    pub fn with(self, layer: CollisionLayer) -> Self {
        LayerMask(self.0 | layer.group().bits())
    }

    pub fn contains(self, layer: CollisionLayer) -> bool {
        self.0 & layer.group().bits() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    fn query_groups(self) -> InteractionGroups {
        InteractionGroups::new(Group::ALL, Group::from_bits_truncate(self.0))
    }
}

impl From<Vec<CollisionLayer>> for LayerMask {
    fn from(layers: Vec<CollisionLayer>) -> Self {
        Self::of(&layers)
    }
}

/// Boolean overlap tests used for grounded and ceiling-clearance checks.
///
/// Trigger (sensor) geometry never counts as an overlap.
pub trait PhysicsQuery {
    fn check_sphere(&self, center: Vector<Real>, radius: Real, mask: LayerMask) -> bool;

    /// Capsule spanning the segment `start..end` inflated by `radius`.
    fn check_capsule(
        &self,
        start: Vector<Real>,
        end: Vector<Real>,
        radius: Real,
        mask: LayerMask,
    ) -> bool;
}

pub struct PhysicsWorld {
    pub gravity: Vector<Real>,
    integration_parameters: IntegrationParameters,
    pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: BroadPhaseMultiSap,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
}

impl PhysicsWorld {
    pub fn new(gravity: Vector<Real>) -> Self {
        Self {
            gravity,
            integration_parameters: IntegrationParameters::default(),
            pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: BroadPhaseMultiSap::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
        }
    }

    pub fn bodies(&self) -> &RigidBodySet {
        &self.bodies
    }

    pub fn colliders(&self) -> &ColliderSet {
        &self.colliders
    }

    pub fn query_pipeline(&self) -> &QueryPipeline {
        &self.query_pipeline
    }

    pub fn step(&mut self, dt: Real) {
        self.integration_parameters.dt = dt;
        let physics_hooks = ();
        let event_handler = ();
        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &physics_hooks,
            &event_handler,
        );
        self.query_pipeline.update(&self.colliders);
    }

    /// Inserts static geometry tagged with `layer`; queries see it after the next `step`.
    pub fn insert_static_collider(
        &mut self,
        mut collider: Collider,
        layer: CollisionLayer,
    ) -> ColliderHandle {
        collider.set_collision_groups(InteractionGroups::new(layer.group(), Group::ALL));
        self.colliders.insert(collider)
    }

    fn overlaps(&self, shape: &dyn Shape, pose: &Isometry<Real>, mask: LayerMask) -> bool {
        if mask.is_empty() {
            return false;
        }
        let filter = QueryFilter::default()
            .exclude_sensors()
            .groups(mask.query_groups());
        self.query_pipeline
            .intersection_with_shape(&self.bodies, &self.colliders, pose, shape, filter)
            .is_some()
    }
}

impl PhysicsQuery for PhysicsWorld {
    fn check_sphere(&self, center: Vector<Real>, radius: Real, mask: LayerMask) -> bool {
        let ball = Ball::new(radius);
        let pose = Isometry::translation(center.x, center.y, center.z);
        self.overlaps(&ball, &pose, mask)
    }

    fn check_capsule(
        &self,
        start: Vector<Real>,
        end: Vector<Real>,
        radius: Real,
        mask: LayerMask,
    ) -> bool {
        let capsule = Capsule::new(Point::from(start), Point::from(end), radius);
        self.overlaps(&capsule, &Isometry::identity(), mask)
    }
}
