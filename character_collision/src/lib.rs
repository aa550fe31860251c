//! Physical character body: the capsule the locomotion core moves and resizes.
//!
//! Policy: collision/stepping must use Rapier KCC; do not reimplement step/slide logic.
#![forbid(unsafe_code)]

use locomotion_math::{rotated_forward, rotated_right};
use physics_rapier::{PhysicsQuery, PhysicsWorld};
use rapier3d::control::{CharacterAutostep, CharacterLength, KinematicCharacterController};
use rapier3d::math::{Isometry, Point, Rotation, UnitVector, Vector};
use rapier3d::prelude::{Capsule, QueryFilter, Ray, Real};

/// Capsule dimensions in the body's local frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CapsuleShape {
    /// Total height including both hemispheres.
    pub height: Real,
    /// Height of the capsule center above the feet.
    pub center: Real,
}

/// The engine-side body driven by the locomotion core.
///
/// `position` is the feet position; the capsule sits `capsule().center` above it.
pub trait CharacterBody {
    type World: PhysicsQuery + ?Sized;

    fn position(&self) -> Vector<Real>;
    fn rotation(&self) -> Rotation<Real>;
    fn set_rotation(&mut self, rotation: Rotation<Real>);
    fn radius(&self) -> Real;
    /// `None` when the body carries no resizable capsule geometry.
    fn capsule(&self) -> Option<CapsuleShape>;
    fn set_capsule(&mut self, shape: CapsuleShape);
    /// Grounded flag reported by the last `move_by`.
    fn is_grounded(&self) -> bool;
    fn move_by(&mut self, world: &Self::World, translation: Vector<Real>, dt: Real);

    fn forward(&self) -> Vector<Real> {
        rotated_forward(&self.rotation())
    }

    fn right(&self) -> Vector<Real> {
        rotated_right(&self.rotation())
    }
}

#[derive(Clone, Copy, Debug)]
pub struct CollisionProfile {
    /// Capsule radius in meters.
    pub capsule_radius: Real,
    /// Total capsule height in meters.
    pub capsule_height: Real,
    /// Capsule center height above the feet in meters.
    pub capsule_center: Real,
    /// Maximum step height for auto-stepping in meters.
    pub step_height: Real,
    /// Minimum width of free space required after stepping.
    pub step_min_width: Real,
    /// Maximum climbable slope angle in radians.
    pub max_slope_angle: Real,
    /// Minimum slope angle where sliding begins (>= max_slope_angle).
    pub min_slope_slide_angle: Real,
    /// Distance to snap to ground in meters.
    pub ground_snap_distance: Real,
    /// Small separation to preserve between character and environment.
    pub offset: Real,
    /// Small nudge applied along contact normals to prevent sticking.
    pub normal_nudge_factor: Real,
}

impl CollisionProfile {
    pub fn fps_default() -> Self {
        Self {
            capsule_radius: 0.3,
            capsule_height: 1.8,
            capsule_center: 0.93,
            step_height: 0.3,
            step_min_width: 0.15,
            max_slope_angle: 45.0_f32.to_radians(),
            min_slope_slide_angle: 50.0_f32.to_radians(),
            ground_snap_distance: 0.2,
            offset: 0.02,
            normal_nudge_factor: 1.0e-4,
        }
    }

    fn capsule(&self) -> Capsule {
        let half_segment = (self.capsule_height * 0.5 - self.capsule_radius).max(0.0);
        Capsule::new_y(half_segment, self.capsule_radius)
    }

    fn apply_to(&self, controller: &mut KinematicCharacterController) {
        controller.autostep = if self.step_height > 0.0 {
            Some(CharacterAutostep {
                max_height: CharacterLength::Absolute(self.step_height),
                min_width: CharacterLength::Absolute(self.step_min_width),
                include_dynamic_bodies: false,
            })
        } else {
            None
        };
        controller.max_slope_climb_angle = self.max_slope_angle;
        controller.min_slope_slide_angle = self.min_slope_slide_angle.max(self.max_slope_angle);
        controller.snap_to_ground = if self.ground_snap_distance > 0.0 {
            Some(CharacterLength::Absolute(self.ground_snap_distance))
        } else {
            None
        };
        controller.offset = CharacterLength::Absolute(self.offset);
        controller.normal_nudge_factor = self.normal_nudge_factor;
    }
}

/// Rapier KCC-backed body.
pub struct KinematicCharacter {
    profile: CollisionProfile,
    controller: KinematicCharacterController,
    capsule: Capsule,
    pose: Isometry<Real>,
    grounded: bool,
    ground_normal: Option<Vector<Real>>,
}

impl KinematicCharacter {
    pub fn new(profile: CollisionProfile, pose: Isometry<Real>) -> Self {
        let capsule = profile.capsule();
        let mut controller = KinematicCharacterController::default();
        profile.apply_to(&mut controller);
        Self {
            profile,
            controller,
            capsule,
            pose,
            grounded: false,
            ground_normal: None,
        }
    }

    pub fn profile(&self) -> CollisionProfile {
        self.profile
    }

    pub fn pose(&self) -> Isometry<Real> {
        self.pose
    }

    pub fn set_position(&mut self, position: Vector<Real>) {
        self.pose.translation.vector = position;
    }

    pub fn ground_normal(&self) -> Option<Vector<Real>> {
        self.ground_normal
    }

    pub fn capsule_shape(&self) -> &Capsule {
        &self.capsule
    }

    fn world_up(world: &PhysicsWorld) -> Vector<Real> {
        if world.gravity.norm_squared() > 1.0e-6 {
            -world.gravity.normalize()
        } else {
            Vector::y()
        }
    }

    fn capsule_pose(&self, feet: Vector<Real>) -> Isometry<Real> {
        let center = feet + Vector::y() * self.profile.capsule_center;
        Isometry::translation(center.x, center.y, center.z)
    }

    fn probe_ground(&self, world: &PhysicsWorld, feet: Vector<Real>) -> Option<Vector<Real>> {
        let snap_distance = self.profile.ground_snap_distance.max(0.0);
        if snap_distance <= 0.0 {
            return None;
        }
        let up = Self::world_up(world);
        // Use a smaller foot probe to stabilize grounding without wall bias.
        let foot_radius = self.profile.capsule_radius * 0.75;
        let foot_offset = -(self.profile.capsule_height * 0.5) + foot_radius;
        let foot_center = self.capsule_pose(feet).translation.vector + up * foot_offset;
        let ray = Ray::new(Point::from(foot_center), -up);
        let max_toi = foot_radius + snap_distance + self.profile.offset + 1.0e-3;
        let filter = QueryFilter::default().exclude_sensors();
        let (_, hit) = world.query_pipeline().cast_ray_and_get_normal(
            world.bodies(),
            world.colliders(),
            &ray,
            max_toi,
            true,
            filter,
        )?;
        let up_dot = hit.normal.dot(&up);
        if up_dot <= 0.0 || up_dot < self.controller.max_slope_climb_angle.cos() {
            return None;
        }
        Some(hit.normal)
    }
}

impl CharacterBody for KinematicCharacter {
    type World = PhysicsWorld;

    fn position(&self) -> Vector<Real> {
        self.pose.translation.vector
    }

    fn rotation(&self) -> Rotation<Real> {
        self.pose.rotation
    }

    fn set_rotation(&mut self, rotation: Rotation<Real>) {
        self.pose.rotation = rotation;
    }

    fn radius(&self) -> Real {
        self.profile.capsule_radius
    }

    fn capsule(&self) -> Option<CapsuleShape> {
        Some(CapsuleShape {
            height: self.profile.capsule_height,
            center: self.profile.capsule_center,
        })
    }

    fn set_capsule(&mut self, shape: CapsuleShape) {
        self.profile.capsule_height = shape.height;
        self.profile.capsule_center = shape.center;
        self.capsule = self.profile.capsule();
    }

    fn is_grounded(&self) -> bool {
        self.grounded
    }

    fn move_by(&mut self, world: &PhysicsWorld, translation: Vector<Real>, dt: Real) {
        let moving_up = translation.y > 0.0;
        let up = UnitVector::new_normalize(Self::world_up(world));
        self.controller.up = up;
        let original_autostep = self.controller.autostep;
        let original_snap = self.controller.snap_to_ground;
        if moving_up {
            self.controller.autostep = None;
            self.controller.snap_to_ground = None;
        }

        let feet = self.position();
        let output = self.controller.move_shape(
            dt,
            world.bodies(),
            world.colliders(),
            world.query_pipeline(),
            &self.capsule,
            &self.capsule_pose(feet),
            translation,
            QueryFilter::default().exclude_sensors(),
            |_| {},
        );
        self.controller.autostep = original_autostep;
        self.controller.snap_to_ground = original_snap;

        let next = feet + output.translation;
        self.pose.translation.vector = next;
        if moving_up {
            self.grounded = false;
            self.ground_normal = None;
            return;
        }
        self.ground_normal = self.probe_ground(world, next);
        self.grounded = output.grounded || self.ground_normal.is_some();
    }
}
