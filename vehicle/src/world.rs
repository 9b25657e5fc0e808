//! The two seams between a vehicle and the physics engine that owns its chassis.
//!
//! The controller never constructs or advances the physics world. It asks a
//! [`GroundProbe`] for ray hits and commands a [`ChassisBody`]; the game binds
//! both to the engine's spatial queries and force accumulators.

use bevy::math::{Dir3, Quat, Vec3};

/// Nearest surface hit by a ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Distance from the ray origin along its direction.
    pub distance: f32,
    /// World-space surface normal at the hit.
    pub normal: Vec3,
}

/// Ray queries against the collision world.
///
/// Implementations decide which colliders count as ground (terrain only, any
/// solid surface, never the vehicle's own chassis).
pub trait GroundProbe {
    fn cast_ray(&self, origin: Vec3, direction: Dir3, max_distance: f32) -> Option<RayHit>;
}

/// Kinematic snapshot of the chassis rigid body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChassisState {
    pub position: Vec3,
    pub rotation: Quat,
    /// World-space center of mass.
    pub center_of_mass: Vec3,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
    pub mass: f32,
}

impl Default for ChassisState {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            center_of_mass: Vec3::ZERO,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            mass: 1.0,
        }
    }
}

impl ChassisState {
    /// Chassis forward axis in world space (local -Z).
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    /// Chassis up axis in world space (local +Y).
    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    /// Transform a chassis-local point into world space.
    pub fn to_world(&self, local: Vec3) -> Vec3 {
        self.position + self.rotation * local
    }

    /// Velocity of the body at a world-space point.
    pub fn velocity_at_point(&self, point: Vec3) -> Vec3 {
        self.linear_velocity + self.angular_velocity.cross(point - self.center_of_mass)
    }

    /// Linear velocity projected onto the forward axis.
    pub fn forward_speed(&self) -> f32 {
        self.linear_velocity.dot(self.forward())
    }
}

/// The chassis rigid body as seen by its controller.
///
/// The body is owned by the physics world. Forces accumulate for the current
/// step only; impulses change velocity immediately.
pub trait ChassisBody {
    fn state(&self) -> ChassisState;

    fn apply_force_at_point(&mut self, force: Vec3, point: Vec3);

    fn apply_impulse(&mut self, impulse: Vec3);

    fn apply_torque_impulse(&mut self, torque: Vec3);
}
