//! Player input to vehicle commands.

use bevy::ecs::component::Component;
use bevy::math::{Dir3, Vec3};
use rand::Rng;
use tracing::debug;

use crate::VehicleError;
use crate::controller::VehicleController;
use crate::tuning::{DriveTuning, TrickTuning};
use crate::world::{ChassisBody, GroundProbe};

/// Logical input held this frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputSnapshot {
    pub forward: bool,
    pub back: bool,
    pub left: bool,
    pub right: bool,
    pub action: bool,
}

fn pressed(held: bool) -> f32 {
    if held { 1.0 } else { 0.0 }
}

/// Result of pressing the action input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrickOutcome {
    Fired { distance: f32, torque: Vec3 },
    /// Nothing below the chassis within the probe length.
    NoGround,
    /// Ground found, but too close or too far for the maneuver.
    OutOfBand { distance: f32 },
}

/// Ties one vehicle to the player's input. Lives on the chassis entity and is
/// dropped with it.
#[derive(Component, Debug, Clone)]
pub struct ControlBinding {
    pub drive: DriveTuning,
    pub trick: TrickTuning,
    previous: InputSnapshot,
}

impl ControlBinding {
    pub fn new(drive: DriveTuning, trick: TrickTuning) -> Self {
        Self {
            drive,
            trick,
            previous: InputSnapshot::default(),
        }
    }

    /// `accelerate * forward - brake * back`.
    pub fn engine_force(&self, input: &InputSnapshot) -> f32 {
        self.drive.accelerate_force * pressed(input.forward)
            - self.drive.brake_force * pressed(input.back)
    }

    /// Steering the player is asking for, before smoothing. Left is positive.
    pub fn steer_target(&self, input: &InputSnapshot) -> f32 {
        self.drive.steer_angle * (pressed(input.left) - pressed(input.right))
    }

    /// Push this frame's input into the controller.
    ///
    /// Returns `true` when the action input was pressed this frame, having been
    /// released the frame before.
    pub fn apply(
        &mut self,
        controller: &mut VehicleController,
        input: InputSnapshot,
        dt: f32,
    ) -> Result<bool, VehicleError> {
        let engine = self.engine_force(&input);
        for &index in &self.drive.driven_wheels {
            controller.set_engine_force(index, engine)?;
        }

        let current = self
            .drive
            .steered_wheels
            .first()
            .and_then(|&index| controller.steering(index))
            .unwrap_or(0.0);
        let steering = self
            .drive
            .steering
            .smooth(current, self.steer_target(&input), dt);
        for &index in &self.drive.steered_wheels {
            controller.set_steering(index, steering)?;
        }

        let fire = input.action && !self.previous.action;
        self.previous = input;
        Ok(fire)
    }
}

/// Hop the chassis if it is close to, but not resting on, the ground.
pub fn attempt_trick(
    chassis: &mut impl ChassisBody,
    ground: &impl GroundProbe,
    tuning: &TrickTuning,
    rng: &mut impl Rng,
) -> TrickOutcome {
    let origin = chassis.state().position;
    let outcome = match ground.cast_ray(origin, Dir3::NEG_Y, tuning.probe_length) {
        None => TrickOutcome::NoGround,
        Some(hit) if !tuning.in_band(hit.distance) => TrickOutcome::OutOfBand {
            distance: hit.distance,
        },
        Some(hit) => {
            let torque = Vec3::new(
                rng.random::<f32>(),
                rng.random::<f32>(),
                rng.random::<f32>(),
            ) * tuning.max_torque_impulse;
            chassis.apply_impulse(tuning.impulse());
            chassis.apply_torque_impulse(torque);
            TrickOutcome::Fired {
                distance: hit.distance,
                torque,
            }
        }
    };
    debug!(?outcome, "trick attempted");
    outcome
}
