use bevy::math::Vec3;

use crate::VehicleError;

/// Number of wheels on every vehicle. Index order is fixed at construction
/// (front-left, front-right, rear-left, rear-right by convention).
pub const WHEEL_COUNT: usize = 4;

/// Static geometry and tuning of one wheel, in the chassis frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelSpec {
    /// Axle direction, unit length.
    pub axle: Vec3,
    pub suspension_rest_length: f32,
    pub suspension_stiffness: f32,
    pub max_suspension_travel: f32,
    /// Damping applied while the suspension compresses.
    pub damping_compression: f32,
    /// Damping applied while the suspension extends.
    pub damping_relaxation: f32,
    pub max_suspension_force: f32,
    /// Scale of the lateral grip force.
    pub side_friction_stiffness: f32,
    /// Grip budget as a multiple of the suspension force.
    pub friction_slip: f32,
}

impl Default for WheelSpec {
    fn default() -> Self {
        Self {
            axle: Vec3::X,
            suspension_rest_length: 0.125,
            suspension_stiffness: 24.0,
            max_suspension_travel: 0.125,
            damping_compression: 0.83,
            damping_relaxation: 0.88,
            max_suspension_force: 6000.0,
            side_friction_stiffness: 1.0,
            friction_slip: 10.5,
        }
    }
}

impl WheelSpec {
    pub fn validate(&self, index: usize) -> Result<(), VehicleError> {
        if !self.axle.is_finite() || self.axle.length_squared() < 1e-6 {
            return Err(VehicleError::invalid_tuning(format!(
                "wheel {index}: axle must be a non-zero vector"
            )));
        }
        if !(self.suspension_rest_length >= 0.0) {
            return Err(VehicleError::invalid_tuning(format!(
                "wheel {index}: suspension rest length must be >= 0"
            )));
        }
        if !(self.suspension_stiffness > 0.0) {
            return Err(VehicleError::invalid_tuning(format!(
                "wheel {index}: suspension stiffness must be > 0"
            )));
        }
        if !(self.max_suspension_travel >= 0.0) {
            return Err(VehicleError::invalid_tuning(format!(
                "wheel {index}: max suspension travel must be >= 0"
            )));
        }
        if !(self.max_suspension_force >= 0.0) {
            return Err(VehicleError::invalid_tuning(format!(
                "wheel {index}: max suspension force must be >= 0"
            )));
        }
        Ok(())
    }

    /// Length of the suspension ray cast each step.
    pub fn ray_length(&self) -> f32 {
        self.suspension_rest_length + self.max_suspension_travel
    }
}

/// A wheel's visual node as read from the scene at construction time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelNode {
    /// Position relative to the chassis.
    pub local_position: Vec3,
    /// Lowest point of the node's bounding box, in chassis units.
    pub min_y: f32,
    /// Highest point of the node's bounding box, in chassis units.
    pub max_y: f32,
}

impl WheelNode {
    /// Half the vertical extent of the bounding box.
    pub fn radius(&self) -> f32 {
        (self.max_y - self.min_y) * 0.5
    }
}

/// Where the renderer should place a wheel after a step.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WheelPose {
    /// Height in the chassis frame: attachment height minus compression.
    pub height: f32,
    /// Rotation about the chassis up axis, the steering angle.
    pub yaw: f32,
}

/// A wheel registered with a [`crate::VehicleController`], with its runtime state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Wheel {
    pub(crate) spec: WheelSpec,
    pub(crate) radius: f32,
    pub(crate) attachment: Vec3,

    pub(crate) compression: f32,
    pub(crate) steering: f32,
    pub(crate) engine_force: f32,
    pub(crate) in_contact: bool,

    pub(crate) contact_point: Vec3,
    pub(crate) contact_normal: Vec3,
    pub(crate) suspension_force: f32,
    pub(crate) longitudinal_force: f32,
    pub(crate) lateral_force: f32,
}

impl Wheel {
    /// Register a wheel at `attachment`. Until the first step the wheel hangs
    /// fully extended with no ground contact.
    pub(crate) fn new(attachment: Vec3, spec: WheelSpec, radius: f32) -> Self {
        Self {
            spec: WheelSpec {
                axle: spec.axle.normalize(),
                ..spec
            },
            radius,
            attachment,
            compression: spec.max_suspension_travel,
            steering: 0.0,
            engine_force: 0.0,
            in_contact: false,
            contact_point: attachment,
            contact_normal: Vec3::Y,
            suspension_force: 0.0,
            longitudinal_force: 0.0,
            lateral_force: 0.0,
        }
    }

    pub fn spec(&self) -> &WheelSpec {
        &self.spec
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Chassis-local attachment point.
    pub fn attachment(&self) -> Vec3 {
        self.attachment
    }

    /// Suspension compression, within `[0, max_suspension_travel]`.
    pub fn compression(&self) -> f32 {
        self.compression
    }

    pub fn steering(&self) -> f32 {
        self.steering
    }

    pub fn engine_force(&self) -> f32 {
        self.engine_force
    }

    pub fn in_contact(&self) -> bool {
        self.in_contact
    }

    /// World-space point where the suspension ray met the ground (or its far
    /// end when airborne).
    pub fn contact_point(&self) -> Vec3 {
        self.contact_point
    }

    pub fn contact_normal(&self) -> Vec3 {
        self.contact_normal
    }

    /// Suspension force applied last step.
    pub fn suspension_force(&self) -> f32 {
        self.suspension_force
    }

    /// Longitudinal force applied last step. Zero whenever the wheel is airborne.
    pub fn longitudinal_force(&self) -> f32 {
        self.longitudinal_force
    }

    pub fn lateral_force(&self) -> f32 {
        self.lateral_force
    }

    pub fn pose(&self) -> WheelPose {
        WheelPose {
            height: self.attachment.y - self.compression,
            yaw: self.steering,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_radius_is_half_vertical_extent() {
        let node = WheelNode {
            local_position: Vec3::ZERO,
            min_y: -0.3,
            max_y: 0.3,
        };
        assert!((node.radius() - 0.3).abs() < 1e-6);
    }

    #[test]
    fn validate_rejects_bad_tuning() {
        let spec = WheelSpec {
            suspension_stiffness: 0.0,
            ..Default::default()
        };
        assert!(spec.validate(0).is_err());

        let spec = WheelSpec {
            axle: Vec3::ZERO,
            ..Default::default()
        };
        assert!(spec.validate(1).is_err());

        let spec = WheelSpec {
            max_suspension_travel: f32::NAN,
            ..Default::default()
        };
        assert!(spec.validate(2).is_err());

        assert!(WheelSpec::default().validate(3).is_ok());
    }

    #[test]
    fn new_wheel_hangs_fully_extended() {
        let wheel = Wheel::new(Vec3::new(0.35, 0.3, -0.86), WheelSpec::default(), 0.2);
        assert!(!wheel.in_contact());
        assert_eq!(wheel.compression(), 0.125);
        assert!((wheel.pose().height - 0.175).abs() < 1e-6);
    }
}
