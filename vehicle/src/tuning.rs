use std::f32::consts::PI;
use std::path::Path;

use bevy::math::Vec3;
use serde::{Deserialize, Serialize};

use crate::VehicleError;
use crate::wheel::{WHEEL_COUNT, WheelSpec};

const BUILTIN: &str = include_str!("../assets/vehicle.toml");

/// Everything tunable about a vehicle, as stored in a TOML file.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct VehicleTuning {
    #[serde(default = "default_wheels")]
    pub wheels: Vec<WheelTuning>,
    #[serde(default)]
    pub drive: DriveTuning,
    #[serde(default)]
    pub trick: TrickTuning,
}

impl Default for VehicleTuning {
    fn default() -> Self {
        Self {
            wheels: default_wheels(),
            drive: DriveTuning::default(),
            trick: TrickTuning::default(),
        }
    }
}

fn default_wheels() -> Vec<WheelTuning> {
    vec![WheelTuning::default(); WHEEL_COUNT]
}

impl VehicleTuning {
    /// Load and validate a tuning file.
    pub fn load(path: &Path) -> Result<Self, VehicleError> {
        let text = std::fs::read_to_string(path).map_err(|source| VehicleError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, VehicleError> {
        let tuning: Self = toml::from_str(text)?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// The tuning shipped with the crate.
    pub fn builtin() -> Result<Self, VehicleError> {
        Self::from_toml_str(BUILTIN)
    }

    /// Save this tuning to a TOML file.
    pub fn save(&self, path: &Path) -> Result<(), VehicleError> {
        let text = toml::to_string_pretty(self)?;
        std::fs::write(path, text).map_err(|source| VehicleError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), VehicleError> {
        if self.wheels.len() != WHEEL_COUNT {
            return Err(VehicleError::invalid_tuning(format!(
                "expected {WHEEL_COUNT} wheels, found {}",
                self.wheels.len()
            )));
        }
        for (index, spec) in self.wheel_specs().iter().enumerate() {
            spec.validate(index)?;
        }
        self.drive.validate()?;
        self.trick.validate()
    }

    pub fn wheel_specs(&self) -> Vec<WheelSpec> {
        self.wheels.iter().map(WheelTuning::spec).collect()
    }
}

/// Serialized form of a [`WheelSpec`].
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct WheelTuning {
    pub axle: [f32; 3],
    pub suspension_rest_length: f32,
    pub suspension_stiffness: f32,
    pub max_suspension_travel: f32,
    pub damping_compression: f32,
    pub damping_relaxation: f32,
    pub max_suspension_force: f32,
    pub side_friction_stiffness: f32,
    pub friction_slip: f32,
}

impl Default for WheelTuning {
    fn default() -> Self {
        let spec = WheelSpec::default();
        Self {
            axle: spec.axle.to_array(),
            suspension_rest_length: spec.suspension_rest_length,
            suspension_stiffness: spec.suspension_stiffness,
            max_suspension_travel: spec.max_suspension_travel,
            damping_compression: spec.damping_compression,
            damping_relaxation: spec.damping_relaxation,
            max_suspension_force: spec.max_suspension_force,
            side_friction_stiffness: spec.side_friction_stiffness,
            friction_slip: spec.friction_slip,
        }
    }
}

impl WheelTuning {
    pub fn spec(&self) -> WheelSpec {
        WheelSpec {
            axle: Vec3::from_array(self.axle),
            suspension_rest_length: self.suspension_rest_length,
            suspension_stiffness: self.suspension_stiffness,
            max_suspension_travel: self.max_suspension_travel,
            damping_compression: self.damping_compression,
            damping_relaxation: self.damping_relaxation,
            max_suspension_force: self.max_suspension_force,
            side_friction_stiffness: self.side_friction_stiffness,
            friction_slip: self.friction_slip,
        }
    }
}

/// How player input becomes engine force and steering.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct DriveTuning {
    pub accelerate_force: f32,
    pub brake_force: f32,
    /// Full-lock steering angle in radians.
    pub steer_angle: f32,
    pub driven_wheels: Vec<usize>,
    pub steered_wheels: Vec<usize>,
    pub steering: SteeringResponse,
}

impl Default for DriveTuning {
    fn default() -> Self {
        Self {
            accelerate_force: 48.0,
            brake_force: 12.0,
            steer_angle: PI / 24.0,
            driven_wheels: vec![0, 1],
            steered_wheels: vec![0, 1],
            steering: SteeringResponse::default(),
        }
    }
}

impl DriveTuning {
    fn validate(&self) -> Result<(), VehicleError> {
        let wheels = self.driven_wheels.iter().chain(&self.steered_wheels);
        if let Some(index) = wheels.copied().find(|&i| i >= WHEEL_COUNT) {
            return Err(VehicleError::WheelIndexOutOfRange(index));
        }
        if !self.accelerate_force.is_finite() || !self.brake_force.is_finite() {
            return Err(VehicleError::invalid_tuning("drive forces must be finite"));
        }
        if !(self.steer_angle >= 0.0) || !self.steer_angle.is_finite() {
            return Err(VehicleError::invalid_tuning("steer angle must be >= 0"));
        }
        self.steering.validate()
    }
}

/// Smoothing applied to steering each frame.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SteeringResponse {
    /// Fixed blend per frame regardless of frame time.
    PerFrame { blend: f32 },
    /// Blend that equals `blend` at `reference_hz` and scales with frame time.
    TimeScaled {
        #[serde(default = "default_blend")]
        blend: f32,
        #[serde(default = "default_reference_hz")]
        reference_hz: f32,
    },
}

fn default_blend() -> f32 {
    0.5
}

fn default_reference_hz() -> f32 {
    60.0
}

impl Default for SteeringResponse {
    fn default() -> Self {
        Self::TimeScaled {
            blend: default_blend(),
            reference_hz: default_reference_hz(),
        }
    }
}

impl SteeringResponse {
    /// Fraction of the remaining distance to the target covered this frame.
    pub fn blend_factor(&self, dt: f32) -> f32 {
        match *self {
            Self::PerFrame { blend } => blend.clamp(0.0, 1.0),
            Self::TimeScaled {
                blend,
                reference_hz,
            } => {
                if !dt.is_finite() || dt <= 0.0 {
                    return 0.0;
                }
                let keep = (1.0 - blend.clamp(0.0, 1.0)).powf(dt * reference_hz);
                (1.0 - keep).clamp(0.0, 1.0)
            }
        }
    }

    pub fn smooth(&self, current: f32, target: f32, dt: f32) -> f32 {
        current + (target - current) * self.blend_factor(dt)
    }

    fn validate(&self) -> Result<(), VehicleError> {
        let (blend, reference_hz) = match *self {
            Self::PerFrame { blend } => (blend, 1.0),
            Self::TimeScaled {
                blend,
                reference_hz,
            } => (blend, reference_hz),
        };
        if !(0.0..=1.0).contains(&blend) {
            return Err(VehicleError::invalid_tuning(
                "steering blend must be within [0, 1]",
            ));
        }
        if !(reference_hz > 0.0) {
            return Err(VehicleError::invalid_tuning(
                "steering reference rate must be > 0",
            ));
        }
        Ok(())
    }
}

/// Which colliders the trick probe treats as ground.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GroundFilter {
    #[default]
    Terrain,
    AnySolid,
}

/// The hop-and-spin maneuver fired by the action input.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct TrickTuning {
    pub probe_length: f32,
    /// The chassis must be strictly further than this from the ground.
    pub min_distance: f32,
    /// The chassis must be strictly closer than this to the ground.
    pub max_distance: f32,
    pub impulse: [f32; 3],
    /// Upper bound (exclusive) of each random torque impulse component.
    pub max_torque_impulse: f32,
    pub ground_filter: GroundFilter,
}

impl Default for TrickTuning {
    fn default() -> Self {
        Self {
            probe_length: 2.0,
            min_distance: 0.15,
            max_distance: 1.5,
            impulse: [5.0, 30.0, 5.0],
            max_torque_impulse: 5.0,
            ground_filter: GroundFilter::default(),
        }
    }
}

impl TrickTuning {
    pub fn in_band(&self, distance: f32) -> bool {
        distance > self.min_distance && distance < self.max_distance
    }

    pub fn impulse(&self) -> Vec3 {
        Vec3::from_array(self.impulse)
    }

    fn validate(&self) -> Result<(), VehicleError> {
        if !(self.probe_length > 0.0) {
            return Err(VehicleError::invalid_tuning("trick probe length must be > 0"));
        }
        if !(self.min_distance < self.max_distance) {
            return Err(VehicleError::invalid_tuning(
                "trick min distance must be below max distance",
            ));
        }
        if !(self.max_torque_impulse >= 0.0) {
            return Err(VehicleError::invalid_tuning(
                "trick torque impulse must be >= 0",
            ));
        }
        Ok(())
    }
}
