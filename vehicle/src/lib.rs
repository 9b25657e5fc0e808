//! Ray-cast vehicle physics: wheel model, vehicle controller and input binding.
//!
//! The crate owns no physics world. A vehicle reads the ground through a
//! [`GroundProbe`] and pushes its chassis through a [`ChassisBody`], so the same
//! controller runs against avian3d in the game and against fakes in tests.

pub mod binding;
pub mod controller;
pub mod error;
pub mod tuning;
pub mod wheel;
pub mod world;

pub use binding::{ControlBinding, InputSnapshot, TrickOutcome, attempt_trick};
pub use controller::{ChassisLink, VehicleController};
pub use error::VehicleError;
pub use tuning::{GroundFilter, VehicleTuning};
pub use wheel::{WHEEL_COUNT, Wheel, WheelNode, WheelPose, WheelSpec};
pub use world::{ChassisBody, ChassisState, GroundProbe, RayHit};
