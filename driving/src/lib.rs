//! The driving game: terrain, a ray-cast car, coins to collect and a chase
//! camera, assembled as a single Bevy plugin.

use std::time::Duration;

use bevy::prelude::*;
use vehicle::VehicleTuning;

pub mod audio;
pub mod camera;
pub mod car;
pub mod coins;
pub mod hud;
pub mod input;
pub mod physics;
pub mod scenery;
pub mod terrain;

/// Step of the fixed schedule that drives the vehicle.
pub const FIXED_STEP: f64 = 1.0 / 120.0;

#[derive(States, Default, Debug, Clone, PartialEq, Eq, Hash)]
pub enum GameState {
    /// World is spawned, waiting for the car's controller to resolve.
    #[default]
    Loading,
    Driving,
    Paused,
}

#[derive(Resource, Clone, Debug)]
pub struct Tuning(pub VehicleTuning);

pub struct DrivingPlugin {
    pub tuning: VehicleTuning,
}

impl Plugin for DrivingPlugin {
    fn build(&self, app: &mut App) {
        app.init_state::<GameState>()
            .insert_resource(Tuning(self.tuning.clone()))
            .init_resource::<terrain::TerrainSettings>()
            .init_resource::<coins::CoinSettings>()
            .init_resource::<coins::Credits>()
            .init_resource::<scenery::ScenerySettings>()
            .init_resource::<camera::CameraSettings>()
            .init_resource::<audio::EngineSettings>()
            .init_resource::<input::PlayerInput>()
            .insert_resource(Time::<Fixed>::from_duration(Duration::from_secs_f64(
                FIXED_STEP,
            )))
            .add_systems(
                Startup,
                (
                    terrain::spawn_terrain,
                    (coins::spawn_coins, scenery::spawn_trees),
                )
                    .chain(),
            )
            .add_systems(
                Startup,
                (
                    car::spawn_car,
                    camera::spawn_camera,
                    hud::spawn_hud,
                    audio::spawn_engine_sound,
                ),
            )
            // Physics only steps while driving
            .add_systems(OnEnter(GameState::Loading), physics::pause_physics)
            .add_systems(OnEnter(GameState::Driving), physics::unpause_physics)
            .add_systems(
                OnEnter(GameState::Paused),
                (physics::pause_physics, hud::show_paused),
            )
            .add_systems(OnExit(GameState::Paused), hud::hide_paused)
            .add_systems(
                Update,
                (
                    car::link_vehicles,
                    car::finish_loading.run_if(in_state(GameState::Loading)),
                )
                    .chain(),
            )
            .add_systems(
                Update,
                (
                    input::read_keyboard,
                    input::drive_vehicles.run_if(in_state(GameState::Driving)),
                )
                    .chain(),
            )
            .add_systems(Update, input::toggle_pause)
            .add_systems(
                Update,
                (
                    coins::spin_coins,
                    coins::collect_coins,
                    coins::animate_collected,
                )
                    .run_if(in_state(GameState::Driving)),
            )
            .add_systems(
                Update,
                (
                    car::sync_wheel_visuals,
                    camera::follow_car,
                    audio::update_engine_sound,
                    hud::update_hud,
                ),
            )
            .add_systems(
                FixedUpdate,
                car::update_vehicles.run_if(in_state(GameState::Driving)),
            )
            .add_observer(car::on_vehicle_removed);
    }
}
