use avian3d::prelude::*;
use bevy::prelude::*;
use vehicle::{ControlBinding, InputSnapshot, VehicleController, attempt_trick};

use crate::GameState;
use crate::physics::{AvianChassis, SpatialGround, trick_filter};

/// This frame's logical input.
#[derive(Resource, Default, Debug)]
pub struct PlayerInput(pub InputSnapshot);

pub fn read_keyboard(keyboard: Res<ButtonInput<KeyCode>>, mut input: ResMut<PlayerInput>) {
    input.0 = InputSnapshot {
        forward: keyboard.any_pressed([KeyCode::KeyW, KeyCode::ArrowUp]),
        back: keyboard.any_pressed([KeyCode::KeyS, KeyCode::ArrowDown]),
        left: keyboard.any_pressed([KeyCode::KeyA, KeyCode::ArrowLeft]),
        right: keyboard.any_pressed([KeyCode::KeyD, KeyCode::ArrowRight]),
        action: keyboard.pressed(KeyCode::Space),
    };
}

pub fn drive_vehicles(
    time: Res<Time>,
    input: Res<PlayerInput>,
    spatial: SpatialQuery,
    mut vehicles: Query<(
        Entity,
        &mut VehicleController,
        &mut ControlBinding,
        Forces,
        &Position,
        &Rotation,
        &ComputedMass,
        &ComputedCenterOfMass,
    )>,
) {
    let dt = time.delta_secs();
    let mut rng = rand::rng();

    for (entity, mut controller, mut binding, mut forces, position, rotation, mass, center_of_mass) in
        &mut vehicles
    {
        match binding.apply(&mut controller, input.0, dt) {
            Ok(true) => {
                let ground = SpatialGround::new(
                    &spatial,
                    trick_filter(binding.trick.ground_filter, entity),
                );
                let mut chassis =
                    AvianChassis::new(&mut forces, position, rotation, mass, center_of_mass);
                attempt_trick(&mut chassis, &ground, &binding.trick, &mut rng);
            }
            Ok(false) => {}
            Err(err) => warn_once!("control binding rejected input: {err}"),
        }
    }
}

pub fn toggle_pause(
    keyboard: Res<ButtonInput<KeyCode>>,
    state: Res<State<GameState>>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    if !keyboard.just_pressed(KeyCode::Escape) {
        return;
    }
    match state.get() {
        GameState::Driving => next_state.set(GameState::Paused),
        GameState::Paused => next_state.set(GameState::Driving),
        GameState::Loading => {}
    }
}
