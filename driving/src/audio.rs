use bevy::{audio::Volume, prelude::*};
use vehicle::VehicleController;

use crate::car::Car;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EngineRamp {
    pub idle_volume: f32,
    pub max_volume: f32,
    pub idle_pitch: f32,
    pub max_pitch: f32,
    /// Forward speed at which volume and pitch peak.
    pub top_speed: f32,
    /// Fraction of the gap closed per second.
    pub rate: f32,
}

impl Default for EngineRamp {
    fn default() -> Self {
        Self {
            idle_volume: 0.15,
            max_volume: 0.6,
            idle_pitch: 0.8,
            max_pitch: 2.0,
            top_speed: 30.0,
            rate: 4.0,
        }
    }
}

/// Engine loop state. Volume and pitch ease toward values set by speed.
#[derive(Component, Clone, Copy, Debug, PartialEq)]
pub struct EngineSound {
    pub volume: f32,
    pub pitch: f32,
}

impl EngineSound {
    pub fn idle(ramp: &EngineRamp) -> Self {
        Self {
            volume: ramp.idle_volume,
            pitch: ramp.idle_pitch,
        }
    }

    pub fn step(self, ramp: &EngineRamp, forward_speed: f32, dt: f32) -> Self {
        let load = (forward_speed.abs() / ramp.top_speed).clamp(0.0, 1.0);
        let volume = ramp.idle_volume + (ramp.max_volume - ramp.idle_volume) * load;
        let pitch = ramp.idle_pitch + (ramp.max_pitch - ramp.idle_pitch) * load;
        let t = if dt.is_finite() {
            (ramp.rate * dt).clamp(0.0, 1.0)
        } else {
            0.0
        };

        Self {
            volume: self.volume + (volume - self.volume) * t,
            pitch: self.pitch + (pitch - self.pitch) * t,
        }
    }
}

#[derive(Resource, Default)]
pub struct EngineSettings(pub EngineRamp);

pub fn spawn_engine_sound(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    settings: Res<EngineSettings>,
) {
    let engine = EngineSound::idle(&settings.0);
    commands.spawn((
        Name::new("Engine"),
        AudioPlayer::new(asset_server.load("sounds/engine.ogg")),
        PlaybackSettings::LOOP.with_volume(Volume::Linear(engine.volume)),
        engine,
    ));
}

pub fn update_engine_sound(
    time: Res<Time>,
    settings: Res<EngineSettings>,
    car: Query<&VehicleController, With<Car>>,
    mut engines: Query<(&mut EngineSound, Option<&mut AudioSink>)>,
) {
    let speed = car.single().map_or(0.0, VehicleController::forward_speed);
    for (mut engine, sink) in &mut engines {
        *engine = engine.step(&settings.0, speed, time.delta_secs());
        if let Some(mut sink) = sink {
            sink.set_volume(Volume::Linear(engine.volume));
            sink.set_speed(engine.pitch);
        }
    }
}
