use std::path::PathBuf;

use avian3d::prelude::*;
use bevy::{diagnostic::FrameTimeDiagnosticsPlugin, log::LogPlugin, prelude::*};
use driving::DrivingPlugin;
use vehicle::VehicleTuning;

/// Tuning file from the first argument, else `DRIVING_TUNING`, else the
/// built-in table.
fn tuning_path() -> Option<PathBuf> {
    std::env::args()
        .nth(1)
        .or_else(|| std::env::var("DRIVING_TUNING").ok())
        .map(PathBuf::from)
}

fn load_tuning() -> VehicleTuning {
    if let Some(path) = tuning_path() {
        match VehicleTuning::load(&path) {
            Ok(tuning) => {
                info!(path = %path.display(), "loaded vehicle tuning");
                return tuning;
            }
            Err(err) => warn!("{err}; using built-in tuning"),
        }
    }
    VehicleTuning::builtin().unwrap_or_else(|err| {
        error!("built-in tuning is invalid: {err}");
        VehicleTuning::default()
    })
}

fn main() {
    let mut app = App::new();
    app.add_plugins((
        DefaultPlugins
            .set(WindowPlugin {
                primary_window: Some(Window {
                    title: "Driving".into(),
                    ..default()
                }),
                ..default()
            })
            .set(LogPlugin {
                filter: "wgpu=error,naga=warn,vehicle=debug,driving=debug".into(),
                ..default()
            }),
        FrameTimeDiagnosticsPlugin::default(),
        PhysicsPlugins::default(),
    ));

    // Logging is up once DefaultPlugins is added.
    let tuning = load_tuning();
    app.add_plugins(DrivingPlugin { tuning }).run();
}
