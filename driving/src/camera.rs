use bevy::prelude::*;

use crate::car::{Car, SPAWN_POSITION};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChaseSettings {
    /// Camera position relative to the chassis, in the chassis frame.
    pub offset: Vec3,
    pub min_height: f32,
    /// Position smoothing rate per second.
    pub position_rate: f32,
    /// Look-at smoothing rate per second.
    pub target_rate: f32,
    pub target_lift: f32,
}

impl Default for ChaseSettings {
    fn default() -> Self {
        Self {
            offset: Vec3::new(0.0, 3.0, 7.0),
            min_height: 3.0,
            position_rate: 3.0,
            target_rate: 5.0,
            target_lift: 0.25,
        }
    }
}

/// Smoothed camera state, advanced once per frame.
#[derive(Component, Clone, Copy, Debug, PartialEq)]
pub struct ChaseCamera {
    pub position: Vec3,
    pub target: Vec3,
}

impl ChaseCamera {
    pub fn step(self, settings: &ChaseSettings, chassis: &Transform, dt: f32) -> Self {
        let mut desired = chassis.transform_point(settings.offset);
        desired.y = desired.y.max(settings.min_height);
        let target = chassis.translation + Vec3::Y * settings.target_lift;

        Self {
            position: self
                .position
                .lerp(desired, (settings.position_rate * dt).clamp(0.0, 1.0)),
            target: self
                .target
                .lerp(target, (settings.target_rate * dt).clamp(0.0, 1.0)),
        }
    }

    pub fn transform(&self) -> Transform {
        Transform::from_translation(self.position).looking_at(self.target, Vec3::Y)
    }
}

#[derive(Resource, Default)]
pub struct CameraSettings(pub ChaseSettings);

pub fn spawn_camera(mut commands: Commands, settings: Res<CameraSettings>) {
    let rig = ChaseCamera {
        position: SPAWN_POSITION + settings.0.offset,
        target: SPAWN_POSITION,
    };
    commands.spawn((Camera3d::default(), rig.transform(), rig));

    commands.spawn((
        DirectionalLight {
            illuminance: 10_000.0,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_xyz(30.0, 60.0, 20.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));
}

pub fn follow_car(
    time: Res<Time>,
    settings: Res<CameraSettings>,
    car: Query<&Transform, (With<Car>, Without<ChaseCamera>)>,
    mut cameras: Query<(&mut ChaseCamera, &mut Transform)>,
) {
    let Ok(chassis) = car.single() else {
        return;
    };
    for (mut rig, mut transform) in &mut cameras {
        *rig = rig.step(&settings.0, chassis, time.delta_secs());
        *transform = rig.transform();
    }
}

#[cfg(test)]
mod tests {
    use bevy::prelude::*;

    use super::{ChaseCamera, ChaseSettings};

    fn settled(chassis: &Transform) -> ChaseCamera {
        let settings = ChaseSettings::default();
        let mut rig = ChaseCamera {
            position: Vec3::ZERO,
            target: Vec3::ZERO,
        };
        for _ in 0..600 {
            rig = rig.step(&settings, chassis, 1.0 / 60.0);
        }
        rig
    }

    #[test]
    fn settles_behind_and_above_the_chassis() {
        let chassis = Transform::from_xyz(10.0, 0.0, -4.0);
        let rig = settled(&chassis);
        assert!((rig.position - Vec3::new(10.0, 3.0, 3.0)).length() < 1e-3);
        assert!((rig.target - Vec3::new(10.0, 0.25, -4.0)).length() < 1e-3);
    }

    #[test]
    fn offset_turns_with_the_chassis() {
        let chassis = Transform::from_rotation(Quat::from_rotation_y(std::f32::consts::FRAC_PI_2));
        let rig = settled(&chassis);
        assert!((rig.position - Vec3::new(7.0, 3.0, 0.0)).length() < 1e-3);
    }

    #[test]
    fn height_never_drops_below_minimum() {
        let chassis = Transform::from_rotation(Quat::from_rotation_x(std::f32::consts::PI));
        let rig = settled(&chassis);
        assert!(rig.position.y >= 3.0 - 1e-3);
    }

    #[test]
    fn large_frame_time_does_not_overshoot() {
        let settings = ChaseSettings::default();
        let rig = ChaseCamera {
            position: Vec3::ZERO,
            target: Vec3::ZERO,
        };
        let chassis = Transform::from_xyz(0.0, 0.0, -10.0);
        let next = rig.step(&settings, &chassis, 5.0);
        assert!((next.position - Vec3::new(0.0, 3.0, -3.0)).length() < 1e-5);
    }
}
