use std::f32::consts::{FRAC_PI_2, TAU};

use bevy::prelude::*;
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::car::Car;
use crate::terrain::{Terrain, scatter};

#[derive(Resource, Clone, Debug)]
pub struct CoinSettings {
    pub count: usize,
    /// Coins are scattered in a ring between these radii around the spawn.
    pub min_radius: f32,
    pub max_radius: f32,
    /// Height of a coin above the terrain surface.
    pub hover: f32,
    pub pickup_radius: f32,
    pub rise_height: f32,
    pub rise_duration: f32,
    pub spin_period: f32,
    pub seed: u64,
}

impl Default for CoinSettings {
    fn default() -> Self {
        Self {
            count: 40,
            min_radius: 6.0,
            max_radius: 80.0,
            hover: 1.0,
            pickup_radius: 1.5,
            rise_height: 20.0,
            rise_duration: 2.0,
            spin_period: 2.0,
            seed: 7,
        }
    }
}

#[derive(Resource, Default, Debug)]
pub struct Credits(pub u32);

#[derive(Component)]
pub struct Coin;

/// A coin on its way out. Removed once the rise finishes.
#[derive(Component)]
pub struct Collected {
    base_y: f32,
    elapsed: f32,
}

#[derive(Resource)]
pub struct CoinSound(pub Handle<AudioSource>);

pub fn coin_positions(terrain: &Terrain, settings: &CoinSettings, rng: &mut impl Rng) -> Vec<Vec3> {
    (0..settings.count)
        .map(|_| {
            let p = scatter(rng, settings.min_radius, settings.max_radius);
            Vec3::new(p.x, terrain.height(p.x, p.y) + settings.hover, p.y)
        })
        .collect()
}

pub fn within_pickup(car: Vec3, coin: Vec3, radius: f32) -> bool {
    car.distance(coin) < radius
}

/// Height of a collected coin `elapsed` seconds after pickup, and whether the
/// rise is over.
pub fn rise(base_y: f32, elapsed: f32, settings: &CoinSettings) -> (f32, bool) {
    let t = if settings.rise_duration > 0.0 {
        (elapsed / settings.rise_duration).clamp(0.0, 1.0)
    } else {
        1.0
    };
    (base_y + settings.rise_height * t, t >= 1.0)
}

pub fn spin_angle(seconds: f32, period: f32) -> f32 {
    if period <= 0.0 {
        return 0.0;
    }
    (seconds / period).fract() * TAU
}

pub fn spawn_coins(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    asset_server: Res<AssetServer>,
    terrain: Res<Terrain>,
    settings: Res<CoinSettings>,
) {
    let mesh = meshes.add(Cylinder::new(0.5, 0.08));
    let material = materials.add(StandardMaterial {
        base_color: Color::srgb(1.0, 0.8, 0.1),
        metallic: 0.9,
        perceptual_roughness: 0.3,
        ..default()
    });

    let mut rng = StdRng::seed_from_u64(settings.seed);
    let positions = coin_positions(&terrain, &settings, &mut rng);
    for position in &positions {
        commands.spawn((
            Coin,
            Mesh3d(mesh.clone()),
            MeshMaterial3d(material.clone()),
            Transform::from_translation(*position).with_rotation(Quat::from_rotation_x(FRAC_PI_2)),
        ));
    }

    commands.insert_resource(CoinSound(asset_server.load("sounds/coin_collected.ogg")));
    info!(count = positions.len(), "coins placed");
}

pub fn spin_coins(
    time: Res<Time>,
    settings: Res<CoinSettings>,
    mut coins: Query<&mut Transform, With<Coin>>,
) {
    let angle = spin_angle(time.elapsed_secs(), settings.spin_period);
    let rotation = Quat::from_rotation_y(angle) * Quat::from_rotation_x(FRAC_PI_2);
    for mut transform in &mut coins {
        transform.rotation = rotation;
    }
}

pub fn collect_coins(
    mut commands: Commands,
    settings: Res<CoinSettings>,
    sound: Option<Res<CoinSound>>,
    mut credits: ResMut<Credits>,
    car: Query<&Transform, With<Car>>,
    coins: Query<(Entity, &Transform), (With<Coin>, Without<Collected>, Without<Car>)>,
) {
    let Ok(car) = car.single() else {
        return;
    };
    for (entity, transform) in &coins {
        if !within_pickup(car.translation, transform.translation, settings.pickup_radius) {
            continue;
        }
        credits.0 += 1;
        commands.entity(entity).insert(Collected {
            base_y: transform.translation.y,
            elapsed: 0.0,
        });
        if let Some(sound) = &sound {
            commands.spawn((AudioPlayer::new(sound.0.clone()), PlaybackSettings::DESPAWN));
        }
        debug!(credits = credits.0, "coin collected");
    }
}

pub fn animate_collected(
    mut commands: Commands,
    time: Res<Time>,
    settings: Res<CoinSettings>,
    mut coins: Query<(Entity, &mut Transform, &mut Collected)>,
) {
    for (entity, mut transform, mut collected) in &mut coins {
        collected.elapsed += time.delta_secs();
        let (y, done) = rise(collected.base_y, collected.elapsed, &settings);
        transform.translation.y = y;
        if done {
            commands.entity(entity).despawn();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::PI;

    use bevy::prelude::*;
    use rand::{SeedableRng, rngs::StdRng};

    use super::{CoinSettings, coin_positions, rise, spin_angle, within_pickup};
    use crate::terrain::{Terrain, TerrainSettings};

    #[test]
    fn coins_land_in_the_ring_above_the_terrain() {
        let terrain = Terrain::new(TerrainSettings::default());
        let settings = CoinSettings::default();
        let positions = coin_positions(&terrain, &settings, &mut StdRng::seed_from_u64(3));

        assert_eq!(positions.len(), settings.count);
        for p in positions {
            let radius = Vec2::new(p.x, p.z).length();
            assert!(radius >= settings.min_radius - 1e-3);
            assert!(radius <= settings.max_radius + 1e-3);
            assert!((p.y - terrain.height(p.x, p.z) - settings.hover).abs() < 1e-5);
        }
    }

    #[test]
    fn placement_is_reproducible() {
        let terrain = Terrain::new(TerrainSettings::default());
        let settings = CoinSettings::default();
        let a = coin_positions(&terrain, &settings, &mut StdRng::seed_from_u64(11));
        let b = coin_positions(&terrain, &settings, &mut StdRng::seed_from_u64(11));
        assert_eq!(a, b);
    }

    #[test]
    fn pickup_radius_is_exclusive() {
        assert!(within_pickup(Vec3::ZERO, Vec3::new(1.4, 0.0, 0.0), 1.5));
        assert!(!within_pickup(Vec3::ZERO, Vec3::new(1.5, 0.0, 0.0), 1.5));
    }

    #[test]
    fn collected_coin_rises_then_finishes() {
        let settings = CoinSettings::default();
        assert_eq!(rise(1.0, 0.0, &settings), (1.0, false));
        assert_eq!(rise(1.0, 1.0, &settings), (11.0, false));
        assert_eq!(rise(1.0, 2.0, &settings), (21.0, true));
        assert_eq!(rise(1.0, 5.0, &settings), (21.0, true));
    }

    #[test]
    fn spin_completes_one_turn_per_period() {
        assert_eq!(spin_angle(0.0, 2.0), 0.0);
        assert!((spin_angle(1.0, 2.0) - PI).abs() < 1e-5);
        assert!(spin_angle(2.0, 2.0).abs() < 1e-5);
    }
}
