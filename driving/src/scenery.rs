//! Static trees scattered over the terrain. They are solid obstacles on the
//! default collision layer, so the suspension and `any_solid` trick probes
//! treat them as ground while the `terrain` probe ignores them.

use avian3d::prelude::*;
use bevy::prelude::*;
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::physics::GameLayer;
use crate::terrain::{Terrain, scatter};

#[derive(Resource, Clone, Debug)]
pub struct ScenerySettings {
    pub trees: usize,
    pub min_radius: f32,
    pub max_radius: f32,
    pub seed: u64,
}

impl Default for ScenerySettings {
    fn default() -> Self {
        Self {
            trees: 120,
            min_radius: 12.0,
            max_radius: 220.0,
            seed: 21,
        }
    }
}

#[derive(Component)]
pub struct Tree;

const TRUNK_RADIUS: f32 = 0.25;
const TRUNK_HEIGHT: f32 = 2.0;
const CROWN_RADIUS: f32 = 1.3;

/// Tree base positions with a scale factor each. Points outside the terrain
/// are dropped.
pub fn tree_layout(
    terrain: &Terrain,
    settings: &ScenerySettings,
    rng: &mut impl Rng,
) -> Vec<(Vec3, f32)> {
    (0..settings.trees)
        .filter_map(|_| {
            let p = scatter(rng, settings.min_radius, settings.max_radius);
            let scale = 0.7 + rng.random::<f32>() * 0.8;
            terrain
                .contains(p.x, p.y)
                .then(|| (Vec3::new(p.x, terrain.height(p.x, p.y), p.y), scale))
        })
        .collect()
}

pub fn spawn_trees(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    terrain: Res<Terrain>,
    settings: Res<ScenerySettings>,
) {
    let trunk_mesh = meshes.add(Cylinder::new(TRUNK_RADIUS, TRUNK_HEIGHT));
    let crown_mesh = meshes.add(Sphere::new(CROWN_RADIUS));
    let trunk_material = materials.add(Color::srgb(0.4, 0.26, 0.13));
    let crown_material = materials.add(Color::srgb(0.13, 0.45, 0.16));

    let mut rng = StdRng::seed_from_u64(settings.seed);
    let layout = tree_layout(&terrain, &settings, &mut rng);
    for (base, scale) in &layout {
        commands
            .spawn((
                Tree,
                Transform::from_translation(*base).with_scale(Vec3::splat(*scale)),
                Visibility::default(),
                RigidBody::Static,
            ))
            .with_children(|parent| {
                parent.spawn((
                    Mesh3d(trunk_mesh.clone()),
                    MeshMaterial3d(trunk_material.clone()),
                    Transform::from_xyz(0.0, TRUNK_HEIGHT * 0.5, 0.0),
                    Collider::cylinder(TRUNK_RADIUS, TRUNK_HEIGHT),
                    CollisionLayers::new(GameLayer::Default, LayerMask::ALL),
                ));
                parent.spawn((
                    Mesh3d(crown_mesh.clone()),
                    MeshMaterial3d(crown_material.clone()),
                    Transform::from_xyz(0.0, TRUNK_HEIGHT + CROWN_RADIUS * 0.6, 0.0),
                    Collider::sphere(CROWN_RADIUS),
                    CollisionLayers::new(GameLayer::Default, LayerMask::ALL),
                ));
            });
    }
    info!(count = layout.len(), "trees planted");
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::{ScenerySettings, tree_layout};
    use crate::terrain::{Terrain, TerrainSettings};

    #[test]
    fn trees_stay_on_the_terrain_and_off_the_spawn() {
        let terrain = Terrain::new(TerrainSettings {
            width: 100.0,
            depth: 60.0,
            columns: 10,
            rows: 6,
            ..Default::default()
        });
        let settings = ScenerySettings::default();
        let layout = tree_layout(&terrain, &settings, &mut StdRng::seed_from_u64(5));

        assert!(layout.len() < settings.trees);
        for (base, scale) in layout {
            assert!(terrain.contains(base.x, base.z));
            assert!(base.x.hypot(base.z) >= settings.min_radius - 1e-3);
            assert!((0.7..1.5).contains(&scale));
        }
    }
}
