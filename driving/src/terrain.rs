use std::f32::consts::TAU;

use avian3d::prelude::*;
use bevy::{
    asset::RenderAssetUsages,
    mesh::{Indices, PrimitiveTopology},
    prelude::*,
};
use noise::{Fbm, MultiFractal, NoiseFn, Simplex};
use rand::Rng;

use crate::physics::GameLayer;

#[derive(Resource, Clone, Debug)]
pub struct TerrainSettings {
    /// Extent along X.
    pub width: f32,
    /// Extent along Z.
    pub depth: f32,
    pub columns: usize,
    pub rows: usize,
    pub amplitude: f32,
    pub frequency: f64,
    pub seed: u32,
    /// Radius around the origin kept flat for spawning.
    pub flat_radius: f32,
}

impl Default for TerrainSettings {
    fn default() -> Self {
        Self {
            width: 1000.0,
            depth: 500.0,
            columns: 100,
            rows: 50,
            amplitude: 0.9,
            frequency: 0.04,
            seed: 0x5EED,
            flat_radius: 6.0,
        }
    }
}

/// Height field shared by the terrain mesh, its collider and coin placement.
#[derive(Resource, Clone)]
pub struct Terrain {
    settings: TerrainSettings,
    noise: Fbm<Simplex>,
}

impl Terrain {
    pub fn new(settings: TerrainSettings) -> Self {
        let noise = Fbm::<Simplex>::new(settings.seed)
            .set_octaves(4)
            .set_frequency(settings.frequency);
        Self { settings, noise }
    }

    pub fn height(&self, x: f32, z: f32) -> f32 {
        let sample = self.noise.get([x as f64, z as f64]) as f32;
        let r = self.settings.flat_radius;
        let falloff = smoothstep(r, r * 2.0, Vec2::new(x, z).length());
        sample * self.settings.amplitude * falloff
    }

    pub fn contains(&self, x: f32, z: f32) -> bool {
        x.abs() <= self.settings.width * 0.5 && z.abs() <= self.settings.depth * 0.5
    }

    fn cell_size(&self) -> Vec2 {
        Vec2::new(
            self.settings.width / self.settings.columns as f32,
            self.settings.depth / self.settings.rows as f32,
        )
    }

    /// Grid vertices, column-major: vertex `(c, r)` is at `c * (rows + 1) + r`.
    pub fn vertices(&self) -> Vec<Vec3> {
        let cell = self.cell_size();
        let x0 = -self.settings.width * 0.5;
        let z0 = -self.settings.depth * 0.5;

        let mut vertices = Vec::with_capacity((self.settings.columns + 1) * (self.settings.rows + 1));
        for c in 0..=self.settings.columns {
            for r in 0..=self.settings.rows {
                let x = x0 + c as f32 * cell.x;
                let z = z0 + r as f32 * cell.y;
                vertices.push(Vec3::new(x, self.height(x, z), z));
            }
        }
        vertices
    }

    pub fn triangles(&self) -> Vec<[u32; 3]> {
        let stride = (self.settings.rows + 1) as u32;
        let mut triangles = Vec::with_capacity(self.settings.columns * self.settings.rows * 2);
        for c in 0..self.settings.columns as u32 {
            for r in 0..self.settings.rows as u32 {
                let v00 = c * stride + r;
                let v01 = v00 + 1;
                let v10 = v00 + stride;
                let v11 = v10 + 1;
                triangles.push([v00, v01, v10]);
                triangles.push([v10, v01, v11]);
            }
        }
        triangles
    }

    fn normals(&self, vertices: &[Vec3]) -> Vec<[f32; 3]> {
        let columns = self.settings.columns;
        let rows = self.settings.rows;
        let at = |c: usize, r: usize| vertices[c * (rows + 1) + r];

        let mut normals = Vec::with_capacity(vertices.len());
        for c in 0..=columns {
            for r in 0..=rows {
                let (left, right) = (at(c.saturating_sub(1), r), at((c + 1).min(columns), r));
                let (back, front) = (at(c, r.saturating_sub(1)), at(c, (r + 1).min(rows)));
                let slope_x = (right.y - left.y) / (right.x - left.x);
                let slope_z = (front.y - back.y) / (front.z - back.z);
                normals.push(Vec3::new(-slope_x, 1.0, -slope_z).normalize().to_array());
            }
        }
        normals
    }

    pub fn mesh(&self) -> Mesh {
        let vertices = self.vertices();
        let normals = self.normals(&vertices);
        let uvs: Vec<[f32; 2]> = vertices
            .iter()
            .map(|v| {
                [
                    v.x / self.settings.width + 0.5,
                    v.z / self.settings.depth + 0.5,
                ]
            })
            .collect();
        let positions: Vec<[f32; 3]> = vertices.iter().map(|v| v.to_array()).collect();
        let indices: Vec<u32> = self.triangles().into_iter().flatten().collect();

        let mut mesh = Mesh::new(PrimitiveTopology::TriangleList, RenderAssetUsages::default());
        mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, positions);
        mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, normals);
        mesh.insert_attribute(Mesh::ATTRIBUTE_UV_0, uvs);
        mesh.insert_indices(Indices::U32(indices));
        mesh
    }

    /// Static collider over the same triangles as [`Terrain::mesh`].
    pub fn collider(&self) -> Collider {
        Collider::trimesh(self.vertices(), self.triangles())
    }
}

/// Uniformly random angle, radius uniform in `[min_radius, max_radius)`.
pub fn scatter(rng: &mut impl Rng, min_radius: f32, max_radius: f32) -> Vec2 {
    let angle = rng.random::<f32>() * TAU;
    let radius = min_radius + rng.random::<f32>() * (max_radius - min_radius);
    Vec2::from_angle(angle) * radius
}

fn smoothstep(edge0: f32, edge1: f32, value: f32) -> f32 {
    if edge1 <= edge0 {
        return if value < edge0 { 0.0 } else { 1.0 };
    }
    let x = ((value - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    x * x * (3.0 - 2.0 * x)
}

pub fn spawn_terrain(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    settings: Res<TerrainSettings>,
) {
    let terrain = Terrain::new(settings.clone());

    commands.spawn((
        Name::new("Terrain"),
        Mesh3d(meshes.add(terrain.mesh())),
        MeshMaterial3d(materials.add(Color::srgb(0.36, 0.52, 0.28))),
        Transform::default(),
        RigidBody::Static,
        terrain.collider(),
        CollisionLayers::new(GameLayer::Terrain, LayerMask::ALL),
    ));

    info!(
        width = settings.width,
        depth = settings.depth,
        seed = settings.seed,
        "terrain spawned"
    );
    commands.insert_resource(terrain);
}
