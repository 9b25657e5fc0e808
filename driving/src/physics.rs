//! avian3d bindings for the vehicle's ground probe and chassis body.

use avian3d::prelude::{forces::ForcesItem, *};
use bevy::prelude::*;
use vehicle::{ChassisBody, ChassisState, GroundFilter, GroundProbe, RayHit};

#[derive(PhysicsLayer, Default, Clone, Copy, Debug)]
pub enum GameLayer {
    #[default]
    Default,
    Terrain,
    Vehicle,
}

/// Filter for suspension rays: every solid surface except the chassis itself.
pub fn suspension_filter(chassis: Entity) -> SpatialQueryFilter {
    SpatialQueryFilter::from_mask([GameLayer::Default, GameLayer::Terrain])
        .with_excluded_entities([chassis])
}

/// Filter for the trick probe. Vehicle colliders never count as ground.
pub fn trick_filter(policy: GroundFilter, chassis: Entity) -> SpatialQueryFilter {
    match policy {
        GroundFilter::Terrain => SpatialQueryFilter::from_mask(GameLayer::Terrain),
        GroundFilter::AnySolid => suspension_filter(chassis),
    }
}

pub struct SpatialGround<'a, 'w, 's> {
    query: &'a SpatialQuery<'w, 's>,
    filter: SpatialQueryFilter,
}

impl<'a, 'w, 's> SpatialGround<'a, 'w, 's> {
    pub fn new(query: &'a SpatialQuery<'w, 's>, filter: SpatialQueryFilter) -> Self {
        Self { query, filter }
    }
}

impl GroundProbe for SpatialGround<'_, '_, '_> {
    fn cast_ray(&self, origin: Vec3, direction: Dir3, max_distance: f32) -> Option<RayHit> {
        self.query
            .cast_ray(origin, direction, max_distance, true, &self.filter)
            .map(|hit| RayHit {
                distance: hit.distance,
                normal: hit.normal,
            })
    }
}

/// The chassis rigid body, seen through avian's force helpers.
pub struct AvianChassis<'a, 'w, 's> {
    forces: &'a mut ForcesItem<'w, 's>,
    state: ChassisState,
}

impl<'a, 'w, 's> AvianChassis<'a, 'w, 's> {
    pub fn new(
        forces: &'a mut ForcesItem<'w, 's>,
        position: &Position,
        rotation: &Rotation,
        mass: &ComputedMass,
        center_of_mass: &ComputedCenterOfMass,
    ) -> Self {
        let state = ChassisState {
            position: position.0,
            rotation: rotation.0,
            center_of_mass: position.0 + rotation.0 * center_of_mass.0,
            linear_velocity: forces.linear_velocity(),
            angular_velocity: forces.angular_velocity(),
            mass: mass.value(),
        };
        Self { forces, state }
    }
}

impl ChassisBody for AvianChassis<'_, '_, '_> {
    fn state(&self) -> ChassisState {
        self.state
    }

    fn apply_force_at_point(&mut self, force: Vec3, point: Vec3) {
        self.forces.apply_force_at_point(force, point);
    }

    fn apply_impulse(&mut self, impulse: Vec3) {
        self.forces.apply_linear_impulse(impulse);
    }

    fn apply_torque_impulse(&mut self, torque: Vec3) {
        self.forces.apply_angular_impulse(torque);
    }
}

pub fn pause_physics(mut physics_time: ResMut<Time<Physics>>) {
    physics_time.pause();
}

pub fn unpause_physics(mut physics_time: ResMut<Time<Physics>>) {
    physics_time.unpause();
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use avian3d::prelude::*;
    use bevy::{ecs::system::RunSystemOnce, prelude::*, time::TimeUpdateStrategy};
    use vehicle::{GroundFilter, GroundProbe};

    use super::{GameLayer, SpatialGround, suspension_filter, trick_filter};

    const ORIGIN: Vec3 = Vec3::new(0.0, 6.0, 0.0);

    /// Terrain slab (top at 0.1), an obstacle box (top at 2.5) and a vehicle
    /// hull (top at 4.5), stacked under `ORIGIN`. Returns the hull entity.
    fn stacked_world() -> (App, Entity) {
        let mut app = App::new();
        app.add_plugins((
            MinimalPlugins,
            TransformPlugin,
            AssetPlugin::default(),
            bevy::scene::ScenePlugin,
        ))
        .init_asset::<Mesh>()
        .add_plugins(PhysicsPlugins::default())
        .insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_secs_f32(
            1.0 / 60.0,
        )));

        app.world_mut().spawn((
            RigidBody::Static,
            Collider::cuboid(20.0, 0.2, 20.0),
            CollisionLayers::new(GameLayer::Terrain, LayerMask::ALL),
            Transform::default(),
        ));
        app.world_mut().spawn((
            RigidBody::Static,
            Collider::cuboid(1.0, 1.0, 1.0),
            CollisionLayers::new(GameLayer::Default, LayerMask::ALL),
            Transform::from_xyz(0.0, 2.0, 0.0),
        ));
        let hull = app
            .world_mut()
            .spawn((
                RigidBody::Static,
                Collider::cuboid(1.0, 1.0, 1.0),
                CollisionLayers::new(GameLayer::Vehicle, [GameLayer::Default, GameLayer::Terrain]),
                Transform::from_xyz(0.0, 4.0, 0.0),
            ))
            .id();

        app.finish();
        app.cleanup();
        for _ in 0..5 {
            app.update();
        }
        (app, hull)
    }

    fn ground_distance(app: &mut App, filter: SpatialQueryFilter) -> Option<f32> {
        app.world_mut()
            .run_system_once(move |spatial: SpatialQuery| {
                SpatialGround::new(&spatial, filter.clone())
                    .cast_ray(ORIGIN, Dir3::NEG_Y, 10.0)
                    .map(|hit| hit.distance)
            })
            .expect("ray cast system runs")
    }

    fn assert_distance(actual: Option<f32>, expected: f32) {
        let actual = actual.expect("ray should hit");
        assert!(
            (actual - expected).abs() < 1e-3,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn unfiltered_ray_meets_the_hull_first() {
        let (mut app, _) = stacked_world();
        assert_distance(ground_distance(&mut app, SpatialQueryFilter::default()), 1.5);
    }

    #[test]
    fn terrain_filter_ignores_obstacles() {
        let (mut app, hull) = stacked_world();
        let filter = trick_filter(GroundFilter::Terrain, hull);
        assert_distance(ground_distance(&mut app, filter), 5.9);
    }

    #[test]
    fn any_solid_filter_lands_on_obstacles() {
        let (mut app, hull) = stacked_world();
        let filter = trick_filter(GroundFilter::AnySolid, hull);
        assert_distance(ground_distance(&mut app, filter), 3.5);
    }

    #[test]
    fn suspension_rays_skip_vehicle_colliders() {
        let (mut app, hull) = stacked_world();
        assert_distance(ground_distance(&mut app, suspension_filter(hull)), 3.5);
        // The layer mask alone keeps vehicle colliders out.
        let other = suspension_filter(Entity::PLACEHOLDER);
        assert_distance(ground_distance(&mut app, other), 3.5);
    }
}
