use std::f32::consts::{FRAC_PI_2, TAU};

use avian3d::prelude::*;
use bevy::camera::primitives::MeshAabb;
use bevy::prelude::*;
use vehicle::{
    ChassisLink, ControlBinding, VehicleController, WHEEL_COUNT, WheelNode, WheelPose,
};

use crate::physics::{AvianChassis, GameLayer, SpatialGround, suspension_filter};
use crate::{GameState, Tuning};

pub const SPAWN_POSITION: Vec3 = Vec3::new(0.0, 1.0, 0.0);

/// Wheel attachment points in the chassis frame, front-left first.
pub const WHEEL_POSITIONS: [Vec3; WHEEL_COUNT] = [
    Vec3::new(-0.35, -0.25, -0.86),
    Vec3::new(0.35, -0.25, -0.86),
    Vec3::new(-0.35, -0.25, 0.76),
    Vec3::new(0.35, -0.25, 0.76),
];

const WHEEL_RADIUS: f32 = 0.2;
const WHEEL_WIDTH: f32 = 0.16;
const CHASSIS_SIZE: Vec3 = Vec3::new(0.6, 0.3, 1.9);
const CHASSIS_OFFSET: Vec3 = Vec3::new(0.0, 0.1, 0.0);
const CHASSIS_MASS: f32 = 3.0;

#[derive(Component)]
pub struct Car;

/// Wheel node, a child of the chassis. Placed at the suspension end and
/// turned by steering. The index matches the controller's wheel order.
#[derive(Component, Clone, Copy, Debug)]
pub struct WheelSlot(pub usize);

/// Wheel mesh under a [`WheelSlot`], resting on the node and spinning about
/// its axle.
#[derive(Component)]
pub struct WheelHub;

/// Visual roll of a wheel hub about its axle, in radians.
#[derive(Component, Clone, Copy, Debug, Default, PartialEq)]
pub struct WheelSpin {
    pub angle: f32,
    /// Radians per second.
    pub rate: f32,
}

/// Spin rate an airborne wheel keeps per 1/60 s.
const AIRBORNE_SPIN_DECAY: f32 = 0.99;

impl WheelSpin {
    /// Rolls with the chassis while grounded; coasts down while airborne.
    pub fn step(self, in_contact: bool, forward_speed: f32, radius: f32, dt: f32) -> Self {
        if !dt.is_finite() || dt <= 0.0 || radius <= 0.0 {
            return self;
        }
        let rate = if in_contact {
            forward_speed / radius
        } else {
            self.rate * AIRBORNE_SPIN_DECAY.powf(dt * 60.0)
        };
        Self {
            angle: (self.angle + rate * dt).rem_euclid(TAU),
            rate,
        }
    }
}

/// Wheel node and hub entities in controller order, set once the controller
/// exists.
#[derive(Component, Debug)]
pub struct WheelEntities {
    pub nodes: [Entity; WHEEL_COUNT],
    pub hubs: [Entity; WHEEL_COUNT],
}

/// Chassis whose controller could not be built. Never retried.
#[derive(Component)]
pub struct VehicleFailed;

pub fn spawn_car(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let body_material = materials.add(Color::srgb(0.12, 0.56, 1.0));
    let wheel_material = materials.add(Color::srgb(0.08, 0.08, 0.08));
    let wheel_mesh = meshes.add(
        Mesh::from(Cylinder::new(WHEEL_RADIUS, WHEEL_WIDTH))
            .rotated_by(Quat::from_rotation_z(FRAC_PI_2)),
    );

    commands
        .spawn((
            Name::new("Car"),
            Car,
            Transform::from_translation(SPAWN_POSITION),
            Visibility::default(),
            RigidBody::Dynamic,
            LinearDamping(0.5),
            SleepingDisabled,
            Mass(CHASSIS_MASS),
            NoAutoMass,
            CenterOfMass(Vec3::ZERO),
            NoAutoCenterOfMass,
        ))
        .with_children(|parent| {
            parent.spawn((
                Collider::cuboid(CHASSIS_SIZE.x, CHASSIS_SIZE.y, CHASSIS_SIZE.z),
                CollisionLayers::new(GameLayer::Vehicle, [GameLayer::Default, GameLayer::Terrain]),
                Mesh3d(meshes.add(Cuboid::from_size(CHASSIS_SIZE))),
                MeshMaterial3d(body_material),
                Transform::from_translation(CHASSIS_OFFSET),
            ));

            for (index, position) in WHEEL_POSITIONS.into_iter().enumerate() {
                parent
                    .spawn((
                        WheelSlot(index),
                        Transform::from_translation(position),
                        Visibility::default(),
                    ))
                    .with_child((
                        WheelHub,
                        WheelSpin::default(),
                        Mesh3d(wheel_mesh.clone()),
                        MeshMaterial3d(wheel_material.clone()),
                        Transform::from_xyz(0.0, WHEEL_RADIUS, 0.0),
                    ));
            }
        });
}

/// Vertical bounds of a wheel node's hub mesh, in the node's frame.
fn hub_bounds(hub: &Transform, mesh: &Mesh) -> Option<(f32, f32)> {
    let aabb = mesh.compute_aabb()?;
    let center = hub.translation.y + aabb.center.y * hub.scale.y;
    let half = aabb.half_extents.y * hub.scale.y.abs();
    Some((center - half, center + half))
}

/// Read the wheel nodes under a chassis, in slot order. `None` while any slot
/// or hub is missing or a hub mesh is not loaded yet.
fn resolve_wheel_nodes(
    children: &Children,
    slots: &Query<(&WheelSlot, &Transform, &Children)>,
    hubs: &Query<(&Transform, &Mesh3d), With<WheelHub>>,
    meshes: &Assets<Mesh>,
) -> Option<([WheelNode; WHEEL_COUNT], WheelEntities)> {
    let mut found: [Option<(WheelNode, Entity, Entity)>; WHEEL_COUNT] = [None; WHEEL_COUNT];

    for node in children.iter() {
        let Ok((slot, transform, node_children)) = slots.get(node) else {
            continue;
        };
        let (hub, (hub_transform, mesh)) = node_children
            .iter()
            .find_map(|child| hubs.get(child).ok().map(|hub| (child, hub)))?;
        let (min_y, max_y) = hub_bounds(hub_transform, meshes.get(&mesh.0)?)?;
        if let Some(entry) = found.get_mut(slot.0) {
            *entry = Some((
                WheelNode {
                    local_position: transform.translation,
                    min_y,
                    max_y,
                },
                node,
                hub,
            ));
        }
    }

    let mut resolved = [WheelNode {
        local_position: Vec3::ZERO,
        min_y: 0.0,
        max_y: 0.0,
    }; WHEEL_COUNT];
    let mut entities = WheelEntities {
        nodes: [Entity::PLACEHOLDER; WHEEL_COUNT],
        hubs: [Entity::PLACEHOLDER; WHEEL_COUNT],
    };
    for (index, entry) in found.into_iter().enumerate() {
        let (node, node_entity, hub_entity) = entry?;
        resolved[index] = node;
        entities.nodes[index] = node_entity;
        entities.hubs[index] = hub_entity;
    }
    Some((resolved, entities))
}

/// Build controllers for chassis that do not have one yet.
pub fn link_vehicles(
    mut commands: Commands,
    tuning: Res<Tuning>,
    meshes: Res<Assets<Mesh>>,
    chassis_query: Query<
        (Entity, Option<&Children>),
        (With<Car>, Without<VehicleController>, Without<VehicleFailed>),
    >,
    slots: Query<(&WheelSlot, &Transform, &Children)>,
    hubs: Query<(&Transform, &Mesh3d), With<WheelHub>>,
) {
    let specs = tuning.0.wheel_specs();

    for (chassis, children) in &chassis_query {
        let resolved = children
            .and_then(|children| resolve_wheel_nodes(children, &slots, &hubs, &meshes));
        let (nodes, entities) = resolved.unzip();
        let nodes = nodes.as_ref().map(|nodes| nodes.as_slice());

        match VehicleController::try_new(Some(ChassisLink(chassis)), nodes, &specs) {
            Ok(Some(controller)) => {
                let mut entity = commands.entity(chassis);
                entity.insert((
                    controller,
                    ControlBinding::new(tuning.0.drive.clone(), tuning.0.trick.clone()),
                ));
                if let Some(entities) = entities {
                    entity.insert(entities);
                }
            }
            Ok(None) => {}
            Err(err) => {
                error!(?chassis, "vehicle construction failed: {err}");
                commands.entity(chassis).insert(VehicleFailed);
            }
        }
    }
}

pub fn finish_loading(
    ready: Query<(), (With<Car>, With<VehicleController>)>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    if !ready.is_empty() {
        next_state.set(GameState::Driving);
    }
}

pub fn update_vehicles(
    time: Res<Time>,
    spatial: SpatialQuery,
    mut vehicles: Query<(
        Entity,
        &mut VehicleController,
        Forces,
        &Position,
        &Rotation,
        &ComputedMass,
        &ComputedCenterOfMass,
    )>,
) {
    let dt = time.delta_secs();
    for (entity, mut controller, mut forces, position, rotation, mass, center_of_mass) in
        &mut vehicles
    {
        let ground = SpatialGround::new(&spatial, suspension_filter(entity));
        let mut chassis = AvianChassis::new(&mut forces, position, rotation, mass, center_of_mass);
        controller.update(dt, &mut chassis, &ground);
    }
}

fn node_transform(attachment: Vec3, pose: WheelPose) -> Transform {
    Transform::from_xyz(attachment.x, pose.height, attachment.z)
        .with_rotation(Quat::from_rotation_y(pose.yaw))
}

fn hub_rotation(spin: WheelSpin) -> Quat {
    Quat::from_rotation_x(-spin.angle)
}

pub fn sync_wheel_visuals(
    time: Res<Time>,
    state: Res<State<GameState>>,
    vehicles: Query<(&VehicleController, &WheelEntities)>,
    mut nodes: Query<&mut Transform, (With<WheelSlot>, Without<WheelHub>)>,
    mut hubs: Query<(&mut Transform, &mut WheelSpin), (With<WheelHub>, Without<WheelSlot>)>,
) {
    // Wheels stop rolling while the simulation is halted.
    let dt = if *state.get() == GameState::Driving {
        time.delta_secs()
    } else {
        0.0
    };

    for (controller, entities) in &vehicles {
        let poses = controller.wheel_poses();
        for (index, (wheel, pose)) in controller.wheels().iter().zip(poses).enumerate() {
            if let Ok(mut transform) = nodes.get_mut(entities.nodes[index]) {
                *transform = node_transform(wheel.attachment(), pose);
            }
            if let Ok((mut transform, mut spin)) = hubs.get_mut(entities.hubs[index]) {
                *spin = spin.step(
                    wheel.in_contact(),
                    controller.forward_speed(),
                    wheel.radius(),
                    dt,
                );
                transform.rotation = hub_rotation(*spin);
            }
        }
    }
}

pub fn on_vehicle_removed(remove: On<Remove, VehicleController>) {
    info!(chassis = ?remove.entity, "vehicle controller removed");
}
