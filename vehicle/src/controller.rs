use bevy::ecs::component::Component;
use bevy::ecs::entity::Entity;
use bevy::math::{Dir3, Quat, Vec3};
use tracing::{debug, info};

use crate::VehicleError;
use crate::wheel::{WHEEL_COUNT, Wheel, WheelNode, WheelPose, WheelSpec};
use crate::world::{ChassisBody, ChassisState, GroundProbe};

/// Fraction of the lateral contact velocity cancelled per step by tire grip.
const SIDE_CONTACT_DAMPING: f32 = 0.2;

/// Non-owning link to the chassis rigid body. The physics world owns the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChassisLink(pub Entity);

/// Ray-cast vehicle: four suspension rays, spring/damper forces, engine and
/// grip forces, all applied to a single chassis body.
#[derive(Component, Debug, Clone)]
pub struct VehicleController {
    chassis: ChassisLink,
    wheels: [Wheel; WHEEL_COUNT],
    forward_speed: f32,
}

impl VehicleController {
    /// Build a controller once the chassis and all wheel nodes are resolved.
    ///
    /// Returns `Ok(None)` while either reference is missing; the caller retries
    /// on the next opportunity. Degenerate wheel geometry is rejected outright.
    pub fn try_new(
        chassis: Option<ChassisLink>,
        nodes: Option<&[WheelNode]>,
        specs: &[WheelSpec],
    ) -> Result<Option<Self>, VehicleError> {
        let (Some(chassis), Some(nodes)) = (chassis, nodes) else {
            debug!("vehicle references unresolved, deferring construction");
            return Ok(None);
        };

        if nodes.len() != WHEEL_COUNT || specs.len() != WHEEL_COUNT {
            return Err(VehicleError::WheelCountMismatch {
                expected: WHEEL_COUNT,
                nodes: nodes.len(),
                specs: specs.len(),
            });
        }

        for (index, (node, spec)) in nodes.iter().zip(specs).enumerate() {
            let radius = node.radius();
            if !radius.is_finite() || radius <= 0.0 {
                return Err(VehicleError::DegenerateWheel { index, radius });
            }
            spec.validate(index)?;
        }

        let wheels = std::array::from_fn(|i| {
            let node = &nodes[i];
            Wheel::new(node.local_position, specs[i], node.radius())
        });

        info!(chassis = ?chassis.0, "vehicle controller constructed");
        Ok(Some(Self {
            chassis,
            wheels,
            forward_speed: 0.0,
        }))
    }

    pub fn chassis(&self) -> ChassisLink {
        self.chassis
    }

    pub fn wheels(&self) -> &[Wheel; WHEEL_COUNT] {
        &self.wheels
    }

    pub fn wheel(&self, index: usize) -> Option<&Wheel> {
        self.wheels.get(index)
    }

    fn wheel_mut(&mut self, index: usize) -> Result<&mut Wheel, VehicleError> {
        self.wheels
            .get_mut(index)
            .ok_or(VehicleError::WheelIndexOutOfRange(index))
    }

    /// Set the engine force for a wheel. Positive drives forward.
    pub fn set_engine_force(&mut self, index: usize, force: f32) -> Result<(), VehicleError> {
        self.wheel_mut(index)?.engine_force = force;
        Ok(())
    }

    /// Set the steering angle for a wheel, in radians. Positive steers left.
    pub fn set_steering(&mut self, index: usize, angle: f32) -> Result<(), VehicleError> {
        self.wheel_mut(index)?.steering = angle;
        Ok(())
    }

    pub fn steering(&self, index: usize) -> Option<f32> {
        self.wheels.get(index).map(Wheel::steering)
    }

    pub fn set_suspension_stiffness(
        &mut self,
        index: usize,
        stiffness: f32,
    ) -> Result<(), VehicleError> {
        if !(stiffness > 0.0) {
            return Err(VehicleError::invalid_tuning(
                "suspension stiffness must be > 0",
            ));
        }
        self.wheel_mut(index)?.spec.suspension_stiffness = stiffness;
        Ok(())
    }

    pub fn set_max_suspension_travel(
        &mut self,
        index: usize,
        travel: f32,
    ) -> Result<(), VehicleError> {
        if !(travel >= 0.0) {
            return Err(VehicleError::invalid_tuning(
                "max suspension travel must be >= 0",
            ));
        }
        let wheel = self.wheel_mut(index)?;
        wheel.spec.max_suspension_travel = travel;
        wheel.compression = wheel.compression.min(travel);
        Ok(())
    }

    /// Chassis velocity along its forward axis, as of the last step.
    pub fn forward_speed(&self) -> f32 {
        self.forward_speed
    }

    pub fn wheel_poses(&self) -> [WheelPose; WHEEL_COUNT] {
        std::array::from_fn(|i| self.wheels[i].pose())
    }

    pub fn wheels_in_contact(&self) -> usize {
        self.wheels.iter().filter(|wheel| wheel.in_contact).count()
    }

    /// Advance the vehicle by one physics step.
    ///
    /// Casts the suspension rays, then applies suspension, engine and grip
    /// forces to the chassis. Wheel poses are up to date when this returns.
    /// Wheel state depends only on the chassis, the ground and the control
    /// targets, so repeating a step with the same inputs repeats its output.
    pub fn update(&mut self, dt: f32, chassis: &mut impl ChassisBody, ground: &impl GroundProbe) {
        let state = chassis.state();
        let up = state.up();
        let down = state.rotation * Dir3::NEG_Y;
        let integrate = dt.is_finite() && dt > 0.0;

        self.forward_speed = state.forward_speed();

        for wheel in &mut self.wheels {
            cast_suspension(wheel, &state, up, down, ground);
        }
        let grip_mass = state.mass / self.wheels_in_contact().max(1) as f32;

        for wheel in &mut self.wheels {
            let hard_point = state.to_world(wheel.attachment);
            apply_suspension(wheel, &state, up, hard_point, chassis);

            let steering = Quat::from_axis_angle(up, wheel.steering);
            let axle = steering * (state.rotation * wheel.spec.axle);
            let normal = wheel.contact_normal;
            let side = (axle - normal * axle.dot(normal)).normalize_or_zero();
            let forward = normal.cross(side).normalize_or_zero();

            apply_engine(wheel, forward, chassis);
            if integrate {
                apply_grip(wheel, &state, side, grip_mass, dt, chassis);
            } else {
                wheel.lateral_force = 0.0;
            }
        }
    }
}

fn cast_suspension(
    wheel: &mut Wheel,
    state: &ChassisState,
    up: Vec3,
    down: Dir3,
    ground: &impl GroundProbe,
) {
    let hard_point = state.to_world(wheel.attachment);
    let ray_length = wheel.spec.ray_length();
    let travel = wheel.spec.max_suspension_travel;

    match ground
        .cast_ray(hard_point, down, ray_length)
        .filter(|hit| hit.distance <= ray_length)
    {
        Some(hit) => {
            wheel.compression = (wheel.spec.suspension_rest_length - hit.distance).clamp(0.0, travel);
            wheel.in_contact = true;
            wheel.contact_point = hard_point + *down * hit.distance.max(0.0);
            wheel.contact_normal = hit.normal.try_normalize().unwrap_or(up);
        }
        None => {
            wheel.compression = travel;
            wheel.in_contact = false;
            wheel.contact_point = hard_point + *down * ray_length;
            wheel.contact_normal = up;
        }
    }
}

fn apply_suspension(
    wheel: &mut Wheel,
    state: &ChassisState,
    up: Vec3,
    hard_point: Vec3,
    chassis: &mut impl ChassisBody,
) {
    if !wheel.in_contact {
        wheel.suspension_force = 0.0;
        return;
    }

    // Positive while the attachment point moves away from the ground.
    let relative_velocity = state.velocity_at_point(hard_point).dot(up);
    let damping = if relative_velocity < 0.0 {
        wheel.spec.damping_compression
    } else {
        wheel.spec.damping_relaxation
    };
    let spring = wheel.spec.suspension_stiffness * wheel.compression;
    let force = (spring - damping * relative_velocity) * state.mass;

    wheel.suspension_force = force.clamp(0.0, wheel.spec.max_suspension_force);
    if wheel.suspension_force > 0.0 {
        chassis.apply_force_at_point(up * wheel.suspension_force, hard_point);
    }
}

fn apply_engine(wheel: &mut Wheel, forward: Vec3, chassis: &mut impl ChassisBody) {
    let traction = if wheel.in_contact { 1.0 } else { 0.0 };
    wheel.longitudinal_force = wheel.engine_force * traction;
    if wheel.longitudinal_force != 0.0 {
        chassis.apply_force_at_point(forward * wheel.longitudinal_force, wheel.contact_point);
    }
}

fn apply_grip(
    wheel: &mut Wheel,
    state: &ChassisState,
    side: Vec3,
    mass: f32,
    dt: f32,
    chassis: &mut impl ChassisBody,
) {
    wheel.lateral_force = 0.0;
    if !wheel.in_contact || side == Vec3::ZERO {
        return;
    }

    let lateral_speed = state.velocity_at_point(wheel.contact_point).dot(side);
    let impulse = -SIDE_CONTACT_DAMPING * lateral_speed * mass * wheel.spec.side_friction_stiffness;
    let max_impulse = wheel.spec.friction_slip * wheel.suspension_force * dt;
    let impulse = impulse.clamp(-max_impulse, max_impulse);

    wheel.lateral_force = impulse / dt;
    if wheel.lateral_force != 0.0 {
        chassis.apply_force_at_point(side * wheel.lateral_force, wheel.contact_point);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::fake::{HeightGround, NoGround, RecordingChassis, flat};

    const DT: f32 = 1.0 / 60.0;

    fn nodes_at(y: f32) -> [WheelNode; WHEEL_COUNT] {
        [
            Vec3::new(-0.35, y, -0.86),
            Vec3::new(0.35, y, -0.86),
            Vec3::new(-0.35, y, 0.76),
            Vec3::new(0.35, y, 0.76),
        ]
        .map(|local_position| WheelNode {
            local_position,
            min_y: -0.2,
            max_y: 0.2,
        })
    }

    fn build(nodes: &[WheelNode]) -> VehicleController {
        VehicleController::try_new(
            Some(ChassisLink(Entity::PLACEHOLDER)),
            Some(nodes),
            &[WheelSpec::default(); WHEEL_COUNT],
        )
        .expect("valid wheels")
        .expect("references resolved")
    }

    #[test]
    fn construction_defers_until_references_resolve() {
        let specs = [WheelSpec::default(); WHEEL_COUNT];
        let nodes = nodes_at(0.0);

        let pending = VehicleController::try_new(None, Some(&nodes), &specs).unwrap();
        assert!(pending.is_none());

        let link = Some(ChassisLink(Entity::PLACEHOLDER));
        let pending = VehicleController::try_new(link, None, &specs).unwrap();
        assert!(pending.is_none());

        let ready = VehicleController::try_new(link, Some(&nodes), &specs).unwrap();
        assert!(ready.is_some());
    }

    #[test]
    fn construction_rejects_degenerate_wheel() {
        let mut nodes = nodes_at(0.0);
        nodes[2].max_y = nodes[2].min_y;
        let result = VehicleController::try_new(
            Some(ChassisLink(Entity::PLACEHOLDER)),
            Some(&nodes),
            &[WheelSpec::default(); WHEEL_COUNT],
        );
        assert!(matches!(
            result,
            Err(VehicleError::DegenerateWheel { index: 2, .. })
        ));
    }

    #[test]
    fn construction_rejects_wheel_count_mismatch() {
        let nodes = nodes_at(0.0);
        let result = VehicleController::try_new(
            Some(ChassisLink(Entity::PLACEHOLDER)),
            Some(&nodes[..3]),
            &[WheelSpec::default(); WHEEL_COUNT],
        );
        assert!(matches!(result, Err(VehicleError::WheelCountMismatch { .. })));
    }

    #[test]
    fn construction_records_attachment_and_radius() {
        let vehicle = build(&nodes_at(0.3));
        let wheel = vehicle.wheel(3).unwrap();
        assert_eq!(wheel.attachment(), Vec3::new(0.35, 0.3, 0.76));
        assert!((wheel.radius() - 0.2).abs() < 1e-6);
    }

    #[test]
    fn grounded_wheels_report_contact_and_compression() {
        let mut vehicle = build(&nodes_at(0.0));
        let mut chassis = RecordingChassis::at(Vec3::new(0.0, 0.05, 0.0));

        vehicle.update(DT, &mut chassis, &flat(0.0));

        for wheel in vehicle.wheels() {
            assert!(wheel.in_contact());
            let expected = (0.125_f32 - 0.05).clamp(0.0, 0.125);
            assert!((wheel.compression() - expected).abs() < 1e-5);
            assert!(wheel.suspension_force() > 0.0);
        }
        assert!(chassis.total_force().y > 0.0);
    }

    #[test]
    fn airborne_wheels_extend_fully_and_lose_traction() {
        let mut vehicle = build(&nodes_at(0.0));
        for i in 0..WHEEL_COUNT {
            vehicle.set_engine_force(i, 48.0).unwrap();
        }
        let mut chassis = RecordingChassis::at(Vec3::new(0.0, 10.0, 0.0));

        vehicle.update(DT, &mut chassis, &flat(0.0));

        for wheel in vehicle.wheels() {
            assert!(!wheel.in_contact());
            assert_eq!(wheel.compression(), wheel.spec().max_suspension_travel);
            assert_eq!(wheel.longitudinal_force(), 0.0);
        }
        assert_eq!(chassis.total_force(), Vec3::ZERO);
    }

    #[test]
    fn compression_stays_in_range_over_discontinuous_terrain() {
        let ground = HeightGround {
            height: |x: f32, z: f32| {
                let step = if x < 0.0 { 0.4_f32 } else { -0.6 };
                step + if z > 0.0 { 0.05 } else { -3.0 }
            },
        };
        let mut vehicle = build(&nodes_at(0.0));

        for i in 0..40 {
            let y = -0.8 + i as f32 * 0.05;
            let mut chassis = RecordingChassis::at(Vec3::new(0.0, y, 0.0));
            vehicle.update(DT, &mut chassis, &ground);
            for wheel in vehicle.wheels() {
                let travel = wheel.spec().max_suspension_travel;
                assert!(wheel.compression() >= 0.0);
                assert!(wheel.compression() <= travel);
            }
        }
    }

    #[test]
    fn grounded_wheel_pushes_along_forward_axis() {
        let mut vehicle = build(&nodes_at(0.0));
        vehicle.set_engine_force(0, 48.0).unwrap();
        let mut chassis = RecordingChassis::at(Vec3::new(0.0, 0.05, 0.0));

        vehicle.update(DT, &mut chassis, &flat(0.0));

        assert_eq!(vehicle.wheel(0).unwrap().longitudinal_force(), 48.0);
        let total = chassis.total_force();
        assert!((total.z + 48.0).abs() < 1e-3);
    }

    #[test]
    fn steering_turns_the_drive_direction_left() {
        let mut vehicle = build(&nodes_at(0.0));
        vehicle.set_engine_force(0, 10.0).unwrap();
        vehicle.set_steering(0, 0.3).unwrap();
        let mut chassis = RecordingChassis::at(Vec3::new(0.0, 0.05, 0.0));

        vehicle.update(DT, &mut chassis, &flat(0.0));

        let total = chassis.total_force();
        assert!(total.x < 0.0);
        assert!(total.z < 0.0);
        assert_eq!(vehicle.wheel_poses()[0].yaw, 0.3);
    }

    #[test]
    fn wheel_pose_follows_compression() {
        let mut vehicle = build(&nodes_at(0.3));
        let mut chassis = RecordingChassis::at(Vec3::new(0.0, -0.2, 0.0));

        vehicle.update(DT, &mut chassis, &flat(0.0));

        for (wheel, pose) in vehicle.wheels().iter().zip(vehicle.wheel_poses()) {
            assert!((pose.height - (0.3 - wheel.compression())).abs() < 1e-6);
        }
    }

    #[test]
    fn lateral_slide_is_resisted() {
        let mut vehicle = build(&nodes_at(0.0));
        let mut chassis = RecordingChassis::at(Vec3::new(0.0, 0.05, 0.0));
        chassis.state.linear_velocity = Vec3::new(2.0, 0.0, 0.0);

        vehicle.update(DT, &mut chassis, &flat(0.0));

        assert!(chassis.total_force().x < 0.0);
        for wheel in vehicle.wheels() {
            assert!(wheel.lateral_force() < 0.0);
        }
    }

    #[test]
    fn zero_timestep_skips_integration() {
        let mut vehicle = build(&nodes_at(0.0));
        let mut chassis = RecordingChassis::at(Vec3::new(0.0, 0.05, 0.0));
        chassis.state.linear_velocity = Vec3::new(2.0, 0.0, -5.0);

        vehicle.update(0.0, &mut chassis, &flat(0.0));

        for wheel in vehicle.wheels() {
            assert!(wheel.in_contact());
            assert_eq!(wheel.lateral_force(), 0.0);
        }
    }

    #[test]
    fn repeated_update_is_idempotent() {
        let mut vehicle = build(&nodes_at(0.0));
        vehicle.set_engine_force(0, 48.0).unwrap();
        vehicle.set_steering(1, -0.1).unwrap();
        let ground = flat(0.0);
        let moving = || {
            let mut chassis = RecordingChassis::at(Vec3::new(0.0, 0.05, 0.0));
            chassis.state.linear_velocity = Vec3::new(0.5, -0.2, -5.0);
            chassis.state.angular_velocity = Vec3::new(0.0, 0.3, 0.0);
            chassis
        };

        let mut chassis = moving();
        vehicle.update(DT, &mut chassis, &ground);
        let first_wheels = *vehicle.wheels();
        let first_poses = vehicle.wheel_poses();
        let first_forces = chassis.forces.clone();

        let mut chassis = moving();
        vehicle.update(DT, &mut chassis, &ground);

        assert_eq!(*vehicle.wheels(), first_wheels);
        assert_eq!(vehicle.wheel_poses(), first_poses);
        assert_eq!(chassis.forces, first_forces);
    }

    #[test]
    fn only_grounded_wheels_drive() {
        // Front axle over the plane, rear axle over a drop.
        let ground = HeightGround {
            height: |_: f32, z: f32| if z < 0.0 { 0.0_f32 } else { -5.0 },
        };
        let mut vehicle = build(&nodes_at(0.0));
        for i in 0..WHEEL_COUNT {
            vehicle.set_engine_force(i, 48.0).unwrap();
        }
        let mut chassis = RecordingChassis::at(Vec3::new(0.0, 0.05, 0.0));

        vehicle.update(DT, &mut chassis, &ground);

        let contact: Vec<bool> = vehicle.wheels().iter().map(|w| w.in_contact()).collect();
        assert_eq!(contact, vec![true, true, false, false]);
        let drive: Vec<f32> = vehicle
            .wheels()
            .iter()
            .map(|w| w.longitudinal_force())
            .collect();
        assert_eq!(drive, vec![48.0, 48.0, 0.0, 0.0]);

        let total = chassis.total_force();
        assert!(total.x.abs() < 1e-3);
        assert!((total.z + 96.0).abs() < 1e-3);
    }

    #[test]
    fn control_surface_rejects_unknown_wheel() {
        let mut vehicle = build(&nodes_at(0.0));
        assert!(matches!(
            vehicle.set_engine_force(4, 1.0),
            Err(VehicleError::WheelIndexOutOfRange(4))
        ));
        assert!(vehicle.set_steering(7, 0.1).is_err());
        assert_eq!(vehicle.steering(9), None);
    }

    #[test]
    fn forward_speed_projects_on_chassis_forward() {
        let mut vehicle = build(&nodes_at(0.0));
        let mut chassis = RecordingChassis::at(Vec3::new(0.0, 10.0, 0.0));
        chassis.state.linear_velocity = Vec3::new(1.0, 0.0, -4.0);

        vehicle.update(DT, &mut chassis, &NoGround);

        assert!((vehicle.forward_speed() - 4.0).abs() < 1e-6);
    }

    #[test]
    fn shrinking_travel_clamps_compression() {
        let mut vehicle = build(&nodes_at(0.0));
        vehicle.set_max_suspension_travel(0, 0.05).unwrap();
        assert_eq!(vehicle.wheel(0).unwrap().compression(), 0.05);
        assert!(vehicle.set_suspension_stiffness(0, -1.0).is_err());
    }
}
