use std::collections::{BTreeMap, BTreeSet, HashMap};

use rapier2d::prelude::{
    ActiveEvents, CCDSolver, ChannelEventCollector, ColliderBuilder, ColliderHandle,
    ColliderSet, CollisionEvent, ContactForceEvent, DefaultBroadPhase, Group,
    ImpulseJointSet, IntegrationParameters, InteractionGroups, IslandManager,
    MultibodyJointSet, NarrowPhase, PhysicsPipeline, Real, RigidBody, RigidBodyBuilder,
    RigidBodyHandle, RigidBodySet, Vector,
};
use tracing::debug;

use super::shapes::Shape;
use crate::app::Vec2;

/// Reference step the air friction coefficient is expressed against.
const REFERENCE_STEP_SECONDS: f32 = 1.0 / 60.0;
/// World units are pixels; rapier tunes its tolerances against this length.
const PIXELS_PER_METER: Real = 100.0;
const MAX_AIR_FRICTION: f32 = 0.99;
const BODY_MASS: Real = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyId(u32);

impl BodyId {
    pub fn raw(self) -> u32 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConstraintId(u32);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyDesc {
    pub shape: Shape,
    pub position: Vec2,
    pub is_static: bool,
    pub is_sensor: bool,
    pub category: u32,
    pub mask: u32,
    /// Fraction of velocity lost per 1/60 s.
    pub air_friction: f32,
}

impl BodyDesc {
    pub fn dynamic(shape: Shape, position: Vec2) -> Self {
        Self {
            shape,
            position,
            is_static: false,
            is_sensor: false,
            category: 0x0001,
            mask: u32::MAX,
            air_friction: 0.01,
        }
    }

    pub fn fixed(shape: Shape, position: Vec2) -> Self {
        Self {
            is_static: true,
            ..Self::dynamic(shape, position)
        }
    }

    pub fn with_category(mut self, category: u32) -> Self {
        self.category = category;
        self
    }

    pub fn with_mask(mut self, mask: u32) -> Self {
        self.mask = mask;
        self
    }

    pub fn sensor(mut self) -> Self {
        self.is_sensor = true;
        self
    }

    pub fn with_air_friction(mut self, air_friction: f32) -> Self {
        self.air_friction = air_friction.clamp(0.0, 1.0);
        self
    }

    fn interaction_groups(&self) -> InteractionGroups {
        InteractionGroups::new(
            Group::from_bits_truncate(self.category),
            Group::from_bits_truncate(self.mask),
        )
    }

    /// Rapier damping that removes `air_friction` of the velocity over one reference step.
    fn linear_damping(&self) -> Real {
        let friction = self.air_friction.min(MAX_AIR_FRICTION);
        friction / (1.0 - friction) / REFERENCE_STEP_SECONDS
    }

    fn rigid_body(&self) -> RigidBody {
        let translation = to_vector(self.position);
        if self.is_static {
            RigidBodyBuilder::fixed().translation(translation).build()
        } else {
            RigidBodyBuilder::dynamic()
                .translation(translation)
                .linear_damping(self.linear_damping())
                .additional_mass(BODY_MASS)
                .lock_rotations()
                .can_sleep(false)
                .build()
        }
    }
}

/// Bookkeeping for one body: its descriptor and the rapier handles behind it.
#[derive(Debug, Clone)]
pub struct Body {
    id: BodyId,
    desc: BodyDesc,
    handle: RigidBodyHandle,
    collider: ColliderHandle,
}

impl Body {
    pub fn id(&self) -> BodyId {
        self.id
    }

    pub fn shape(&self) -> Shape {
        self.desc.shape
    }

    pub fn category(&self) -> u32 {
        self.desc.category
    }

    pub fn is_static(&self) -> bool {
        self.desc.is_static
    }

    pub fn is_sensor(&self) -> bool {
        self.desc.is_sensor
    }

    fn contact(&self) -> ContactBody {
        ContactBody {
            id: self.id,
            category: self.desc.category,
        }
    }
}

/// Spring pulling a body toward a fixed world-space anchor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpringDesc {
    pub anchor: Vec2,
    pub body: BodyId,
    /// Force per pixel of stretch beyond `length`.
    pub stiffness: f32,
    /// Force per px/s of velocity along the spring axis.
    pub damping: f32,
    pub length: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContactBody {
    pub id: BodyId,
    pub category: u32,
}

/// Two overlapping bodies, `a` always holding the lower id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BodyPair {
    pub a: ContactBody,
    pub b: ContactBody,
}

impl BodyPair {
    /// The body paired with `id`, if `id` takes part in this pair.
    pub fn other(&self, id: BodyId) -> Option<ContactBody> {
        if self.a.id == id {
            Some(self.b)
        } else if self.b.id == id {
            Some(self.a)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepReport {
    pub started: Vec<BodyPair>,
    pub ended: Vec<BodyPair>,
}

impl StepReport {
    pub fn is_empty(&self) -> bool {
        self.started.is_empty() && self.ended.is_empty()
    }
}

/// Top-down rapier2d world with zero gravity. Bodies are addressed by [`BodyId`] and
/// the rapier handles stay private.
pub struct PhysicsWorld {
    pipeline: PhysicsPipeline,
    gravity: Vector<Real>,
    integration_params: IntegrationParameters,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    rigid_body_set: RigidBodySet,
    collider_set: ColliderSet,
    impulse_joint_set: ImpulseJointSet,
    multibody_joint_set: MultibodyJointSet,
    ccd_solver: CCDSolver,
    next_body_id: u32,
    next_constraint_id: u32,
    bodies: BTreeMap<BodyId, Body>,
    collider_to_body: HashMap<ColliderHandle, BodyId>,
    springs: BTreeMap<ConstraintId, SpringDesc>,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsWorld {
    pub fn new() -> Self {
        let mut integration_params = IntegrationParameters::default();
        integration_params.length_unit = PIXELS_PER_METER;
        Self {
            pipeline: PhysicsPipeline::new(),
            gravity: Vector::zeros(),
            integration_params,
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            next_body_id: 0,
            next_constraint_id: 0,
            bodies: BTreeMap::new(),
            collider_to_body: HashMap::new(),
            springs: BTreeMap::new(),
        }
    }

    pub fn add_body(&mut self, desc: BodyDesc) -> BodyId {
        let id = BodyId(self.next_body_id);
        self.next_body_id = self.next_body_id.saturating_add(1);

        let handle = self.rigid_body_set.insert(desc.rigid_body());
        let collider = ColliderBuilder::new(desc.shape.to_shared())
            .density(0.0)
            .friction(0.0)
            .sensor(desc.is_sensor)
            .collision_groups(desc.interaction_groups())
            .active_events(ActiveEvents::COLLISION_EVENTS)
            .build();
        let collider =
            self.collider_set
                .insert_with_parent(collider, handle, &mut self.rigid_body_set);

        self.collider_to_body.insert(collider, id);
        self.bodies.insert(
            id,
            Body {
                id,
                desc,
                handle,
                collider,
            },
        );
        id
    }

    /// Removes a body along with every spring attached to it. Overlaps involving the body
    /// are dropped without an end report.
    pub fn remove_body(&mut self, id: BodyId) -> bool {
        let Some(body) = self.bodies.remove(&id) else {
            return false;
        };
        self.collider_to_body.remove(&body.collider);
        self.rigid_body_set.remove(
            body.handle,
            &mut self.island_manager,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            true,
        );
        self.springs.retain(|_, spring| spring.body != id);
        true
    }

    /// Attaches a spring to an existing body; `None` when the body is unknown.
    pub fn add_spring(&mut self, desc: SpringDesc) -> Option<ConstraintId> {
        if !self.bodies.contains_key(&desc.body) {
            return None;
        }
        let id = ConstraintId(self.next_constraint_id);
        self.next_constraint_id = self.next_constraint_id.saturating_add(1);
        self.springs.insert(id, desc);
        Some(id)
    }

    pub fn body(&self, id: BodyId) -> Option<&Body> {
        self.bodies.get(&id)
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn constraint_count(&self) -> usize {
        self.springs.len()
    }

    pub fn position(&self, id: BodyId) -> Option<Vec2> {
        self.rigid_body(id).map(|rb| to_vec2(rb.translation()))
    }

    pub fn velocity(&self, id: BodyId) -> Option<Vec2> {
        self.rigid_body(id).map(|rb| to_vec2(rb.linvel()))
    }

    pub fn set_position(&mut self, id: BodyId, position: Vec2) {
        if let Some(rb) = self.rigid_body_mut(id) {
            rb.set_translation(to_vector(position), true);
        }
    }

    pub fn set_velocity(&mut self, id: BodyId, velocity: Vec2) {
        if let Some(rb) = self.rigid_body_mut(id) {
            if rb.is_dynamic() {
                rb.set_linvel(to_vector(velocity), true);
            }
        }
    }

    /// Accumulates a force applied during the next step only.
    pub fn apply_force(&mut self, id: BodyId, force: Vec2) {
        if !force.is_finite() {
            return;
        }
        if let Some(rb) = self.rigid_body_mut(id) {
            if rb.is_dynamic() {
                rb.add_force(to_vector(force), true);
            }
        }
    }

    pub fn step(&mut self, dt_seconds: f32) -> StepReport {
        if !dt_seconds.is_finite() || dt_seconds <= 0.0 {
            return StepReport::default();
        }
        self.integration_params.dt = dt_seconds;
        self.apply_springs();

        let (collision_send, collision_recv) =
            rapier2d::crossbeam::channel::unbounded::<CollisionEvent>();
        let (force_send, _force_recv) =
            rapier2d::crossbeam::channel::unbounded::<ContactForceEvent>();
        let event_handler = ChannelEventCollector::new(collision_send, force_send);

        self.pipeline.step(
            &self.gravity,
            &self.integration_params,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            None,
            &(),
            &event_handler,
        );
        self.clear_forces();

        let mut started = BTreeSet::new();
        let mut ended = BTreeSet::new();
        while let Ok(event) = collision_recv.try_recv() {
            if event.removed() {
                continue;
            }
            let Some(key) = self.pair_key(event.collider1(), event.collider2()) else {
                continue;
            };
            // A pair that flips twice inside one step nets out to nothing.
            if event.started() {
                if !ended.remove(&key) {
                    started.insert(key);
                }
            } else if !started.remove(&key) {
                ended.insert(key);
            }
        }

        let report = StepReport {
            started: started.into_iter().filter_map(|key| self.pair_for(key)).collect(),
            ended: ended.into_iter().filter_map(|key| self.pair_for(key)).collect(),
        };
        if !report.is_empty() {
            debug!(
                started = report.started.len(),
                ended = report.ended.len(),
                "physics_pairs_changed"
            );
        }
        report
    }

    fn rigid_body(&self, id: BodyId) -> Option<&RigidBody> {
        let body = self.bodies.get(&id)?;
        self.rigid_body_set.get(body.handle)
    }

    fn rigid_body_mut(&mut self, id: BodyId) -> Option<&mut RigidBody> {
        let body = self.bodies.get(&id)?;
        self.rigid_body_set.get_mut(body.handle)
    }

    fn apply_springs(&mut self) {
        for spring in self.springs.values() {
            let Some(body) = self.bodies.get(&spring.body) else {
                continue;
            };
            let Some(rb) = self.rigid_body_set.get_mut(body.handle) else {
                continue;
            };
            let offset = to_vec2(rb.translation()) - spring.anchor;
            let distance = offset.length();
            if distance <= f32::EPSILON {
                continue;
            }
            let axis = offset * distance.recip();
            let stretch = distance - spring.length;
            let along = to_vec2(rb.linvel()).dot(axis);
            let magnitude = -spring.stiffness * stretch - spring.damping * along;
            rb.add_force(to_vector(axis * magnitude), true);
        }
    }

    fn clear_forces(&mut self) {
        for body in self.bodies.values() {
            if let Some(rb) = self.rigid_body_set.get_mut(body.handle) {
                rb.reset_forces(false);
            }
        }
    }

    fn pair_key(&self, first: ColliderHandle, second: ColliderHandle) -> Option<(BodyId, BodyId)> {
        let a = *self.collider_to_body.get(&first)?;
        let b = *self.collider_to_body.get(&second)?;
        Some((a.min(b), a.max(b)))
    }

    fn pair_for(&self, (a, b): (BodyId, BodyId)) -> Option<BodyPair> {
        Some(BodyPair {
            a: self.bodies.get(&a)?.contact(),
            b: self.bodies.get(&b)?.contact(),
        })
    }
}

fn to_vector(value: Vec2) -> Vector<Real> {
    Vector::new(value.x, value.y)
}

fn to_vec2(value: &Vector<Real>) -> Vec2 {
    Vec2::new(value.x, value.y)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;
    const CAT_A: u32 = 0b01;
    const CAT_B: u32 = 0b10;

    #[test]
    fn force_moves_dynamic_body_for_one_step_only() {
        let mut world = PhysicsWorld::new();
        let dynamic = world.add_body(
            BodyDesc::dynamic(Shape::circle(1.0), Vec2::ZERO).with_air_friction(0.0),
        );
        let fixed = world.add_body(BodyDesc::fixed(Shape::circle(1.0), Vec2::new(500.0, 0.0)));

        world.apply_force(dynamic, Vec2::new(60.0, 0.0));
        world.apply_force(fixed, Vec2::new(60.0, 0.0));
        world.step(DT);

        let velocity = world.velocity(dynamic).expect("body");
        assert!((velocity.x - 1.0).abs() < 1e-3, "velocity {velocity:?}");
        assert_eq!(world.position(fixed), Some(Vec2::new(500.0, 0.0)));

        world.step(DT);
        assert!((world.velocity(dynamic).expect("body").x - 1.0).abs() < 1e-3);
    }

    #[test]
    fn air_friction_decays_velocity() {
        let mut world = PhysicsWorld::new();
        let id = world.add_body(
            BodyDesc::dynamic(Shape::circle(1.0), Vec2::ZERO).with_air_friction(0.1),
        );
        world.set_velocity(id, Vec2::new(100.0, 0.0));
        world.step(DT);
        let velocity = world.velocity(id).expect("body");
        assert!(velocity.x > 85.0 && velocity.x < 95.0, "velocity {velocity:?}");
    }

    #[test]
    fn sensor_overlap_reports_start_then_end() {
        let mut world = PhysicsWorld::new();
        let mover = world.add_body(
            BodyDesc::dynamic(Shape::circle(10.0), Vec2::ZERO)
                .with_category(CAT_A)
                .with_air_friction(0.0),
        );
        let sensor = world.add_body(
            BodyDesc::fixed(Shape::circle(10.0), Vec2::new(15.0, 0.0))
                .with_category(CAT_B)
                .with_mask(CAT_A)
                .sensor(),
        );

        let first = world.step(DT);
        assert_eq!(first.started.len(), 1);
        assert_eq!(first.started[0].other(mover).map(|b| b.id), Some(sensor));
        assert_eq!(first.started[0].other(mover).map(|b| b.category), Some(CAT_B));
        assert!(first.ended.is_empty());

        assert!(world.step(DT).is_empty());

        world.set_position(mover, Vec2::new(-100.0, 0.0));
        let last = world.step(DT);
        assert!(last.started.is_empty());
        assert_eq!(last.ended.len(), 1);
        assert_eq!(world.position(mover), Some(Vec2::new(-100.0, 0.0)));
    }

    #[test]
    fn masked_out_bodies_never_report() {
        let mut world = PhysicsWorld::new();
        world.add_body(BodyDesc::dynamic(Shape::circle(10.0), Vec2::ZERO).with_category(CAT_A));
        world.add_body(
            BodyDesc::fixed(Shape::circle(10.0), Vec2::new(5.0, 0.0))
                .with_category(CAT_B)
                .with_mask(CAT_B)
                .sensor(),
        );
        assert!(world.step(DT).is_empty());
    }

    #[test]
    fn solid_static_body_stops_dynamic_body() {
        let mut world = PhysicsWorld::new();
        let ball = world.add_body(
            BodyDesc::dynamic(Shape::circle(10.0), Vec2::new(-40.0, 0.0)).with_air_friction(0.0),
        );
        world.add_body(BodyDesc::fixed(Shape::rect(20.0, 200.0), Vec2::new(10.0, 0.0)));
        world.set_velocity(ball, Vec2::new(600.0, 0.0));

        for _ in 0..60 {
            world.step(DT);
        }
        let position = world.position(ball).expect("ball");
        assert!(position.x < -8.0, "ball went through the wall: {position:?}");
    }

    #[test]
    fn spring_pulls_body_back_toward_anchor() {
        let mut world = PhysicsWorld::new();
        let id = world.add_body(
            BodyDesc::dynamic(Shape::circle(5.0), Vec2::new(100.0, 0.0)).with_air_friction(0.0),
        );
        world
            .add_spring(SpringDesc {
                anchor: Vec2::ZERO,
                body: id,
                stiffness: 10.0,
                damping: 0.0,
                length: 10.0,
            })
            .expect("spring");
        world.step(DT);
        assert!(world.velocity(id).expect("body").x < 0.0);
    }

    #[test]
    fn removing_body_drops_springs_and_pairs() {
        let mut world = PhysicsWorld::new();
        let a = world.add_body(BodyDesc::dynamic(Shape::circle(10.0), Vec2::ZERO).sensor());
        let b = world.add_body(BodyDesc::dynamic(Shape::circle(10.0), Vec2::new(5.0, 0.0)));
        world
            .add_spring(SpringDesc {
                anchor: Vec2::ZERO,
                body: a,
                stiffness: 1.0,
                damping: 0.1,
                length: 0.0,
            })
            .expect("spring");
        assert_eq!(world.step(DT).started.len(), 1);

        assert!(world.remove_body(a));
        assert!(!world.remove_body(a));
        assert_eq!(world.constraint_count(), 0);
        assert!(world.step(DT).is_empty());
        assert_eq!(world.body_count(), 1);
        assert!(world.position(b).is_some());
        assert!(world.position(a).is_none());
    }

    #[test]
    fn spring_for_unknown_body_is_rejected() {
        let mut world = PhysicsWorld::new();
        let id = world.add_body(BodyDesc::dynamic(Shape::circle(1.0), Vec2::ZERO));
        world.remove_body(id);
        assert!(world
            .add_spring(SpringDesc {
                anchor: Vec2::ZERO,
                body: id,
                stiffness: 1.0,
                damping: 0.0,
                length: 0.0,
            })
            .is_none());
    }

    #[test]
    fn damping_matches_friction_over_reference_step() {
        let desc = BodyDesc::dynamic(Shape::circle(1.0), Vec2::ZERO).with_air_friction(0.1);
        let keep = 1.0 / (1.0 + REFERENCE_STEP_SECONDS * desc.linear_damping());
        assert!((keep - 0.9).abs() < 1e-5);
        assert!(BodyDesc::dynamic(Shape::circle(1.0), Vec2::ZERO)
            .with_air_friction(1.0)
            .linear_damping()
            .is_finite());
    }
}
