//! A minimal stepping world for exercising the solvers end to end.
//!
//! The solver crates deliberately have no broad phase, narrow phase, or body
//! storage; they consume flat arrays and contact descriptors. This harness
//! supplies the smallest world that closes the loop for tests: circles and a
//! ground half-plane, a touch-only narrow phase for those two shapes, warm
//! start carried through persistent manifolds, and the canonical step order
//! (velocity integration, contact and joint velocity passes, position
//! integration, position correction, impulse store).
//!
//! Not a physics engine. Just enough world to make the solvers observable.

#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]

use nalgebra::{Point2, Vector2};

use planar_contact::{ContactDescriptor, ContactId, ContactSolver, Manifold, ManifoldKind, ManifoldPoint};
use planar_joint::{AnyJoint, Joint, SolverData};
use planar_types::{BodyPosition, BodyVelocity, SolverBody, StepContext};

/// Default combined friction for harness contacts.
pub const FRICTION: f64 = 0.5;
/// Default combined restitution for harness contacts.
pub const RESTITUTION: f64 = 0.0;
/// Relative normal speed below which restitution is ignored.
pub const RESTITUTION_THRESHOLD: f64 = 1.0;

/// The two shapes the harness narrow phase understands.
#[derive(Debug, Clone, Copy)]
enum Shape {
    Circle { radius: f64 },
    /// The half-plane `y <= 0`, always static.
    Ground,
    /// A static, collisionless attachment point for joints.
    Anchor,
}

#[derive(Debug, Clone, Copy)]
struct TestBody {
    shape: Shape,
    solver: SolverBody,
}

#[derive(Debug)]
struct PersistentContact {
    key: (usize, usize),
    descriptor: ContactDescriptor,
}

/// A stepping world: bodies, persistent contacts, joints, gravity.
#[derive(Debug)]
pub struct TestWorld {
    /// Gravity applied to every dynamic body each step.
    pub gravity: Vector2<f64>,
    /// Combined friction used for every contact.
    pub friction: f64,
    /// Combined restitution used for every contact.
    pub restitution: f64,
    /// Surface speed of the ground along its tangent (conveyor belt).
    pub conveyor_speed: f64,
    bodies: Vec<TestBody>,
    positions: Vec<BodyPosition>,
    velocities: Vec<BodyVelocity>,
    contacts: Vec<PersistentContact>,
    joints: Vec<AnyJoint>,
    solver: ContactSolver,
}

impl TestWorld {
    /// An empty world with standard gravity.
    #[must_use]
    pub fn new() -> Self {
        Self {
            gravity: Vector2::new(0.0, -10.0),
            friction: FRICTION,
            restitution: RESTITUTION,
            conveyor_speed: 0.0,
            bodies: Vec::new(),
            positions: Vec::new(),
            velocities: Vec::new(),
            contacts: Vec::new(),
            joints: Vec::new(),
            solver: ContactSolver::new(),
        }
    }

    /// Add a dynamic circle. Returns its body slot.
    pub fn add_circle(&mut self, center: Point2<f64>, radius: f64, mass: f64) -> usize {
        let index = self.bodies.len();
        let inertia = 0.5 * mass * radius * radius;
        self.bodies.push(TestBody {
            shape: Shape::Circle { radius },
            solver: SolverBody::dynamic(index, mass, inertia, Vector2::zeros()),
        });
        self.positions.push(BodyPosition::new(center, 0.0));
        self.velocities.push(BodyVelocity::zero());
        index
    }

    /// Add the static ground half-plane `y <= 0`. Returns its body slot.
    pub fn add_ground(&mut self) -> usize {
        let index = self.bodies.len();
        self.bodies.push(TestBody {
            shape: Shape::Ground,
            solver: SolverBody::fixed(index),
        });
        self.positions.push(BodyPosition::default());
        self.velocities.push(BodyVelocity::zero());
        index
    }

    /// Add a static, collisionless anchor body for joints. Returns its slot.
    pub fn add_anchor(&mut self, center: Point2<f64>) -> usize {
        let index = self.bodies.len();
        self.bodies.push(TestBody {
            shape: Shape::Anchor,
            solver: SolverBody::fixed(index),
        });
        self.positions.push(BodyPosition::new(center, 0.0));
        self.velocities.push(BodyVelocity::zero());
        index
    }

    /// Add a joint between already-added bodies.
    pub fn add_joint(&mut self, joint: impl Into<AnyJoint>) {
        self.joints.push(joint.into());
    }

    /// Solver slot data for a body, as the joint constructors want it.
    #[must_use]
    pub fn solver_body(&self, index: usize) -> SolverBody {
        self.bodies[index].solver
    }

    /// Current position of a body.
    #[must_use]
    pub fn position(&self, index: usize) -> BodyPosition {
        self.positions[index]
    }

    /// Current velocity of a body.
    #[must_use]
    pub fn velocity(&self, index: usize) -> BodyVelocity {
        self.velocities[index]
    }

    /// Mutable velocity of a body, for kicking bodies in tests.
    pub fn velocity_mut(&mut self, index: usize) -> &mut BodyVelocity {
        &mut self.velocities[index]
    }

    /// The persistent contact between two bodies, if the pair is touching.
    #[must_use]
    pub fn contact(&self, a: usize, b: usize) -> Option<&ContactDescriptor> {
        let key = if a < b { (a, b) } else { (b, a) };
        self.contacts
            .iter()
            .find(|contact| contact.key == key)
            .map(|contact| &contact.descriptor)
    }

    /// The contact solver, for inspecting constraint state after a step.
    #[must_use]
    pub fn solver(&self) -> &ContactSolver {
        &self.solver
    }

    /// Advance the world by one step.
    pub fn step(&mut self, step: &StepContext) {
        // Integrate forces.
        for (body, vel) in self.bodies.iter().zip(self.velocities.iter_mut()) {
            if !body.solver.is_static() {
                vel.linear += step.dt * self.gravity;
            }
        }

        self.update_contacts();

        let descriptors: Vec<ContactDescriptor> = self
            .contacts
            .iter()
            .map(|contact| contact.descriptor.clone())
            .collect();
        self.solver.initialize(step, &descriptors);
        self.solver
            .initialize_velocity_constraints(&self.positions, &self.velocities);

        {
            let mut data = SolverData {
                step,
                positions: &mut self.positions,
                velocities: &mut self.velocities,
            };
            for joint in &mut self.joints {
                joint.init_velocity_constraints(&mut data);
            }
        }

        self.solver.warm_start(&mut self.velocities);

        for _ in 0..step.velocity_iterations {
            let mut data = SolverData {
                step,
                positions: &mut self.positions,
                velocities: &mut self.velocities,
            };
            for joint in &mut self.joints {
                joint.solve_velocity_constraints(&mut data);
            }
            self.solver.solve_velocity_constraints(&mut self.velocities);
        }

        // Integrate velocities.
        for (pos, vel) in self.positions.iter_mut().zip(self.velocities.iter()) {
            pos.center += step.dt * vel.linear;
            pos.angle += step.dt * vel.angular;
        }

        for _ in 0..step.position_iterations {
            let contacts_ok = self.solver.solve_position_constraints(&mut self.positions);
            let mut joints_ok = true;
            {
                let mut data = SolverData {
                    step,
                    positions: &mut self.positions,
                    velocities: &mut self.velocities,
                };
                for joint in &mut self.joints {
                    joints_ok &= joint.solve_position_constraints(&mut data);
                }
            }
            if contacts_ok && joints_ok {
                break;
            }
        }

        let mut descriptors = descriptors;
        self.solver.store_impulses(&mut descriptors);
        for (contact, descriptor) in self.contacts.iter_mut().zip(descriptors) {
            contact.descriptor = descriptor;
        }
    }

    /// Run `count` steps with the same context.
    pub fn run(&mut self, step: &StepContext, count: usize) {
        for _ in 0..count {
            self.step(step);
        }
    }

    /// Touch-only narrow phase over all body pairs, carrying accumulated
    /// impulses across steps through matching manifold point ids.
    fn update_contacts(&mut self) {
        let mut fresh: Vec<PersistentContact> = Vec::new();

        for a in 0..self.bodies.len() {
            for b in (a + 1)..self.bodies.len() {
                let Some(descriptor) = self.collide(a, b) else {
                    continue;
                };
                let key = (a, b);
                let mut contact = PersistentContact { key, descriptor };
                if let Some(previous) = self.contacts.iter().find(|c| c.key == key) {
                    carry_impulses(&previous.descriptor.manifold, &mut contact.descriptor.manifold);
                }
                fresh.push(contact);
            }
        }

        self.contacts = fresh;
    }

    fn collide(&self, a: usize, b: usize) -> Option<ContactDescriptor> {
        let body_a = self.bodies[a];
        let body_b = self.bodies[b];

        match (body_a.shape, body_b.shape) {
            (Shape::Circle { radius: radius_a }, Shape::Circle { radius: radius_b }) => {
                let delta = self.positions[b].center - self.positions[a].center;
                if delta.norm_squared() > (radius_a + radius_b) * (radius_a + radius_b) {
                    return None;
                }
                // Circle manifolds are anchored at the centers; the solver
                // recovers the world geometry from the transforms.
                let manifold = Manifold::circles(
                    Point2::origin(),
                    Point2::origin(),
                    ContactId::new(pair_id(a, b)),
                );
                Some(self.descriptor(body_a, body_b, 0.0, radius_a, radius_b, manifold))
            }
            (Shape::Ground, Shape::Circle { radius }) => {
                let center = self.positions[b].center;
                if center.y > radius {
                    return None;
                }
                // Reference face on the ground: surface plane through the
                // origin with normal +Y, contact point at the circle center.
                let mut manifold =
                    Manifold::new(ManifoldKind::FaceA, Vector2::y(), Point2::origin());
                manifold.push(ManifoldPoint::new(
                    Point2::origin(),
                    ContactId::new(pair_id(a, b)),
                ));
                Some(self.descriptor(body_a, body_b, self.conveyor_speed, 0.0, radius, manifold))
            }
            // The descriptor always carries the ground as body A; slot
            // indices inside SolverBody keep the mapping unambiguous.
            (Shape::Circle { .. }, Shape::Ground) => self.collide(b, a),
            (Shape::Anchor, _) | (_, Shape::Anchor) | (Shape::Ground, Shape::Ground) => None,
        }
    }

    fn descriptor(
        &self,
        body_a: TestBody,
        body_b: TestBody,
        tangent_speed: f64,
        radius_a: f64,
        radius_b: f64,
        manifold: Manifold,
    ) -> ContactDescriptor {
        ContactDescriptor {
            body_a: body_a.solver,
            body_b: body_b.solver,
            friction: self.friction,
            restitution: self.restitution,
            restitution_threshold: RESTITUTION_THRESHOLD,
            tangent_speed,
            radius_a,
            radius_b,
            manifold,
        }
    }
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Stable feature key for a body pair in this world.
fn pair_id(a: usize, b: usize) -> u32 {
    let (low, high) = if a < b { (a, b) } else { (b, a) };
    ((low as u32) << 16) | (high as u32 & 0xffff)
}

/// Copy accumulated impulses from last step's manifold into this step's,
/// matching points by feature id.
fn carry_impulses(previous: &Manifold, current: &mut Manifold) {
    for point in current.points_mut() {
        if let Some(old) = previous.points().iter().find(|p| p.id == point.id) {
            point.normal_impulse = old.normal_impulse;
            point.tangent_impulse = old.tangent_impulse;
        }
    }
}
