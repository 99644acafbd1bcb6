//! The contact solver.
//!
//! A per-step batch processor over one island's contacts. It owns the cached
//! constraint records and keeps their storage alive across steps (cleared,
//! never shrunk) so steady-state stepping allocates nothing.

use nalgebra::{Matrix2, Vector2};

use planar_types::math::{body_transform, cross, cross_scalar, inverse2x2, right_perp};
use planar_types::{
    BodyPosition, BodyVelocity, SolverBody, StepContext, CONTACT_BAUMGARTE, LINEAR_SLOP,
    MAX_LINEAR_CORRECTION, TOI_BAUMGARTE,
};

use crate::constraint::{
    ContactPositionConstraint, ContactVelocityConstraint, VelocityConstraintPoint,
};
use crate::manifold::{Manifold, WorldManifold};
use crate::separation::point_separation;

/// Condition-number bound above which the 2×2 block matrix is not inverted.
///
/// Nearly-parallel contact points produce a nearly-singular coupling matrix;
/// solving them independently is less accurate but always well-behaved.
const MAX_CONDITION_NUMBER: f64 = 1000.0;

/// One island contact as handed over by the island builder.
///
/// Friction, restitution, and threshold are already combined across the two
/// fixtures; the manifold carries the previous step's accumulated impulses.
#[derive(Debug, Clone)]
pub struct ContactDescriptor {
    /// Body A's solver slot and mass properties.
    pub body_a: SolverBody,
    /// Body B's solver slot and mass properties.
    pub body_b: SolverBody,
    /// Combined friction coefficient.
    pub friction: f64,
    /// Combined restitution coefficient.
    pub restitution: f64,
    /// Relative normal speed below which restitution is ignored.
    pub restitution_threshold: f64,
    /// Surface (conveyor) speed along the contact tangent.
    pub tangent_speed: f64,
    /// Surface radius of shape A.
    pub radius_a: f64,
    /// Surface radius of shape B.
    pub radius_b: f64,
    /// The contact manifold from narrow phase.
    pub manifold: Manifold,
}

/// Which position-correction variant is running.
#[derive(Debug, Clone, Copy)]
enum PositionPass {
    /// Regular end-of-step correction over the whole island.
    Regular,
    /// Time-of-impact correction: only the two bodies of the TOI event move.
    Toi { slot_a: usize, slot_b: usize },
}

/// Sequential-impulse contact solver for one island.
///
/// See the crate docs for the required call order. The solver is plain data
/// plus methods over caller-supplied position/velocity slices; it holds no
/// references between calls, so one instance per worker thread is enough for
/// island-parallel stepping.
#[derive(Debug)]
pub struct ContactSolver {
    step: StepContext,
    velocity_constraints: Vec<ContactVelocityConstraint>,
    position_constraints: Vec<ContactPositionConstraint>,
}

impl Default for ContactSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ContactSolver {
    /// Create an empty solver.
    #[must_use]
    pub fn new() -> Self {
        Self {
            step: StepContext::new(1.0 / 60.0),
            velocity_constraints: Vec::new(),
            position_constraints: Vec::new(),
        }
    }

    /// Cached velocity constraints (read-only, for inspection and tests).
    #[must_use]
    pub fn velocity_constraints(&self) -> &[ContactVelocityConstraint] {
        &self.velocity_constraints
    }

    /// Cached position constraints (read-only, for inspection and tests).
    #[must_use]
    pub fn position_constraints(&self) -> &[ContactPositionConstraint] {
        &self.position_constraints
    }

    /// Build position-independent constraint data for the step.
    ///
    /// Copies material/mass properties out of the descriptors and seeds the
    /// accumulated impulses: scaled by `dt_ratio` when warm starting, zeroed
    /// otherwise. Storage is reused across steps and only ever grows.
    pub fn initialize(&mut self, step: &StepContext, contacts: &[ContactDescriptor]) {
        self.step = *step;
        self.velocity_constraints.clear();
        self.position_constraints.clear();

        for (contact_index, contact) in contacts.iter().enumerate() {
            let manifold = &contact.manifold;
            let point_count = manifold.point_count();
            debug_assert!(point_count > 0, "contact without manifold points");

            let mut vc = ContactVelocityConstraint {
                points: [VelocityConstraintPoint::default(); 2],
                normal: Vector2::zeros(),
                normal_mass: Matrix2::zeros(),
                k: Matrix2::zeros(),
                index_a: contact.body_a.index,
                index_b: contact.body_b.index,
                inv_mass_a: contact.body_a.inv_mass,
                inv_mass_b: contact.body_b.inv_mass,
                inv_inertia_a: contact.body_a.inv_inertia,
                inv_inertia_b: contact.body_b.inv_inertia,
                friction: contact.friction,
                restitution: contact.restitution,
                restitution_threshold: contact.restitution_threshold,
                tangent_speed: contact.tangent_speed,
                point_count,
                contact_index,
            };

            let mut pc = ContactPositionConstraint {
                local_points: [nalgebra::Point2::origin(); 2],
                local_normal: manifold.local_normal,
                local_point: manifold.local_point,
                index_a: contact.body_a.index,
                index_b: contact.body_b.index,
                inv_mass_a: contact.body_a.inv_mass,
                inv_mass_b: contact.body_b.inv_mass,
                local_center_a: contact.body_a.local_center,
                local_center_b: contact.body_b.local_center,
                inv_inertia_a: contact.body_a.inv_inertia,
                inv_inertia_b: contact.body_b.inv_inertia,
                kind: manifold.kind,
                radius_a: contact.radius_a,
                radius_b: contact.radius_b,
                point_count,
            };

            for (j, mp) in manifold.points().iter().enumerate() {
                if step.warm_starting {
                    vc.points[j].normal_impulse = step.dt_ratio * mp.normal_impulse;
                    vc.points[j].tangent_impulse = step.dt_ratio * mp.tangent_impulse;
                }
                pc.local_points[j] = mp.local_point;
            }

            self.velocity_constraints.push(vc);
            self.position_constraints.push(pc);
        }
    }

    /// Compute the position-dependent parts of the velocity constraints.
    ///
    /// Rebuilds world manifold geometry at the current transforms, computes
    /// per-point effective masses and restitution biases, and arms the
    /// two-point block solver when the coupling matrix is well-conditioned.
    pub fn initialize_velocity_constraints(
        &mut self,
        positions: &[BodyPosition],
        velocities: &[BodyVelocity],
    ) {
        for (vc, pc) in self
            .velocity_constraints
            .iter_mut()
            .zip(self.position_constraints.iter())
        {
            let m_a = vc.inv_mass_a;
            let m_b = vc.inv_mass_b;
            let i_a = vc.inv_inertia_a;
            let i_b = vc.inv_inertia_b;

            let pos_a = positions[vc.index_a];
            let pos_b = positions[vc.index_b];
            let vel_a = velocities[vc.index_a];
            let vel_b = velocities[vc.index_b];

            let xf_a = body_transform(&pos_a.center, pos_a.angle, &pc.local_center_a);
            let xf_b = body_transform(&pos_b.center, pos_b.angle, &pc.local_center_b);

            let world = WorldManifold::from_parts(
                pc.kind,
                &pc.local_normal,
                &pc.local_point,
                &pc.local_points[..pc.point_count],
                &xf_a,
                pc.radius_a,
                &xf_b,
                pc.radius_b,
            );

            vc.normal = world.normal;
            let tangent = right_perp(&vc.normal);

            for j in 0..vc.point_count {
                let vcp = &mut vc.points[j];

                vcp.r_a = world.points[j] - pos_a.center;
                vcp.r_b = world.points[j] - pos_b.center;

                let rn_a = cross(&vcp.r_a, &vc.normal);
                let rn_b = cross(&vcp.r_b, &vc.normal);
                let k_normal = m_a + m_b + i_a * rn_a * rn_a + i_b * rn_b * rn_b;
                vcp.normal_mass = if k_normal > 0.0 { 1.0 / k_normal } else { 0.0 };

                let rt_a = cross(&vcp.r_a, &tangent);
                let rt_b = cross(&vcp.r_b, &tangent);
                let k_tangent = m_a + m_b + i_a * rt_a * rt_a + i_b * rt_b * rt_b;
                vcp.tangent_mass = if k_tangent > 0.0 { 1.0 / k_tangent } else { 0.0 };

                vcp.velocity_bias = 0.0;
                let v_rel = vc.normal.dot(
                    &(vel_b.linear + cross_scalar(vel_b.angular, &vcp.r_b)
                        - vel_a.linear
                        - cross_scalar(vel_a.angular, &vcp.r_a)),
                );
                if v_rel < -vc.restitution_threshold {
                    vcp.velocity_bias = -vc.restitution * v_rel;
                }
            }

            if vc.point_count == 2 && self.step.block_solve {
                let rn1_a = cross(&vc.points[0].r_a, &vc.normal);
                let rn1_b = cross(&vc.points[0].r_b, &vc.normal);
                let rn2_a = cross(&vc.points[1].r_a, &vc.normal);
                let rn2_b = cross(&vc.points[1].r_b, &vc.normal);

                let k11 = m_a + m_b + i_a * rn1_a * rn1_a + i_b * rn1_b * rn1_b;
                let k22 = m_a + m_b + i_a * rn2_a * rn2_a + i_b * rn2_b * rn2_b;
                let k12 = m_a + m_b + i_a * rn1_a * rn2_a + i_b * rn1_b * rn2_b;

                if k11 * k11 < MAX_CONDITION_NUMBER * (k11 * k22 - k12 * k12) {
                    vc.k = Matrix2::new(k11, k12, k12, k22);
                    vc.normal_mass = inverse2x2(&vc.k);
                } else {
                    // The two points are nearly redundant; a coupled solve
                    // would amplify noise. Fall back to one point this step.
                    tracing::debug!(
                        contact = vc.contact_index,
                        "ill-conditioned contact pair, using single-point solve"
                    );
                    vc.point_count = 1;
                }
            }
        }
    }

    /// Apply last step's accumulated impulses to the velocities.
    ///
    /// Run once before the iteration loop so the solver resumes from the
    /// previous converged solution instead of from rest. Does not change any
    /// accumulated impulse.
    pub fn warm_start(&mut self, velocities: &mut [BodyVelocity]) {
        for vc in &self.velocity_constraints {
            let mut vel_a = velocities[vc.index_a];
            let mut vel_b = velocities[vc.index_b];
            let tangent = right_perp(&vc.normal);

            for vcp in &vc.points[..vc.point_count] {
                let p = vcp.normal_impulse * vc.normal + vcp.tangent_impulse * tangent;
                vel_a.angular -= vc.inv_inertia_a * cross(&vcp.r_a, &p);
                vel_a.linear -= vc.inv_mass_a * p;
                vel_b.angular += vc.inv_inertia_b * cross(&vcp.r_b, &p);
                vel_b.linear += vc.inv_mass_b * p;
            }

            velocities[vc.index_a] = vel_a;
            velocities[vc.index_b] = vel_b;
        }
    }

    /// One velocity-iteration pass over all contacts.
    ///
    /// Friction first (clamped by the current accumulated normal impulse),
    /// then non-penetration: projected Gauss-Seidel per point, or the 2×2
    /// block LCP by total enumeration when armed.
    pub fn solve_velocity_constraints(&mut self, velocities: &mut [BodyVelocity]) {
        for vc in &mut self.velocity_constraints {
            let m_a = vc.inv_mass_a;
            let m_b = vc.inv_mass_b;
            let i_a = vc.inv_inertia_a;
            let i_b = vc.inv_inertia_b;

            let mut vel_a = velocities[vc.index_a];
            let mut vel_b = velocities[vc.index_b];

            let normal = vc.normal;
            let tangent = right_perp(&normal);
            let friction = vc.friction;

            debug_assert!(vc.point_count == 1 || vc.point_count == 2);

            // Friction, using the normal impulse accumulated so far. Solving
            // tangent first keeps non-penetration (solved after) dominant.
            for vcp in vc.points[..vc.point_count].iter_mut() {
                let dv = vel_b.linear + cross_scalar(vel_b.angular, &vcp.r_b)
                    - vel_a.linear
                    - cross_scalar(vel_a.angular, &vcp.r_a);

                let vt = dv.dot(&tangent) - vc.tangent_speed;
                let lambda = vcp.tangent_mass * (-vt);

                let max_friction = friction * vcp.normal_impulse;
                let new_impulse =
                    (vcp.tangent_impulse + lambda).clamp(-max_friction, max_friction);
                let lambda = new_impulse - vcp.tangent_impulse;
                vcp.tangent_impulse = new_impulse;

                let p = lambda * tangent;
                vel_a.linear -= m_a * p;
                vel_a.angular -= i_a * cross(&vcp.r_a, &p);
                vel_b.linear += m_b * p;
                vel_b.angular += i_b * cross(&vcp.r_b, &p);
            }

            // Non-penetration.
            if vc.point_count == 1 || !self.step.block_solve {
                for vcp in vc.points[..vc.point_count].iter_mut() {
                    let dv = vel_b.linear + cross_scalar(vel_b.angular, &vcp.r_b)
                        - vel_a.linear
                        - cross_scalar(vel_a.angular, &vcp.r_a);

                    let vn = dv.dot(&normal);
                    let lambda = -vcp.normal_mass * (vn - vcp.velocity_bias);

                    // Clamp the accumulated impulse, not the increment.
                    let new_impulse = (vcp.normal_impulse + lambda).max(0.0);
                    let lambda = new_impulse - vcp.normal_impulse;
                    vcp.normal_impulse = new_impulse;

                    let p = lambda * normal;
                    vel_a.linear -= m_a * p;
                    vel_a.angular -= i_a * cross(&vcp.r_a, &p);
                    vel_b.linear += m_b * p;
                    vel_b.angular += i_b * cross(&vcp.r_b, &p);
                }
            } else {
                // Coupled 2-point LCP:
                //
                //   vn = K x + b,  vn >= 0, x >= 0, vn_i * x_i = 0
                //
                // solved by total enumeration of the four complementarity
                // cases. `x` is the *total* accumulated impulse; the applied
                // increment is x - a where a is the previous total, so only
                // the accumulated value is ever clamped.
                let (first, rest) = vc.points.split_at_mut(1);
                let cp1 = &mut first[0];
                let cp2 = &mut rest[0];

                let a = Vector2::new(cp1.normal_impulse, cp2.normal_impulse);
                debug_assert!(a.x >= 0.0 && a.y >= 0.0);

                let dv1 = vel_b.linear + cross_scalar(vel_b.angular, &cp1.r_b)
                    - vel_a.linear
                    - cross_scalar(vel_a.angular, &cp1.r_a);
                let dv2 = vel_b.linear + cross_scalar(vel_b.angular, &cp2.r_b)
                    - vel_a.linear
                    - cross_scalar(vel_a.angular, &cp2.r_a);

                let vn1 = dv1.dot(&normal);
                let vn2 = dv2.dot(&normal);

                let mut b = Vector2::new(vn1 - cp1.velocity_bias, vn2 - cp2.velocity_bias);
                b -= vc.k * a;

                let solution = 'enumerate: {
                    // Case 1: both points active (vn1 = vn2 = 0).
                    let x = -(vc.normal_mass * b);
                    if x.x >= 0.0 && x.y >= 0.0 {
                        break 'enumerate Some(x);
                    }

                    // Case 2: point 1 active, point 2 separating.
                    let x = Vector2::new(-cp1.normal_mass * b.x, 0.0);
                    let vn2 = vc.k[(1, 0)] * x.x + b.y;
                    if x.x >= 0.0 && vn2 >= 0.0 {
                        break 'enumerate Some(x);
                    }

                    // Case 3: point 2 active, point 1 separating.
                    let x = Vector2::new(0.0, -cp2.normal_mass * b.y);
                    let vn1 = vc.k[(0, 1)] * x.y + b.x;
                    if x.y >= 0.0 && vn1 >= 0.0 {
                        break 'enumerate Some(x);
                    }

                    // Case 4: both points separating.
                    if b.x >= 0.0 && b.y >= 0.0 {
                        break 'enumerate Some(Vector2::zeros());
                    }

                    // No admissible case; keep the previous impulses. Rare,
                    // and accepted: the next pass re-solves from scratch.
                    None
                };

                if let Some(x) = solution {
                    let d = x - a;

                    let p1 = d.x * normal;
                    let p2 = d.y * normal;
                    vel_a.linear -= m_a * (p1 + p2);
                    vel_a.angular -= i_a * (cross(&cp1.r_a, &p1) + cross(&cp2.r_a, &p2));
                    vel_b.linear += m_b * (p1 + p2);
                    vel_b.angular += i_b * (cross(&cp1.r_b, &p1) + cross(&cp2.r_b, &p2));

                    cp1.normal_impulse = x.x;
                    cp2.normal_impulse = x.y;
                } else {
                    tracing::trace!(
                        contact = vc.contact_index,
                        "two-point contact LCP unsolvable, keeping previous impulses"
                    );
                }
            }

            velocities[vc.index_a] = vel_a;
            velocities[vc.index_b] = vel_b;
        }
    }

    /// One regular position-correction pass.
    ///
    /// Returns `true` when every separation is within `-3 × LINEAR_SLOP`,
    /// letting the driver stop early.
    pub fn solve_position_constraints(&mut self, positions: &mut [BodyPosition]) -> bool {
        self.solve_positions(positions, PositionPass::Regular)
    }

    /// One time-of-impact position-correction pass.
    ///
    /// Only the two bodies in `slot_a`/`slot_b` are moved; every other body
    /// in the island is treated as infinitely heavy for this pass. The
    /// tolerance is tighter (`-1.5 × LINEAR_SLOP`) because TOI correction
    /// runs per sub-step.
    pub fn solve_toi_position_constraints(
        &mut self,
        positions: &mut [BodyPosition],
        slot_a: usize,
        slot_b: usize,
    ) -> bool {
        self.solve_positions(positions, PositionPass::Toi { slot_a, slot_b })
    }

    fn solve_positions(&mut self, positions: &mut [BodyPosition], pass: PositionPass) -> bool {
        let baumgarte = match pass {
            PositionPass::Regular => CONTACT_BAUMGARTE,
            PositionPass::Toi { .. } => TOI_BAUMGARTE,
        };

        let mut min_separation = 0.0_f64;

        for pc in &self.position_constraints {
            let (m_a, i_a, m_b, i_b) = match pass {
                PositionPass::Regular => {
                    (pc.inv_mass_a, pc.inv_inertia_a, pc.inv_mass_b, pc.inv_inertia_b)
                }
                PositionPass::Toi { slot_a, slot_b } => {
                    let moves_a = pc.index_a == slot_a || pc.index_a == slot_b;
                    let moves_b = pc.index_b == slot_a || pc.index_b == slot_b;
                    (
                        if moves_a { pc.inv_mass_a } else { 0.0 },
                        if moves_a { pc.inv_inertia_a } else { 0.0 },
                        if moves_b { pc.inv_mass_b } else { 0.0 },
                        if moves_b { pc.inv_inertia_b } else { 0.0 },
                    )
                }
            };

            let mut pos_a = positions[pc.index_a];
            let mut pos_b = positions[pc.index_b];

            for j in 0..pc.point_count {
                // Transforms change as this loop nudges the bodies, so the
                // world geometry is recomputed for every point.
                let xf_a = body_transform(&pos_a.center, pos_a.angle, &pc.local_center_a);
                let xf_b = body_transform(&pos_b.center, pos_b.angle, &pc.local_center_b);

                let psm = point_separation(pc, &xf_a, &xf_b, j);
                let normal = psm.normal;
                let separation = psm.separation;

                let r_a = psm.point - pos_a.center;
                let r_b = psm.point - pos_b.center;

                min_separation = min_separation.min(separation);

                // Allow slop, and cap the correction to avoid overshoot.
                let c = (baumgarte * (separation + LINEAR_SLOP))
                    .clamp(-MAX_LINEAR_CORRECTION, 0.0);

                let rn_a = cross(&r_a, &normal);
                let rn_b = cross(&r_b, &normal);
                let k = m_a + m_b + i_a * rn_a * rn_a + i_b * rn_b * rn_b;

                let impulse = if k > 0.0 { -c / k } else { 0.0 };
                let p = impulse * normal;

                pos_a.center -= m_a * p;
                pos_a.angle -= i_a * cross(&r_a, &p);
                pos_b.center += m_b * p;
                pos_b.angle += i_b * cross(&r_b, &p);
            }

            positions[pc.index_a] = pos_a;
            positions[pc.index_b] = pos_b;
        }

        // Corrections stop inside the slop band, so full recovery to zero
        // separation is not expected here.
        match pass {
            PositionPass::Regular => min_separation >= -3.0 * LINEAR_SLOP,
            PositionPass::Toi { .. } => min_separation >= -1.5 * LINEAR_SLOP,
        }
    }

    /// Copy the final accumulated impulses back into the manifolds.
    ///
    /// This is what makes warm starting work: next step's `initialize` reads
    /// these values back out of the manifold points.
    pub fn store_impulses(&self, contacts: &mut [ContactDescriptor]) {
        for vc in &self.velocity_constraints {
            let manifold = &mut contacts[vc.contact_index].manifold;
            for (j, mp) in manifold
                .points_mut()
                .iter_mut()
                .enumerate()
                .take(vc.point_count)
            {
                mp.normal_impulse = vc.points[j].normal_impulse;
                mp.tangent_impulse = vc.points[j].tangent_impulse;
            }
        }
    }
}
