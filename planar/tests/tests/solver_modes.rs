//! Two-point manifolds: block solver versus independent points, the
//! ill-conditioned downgrade, and the time-of-impact position pass.

use approx::assert_relative_eq;
use nalgebra::{Point2, Vector2};
use planar_contact::{
    ContactDescriptor, ContactId, ContactSolver, Manifold, ManifoldKind, ManifoldPoint,
};
use planar_types::{
    math::cross_scalar, BodyPosition, BodyVelocity, SolverBody, StepContext, LINEAR_SLOP,
};

const DT: f64 = 1.0 / 60.0;

/// A unit box resting its two bottom corners on the ground plane.
fn box_on_ground(overlap: f64) -> (ContactDescriptor, Vec<BodyPosition>, Vec<BodyVelocity>) {
    let mut manifold = Manifold::new(ManifoldKind::FaceA, Vector2::y(), Point2::origin());
    manifold.push(ManifoldPoint::new(Point2::new(-0.5, -0.5), ContactId::new(1)));
    manifold.push(ManifoldPoint::new(Point2::new(0.5, -0.5), ContactId::new(2)));

    let descriptor = ContactDescriptor {
        body_a: SolverBody::fixed(0),
        body_b: SolverBody::dynamic(1, 1.0, 1.0 / 6.0, Vector2::zeros()),
        friction: 0.5,
        restitution: 0.0,
        restitution_threshold: 1.0,
        tangent_speed: 0.0,
        radius_a: 0.0,
        radius_b: 0.0,
        manifold,
    };
    let positions = vec![
        BodyPosition::default(),
        BodyPosition::new(Point2::new(0.0, 0.5 - overlap), 0.0),
    ];
    (descriptor, positions, vec![BodyVelocity::zero(); 2])
}

/// Normal velocity of the box at a world contact point.
fn normal_speed(velocity: BodyVelocity, center: Point2<f64>, point: Point2<f64>) -> f64 {
    let r = point - center;
    (velocity.linear + cross_scalar(velocity.angular, &r)).y
}

fn solve_with(step: &StepContext) -> (ContactSolver, Vec<BodyPosition>, Vec<BodyVelocity>) {
    let (descriptor, positions, mut velocities) = box_on_ground(0.01);
    velocities[1].linear.y = -1.0;

    let mut solver = ContactSolver::new();
    solver.initialize(step, &[descriptor]);
    solver.initialize_velocity_constraints(&positions, &velocities);
    solver.warm_start(&mut velocities);
    for _ in 0..step.velocity_iterations {
        solver.solve_velocity_constraints(&mut velocities);
    }
    (solver, positions, velocities)
}

#[test]
fn block_solver_stops_a_falling_box() {
    let step = StepContext::new(DT);
    let (solver, positions, velocities) = solve_with(&step);

    let vc = &solver.velocity_constraints()[0];
    assert_eq!(vc.point_count, 2);
    assert!(vc.points[0].normal_impulse >= 0.0);
    assert!(vc.points[1].normal_impulse >= 0.0);

    let center = positions[1].center;
    for x in [-0.5, 0.5] {
        let vn = normal_speed(velocities[1], center, Point2::new(x, 0.0));
        assert!(vn >= -1e-9, "still approaching at x={x}: {vn}");
        assert_relative_eq!(vn, 0.0, epsilon = 1e-6);
    }
}

#[test]
fn independent_points_reach_the_same_rest_state() {
    let step = StepContext::new(DT).with_block_solve(false);
    let (solver, positions, velocities) = solve_with(&step);

    // Both points stay active; they are just solved one at a time.
    assert_eq!(solver.velocity_constraints()[0].point_count, 2);

    let center = positions[1].center;
    for x in [-0.5, 0.5] {
        let vn = normal_speed(velocities[1], center, Point2::new(x, 0.0));
        assert_relative_eq!(vn, 0.0, epsilon = 1e-6);
    }
}

#[test]
fn block_and_pointwise_agree_on_total_impulse() {
    let blocked = solve_with(&StepContext::new(DT));
    let pointwise = solve_with(&StepContext::new(DT).with_block_solve(false));

    let total = |solver: &ContactSolver| {
        let vc = &solver.velocity_constraints()[0];
        vc.points[0].normal_impulse + vc.points[1].normal_impulse
    };
    // The symmetric drop admits a unique impulse total; the solve mode only
    // changes the path there.
    assert_relative_eq!(total(&blocked.0), total(&pointwise.0), epsilon = 1e-4);
}

#[test]
fn coincident_points_downgrade_to_a_single_point() {
    let (mut descriptor, positions, velocities) = box_on_ground(0.01);
    // Degenerate manifold: both points at the same corner.
    descriptor.manifold = Manifold::new(ManifoldKind::FaceA, Vector2::y(), Point2::origin());
    descriptor
        .manifold
        .push(ManifoldPoint::new(Point2::new(0.0, -0.5), ContactId::new(1)));
    descriptor
        .manifold
        .push(ManifoldPoint::new(Point2::new(0.0, -0.5), ContactId::new(2)));

    let step = StepContext::new(DT);
    let mut solver = ContactSolver::new();
    solver.initialize(&step, &[descriptor]);
    solver.initialize_velocity_constraints(&positions, &velocities);

    // The velocity constraint falls back to one point; the position
    // constraint keeps both so penetration recovery still sees them.
    assert_eq!(solver.velocity_constraints()[0].point_count, 1);
    assert_eq!(solver.position_constraints()[0].point_count, 2);
}

#[test]
fn degenerate_geometry_keeps_effective_masses_non_negative() {
    // Two circles with coincident centers: no usable normal direction.
    let descriptor = ContactDescriptor {
        body_a: SolverBody::dynamic(0, 1.0, 0.125, Vector2::zeros()),
        body_b: SolverBody::dynamic(1, 1.0, 0.125, Vector2::zeros()),
        friction: 0.5,
        restitution: 0.0,
        restitution_threshold: 1.0,
        tangent_speed: 0.0,
        radius_a: 0.5,
        radius_b: 0.5,
        manifold: Manifold::circles(Point2::origin(), Point2::origin(), ContactId::new(9)),
    };
    let positions = vec![BodyPosition::default(); 2];
    let mut velocities = vec![BodyVelocity::default(); 2];

    let step = StepContext::new(DT);
    let mut solver = ContactSolver::new();
    solver.initialize(&step, &[descriptor]);
    solver.initialize_velocity_constraints(&positions, &velocities);
    for _ in 0..step.velocity_iterations {
        solver.solve_velocity_constraints(&mut velocities);
    }

    let vc = &solver.velocity_constraints()[0];
    for point in &vc.points[..vc.point_count] {
        assert!(point.normal_mass >= 0.0);
        assert!(point.tangent_mass >= 0.0);
        assert!(point.normal_impulse >= 0.0);
        assert!(point.normal_impulse.is_finite());
    }
    assert!(velocities[0].linear.norm().is_finite());
}

#[test]
fn toi_position_pass_meets_the_tighter_tolerance() {
    let (descriptor, mut positions, _) = box_on_ground(0.05);

    let step = StepContext::new(DT);
    let mut solver = ContactSolver::new();
    solver.initialize(&step, &[descriptor]);

    let mut converged = false;
    for _ in 0..20 {
        converged = solver.solve_toi_position_constraints(&mut positions, 0, 1);
        if converged {
            break;
        }
    }
    assert!(converged);
    // Tolerance for TOI recovery is -1.5 * slop on the worst point.
    assert!(positions[1].center.y >= 0.5 - 1.5 * LINEAR_SLOP);
    // The static ground never moves.
    assert_eq!(positions[0], BodyPosition::default());
}

#[test]
fn toi_pass_ignores_contacts_of_uninvolved_bodies() {
    let (descriptor, mut positions, _) = box_on_ground(0.05);

    let step = StepContext::new(DT);
    let mut solver = ContactSolver::new();
    solver.initialize(&step, &[descriptor]);

    // The TOI event names slots 2 and 3; this contact's bodies are frozen.
    let before = positions.clone();
    solver.solve_toi_position_constraints(&mut positions, 2, 3);
    assert_eq!(positions, before);
}
