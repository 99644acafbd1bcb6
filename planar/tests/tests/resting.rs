//! End-to-end contact behavior: resting, stacking, friction, restitution.

use approx::assert_relative_eq;
use nalgebra::Point2;
use planar_tests::TestWorld;
use planar_types::{StepContext, LINEAR_SLOP};

const DT: f64 = 1.0 / 60.0;

#[test]
fn circle_comes_to_rest_on_the_ground() {
    let mut world = TestWorld::new();
    world.add_ground();
    let ball = world.add_circle(Point2::new(0.0, 2.0), 0.5, 1.0);

    let step = StepContext::new(DT);
    world.run(&step, 180);

    let height = world.position(ball).center.y;
    assert!(height >= 0.5 - 3.0 * LINEAR_SLOP, "sank to {height}");
    assert!(height <= 0.5 + LINEAR_SLOP, "floating at {height}");
    assert!(world.velocity(ball).linear.y.abs() < 0.01);
}

#[test]
fn two_circles_rest_side_by_side() {
    let mut world = TestWorld::new();
    world.add_ground();
    let left = world.add_circle(Point2::new(-0.6, 1.0), 0.5, 1.0);
    let right = world.add_circle(Point2::new(0.6, 1.0), 0.5, 1.0);

    let step = StepContext::new(DT);
    world.run(&step, 180);

    for ball in [left, right] {
        let height = world.position(ball).center.y;
        assert!(height >= 0.5 - 3.0 * LINEAR_SLOP);
        assert!(height <= 0.5 + LINEAR_SLOP);
        assert!(world.velocity(ball).linear.norm() < 0.02);
    }
    // Neither ball may be squeezed into the other.
    let gap = world.position(right).center.x - world.position(left).center.x;
    assert!(gap >= 1.0 - 3.0 * LINEAR_SLOP);
}

#[test]
fn resting_contact_carries_the_weight_impulse() {
    let mut world = TestWorld::new();
    world.add_ground();
    world.add_circle(Point2::new(0.0, 0.5), 0.5, 1.0);

    let step = StepContext::new(DT);
    world.run(&step, 120);

    // In steady state one step's normal impulse balances one step of
    // gravity: m * g * dt.
    let contact = world.contact(0, 1).expect("ball should touch the ground");
    let impulse = contact.manifold.points()[0].normal_impulse;
    assert_relative_eq!(impulse, 10.0 * DT, epsilon = 1e-3);
}

#[test]
fn warm_started_stack_is_stable_across_steps() {
    let mut world = TestWorld::new();
    world.add_ground();
    let bottom = world.add_circle(Point2::new(0.0, 0.5), 0.5, 1.0);
    let top = world.add_circle(Point2::new(0.0, 1.5), 0.5, 1.0);

    let step = StepContext::new(DT);
    world.run(&step, 240);

    let settled_bottom = world.position(bottom).center.y;
    let settled_top = world.position(top).center.y;

    // Another second of stepping must not change a settled stack.
    world.run(&step, 60);
    assert_relative_eq!(world.position(bottom).center.y, settled_bottom, epsilon = 1e-3);
    assert_relative_eq!(world.position(top).center.y, settled_top, epsilon = 1e-3);
    assert!(world.velocity(top).linear.norm() < 0.02);
}

#[test]
fn friction_converts_sliding_into_rolling() {
    let mut world = TestWorld::new();
    world.add_ground();
    let ball = world.add_circle(Point2::new(0.0, 0.5), 0.5, 1.0);

    let step = StepContext::new(DT);
    world.run(&step, 30);
    world.velocity_mut(ball).linear.x = 2.0;

    world.run(&step, 300);

    // Friction spins the ball up until the contact point stops slipping:
    // for a uniform disk that happens at 2/3 of the launch speed.
    let vel = world.velocity(ball);
    let slip = vel.linear.x + 0.5 * vel.angular;
    assert!(slip.abs() < 0.05, "still slipping at {slip}");
    assert_relative_eq!(vel.linear.x, 2.0 / 1.5, epsilon = 0.05);
}

#[test]
fn friction_impulse_never_exceeds_the_coulomb_cone() {
    let mut world = TestWorld::new();
    world.add_ground();
    let ball = world.add_circle(Point2::new(0.0, 0.5), 0.5, 1.0);

    let step = StepContext::new(DT);
    world.run(&step, 10);
    world.velocity_mut(ball).linear.x = 3.0;

    for _ in 0..120 {
        world.step(&step);
        for vc in world.solver().velocity_constraints() {
            for point in &vc.points[..vc.point_count] {
                assert!(
                    point.tangent_impulse.abs() <= vc.friction * point.normal_impulse + 1e-9,
                    "friction impulse outside the cone"
                );
            }
        }
    }
}

#[test]
fn restitution_bounces_a_dropped_circle() {
    let mut world = TestWorld::new();
    world.restitution = 0.8;
    world.add_ground();
    let ball = world.add_circle(Point2::new(0.0, 3.0), 0.5, 1.0);

    let step = StepContext::new(DT);
    let mut peak_after_bounce = 0.0_f64;
    let mut bounced = false;
    for _ in 0..240 {
        world.step(&step);
        let vy = world.velocity(ball).linear.y;
        if vy > 0.1 {
            bounced = true;
        }
        if bounced {
            peak_after_bounce = peak_after_bounce.max(world.position(ball).center.y);
        }
    }

    assert!(bounced, "ball never bounced");
    // Restitution 0.8 returns ~64% of the drop height; well above half a
    // meter from a 2.5 m drop even with solver losses.
    assert!(peak_after_bounce > 1.0, "peak was {peak_after_bounce}");
}

#[test]
fn conveyor_belt_drags_a_resting_circle() {
    let mut world = TestWorld::new();
    world.conveyor_speed = 2.0;
    world.add_ground();
    let ball = world.add_circle(Point2::new(0.0, 0.5), 0.5, 1.0);

    let step = StepContext::new(DT);
    world.run(&step, 240);

    // The belt accelerates the contact point to belt speed; the ball ends
    // up translating and spinning.
    let vel = world.velocity(ball);
    let surface_speed = vel.linear.x + 0.5 * vel.angular;
    assert_relative_eq!(surface_speed, 2.0, epsilon = 0.05);
    assert!(vel.linear.x > 0.3);
}
