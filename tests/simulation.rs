//! End-to-end simulation tests for impulse2d
//!
//! These exercise the whole pipeline through the public API: stepping,
//! contact lifecycle, sleeping, warm starting, joints, and continuous
//! collision. Tolerances are solver tolerances (slop-scale), not
//! float-epsilon.

use glam::Vec2;
use impulse2d::prelude::*;
use impulse2d::settings::LINEAR_SLOP;

const DT: f32 = 1.0 / 60.0;

// ============================================================================
// Helpers
// ============================================================================

/// Step `world` for `steps` frames with default iteration counts.
fn run_world(world: &mut World, steps: usize) {
    for _ in 0..steps {
        world.step(DT, 8, 3);
    }
}

/// A static ground edge spanning `[-50, 50]` at y = 0.
fn add_ground(world: &mut World) -> BodyHandle {
    let ground = world.create_body(&BodyDef::static_at(Vec2::ZERO)).unwrap();
    world
        .create_fixture(
            ground,
            &FixtureDef::new(Shape::Edge(Edge::new(
                Vec2::new(-50.0, 0.0),
                Vec2::new(50.0, 0.0),
            ))),
        )
        .unwrap();
    ground
}

fn add_circle(world: &mut World, position: Vec2, radius: f32) -> BodyHandle {
    let body = world.create_body(&BodyDef::dynamic_at(position)).unwrap();
    world
        .create_fixture(
            body,
            &FixtureDef::new(Shape::Circle(Circle::new(radius))).with_density(1.0),
        )
        .unwrap();
    body
}

fn add_box(world: &mut World, position: Vec2, hx: f32, hy: f32) -> BodyHandle {
    let body = world.create_body(&BodyDef::dynamic_at(position)).unwrap();
    world
        .create_fixture(
            body,
            &FixtureDef::new(Shape::Polygon(Polygon::boxed(hx, hy))).with_density(1.0),
        )
        .unwrap();
    body
}

// ============================================================================
// Test 1 — Falling circle comes to rest on the ground
// ============================================================================

/// The reference scenario: gravity (0,-10), a unit circle dropped from
/// height 10 onto a static ground plane must end resting with its center
/// one radius above the ground, and stay there.
#[test]
fn test_falling_circle_rests_on_ground() {
    let mut world = World::new(Vec2::new(0.0, -10.0));
    add_ground(&mut world);
    let ball = add_circle(&mut world, Vec2::new(0.0, 10.0), 1.0);

    // Fall time from 9 m is ~1.34 s; give it two seconds to settle.
    run_world(&mut world, 120);

    let y = world.body(ball).unwrap().position().y;
    assert!(
        (y - 1.0).abs() < 4.0 * LINEAR_SLOP,
        "center should rest one radius above ground, y = {y}"
    );

    // Not bouncing: stays put for another second.
    for _ in 0..60 {
        world.step(DT, 8, 3);
        let body = world.body(ball).unwrap();
        assert!(
            body.linear_velocity().length() < 0.1,
            "resting ball should not move, v = {:?}",
            body.linear_velocity()
        );
        assert!((body.position().y - 1.0).abs() < 4.0 * LINEAR_SLOP);
    }
}

// ============================================================================
// Test 2 — Elastic head-on collision exchanges velocities
// ============================================================================

#[test]
fn test_equal_mass_elastic_collision_exchanges_velocities() {
    let mut world = World::new(Vec2::ZERO);
    let make = |world: &mut World, x: f32| {
        let body = world
            .create_body(&BodyDef::dynamic_at(Vec2::new(x, 0.0)))
            .unwrap();
        world
            .create_fixture(
                body,
                &FixtureDef::new(Shape::Circle(Circle::new(0.5)))
                    .with_density(1.0)
                    .with_restitution(1.0),
            )
            .unwrap();
        body
    };
    let left = make(&mut world, -3.0);
    let right = make(&mut world, 3.0);

    world
        .body_mut(left)
        .unwrap()
        .set_linear_velocity(Vec2::new(5.0, 0.0));
    world
        .body_mut(right)
        .unwrap()
        .set_linear_velocity(Vec2::new(-5.0, 0.0));

    run_world(&mut world, 60);

    let v_left = world.body(left).unwrap().linear_velocity();
    let v_right = world.body(right).unwrap().linear_velocity();

    // Velocities swap (within solver tolerance).
    assert!(
        (v_left.x + 5.0).abs() < 0.5,
        "left should bounce back at -5, got {v_left:?}"
    );
    assert!(
        (v_right.x - 5.0).abs() < 0.5,
        "right should bounce back at +5, got {v_right:?}"
    );
}

// ============================================================================
// Test 3 — Resting bodies fall asleep and wake on demand
// ============================================================================

#[test]
fn test_resting_box_sleeps_then_wakes() {
    let mut world = World::new(Vec2::new(0.0, -10.0));
    add_ground(&mut world);
    let crate_box = add_box(&mut world, Vec2::new(0.0, 2.0), 0.5, 0.5);

    run_world(&mut world, 240);

    {
        let body = world.body(crate_box).unwrap();
        assert!(!body.is_awake(), "a settled box should be asleep");
        assert_eq!(body.linear_velocity(), Vec2::ZERO);
    }

    // An impulse wakes it and restarts the sleep timer.
    world
        .body_mut(crate_box)
        .unwrap()
        .apply_linear_impulse(Vec2::new(0.5, 0.0), Vec2::new(0.0, 2.0));
    assert!(world.body(crate_box).unwrap().is_awake());

    // It eventually settles and sleeps again.
    run_world(&mut world, 300);
    assert!(!world.body(crate_box).unwrap().is_awake());
}

// ============================================================================
// Test 4 — Warm-started impulses converge to a fixed point
// ============================================================================

#[test]
fn test_warm_starting_impulses_reach_fixed_point() {
    let mut world = World::new(Vec2::new(0.0, -10.0));
    // Sleeping would zero the velocities and hide the comparison.
    world.set_sleeping_allowed(false);
    add_ground(&mut world);
    add_box(&mut world, Vec2::new(0.0, 0.6), 0.5, 0.5);

    run_world(&mut world, 120);

    let snapshot = |world: &World| -> Vec<f32> {
        let mut impulses = Vec::new();
        for (_, contact) in world.contact_iter() {
            let manifold = contact.manifold();
            for i in 0..manifold.point_count {
                impulses.push(manifold.points[i].normal_impulse);
            }
        }
        impulses.sort_by(|a, b| a.partial_cmp(b).unwrap());
        impulses
    };

    let before = snapshot(&world);
    world.step(DT, 8, 3);
    let after = snapshot(&world);

    assert_eq!(before.len(), after.len());
    assert!(!before.is_empty(), "the box must be in contact");
    for (a, b) in before.iter().zip(after.iter()) {
        assert!(
            (a - b).abs() < 5e-3,
            "impulses should be at a fixed point: {a} vs {b}"
        );
    }
}

// ============================================================================
// Test 5 — Rigid distance joint holds its length
// ============================================================================

#[test]
fn test_rigid_distance_joint_holds_length() {
    let mut world = World::new(Vec2::new(0.0, -10.0));

    let anchor = world
        .create_body(&BodyDef::static_at(Vec2::new(0.0, 10.0)))
        .unwrap();
    let bob = add_circle(&mut world, Vec2::new(2.0, 10.0), 0.25);

    let mut def = DistanceJointDef::new(anchor, bob);
    def.length = 2.0;
    let joint = world.create_joint(JointDef::Distance(def)).unwrap();

    run_world(&mut world, 180);

    let _ = joint;
    // The anchors are the body origins here.
    let anchor_pos = world.body(anchor).unwrap().position();
    let bob_pos = world.body(bob).unwrap().position();
    let distance = anchor_pos.distance(bob_pos);
    assert!(
        (distance - 2.0).abs() < 2.0 * LINEAR_SLOP,
        "pendulum length should stay 2.0, got {distance}"
    );
}

// ============================================================================
// Test 6 — Bullet does not tunnel through a thin wall
// ============================================================================

#[test]
fn test_bullet_stops_at_thin_wall() {
    let mut world = World::new(Vec2::ZERO);

    let wall = world
        .create_body(&BodyDef::static_at(Vec2::new(10.0, 0.0)))
        .unwrap();
    world
        .create_fixture(
            wall,
            &FixtureDef::new(Shape::Polygon(Polygon::boxed(0.05, 5.0))),
        )
        .unwrap();

    let bullet = world
        .create_body(&BodyDef::dynamic_at(Vec2::new(0.0, 0.0)).bullet())
        .unwrap();
    world
        .create_fixture(
            bullet,
            &FixtureDef::new(Shape::Circle(Circle::new(0.1))).with_density(1.0),
        )
        .unwrap();

    // 400 m/s crosses the wall's thickness many times over in one step.
    world
        .body_mut(bullet)
        .unwrap()
        .set_linear_velocity(Vec2::new(400.0, 0.0));

    run_world(&mut world, 10);

    let x = world.body(bullet).unwrap().position().x;
    assert!(
        x < 10.0,
        "bullet must stay on the near side of the wall, x = {x}"
    );
}

/// Same scenario with single-event sub-stepping: resolution is spread over
/// several frames but the wall still holds.
#[test]
fn test_bullet_stops_with_sub_stepping() {
    let mut world = World::new(Vec2::ZERO);
    world.set_sub_stepping(true);

    let wall = world
        .create_body(&BodyDef::static_at(Vec2::new(10.0, 0.0)))
        .unwrap();
    world
        .create_fixture(
            wall,
            &FixtureDef::new(Shape::Polygon(Polygon::boxed(0.05, 5.0))),
        )
        .unwrap();

    let bullet = world
        .create_body(&BodyDef::dynamic_at(Vec2::new(0.0, 0.0)).bullet())
        .unwrap();
    world
        .create_fixture(
            bullet,
            &FixtureDef::new(Shape::Circle(Circle::new(0.1))).with_density(1.0),
        )
        .unwrap();
    world
        .body_mut(bullet)
        .unwrap()
        .set_linear_velocity(Vec2::new(400.0, 0.0));

    run_world(&mut world, 20);
    let x = world.body(bullet).unwrap().position().x;
    assert!(x < 10.0, "sub-stepped bullet must not tunnel, x = {x}");
}

// ============================================================================
// Test 7 — Contact lifecycle fires begin/end exactly once
// ============================================================================

#[test]
fn test_contact_begin_end_fire_once() {
    let mut world = World::new(Vec2::ZERO);

    let make = |world: &mut World, x: f32, vx: f32| {
        let body = world
            .create_body(&BodyDef::dynamic_at(Vec2::new(x, 0.0)))
            .unwrap();
        world
            .create_fixture(
                body,
                &FixtureDef::new(Shape::Circle(Circle::new(0.5)))
                    .with_density(1.0)
                    .with_restitution(0.8),
            )
            .unwrap();
        world
            .body_mut(body)
            .unwrap()
            .set_linear_velocity(Vec2::new(vx, 0.0));
        body
    };
    let _left = make(&mut world, -3.0, 4.0);
    let _right = make(&mut world, 3.0, -4.0);

    let mut begins = 0;
    let mut ends = 0;
    for _ in 0..180 {
        world.step(DT, 8, 3);
        for event in world.drain_events() {
            match event.kind {
                ContactEventKind::Begin => begins += 1,
                ContactEventKind::End => ends += 1,
            }
        }
    }

    assert_eq!(begins, 1, "exactly one begin event");
    assert_eq!(ends, 1, "exactly one end event");
}

#[test]
fn test_destroying_touching_body_fires_end() {
    let mut world = World::new(Vec2::ZERO);

    // Overlapping circles: touching from the first step.
    let a = add_circle(&mut world, Vec2::new(0.0, 0.0), 0.5);
    let _b = add_circle(&mut world, Vec2::new(0.6, 0.0), 0.5);

    world.step(DT, 8, 3);
    let begins = world
        .drain_events()
        .iter()
        .filter(|e| e.kind == ContactEventKind::Begin)
        .count();
    assert_eq!(begins, 1);

    world.destroy_body(a).unwrap();
    let ends = world
        .drain_events()
        .iter()
        .filter(|e| e.kind == ContactEventKind::End)
        .count();
    assert_eq!(ends, 1, "mid-overlap destruction fires exactly one end");
}

// ============================================================================
// Test 8 — Sensors report overlap without response
// ============================================================================

#[test]
fn test_sensor_reports_but_does_not_push() {
    let mut world = World::new(Vec2::ZERO);

    let zone = world
        .create_body(&BodyDef::static_at(Vec2::new(5.0, 0.0)))
        .unwrap();
    world
        .create_fixture(
            zone,
            &FixtureDef::new(Shape::Polygon(Polygon::boxed(1.0, 1.0))).sensor(),
        )
        .unwrap();

    let probe = add_circle(&mut world, Vec2::new(0.0, 0.0), 0.25);
    world
        .body_mut(probe)
        .unwrap()
        .set_linear_velocity(Vec2::new(5.0, 0.0));

    let mut begins = 0;
    let mut ends = 0;
    for _ in 0..180 {
        world.step(DT, 8, 3);
        for event in world.drain_events() {
            match event.kind {
                ContactEventKind::Begin => begins += 1,
                ContactEventKind::End => ends += 1,
            }
        }
    }

    assert_eq!(begins, 1, "sensor should report entry");
    assert_eq!(ends, 1, "sensor should report exit");
    // The probe sailed straight through.
    assert!(world.body(probe).unwrap().position().x > 7.0);
    let vy = world.body(probe).unwrap().linear_velocity().y;
    assert!(vy.abs() < 1e-3, "sensor must not deflect the probe");
}

// ============================================================================
// Test 9 — Joint validation
// ============================================================================

#[test]
fn test_joint_requires_distinct_bodies() {
    let mut world = World::new(Vec2::ZERO);
    let body = add_circle(&mut world, Vec2::ZERO, 0.5);

    let def = DistanceJointDef::new(body, body);
    let err = world.create_joint(JointDef::Distance(def)).unwrap_err();
    assert!(matches!(err, WorldError::InvalidJoint { .. }));
}

#[test]
fn test_gear_rejects_ungrounded_links() {
    let mut world = World::new(Vec2::ZERO);

    // Two dynamic bodies pinned together: not a valid gear link.
    let a = add_circle(&mut world, Vec2::new(0.0, 0.0), 0.5);
    let b = add_circle(&mut world, Vec2::new(2.0, 0.0), 0.5);
    let c = add_circle(&mut world, Vec2::new(4.0, 0.0), 0.5);
    let j1 = world
        .create_joint(JointDef::Revolute(RevoluteJointDef::new(a, b)))
        .unwrap();
    let j2 = world
        .create_joint(JointDef::Revolute(RevoluteJointDef::new(b, c)))
        .unwrap();

    let err = world
        .create_joint(JointDef::Gear(GearJointDef {
            joint_a: j1,
            joint_b: j2,
            ratio: 2.0,
        }))
        .unwrap_err();
    assert!(matches!(err, WorldError::InvalidJoint { .. }));
}

// ============================================================================
// Test 10 — Gear couples two grounded revolutes by its ratio
// ============================================================================

#[test]
fn test_gear_holds_coordinate_ratio() {
    let mut world = World::new(Vec2::ZERO);

    let ground = world.create_body(&BodyDef::static_at(Vec2::ZERO)).unwrap();

    let wheel_a = add_circle(&mut world, Vec2::new(-2.0, 0.0), 0.5);
    let wheel_b = add_circle(&mut world, Vec2::new(2.0, 0.0), 0.5);

    let mut def_a = RevoluteJointDef::new(ground, wheel_a);
    def_a.local_anchor_a = Vec2::new(-2.0, 0.0);
    let j_a = world.create_joint(JointDef::Revolute(def_a)).unwrap();

    let mut def_b = RevoluteJointDef::new(ground, wheel_b);
    def_b.local_anchor_a = Vec2::new(2.0, 0.0);
    let j_b = world.create_joint(JointDef::Revolute(def_b)).unwrap();

    let ratio = 2.0;
    world
        .create_joint(JointDef::Gear(GearJointDef {
            joint_a: j_a,
            joint_b: j_b,
            ratio,
        }))
        .unwrap();

    // Spin wheel A; the gear drives wheel B against it.
    world
        .body_mut(wheel_a)
        .unwrap()
        .set_angular_velocity(4.0);

    run_world(&mut world, 120);

    let angle_a = world.body(wheel_a).unwrap().angle();
    let angle_b = world.body(wheel_b).unwrap().angle();
    let coordinate = angle_a + ratio * angle_b;
    assert!(
        coordinate.abs() < 0.05,
        "gear constraint should hold angle_a + ratio * angle_b near 0, got {coordinate}"
    );
}

// ============================================================================
// Test 11 — Rope joint caps separation
// ============================================================================

#[test]
fn test_rope_joint_caps_length() {
    let mut world = World::new(Vec2::new(0.0, -10.0));

    let anchor = world
        .create_body(&BodyDef::static_at(Vec2::new(0.0, 10.0)))
        .unwrap();
    let weight = add_circle(&mut world, Vec2::new(0.0, 9.0), 0.25);

    let mut def = RopeJointDef::new(anchor, weight);
    def.local_anchor_a = Vec2::ZERO;
    def.local_anchor_b = Vec2::ZERO;
    def.max_length = 3.0;
    world.create_joint(JointDef::Rope(def)).unwrap();

    run_world(&mut world, 240);

    let separation = world
        .body(weight)
        .unwrap()
        .position()
        .distance(Vec2::new(0.0, 10.0));
    assert!(
        separation <= 3.0 + 10.0 * LINEAR_SLOP,
        "rope should stop the fall at max length, got {separation}"
    );
    assert!(
        separation > 2.5,
        "the weight should actually hang, got {separation}"
    );
}

// ============================================================================
// Test 12 — Revolute motor reaches its target speed
// ============================================================================

#[test]
fn test_revolute_motor_spins_up() {
    let mut world = World::new(Vec2::ZERO);

    let ground = world.create_body(&BodyDef::static_at(Vec2::ZERO)).unwrap();
    let rotor = add_box(&mut world, Vec2::ZERO, 1.0, 0.1);

    let def = RevoluteJointDef::new(ground, rotor).with_motor(5.0, 1000.0);
    world.create_joint(JointDef::Revolute(def)).unwrap();

    run_world(&mut world, 120);

    let w = world.body(rotor).unwrap().angular_velocity();
    assert!((w - 5.0).abs() < 0.1, "motor should hold 5 rad/s, got {w}");
}

// ============================================================================
// Test 13 — Prismatic limit stops the slider
// ============================================================================

#[test]
fn test_prismatic_limit_holds() {
    let mut world = World::new(Vec2::new(0.0, -10.0));

    let ground = world
        .create_body(&BodyDef::static_at(Vec2::ZERO))
        .unwrap();
    let slider = add_box(&mut world, Vec2::new(0.0, 5.0), 0.5, 0.5);

    // Vertical slide rail with a hard stop 2 m below the start.
    let mut def = PrismaticJointDef::new(ground, slider).with_limit(0.0, 3.0);
    def.local_anchor_a = Vec2::new(0.0, 5.0);
    def.local_axis_a = Vec2::new(0.0, -1.0);
    world.create_joint(JointDef::Prismatic(def)).unwrap();

    run_world(&mut world, 240);

    let y = world.body(slider).unwrap().position().y;
    assert!(
        (y - 2.0).abs() < 0.05,
        "slider should hang at the lower stop (y = 2), got {y}"
    );
    let x = world.body(slider).unwrap().position().x;
    assert!(x.abs() < 0.01, "slider must stay on the rail, x = {x}");
}

// ============================================================================
// Test 14 — Constant-volume blob keeps its area
// ============================================================================

#[test]
fn test_constant_volume_blob_keeps_area() {
    let mut world = World::new(Vec2::new(0.0, -10.0));
    add_ground(&mut world);

    // A ring of small circles above the ground.
    let n = 12;
    let ring_radius = 1.5;
    let center = Vec2::new(0.0, 3.0);
    let mut bodies = Vec::new();
    for i in 0..n {
        let angle = i as f32 / n as f32 * core::f32::consts::TAU;
        let position = center + ring_radius * Vec2::new(angle.cos(), angle.sin());
        bodies.push(add_circle(&mut world, position, 0.2));
    }

    let area_of = |world: &World, bodies: &[BodyHandle]| -> f32 {
        let mut area = 0.0;
        for i in 0..bodies.len() {
            let next = (i + 1) % bodies.len();
            let p = world.body(bodies[i]).unwrap().world_center();
            let q = world.body(bodies[next]).unwrap().world_center();
            area += p.x * q.y - q.x * p.y;
        }
        0.5 * area
    };

    let def = ConstantVolumeJointDef::new(bodies.clone()).with_spring(10.0, 1.0);
    world.create_joint(JointDef::ConstantVolume(def)).unwrap();

    let initial_area = area_of(&world, &bodies);
    run_world(&mut world, 240);
    let final_area = area_of(&world, &bodies);

    let ratio = final_area / initial_area;
    assert!(
        (0.85..1.15).contains(&ratio),
        "blob should land without losing its area: ratio {ratio}"
    );
}

// ============================================================================
// Test 15 — Queries
// ============================================================================

#[test]
fn test_query_aabb_and_ray_cast() {
    let mut world = World::new(Vec2::ZERO);
    let _ground = add_ground(&mut world);
    let target = add_box(&mut world, Vec2::new(5.0, 1.0), 0.5, 0.5);
    // Register the fixtures' proxies in the pair table.
    world.step(DT, 8, 3);

    let mut found = Vec::new();
    world.query_aabb(
        &Aabb::new(Vec2::new(4.0, 0.5), Vec2::new(6.0, 1.5)),
        |fixture| {
            found.push(fixture);
            true
        },
    );
    assert_eq!(found.len(), 1);
    assert_eq!(
        world.fixture(found[0]).unwrap().body(),
        target,
        "the query box only covers the target"
    );

    // Closest-hit ray cast from the left.
    let mut closest = None;
    world.ray_cast(
        Vec2::new(0.0, 1.0),
        Vec2::new(10.0, 1.0),
        |fixture, point, _normal, fraction| {
            closest = Some((fixture, point));
            fraction
        },
    );
    let (fixture, point) = closest.expect("ray should hit the box");
    assert_eq!(world.fixture(fixture).unwrap().body(), target);
    assert!((point.x - 4.5).abs() < 0.05, "hit the near face, x = {}", point.x);
}

// ============================================================================
// Test 16 — Determinism
// ============================================================================

#[test]
fn test_identical_runs_are_bit_identical() {
    let build = || {
        let mut world = World::new(Vec2::new(0.0, -10.0));
        add_ground(&mut world);
        for i in 0..5 {
            add_box(
                &mut world,
                Vec2::new(0.1 * i as f32, 1.0 + 1.2 * i as f32),
                0.5,
                0.5,
            );
        }
        world
    };

    let mut world1 = build();
    let mut world2 = build();
    run_world(&mut world1, 120);
    run_world(&mut world2, 120);

    let positions = |world: &World| -> Vec<(u32, u32, u32)> {
        world
            .body_iter()
            .map(|(_, b)| {
                (
                    b.position().x.to_bits(),
                    b.position().y.to_bits(),
                    b.angle().to_bits(),
                )
            })
            .collect()
    };
    assert_eq!(
        positions(&world1),
        positions(&world2),
        "same inputs must give bit-identical states"
    );
}

// ============================================================================
// Test 17 — Stack stability
// ============================================================================

#[test]
fn test_box_stack_settles() {
    // A small stack is the classic stability smoke test: warm starting and
    // the block solver keep it standing.
    let mut world = World::new(Vec2::new(0.0, -10.0));
    add_ground(&mut world);

    let mut boxes = Vec::new();
    for i in 0..5 {
        boxes.push(add_box(&mut world, Vec2::new(0.0, 0.55 + 1.02 * i as f32), 0.5, 0.5));
    }

    run_world(&mut world, 300);

    for (i, &handle) in boxes.iter().enumerate() {
        let p = world.body(handle).unwrap().position();
        assert!(
            p.x.abs() < 0.25,
            "box {i} drifted sideways to {}",
            p.x
        );
        let expected_y = 0.5 + 1.0 * i as f32;
        assert!(
            (p.y - expected_y).abs() < 0.2,
            "box {i} should sit near y = {expected_y}, got {}",
            p.y
        );
    }
}

// ============================================================================
// Test 18 — Mouse joint drags a body to its target
// ============================================================================

#[test]
fn test_mouse_joint_drags_body() {
    let mut world = World::new(Vec2::ZERO);

    let ground = world.create_body(&BodyDef::static_at(Vec2::ZERO)).unwrap();
    let grabbed = add_box(&mut world, Vec2::new(0.0, 0.0), 0.5, 0.5);

    let mass = world.body(grabbed).unwrap().mass();
    let def = MouseJointDef::new(ground, grabbed, Vec2::ZERO).with_max_force(1000.0 * mass);
    let joint = world.create_joint(JointDef::Mouse(def)).unwrap();

    // Move the target and let the spring pull the box over.
    if let JointKind::Mouse(mouse) = world.joint_mut(joint).unwrap().kind_mut() {
        mouse.set_target(Vec2::new(4.0, 2.0));
    }
    world.body_mut(grabbed).unwrap().set_awake(true);

    run_world(&mut world, 180);

    let p = world.body(grabbed).unwrap().position();
    assert!(
        p.distance(Vec2::new(4.0, 2.0)) < 0.1,
        "box should settle on the target, got {p:?}"
    );
}
