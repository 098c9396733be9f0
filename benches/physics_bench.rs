//! Benchmarks for impulse2d
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use glam::Vec2;
use impulse2d::prelude::*;

const DT: f32 = 1.0 / 60.0;

fn world_with_ground() -> World {
    let mut world = World::new(Vec2::new(0.0, -10.0));
    let ground = world.create_body(&BodyDef::static_at(Vec2::ZERO)).unwrap();
    world
        .create_fixture(
            ground,
            &FixtureDef::new(Shape::Edge(Edge::new(
                Vec2::new(-100.0, 0.0),
                Vec2::new(100.0, 0.0),
            ))),
        )
        .unwrap();
    world
}

// ============================================================================
// Stepping benchmarks
// ============================================================================

fn bench_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("step");

    group.bench_function("single_body_60_steps", |b| {
        b.iter(|| {
            let mut world = world_with_ground();
            let body = world
                .create_body(&BodyDef::dynamic_at(Vec2::new(0.0, 20.0)))
                .unwrap();
            world
                .create_fixture(
                    body,
                    &FixtureDef::new(Shape::Circle(Circle::new(0.5))).with_density(1.0),
                )
                .unwrap();
            for _ in 0..60 {
                world.step(black_box(DT), 8, 3);
            }
            world.body(body).unwrap().position()
        });
    });

    group.bench_function("pyramid_55_boxes_60_steps", |b| {
        b.iter(|| {
            let mut world = world_with_ground();
            // Rows of boxes stacked into a pyramid.
            let rows = 10;
            for row in 0..rows {
                let count = rows - row;
                for i in 0..count {
                    let x = (i as f32 - count as f32 * 0.5) * 1.05;
                    let y = 0.55 + row as f32 * 1.05;
                    let body = world
                        .create_body(&BodyDef::dynamic_at(Vec2::new(x, y)))
                        .unwrap();
                    world
                        .create_fixture(
                            body,
                            &FixtureDef::new(Shape::Polygon(Polygon::boxed(0.5, 0.5)))
                                .with_density(1.0),
                        )
                        .unwrap();
                }
            }
            for _ in 0..60 {
                world.step(black_box(DT), 8, 3);
            }
            world.contact_count()
        });
    });

    group.bench_function("bullet_through_field_10_steps", |b| {
        b.iter(|| {
            let mut world = world_with_ground();
            // A line of thin static walls plus one fast bullet.
            for i in 0..8 {
                let wall = world
                    .create_body(&BodyDef::static_at(Vec2::new(4.0 + 4.0 * i as f32, 2.0)))
                    .unwrap();
                world
                    .create_fixture(
                        wall,
                        &FixtureDef::new(Shape::Polygon(Polygon::boxed(0.05, 2.0))),
                    )
                    .unwrap();
            }
            let bullet = world
                .create_body(&BodyDef::dynamic_at(Vec2::new(0.0, 2.0)).bullet())
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
                .set_linear_velocity(Vec2::new(300.0, 0.0));
            for _ in 0..10 {
                world.step(black_box(DT), 8, 3);
            }
            world.body(bullet).unwrap().position()
        });
    });

    group.finish();
}

// ============================================================================
// Joint benchmarks
// ============================================================================

fn bench_joints(c: &mut Criterion) {
    let mut group = c.benchmark_group("joints");

    group.bench_function("chain_of_30_revolutes_60_steps", |b| {
        b.iter(|| {
            let mut world = World::new(Vec2::new(0.0, -10.0));
            let anchor = world
                .create_body(&BodyDef::static_at(Vec2::new(0.0, 20.0)))
                .unwrap();
            let mut prev = anchor;
            for i in 0..30 {
                let link = world
                    .create_body(&BodyDef::dynamic_at(Vec2::new(0.6 * (i + 1) as f32, 20.0)))
                    .unwrap();
                world
                    .create_fixture(
                        link,
                        &FixtureDef::new(Shape::Polygon(Polygon::boxed(0.3, 0.1)))
                            .with_density(1.0),
                    )
                    .unwrap();
                let mut def = RevoluteJointDef::new(prev, link);
                def.local_anchor_a = if i == 0 {
                    Vec2::ZERO
                } else {
                    Vec2::new(0.3, 0.0)
                };
                def.local_anchor_b = Vec2::new(-0.3, 0.0);
                world.create_joint(JointDef::Revolute(def)).unwrap();
                prev = link;
            }
            for _ in 0..60 {
                world.step(black_box(DT), 8, 3);
            }
            world.body(prev).unwrap().position()
        });
    });

    group.finish();
}

criterion_group!(benches, bench_step, bench_joints);
criterion_main!(benches);
