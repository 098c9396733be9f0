//! Persistent Contacts
//!
//! A contact exists for every broad-phase-overlapping fixture pair that is
//! allowed to collide, whether or not the shapes actually touch. It caches
//! the narrow-phase manifold between steps, carrying the solved impulses
//! forward (matched by contact feature id) for warm starting, and tracks
//! the state the continuous-collision loop needs: a cached time-of-impact
//! fraction and a sub-step budget counter.

use crate::arena::{Arena, Handle};
use crate::body::{Body, BodyHandle};
use crate::collision::Manifold;
use crate::distance;
use crate::event::{ContactEvent, ContactEventKind, EventCollector};
use crate::fixture::{Fixture, FixtureHandle};
use crate::narrow_phase;
use crate::settings::{mix_friction, mix_restitution};

/// Handle to a contact in the world.
pub type ContactHandle = Handle<Contact>;

/// A persistent fixture-pair contact.
pub struct Contact {
    pub(crate) fixture_a: FixtureHandle,
    pub(crate) fixture_b: FixtureHandle,
    pub(crate) child_a: usize,
    pub(crate) child_b: usize,
    /// Cached owning bodies (A of `fixture_a`, B of `fixture_b`).
    pub(crate) body_a: BodyHandle,
    pub(crate) body_b: BodyHandle,

    pub(crate) manifold: Manifold,

    /// Mixed friction coefficient.
    pub(crate) friction: f32,
    /// Mixed restitution.
    pub(crate) restitution: f32,

    pub(crate) touching: bool,
    pub(crate) enabled: bool,
    /// Transient marker used by island construction.
    pub(crate) island_flag: bool,
    /// Re-evaluate filtering before the next narrow-phase pass.
    pub(crate) filter_pending: bool,

    /// Is the cached TOI fraction valid this step?
    pub(crate) toi_valid: bool,
    /// Cached time-of-impact fraction in `[0, 1]`.
    pub(crate) toi: f32,
    /// Continuous-collision sub-steps consumed by this contact this step.
    pub(crate) toi_count: u32,
}

impl Contact {
    pub(crate) fn new(
        fixture_a: FixtureHandle,
        child_a: usize,
        fixture_b: FixtureHandle,
        child_b: usize,
        fixtures: &Arena<Fixture>,
    ) -> Self {
        let fa = fixtures.get(fixture_a).expect("fixture A missing");
        let fb = fixtures.get(fixture_b).expect("fixture B missing");
        Self {
            fixture_a,
            fixture_b,
            child_a,
            child_b,
            body_a: fa.body(),
            body_b: fb.body(),
            manifold: Manifold::default(),
            friction: mix_friction(fa.friction(), fb.friction()),
            restitution: mix_restitution(fa.restitution(), fb.restitution()),
            touching: false,
            enabled: true,
            island_flag: false,
            filter_pending: false,
            toi_valid: false,
            toi: 1.0,
            toi_count: 0,
        }
    }

    /// First fixture.
    #[inline]
    #[must_use]
    pub fn fixture_a(&self) -> FixtureHandle {
        self.fixture_a
    }

    /// Second fixture.
    #[inline]
    #[must_use]
    pub fn fixture_b(&self) -> FixtureHandle {
        self.fixture_b
    }

    /// Shape child index on fixture A.
    #[inline]
    #[must_use]
    pub fn child_a(&self) -> usize {
        self.child_a
    }

    /// Shape child index on fixture B.
    #[inline]
    #[must_use]
    pub fn child_b(&self) -> usize {
        self.child_b
    }

    /// Are the shapes actually touching?
    #[inline]
    #[must_use]
    pub fn is_touching(&self) -> bool {
        self.touching
    }

    /// Is this contact allowed to generate a response?
    #[inline]
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Disable (or re-enable) the contact for the current step. The flag
    /// resets to enabled at the next manifold update.
    pub fn set_enabled(&mut self, flag: bool) {
        self.enabled = flag;
    }

    /// The cached manifold.
    #[inline]
    #[must_use]
    pub fn manifold(&self) -> &Manifold {
        &self.manifold
    }

    /// Mixed friction coefficient used by the solver.
    #[inline]
    #[must_use]
    pub fn friction(&self) -> f32 {
        self.friction
    }

    /// Mixed restitution used by the solver.
    #[inline]
    #[must_use]
    pub fn restitution(&self) -> f32 {
        self.restitution
    }

    /// Schedule a filter re-evaluation (joint created/destroyed between the
    /// bodies, or a fixture's filter changed).
    pub(crate) fn flag_for_filtering(&mut self) {
        self.filter_pending = true;
    }

    /// Does this pair involve the given (fixture, child) in either slot?
    pub(crate) fn matches(
        &self,
        fixture_a: FixtureHandle,
        child_a: usize,
        fixture_b: FixtureHandle,
        child_b: usize,
    ) -> bool {
        (self.fixture_a == fixture_a
            && self.fixture_b == fixture_b
            && self.child_a == child_a
            && self.child_b == child_b)
            || (self.fixture_a == fixture_b
                && self.fixture_b == fixture_a
                && self.child_a == child_b
                && self.child_b == child_a)
    }

    /// Re-evaluate the manifold, transfer cached impulses to matching
    /// points, refresh the touching flag, and emit begin/end events on
    /// transitions. Touch transitions wake both bodies.
    pub(crate) fn update(
        &mut self,
        fixtures: &Arena<Fixture>,
        bodies: &mut Arena<Body>,
        events: &mut EventCollector,
    ) {
        let old_manifold = self.manifold;
        let was_touching = self.touching;

        // A disabled contact becomes enabled again each update; user code
        // re-disables it from the event stream if needed.
        self.enabled = true;

        let fa = fixtures.get(self.fixture_a).expect("fixture A missing");
        let fb = fixtures.get(self.fixture_b).expect("fixture B missing");
        let xf_a = bodies.get(self.body_a).expect("body A missing").transform();
        let xf_b = bodies.get(self.body_b).expect("body B missing").transform();

        let sensor = fa.is_sensor() || fb.is_sensor();
        let touching = if sensor {
            // Sensors only need the boolean; skip manifold generation.
            self.manifold.point_count = 0;
            distance::test_overlap(
                fa.shape(),
                self.child_a,
                fb.shape(),
                self.child_b,
                xf_a,
                xf_b,
            )
        } else {
            self.manifold = narrow_phase::evaluate(
                fa.shape(),
                self.child_a,
                xf_a,
                fb.shape(),
                self.child_b,
                xf_b,
            );

            // Warm starting: carry impulses over to points that survived.
            for i in 0..self.manifold.point_count {
                let id = self.manifold.points[i].id;
                for j in 0..old_manifold.point_count {
                    if old_manifold.points[j].id == id {
                        self.manifold.points[i].normal_impulse =
                            old_manifold.points[j].normal_impulse;
                        self.manifold.points[i].tangent_impulse =
                            old_manifold.points[j].tangent_impulse;
                        break;
                    }
                }
            }

            self.manifold.point_count > 0
        };

        if touching != was_touching {
            if let Some(body) = bodies.get_mut(self.body_a) {
                body.set_awake(true);
            }
            if let Some(body) = bodies.get_mut(self.body_b) {
                body.set_awake(true);
            }
        }

        self.touching = touching;

        if !was_touching && touching {
            events.push(ContactEvent {
                fixture_a: self.fixture_a,
                fixture_b: self.fixture_b,
                body_a: self.body_a,
                body_b: self.body_b,
                kind: ContactEventKind::Begin,
            });
        } else if was_touching && !touching {
            events.push(ContactEvent {
                fixture_a: self.fixture_a,
                fixture_b: self.fixture_b,
                body_a: self.body_a,
                body_b: self.body_b,
                kind: ContactEventKind::End,
            });
        }
    }
}
