//! Fixtures
//!
//! A fixture binds a [`Shape`] to a body and gives it material properties
//! (friction, restitution, density) and collision filtering. Each shape
//! child owns one broad-phase proxy; a chain fixture therefore owns one
//! proxy per segment.

use glam::Vec2;

use crate::arena::Handle;
use crate::body::Body;
use crate::broad_phase::{BroadPhase, ProxyData};
use crate::collision::Aabb;
use crate::math::Transform;
use crate::shape::{MassData, Shape};

/// Handle to a fixture in the world.
pub type FixtureHandle = Handle<Fixture>;

/// Handle to a body in the world.
pub type BodyHandle = Handle<Body>;

// ============================================================================
// Filter
// ============================================================================

/// Category/mask/group collision filter.
///
/// Two fixtures collide when their group indices match and are positive, do
/// not collide when matching and negative, and otherwise collide when each
/// one's category intersects the other's mask.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Filter {
    /// Bit categories this fixture belongs to.
    pub category_bits: u16,
    /// Bit categories this fixture collides with.
    pub mask_bits: u16,
    /// Collision group override (0 = none).
    pub group_index: i16,
}

impl Default for Filter {
    fn default() -> Self {
        Self {
            category_bits: 0x0001,
            mask_bits: 0xFFFF,
            group_index: 0,
        }
    }
}

impl Filter {
    /// Evaluate the filter against another fixture's filter.
    #[must_use]
    pub fn should_collide(&self, other: &Filter) -> bool {
        if self.group_index == other.group_index && self.group_index != 0 {
            return self.group_index > 0;
        }
        (self.mask_bits & other.category_bits) != 0 && (self.category_bits & other.mask_bits) != 0
    }
}

// ============================================================================
// FixtureDef
// ============================================================================

/// Blueprint for creating a fixture.
#[derive(Clone, Debug)]
pub struct FixtureDef {
    /// The shape (cloned into the fixture).
    pub shape: Shape,
    /// Coulomb friction coefficient, usually in `[0, 1]`.
    pub friction: f32,
    /// Restitution (bounciness), usually in `[0, 1]`.
    pub restitution: f32,
    /// Density in kg/m².
    pub density: f32,
    /// A sensor detects overlap but never generates collision response.
    pub is_sensor: bool,
    /// Collision filter.
    pub filter: Filter,
}

impl FixtureDef {
    /// A definition with default material (friction 0.2, no restitution,
    /// density 1).
    #[must_use]
    pub fn new(shape: Shape) -> Self {
        Self {
            shape,
            friction: 0.2,
            restitution: 0.0,
            density: 1.0,
            is_sensor: false,
            filter: Filter::default(),
        }
    }

    /// Set the density.
    #[must_use]
    pub fn with_density(mut self, density: f32) -> Self {
        self.density = density;
        self
    }

    /// Set the friction coefficient.
    #[must_use]
    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = friction;
        self
    }

    /// Set the restitution.
    #[must_use]
    pub fn with_restitution(mut self, restitution: f32) -> Self {
        self.restitution = restitution;
        self
    }

    /// Mark as a sensor.
    #[must_use]
    pub fn sensor(mut self) -> Self {
        self.is_sensor = true;
        self
    }

    /// Set the collision filter.
    #[must_use]
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }
}

// ============================================================================
// Fixture
// ============================================================================

/// One broad-phase entry of a fixture.
#[derive(Clone, Copy, Debug)]
pub(crate) struct FixtureProxy {
    /// Swept AABB last pushed to the broad-phase.
    pub aabb: Aabb,
    /// Broad-phase proxy id.
    pub proxy_id: u32,
    /// Shape child this proxy covers.
    pub child: usize,
}

/// A shape attached to a body.
pub struct Fixture {
    /// Owning body.
    pub(crate) body: BodyHandle,
    /// The collision shape.
    pub(crate) shape: Shape,
    pub(crate) friction: f32,
    pub(crate) restitution: f32,
    pub(crate) density: f32,
    pub(crate) is_sensor: bool,
    pub(crate) filter: Filter,
    pub(crate) proxies: Vec<FixtureProxy>,
}

impl Fixture {
    pub(crate) fn new(def: &FixtureDef, body: BodyHandle) -> Self {
        Self {
            body,
            shape: def.shape.clone(),
            friction: def.friction,
            restitution: def.restitution,
            density: def.density,
            is_sensor: def.is_sensor,
            filter: def.filter,
            proxies: Vec::new(),
        }
    }

    /// The owning body.
    #[inline]
    #[must_use]
    pub fn body(&self) -> BodyHandle {
        self.body
    }

    /// The fixture's shape.
    #[inline]
    #[must_use]
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Friction coefficient.
    #[inline]
    #[must_use]
    pub fn friction(&self) -> f32 {
        self.friction
    }

    /// Restitution.
    #[inline]
    #[must_use]
    pub fn restitution(&self) -> f32 {
        self.restitution
    }

    /// Density.
    #[inline]
    #[must_use]
    pub fn density(&self) -> f32 {
        self.density
    }

    /// Is this fixture a sensor?
    #[inline]
    #[must_use]
    pub fn is_sensor(&self) -> bool {
        self.is_sensor
    }

    /// The collision filter.
    #[inline]
    #[must_use]
    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    /// Mass properties at the fixture's density.
    #[must_use]
    pub fn mass_data(&self) -> MassData {
        self.shape.compute_mass(self.density)
    }

    /// Create one broad-phase proxy per shape child at `xf`.
    pub(crate) fn create_proxies(
        &mut self,
        broad_phase: &mut BroadPhase,
        xf: Transform,
        fixture_slot: u32,
    ) {
        debug_assert!(self.proxies.is_empty());
        for child in 0..self.shape.child_count() {
            let aabb = self.shape.compute_aabb(xf, child);
            let proxy_id = broad_phase.create_proxy(
                aabb,
                ProxyData {
                    fixture: fixture_slot,
                    child: child as u32,
                },
            );
            self.proxies.push(FixtureProxy {
                aabb,
                proxy_id,
                child,
            });
        }
    }

    /// Remove all broad-phase proxies.
    pub(crate) fn destroy_proxies(&mut self, broad_phase: &mut BroadPhase) {
        for proxy in self.proxies.drain(..) {
            broad_phase.destroy_proxy(proxy.proxy_id);
        }
    }

    /// Push swept AABBs covering both endpoint transforms of this step.
    pub(crate) fn synchronize(
        &mut self,
        broad_phase: &mut BroadPhase,
        xf1: Transform,
        xf2: Transform,
    ) {
        for proxy in &mut self.proxies {
            let aabb1 = self.shape.compute_aabb(xf1, proxy.child);
            let aabb2 = self.shape.compute_aabb(xf2, proxy.child);
            proxy.aabb = aabb1.combine(&aabb2);
            let displacement = aabb2.center() - aabb1.center();
            broad_phase.move_proxy(proxy.proxy_id, proxy.aabb, displacement);
        }
    }

    /// Re-run pair generation for this fixture's proxies (after a filter
    /// change).
    pub(crate) fn touch_proxies(&self, broad_phase: &mut BroadPhase) {
        for proxy in &self.proxies {
            broad_phase.touch_proxy(proxy.proxy_id);
        }
    }

    /// The proxy id for a child, used by the AABB-overlap check in the
    /// contact manager.
    #[inline]
    #[must_use]
    pub(crate) fn proxy_id(&self, child: usize) -> u32 {
        self.proxies[child].proxy_id
    }
}

/// A point on a fixture in world coordinates, for queries.
#[must_use]
pub fn test_point(fixture: &Fixture, xf: Transform, point: Vec2) -> bool {
    fixture.shape.test_point(xf, point)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_groups() {
        let mut a = Filter::default();
        let mut b = Filter::default();
        assert!(a.should_collide(&b));

        a.group_index = 2;
        b.group_index = 2;
        assert!(a.should_collide(&b));

        a.group_index = -3;
        b.group_index = -3;
        assert!(!a.should_collide(&b));
    }

    #[test]
    fn test_filter_category_mask() {
        let a = Filter {
            category_bits: 0x0002,
            mask_bits: 0x0004,
            group_index: 0,
        };
        let b = Filter {
            category_bits: 0x0004,
            mask_bits: 0x0002,
            group_index: 0,
        };
        let c = Filter {
            category_bits: 0x0008,
            mask_bits: 0xFFFF,
            group_index: 0,
        };
        assert!(a.should_collide(&b));
        assert!(!a.should_collide(&c));
    }
}
