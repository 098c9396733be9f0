//! Contact Management
//!
//! Turns broad-phase overlap pairs into persistent contacts, and walks the
//! contact list once per step to refresh manifolds and cull pairs whose
//! fat AABBs have separated. Runs as part of the world so it can link
//! contacts into both the global arena and each body's edge list in one
//! place.

use crate::body::ContactEdge;
use crate::body::BodyType;
use crate::contact::{Contact, ContactHandle};
use crate::event::{ContactEvent, ContactEventKind};
use crate::narrow_phase;
use crate::world::World;

impl World {
    /// Drain the broad-phase move buffer and create contacts for newly
    /// overlapping proxy pairs.
    pub(crate) fn find_new_contacts(&mut self) {
        let pairs = self.broad_phase.update_pairs();
        for (proxy_a, proxy_b) in pairs {
            self.add_pair(proxy_a, proxy_b);
        }
    }

    /// Broad-phase pair callback: create a contact unless something forbids
    /// the pair.
    fn add_pair(&mut self, proxy_a: u32, proxy_b: u32) {
        let data_a = self.broad_phase.proxy_data(proxy_a);
        let data_b = self.broad_phase.proxy_data(proxy_b);

        let Some(fixture_a) = self.fixtures.handle_at(data_a.fixture as usize) else {
            return;
        };
        let Some(fixture_b) = self.fixtures.handle_at(data_b.fixture as usize) else {
            return;
        };
        let child_a = data_a.child as usize;
        let child_b = data_b.child as usize;

        let fa = self.fixtures.get(fixture_a).expect("proxy fixture missing");
        let fb = self.fixtures.get(fixture_b).expect("proxy fixture missing");
        let body_a = fa.body();
        let body_b = fb.body();

        // Fixtures on the same body never collide.
        if body_a == body_b {
            return;
        }

        // Does a contact already exist for this exact pair, in either
        // order? One body's edge list is enough to know.
        let ba = self.bodies.get(body_a).expect("fixture body missing");
        for edge in &ba.contact_edges {
            if edge.other != body_b {
                continue;
            }
            let existing = self.contacts.get(edge.contact).expect("edge contact missing");
            if existing.matches(fixture_a, child_a, fixture_b, child_b) {
                return;
            }
        }

        // Joint veto / at-least-one-dynamic rule.
        let bb = self.bodies.get(body_b).expect("fixture body missing");
        if !bb.should_collide(ba, body_a) {
            return;
        }

        // User filtering.
        if !fa.filter().should_collide(fb.filter()) {
            return;
        }

        // Zero-area shape pairs (edge vs chain etc.) can never touch.
        if !narrow_phase::can_collide(fa.shape(), fb.shape()) {
            return;
        }

        // Canonical order: the higher-ranked shape takes the A slot so the
        // narrow phase always sees its expected argument order.
        let (fixture_a, child_a, fixture_b, child_b) =
            if narrow_phase::shape_rank(fa.shape()) >= narrow_phase::shape_rank(fb.shape()) {
                (fixture_a, child_a, fixture_b, child_b)
            } else {
                (fixture_b, child_b, fixture_a, child_a)
            };

        let contact = Contact::new(fixture_a, child_a, fixture_b, child_b, &self.fixtures);
        let body_a = contact.body_a;
        let body_b = contact.body_b;
        let sensors = {
            let fa = self.fixtures.get(fixture_a).unwrap();
            let fb = self.fixtures.get(fixture_b).unwrap();
            fa.is_sensor() && fb.is_sensor()
        };
        let handle = self.contacts.insert(contact);

        // Link into both bodies' edge lists.
        self.bodies
            .get_mut(body_a)
            .expect("contact body missing")
            .contact_edges
            .push(ContactEdge {
                contact: handle,
                other: body_b,
            });
        self.bodies
            .get_mut(body_b)
            .expect("contact body missing")
            .contact_edges
            .push(ContactEdge {
                contact: handle,
                other: body_a,
            });

        // New contact wakes the pair, unless it is sensor-only.
        if !sensors {
            self.bodies.get_mut(body_a).unwrap().set_awake(true);
            self.bodies.get_mut(body_b).unwrap().set_awake(true);
        }
    }

    /// Remove a contact, firing an end event if it was touching.
    pub(crate) fn destroy_contact(&mut self, handle: ContactHandle) {
        let contact = self.contacts.get(handle).expect("destroying stale contact");
        let body_a = contact.body_a;
        let body_b = contact.body_b;

        if contact.is_touching() {
            self.events.push(ContactEvent {
                fixture_a: contact.fixture_a,
                fixture_b: contact.fixture_b,
                body_a,
                body_b,
                kind: ContactEventKind::End,
            });
        }

        if let Some(body) = self.bodies.get_mut(body_a) {
            body.contact_edges.retain(|e| e.contact != handle);
        }
        if let Some(body) = self.bodies.get_mut(body_b) {
            body.contact_edges.retain(|e| e.contact != handle);
        }

        self.contacts.remove(handle);
    }

    /// Per-step narrow-phase pass over the whole contact list.
    pub(crate) fn collide(&mut self) {
        for handle in self.contacts.handles() {
            let contact = self.contacts.get(handle).expect("contact list out of sync");
            let fixture_a = contact.fixture_a;
            let fixture_b = contact.fixture_b;
            let child_a = contact.child_a;
            let child_b = contact.child_b;
            let body_a = contact.body_a;
            let body_b = contact.body_b;

            // Re-check filtering when a joint or filter changed under the
            // pair.
            if contact.filter_pending {
                let ba = self.bodies.get(body_a).expect("contact body missing");
                let bb = self.bodies.get(body_b).expect("contact body missing");
                if !bb.should_collide(ba, body_a) {
                    self.destroy_contact(handle);
                    continue;
                }
                let fa = self.fixtures.get(fixture_a).expect("contact fixture missing");
                let fb = self.fixtures.get(fixture_b).expect("contact fixture missing");
                if !fa.filter().should_collide(fb.filter()) {
                    self.destroy_contact(handle);
                    continue;
                }
                self.contacts.get_mut(handle).unwrap().filter_pending = false;
            }

            let ba = self.bodies.get(body_a).expect("contact body missing");
            let bb = self.bodies.get(body_b).expect("contact body missing");
            let active_a = ba.is_awake() && ba.body_type() != BodyType::Static;
            let active_b = bb.is_awake() && bb.body_type() != BodyType::Static;

            // Both endpoints idle: nothing can have changed.
            if !active_a && !active_b {
                continue;
            }

            let proxy_a = self
                .fixtures
                .get(fixture_a)
                .expect("contact fixture missing")
                .proxy_id(child_a);
            let proxy_b = self
                .fixtures
                .get(fixture_b)
                .expect("contact fixture missing")
                .proxy_id(child_b);

            // Fat AABBs separated: the pair is dead.
            if !self.broad_phase.test_overlap(proxy_a, proxy_b) {
                self.destroy_contact(handle);
                continue;
            }

            // Still close: refresh the manifold.
            let contact = self.contacts.get_mut(handle).unwrap();
            contact.update(&self.fixtures, &mut self.bodies, &mut self.events);
        }
    }
}
