//! Contact Events
//!
//! Begin/end touch notifications are buffered during `step()` and drained
//! by the caller afterwards. Buffering (instead of re-entrant listener
//! callbacks) makes the "don't mutate the world from a callback" rule a
//! structural guarantee: there is no callback running while the world is
//! locked.

use crate::body::BodyHandle;
use crate::fixture::FixtureHandle;

/// The phase of a contact's lifetime an event marks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContactEventKind {
    /// The fixtures started touching this step.
    Begin,
    /// The fixtures stopped touching (or one was destroyed mid-overlap).
    End,
}

/// A buffered contact notification.
#[derive(Clone, Copy, Debug)]
pub struct ContactEvent {
    /// First fixture of the pair.
    pub fixture_a: FixtureHandle,
    /// Second fixture of the pair.
    pub fixture_b: FixtureHandle,
    /// Body owning `fixture_a`.
    pub body_a: BodyHandle,
    /// Body owning `fixture_b`.
    pub body_b: BodyHandle,
    /// Begin or end.
    pub kind: ContactEventKind,
}

/// Collects contact events for one step.
#[derive(Default)]
pub struct EventCollector {
    events: Vec<ContactEvent>,
}

impl EventCollector {
    /// Create an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, event: ContactEvent) {
        self.events.push(event);
    }

    /// Events buffered so far, in emission order.
    #[must_use]
    pub fn events(&self) -> &[ContactEvent] {
        &self.events
    }

    /// Take all buffered events, leaving the collector empty.
    pub fn drain(&mut self) -> Vec<ContactEvent> {
        core::mem::take(&mut self.events)
    }
}
