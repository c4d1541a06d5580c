//! Engine subscriptions held by a managed source.

use crate::engine::{EventKind, MapEngine, SubscriptionId};

/// The (at most) two live subscriptions of one component: style events for
/// its whole attached lifetime, source data events while waiting for load.
#[derive(Debug, Default)]
pub(crate) struct Subscriptions {
    style: Option<SubscriptionId>,
    load: Option<SubscriptionId>,
}

impl Subscriptions {
    pub(crate) fn subscribe_style<E: MapEngine + ?Sized>(&mut self, engine: &mut E) {
        if self.style_live(engine) {
            return;
        }
        self.style = Some(engine.subscribe(EventKind::StyleData));
    }

    /// Arm the load subscription. Returns `false` if it was already armed.
    pub(crate) fn arm_load<E: MapEngine + ?Sized>(&mut self, engine: &mut E) -> bool {
        if self.load_live(engine) {
            return false;
        }
        self.load = Some(engine.subscribe(EventKind::SourceData));
        true
    }

    pub(crate) fn disarm_load<E: MapEngine + ?Sized>(&mut self, engine: &mut E) {
        if let Some(id) = self.load.take() {
            engine.unsubscribe(id);
        }
    }

    pub(crate) fn style_live<E: MapEngine + ?Sized>(&self, engine: &E) -> bool {
        self.style.is_some_and(|id| engine.is_subscribed(id))
    }

    pub(crate) fn load_live<E: MapEngine + ?Sized>(&self, engine: &E) -> bool {
        self.load.is_some_and(|id| engine.is_subscribed(id))
    }

    /// Whether this component reacts to events of `kind`.
    pub(crate) fn listens_to<E: MapEngine + ?Sized>(&self, engine: &E, kind: EventKind) -> bool {
        match kind {
            EventKind::StyleData => self.style_live(engine),
            EventKind::SourceData => self.load_live(engine),
        }
    }

    /// Cancel everything. Returns how many subscriptions were still live.
    pub(crate) fn release_all<E: MapEngine + ?Sized>(&mut self, engine: &mut E) -> usize {
        [self.style.take(), self.load.take()]
            .into_iter()
            .flatten()
            .filter(|id| engine.unsubscribe(*id))
            .count()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.style.is_none() && self.load.is_none()
    }
}
