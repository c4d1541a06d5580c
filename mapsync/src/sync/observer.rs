//! Outward notifications for source lifecycle milestones.

use std::fmt;

use crate::engine::SourceHandle;

/// Receives "source added" and "source loaded" notifications.
///
/// `source_added` fires once per successful registration. `source_loaded` fires
/// at most once per registration cycle, when the engine first reports the
/// source fully loaded.
pub trait SourceObserver {
    fn source_added(&mut self, _source: &SourceHandle) {}

    fn source_loaded(&mut self, _source: &SourceHandle) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl SourceObserver for NoopObserver {}

type Callback = Box<dyn FnMut(&SourceHandle)>;

/// Observer built from closures.
///
/// ```
/// use mapsync::sync::CallbackObserver;
///
/// let observer = CallbackObserver::new()
///     .on_added(|source| println!("added {}", source.id))
///     .on_loaded(|source| println!("loaded {}", source.id));
/// ```
#[derive(Default)]
pub struct CallbackObserver {
    on_added: Option<Callback>,
    on_loaded: Option<Callback>,
}

impl CallbackObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_added(mut self, callback: impl FnMut(&SourceHandle) + 'static) -> Self {
        self.on_added = Some(Box::new(callback));
        self
    }

    pub fn on_loaded(mut self, callback: impl FnMut(&SourceHandle) + 'static) -> Self {
        self.on_loaded = Some(Box::new(callback));
        self
    }
}

impl fmt::Debug for CallbackObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackObserver")
            .field("on_added", &self.on_added.is_some())
            .field("on_loaded", &self.on_loaded.is_some())
            .finish()
    }
}

impl SourceObserver for CallbackObserver {
    fn source_added(&mut self, source: &SourceHandle) {
        if let Some(callback) = self.on_added.as_mut() {
            callback(source);
        }
    }

    fn source_loaded(&mut self, source: &SourceHandle) {
        if let Some(callback) = self.on_loaded.as_mut() {
            callback(source);
        }
    }
}
