//! Error types for source synchronization.

use thiserror::Error;

use crate::descriptor::SourceKind;
use crate::engine::EngineError;
use crate::sync::SyncState;

/// Result type alias using mapsync's error type.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors surfaced by [`crate::sync::SourceSync`] to the host.
///
/// Missing sources and layers are never errors here; every mutation is
/// check-then-act. Engine failures pass through untouched in
/// [`SyncError::Engine`].
#[derive(Debug, Error)]
pub enum SyncError {
    /// More than one descriptor variant was supplied for a single source.
    #[error("Malformed descriptor for source '{id}': {variants:?} are all set, expected exactly one")]
    MalformedDescriptor { id: String, variants: Vec<SourceKind> },

    /// A property update tried to switch the descriptor variant.
    #[error("Source '{id}' was constructed as {current} and cannot switch to {requested}")]
    VariantChanged {
        id: String,
        current: SourceKind,
        requested: SourceKind,
    },

    /// A property update tried to change the stable source id.
    #[error("Source id is stable for the component lifetime: '{current}' cannot become '{requested}'")]
    IdChanged { current: String, requested: String },

    /// A lifecycle hook was invoked in a state that does not allow it.
    #[error("Cannot {operation} source '{id}' while {state}")]
    InvalidState {
        id: String,
        operation: &'static str,
        state: SyncState,
    },

    /// The engine rejected a call. Passed through unchanged.
    #[error(transparent)]
    Engine(#[from] EngineError),
}
