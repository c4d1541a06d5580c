//! mapsync - Keeps a declarative map source in sync with a stateful map engine
//!
//! The map engine owns the authoritative registry of sources and layers and may
//! wipe it at any time (a full style reload does exactly that). This library
//! provides [`sync::SourceSync`], a component that owns one source id and keeps
//! the engine consistent with its declared [`descriptor::SourceDescriptor`]:
//!
//! - registers the source on attach and again whenever the engine loses it
//! - reapplies inline data or image coordinates once the engine reports load
//! - patches data/coordinates in place when only the payload changes
//! - destroys and recreates tile sources when construction parameters change,
//!   preserving the dependent layers and their draw order
//! - removes the source, its layers, and all subscriptions on detach
//!
//! # Architecture
//!
//! ```text
//! Host lifecycle ──► SourceSync ──► MapEngine (queries + mutations)
//!                        ▲
//! Engine events ─────────┘  (style data, source data)
//! ```
//!
//! The [`engine::MemoryEngine`] is a complete in-memory engine used by tests and
//! the CLI; the [`harness::Harness`] plays the role of the host that mounts
//! components and pumps engine events to them.

pub mod config;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod harness;
pub mod logging;
pub mod sync;

pub use config::{ResetProbe, SyncConfig, VariantPolicy};
pub use descriptor::{SourceDescriptor, SourceKind, SourceProps};
pub use engine::{EngineError, EngineEvent, MapEngine, MemoryEngine};
pub use error::{Result, SyncError};
pub use sync::{EventOutcome, SourceObserver, SourceSync, SyncState, UpdateAction};
