//! A minimal host for [`SourceSync`] components.
//!
//! The harness plays the part of the component tree: it owns the engine, mounts
//! components together with the child layers they declare, forwards props
//! updates, and pumps engine events to every mounted component until the engine
//! goes quiet. When a component asks for a redraw, the harness re-renders its
//! children, which means re-adding any declared layer the engine has lost.

use std::collections::BTreeMap;

use crate::config::SyncConfig;
use crate::descriptor::SourceProps;
use crate::engine::{EngineEvent, LayerSpec, MapEngine, MemoryEngine};
use crate::error::{Result, SyncError};
use crate::sync::{EventOutcome, SourceObserver, SourceSync, SyncState, UpdateAction};

/// Upper bound on event rounds per [`Harness::pump`] call.
pub const MAX_PUMP_ROUNDS: usize = 64;

struct Mounted {
    sync: SourceSync,
    children: Vec<LayerSpec>,
    redraws: usize,
}

/// Summary of one [`Harness::pump`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PumpReport {
    /// Events delivered (each event counts once regardless of listeners).
    pub events: usize,
    /// Source ids whose loaded notification fired.
    pub loaded: Vec<String>,
    /// Source ids that requested a redraw.
    pub redrawn: Vec<String>,
    /// Whether the engine still had events queued after the round limit.
    pub truncated: bool,
}

/// Host harness over a [`MemoryEngine`].
pub struct Harness {
    engine: MemoryEngine,
    config: SyncConfig,
    mounted: BTreeMap<String, Mounted>,
}

impl Harness {
    pub fn new(engine: MemoryEngine, config: SyncConfig) -> Self {
        Self {
            engine,
            config,
            mounted: BTreeMap::new(),
        }
    }

    pub fn engine(&self) -> &MemoryEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut MemoryEngine {
        &mut self.engine
    }

    pub fn component(&self, id: &str) -> Option<&SourceSync> {
        self.mounted.get(id).map(|m| &m.sync)
    }

    pub fn state(&self, id: &str) -> Option<SyncState> {
        self.component(id).map(SourceSync::state)
    }

    /// Number of redraws a component has requested so far.
    pub fn redraws(&self, id: &str) -> usize {
        self.mounted.get(id).map_or(0, |m| m.redraws)
    }

    /// Attach a component and render its child layers.
    pub fn mount(
        &mut self,
        props: SourceProps,
        children: Vec<LayerSpec>,
        observer: impl SourceObserver + 'static,
    ) -> Result<()> {
        if let Some(existing) = self.mounted.get(&props.id) {
            return Err(SyncError::InvalidState {
                id: props.id.clone(),
                operation: "mount",
                state: existing.sync.state(),
            });
        }

        let id = props.id.clone();
        let mut sync = SourceSync::with_observer(props, self.config.clone(), observer);
        if let Err(e) = sync.on_attach(&mut self.engine) {
            if sync.state().is_attached() {
                sync.on_detach(&mut self.engine)?;
            }
            return Err(e);
        }

        let mounted = Mounted {
            sync,
            children,
            redraws: 0,
        };
        render_children(&mut self.engine, &mounted)?;
        self.mounted.insert(id, mounted);
        Ok(())
    }

    /// Deliver new props to a mounted component.
    pub fn update(&mut self, props: SourceProps) -> Result<UpdateAction> {
        let mounted = self
            .mounted
            .get_mut(&props.id)
            .ok_or_else(|| not_mounted(&props.id, "update"))?;
        mounted.sync.on_props_changed(&mut self.engine, props)
    }

    /// Detach a component and forget it.
    ///
    /// On failure the component stays mounted so the unmount can be retried.
    pub fn unmount(&mut self, id: &str) -> Result<()> {
        let mounted = self
            .mounted
            .get_mut(id)
            .ok_or_else(|| not_mounted(id, "unmount"))?;

        // Children are owned by the component: remove the ones that don't read
        // from the managed source (those go with it on detach)
        for child in &mounted.children {
            if !child.reads_from(id) && self.engine.has_layer(&child.id) {
                self.engine.remove_layer(&child.id)?;
            }
        }
        mounted.sync.on_detach(&mut self.engine)?;
        self.mounted.remove(id);
        Ok(())
    }

    /// Drain engine events and dispatch them until the engine is quiet or
    /// [`MAX_PUMP_ROUNDS`] rounds have run.
    ///
    /// A failing component does not starve the others: the batch in flight is
    /// delivered to every component, then the first error is returned. Events
    /// the engine queued in the meantime stay queued for the next call.
    pub fn pump(&mut self) -> Result<PumpReport> {
        let mut report = PumpReport::default();

        for _ in 0..MAX_PUMP_ROUNDS {
            let events = self.engine.take_events();
            if events.is_empty() {
                return Ok(report);
            }

            let mut first_error = None;
            for event in events {
                report.events += 1;
                for (id, mounted) in self.mounted.iter_mut() {
                    if let Err(e) = dispatch(&mut self.engine, id, mounted, &event, &mut report) {
                        tracing::warn!(source_id = %id, kind = ?event.kind(), error = %e, "Component failed to handle event");
                        first_error.get_or_insert(e);
                    }
                }
            }
            if let Some(e) = first_error {
                return Err(e);
            }
        }

        report.truncated = self.engine.has_pending_events();
        if report.truncated {
            tracing::warn!(rounds = MAX_PUMP_ROUNDS, "Engine still busy after pump limit");
        }
        Ok(report)
    }
}

/// Hand one event to one component and act on the outcome.
fn dispatch(
    engine: &mut MemoryEngine,
    id: &str,
    mounted: &mut Mounted,
    event: &EngineEvent,
    report: &mut PumpReport,
) -> Result<()> {
    match mounted.sync.on_engine_event(engine, event)? {
        EventOutcome::SourceLoaded => report.loaded.push(id.to_string()),
        EventOutcome::RedrawRequested => {
            mounted.redraws += 1;
            report.redrawn.push(id.to_string());
            render_children(engine, mounted)?;
        }
        EventOutcome::Ignored | EventOutcome::NoChange => {}
    }
    Ok(())
}

fn not_mounted(id: &str, operation: &'static str) -> SyncError {
    SyncError::InvalidState {
        id: id.to_string(),
        operation,
        state: SyncState::Unattached,
    }
}

/// Add every declared child layer the engine is missing, in declaration order,
/// skipping layers whose source is not registered.
fn render_children(engine: &mut MemoryEngine, mounted: &Mounted) -> Result<()> {
    for child in &mounted.children {
        if engine.has_layer(&child.id) {
            continue;
        }
        if let Some(source) = child.source.as_deref() {
            if !engine.has_source(source) {
                tracing::debug!(layer_id = %child.id, source_id = %source, "Child layer waits for its source");
                continue;
            }
        }
        engine.add_layer(child.clone(), None)?;
    }
    Ok(())
}
