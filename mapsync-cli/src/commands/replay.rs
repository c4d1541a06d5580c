//! Replay command - run a scenario against the in-memory engine.

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use mapsync::engine::MapEngine;
use mapsync::harness::Harness;
use mapsync::sync::CallbackObserver;
use mapsync::{MemoryEngine, SyncConfig};

use crate::error::CliError;
use crate::scenario::{Scenario, Step};

/// Arguments for the replay command.
pub struct ReplayArgs {
    pub scenario: PathBuf,
    pub keep_going: bool,
}

/// Result of one scenario step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
    pub label: String,
    pub detail: String,
    pub failed: bool,
}

/// Everything a replay produced.
#[derive(Debug, Clone, Default)]
pub struct ReplayReport {
    pub steps: Vec<StepRecord>,
    /// Observer notifications in delivery order (`added <id>`, `loaded <id>`).
    pub notifications: Vec<String>,
    pub sources: Vec<String>,
    /// Engine layer ids, bottom to top.
    pub layers: Vec<String>,
    pub active_subscriptions: usize,
}

impl ReplayReport {
    pub fn failures(&self) -> usize {
        self.steps.iter().filter(|s| s.failed).count()
    }
}

/// Run the replay command.
pub fn run(args: ReplayArgs, config: SyncConfig) -> Result<(), CliError> {
    let scenario = Scenario::load(&args.scenario)?;
    tracing::info!(
        scenario = %args.scenario.display(),
        steps = scenario.steps.len(),
        "Replaying scenario"
    );

    let report = replay(&scenario, config, args.keep_going)?;

    println!(
        "Scenario: {} ({} steps)",
        args.scenario.display(),
        scenario.steps.len()
    );
    for (index, step) in report.steps.iter().enumerate() {
        let marker = if step.failed { "!" } else { " " };
        println!("{} [{:>2}] {}: {}", marker, index + 1, step.label, step.detail);
    }

    println!();
    println!("Notifications:");
    if report.notifications.is_empty() {
        println!("  (none)");
    }
    for note in &report.notifications {
        println!("  {}", note);
    }

    println!();
    println!("Sources: {}", join_or_none(&report.sources));
    println!("Layers (bottom to top): {}", join_or_none(&report.layers));
    println!("Active subscriptions: {}", report.active_subscriptions);

    if report.failures() > 0 {
        println!();
        println!("{} step(s) failed", report.failures());
    }

    Ok(())
}

/// Replay `scenario` and collect the report.
///
/// A failing step aborts the replay unless `keep_going` is set, in which case
/// the failure is recorded and the next step runs.
pub fn replay(
    scenario: &Scenario,
    config: SyncConfig,
    keep_going: bool,
) -> Result<ReplayReport, CliError> {
    let notifications: Rc<RefCell<Vec<String>>> = Rc::default();
    let mut harness = Harness::new(MemoryEngine::new(), config.clone());
    let mut report = ReplayReport::default();

    for (index, step) in scenario.steps.iter().enumerate() {
        let label = step.label();
        match apply_step(&mut harness, step.clone(), &config, &notifications) {
            Ok(detail) => report.steps.push(StepRecord {
                label,
                detail,
                failed: false,
            }),
            Err(source) if keep_going => {
                tracing::warn!(step = index + 1, error = %source, "Scenario step failed");
                report.steps.push(StepRecord {
                    label,
                    detail: source.to_string(),
                    failed: true,
                });
            }
            Err(source) => {
                return Err(CliError::Step {
                    step: index + 1,
                    source,
                })
            }
        }
    }

    report.notifications = notifications.borrow().clone();
    report.sources = harness.engine().source_ids();
    report.layers = harness.engine().layer_ids();
    report.active_subscriptions = harness.engine().active_subscriptions();
    Ok(report)
}

fn apply_step(
    harness: &mut Harness,
    step: Step,
    config: &SyncConfig,
    notifications: &Rc<RefCell<Vec<String>>>,
) -> mapsync::Result<String> {
    match step {
        Step::Attach { props, children } => {
            let props = props.resolve(config.variant_policy)?;
            let count = children.len();
            harness.mount(props, children, recording_observer(notifications))?;
            Ok(format!("mounted with {} child layer(s)", count))
        }
        Step::Update { props } => {
            let props = props.resolve(config.variant_policy)?;
            Ok(harness.update(props)?.to_string())
        }
        Step::Detach { id } => {
            harness.unmount(&id)?;
            Ok("detached".to_string())
        }
        Step::AddLayer { layer, before } => {
            harness.engine_mut().add_layer(layer, before.as_deref())?;
            Ok("added".to_string())
        }
        Step::ResetStyle => {
            harness.engine_mut().reset_style();
            Ok("registry cleared".to_string())
        }
        Step::Load { id: Some(id) } => {
            if harness.engine_mut().mark_source_loaded(&id) {
                Ok("loaded".to_string())
            } else {
                Ok("no such source".to_string())
            }
        }
        Step::Load { id: None } => {
            harness.engine_mut().mark_all_loaded();
            Ok("all sources loaded".to_string())
        }
        Step::Pump => {
            let pumped = harness.pump()?;
            let mut detail = format!("{} event(s)", pumped.events);
            if !pumped.loaded.is_empty() {
                detail.push_str(&format!(", loaded [{}]", pumped.loaded.join(", ")));
            }
            if !pumped.redrawn.is_empty() {
                detail.push_str(&format!(", redrawn [{}]", pumped.redrawn.join(", ")));
            }
            if pumped.truncated {
                detail.push_str(", truncated");
            }
            Ok(detail)
        }
    }
}

fn recording_observer(notifications: &Rc<RefCell<Vec<String>>>) -> CallbackObserver {
    let added = Rc::clone(notifications);
    let loaded = Rc::clone(notifications);
    CallbackObserver::new()
        .on_added(move |source| {
            added
                .borrow_mut()
                .push(format!("added {} ({})", source.id, source.kind))
        })
        .on_loaded(move |source| loaded.borrow_mut().push(format!("loaded {}", source.id)))
}

fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "(none)".to_string()
    } else {
        items.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mapsync::VariantPolicy;

    fn scenario(json: &str) -> Scenario {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_replay_style_reset_recovery() {
        let scenario = scenario(
            r#"{"steps": [
                {"op": "attach", "props": {"id": "satellite", "tiles": {"url": "mapbox://mapbox.satellite"}},
                 "children": [{"id": "satellite-raster", "type": "raster", "source": "satellite"}]},
                {"op": "add_layer", "layer": {"id": "labels", "type": "symbol"}},
                {"op": "load"},
                {"op": "pump"},
                {"op": "reset_style"},
                {"op": "pump"}
            ]}"#,
        );

        let report = replay(&scenario, SyncConfig::default(), false).unwrap();

        assert_eq!(
            report.notifications,
            vec!["added satellite (tiles)", "loaded satellite", "added satellite (tiles)"]
        );
        assert_eq!(report.sources, vec!["satellite"]);
        assert_eq!(report.layers, vec!["satellite-raster"]);
        assert!(report.steps[5].detail.contains("redrawn [satellite"));
    }

    #[test]
    fn test_replay_tile_replace_keeps_layer_order() {
        let scenario = scenario(
            r#"{"steps": [
                {"op": "attach", "props": {"id": "sat", "tiles": {"url": "mapbox://sat", "maxzoom": 18}},
                 "children": [{"id": "sat-low", "type": "raster", "source": "sat"}]},
                {"op": "add_layer", "layer": {"id": "roads", "type": "line"}},
                {"op": "add_layer", "layer": {"id": "sat-high", "type": "raster", "source": "sat"}},
                {"op": "update", "props": {"id": "sat", "tiles": {"url": "mapbox://sat", "maxzoom": 15}}}
            ]}"#,
        );

        let report = replay(&scenario, SyncConfig::default(), false).unwrap();

        assert_eq!(report.steps[3].detail, "replaced (2 layers restored)");
        assert_eq!(report.layers, vec!["sat-low", "roads", "sat-high"]);
    }

    #[test]
    fn test_replay_detach_leaves_nothing_behind() {
        let scenario = scenario(
            r#"{"steps": [
                {"op": "attach", "props": {"id": "parks", "geo_points": {"data": {"type": "FeatureCollection", "features": []}}},
                 "children": [{"id": "parks-circles", "type": "circle", "source": "parks"}]},
                {"op": "pump"},
                {"op": "detach", "id": "parks"}
            ]}"#,
        );

        let report = replay(&scenario, SyncConfig::default(), false).unwrap();

        assert!(report.sources.is_empty());
        assert!(report.layers.is_empty());
        assert_eq!(report.active_subscriptions, 0);
    }

    #[test]
    fn test_failing_step_aborts_unless_keep_going() {
        let json = r#"{"steps": [
            {"op": "attach", "props": {"id": "sat", "tiles": {"url": "mapbox://sat"}}},
            {"op": "update", "props": {"id": "sat", "image": {"url": "https://example.com/a.png"}}},
            {"op": "pump"}
        ]}"#;

        let err = replay(&scenario(json), SyncConfig::default(), false).unwrap_err();
        assert!(matches!(err, CliError::Step { step: 2, .. }));

        let report = replay(&scenario(json), SyncConfig::default(), true).unwrap();
        assert_eq!(report.failures(), 1);
        assert!(report.steps[1].failed);
        assert_eq!(report.steps.len(), 3);
    }

    #[test]
    fn test_variant_policy_from_config() {
        let scenario = scenario(
            r#"{"steps": [
                {"op": "attach", "props": {"id": "mixed",
                  "tiles": {"url": "mapbox://sat"}, "image": {"url": "https://example.com/a.png"}}}
            ]}"#,
        );

        assert!(replay(&scenario, SyncConfig::default(), false).is_err());

        let config = SyncConfig::default().with_variant_policy(VariantPolicy::Precedence);
        let report = replay(&scenario, config, false).unwrap();
        assert_eq!(report.notifications, vec!["added mixed (tiles)"]);
    }
}
