//! Configuration for source synchronization.
//!
//! `SyncConfig` holds the knobs that change how a [`crate::sync::SourceSync`]
//! reacts to the engine. It can be built in code or loaded from an INI file:
//!
//! ```ini
//! [sync]
//! reset_probe = layer
//! variant_policy = reject
//! reapply_after_load = true
//!
//! [logging]
//! filter = mapsync=debug
//! file = /tmp/mapsync.log
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use ini::Ini;
use thiserror::Error;

/// Section holding [`SyncConfig`] keys.
pub const SYNC_SECTION: &str = "sync";

/// Section holding [`LogConfig`] keys.
pub const LOGGING_SECTION: &str = "logging";

/// Default `EnvFilter` directive when none is configured.
pub const DEFAULT_LOG_FILTER: &str = "mapsync=info";

/// Errors while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read or parsed.
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: ini::Error,
    },

    /// The INI text is malformed.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] ini::ParseError),

    /// A key holds a value outside its accepted set.
    #[error("Invalid value '{value}' for [{section}] {key}: expected {expected}")]
    InvalidValue {
        section: &'static str,
        key: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// How the style-reset detector decides the managed source was lost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResetProbe {
    /// Lost when no layer exists under the id.
    ///
    /// Registration stays a no-op while the source survives, so the only
    /// effect on a style change that dropped layers is the redraw. Hosts that
    /// don't name a layer after its source get a redraw on every style event.
    #[default]
    LayerOnly,
    /// Lost when neither a source nor a layer exists under the id.
    AnyEntity,
}

impl FromStr for ResetProbe {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "any" | "any_entity" => Ok(ResetProbe::AnyEntity),
            "layer" | "layer_only" => Ok(ResetProbe::LayerOnly),
            _ => Err(()),
        }
    }
}

impl fmt::Display for ResetProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResetProbe::AnyEntity => f.write_str("any"),
            ResetProbe::LayerOnly => f.write_str("layer"),
        }
    }
}

/// What to do when a host populates more than one descriptor variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VariantPolicy {
    /// Refuse the props with a configuration error.
    #[default]
    Reject,
    /// Take the first variant in geo-points, tiles, image order.
    Precedence,
}

impl FromStr for VariantPolicy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(VariantPolicy::Reject),
            "precedence" => Ok(VariantPolicy::Precedence),
            _ => Err(()),
        }
    }
}

impl fmt::Display for VariantPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariantPolicy::Reject => f.write_str("reject"),
            VariantPolicy::Precedence => f.write_str("precedence"),
        }
    }
}

/// Behavior switches for a [`crate::sync::SourceSync`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Loss detection used on style events.
    pub reset_probe: ResetProbe,

    /// Handling of props with several descriptor variants.
    pub variant_policy: VariantPolicy,

    /// Push inline data / image coordinates again once the engine reports the
    /// source loaded. Some engines drop the payload given at construction.
    pub reapply_after_load: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            reset_probe: ResetProbe::default(),
            variant_policy: VariantPolicy::default(),
            reapply_after_load: true,
        }
    }
}

impl SyncConfig {
    pub fn with_reset_probe(mut self, probe: ResetProbe) -> Self {
        self.reset_probe = probe;
        self
    }

    pub fn with_variant_policy(mut self, policy: VariantPolicy) -> Self {
        self.variant_policy = policy;
        self
    }

    pub fn with_reapply_after_load(mut self, reapply: bool) -> Self {
        self.reapply_after_load = reapply;
        self
    }

    /// Parse the `[sync]` section of an INI document. Missing keys keep their
    /// defaults; a missing section yields the default config.
    pub fn from_ini_str(text: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(text)?;
        Self::from_ini(&ini)
    }

    /// Load the `[sync]` section from an INI file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::from_ini(&read_ini(path)?)
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let Some(section) = ini.section(Some(SYNC_SECTION)) else {
            return Ok(config);
        };

        if let Some(value) = section.get("reset_probe") {
            config.reset_probe = value.parse().map_err(|_| ConfigError::InvalidValue {
                section: SYNC_SECTION,
                key: "reset_probe",
                value: value.to_string(),
                expected: "any | layer",
            })?;
        }

        if let Some(value) = section.get("variant_policy") {
            config.variant_policy = value.parse().map_err(|_| ConfigError::InvalidValue {
                section: SYNC_SECTION,
                key: "variant_policy",
                value: value.to_string(),
                expected: "reject | precedence",
            })?;
        }

        if let Some(value) = section.get("reapply_after_load") {
            config.reapply_after_load =
                parse_bool(value).ok_or_else(|| ConfigError::InvalidValue {
                    section: SYNC_SECTION,
                    key: "reapply_after_load",
                    value: value.to_string(),
                    expected: "true | false",
                })?;
        }

        Ok(config)
    }

    /// Render this config (plus default logging keys) as an INI document.
    pub fn to_ini_string(&self) -> String {
        let mut ini = Ini::new();
        ini.with_section(Some(SYNC_SECTION))
            .set("reset_probe", self.reset_probe.to_string())
            .set("variant_policy", self.variant_policy.to_string())
            .set("reapply_after_load", self.reapply_after_load.to_string());
        ini.with_section(Some(LOGGING_SECTION))
            .set("filter", DEFAULT_LOG_FILTER);

        let mut out = Vec::new();
        // Writing into a Vec cannot fail
        let _ = ini.write_to(&mut out);
        String::from_utf8_lossy(&out).into_owned()
    }
}

/// Logging configuration consumed by [`crate::logging::init_logging`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// `EnvFilter` directive, overridden by `RUST_LOG` when set.
    pub filter: String,

    /// Append log output to this file instead of stderr.
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
            file: None,
        }
    }
}

impl LogConfig {
    /// Parse the `[logging]` section of an INI document.
    pub fn from_ini_str(text: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(text)?;
        Ok(Self::from_ini(&ini))
    }

    /// Load the `[logging]` section from an INI file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Ok(Self::from_ini(&read_ini(path)?))
    }

    fn from_ini(ini: &Ini) -> Self {
        let mut config = Self::default();
        if let Some(section) = ini.section(Some(LOGGING_SECTION)) {
            if let Some(filter) = section.get("filter") {
                config.filter = filter.to_string();
            }
            config.file = section
                .get("file")
                .filter(|f| !f.trim().is_empty())
                .map(PathBuf::from);
        }
        config
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }
}

fn read_ini(path: &Path) -> Result<Ini, ConfigError> {
    Ini::load_from_file(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.reset_probe, ResetProbe::LayerOnly);
        assert_eq!(config.variant_policy, VariantPolicy::Reject);
        assert!(config.reapply_after_load);
    }

    #[test]
    fn test_from_ini_str_overrides_keys() {
        let config = SyncConfig::from_ini_str(
            "[sync]\nreset_probe = any\nvariant_policy = precedence\nreapply_after_load = no\n",
        )
        .unwrap();

        assert_eq!(config.reset_probe, ResetProbe::AnyEntity);
        assert_eq!(config.variant_policy, VariantPolicy::Precedence);
        assert!(!config.reapply_after_load);
    }

    #[test]
    fn test_missing_section_uses_defaults() {
        let config = SyncConfig::from_ini_str("[other]\nkey = value\n").unwrap();
        assert_eq!(config, SyncConfig::default());
    }

    #[test]
    fn test_invalid_value_is_reported() {
        let err = SyncConfig::from_ini_str("[sync]\nreset_probe = sometimes\n").unwrap_err();
        match err {
            ConfigError::InvalidValue { key, value, .. } => {
                assert_eq!(key, "reset_probe");
                assert_eq!(value, "sometimes");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_round_trip_through_ini_string() {
        let config = SyncConfig::default()
            .with_reset_probe(ResetProbe::AnyEntity)
            .with_reapply_after_load(false);

        let text = config.to_ini_string();
        assert_eq!(SyncConfig::from_ini_str(&text).unwrap(), config);
        assert_eq!(
            LogConfig::from_ini_str(&text).unwrap().filter,
            DEFAULT_LOG_FILTER
        );
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[sync]\nvariant_policy = precedence").unwrap();
        writeln!(file, "[logging]\nfilter = mapsync=trace\nfile = /tmp/mapsync.log").unwrap();

        let sync = SyncConfig::load(file.path()).unwrap();
        assert_eq!(sync.variant_policy, VariantPolicy::Precedence);

        let logging = LogConfig::load(file.path()).unwrap();
        assert_eq!(logging.filter, "mapsync=trace");
        assert_eq!(logging.file, Some(PathBuf::from("/tmp/mapsync.log")));
    }

    #[test]
    fn test_load_missing_file_is_read_error() {
        let err = SyncConfig::load(Path::new("/nonexistent/mapsync.ini")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_read_error_keeps_underlying_cause() {
        let err = LogConfig::load(Path::new("/nonexistent/mapsync.ini")).unwrap_err();

        let cause = std::error::Error::source(&err).expect("read error carries its cause");
        assert!(cause.downcast_ref::<ini::Error>().is_some());
        assert!(err.to_string().contains("/nonexistent/mapsync.ini"));
    }
}
