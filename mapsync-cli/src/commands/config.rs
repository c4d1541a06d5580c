//! Config command - show the effective configuration.

use std::path::Path;

use mapsync::config::LogConfig;
use mapsync::SyncConfig;

use crate::error::CliError;

/// Print the effective configuration as INI.
///
/// With no file this prints the defaults, which doubles as a template.
pub fn run(path: Option<&Path>) -> Result<(), CliError> {
    print!("{}", render(path)?);
    Ok(())
}

fn render(path: Option<&Path>) -> Result<String, CliError> {
    let (sync, logging) = match path {
        Some(path) => (SyncConfig::load(path)?, LogConfig::load(path)?),
        None => (SyncConfig::default(), LogConfig::default()),
    };

    let mut out = String::new();
    if let Some(path) = path {
        out.push_str(&format!("; loaded from {}\n", path.display()));
    }

    // The rendered [logging] section carries the default filter; substitute
    // the effective one
    for line in sync.to_ini_string().lines() {
        let key = line.split('=').next().map(str::trim);
        if key == Some("filter") {
            out.push_str(&format!("filter={}\n", logging.filter));
            if let Some(file) = &logging.file {
                out.push_str(&format!("file={}\n", file.display()));
            }
        } else {
            out.push_str(line);
            out.push('\n');
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_render_defaults() {
        let text = render(None).unwrap();
        assert!(text.contains("[sync]"));
        assert_eq!(SyncConfig::from_ini_str(&text).unwrap(), SyncConfig::default());
        assert_eq!(LogConfig::from_ini_str(&text).unwrap(), LogConfig::default());
    }

    #[test]
    fn test_render_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[sync]\nreset_probe = any\n\n[logging]\nfilter = mapsync=trace\nfile = /tmp/mapsync.log"
        )
        .unwrap();

        let text = render(Some(file.path())).unwrap();
        let sync = SyncConfig::from_ini_str(&text).unwrap();
        let logging = LogConfig::from_ini_str(&text).unwrap();
        assert_eq!(sync.reset_probe, mapsync::ResetProbe::AnyEntity);
        assert_eq!(logging.filter, "mapsync=trace");
        assert_eq!(logging.file.as_deref(), Some(Path::new("/tmp/mapsync.log")));
    }

    #[test]
    fn test_render_rejects_bad_value() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[sync]\nvariant_policy = coinflip").unwrap();

        assert!(matches!(render(Some(file.path())), Err(CliError::Config(_))));
    }
}
