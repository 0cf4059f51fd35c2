use std::{
    fs::{self, File, OpenOptions},
    io,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Size at which the current log is moved aside to `<name>.log.1`.
const ROTATE_BYTES: u64 = 1_000_000;

/// Log to `log_file` and stderr. `RUST_LOG` wins over `-v`.
pub fn init(verbose: u8, log_file: &Path) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(directive(verbose)));
    let file = open_rotating(log_file, ROTATE_BYTES)
        .with_context(|| format!("opening log file {}", log_file.display()))?;

    // Assessments go to stdout; keep logs off it.
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(file).with_ansi(false).with_target(false))
        .with(fmt::layer().with_writer(io::stderr).with_target(false))
        .try_init()
        .map_err(|e| anyhow!("tracing init failed: {e}"))
}

fn directive(verbose: u8) -> &'static str {
    match verbose {
        0 => "url_radar=info,warn",
        1 => "url_radar=debug,info",
        _ => "trace",
    }
}

fn rotated_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".1");
    PathBuf::from(name)
}

/// Open `path` for appending, first rotating it if it has grown past `limit`.
fn open_rotating(path: &Path, limit: u64) -> io::Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    if fs::metadata(path).map(|m| m.len() > limit).unwrap_or(false) {
        fs::rename(path, rotated_path(path))?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("url-radar-{name}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn verbosity_widens_the_filter() {
        assert_eq!(directive(0), "url_radar=info,warn");
        assert_eq!(directive(1), "url_radar=debug,info");
        assert_eq!(directive(5), "trace");
    }

    #[test]
    fn large_logs_are_rotated() {
        let dir = scratch("rotate");
        let log = dir.join("nested").join("radar.log");

        let mut file = open_rotating(&log, 8).unwrap();
        file.write_all(b"first run, well past the limit\n").unwrap();
        drop(file);

        let mut file = open_rotating(&log, 8).unwrap();
        file.write_all(b"second\n").unwrap();
        drop(file);

        assert_eq!(fs::read_to_string(&log).unwrap(), "second\n");
        let rotated = fs::read_to_string(dir.join("nested").join("radar.log.1")).unwrap();
        assert!(rotated.starts_with("first run"));
        let _ = fs::remove_dir_all(&dir);
    }
}
