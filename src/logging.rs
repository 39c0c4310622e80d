//! Log to a file, since the terminal belongs to the UI.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

/// Environment variable holding filter directives.
pub const LOG_ENV: &str = "HEARTHLOG_LOG";

/// Filter used when [`LOG_ENV`] is unset or invalid.
pub const DEFAULT_DIRECTIVES: &str = "hearthlog=info";

/// Install the global subscriber, appending to `path`.
pub fn init(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init()
        .map_err(|err| anyhow!("could not install logger: {}", err))
}

/// Send panic reports to the log instead of stderr.
///
/// Listener panics are contained by the update bus and the UI keeps
/// running, so the hook must not touch the terminal.
pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_default();
        let message = info
            .payload()
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        tracing::error!(%location, %message, "panic");
    }));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_events_to_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("hearthlog.log");

        init(&path).unwrap();
        tracing::info!(entries = 3, "journal loaded");
        tracing::debug!("below the default level");

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("journal loaded"));
        assert!(contents.contains("entries=3"));
        assert!(!contents.contains("below the default level"));
    }
}
