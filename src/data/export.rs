//! Diagnostics export.

use std::io::Write;
use std::path::Path;

use anyhow::Result;
use serde::Serialize;

use hearthlog_sync::LoadState;
use hearthlog_types::{now_ms, HealthState, SyncSnapshot};

/// Everything the sync view shows, as written by `e` and `--export`.
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticsReport {
    pub exported_at_ms: u64,
    pub health: HealthState,
    pub snapshot: SyncSnapshot,
    pub map: MapStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct MapStatus {
    pub state: &'static str,
    pub attempts: u32,
    pub ceiling: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MapStatus {
    pub fn new(state: &LoadState, attempts: u32, ceiling: u32) -> Self {
        Self {
            state: state.label(),
            attempts,
            ceiling,
            error: state.error().map(ToString::to_string),
        }
    }
}

impl DiagnosticsReport {
    pub fn new(health: HealthState, snapshot: SyncSnapshot, map: MapStatus) -> Self {
        Self {
            exported_at_ms: now_ms(),
            health,
            snapshot,
            map,
        }
    }

    /// Write the report as pretty JSON.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = std::fs::File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hearthlog_sync::LoadError;
    use hearthlog_types::{EntityKind, Health};

    #[test]
    fn writes_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("diagnostics.json");

        let snapshot = SyncSnapshot::builder()
            .health(Health::Degraded)
            .listeners(4)
            .rows(EntityKind::Entry, 2)
            .build();
        let map = MapStatus::new(&LoadState::Degraded(LoadError::failed("no tiles")), 4, 3);
        let report = DiagnosticsReport::new(HealthState::degraded(1, "503"), snapshot, map);

        report.write_to(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["health"]["health"], "degraded");
        assert_eq!(value["snapshot"]["listener_count"], 4);
        assert_eq!(value["snapshot"]["row_counts"]["entries"], 2);
        assert_eq!(value["map"]["state"], "degraded");
        assert_eq!(value["map"]["error"], "load failed: no tiles");
    }
}
