//! The basemap: the map view's heavy, optional component.

use std::path::PathBuf;

use async_trait::async_trait;
use ratatui::layout::Rect;
use serde::Deserialize;

use hearthlog_sync::{Component, ComponentSource, LoadError, ResilientLoader};
use hearthlog_types::Coordinates;

/// Layer a basemap must have to be usable.
pub const COASTLINE_LAYER: &str = "coastline";

pub type MapLoader = ResilientLoader<BasemapSource>;

/// Polylines in `[lng, lat]` pairs, grouped into named layers.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Basemap {
    pub name: String,
    pub layers: Vec<Layer>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Layer {
    pub name: String,
    pub lines: Vec<Vec<[f64; 2]>>,
}

impl Basemap {
    /// A coarse world outline that ships with the binary.
    pub fn builtin() -> Self {
        let outline = |points: &[(f64, f64)]| -> Vec<[f64; 2]> {
            points.iter().map(|&(x, y)| [x, y]).collect()
        };
        Self {
            name: "builtin".to_string(),
            layers: vec![Layer {
                name: COASTLINE_LAYER.to_string(),
                lines: vec![
                    // North America
                    outline(&[
                        (-168.0, 65.0), (-140.0, 70.0), (-95.0, 72.0), (-80.0, 63.0),
                        (-55.0, 52.0), (-70.0, 43.0), (-81.0, 25.0), (-97.0, 26.0),
                        (-105.0, 20.0), (-87.0, 13.0), (-78.0, 8.0), (-110.0, 23.0),
                        (-124.0, 40.0), (-125.0, 49.0), (-150.0, 60.0), (-168.0, 65.0),
                    ]),
                    // South America
                    outline(&[
                        (-78.0, 8.0), (-60.0, 10.0), (-35.0, -6.0), (-40.0, -22.0),
                        (-58.0, -38.0), (-68.0, -55.0), (-75.0, -45.0), (-71.0, -18.0),
                        (-81.0, -5.0), (-78.0, 8.0),
                    ]),
                    // Europe and Asia
                    outline(&[
                        (-10.0, 36.0), (-9.0, 43.0), (-2.0, 48.0), (8.0, 54.0),
                        (5.0, 61.0), (25.0, 71.0), (60.0, 70.0), (100.0, 77.0),
                        (140.0, 72.0), (180.0, 68.0), (160.0, 60.0), (135.0, 43.0),
                        (122.0, 30.0), (108.0, 20.0), (100.0, 2.0), (80.0, 8.0),
                        (57.0, 24.0), (35.0, 32.0), (26.0, 40.0), (12.0, 44.0),
                        (-10.0, 36.0),
                    ]),
                    // Africa
                    outline(&[
                        (-17.0, 21.0), (-6.0, 35.0), (11.0, 37.0), (32.0, 31.0),
                        (43.0, 12.0), (51.0, 11.0), (40.0, -15.0), (20.0, -35.0),
                        (12.0, -5.0), (-17.0, 14.0), (-17.0, 21.0),
                    ]),
                    // Australia
                    outline(&[
                        (114.0, -22.0), (130.0, -12.0), (142.0, -11.0), (153.0, -28.0),
                        (146.0, -39.0), (131.0, -31.0), (115.0, -34.0), (114.0, -22.0),
                    ]),
                ],
            }],
        }
    }

    pub fn layer(&self, name: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.name == name)
    }

    /// Every line segment as `((x1, y1), (x2, y2))` in lng/lat.
    pub fn segments(&self) -> impl Iterator<Item = ((f64, f64), (f64, f64))> + '_ {
        self.layers
            .iter()
            .flat_map(|layer| layer.lines.iter())
            .flat_map(|line| line.windows(2))
            .map(|pair| ((pair[0][0], pair[0][1]), (pair[1][0], pair[1][1])))
    }
}

impl Component for Basemap {
    fn missing_capabilities(&self) -> Vec<String> {
        if self.layer(COASTLINE_LAYER).is_some() {
            Vec::new()
        } else {
            vec![COASTLINE_LAYER.to_string()]
        }
    }
}

/// Where the basemap is loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BasemapSource {
    Builtin,
    File(PathBuf),
}

impl BasemapSource {
    /// Interpret the `map.basemap` setting.
    pub fn from_setting(value: &str) -> Self {
        match value.trim() {
            "" | "builtin" => BasemapSource::Builtin,
            path => BasemapSource::File(PathBuf::from(path)),
        }
    }
}

#[async_trait]
impl ComponentSource for BasemapSource {
    type Component = Basemap;

    async fn load(&self) -> Result<Basemap, LoadError> {
        match self {
            BasemapSource::Builtin => Ok(Basemap::builtin()),
            BasemapSource::File(path) => {
                let bytes = tokio::fs::read(path)
                    .await
                    .map_err(|e| LoadError::failed(format!("{}: {}", path.display(), e)))?;
                serde_json::from_slice(&bytes)
                    .map_err(|e| LoadError::failed(format!("{}: {}", path.display(), e)))
            }
        }
    }
}

/// The coordinates under a terminal cell of a world map drawn in `area`.
///
/// `area` includes the one-cell border around the canvas.
pub fn coordinates_at(area: Rect, column: u16, row: u16) -> Option<Coordinates> {
    let inner = Rect::new(
        area.x.saturating_add(1),
        area.y.saturating_add(1),
        area.width.saturating_sub(2),
        area.height.saturating_sub(2),
    );
    if inner.width < 2 || inner.height < 2 {
        return None;
    }
    if column < inner.x || column >= inner.right() || row < inner.y || row >= inner.bottom() {
        return None;
    }

    let fx = (column - inner.x) as f64 / (inner.width - 1) as f64;
    let fy = (row - inner.y) as f64 / (inner.height - 1) as f64;
    Coordinates::new(90.0 - fy * 180.0, -180.0 + fx * 360.0).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hearthlog_sync::LoadState;
    use std::io::Write;
    use std::time::Duration;

    #[test]
    fn builtin_has_a_coastline() {
        let map = Basemap::builtin();
        assert!(map.missing_capabilities().is_empty());
        assert!(map.segments().count() > 40);
    }

    #[test]
    fn setting_values() {
        assert_eq!(BasemapSource::from_setting("builtin"), BasemapSource::Builtin);
        assert_eq!(
            BasemapSource::from_setting("/srv/world.json"),
            BasemapSource::File(PathBuf::from("/srv/world.json"))
        );
    }

    #[tokio::test]
    async fn loads_from_a_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{"name": "tiny", "layers": [{{"name": "coastline", "lines": [[[0, 0], [10, 10]]]}}]}}"#
        )
        .unwrap();

        let loader = MapLoader::new(BasemapSource::File(file.path().to_path_buf()));
        assert_eq!(loader.start_load().await, LoadState::Ready);

        let map = loader.component().unwrap();
        assert_eq!(map.name, "tiny");
        assert_eq!(map.segments().count(), 1);
    }

    #[tokio::test]
    async fn a_map_without_coastline_is_incompatible() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"name": "rivers only", "layers": []}}"#).unwrap();

        let loader = MapLoader::new(BasemapSource::File(file.path().to_path_buf()));
        let state = loader.start_load().await;

        assert_eq!(
            state,
            LoadState::Failed(LoadError::Incompatible {
                missing: vec![COASTLINE_LAYER.to_string()]
            })
        );
    }

    #[tokio::test]
    async fn repeated_failures_fall_back_to_manual() {
        let loader = MapLoader::builder(BasemapSource::File(PathBuf::from("/nonexistent/map.json")))
            .ceiling(1)
            .timeout(Duration::from_secs(1))
            .build();

        loader.start_load().await;
        let state = loader.start_load().await;

        assert!(matches!(state, LoadState::Degraded(_)));
        assert!(loader.picker().is_manual());
    }

    #[test]
    fn cells_map_to_coordinates() {
        let area = Rect::new(0, 0, 38, 20);

        let top_left = coordinates_at(area, 1, 1).unwrap();
        assert_eq!((top_left.lat, top_left.lng), (90.0, -180.0));

        let bottom_right = coordinates_at(area, 36, 18).unwrap();
        assert_eq!((bottom_right.lat, bottom_right.lng), (-90.0, 180.0));

        assert!(coordinates_at(area, 0, 5).is_none());
        assert!(coordinates_at(area, 37, 5).is_none());
    }
}
