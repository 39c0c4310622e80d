//! # hearthlog
//!
//! A terminal client for a shared family journal, built on the
//! `hearthlog-sync` layer.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                          Application                          │
//! │  ┌─────────┐    ┌──────────┐    ┌─────────┐    ┌──────────┐   │
//! │  │ events  │───▶│   app    │───▶│   ui    │───▶│ Terminal │   │
//! │  │ (keys)  │    │ (state)  │    │(render) │    │          │   │
//! │  └─────────┘    └────┬─────┘    └─────────┘    └──────────┘   │
//! │                      │                                        │
//! │                      ▼                                        │
//! │  ┌──────────────────────────────────────────────────────┐     │
//! │  │ services: Journal, LiveQuery, ConnectionMonitor,     │     │
//! │  │           NetworkWatcher, MapLoader, change relay    │     │
//! │  └──────────────────────────────────────────────────────┘     │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`app`]**: Application state and the actions keys map to
//! - **[`services`]**: Builds the gateway and sync handles from [`Settings`]
//! - **[`data`]**: Row shaping, publish history and the diagnostics export
//! - **[`map`]**: The basemap component loaded through a resilient loader
//! - **[`network`]**: Local network detection feeding the connection monitor
//! - **[`ui`]**: ratatui rendering and themes
//!
//! ## Usage
//!
//! ```bash
//! # Demo journal, signed in as "mum"
//! hearthlog --user mum
//!
//! # A PostgREST backend
//! HEARTHLOG__GATEWAY__API_KEY=... hearthlog --gateway rest --endpoint https://family.example.co
//!
//! # Write diagnostics and exit
//! hearthlog --export diagnostics.json
//! ```
//!
//! ## Library use
//!
//! The services can be assembled around any gateway, which is how the
//! tests drive the app without a terminal:
//!
//! ```rust
//! # tokio_test::block_on(async {
//! use std::sync::Arc;
//!
//! use hearthlog::services::{demo_gateway, Services};
//! use hearthlog::{BasemapSource, MapLoader};
//! use hearthlog_sync::Session;
//! use hearthlog_types::EntityKind;
//!
//! let services = Services::detached(
//!     Arc::new(demo_gateway()),
//!     Session::signed_in("mum"),
//!     MapLoader::new(BasemapSource::Builtin),
//! );
//!
//! let entries = services.journal.list(EntityKind::Entry).await.unwrap();
//! assert_eq!(entries.len(), 3);
//! # });
//! ```

pub mod app;
pub mod data;
pub mod events;
pub mod logging;
pub mod map;
pub mod network;
pub mod services;
pub mod settings;
pub mod ui;

pub use app::App;
pub use map::{Basemap, BasemapSource, MapLoader};
pub use network::NetworkWatcher;
pub use services::Services;
pub use settings::Settings;
