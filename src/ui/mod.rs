//! Terminal UI rendering using ratatui.
//!
//! Each view is implemented in its own submodule with a `render` function.
//!
//! ## Submodules
//!
//! - [`journal`]: Entries table with like, photo and comment counts
//! - [`map`]: Basemap canvas with entry markers, or the manual fallback
//! - [`sync`]: Connection health, bus activity and loader status
//! - [`common`]: Shared components (header, notice, tabs, status bar, help)
//! - [`theme`]: Light/dark theme support with terminal auto-detection
//!
//! ## Rendering Architecture
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │ Header (common::render_header)       │
//! │ Notice (common::render_notice)       │  only while offline/degraded
//! ├──────────────────────────────────────┤
//! │ Tabs (common::render_tabs)           │
//! ├──────────────────────────────────────┤
//! │                                      │
//! │ View Content                         │
//! │ (journal/map/sync::render)           │
//! │                                      │
//! ├──────────────────────────────────────┤
//! │ Status Bar (common::render_status)   │
//! └──────────────────────────────────────┘
//! ```

pub mod common;
pub mod journal;
pub mod map;
pub mod sync;
pub mod theme;

pub use theme::Theme;
