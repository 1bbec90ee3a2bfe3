//! Star Map Poster - preview engine for the star map poster form
//!
//! Core modules:
//! - `geometry`: Circle layout (single circle and combined view)
//! - `compose`: Circle-clipped image compositing onto a 2D surface
//! - `options`: Color, font and orientation choices offered by the form
//! - `settings`: Flat settings blob and the typed poster settings view
//! - `history`: Address/ZIP history lists with autofill
//! - `storage`: Key-value storage (LocalStorage on web, memory elsewhere)
//! - `sync`: Best-effort remote copy of stored blobs
//! - `pipeline`: Ordered transform stages and the readiness signal
//! - `web`: Browser glue (wasm only)

pub mod compose;
pub mod geometry;
pub mod history;
pub mod options;
pub mod pipeline;
pub mod settings;
pub mod storage;
pub mod sync;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use geometry::{Circle, CombinedLayout, calculate_perfect_circle, combined_layout};
pub use history::{History, HistoryKind};
pub use settings::{PosterSettings, SettingValue, SettingsBlob};
pub use storage::{KeyValueStore, MemoryStore, UserId};

/// Poster configuration constants
pub mod consts {
    /// Default circle diameter as a percentage of the smaller canvas side
    pub const DEFAULT_CIRCLE_PERCENT: f64 = 90.0;

    /// Combined view fits both circles inside this fraction of the canvas
    pub const COMBINED_MARGIN: f64 = 0.9;
    /// Default overlap between the two combined-view circles (percent)
    pub const DEFAULT_OVERLAP_PERCENT: f64 = 10.0;
    /// Overlap is clamped to this range (percent)
    pub const MIN_OVERLAP_PERCENT: f64 = 0.0;
    pub const MAX_OVERLAP_PERCENT: f64 = 50.0;

    /// Zoom factor limits (1.0 = plain cover-fit)
    pub const DEFAULT_ZOOM: f64 = 1.0;
    pub const MIN_ZOOM: f64 = 1.0;
    pub const MAX_ZOOM: f64 = 5.0;

    /// Border defaults (canvas pixels)
    pub const DEFAULT_BORDER_WIDTH: f64 = 4.0;
    pub const MAX_BORDER_WIDTH: f64 = 40.0;

    /// Caption font size as a fraction of the circle diameter
    pub const CAPTION_SIZE_RATIO: f64 = 0.06;
    /// Gap between the circle and the first caption line, as a fraction of diameter
    pub const CAPTION_GAP_RATIO: f64 = 0.04;
    /// Line height multiplier for caption lines
    pub const CAPTION_LINE_HEIGHT: f64 = 1.3;

    /// Maximum entries kept per history list
    pub const MAX_HISTORY_ENTRIES: usize = 10;

    /// User id used when nobody is signed in
    pub const GUEST_USER: &str = "guest";
}

/// Clamp a percentage-like value into a range, mapping NaN to the fallback
#[inline]
pub fn clamp_or(value: f64, min: f64, max: f64, fallback: f64) -> f64 {
    if value.is_nan() {
        fallback
    } else {
        value.clamp(min, max)
    }
}
