//! Circle geometry for the poster preview
//!
//! All layout is derived from the canvas size in canvas pixels:
//! - single view: one circle centered on the canvas
//! - combined view: two equal circles side-by-side (landscape) or stacked
//!   (portrait), pulled together by an overlap percentage

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::clamp_or;
use crate::consts::*;

/// Tolerance for containment checks (canvas pixels)
const EPSILON: f64 = 1e-6;

/// A circle in canvas space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub center_x: f64,
    pub center_y: f64,
    pub radius: f64,
    pub diameter: f64,
}

impl Circle {
    pub fn from_center(center: DVec2, diameter: f64) -> Self {
        Self {
            center_x: center.x,
            center_y: center.y,
            radius: diameter / 2.0,
            diameter,
        }
    }

    #[inline]
    pub fn center(&self) -> DVec2 {
        DVec2::new(self.center_x, self.center_y)
    }

    /// Check if a point lies inside or on the circle
    pub fn contains_point(&self, point: DVec2) -> bool {
        self.center().distance(point) <= self.radius + EPSILON
    }

    /// Check if the whole circle lies inside a `width` x `height` canvas
    pub fn fits_within(&self, width: f64, height: f64) -> bool {
        self.center_x - self.radius >= -EPSILON
            && self.center_x + self.radius <= width + EPSILON
            && self.center_y - self.radius >= -EPSILON
            && self.center_y + self.radius <= height + EPSILON
    }

    /// Check if two circles intersect (touching does not count)
    pub fn intersects(&self, other: &Circle) -> bool {
        self.center().distance(other.center()) < self.radius + other.radius - EPSILON
    }
}

/// Axis along which the combined-view circles are laid out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Orientation {
    /// Side-by-side along x
    #[default]
    Landscape,
    /// Stacked along y
    Portrait,
}

impl Orientation {
    /// Landscape when the canvas is at least as wide as it is tall
    pub fn from_dimensions(width: f64, height: f64) -> Self {
        if width >= height {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        }
    }

    fn axis(self) -> DVec2 {
        match self {
            Orientation::Landscape => DVec2::X,
            Orientation::Portrait => DVec2::Y,
        }
    }
}

#[inline]
fn valid_dimension(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

/// Compute the circle inscribed in the canvas at `percent` of its smaller side.
///
/// Returns `None` for non-positive or non-finite dimensions and for a percent
/// outside `(0, 100]`.
pub fn calculate_perfect_circle(width: f64, height: f64, percent: f64) -> Option<Circle> {
    if !valid_dimension(width) || !valid_dimension(height) {
        return None;
    }
    if !(percent > 0.0 && percent <= 100.0) {
        return None;
    }

    let diameter = width.min(height) * percent / 100.0;
    let center = DVec2::new(width / 2.0, height / 2.0);
    Some(Circle::from_center(center, diameter))
}

/// Two-circle combined view
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CombinedLayout {
    pub orientation: Orientation,
    /// Overlap actually applied, after clamping (percent)
    pub overlap_percent: f64,
    /// Left (landscape) or top (portrait) circle
    pub first: Circle,
    /// Right (landscape) or bottom (portrait) circle
    pub second: Circle,
}

impl CombinedLayout {
    /// Distance between the two circle centers
    pub fn center_distance(&self) -> f64 {
        self.first.center().distance(self.second.center())
    }

    pub fn circles(&self) -> [Circle; 2] {
        [self.first, self.second]
    }
}

/// Lay out two equal circles for the combined view.
///
/// Center spacing is `diameter * (1 - overlap/100)`; the pair is sized so that
/// its extent stays within `COMBINED_MARGIN` of the canvas on both axes.
/// Overlap is clamped to `MIN_OVERLAP_PERCENT..=MAX_OVERLAP_PERCENT`.
pub fn combined_layout(
    width: f64,
    height: f64,
    orientation: Orientation,
    overlap_percent: f64,
) -> Option<CombinedLayout> {
    if !valid_dimension(width) || !valid_dimension(height) {
        return None;
    }

    let overlap = clamp_or(
        overlap_percent,
        MIN_OVERLAP_PERCENT,
        MAX_OVERLAP_PERCENT,
        DEFAULT_OVERLAP_PERCENT,
    );
    let o = overlap / 100.0;

    let (along, across) = match orientation {
        Orientation::Landscape => (width, height),
        Orientation::Portrait => (height, width),
    };

    // Pair extent along the layout axis is diameter * (2 - o)
    let diameter = (COMBINED_MARGIN * along / (2.0 - o)).min(COMBINED_MARGIN * across);
    let spacing = diameter * (1.0 - o);

    let mid = DVec2::new(width / 2.0, height / 2.0);
    let offset = orientation.axis() * (spacing / 2.0);

    Some(CombinedLayout {
        orientation,
        overlap_percent: overlap,
        first: Circle::from_center(mid - offset, diameter),
        second: Circle::from_center(mid + offset, diameter),
    })
}

/// Resolved layout for one redraw
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PosterLayout {
    Single(Circle),
    Combined(CombinedLayout),
}

impl PosterLayout {
    pub fn circles(&self) -> Vec<Circle> {
        match self {
            PosterLayout::Single(circle) => vec![*circle],
            PosterLayout::Combined(layout) => layout.circles().to_vec(),
        }
    }

    /// Lowest edge of any circle (caption anchor)
    pub fn bottom(&self) -> f64 {
        self.circles()
            .iter()
            .map(|c| c.center_y + c.radius)
            .fold(f64::MIN, f64::max)
    }
}
