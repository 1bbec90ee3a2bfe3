//! Redraw pipeline and start-up coordination
//!
//! Every adjustment to the poster state is a named [`Stage`] registered with
//! one [`Pipeline`], run in registration order. Each stage takes the state by
//! value and returns the new state; nothing is patched in place elsewhere.
//!
//! [`Readiness`] is the single "initialization complete" signal: work queued
//! before it fires runs once when it fires, work queued after runs at once.

use glam::DVec2;

use crate::geometry::{PosterLayout, calculate_perfect_circle, combined_layout};
use crate::settings::PosterSettings;

/// Everything a redraw needs
#[derive(Debug, Clone, PartialEq)]
pub struct PosterState {
    pub settings: PosterSettings,
    /// Canvas size in canvas pixels
    pub canvas: DVec2,
    /// Filled in by [`ResolveLayout`]
    pub layout: Option<PosterLayout>,
}

impl PosterState {
    pub fn new(settings: PosterSettings, width: f64, height: f64) -> Self {
        Self {
            settings,
            canvas: DVec2::new(width, height),
            layout: None,
        }
    }
}

/// One named transform of the poster state
pub trait Stage {
    fn name(&self) -> &str;
    fn apply(&self, state: PosterState) -> PosterState;
}

/// Clamp settings into their valid ranges
pub struct NormalizeSettings;

impl Stage for NormalizeSettings {
    fn name(&self) -> &str {
        "normalize-settings"
    }

    fn apply(&self, mut state: PosterState) -> PosterState {
        state.settings.normalize();
        state
    }
}

/// Compute circle geometry from the canvas size
pub struct ResolveLayout;

impl Stage for ResolveLayout {
    fn name(&self) -> &str {
        "resolve-layout"
    }

    fn apply(&self, mut state: PosterState) -> PosterState {
        let (w, h) = (state.canvas.x, state.canvas.y);
        let settings = &state.settings;

        state.layout = if settings.combined_view {
            let orientation = settings.layout.orientation(w, h);
            combined_layout(w, h, orientation, settings.overlap_percent).map(PosterLayout::Combined)
        } else {
            calculate_perfect_circle(w, h, settings.circle_percent).map(PosterLayout::Single)
        };

        if state.layout.is_none() {
            log::warn!("No layout for canvas {w}x{h}");
        }
        state
    }
}

/// Ordered list of stages
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline {
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Pipeline with the built-in stages every redraw needs
    pub fn standard() -> Self {
        let mut pipeline = Self::new();
        pipeline.register(NormalizeSettings);
        pipeline.register(ResolveLayout);
        pipeline
    }

    /// Append a stage. A stage whose name is already registered replaces it in place.
    pub fn register(&mut self, stage: impl Stage + 'static) {
        let stage: Box<dyn Stage> = Box::new(stage);
        match self.stages.iter().position(|s| s.name() == stage.name()) {
            Some(i) => {
                log::debug!("Replacing stage {}", stage.name());
                self.stages[i] = stage;
            }
            None => self.stages.push(stage),
        }
    }

    /// Remove a stage by name. Returns whether it was registered.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.stages.len();
        self.stages.retain(|s| s.name() != name);
        self.stages.len() != before
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub fn run(&self, state: PosterState) -> PosterState {
        self.stages.iter().fold(state, |state, stage| stage.apply(state))
    }
}

type ReadyCallback<T> = Box<dyn FnOnce(&T)>;

/// One-shot readiness signal carrying the initialized context
pub struct Readiness<T> {
    context: Option<T>,
    pending: Vec<ReadyCallback<T>>,
}

impl<T> Default for Readiness<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Readiness<T> {
    pub fn new() -> Self {
        Self {
            context: None,
            pending: Vec::new(),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.context.is_some()
    }

    /// Run `f` once the context is ready (immediately if it already is)
    pub fn when_ready(&mut self, f: impl FnOnce(&T) + 'static) {
        match &self.context {
            Some(context) => f(context),
            None => self.pending.push(Box::new(f)),
        }
    }

    /// Fire the signal. Queued callbacks run in registration order.
    /// Firing twice is ignored.
    pub fn mark_ready(&mut self, context: T) {
        if self.context.is_some() {
            log::warn!("Readiness signalled twice, ignoring");
            return;
        }
        let context = self.context.insert(context);
        for f in self.pending.drain(..) {
            f(context);
        }
    }

    pub fn context(&self) -> Option<&T> {
        self.context.as_ref()
    }
}
