//! Circle-clipped image compositing
//!
//! Draw plans are pure arithmetic; drawing goes through the [`Surface`] trait
//! so the same layering runs against a browser 2D context or a test recorder.
//!
//! Layer order for a poster:
//! 1. background fill
//! 2. each circle: bitmap clipped to the circle, then its border
//! 3. caption lines below the lowest circle

use glam::DVec2;

use crate::clamp_or;
use crate::consts::*;
use crate::geometry::{Circle, PosterLayout};
use crate::options::{FontChoice, HexColor};
use crate::settings::PosterSettings;

/// Axis-aligned rectangle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub origin: DVec2,
    pub size: DVec2,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            origin: DVec2::new(x, y),
            size: DVec2::new(width, height),
        }
    }

    pub fn centered(center: DVec2, size: DVec2) -> Self {
        Self {
            origin: center - size / 2.0,
            size,
        }
    }

    #[inline]
    pub fn center(&self) -> DVec2 {
        self.origin + self.size / 2.0
    }
}

/// Where a bitmap is sampled from and where it lands
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawPlan {
    /// Cover-fit scale from bitmap pixels to canvas pixels
    pub scale: f64,
    /// Centered source crop in bitmap pixels
    pub source: Rect,
    /// Destination in canvas pixels, centered on the circle
    pub dest: Rect,
}

impl DrawPlan {
    /// Cover-fit a bitmap into a circle, cropping the source by `zoom`.
    ///
    /// The destination covers the circle's bounding square; zoom only shrinks
    /// the sampled source region. Zoom is clamped to `MIN_ZOOM..=MAX_ZOOM`.
    pub fn cover(bitmap_width: f64, bitmap_height: f64, circle: &Circle, zoom: f64) -> Option<Self> {
        let valid = |v: f64| v.is_finite() && v > 0.0;
        if !valid(bitmap_width) || !valid(bitmap_height) || !valid(circle.diameter) {
            return None;
        }

        let zoom = clamp_or(zoom, MIN_ZOOM, MAX_ZOOM, DEFAULT_ZOOM);
        let bitmap = DVec2::new(bitmap_width, bitmap_height);

        let scale = (circle.diameter / bitmap_width).max(circle.diameter / bitmap_height);
        let dest = Rect::centered(circle.center(), bitmap * scale);

        let source_size = bitmap / zoom;
        let source = Rect {
            origin: (bitmap - source_size) / 2.0,
            size: source_size,
        };

        Some(Self { scale, source, dest })
    }
}

/// Minimal 2D drawing surface (mirrors the canvas 2D context)
pub trait Surface {
    type Image;
    type Error;

    fn save(&self);
    fn restore(&self);
    fn begin_path(&self);
    /// Add a full circle to the current path
    fn circle(&self, center: DVec2, radius: f64) -> Result<(), Self::Error>;
    fn clip(&self);
    fn draw_image(&self, image: &Self::Image, source: Rect, dest: Rect) -> Result<(), Self::Error>;
    fn set_fill_style(&self, color: &str);
    fn fill_rect(&self, rect: Rect);
    fn set_stroke_style(&self, color: &str);
    fn set_line_width(&self, width: f64);
    fn stroke(&self);
    fn set_font(&self, font: &str);
    fn set_text_align(&self, align: &str);
    fn fill_text(&self, text: &str, x: f64, y: f64) -> Result<(), Self::Error>;
}

/// A loaded bitmap and its natural size
pub struct Bitmap<'a, I> {
    pub image: &'a I,
    pub width: f64,
    pub height: f64,
}

impl<I> Clone for Bitmap<'_, I> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<I> Copy for Bitmap<'_, I> {}

/// Bitmaps available for the current redraw
pub struct PosterImages<'a, I> {
    pub star_map: Option<Bitmap<'a, I>>,
    /// Only drawn in the combined view
    pub street_map: Option<Bitmap<'a, I>>,
}

impl<I> Default for PosterImages<'_, I> {
    fn default() -> Self {
        Self {
            star_map: None,
            street_map: None,
        }
    }
}

/// Border drawn around a circle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircleStyle {
    pub border_width: f64,
    pub border_color: HexColor,
}

/// Draw one circle: clipped bitmap (if any), then the border
pub fn render_circle<S: Surface>(
    surface: &S,
    circle: &Circle,
    image: Option<(&S::Image, &DrawPlan)>,
    style: &CircleStyle,
) -> Result<(), S::Error> {
    if let Some((image, plan)) = image {
        surface.save();
        surface.begin_path();
        surface.circle(circle.center(), circle.radius)?;
        surface.clip();
        surface.draw_image(image, plan.source, plan.dest)?;
        surface.restore();
    }

    if style.border_width > 0.0 {
        surface.set_stroke_style(&style.border_color.to_css());
        surface.set_line_width(style.border_width);
        surface.begin_path();
        surface.circle(circle.center(), circle.radius)?;
        surface.stroke();
    }

    Ok(())
}

/// Caption text below the circles
#[derive(Debug, Clone, PartialEq)]
pub struct Caption {
    pub lines: Vec<String>,
    pub font: FontChoice,
    pub color: HexColor,
}

/// Subtitle lines are drawn at this fraction of the title size
const SUBTITLE_SCALE: f64 = 0.6;

/// Baseline y and font size for each caption line.
///
/// Lines start `CAPTION_GAP_RATIO * diameter` below `bottom`; the block is
/// shifted up if it would run past `canvas_height`.
pub fn caption_baselines(bottom: f64, diameter: f64, count: usize, canvas_height: f64) -> Vec<(f64, f64)> {
    let base = diameter * CAPTION_SIZE_RATIO;
    let mut y = bottom + diameter * CAPTION_GAP_RATIO;
    let mut lines = Vec::with_capacity(count);

    for i in 0..count {
        let size = if i == 0 { base } else { base * SUBTITLE_SCALE };
        y += size;
        lines.push((y, size));
        y += size * (CAPTION_LINE_HEIGHT - 1.0);
    }

    let overflow = lines.last().map_or(0.0, |(y, _)| y - canvas_height);
    if overflow > 0.0 {
        for line in &mut lines {
            line.0 -= overflow;
        }
    }
    lines
}

pub fn render_caption<S: Surface>(
    surface: &S,
    caption: &Caption,
    center_x: f64,
    bottom: f64,
    diameter: f64,
    canvas_height: f64,
) -> Result<(), S::Error> {
    if caption.lines.is_empty() {
        return Ok(());
    }

    surface.set_fill_style(&caption.color.to_css());
    surface.set_text_align("center");
    let baselines = caption_baselines(bottom, diameter, caption.lines.len(), canvas_height);
    for (line, (y, size)) in caption.lines.iter().zip(baselines) {
        surface.set_font(&caption.font.css_font(size));
        surface.fill_text(line, center_x, y)?;
    }
    Ok(())
}

/// Draw a full poster preview
pub fn render_poster<S: Surface>(
    surface: &S,
    canvas_size: DVec2,
    layout: &PosterLayout,
    images: &PosterImages<'_, S::Image>,
    settings: &PosterSettings,
) -> Result<(), S::Error> {
    surface.set_fill_style(&settings.background_color.to_css());
    surface.fill_rect(Rect::new(0.0, 0.0, canvas_size.x, canvas_size.y));

    let style = CircleStyle {
        border_width: settings.effective_border_width(),
        border_color: settings.border_color,
    };

    let circles = layout.circles();
    let bitmaps = [images.star_map, images.street_map];
    for (circle, bitmap) in circles.iter().zip(bitmaps) {
        let plan = bitmap.and_then(|b| {
            let plan = DrawPlan::cover(b.width, b.height, circle, settings.zoom);
            if plan.is_none() {
                log::debug!("Skipping bitmap with invalid size {}x{}", b.width, b.height);
            }
            plan.map(|p| (b.image, p))
        });
        render_circle(surface, circle, plan.as_ref().map(|(img, p)| (*img, p)), &style)?;
    }

    let lines = settings.caption_lines();
    if let Some(first) = circles.first() {
        let caption = Caption {
            lines: lines.into_iter().map(str::to_string).collect(),
            font: settings.font,
            color: settings.text_color,
        };
        render_caption(
            surface,
            &caption,
            canvas_size.x / 2.0,
            layout.bottom(),
            first.diameter,
            canvas_size.y,
        )?;
    }

    Ok(())
}
