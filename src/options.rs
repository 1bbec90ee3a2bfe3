//! Choices offered by the poster form: colors, fonts and combined-view layout

use serde::{Deserialize, Serialize};

use crate::geometry::Orientation;

/// An opaque RGB color as picked by an `<input type="color">`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HexColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl HexColor {
    pub const BLACK: HexColor = HexColor::new(0, 0, 0);
    pub const WHITE: HexColor = HexColor::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rrggbb` or `#rgb` (leading `#` optional, case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        let hex = s.trim().trim_start_matches('#');
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        match hex.len() {
            6 => Some(Self::new(
                u8::from_str_radix(&hex[0..2], 16).ok()?,
                u8::from_str_radix(&hex[2..4], 16).ok()?,
                u8::from_str_radix(&hex[4..6], 16).ok()?,
            )),
            3 => {
                let digit = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|v| v * 17);
                Some(Self::new(digit(0)?, digit(1)?, digit(2)?))
            }
            _ => None,
        }
    }

    /// CSS form, always `#rrggbb` lowercase
    pub fn to_css(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl TryFrom<String> for HexColor {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        HexColor::parse(&value).ok_or_else(|| format!("invalid color: {value}"))
    }
}

impl From<HexColor> for String {
    fn from(color: HexColor) -> Self {
        color.to_css()
    }
}

/// Fonts offered in the title/subtitle dropdowns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum FontChoice {
    #[default]
    Montserrat,
    PlayfairDisplay,
    Raleway,
    GreatVibes,
    CourierPrime,
    Georgia,
}

impl FontChoice {
    pub const ALL: [FontChoice; 6] = [
        FontChoice::Montserrat,
        FontChoice::PlayfairDisplay,
        FontChoice::Raleway,
        FontChoice::GreatVibes,
        FontChoice::CourierPrime,
        FontChoice::Georgia,
    ];

    /// Family name as used in a CSS font shorthand
    pub fn family(&self) -> &'static str {
        match self {
            FontChoice::Montserrat => "Montserrat",
            FontChoice::PlayfairDisplay => "Playfair Display",
            FontChoice::Raleway => "Raleway",
            FontChoice::GreatVibes => "Great Vibes",
            FontChoice::CourierPrime => "Courier Prime",
            FontChoice::Georgia => "Georgia",
        }
    }

    /// Generic fallback family
    fn fallback(&self) -> &'static str {
        match self {
            FontChoice::Montserrat | FontChoice::Raleway => "sans-serif",
            FontChoice::PlayfairDisplay | FontChoice::Georgia => "serif",
            FontChoice::GreatVibes => "cursive",
            FontChoice::CourierPrime => "monospace",
        }
    }

    /// Look up a dropdown value by family name (case-insensitive)
    pub fn from_family(s: &str) -> Option<Self> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|f| f.family().eq_ignore_ascii_case(wanted))
    }

    /// Canvas `font` property value at a given pixel size
    pub fn css_font(&self, size_px: f64) -> String {
        format!("{:.0}px '{}', {}", size_px, self.family(), self.fallback())
    }
}

/// How the combined view picks its orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LayoutMode {
    /// Follow the canvas aspect ratio
    #[default]
    Auto,
    Landscape,
    Portrait,
}

impl LayoutMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            LayoutMode::Auto => "auto",
            LayoutMode::Landscape => "landscape",
            LayoutMode::Portrait => "portrait",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Some(LayoutMode::Auto),
            "landscape" | "side-by-side" => Some(LayoutMode::Landscape),
            "portrait" | "stacked" => Some(LayoutMode::Portrait),
            _ => None,
        }
    }

    pub fn orientation(&self, width: f64, height: f64) -> Orientation {
        match self {
            LayoutMode::Auto => Orientation::from_dimensions(width, height),
            LayoutMode::Landscape => Orientation::Landscape,
            LayoutMode::Portrait => Orientation::Portrait,
        }
    }
}
