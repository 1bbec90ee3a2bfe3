//! Poster settings and preferences
//!
//! Persisted as a flat JSON object (form-field name -> value) under
//! `<userId>_app_settings`. `PosterSettings` is the typed view the renderer
//! works with; unknown fields in the stored blob are left untouched.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::clamp_or;
use crate::consts::*;
use crate::options::{FontChoice, HexColor, LayoutMode};
use crate::storage::{KeyValueStore, StoreError, UserId, load_json, save_json};

/// Storage key suffix for the settings blob
pub const SETTINGS_KEY: &str = "app_settings";

/// Form field names
pub mod fields {
    pub const CIRCLE_PERCENT: &str = "circle-percent";
    pub const ZOOM: &str = "zoom";
    pub const COMBINED_VIEW: &str = "combined-view";
    pub const COMBINED_LAYOUT: &str = "combined-layout";
    pub const OVERLAP: &str = "overlap";
    pub const SHOW_BORDER: &str = "show-border";
    pub const BORDER_WIDTH: &str = "border-width";
    pub const BACKGROUND_COLOR: &str = "background-color";
    pub const BORDER_COLOR: &str = "border-color";
    pub const TEXT_COLOR: &str = "text-color";
    pub const FONT_FAMILY: &str = "font-family";
    pub const TITLE: &str = "title";
    pub const SUBTITLE: &str = "subtitle";
    pub const ADDRESS: &str = "address";
    pub const ZIP: &str = "zip";
    pub const DATE: &str = "date";
    pub const TIME: &str = "time";

    /// Every field the form persists
    pub const ALL: &[&str] = &[
        CIRCLE_PERCENT,
        ZOOM,
        COMBINED_VIEW,
        COMBINED_LAYOUT,
        OVERLAP,
        SHOW_BORDER,
        BORDER_WIDTH,
        BACKGROUND_COLOR,
        BORDER_COLOR,
        TEXT_COLOR,
        FONT_FAMILY,
        TITLE,
        SUBTITLE,
        ADDRESS,
        ZIP,
        DATE,
        TIME,
    ];
}

/// A single form value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Flag(bool),
    Number(f64),
    Text(String),
}

impl SettingValue {
    /// Numeric value; text is parsed the way a number input reports it
    pub fn as_number(&self) -> Option<f64> {
        match self {
            SettingValue::Number(n) => Some(*n),
            SettingValue::Text(s) => s.trim().parse().ok(),
            SettingValue::Flag(_) => None,
        }
    }

    /// Boolean value; accepts checkbox-style text
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            SettingValue::Flag(b) => Some(*b),
            SettingValue::Text(s) => match s.trim().to_lowercase().as_str() {
                "true" | "on" | "yes" | "1" => Some(true),
                "false" | "off" | "no" | "0" | "" => Some(false),
                _ => None,
            },
            SettingValue::Number(n) => Some(*n != 0.0),
        }
    }

    /// Value of a number or range input. An empty or non-numeric entry is
    /// kept as empty text so it overrides a stored number and reads back as
    /// the field's default.
    pub fn from_number_input(raw: &str) -> Self {
        match raw.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => SettingValue::Number(n),
            _ => SettingValue::Text(String::new()),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            SettingValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for SettingValue {
    fn from(value: bool) -> Self {
        SettingValue::Flag(value)
    }
}

impl From<f64> for SettingValue {
    fn from(value: f64) -> Self {
        SettingValue::Number(value)
    }
}

impl From<&str> for SettingValue {
    fn from(value: &str) -> Self {
        SettingValue::Text(value.to_string())
    }
}

impl From<String> for SettingValue {
    fn from(value: String) -> Self {
        SettingValue::Text(value)
    }
}

/// Flat field-name -> value mapping, stored as one JSON object
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct SettingsBlob {
    values: BTreeMap<String, SettingValue>,
}

/// Fields that do not decode (e.g. `null`) are dropped one by one so a single
/// bad value cannot void the rest of the blob.
impl<'de> Deserialize<'de> for SettingsBlob {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, serde_json::Value>::deserialize(deserializer)?;
        let values = raw
            .into_iter()
            .filter_map(|(field, value)| match serde_json::from_value(value) {
                Ok(value) => Some((field, value)),
                Err(_) => {
                    log::warn!("Dropping unreadable setting {field}");
                    None
                }
            })
            .collect();
        Ok(Self { values })
    }
}

impl SettingsBlob {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field. A non-finite number clears the field instead, since JSON
    /// cannot hold it.
    pub fn set(&mut self, field: &str, value: impl Into<SettingValue>) {
        match value.into() {
            SettingValue::Number(n) if !n.is_finite() => {
                self.values.remove(field);
            }
            value => {
                self.values.insert(field.to_string(), value);
            }
        }
    }

    pub fn get(&self, field: &str) -> Option<&SettingValue> {
        self.values.get(field)
    }

    pub fn number(&self, field: &str) -> Option<f64> {
        self.get(field).and_then(SettingValue::as_number)
    }

    pub fn flag(&self, field: &str) -> Option<bool> {
        self.get(field).and_then(SettingValue::as_flag)
    }

    pub fn text(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(SettingValue::as_text)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SettingValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Overwrite fields with those present in `other`
    pub fn merge(&mut self, other: &SettingsBlob) {
        for (field, value) in &other.values {
            self.values.insert(field.clone(), value.clone());
        }
    }

    /// Load the blob for a user (None if absent or malformed)
    pub fn load(store: &impl KeyValueStore, user: &UserId) -> Option<Self> {
        load_json(store, &user.key(SETTINGS_KEY))
    }

    /// Save the blob for a user
    pub fn save(&self, store: &impl KeyValueStore, user: &UserId) -> Result<(), StoreError> {
        save_json(store, &user.key(SETTINGS_KEY), self)?;
        log::info!("Settings saved for {user} ({} fields)", self.len());
        Ok(())
    }
}

/// Typed poster settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PosterSettings {
    /// Circle diameter as a percentage of the smaller canvas side (1-100)
    pub circle_percent: f64,
    /// Source crop zoom factor
    pub zoom: f64,

    // === Combined view ===
    /// Show star map and street map together
    pub combined_view: bool,
    pub layout: LayoutMode,
    /// Overlap between the two circles (percent)
    pub overlap_percent: f64,

    // === Border ===
    pub show_border: bool,
    pub border_width: f64,

    // === Colors ===
    pub background_color: HexColor,
    pub border_color: HexColor,
    pub text_color: HexColor,

    // === Caption ===
    pub font: FontChoice,
    pub title: String,
    pub subtitle: String,
}

impl Default for PosterSettings {
    fn default() -> Self {
        Self {
            circle_percent: DEFAULT_CIRCLE_PERCENT,
            zoom: DEFAULT_ZOOM,

            combined_view: false,
            layout: LayoutMode::Auto,
            overlap_percent: DEFAULT_OVERLAP_PERCENT,

            show_border: true,
            border_width: DEFAULT_BORDER_WIDTH,

            background_color: HexColor::BLACK,
            border_color: HexColor::WHITE,
            text_color: HexColor::WHITE,

            font: FontChoice::Montserrat,
            title: String::new(),
            subtitle: String::new(),
        }
    }
}

impl PosterSettings {
    /// Read known fields from a blob; missing or invalid fields keep defaults
    pub fn from_blob(blob: &SettingsBlob) -> Self {
        let mut settings = Self::default();

        if let Some(v) = blob.number(fields::CIRCLE_PERCENT) {
            settings.circle_percent = v;
        }
        if let Some(v) = blob.number(fields::ZOOM) {
            settings.zoom = v;
        }
        if let Some(v) = blob.flag(fields::COMBINED_VIEW) {
            settings.combined_view = v;
        }
        if let Some(v) = blob.text(fields::COMBINED_LAYOUT).and_then(LayoutMode::from_str) {
            settings.layout = v;
        }
        if let Some(v) = blob.number(fields::OVERLAP) {
            settings.overlap_percent = v;
        }
        if let Some(v) = blob.flag(fields::SHOW_BORDER) {
            settings.show_border = v;
        }
        if let Some(v) = blob.number(fields::BORDER_WIDTH) {
            settings.border_width = v;
        }
        if let Some(v) = blob.text(fields::BACKGROUND_COLOR).and_then(HexColor::parse) {
            settings.background_color = v;
        }
        if let Some(v) = blob.text(fields::BORDER_COLOR).and_then(HexColor::parse) {
            settings.border_color = v;
        }
        if let Some(v) = blob.text(fields::TEXT_COLOR).and_then(HexColor::parse) {
            settings.text_color = v;
        }
        if let Some(v) = blob.text(fields::FONT_FAMILY).and_then(FontChoice::from_family) {
            settings.font = v;
        }
        if let Some(v) = blob.text(fields::TITLE) {
            settings.title = v.to_string();
        }
        if let Some(v) = blob.text(fields::SUBTITLE) {
            settings.subtitle = v.to_string();
        }

        settings.normalize();
        settings
    }

    /// Write every known field into a blob, keeping unrelated fields
    pub fn write_into(&self, blob: &mut SettingsBlob) {
        blob.set(fields::CIRCLE_PERCENT, self.circle_percent);
        blob.set(fields::ZOOM, self.zoom);
        blob.set(fields::COMBINED_VIEW, self.combined_view);
        blob.set(fields::COMBINED_LAYOUT, self.layout.as_str());
        blob.set(fields::OVERLAP, self.overlap_percent);
        blob.set(fields::SHOW_BORDER, self.show_border);
        blob.set(fields::BORDER_WIDTH, self.border_width);
        blob.set(fields::BACKGROUND_COLOR, self.background_color.to_css());
        blob.set(fields::BORDER_COLOR, self.border_color.to_css());
        blob.set(fields::TEXT_COLOR, self.text_color.to_css());
        blob.set(fields::FONT_FAMILY, self.font.family());
        blob.set(fields::TITLE, self.title.as_str());
        blob.set(fields::SUBTITLE, self.subtitle.as_str());
    }

    pub fn to_blob(&self) -> SettingsBlob {
        let mut blob = SettingsBlob::new();
        self.write_into(&mut blob);
        blob
    }

    /// Clamp numeric settings into their valid ranges
    pub fn normalize(&mut self) {
        self.circle_percent = clamp_or(self.circle_percent, 1.0, 100.0, DEFAULT_CIRCLE_PERCENT);
        self.zoom = clamp_or(self.zoom, MIN_ZOOM, MAX_ZOOM, DEFAULT_ZOOM);
        self.overlap_percent = clamp_or(
            self.overlap_percent,
            MIN_OVERLAP_PERCENT,
            MAX_OVERLAP_PERCENT,
            DEFAULT_OVERLAP_PERCENT,
        );
        self.border_width = clamp_or(self.border_width, 0.0, MAX_BORDER_WIDTH, DEFAULT_BORDER_WIDTH);
    }

    /// Effective border width (zero when the border is hidden)
    pub fn effective_border_width(&self) -> f64 {
        if self.show_border {
            self.border_width
        } else {
            0.0
        }
    }

    /// Caption lines that are actually set
    pub fn caption_lines(&self) -> Vec<&str> {
        [self.title.trim(), self.subtitle.trim()]
            .into_iter()
            .filter(|line| !line.is_empty())
            .collect()
    }

    /// Load settings for a user, falling back to defaults
    pub fn load(store: &impl KeyValueStore, user: &UserId) -> Self {
        match SettingsBlob::load(store, user) {
            Some(blob) => {
                log::info!("Loaded settings for {user}");
                Self::from_blob(&blob)
            }
            None => {
                log::info!("Using default settings");
                Self::default()
            }
        }
    }

    /// Save settings for a user, keeping fields this type does not know about
    pub fn save(&self, store: &impl KeyValueStore, user: &UserId) -> Result<(), StoreError> {
        let mut settings = self.clone();
        settings.normalize();
        let mut blob = SettingsBlob::load(store, user).unwrap_or_default();
        settings.write_into(&mut blob);
        blob.save(store, user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn test_blob_round_trip_keeps_types() {
        let store = MemoryStore::new();
        let user = UserId::new("alice");

        let mut blob = SettingsBlob::new();
        blob.set("title", "Our First Night");
        blob.set("circle-percent", 85.0);
        blob.set("border-width", 3.5);
        blob.set("combined-view", true);
        blob.set("show-border", false);
        blob.set("zip", "02139");
        blob.save(&store, &user).unwrap();

        let loaded = SettingsBlob::load(&store, &user).unwrap();
        assert_eq!(loaded, blob);
        assert_eq!(loaded.get("zip"), Some(&SettingValue::Text("02139".into())));
        assert_eq!(loaded.get("combined-view"), Some(&SettingValue::Flag(true)));
        assert_eq!(loaded.get("circle-percent"), Some(&SettingValue::Number(85.0)));
    }

    #[test]
    fn test_blob_stored_under_user_key() {
        let store = MemoryStore::new();
        SettingsBlob::new().save(&store, &UserId::new("bob")).unwrap();
        assert!(store.get_item("bob_app_settings").is_some());
        assert!(SettingsBlob::load(&store, &UserId::new("carol")).is_none());
    }

    #[test]
    fn test_malformed_blob_is_empty() {
        let store = MemoryStore::new();
        let user = UserId::guest();
        store.set_item("guest_app_settings", "[1, 2").unwrap();
        assert!(SettingsBlob::load(&store, &user).is_none());
        assert_eq!(PosterSettings::load(&store, &user), PosterSettings::default());
    }

    #[test]
    fn test_setting_value_coercion() {
        assert_eq!(SettingValue::from("42").as_number(), Some(42.0));
        assert_eq!(SettingValue::from("abc").as_number(), None);
        assert_eq!(SettingValue::from("on").as_flag(), Some(true));
        assert_eq!(SettingValue::from(0.0).as_flag(), Some(false));
        assert_eq!(SettingValue::from(true).as_text(), None);
    }

    #[test]
    fn test_poster_settings_round_trip() {
        let store = MemoryStore::new();
        let user = UserId::new("dana");

        let settings = PosterSettings {
            circle_percent: 75.0,
            zoom: 2.5,
            combined_view: true,
            layout: LayoutMode::Portrait,
            overlap_percent: 20.0,
            show_border: false,
            border_width: 6.0,
            background_color: HexColor::new(10, 20, 30),
            border_color: HexColor::new(200, 180, 90),
            text_color: HexColor::new(250, 250, 240),
            font: FontChoice::GreatVibes,
            title: "Under These Stars".into(),
            subtitle: "Boston, MA".into(),
        };
        settings.save(&store, &user).unwrap();

        assert_eq!(PosterSettings::load(&store, &user), settings);
    }

    #[test]
    fn test_save_keeps_unknown_fields() {
        let store = MemoryStore::new();
        let user = UserId::guest();
        let mut blob = SettingsBlob::new();
        blob.set("date", "2024-06-01");
        blob.save(&store, &user).unwrap();

        PosterSettings::default().save(&store, &user).unwrap();
        let stored = SettingsBlob::load(&store, &user).unwrap();
        assert_eq!(stored.text("date"), Some("2024-06-01"));
        assert_eq!(stored.number(fields::CIRCLE_PERCENT), Some(DEFAULT_CIRCLE_PERCENT));
    }

    #[test]
    fn test_from_blob_clamps_and_ignores_garbage() {
        let mut blob = SettingsBlob::new();
        blob.set(fields::ZOOM, 40.0);
        blob.set(fields::OVERLAP, "75");
        blob.set(fields::CIRCLE_PERCENT, "lots");
        blob.set(fields::BORDER_COLOR, "#zzz");
        blob.set(fields::FONT_FAMILY, "Wingdings");

        let settings = PosterSettings::from_blob(&blob);
        assert_eq!(settings.zoom, MAX_ZOOM);
        assert_eq!(settings.overlap_percent, MAX_OVERLAP_PERCENT);
        assert_eq!(settings.circle_percent, DEFAULT_CIRCLE_PERCENT);
        assert_eq!(settings.border_color, HexColor::WHITE);
        assert_eq!(settings.font, FontChoice::Montserrat);
    }

    #[test]
    fn test_to_blob_covers_known_fields() {
        let blob = PosterSettings::default().to_blob();
        for (field, _) in blob.iter() {
            assert!(fields::ALL.contains(&field), "{field} missing from fields::ALL");
        }
        assert_eq!(blob.len(), 13);
    }

    #[test]
    fn test_caption_lines_and_border() {
        let mut settings = PosterSettings {
            title: "  ".into(),
            subtitle: "42.36 N, 71.06 W".into(),
            ..Default::default()
        };
        assert_eq!(settings.caption_lines(), vec!["42.36 N, 71.06 W"]);
        assert_eq!(settings.effective_border_width(), DEFAULT_BORDER_WIDTH);
        settings.show_border = false;
        assert_eq!(settings.effective_border_width(), 0.0);
    }

    #[test]
    fn test_non_finite_save_keeps_other_fields() {
        let store = MemoryStore::new();
        let user = UserId::new("erin");
        let mut blob = SettingsBlob::new();
        blob.set(fields::DATE, "2024-06-01");
        blob.set(fields::TITLE, "Keep me");
        blob.save(&store, &user).unwrap();

        let settings = PosterSettings {
            zoom: f64::NAN,
            border_width: f64::INFINITY,
            title: "Keep me".into(),
            ..Default::default()
        };
        settings.save(&store, &user).unwrap();

        let stored = SettingsBlob::load(&store, &user).unwrap();
        assert_eq!(stored.text(fields::DATE), Some("2024-06-01"));
        assert_eq!(stored.text(fields::TITLE), Some("Keep me"));
        assert_eq!(stored.number(fields::ZOOM), Some(DEFAULT_ZOOM));
        assert_eq!(stored.number(fields::BORDER_WIDTH), Some(MAX_BORDER_WIDTH));
    }

    #[test]
    fn test_set_non_finite_clears_field() {
        let mut blob = SettingsBlob::new();
        blob.set(fields::ZOOM, 2.0);
        blob.set(fields::ZOOM, f64::NAN);
        assert!(blob.get(fields::ZOOM).is_none());
        assert!(!serde_json::to_string(&blob).unwrap().contains("null"));
    }

    #[test]
    fn test_unreadable_field_does_not_void_blob() {
        let store = MemoryStore::new();
        let user = UserId::guest();
        store
            .set_item("guest_app_settings", r#"{"date":"2024-06-01","zoom":null,"overlap":[1]}"#)
            .unwrap();

        let blob = SettingsBlob::load(&store, &user).unwrap();
        assert_eq!(blob.len(), 1);
        assert_eq!(blob.text(fields::DATE), Some("2024-06-01"));
        assert_eq!(PosterSettings::load(&store, &user).zoom, DEFAULT_ZOOM);
    }

    #[test]
    fn test_cleared_number_input_overrides_stored_value() {
        assert_eq!(SettingValue::from_number_input(" 3.5 "), SettingValue::Number(3.5));
        assert_eq!(SettingValue::from_number_input("NaN"), SettingValue::Text(String::new()));

        let mut stored = SettingsBlob::new();
        stored.set(fields::BORDER_WIDTH, 12.0);
        let mut form = SettingsBlob::new();
        form.set(fields::BORDER_WIDTH, SettingValue::from_number_input(""));
        stored.merge(&form);

        assert_eq!(stored.number(fields::BORDER_WIDTH), None);
        assert_eq!(
            PosterSettings::from_blob(&stored).border_width,
            DEFAULT_BORDER_WIDTH
        );
    }
}
