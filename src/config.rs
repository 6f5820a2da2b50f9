//! Application configuration.
//!
//! Handles loading, validating, and merging `config.toml`. Stock defaults are
//! the base layer; a user `config.toml` in the config directory overrides any
//! subset of keys.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [site]
//! origin = "https://marketeraffirmations.com"
//! title = "Marketer Affirmations"
//! attribution = "Marketer Affirmations"
//! footer = "marketeraffirmations.com"
//!
//! [content]
//! source = "affirmations.json"  # file path or http(s) URL
//!
//! [card]
//! width = 1080
//! height = 1350
//! margin = 90                   # distance from surface edge to card panel
//! radius = 28
//! base_color = "#0f1212"
//! fallback_background = "#111315"
//! panel_color = "#ffffff"
//! kicker_color = "#201a15"
//! quote_color = "#141516"
//! footer_color = "#000000"
//!
//! [text]
//! serif_family = "Playfair Display"
//! sans_family = "Inter"
//! min_size = 28
//! max_size = 64
//! line_height = 1.23           # multiple of the font size
//!
//! [assets]
//! background = "graphics/bg-1920.webp"
//! sticker = "graphics/sticker.png"
//! fonts = []                   # extra .ttf/.otf files loaded before painting
//!
//! [tracking]
//! enabled = true
//! endpoint = "http://127.0.0.1:8787/api/track"
//!
//! [server]
//! bind = "127.0.0.1:8787"
//! database = "counters.db"
//!
//! [session]
//! not_found_delay_ms = 1500
//! state_file = ".affirm-card-state.json"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::card::CardStyle;
use crate::card::calculations::CardLayout;
use crate::card::params::Rgba;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Application configuration loaded from `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub site: SiteConfig,
    pub content: ContentConfig,
    pub card: CardConfig,
    pub text: TextConfig,
    pub assets: AssetsConfig,
    pub tracking: TrackingConfig,
    pub server: ServerConfig,
    pub session: SessionConfig,
}

impl AppConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.card.width < 200 || self.card.height < 200 {
            return Err(ConfigError::Validation(
                "card.width and card.height must be at least 200".into(),
            ));
        }
        if self.card.margin * 2 >= self.card.width.min(self.card.height) {
            return Err(ConfigError::Validation(
                "card.margin leaves no room for the card panel".into(),
            ));
        }
        if self.text.min_size == 0 || self.text.min_size > self.text.max_size {
            return Err(ConfigError::Validation(
                "text.min_size must be non-zero and <= text.max_size".into(),
            ));
        }
        if !(1.0..=3.0).contains(&self.text.line_height) {
            return Err(ConfigError::Validation(
                "text.line_height must be between 1.0 and 3.0".into(),
            ));
        }
        let style = CardStyle::from_config(self);
        let text_area = CardLayout::compute((style.width, style.height), &style.geometry).text_area;
        let min_line = self.text.min_size as f32 * self.text.line_height;
        if text_area.height < min_line {
            return Err(ConfigError::Validation(format!(
                "card is too small for text: {:.0}px between kicker and footer, \
                 one line at text.min_size needs {min_line:.0}px",
                text_area.height
            )));
        }
        for (key, value) in self.card.colors() {
            if Rgba::parse_hex(value).is_none() {
                return Err(ConfigError::Validation(format!(
                    "card.{key} is not a #rgb or #rrggbb color: {value}"
                )));
            }
        }
        if self.site.origin.ends_with('/') {
            return Err(ConfigError::Validation(
                "site.origin must not end with '/'".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Scheme + host that permalinks are built on.
    pub origin: String,
    /// Title used for native share sheets.
    pub title: String,
    /// Attribution appended to copied captions.
    pub attribution: String,
    /// Footer text drawn at the bottom of every card.
    pub footer: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            origin: "https://marketeraffirmations.com".to_string(),
            title: "Marketer Affirmations".to_string(),
            attribution: "Marketer Affirmations".to_string(),
            footer: "marketeraffirmations.com".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContentConfig {
    /// File path or `http(s)://` URL of the affirmations JSON document.
    pub source: String,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            source: "affirmations.json".to_string(),
        }
    }
}

impl ContentConfig {
    /// The source with a relative file path resolved against `base`. URLs
    /// are returned unchanged.
    pub fn resolved_source(&self, base: &Path) -> String {
        let source = self.source.as_str();
        if source.starts_with("http://") || source.starts_with("https://") {
            return source.to_string();
        }
        let path = Path::new(source);
        if path.is_absolute() {
            source.to_string()
        } else {
            base.join(path).to_string_lossy().into_owned()
        }
    }
}

/// Card geometry and palette.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CardConfig {
    pub width: u32,
    pub height: u32,
    pub margin: u32,
    pub radius: u32,
    pub base_color: String,
    /// Flat fill used when the background image cannot be loaded.
    pub fallback_background: String,
    pub panel_color: String,
    pub kicker_color: String,
    pub quote_color: String,
    pub footer_color: String,
}

impl CardConfig {
    fn colors(&self) -> [(&'static str, &str); 6] {
        [
            ("base_color", &self.base_color),
            ("fallback_background", &self.fallback_background),
            ("panel_color", &self.panel_color),
            ("kicker_color", &self.kicker_color),
            ("quote_color", &self.quote_color),
            ("footer_color", &self.footer_color),
        ]
    }
}

impl Default for CardConfig {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1350,
            margin: 90,
            radius: 28,
            base_color: "#0f1212".to_string(),
            fallback_background: "#111315".to_string(),
            panel_color: "#ffffff".to_string(),
            kicker_color: "#201a15".to_string(),
            quote_color: "#141516".to_string(),
            footer_color: "#000000".to_string(),
        }
    }
}

/// Quote typography.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TextConfig {
    pub serif_family: String,
    pub sans_family: String,
    /// Smallest font size auto-fit may choose (px).
    pub min_size: u32,
    /// Largest font size auto-fit may choose (px).
    pub max_size: u32,
    /// Line height as a multiple of the font size.
    pub line_height: f32,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            serif_family: "Playfair Display".to_string(),
            sans_family: "Inter".to_string(),
            min_size: 28,
            max_size: 64,
            line_height: 1.23,
        }
    }
}

/// Image and font assets. Relative paths resolve against the config directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AssetsConfig {
    pub background: Option<PathBuf>,
    pub sticker: Option<PathBuf>,
    pub fonts: Vec<PathBuf>,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            background: Some(PathBuf::from("graphics/bg-1920.webp")),
            sticker: Some(PathBuf::from("graphics/sticker.png")),
            fonts: Vec::new(),
        }
    }
}

impl AssetsConfig {
    /// Resolve every asset path against `base`, leaving absolute paths alone.
    pub fn resolved(&self, base: &Path) -> AssetsConfig {
        let resolve = |p: &PathBuf| {
            if p.is_absolute() {
                p.clone()
            } else {
                base.join(p)
            }
        };
        AssetsConfig {
            background: self.background.as_ref().map(resolve),
            sticker: self.sticker.as_ref().map(resolve),
            fonts: self.fonts.iter().map(resolve).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrackingConfig {
    pub enabled: bool,
    pub endpoint: String,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "http://127.0.0.1:8787/api/track".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind: String,
    pub database: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8787".to_string(),
            database: PathBuf::from("counters.db"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// How long the "not found" placeholder stays up before a fresh pick.
    pub not_found_delay_ms: u64,
    /// Where the affirm-button click count is persisted between sessions.
    pub state_file: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            not_found_delay_ms: 1500,
            state_file: PathBuf::from(".affirm-card-state.json"),
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(AppConfig::default())
        .map_err(|e| ConfigError::Validation(format!("default config must serialize: {e}")))
}

/// Recursively merge `overlay` on top of `base`.
///
/// Tables merge key-by-key; any other overlay value replaces the base value.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join("config.toml");
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<AppConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: AppConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `config.toml` in the given directory, on top of defaults.
pub fn load_config(dir: &Path) -> Result<AppConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(dir)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `config.toml`. Printed by `gen-config`.
pub fn stock_config_toml() -> &'static str {
    r##"# affirm-card configuration
# ==========================
# All settings are optional. Values shown below are the defaults.
# Unknown keys cause an error.

# ---------------------------------------------------------------------------
# Site identity (permalinks, captions, card footer)
# ---------------------------------------------------------------------------
[site]
origin = "https://marketeraffirmations.com"
title = "Marketer Affirmations"
attribution = "Marketer Affirmations"
footer = "marketeraffirmations.com"

# ---------------------------------------------------------------------------
# Content source: a JSON array of { id?, tags?, text } records.
# May be a file path (relative to this directory) or an http(s) URL.
# ---------------------------------------------------------------------------
[content]
source = "affirmations.json"

# ---------------------------------------------------------------------------
# Card geometry (px) and palette (#rgb or #rrggbb)
# ---------------------------------------------------------------------------
[card]
width = 1080
height = 1350
margin = 90
radius = 28
base_color = "#0f1212"
fallback_background = "#111315"
panel_color = "#ffffff"
kicker_color = "#201a15"
quote_color = "#141516"
footer_color = "#000000"

# ---------------------------------------------------------------------------
# Typography. The quote is auto-fit between min_size and max_size.
# ---------------------------------------------------------------------------
[text]
serif_family = "Playfair Display"
sans_family = "Inter"
min_size = 28
max_size = 64
line_height = 1.23

# ---------------------------------------------------------------------------
# Assets. Missing files degrade to flat colors and generic fonts.
# ---------------------------------------------------------------------------
[assets]
background = "graphics/bg-1920.webp"
sticker = "graphics/sticker.png"
fonts = []

# ---------------------------------------------------------------------------
# Engagement reporting (fire-and-forget)
# ---------------------------------------------------------------------------
[tracking]
enabled = true
endpoint = "http://127.0.0.1:8787/api/track"

# ---------------------------------------------------------------------------
# Counter API server
# ---------------------------------------------------------------------------
[server]
bind = "127.0.0.1:8787"
database = "counters.db"

# ---------------------------------------------------------------------------
# Interactive session
# ---------------------------------------------------------------------------
[session]
not_found_delay_ms = 1500
state_file = ".affirm-card-state.json"
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_is_valid() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn parse_partial_config() {
        let toml = r##"
[card]
panel_color = "#fafafa"
"##;
        let config: AppConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.card.panel_color, "#fafafa");
        assert_eq!(config.card.width, 1080);
        assert_eq!(config.text.max_size, 64);
    }

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.site.footer, "marketeraffirmations.com");
        assert_eq!(config.server.bind, "127.0.0.1:8787");
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("config.toml"),
            r#"
[site]
origin = "https://example.test"

[text]
min_size = 20
"#,
        )
        .unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.site.origin, "https://example.test");
        assert_eq!(config.text.min_size, 20);
        assert_eq!(config.text.max_size, 64);
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("config.toml"), "not valid [[[").unwrap();
        assert!(matches!(load_config(tmp.path()), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn unknown_key_rejected() {
        let result: Result<AppConfig, _> = toml::from_str("[card]\nwidht = 10\n");
        assert!(result.unwrap_err().to_string().contains("unknown field"));
    }

    #[test]
    fn unknown_section_rejected() {
        let result: Result<AppConfig, _> = toml::from_str("[cards]\nwidth = 10\n");
        assert!(result.is_err());
    }

    #[test]
    fn validate_font_bounds() {
        let mut config = AppConfig::default();
        config.text.min_size = 70;
        assert!(config.validate().is_err());
        config.text.min_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_margin_leaves_room() {
        let mut config = AppConfig::default();
        config.card.margin = 540;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_card_too_small_for_one_line() {
        let mut config = AppConfig::default();
        config.card.width = 400;
        config.card.height = 400;
        config.card.margin = 90;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("too small for text"));

        config.card.height = 700;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_colors() {
        let mut config = AppConfig::default();
        config.card.quote_color = "black".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("quote_color"));
    }

    #[test]
    fn validate_origin_has_no_trailing_slash() {
        let mut config = AppConfig::default();
        config.site.origin = "https://example.test/".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_config_validates_values() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("config.toml"),
            "[text]\nline_height = 9.0\n",
        )
        .unwrap();
        assert!(matches!(
            load_config(tmp.path()),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn merge_toml_deep_nested() {
        let base: toml::Value = toml::from_str("[card]\nwidth = 1\nheight = 2\n").unwrap();
        let overlay: toml::Value = toml::from_str("[card]\nwidth = 10\n").unwrap();
        let merged = merge_toml(base, overlay);
        let card = merged.get("card").unwrap();
        assert_eq!(card.get("width").unwrap().as_integer(), Some(10));
        assert_eq!(card.get("height").unwrap().as_integer(), Some(2));
    }

    #[test]
    fn assets_resolve_relative_to_base() {
        let assets = AssetsConfig {
            background: Some(PathBuf::from("bg.png")),
            sticker: None,
            fonts: vec![PathBuf::from("/abs/font.ttf")],
        };
        let resolved = assets.resolved(Path::new("/site"));
        assert_eq!(resolved.background, Some(PathBuf::from("/site/bg.png")));
        assert_eq!(resolved.sticker, None);
        assert_eq!(resolved.fonts, vec![PathBuf::from("/abs/font.ttf")]);
    }

    #[test]
    fn content_source_resolves_paths_not_urls() {
        let base = Path::new("/site");
        let source = |s: &str| ContentConfig { source: s.into() }.resolved_source(base);
        assert_eq!(source("affirmations.json"), "/site/affirmations.json");
        assert_eq!(source("/data/a.json"), "/data/a.json");
        assert_eq!(
            source("https://example.com/a.json"),
            "https://example.com/a.json"
        );
    }

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let config: AppConfig = toml::from_str(stock_config_toml()).unwrap();
        let defaults = AppConfig::default();
        assert_eq!(config.card.width, defaults.card.width);
        assert_eq!(config.text.line_height, defaults.text.line_height);
        assert_eq!(config.site.origin, defaults.site.origin);
        assert_eq!(config.session.not_found_delay_ms, 1500);
        assert!(config.assets.fonts.is_empty());
    }

    #[test]
    fn stock_defaults_value_has_all_sections() {
        let val = stock_defaults_value().unwrap();
        for section in ["site", "content", "card", "text", "tracking", "server", "session"] {
            assert!(val.get(section).is_some(), "missing [{section}]");
        }
    }
}
