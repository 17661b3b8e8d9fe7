//! Process-wide settings for the CLI and embedding hosts.
//!
//! Lookup order: an explicit `--config` file, else
//! `<config dir>/trace-charts/settings.json` when it exists, else defaults.
//! `TRACE_CHARTS_THEME`, `TRACE_CHARTS_WIDTH`, `TRACE_CHARTS_HEIGHT`,
//! `TRACE_CHARTS_LOCALE` and `TRACE_CHARTS_FONT` override the file.

use indexmap::IndexMap;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ChartError, Result};
use crate::viz::base::ChartEnv;
use crate::viz::options::deep_merge;
use crate::viz::raster;

pub const ENV_PREFIX: &str = "TRACE_CHARTS_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Theme made current before charts are created.
    pub theme: Option<String>,
    pub width: f64,
    pub height: f64,
    pub locale: String,
    /// TTF/OTF file used to rasterize text in image exports.
    pub font_path: Option<PathBuf>,
    /// Extra themes, registered by name.
    pub themes: IndexMap<String, Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: None,
            width: 800.0,
            height: 500.0,
            locale: "en".to_string(),
            font_path: None,
            themes: IndexMap::new(),
        }
    }
}

impl Settings {
    /// `<config dir>/trace-charts/settings.json`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("trace-charts").join("settings.json"))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let settings = serde_json::from_str(&text)?;
        debug!("loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Resolve settings from `explicit`, the default location and the environment.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut settings = match explicit {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path().filter(|p| p.is_file()) {
                Some(path) => Self::from_file(&path)?,
                None => Self::default(),
            },
        };
        settings.apply_overrides(|key| std::env::var(key).ok());
        Ok(settings)
    }

    /// Apply `TRACE_CHARTS_*` values from `lookup`. Unparsable numbers are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}")).filter(|v| !v.trim().is_empty());
        if let Some(theme) = var("THEME") {
            self.theme = Some(theme);
        }
        for (name, slot) in [("WIDTH", &mut self.width), ("HEIGHT", &mut self.height)] {
            if let Some(raw) = var(name) {
                match raw.trim().parse::<f64>() {
                    Ok(v) if v > 0.0 => *slot = v,
                    _ => warn!("{ENV_PREFIX}{name}=`{raw}` is not a positive number; keeping {slot}"),
                }
            }
        }
        if let Some(locale) = var("LOCALE") {
            self.locale = locale;
        }
        if let Some(font) = var("FONT") {
            self.font_path = Some(PathBuf::from(font));
        }
    }

    /// Chart options with these settings underneath `overrides`.
    pub fn chart_options(&self, overrides: &Value) -> Value {
        let mut options = json!({
            "width": self.width,
            "height": self.height,
            "locale": self.locale,
        });
        if let Some(theme) = &self.theme {
            options["theme"] = json!(theme);
        }
        deep_merge(&mut options, overrides);
        options
    }

    /// Register extra themes and the font, then switch to the configured theme.
    pub fn apply(&self, env: &ChartEnv) -> Result<()> {
        for (name, theme) in &self.themes {
            env.themes.register_json(name, theme)?;
        }
        if let Some(font) = &self.font_path {
            raster::register_font_file(font)?;
        }
        if let Some(theme) = &self.theme {
            if !env.themes.set_current(theme) {
                return Err(ChartError::invalid_option("theme", format!("unknown theme `{theme}`")));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn file_values_fill_missing_fields_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"theme": "dark", "width": 1024}"#).unwrap();
        let s = Settings::from_file(&path).unwrap();
        assert_eq!(s.theme.as_deref(), Some("dark"));
        assert_eq!(s.width, 1024.0);
        assert_eq!(s.height, 500.0);
        assert_eq!(s.locale, "en");
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let err = Settings::load(Some(Path::new("/nonexistent/trace-charts.json"))).unwrap_err();
        assert!(matches!(err, ChartError::Io(_)));
    }

    #[test]
    fn environment_overrides() {
        let env: HashMap<&str, &str> = [
            ("TRACE_CHARTS_THEME", "minimal"),
            ("TRACE_CHARTS_WIDTH", "640"),
            ("TRACE_CHARTS_HEIGHT", "-3"),
            ("TRACE_CHARTS_LOCALE", "de"),
        ]
        .into_iter()
        .collect();
        let mut s = Settings::default();
        s.apply_overrides(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(s.theme.as_deref(), Some("minimal"));
        assert_eq!(s.width, 640.0);
        assert_eq!(s.height, 500.0);
        assert_eq!(s.locale, "de");
    }

    #[test]
    fn chart_options_yield_to_explicit_values() {
        let s = Settings {
            theme: Some("dark".into()),
            ..Settings::default()
        };
        let merged = s.chart_options(&json!({"width": 300, "title": "IO"}));
        assert_eq!(merged["width"], 300);
        assert_eq!(merged["height"], 500.0);
        assert_eq!(merged["theme"], "dark");
        assert_eq!(merged["title"], "IO");
    }

    #[test]
    fn apply_switches_theme_and_rejects_unknown() {
        let env = ChartEnv::default();
        let ok = Settings {
            theme: Some("security-focus".into()),
            ..Settings::default()
        };
        ok.apply(&env).unwrap();
        assert_eq!(env.themes.current_name(), "security-focus");
        let bad = Settings {
            theme: Some("neon".into()),
            ..Settings::default()
        };
        assert!(bad.apply(&env).is_err());
    }
}
