//! Theme registry: named palettes with semantic slots, contrast helpers and
//! propagation of the current theme to the document root.

use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::color::{self, Rgb};
use crate::dom::Document;
use crate::error::{ChartError, Result};

/// Event emitted on the document after the current theme changes.
pub const THEME_CHANGED_EVENT: &str = "chartThemeChanged";

/// Palette every other palette falls back to.
pub const PRIMARY: &str = "primary";

/// Microsoft Office (2013+) series palette: blue, orange, gray, gold, light blue,
/// green, dark blue, dark orange, dark gray, brownish gold.
const OFFICE10: [&str; 10] = [
    "#4472c4", "#ed7d31", "#a5a5a5", "#ffc000", "#5b9bd5", "#70ad47", "#264478", "#9e480e",
    "#636363", "#997300",
];

const SEVERITY: [&str; 5] = ["#dc3545", "#fd7e14", "#ffc107", "#28a745", "#17a2b8"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    #[serde(default)]
    pub name: String,
    pub background: String,
    pub text: String,
    pub grid: String,
    pub accent: String,
    /// Named palettes; `primary` is required.
    pub colors: IndexMap<String, Vec<String>>,
}

impl Theme {
    /// Palette `category`, or `primary` when the theme does not define it.
    pub fn palette(&self, category: &str) -> &[String] {
        self.colors
            .get(category)
            .filter(|p| !p.is_empty())
            .or_else(|| self.colors.get(PRIMARY))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Color `index` of `category`, wrapping around the palette.
    pub fn color(&self, index: usize, category: &str) -> String {
        let palette = self.palette(category);
        if palette.is_empty() {
            return self.accent.clone();
        }
        palette[index % palette.len()].clone()
    }

    /// CSS custom properties written to the document root.
    pub fn css_properties(&self) -> BTreeMap<String, String> {
        let mut props = BTreeMap::new();
        props.insert("--chart-bg-color".to_string(), self.background.clone());
        props.insert("--chart-text-color".to_string(), self.text.clone());
        props.insert("--chart-grid-color".to_string(), self.grid.clone());
        props.insert("--chart-accent-color".to_string(), self.accent.clone());
        for (i, c) in self.palette(PRIMARY).iter().enumerate() {
            props.insert(format!("--chart-color-{i}"), c.clone());
        }
        props
    }

    fn validate(&self) -> Result<()> {
        if self.palette(PRIMARY).is_empty() || !self.colors.contains_key(PRIMARY) {
            return Err(ChartError::invalid_option(
                "colors.primary",
                format!("theme `{}` needs a non-empty primary palette", self.name),
            ));
        }
        let slots = [
            ("background", &self.background),
            ("text", &self.text),
            ("grid", &self.grid),
            ("accent", &self.accent),
        ];
        for (slot, value) in slots {
            parse_color(slot, value)?;
        }
        for (palette, values) in &self.colors {
            for v in values {
                parse_color(&format!("colors.{palette}"), v)?;
            }
        }
        Ok(())
    }
}

fn parse_color(option: &str, value: &str) -> Result<Rgb> {
    Rgb::parse(value).ok_or_else(|| ChartError::invalid_option(option, format!("unparsable color `{value}`")))
}

fn palette(colors: &[&str]) -> Vec<String> {
    colors.iter().map(|c| c.to_string()).collect()
}

fn builtin(name: &str, slots: [&str; 4], primary: &[&str], sequential: &[&str], diverging: &[&str]) -> Theme {
    let mut colors = IndexMap::new();
    colors.insert(PRIMARY.to_string(), palette(primary));
    colors.insert("categorical".to_string(), palette(primary));
    colors.insert("sequential".to_string(), palette(sequential));
    colors.insert("diverging".to_string(), palette(diverging));
    colors.insert("severity".to_string(), palette(&SEVERITY));
    Theme {
        name: name.to_string(),
        background: slots[0].to_string(),
        text: slots[1].to_string(),
        grid: slots[2].to_string(),
        accent: slots[3].to_string(),
        colors,
    }
}

/// The four themes every registry starts with.
pub fn builtin_themes() -> Vec<Theme> {
    vec![
        builtin(
            "default",
            ["#ffffff", "#333333", "#e0e0e0", "#4472c4"],
            &OFFICE10,
            &["#deebf7", "#9ecae1", "#4292c6", "#08519c"],
            &["#d73027", "#fc8d59", "#fee090", "#91bfdb", "#4575b4"],
        ),
        builtin(
            "dark",
            ["#1e1e1e", "#e0e0e0", "#444444", "#4fc3f7"],
            &[
                "#4fc3f7", "#ffb74d", "#81c784", "#e57373", "#ba68c8", "#fff176", "#4db6ac",
                "#f06292",
            ],
            &["#1a2a3a", "#1f4e79", "#2e75b6", "#9dc3e6"],
            &["#e57373", "#ffb74d", "#fff176", "#81c784", "#4fc3f7"],
        ),
        builtin(
            "security-focus",
            ["#0d1117", "#c9d1d9", "#30363d", "#f85149"],
            &[
                "#f85149", "#d29922", "#3fb950", "#58a6ff", "#bc8cff", "#39c5cf", "#ff7b72",
                "#ffa657",
            ],
            &["#3d0c0c", "#8b1a1a", "#da3633", "#ff7b72"],
            &["#f85149", "#d29922", "#8b949e", "#3fb950", "#58a6ff"],
        ),
        builtin(
            "minimal",
            ["#ffffff", "#222222", "#f0f0f0", "#555555"],
            &["#333333", "#666666", "#999999", "#bbbbbb", "#4472c4", "#a5a5a5"],
            &["#f0f0f0", "#bbbbbb", "#777777", "#333333"],
            &["#555555", "#999999", "#dddddd", "#999999", "#555555"],
        ),
    ]
}

/// Named themes plus the current selection.
///
/// The registry is the only writer of the theme custom properties and the
/// `theme-*` body class of its document.
pub struct ThemeRegistry {
    document: Rc<Document>,
    themes: RefCell<IndexMap<String, Theme>>,
    current: RefCell<String>,
}

impl ThemeRegistry {
    pub fn new(document: Rc<Document>) -> Self {
        let themes = builtin_themes()
            .into_iter()
            .map(|t| (t.name.clone(), t))
            .collect();
        Self {
            document,
            themes: RefCell::new(themes),
            current: RefCell::new("default".to_string()),
        }
    }

    pub fn document(&self) -> &Rc<Document> {
        &self.document
    }

    /// Add or replace a theme. Colors are validated; missing semantic palettes fall back to `primary`.
    pub fn register(&self, name: &str, mut theme: Theme) -> Result<()> {
        theme.name = name.to_string();
        theme.validate()?;
        debug!("registering theme `{name}`");
        self.themes.borrow_mut().insert(name.to_string(), theme);
        Ok(())
    }

    /// Register a theme given as JSON.
    pub fn register_json(&self, name: &str, theme: &Value) -> Result<()> {
        if theme.pointer("/colors/primary").is_none() {
            return Err(ChartError::invalid_option(
                "colors.primary",
                format!("theme `{name}` has no primary palette"),
            ));
        }
        let theme: Theme = serde_json::from_value(theme.clone())
            .map_err(|e| ChartError::invalid_option("theme", e.to_string()))?;
        self.register(name, theme)
    }

    /// Make `name` current: write CSS properties, swap the body class and emit
    /// `chartThemeChanged`. Unknown names change nothing.
    pub fn set_current(&self, name: &str) -> bool {
        let Some(theme) = self.themes.borrow().get(name).cloned() else {
            return false;
        };
        *self.current.borrow_mut() = name.to_string();
        let props = theme.css_properties();
        self.document.clear_root_properties("--chart-color-");
        for (k, v) in &props {
            self.document.set_root_property(k, v.clone());
        }
        self.document.swap_body_class("theme-", &format!("theme-{name}"));
        debug!("theme changed to `{name}`");
        self.document
            .events()
            .emit(THEME_CHANGED_EVENT, json!({ "theme": name, "properties": props }));
        true
    }

    pub fn current_name(&self) -> String {
        self.current.borrow().clone()
    }

    /// Theme `name`, or the current theme when `name` is `None` or unknown.
    pub fn get(&self, name: Option<&str>) -> Theme {
        let themes = self.themes.borrow();
        name.and_then(|n| themes.get(n))
            .or_else(|| themes.get(self.current.borrow().as_str()))
            .or_else(|| themes.get("default"))
            .cloned()
            .unwrap_or_else(|| builtin_themes().remove(0))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.themes.borrow().contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.themes.borrow().keys().cloned().collect()
    }

    /// Color `index` from palette `category` of the current theme.
    pub fn get_color(&self, index: usize, category: &str) -> String {
        self.get(None).color(index, category)
    }

    /// `steps` hex colors from `from` to `to`.
    pub fn generate_gradient(&self, from: &str, to: &str, steps: usize) -> Result<Vec<String>> {
        let (a, b) = (parse_color("from", from)?, parse_color("to", to)?);
        Ok(color::gradient(a, b, steps).into_iter().map(Rgb::to_hex).collect())
    }

    /// Colors of the current theme readable on `background` (contrast ≥ 4.5).
    pub fn accessible_colors(&self, background: &str) -> Result<Vec<String>> {
        let bg = parse_color("background", background)?;
        let theme = self.get(None);
        let mut out: Vec<String> = Vec::new();
        for c in theme.colors.values().flatten() {
            if out.contains(c) {
                continue;
            }
            if Rgb::parse(c).is_some_and(|rgb| color::contrast_ratio(rgb, bg) >= 4.5) {
                out.push(c.clone());
            }
        }
        Ok(out)
    }

    pub fn contrast_ratio(&self, a: &str, b: &str) -> Result<f64> {
        Ok(color::contrast_ratio(parse_color("a", a)?, parse_color("b", b)?))
    }

    /// `#000000` or `#ffffff`, whichever reads better on `background`.
    pub fn contrasting_text_color(&self, background: &str) -> Result<String> {
        Ok(color::contrasting_text(parse_color("background", background)?).to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ThemeRegistry {
        ThemeRegistry::new(Rc::new(Document::default()))
    }

    #[test]
    fn builtins_are_registered() {
        let r = registry();
        assert_eq!(r.names(), vec!["default", "dark", "security-focus", "minimal"]);
        assert_eq!(r.get_color(10, PRIMARY), r.get_color(0, PRIMARY));
    }

    #[test]
    fn missing_semantic_palette_falls_back_to_primary() {
        let r = registry();
        let theme: Theme = serde_json::from_value(json!({
            "background": "#fff", "text": "#000", "grid": "#eee", "accent": "red",
            "colors": {"primary": ["#111111", "#222222"]}
        }))
        .unwrap();
        r.register("mono", theme).unwrap();
        assert_eq!(r.get(Some("mono")).color(1, "sequential"), "#222222");
    }

    #[test]
    fn theme_without_primary_is_rejected() {
        let r = registry();
        let err = r
            .register_json("bad", &json!({"background": "#fff", "text": "#000", "grid": "#eee", "accent": "red", "colors": {}}))
            .unwrap_err();
        assert!(matches!(err, ChartError::InvalidOptions { .. }));
        assert!(!r.contains("bad"));
    }

    #[test]
    fn unparsable_color_is_rejected() {
        let r = registry();
        let mut t = r.get(None);
        t.accent = "not-a-color".into();
        assert!(r.register("broken", t).is_err());
    }

    #[test]
    fn set_current_updates_document() {
        let r = registry();
        assert!(r.set_current("dark"));
        let doc = r.document();
        assert_eq!(doc.root_property("--chart-bg-color").as_deref(), Some("#1e1e1e"));
        assert_eq!(doc.root_property("--chart-color-0").as_deref(), Some("#4fc3f7"));
        assert!(doc.body_has_class("theme-dark"));
        assert!(r.set_current("minimal"));
        assert!(!doc.body_has_class("theme-dark"));
        assert!(doc.root_property("--chart-color-7").is_none());
        assert_eq!(doc.events().events_named(THEME_CHANGED_EVENT).len(), 2);
        assert!(!r.set_current("nope"));
        assert_eq!(r.current_name(), "minimal");
    }

    #[test]
    fn accessible_colors_meet_aa() {
        let r = registry();
        let colors = r.accessible_colors("#ffffff").unwrap();
        assert!(!colors.is_empty());
        for c in &colors {
            assert!(r.contrast_ratio(c, "#ffffff").unwrap() >= 4.5);
        }
        assert_eq!(r.contrasting_text_color("#1e1e1e").unwrap(), "#ffffff");
    }
}
