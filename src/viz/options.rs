//! Chart options: common records, deep merge over defaults and lenient enum parsing.

use log::warn;
use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::anim::Easing;
use super::types::LegendPosition;
use crate::error::{ChartError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Margin {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Default for Margin {
    fn default() -> Self {
        Self {
            top: 40.0,
            right: 20.0,
            bottom: 40.0,
            left: 50.0,
        }
    }
}

impl Margin {
    pub const fn new(top: f64, right: f64, bottom: f64, left: f64) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnimationOptions {
    #[serde(alias = "duration")]
    pub duration_ms: f64,
    #[serde(deserialize_with = "lenient")]
    pub easing: Easing,
}

impl Default for AnimationOptions {
    fn default() -> Self {
        Self {
            duration_ms: 750.0,
            easing: Easing::CubicInOut,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AccessibilityOptions {
    pub enabled: bool,
    pub announce_changes: bool,
}

impl Default for AccessibilityOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            announce_changes: true,
        }
    }
}

/// Options every chart type understands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BaseOptions {
    pub margin: Margin,
    /// Fixed width; the container width when unset.
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub responsive: bool,
    /// Theme name; the registry's current theme when unset.
    pub theme: Option<String>,
    pub title: Option<String>,
    pub animation: AnimationOptions,
    pub accessibility: AccessibilityOptions,
    /// Number formatting locale (`en`, `de`, `fr`, ...).
    pub locale: String,
}

impl Default for BaseOptions {
    fn default() -> Self {
        Self {
            margin: Margin::default(),
            width: None,
            height: None,
            responsive: true,
            theme: None,
            title: None,
            animation: AnimationOptions::default(),
            accessibility: AccessibilityOptions::default(),
            locale: "en".to_string(),
        }
    }
}

impl BaseOptions {
    pub fn with_margin(margin: Margin) -> Self {
        Self {
            margin,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LegendOptions {
    pub show: bool,
    #[serde(deserialize_with = "lenient")]
    pub position: LegendPosition,
}

impl Default for LegendOptions {
    fn default() -> Self {
        Self {
            show: true,
            position: LegendPosition::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TooltipOptions {
    pub show: bool,
    pub show_value: bool,
    pub show_percentage: bool,
}

impl Default for TooltipOptions {
    fn default() -> Self {
        Self {
            show: true,
            show_value: true,
            show_percentage: true,
        }
    }
}

/// Accessor for the common part of a chart's options.
pub trait ChartOptions: Serialize + DeserializeOwned + Default + Clone + 'static {
    fn base(&self) -> &BaseOptions;
    fn base_mut(&mut self) -> &mut BaseOptions;
}

/// Recursively merge `patch` into `target`: objects merge key by key, anything else replaces.
pub fn deep_merge(target: &mut Value, patch: &Value) {
    match (target, patch) {
        (Value::Object(t), Value::Object(p)) => {
            for (k, v) in p {
                let nested = v.is_object() && t.get(k).is_some_and(Value::is_object);
                match t.get_mut(k) {
                    Some(existing) if nested => deep_merge(existing, v),
                    _ => {
                        t.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        (t, p) => *t = p.clone(),
    }
}

/// Build options from defaults with the caller's JSON merged on top.
///
/// `null` or a non-object means "all defaults". Unknown keys are ignored.
pub fn resolve<T: Serialize + DeserializeOwned + Default>(overrides: &Value) -> Result<T> {
    let Value::Object(_) = overrides else {
        return Ok(T::default());
    };
    let mut merged = serde_json::to_value(T::default())?;
    deep_merge(&mut merged, overrides);
    serde_json::from_value(merged).map_err(|e| ChartError::invalid_option("options", e.to_string()))
}

/// Deserialize a discrete option, falling back to its default (with a warning) on bad input.
pub(crate) fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let raw = Value::deserialize(deserializer)?;
    match T::deserialize(&raw) {
        Ok(v) => Ok(v),
        Err(e) => {
            let name = std::any::type_name::<T>().rsplit("::").next().unwrap_or("option");
            warn!("{}; using the default", ChartError::invalid_option(name, format!("{raw}: {e}")));
            Ok(T::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_records_merge_and_leaves_replace() {
        let opts: BaseOptions = resolve(&json!({
            "margin": {"top": 5},
            "animation": {"durationMs": 0},
            "title": "IO",
            "unknownOption": [1, 2]
        }))
        .unwrap();
        assert_eq!(opts.margin.top, 5.0);
        assert_eq!(opts.margin.left, Margin::default().left);
        assert_eq!(opts.animation.duration_ms, 0.0);
        assert_eq!(opts.animation.easing, Easing::CubicInOut);
        assert_eq!(opts.title.as_deref(), Some("IO"));
        assert!(opts.accessibility.enabled);
    }

    #[test]
    fn bad_enum_value_falls_back_to_default() {
        let opts: LegendOptions = resolve(&json!({"position": "diagonal"})).unwrap();
        assert_eq!(opts.position, LegendPosition::Bottom);
        let opts: AnimationOptions = resolve(&json!({"easing": "easeBounce"})).unwrap();
        assert_eq!(opts.easing, Easing::BounceOut);
    }

    #[test]
    fn wrong_record_type_is_an_options_error() {
        let err = resolve::<BaseOptions>(&json!({"margin": "wide"})).unwrap_err();
        assert!(matches!(err, ChartError::InvalidOptions { .. }));
    }

    #[test]
    fn null_means_defaults() {
        let opts: BaseOptions = resolve(&Value::Null).unwrap();
        assert_eq!(opts, BaseOptions::default());
    }
}
