//! Public option enums and constants shared by the chart types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ChartError;

/// Legend placement relative to the plot area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LegendPosition {
    Top,
    /// Horizontal band below the plot; keeps labels close to the x-axis start.
    #[default]
    Bottom,
    Left,
    Right,
}

/// Default legend placement. Horizontal bands wrap better than side panels on narrow dashboards.
pub const DEFAULT_LEGEND_POSITION: LegendPosition = LegendPosition::Bottom;

/// Direction bars grow in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Vertical,
    Horizontal,
}

/// Which grid lines a cartesian chart draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GridLines {
    #[default]
    Horizontal,
    Vertical,
    Both,
    None,
}

impl GridLines {
    pub fn horizontal(self) -> bool {
        matches!(self, GridLines::Horizontal | GridLines::Both)
    }

    pub fn vertical(self) -> bool {
        matches!(self, GridLines::Vertical | GridLines::Both)
    }
}

/// Value-axis scale (`yScale`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScaleType {
    #[default]
    Linear,
    Log,
}

/// How the line chart interprets `x`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum XAxisType {
    #[default]
    Time,
    Linear,
    Ordinal,
}

/// Zoom axes for the line chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoomType {
    #[default]
    X,
    Xy,
}

/// Timeline grouping (`groupBy`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupBy {
    /// Stack events into one-minute buckets.
    #[default]
    None,
    Category,
    Severity,
}

/// Timeline coloring (`colorBy`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorBy {
    #[default]
    Category,
    Severity,
    /// Use each event's own `color`, falling back to the category palette.
    Event,
}

/// Data export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataFormat {
    #[default]
    Json,
    Csv,
    Tsv,
}

impl DataFormat {
    pub fn delimiter(self) -> u8 {
        match self {
            DataFormat::Tsv => b'\t',
            _ => b',',
        }
    }
}

impl FromStr for DataFormat {
    type Err = ChartError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(DataFormat::Json),
            "csv" => Ok(DataFormat::Csv),
            "tsv" => Ok(DataFormat::Tsv),
            other => Err(ChartError::invalid_option("format", format!("unsupported data format `{other}`"))),
        }
    }
}

/// Image export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageFormat {
    #[default]
    Png,
    Jpeg,
}

impl FromStr for ImageFormat {
    type Err = ChartError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(ImageFormat::Png),
            "jpg" | "jpeg" => Ok(ImageFormat::Jpeg),
            other => Err(ChartError::invalid_option("format", format!("unsupported image format `{other}`"))),
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
        })
    }
}

/// Keys the charts react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Space,
    ArrowLeft,
    ArrowRight,
    Escape,
}

impl FromStr for Key {
    type Err = ChartError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Enter" => Ok(Key::Enter),
            " " | "Space" | "Spacebar" => Ok(Key::Space),
            "ArrowLeft" => Ok(Key::ArrowLeft),
            "ArrowRight" => Ok(Key::ArrowRight),
            "Escape" | "Esc" => Ok(Key::Escape),
            other => Err(ChartError::invalid_option("key", format!("unhandled key `{other}`"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_parse_case_insensitively() {
        assert_eq!("CSV".parse::<DataFormat>().unwrap(), DataFormat::Csv);
        assert_eq!("jpg".parse::<ImageFormat>().unwrap(), ImageFormat::Jpeg);
        assert!("gif".parse::<ImageFormat>().is_err());
    }

    #[test]
    fn grid_flags() {
        assert!(GridLines::Both.horizontal() && GridLines::Both.vertical());
        assert!(!GridLines::None.horizontal());
    }
}
