use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

use crate::viz::util::format_plain;

/// Output of a normalizer: canonical records plus bookkeeping about what was dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized<T> {
    pub records: T,
    /// Input items that matched no accepted shape (or were filtered out).
    pub rejected: usize,
    /// Soft problems that were repaired, e.g. an unparsable date replaced by `now`.
    pub anomalies: Vec<String>,
}

impl<T: Serialize> Normalized<T> {
    /// The records as a payload the same normalizer accepts again.
    pub fn to_payload(&self) -> serde_json::Value {
        serde_json::to_value(&self.records).unwrap_or(serde_json::Value::Null)
    }
}

/// `{label, value ≥ 0, color?}` for pie and bar charts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalPoint {
    pub label: String,
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub color: Option<String>,
}

/// Line chart x value, typed by the axis.
#[derive(Debug, Clone, PartialEq)]
pub enum XValue {
    Time(DateTime<Utc>),
    Number(f64),
    Category(String),
}

impl XValue {
    /// Position on a continuous axis (epoch milliseconds for time).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            XValue::Time(t) => Some(t.timestamp_millis() as f64),
            XValue::Number(n) => Some(*n),
            XValue::Category(_) => None,
        }
    }

    /// Key used to align series in exports and ordinal scales.
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for XValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XValue::Time(t) => f.write_str(&t.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            XValue::Number(n) => f.write_str(&format_plain(*n)),
            XValue::Category(c) => f.write_str(c),
        }
    }
}

impl Serialize for XValue {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        match self {
            XValue::Number(n) => s.serialize_f64(*n),
            other => s.serialize_str(&other.to_string()),
        }
    }
}

/// `{x, y}`; `y: None` is a gap.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub x: XValue,
    pub y: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub name: String,
    pub data: Vec<SeriesPoint>,
}

/// Line chart records: one anonymous series or several named ones.
#[derive(Debug, Clone, PartialEq)]
pub struct LineData {
    pub series: Vec<Series>,
    pub multi: bool,
}

impl LineData {
    pub fn point_count(&self) -> usize {
        self.series.iter().map(|s| s.data.len()).sum()
    }
}

impl Serialize for LineData {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        match (self.multi, self.series.first()) {
            (false, Some(only)) => only.data.serialize(s),
            (false, None) => Vec::<SeriesPoint>::new().serialize(s),
            (true, _) => self.series.serialize(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatmapCell {
    pub x: String,
    pub y: String,
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub label: Option<String>,
}

/// Heatmap cells with their sorted axis keys.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapData {
    pub cells: Vec<HeatmapCell>,
    #[serde(skip)]
    pub x_keys: Vec<String>,
    #[serde(skip)]
    pub y_keys: Vec<String>,
}

impl HeatmapData {
    pub fn cell(&self, x: &str, y: &str) -> Option<&HeatmapCell> {
        self.cells.iter().find(|c| c.x == x && c.y == y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    #[default]
    Info,
}

impl Severity {
    pub const ALL: [Severity; 5] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
        Severity::Info,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "critical" => Some(Severity::Critical),
            "high" => Some(Severity::High),
            "medium" => Some(Severity::Medium),
            "low" => Some(Severity::Low),
            "info" => Some(Severity::Info),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
            Severity::Info => "info",
        }
    }

    /// Fixed severity palette: red, orange, yellow, green, cyan.
    pub fn color(self) -> &'static str {
        match self {
            Severity::Critical => "#dc3545",
            Severity::High => "#fd7e14",
            Severity::Medium => "#ffc107",
            Severity::Low => "#28a745",
            Severity::Info => "#17a2b8",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn serialize_time<S: Serializer>(t: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&t.to_rfc3339_opts(SecondsFormat::Millis, true))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineEvent {
    #[serde(serialize_with = "serialize_time")]
    pub timestamp: DateTime<Utc>,
    pub event: String,
    pub category: String,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowNode {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowLink {
    pub source: String,
    pub target: String,
    pub count: f64,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub types: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FlowGraph {
    pub nodes: Vec<FlowNode>,
    pub links: Vec<FlowLink>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn single_series_serializes_as_points() {
        let data = LineData {
            series: vec![Series {
                name: "value".into(),
                data: vec![SeriesPoint {
                    x: XValue::Number(1.0),
                    y: None,
                }],
            }],
            multi: false,
        };
        assert_eq!(serde_json::to_string(&data).unwrap(), r#"[{"x":1.0,"y":null}]"#);
    }

    #[test]
    fn time_keys_are_rfc3339() {
        let t = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        assert_eq!(XValue::Time(t).key(), "2024-05-01T12:00:00Z");
        assert_eq!(XValue::Number(2.0).key(), "2");
    }

    #[test]
    fn severity_parsing_is_case_insensitive() {
        assert_eq!(Severity::parse("HIGH"), Some(Severity::High));
        assert_eq!(Severity::parse("urgent"), None);
        assert!(Severity::Critical < Severity::Info);
    }
}
