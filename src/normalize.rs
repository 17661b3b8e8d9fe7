//! Shape-tolerant normalizers turning JSON payloads into canonical records.
//!
//! Every normalizer first classifies its input into a small sum type; anything
//! matching no accepted shape is counted in [`Normalized::rejected`]. All
//! functions are pure: time-axis repairs use the caller-supplied `now`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::cmp::Ordering;

use crate::models::{
    CategoricalPoint, FlowGraph, FlowLink, FlowNode, HeatmapCell, HeatmapData, LineData,
    Normalized, Series, SeriesPoint, Severity, TimelineEvent, XValue,
};
use crate::viz::types::XAxisType;
use crate::viz::util::format_plain;

const LABEL_KEYS: [&str; 4] = ["label", "name", "key", "x"];
const VALUE_KEYS: [&str; 5] = ["value", "count", "size", "amount", "y"];

/// Finite number from a JSON number or numeric string.
pub fn number(v: &Value) -> Option<f64> {
    let n = match v {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Category key: strings as-is, numbers and booleans stringified.
fn key_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => n.as_f64().map(format_plain),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn first<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| obj.get(*k).filter(|v| !v.is_null()))
}

fn text(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(key_string)
}

/// Parse a timestamp: RFC 3339, `YYYY-MM-DD[ T]HH:MM:SS[.fff]`, `YYYY-MM-DD`,
/// or epoch milliseconds (number or numeric string). Naive times are UTC.
pub fn parse_time(v: &Value) -> Option<DateTime<Utc>> {
    match v {
        Value::Number(n) => n.as_f64().and_then(from_millis),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(t) = DateTime::parse_from_rfc3339(s) {
                return Some(t.with_timezone(&Utc));
            }
            for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
                if let Ok(t) = NaiveDateTime::parse_from_str(s, fmt) {
                    return Some(Utc.from_utc_datetime(&t));
                }
            }
            if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                return d.and_hms_opt(0, 0, 0).map(|t| Utc.from_utc_datetime(&t));
            }
            s.parse::<f64>().ok().and_then(from_millis)
        }
        _ => None,
    }
}

fn from_millis(ms: f64) -> Option<DateTime<Utc>> {
    if !ms.is_finite() {
        return None;
    }
    Utc.timestamp_millis_opt(ms.round() as i64).single()
}

// ---------------- categorical ----------------

enum CategoricalInput<'a> {
    Items(&'a [Value]),
    Mapping(&'a Map<String, Value>),
    Unsupported,
}

impl<'a> CategoricalInput<'a> {
    fn classify(payload: &'a Value) -> Self {
        match payload {
            Value::Array(items) => CategoricalInput::Items(items),
            Value::Object(obj) => match obj.get("data") {
                Some(Value::Array(items)) => CategoricalInput::Items(items),
                _ => CategoricalInput::Mapping(obj),
            },
            _ => CategoricalInput::Unsupported,
        }
    }
}

enum CategoricalItem<'a> {
    Record(&'a Map<String, Value>),
    Pair(&'a Value, &'a Value),
    Unsupported,
}

impl<'a> CategoricalItem<'a> {
    fn classify(item: &'a Value) -> Self {
        match item {
            Value::Object(obj) => CategoricalItem::Record(obj),
            Value::Array(pair) if pair.len() == 2 => CategoricalItem::Pair(&pair[0], &pair[1]),
            _ => CategoricalItem::Unsupported,
        }
    }

    fn point(&self) -> Option<CategoricalPoint> {
        match self {
            CategoricalItem::Record(obj) => Some(CategoricalPoint {
                label: first(obj, &LABEL_KEYS).and_then(key_string)?,
                value: first(obj, &VALUE_KEYS).and_then(number)?,
                color: obj.get("color").and_then(Value::as_str).map(str::to_string),
            }),
            CategoricalItem::Pair(label, value) => Some(CategoricalPoint {
                label: key_string(label)?,
                value: number(value)?,
                color: None,
            }),
            CategoricalItem::Unsupported => None,
        }
    }
}

/// Categorical points from an array of items or a `{label: value}` mapping.
///
/// Negative values are always dropped; zero is dropped too when `drop_non_positive`
/// is set (pie). With `sort_desc` the result is stably sorted by descending value.
pub fn categorical(payload: &Value, drop_non_positive: bool, sort_desc: bool) -> Normalized<Vec<CategoricalPoint>> {
    let mut out = Normalized {
        records: Vec::new(),
        rejected: 0,
        anomalies: Vec::new(),
    };
    let candidates: Vec<Option<CategoricalPoint>> = match CategoricalInput::classify(payload) {
        CategoricalInput::Items(items) => items.iter().map(|i| CategoricalItem::classify(i).point()).collect(),
        CategoricalInput::Mapping(obj) => obj
            .iter()
            .map(|(label, v)| {
                number(v).map(|value| CategoricalPoint {
                    label: label.clone(),
                    value,
                    color: None,
                })
            })
            .collect(),
        CategoricalInput::Unsupported => {
            if !payload.is_null() {
                out.rejected = 1;
            }
            Vec::new()
        }
    };
    for c in candidates {
        match c {
            Some(p) if p.value > 0.0 || (p.value == 0.0 && !drop_non_positive) => out.records.push(p),
            _ => out.rejected += 1,
        }
    }
    if sort_desc {
        out.records
            .sort_by(|a, b| b.value.partial_cmp(&a.value).unwrap_or(Ordering::Equal));
    }
    out
}

// ---------------- time series ----------------

enum RowShape<'a> {
    Xy(&'a Value, Option<&'a Value>),
    Pair(&'a Value, &'a Value),
    Unsupported,
}

impl<'a> RowShape<'a> {
    fn classify(row: &'a Value) -> Self {
        match row {
            Value::Object(obj) => {
                if let Some(x) = obj.get("x") {
                    RowShape::Xy(x, obj.get("y"))
                } else if let Some(ts) = obj.get("timestamp") {
                    RowShape::Xy(ts, obj.get("value").or_else(|| obj.get("count")))
                } else {
                    RowShape::Unsupported
                }
            }
            Value::Array(pair) if pair.len() == 2 => RowShape::Pair(&pair[0], &pair[1]),
            _ => RowShape::Unsupported,
        }
    }
}

fn series_points(
    rows: &[Value],
    axis: XAxisType,
    now: DateTime<Utc>,
    rejected: &mut usize,
    anomalies: &mut Vec<String>,
) -> Vec<SeriesPoint> {
    let mut points = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        let (x, y) = match RowShape::classify(row) {
            RowShape::Xy(x, y) => (x, y),
            RowShape::Pair(x, y) => (x, Some(y)),
            RowShape::Unsupported => {
                *rejected += 1;
                continue;
            }
        };
        let x = match axis {
            XAxisType::Time => match parse_time(x) {
                Some(t) => XValue::Time(t),
                None => {
                    anomalies.push(format!("row {i}: unparsable date {x}, using now"));
                    XValue::Time(now)
                }
            },
            XAxisType::Linear => match number(x) {
                Some(n) => XValue::Number(n),
                None => {
                    *rejected += 1;
                    continue;
                }
            },
            XAxisType::Ordinal => match key_string(x) {
                Some(k) => XValue::Category(k),
                None => {
                    *rejected += 1;
                    continue;
                }
            },
        };
        let y = match y {
            None | Some(Value::Null) => None,
            Some(v) => {
                let n = number(v);
                if n.is_none() {
                    anomalies.push(format!("row {i}: non-numeric y {v} treated as a gap"));
                }
                n
            }
        };
        points.push(SeriesPoint { x, y });
    }
    if axis != XAxisType::Ordinal {
        points.sort_by(|a, b| {
            a.x.as_f64()
                .partial_cmp(&b.x.as_f64())
                .unwrap_or(Ordering::Equal)
        });
    }
    points
}

/// Line data: a single array of rows, or `[{name, data: [...]}, ...]` for multi-series.
pub fn line_data(payload: &Value, axis: XAxisType, now: DateTime<Utc>) -> Normalized<LineData> {
    let mut rejected = 0;
    let mut anomalies = Vec::new();
    let rows: &[Value] = match payload {
        Value::Array(rows) => rows,
        Value::Object(obj) => match obj.get("series").or_else(|| obj.get("data")) {
            Some(Value::Array(rows)) => rows,
            _ => &[],
        },
        _ => &[],
    };
    let is_multi = rows
        .first()
        .and_then(Value::as_object)
        .is_some_and(|o| o.get("data").is_some_and(Value::is_array));
    let series = if is_multi {
        rows.iter()
            .enumerate()
            .filter_map(|(i, s)| {
                let obj = s.as_object();
                let data = obj.and_then(|o| o.get("data")).and_then(Value::as_array);
                let Some(data) = data else {
                    rejected += 1;
                    return None;
                };
                let name = obj
                    .and_then(|o| text(o, "name"))
                    .unwrap_or_else(|| format!("Series {}", i + 1));
                Some(Series {
                    name,
                    data: series_points(data, axis, now, &mut rejected, &mut anomalies),
                })
            })
            .collect()
    } else {
        if rows.is_empty() && !payload.is_null() && !payload.is_array() {
            rejected += 1;
        }
        vec![Series {
            name: "value".to_string(),
            data: series_points(rows, axis, now, &mut rejected, &mut anomalies),
        }]
    };
    Normalized {
        records: LineData {
            series,
            multi: is_multi,
        },
        rejected,
        anomalies,
    }
}

// ---------------- heatmap ----------------

/// Sort keys numerically when every key is a number, otherwise lexicographically.
pub fn sort_keys(keys: &mut [String]) {
    let numeric: Option<Vec<f64>> = keys.iter().map(|k| k.trim().parse::<f64>().ok()).collect();
    if numeric.is_some() {
        keys.sort_by(|a, b| {
            let (a, b) = (a.trim().parse::<f64>().unwrap_or(0.0), b.trim().parse::<f64>().unwrap_or(0.0));
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        });
    } else {
        keys.sort();
    }
}

/// Heatmap cells from `{x, y, value|z, label?}` rows, given as an array or as
/// `{"cells": [...]}` (the exported form). A repeated `(x, y)` keeps the last value.
pub fn heatmap(payload: &Value) -> Normalized<HeatmapData> {
    let mut rejected = 0;
    let mut anomalies = Vec::new();
    let mut cells: IndexMap<(String, String), HeatmapCell> = IndexMap::new();
    let rows: &[Value] = match payload {
        Value::Array(rows) => rows,
        Value::Object(obj) => match obj.get("cells").or_else(|| obj.get("data")) {
            Some(Value::Array(rows)) => rows,
            _ => {
                rejected += 1;
                &[]
            }
        },
        Value::Null => &[],
        _ => {
            rejected += 1;
            &[]
        }
    };
    for row in rows {
        let cell = row.as_object().and_then(|obj| {
            Some(HeatmapCell {
                x: obj.get("x").and_then(key_string)?,
                y: obj.get("y").and_then(key_string)?,
                value: first(obj, &["value", "z"]).and_then(number)?,
                label: text(obj, "label"),
            })
        });
        match cell {
            Some(c) => {
                let key = (c.x.clone(), c.y.clone());
                if cells.insert(key, c).is_some() {
                    anomalies.push("duplicate heatmap cell replaced".to_string());
                }
            }
            None => rejected += 1,
        }
    }
    let cells: Vec<HeatmapCell> = cells.into_values().collect();
    let mut x_keys: Vec<String> = Vec::new();
    let mut y_keys: Vec<String> = Vec::new();
    for c in &cells {
        if !x_keys.contains(&c.x) {
            x_keys.push(c.x.clone());
        }
        if !y_keys.contains(&c.y) {
            y_keys.push(c.y.clone());
        }
    }
    sort_keys(&mut x_keys);
    sort_keys(&mut y_keys);
    Normalized {
        records: HeatmapData { cells, x_keys, y_keys },
        rejected,
        anomalies,
    }
}

// ---------------- timeline ----------------

/// Timeline events sorted by timestamp (ties keep input order).
pub fn timeline(payload: &Value) -> Normalized<Vec<TimelineEvent>> {
    let mut rejected = 0;
    let mut anomalies = Vec::new();
    let rows: &[Value] = payload.as_array().map(Vec::as_slice).unwrap_or(&[]);
    if !payload.is_array() && !payload.is_null() {
        rejected += 1;
    }
    let mut events = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        let Some(obj) = row.as_object() else {
            rejected += 1;
            continue;
        };
        let (Some(timestamp), Some(event)) = (
            obj.get("timestamp").and_then(parse_time),
            text(obj, "event").or_else(|| text(obj, "type")),
        ) else {
            rejected += 1;
            continue;
        };
        let severity = match obj.get("severity").and_then(Value::as_str) {
            None => Severity::Info,
            Some(s) => Severity::parse(s).unwrap_or_else(|| {
                anomalies.push(format!("row {i}: unknown severity `{s}`, using info"));
                Severity::Info
            }),
        };
        events.push(TimelineEvent {
            timestamp,
            event,
            category: text(obj, "category").unwrap_or_else(|| "uncategorized".to_string()),
            severity,
            description: text(obj, "description"),
            label: text(obj, "label"),
            color: text(obj, "color"),
        });
    }
    events.sort_by_key(|e| e.timestamp);
    Normalized {
        records: events,
        rejected,
        anomalies,
    }
}

// ---------------- flow graph ----------------

/// Flow graph from `{nodes, links}`. Without `nodes`, nodes are derived from link endpoints.
pub fn flow_graph(payload: &Value) -> Normalized<FlowGraph> {
    let mut rejected = 0;
    let mut anomalies = Vec::new();
    let empty = Vec::new();
    let obj = payload.as_object();
    if obj.is_none() && !payload.is_null() {
        rejected += 1;
    }
    let links_in = obj
        .and_then(|o| o.get("links"))
        .and_then(Value::as_array)
        .unwrap_or(&empty);
    let mut nodes: IndexMap<String, FlowNode> = IndexMap::new();
    match obj.and_then(|o| o.get("nodes")).and_then(Value::as_array) {
        Some(list) => {
            for n in list {
                let node = match n {
                    Value::Object(o) => o.get("id").and_then(key_string).map(|id| FlowNode {
                        id,
                        label: text(o, "label"),
                    }),
                    other => key_string(other).map(|id| FlowNode { id, label: None }),
                };
                match node {
                    Some(node) if nodes.contains_key(&node.id) => {
                        anomalies.push(format!("duplicate node `{}` ignored", node.id));
                    }
                    Some(node) => {
                        nodes.insert(node.id.clone(), node);
                    }
                    None => rejected += 1,
                }
            }
        }
        None => {
            for l in links_in.iter().filter_map(Value::as_object) {
                for end in ["source", "target"] {
                    if let Some(id) = l.get(end).and_then(key_string) {
                        nodes.entry(id.clone()).or_insert(FlowNode { id, label: None });
                    }
                }
            }
        }
    }
    let mut links = Vec::with_capacity(links_in.len());
    for l in links_in {
        let link = l.as_object().and_then(|o| {
            let source = o.get("source").and_then(key_string)?;
            let target = o.get("target").and_then(key_string)?;
            let count = o.get("count").and_then(number).unwrap_or(1.0).max(0.0);
            let types = o
                .get("types")
                .and_then(Value::as_array)
                .map(|t| t.iter().filter_map(key_string).collect())
                .unwrap_or_default();
            Some(FlowLink {
                source,
                target,
                count,
                types,
            })
        });
        match link {
            Some(link) if nodes.contains_key(&link.source) && nodes.contains_key(&link.target) => links.push(link),
            _ => rejected += 1,
        }
    }
    Normalized {
        records: FlowGraph {
            nodes: nodes.into_values().collect(),
            links,
        },
        rejected,
        anomalies,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn mapping_keeps_insertion_order() {
        let n = categorical(&json!({"x": 5, "y": 7, "z": 3}), false, false);
        let labels: Vec<&str> = n.records.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, ["x", "y", "z"]);
        let sorted = categorical(&json!({"x": 5, "y": 7, "z": 3}), false, true);
        let labels: Vec<&str> = sorted.records.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, ["y", "x", "z"]);
    }

    #[test]
    fn alternate_field_names_and_numeric_strings() {
        let n = categorical(
            &json!([{"name": "read", "count": "12"}, {"key": "write", "size": 3}, {"label": "bad", "value": "n/a"}]),
            true,
            false,
        );
        assert_eq!(n.records.len(), 2);
        assert_eq!(n.records[0].value, 12.0);
        assert_eq!(n.rejected, 1);
    }

    #[test]
    fn zero_values_depend_on_chart() {
        let payload = json!([{"label": "a", "value": 0}, {"label": "b", "value": -1}]);
        assert_eq!(categorical(&payload, true, false).records.len(), 0);
        assert_eq!(categorical(&payload, false, false).records.len(), 1);
    }

    #[test]
    fn bad_dates_become_now_with_an_anomaly() {
        let n = line_data(&json!([{"x": "yesterday-ish", "y": 1}, ["2024-01-02", null]]), XAxisType::Time, now());
        let pts = &n.records.series[0].data;
        assert_eq!(pts.len(), 2);
        assert_eq!(pts[0].x, XValue::Time(now()));
        assert_eq!(pts[1].y, None);
        assert_eq!(n.anomalies.len(), 1);
    }

    #[test]
    fn timestamp_rows_are_accepted() {
        let n = line_data(&json!([{"timestamp": 1000, "count": 4}]), XAxisType::Linear, now());
        assert_eq!(n.records.series[0].data[0].x, XValue::Number(1000.0));
        assert_eq!(n.records.series[0].data[0].y, Some(4.0));
    }

    #[test]
    fn heatmap_keys_sort_numerically() {
        let n = heatmap(&json!([
            {"x": "b", "y": 10, "value": 1},
            {"x": "a", "y": 9, "value": 2},
            {"x": "c", "y": 10}
        ]));
        assert_eq!(n.records.x_keys, ["a", "b"]);
        assert_eq!(n.records.y_keys, ["9", "10"]);
        assert_eq!(n.records.cells.len(), 2);
        assert_eq!(n.rejected, 1);
    }

    #[test]
    fn heatmap_accepts_its_exported_form() {
        let first = heatmap(&json!([{"x": "a", "y": 1, "value": 3}, {"x": "b", "y": 1, "value": 4}]));
        let payload = first.to_payload();
        assert!(payload["cells"].is_array());
        let again = heatmap(&payload);
        assert_eq!(again.records, first.records);
        assert_eq!(again.rejected, 0);
        assert_eq!(heatmap(&json!({"rows": []})).rejected, 1);
    }

    #[test]
    fn timeline_sort_is_stable() {
        let n = timeline(&json!([
            {"timestamp": "2024-01-01T00:01:00Z", "event": "b"},
            {"timestamp": "2024-01-01T00:00:00Z", "type": "a", "severity": "HIGH"},
            {"timestamp": "2024-01-01T00:01:00Z", "event": "c"},
            {"timestamp": "garbage", "event": "d"}
        ]));
        let names: Vec<&str> = n.records.iter().map(|e| e.event.as_str()).collect();
        assert_eq!(names, ["a", "b", "c"]);
        assert_eq!(n.records[0].severity, Severity::High);
        assert_eq!(n.records[1].category, "uncategorized");
        assert_eq!(n.rejected, 1);
    }

    #[test]
    fn flow_links_need_known_endpoints() {
        let n = flow_graph(&json!({
            "nodes": [{"id": "a"}, {"id": "b"}, {"id": "a"}],
            "links": [{"source": "a", "target": "b"}, {"source": "a", "target": "zz", "count": 3}]
        }));
        assert_eq!(n.records.nodes.len(), 2);
        assert_eq!(n.records.links.len(), 1);
        assert_eq!(n.records.links[0].count, 1.0);
        assert_eq!(n.rejected, 1);
    }
}
