use chrono::{TimeZone, Utc};
use serde_json::json;
use trace_charts::models::Severity;
use trace_charts::normalize;
use trace_charts::viz::types::XAxisType;

#[test]
fn categorical_is_idempotent() {
    let payload = json!([
        {"name": "read", "count": "12"},
        {"key": "write", "amount": 40},
        {"label": "fsync", "value": 0},
        {"label": "bogus", "value": "n/a"},
        42
    ]);
    let once = normalize::categorical(&payload, false, true);
    assert_eq!(once.records.len(), 3);
    assert_eq!(once.rejected, 2);
    let twice = normalize::categorical(&once.to_payload(), false, true);
    assert_eq!(twice.records, once.records);
    assert_eq!(twice.rejected, 0);
}

#[test]
fn line_data_is_idempotent() {
    let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let payload = json!([
        {"name": "reads", "data": [
            {"x": "2024-03-01T10:00:00Z", "y": 1},
            ["2024-03-01T10:01:00Z", null],
            {"timestamp": 1709287320000i64, "value": 3}
        ]},
        {"name": "writes", "data": [{"x": "2024-03-01T10:00:00Z", "y": 7}]}
    ]);
    let once = normalize::line_data(&payload, XAxisType::Time, now);
    assert_eq!(once.records.series.len(), 2);
    assert_eq!(once.records.point_count(), 4);
    assert!(once.anomalies.is_empty());
    let twice = normalize::line_data(&once.to_payload(), XAxisType::Time, now);
    assert_eq!(twice.records, once.records);
}

#[test]
fn heatmap_is_idempotent() {
    let payload = json!([
        {"x": 10, "y": "cpu1", "value": 2, "label": "warm"},
        {"x": 9, "y": "cpu0", "z": 5},
        {"x": "bad"}
    ]);
    let once = normalize::heatmap(&payload);
    assert_eq!(once.records.x_keys, ["9", "10"]);
    assert_eq!(once.records.y_keys, ["cpu0", "cpu1"]);
    assert_eq!(once.rejected, 1);
    let twice = normalize::heatmap(&once.to_payload());
    assert_eq!(twice.records, once.records);
}

#[test]
fn timeline_is_idempotent_and_sorted() {
    let payload = json!([
        {"timestamp": "2024-03-01T10:05:00Z", "type": "close"},
        {"timestamp": "2024-03-01T10:00:00Z", "event": "open", "severity": "HIGH", "category": "fs"},
        {"timestamp": "yesterday", "event": "lost"}
    ]);
    let once = normalize::timeline(&payload);
    assert_eq!(once.rejected, 1);
    let events: Vec<&str> = once.records.iter().map(|e| e.event.as_str()).collect();
    assert_eq!(events, ["open", "close"]);
    assert_eq!(once.records[0].severity, Severity::High);
    assert_eq!(once.records[1].severity, Severity::Info);
    assert_eq!(once.records[1].category, "uncategorized");
    let twice = normalize::timeline(&once.to_payload());
    assert_eq!(twice.records, once.records);
}

#[test]
fn flow_graph_is_idempotent() {
    let payload = json!({
        "nodes": [{"id": "a"}, {"id": "b"}, {"id": "a"}],
        "links": [
            {"source": "a", "target": "b", "count": 3},
            {"source": "a", "target": "ghost"}
        ]
    });
    let once = normalize::flow_graph(&payload);
    assert_eq!(once.records.nodes.len(), 2);
    assert_eq!(once.records.links.len(), 1);
    assert_eq!(once.rejected, 1);
    let twice = normalize::flow_graph(&once.to_payload());
    assert_eq!(twice.records, once.records);
}
