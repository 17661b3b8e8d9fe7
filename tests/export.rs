use image::GenericImageView;
use serde_json::{Value, json};
use std::fs;
use trace_charts::{ChartEnv, ChartRegistry, DataFormat, ImageFormat, storage};

fn registry() -> ChartRegistry {
    let env = ChartEnv::default();
    env.document.add_container("out", 480.0, 320.0);
    ChartRegistry::with_builtin(env)
}

#[test]
fn pie_from_counts_exports_label_value() {
    let r = registry();
    let pie = r
        .create_with_data("pie", "out", &json!({}), &json!({"tcp": 30, "udp": 50, "icmp": 20}))
        .unwrap();
    let pie = pie.borrow();
    assert_eq!(pie.export_data(DataFormat::Csv).unwrap(), "label,value\n\"udp\",50\n\"tcp\",30\n\"icmp\",20");
    assert_eq!(pie.export_data(DataFormat::Tsv).unwrap(), "label\tvalue\n\"udp\"\t50\n\"tcp\"\t30\n\"icmp\"\t20");
}

#[test]
fn json_export_is_indented_and_reloadable() {
    let r = registry();
    let bar = r.create_with_data("bar", "out", &json!({}), &json!({"a": 1.5, "b": 3})).unwrap();
    let text = bar.borrow().export_data(DataFormat::Json).unwrap();
    assert!(text.starts_with("[\n  {\n    \"label\": \"b\""));
    let back: Value = serde_json::from_str(&text).unwrap();
    bar.borrow_mut().set_data(&back).unwrap();
    assert_eq!(bar.borrow().export_data(DataFormat::Json).unwrap(), text);
}

#[test]
fn exports_are_stable_across_calls() {
    let r = registry();
    let timeline = r
        .create_with_data(
            "timeline",
            "out",
            &json!({}),
            &json!([
                {"timestamp": "2024-03-01T10:00:00Z", "event": "exec", "description": "=HYPERLINK(\"x\")"},
                {"timestamp": "2024-03-01T10:00:30Z", "event": "-rm", "severity": "high"}
            ]),
        )
        .unwrap();
    let chart = timeline.borrow();
    let first = chart.export_data(DataFormat::Csv).unwrap();
    assert_eq!(first, chart.export_data(DataFormat::Csv).unwrap());
    let mut lines = first.lines();
    assert_eq!(lines.next(), Some("timestamp,event,category,severity,description"));
    let row = lines.next().unwrap();
    assert!(row.starts_with("2024-03-01T10:00:00.000Z,exec,uncategorized,info,"));
    assert!(row.contains("'=HYPERLINK"));
    assert!(lines.next().unwrap().contains(",'-rm,"));
}

#[test]
fn files_are_written_through_storage() {
    let r = registry();
    let flow = r
        .create_with_data(
            "flow",
            "out",
            &json!({}),
            &json!({"links": [{"source": "web", "target": "db", "count": 12}]}),
        )
        .unwrap();
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("flow.csv");
    storage::write_text(&flow.borrow().export_data(DataFormat::Csv).unwrap(), &csv_path).unwrap();
    assert_eq!(fs::read_to_string(&csv_path).unwrap(), "source,target,count\nweb,db,12");

    let svg_path = dir.path().join("flow.svg");
    storage::write_text(&flow.borrow().svg().unwrap(), &svg_path).unwrap();
    assert!(fs::read_to_string(&svg_path).unwrap().starts_with("<svg"));
}

#[test]
fn images_match_the_surface_size() {
    let r = registry();
    let bar = r.create_with_data("bar", "out", &json!({}), &json!({"a": 1, "b": 2})).unwrap();
    bar.borrow_mut().settle().unwrap();
    let png = bar.borrow().export_image(ImageFormat::Png).unwrap();
    assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    let decoded = image::load_from_memory(&png).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (480, 320));
    let jpeg = bar.borrow().export_image(ImageFormat::Jpeg).unwrap();
    assert_eq!(&jpeg[..2], &[0xff, 0xd8]);
}

#[test]
fn image_export_without_a_drawing_fails() {
    let r = registry();
    let pie = r.create("pie", "out", &json!({})).unwrap();
    assert!(pie.borrow().export_image(ImageFormat::Png).is_err());
}

#[test]
fn heatmap_json_export_loads_back() {
    let r = registry();
    let chart = r
        .create_with_data(
            "heatmap",
            "out",
            &json!({}),
            &json!([{"x": "a", "y": "1", "value": 3}, {"x": "b", "y": "1", "value": 5, "label": "hot"}]),
        )
        .unwrap();
    let first = chart.borrow().export_data(DataFormat::Json).unwrap();
    let back: Value = serde_json::from_str(&first).unwrap();
    chart.borrow_mut().set_data(&back).unwrap();
    assert_eq!(chart.borrow().record_count(), 2);
    assert!(r.env().document.panel("out").is_none());
    assert_eq!(chart.borrow().export_data(DataFormat::Json).unwrap(), first);
}
