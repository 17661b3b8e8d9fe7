use serde_json::{Value, json};
use trace_charts::{ChartEnv, ChartError, ChartRegistry, ChartState, DataFormat};

fn registry() -> ChartRegistry {
    let env = ChartEnv::default();
    for id in ["a", "b", "c"] {
        env.document.add_container(id, 640.0, 360.0);
    }
    ChartRegistry::with_builtin(env)
}

fn sample(chart_type: &str) -> Value {
    match chart_type {
        "pie" | "bar" => json!({"sda": 120, "sdb": 45, "nvme0n1": 310}),
        "line" => json!([
            {"x": "2024-03-01T10:00:00Z", "y": 3},
            {"x": "2024-03-01T10:05:00Z", "y": 8},
            {"x": "2024-03-01T10:10:00Z", "y": 5}
        ]),
        "heatmap" => json!([
            {"x": "mon", "y": "cpu0", "value": 1},
            {"x": "tue", "y": "cpu0", "value": 4},
            {"x": "mon", "y": "cpu1", "value": 9}
        ]),
        "timeline" => json!([
            {"timestamp": "2024-03-01T10:00:00Z", "event": "open", "severity": "low"},
            {"timestamp": "2024-03-01T10:03:00Z", "event": "exec", "severity": "critical"}
        ]),
        "flow" => json!({
            "nodes": [{"id": "10.0.0.1"}, {"id": "10.0.0.2"}, {"id": "10.0.0.3"}],
            "links": [
                {"source": "10.0.0.1", "target": "10.0.0.2", "count": 6},
                {"source": "10.0.0.2", "target": "10.0.0.3"}
            ]
        }),
        other => panic!("no sample for {other}"),
    }
}

#[test]
fn every_builtin_leaves_exactly_one_surface() {
    let r = registry();
    for chart_type in r.types() {
        let chart = r.create_with_data(&chart_type, "a", &json!({}), &sample(&chart_type)).unwrap();
        chart.borrow_mut().settle().unwrap();
        let doc = &r.env().document;
        assert_eq!(doc.surface_count("a"), 1, "{chart_type}");
        assert!(doc.panel("a").is_none(), "{chart_type}");
        assert_eq!(chart.borrow().state(), ChartState::Interactive, "{chart_type}");
        assert!(!chart.borrow().svg().unwrap().contains("NaN"), "{chart_type}");
        assert_eq!(r.mounted_count(), 1);
    }
}

#[test]
fn omitted_options_resolve_to_defaults() {
    let r = registry();
    let pie = r.create("pie", "a", &json!({})).unwrap();
    let opts = pie.borrow().options_json();
    assert_eq!(opts["sortData"], true);
    assert_eq!(opts["innerRadius"], 0.0);
    let flow = r.create("flow", "b", &json!({"charge": -100})).unwrap();
    let opts = flow.borrow().options_json();
    assert_eq!(opts["stickyDrag"], true);
    assert_eq!(opts["linkDistance"], 100.0);
    assert_eq!(opts["charge"], -100.0);
}

#[test]
fn destroy_releases_the_container() {
    let r = registry();
    let env = r.env().clone();
    let subscribers = env.document.events().subscriber_count();
    let chart = r.create_with_data("bar", "a", &json!({}), &sample("bar")).unwrap();
    assert!(env.document.listener_count("a") > 0);
    assert_eq!(env.responsive.observer_count("a"), 1);

    assert!(r.destroy("a"));
    assert_eq!(env.document.listener_count("a"), 0);
    assert_eq!(env.responsive.observer_count("a"), 0);
    assert_eq!(env.document.events().subscriber_count(), subscribers);
    assert_eq!(env.document.surface_count("a"), 0);

    let mut chart = chart.borrow_mut();
    assert_eq!(chart.state(), ChartState::Destroyed);
    assert!(matches!(chart.set_data(&json!({"x": 1})), Err(ChartError::DestroyedChart(_))));
    assert!(matches!(chart.export_data(DataFormat::Json), Err(ChartError::DestroyedChart(_))));
    assert!(chart.svg().is_none());
    chart.destroy();
}

#[test]
fn theme_change_reaches_every_mounted_chart() {
    let r = registry();
    let pie = r.create_with_data("pie", "a", &json!({"animation": {"durationMs": 0}}), &sample("pie")).unwrap();
    let bar = r.create_with_data("bar", "b", &json!({"animation": {"durationMs": 0}}), &sample("bar")).unwrap();
    assert!(pie.borrow().svg().unwrap().contains("#4472c4"));

    assert!(r.env().themes.set_current("dark"));
    for chart in [&pie, &bar] {
        let svg = chart.borrow().svg().unwrap();
        assert!(svg.contains("#4fc3f7"), "{}", chart.borrow().chart_type());
        assert!(!svg.contains("#4472c4"));
    }
    assert!(r.env().document.body_has_class("theme-dark"));
}

#[test]
fn unknown_theme_changes_nothing() {
    let r = registry();
    let pie = r.create_with_data("pie", "a", &json!({}), &sample("pie")).unwrap();
    assert!(!pie.borrow_mut().set_theme("neon").unwrap());
    assert_eq!(r.env().themes.current_name(), "default");
}

#[test]
fn resize_redraws_at_the_new_size() {
    let r = registry();
    let bar = r.create_with_data("bar", "a", &json!({}), &sample("bar")).unwrap();
    assert!(bar.borrow().svg().unwrap().contains("viewBox=\"0 0 640 360\""));
    r.env().responsive.notify_resize("a", 320.0, 200.0);
    assert!(bar.borrow().svg().unwrap().contains("viewBox=\"0 0 320 200\""));
    assert!(r.env().document.has_class("a", "size-sm"));
}

#[test]
fn latest_data_wins_over_running_animation() {
    let r = registry();
    let bar = r.create("bar", "a", &json!({"animation": {"durationMs": 750}})).unwrap();
    let mut bar = bar.borrow_mut();
    bar.set_data(&json!({"a": 1, "b": 2, "c": 3})).unwrap();
    bar.advance(100.0).unwrap();
    bar.set_data(&json!({"z": 10})).unwrap();
    bar.settle().unwrap();
    assert_eq!(bar.record_count(), 1);
    assert_eq!(bar.svg().unwrap().matches("class=\"bar\"").count(), 1);
}

#[test]
fn unusable_payload_shows_the_empty_panel() {
    let r = registry();
    let chart = r.create_with_data("heatmap", "a", &json!({}), &json!("not a table")).unwrap();
    let panel = r.env().document.panel("a").unwrap();
    assert_eq!(panel.message, "No data available");
    assert_eq!((panel.width, panel.height), (640.0, 360.0));
    assert_eq!(chart.borrow().record_count(), 0);
}

#[test]
fn data_updates_are_announced() {
    let r = registry();
    r.create_with_data("pie", "a", &json!({}), &sample("pie")).unwrap();
    let said = r.env().document.announcements();
    assert_eq!(said.last().map(String::as_str), Some("Chart data updated with 3 items"));
}

#[test]
fn click_events_carry_the_container() {
    let r = registry();
    let bar = r.create_with_data("bar", "c", &json!({}), &sample("bar")).unwrap();
    bar.borrow_mut().click_item(0).unwrap();
    let events = r.env().document.events().events_named("barClick");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].detail["chart"], "c");
    assert_eq!(events[0].detail["data"]["label"], "nvme0n1");
}
