use serde_json::json;
use std::rc::Rc;
use trace_charts::fetch::StaticFetcher;
use trace_charts::responsive::{LAZY_LOADED_EVENT, LAZY_SRC_ATTR};
use trace_charts::{ChartEnv, ChartRegistry};

#[test]
fn lazy_data_feeds_the_chart_on_first_visibility() {
    let env = ChartEnv::default();
    env.document.add_container("procs", 500.0, 300.0);
    env.document.set_attr("procs", LAZY_SRC_ATTR, "/api/procs.json");
    env.responsive.set_fetcher(Rc::new(
        StaticFetcher::new().with("/api/procs.json", r#"{"nginx": 12, "postgres": 30}"#),
    ));
    let registry = ChartRegistry::with_builtin(env.clone());
    let chart = registry.create("bar", "procs", &json!({})).unwrap();

    let target = Rc::clone(&chart);
    let _sub = env.document.events().subscribe(LAZY_LOADED_EVENT, move |ev| {
        target.borrow_mut().set_data(&ev.detail["data"]).unwrap();
    });
    assert_eq!(chart.borrow().record_count(), 0);

    env.responsive.notify_intersection("procs", true);
    assert_eq!(chart.borrow().record_count(), 2);
    assert!(env.document.has_class("procs", "lazy-loaded"));
    assert!(env.document.attr("procs", LAZY_SRC_ATTR).is_none());

    // hiding and showing again does not refetch
    env.responsive.notify_intersection("procs", false);
    env.responsive.notify_intersection("procs", true);
    assert_eq!(env.document.events().events_named(LAZY_LOADED_EVENT).len(), 1);
    assert_eq!(env.document.events().events_named("elementVisible").len(), 2);
}

#[test]
fn failed_fetch_marks_the_element() {
    let env = ChartEnv::default();
    env.document.add_container("gone", 200.0, 200.0);
    env.document.set_attr("gone", LAZY_SRC_ATTR, "/missing.json");
    env.responsive.set_fetcher(Rc::new(StaticFetcher::new()));
    env.responsive.notify_intersection("gone", true);
    assert!(env.document.has_class("gone", "lazy-error"));
    assert!(env.document.events().events_named(LAZY_LOADED_EVENT).is_empty());
}

// Live test (opt-in): cargo test --features online -- --ignored
#[cfg(feature = "online")]
#[test]
#[ignore]
fn http_fetcher_loads_json() {
    use trace_charts::fetch::{Fetcher, HttpFetcher};
    let fetcher = HttpFetcher::new().unwrap();
    let body = fetcher.fetch_json("https://httpbin.org/json").unwrap();
    assert!(body.is_object());
}
